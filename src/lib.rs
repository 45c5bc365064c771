//! # ictscan - ICT market-structure toolkit
//!
//! Swing structure, order blocks, liquidity zones and sweeps over candle data.
//!
//! ## Quick Start
//!
//! ```rust
//! use ictscan::prelude::*;
//!
//! // Define your OHLCV data
//! struct Bar { o: f64, h: f64, l: f64, c: f64 }
//!
//! impl OHLCV for Bar {
//!     fn open(&self) -> f64 { self.o }
//!     fn high(&self) -> f64 { self.h }
//!     fn low(&self) -> f64 { self.l }
//!     fn close(&self) -> f64 { self.c }
//! }
//!
//! let bars: Vec<Bar> = vec![];
//!
//! // Create an analyzer over the bars
//! let mut analyzer = AnalyzerBuilder::new()
//!     .lookback(5)
//!     .tolerance(0.001)
//!     .build(&bars)
//!     .unwrap();
//!
//! let report = analyzer.analyze(AnalyzeOptions::default());
//! assert!(report.order_blocks.is_empty());
//! assert_eq!(analyzer.get_trading_bias().bias, Direction::Neutral);
//! ```

pub mod engines;
pub mod params;
pub mod report;

pub mod prelude {
    pub use crate::{
        // Engines
        engines::*,
        // Parameters
        params::{ParamMeta, ParamType, ParameterizedEngine},
        // Parallel
        analyze_parallel,
        // Coordinator
        AnalysisConfig,
        AnalysisCoordinator,
        // Errors
        AnalysisError,
        AnalyzeOptions,
        AnalyzerBuilder,
        // Types
        Candle,
        CandleRecord,
        Confidence,
        Direction,
        InstrumentAnalysis,
        InstrumentError,
        OHLCVExt,
        Period,
        Ratio,
        Result,
        Trend,
        OHLCV,
        // Reports
        report::{AnalysisReport, KeyLevel, LevelKind, TradingBias},
        candles_from_records,
    };
}

// ============================================================
// ERRORS
// ============================================================

pub type Result<T> = std::result::Result<T, AnalysisError>;

/// Errors that can occur while preparing an analysis
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AnalysisError {
    #[error("candle {index} is missing required field(s): {}", .missing.join(", "))]
    Schema {
        index: usize,
        missing: Vec<&'static str>,
    },

    #[error("Invalid value: {0}")]
    InvalidValue(&'static str),

    #[error("{field} = {value} out of range [{min}, {max}]")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Invalid candle at index {index}: {reason}")]
    InvalidCandle { index: usize, reason: &'static str },
}

// ============================================================
// VALIDATED TYPES
// ============================================================

/// Fraction in range 0.0..=1.0
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Ratio(f64);

impl Ratio {
    /// Create a new Ratio, validating the value is in [0.0, 1.0]
    pub fn new(value: f64) -> Result<Self> {
        if value.is_nan() || value.is_infinite() {
            return Err(AnalysisError::InvalidValue(
                "Ratio cannot be NaN or infinite",
            ));
        }
        if !(0.0..=1.0).contains(&value) {
            return Err(AnalysisError::OutOfRange {
                field: "Ratio",
                value,
                min: 0.0,
                max: 1.0,
            });
        }
        Ok(Self(value))
    }

    /// Create a Ratio from a compile-time constant (library internal use)
    #[doc(hidden)]
    pub const fn new_const(value: f64) -> Self {
        Self(value)
    }

    #[inline]
    pub fn get(self) -> f64 {
        self.0
    }
}

impl serde::Serialize for Ratio {
    fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        self.0.serialize(s)
    }
}

impl<'de> serde::Deserialize<'de> for Ratio {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let value = f64::deserialize(d)?;
        Ratio::new(value).map_err(serde::de::Error::custom)
    }
}

/// Period in candles (must be > 0)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Period(usize);

impl Period {
    /// Create a new Period, validating value is > 0
    pub fn new(value: usize) -> Result<Self> {
        if value == 0 {
            return Err(AnalysisError::InvalidValue("Period must be > 0"));
        }
        Ok(Self(value))
    }

    #[doc(hidden)]
    pub const fn new_const(value: usize) -> Self {
        Self(value)
    }

    #[inline]
    pub fn get(self) -> usize {
        self.0
    }
}

impl serde::Serialize for Period {
    fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        self.0.serialize(s)
    }
}

impl<'de> serde::Deserialize<'de> for Period {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let value = usize::deserialize(d)?;
        Period::new(value).map_err(serde::de::Error::custom)
    }
}

// ============================================================
// OHLCV TRAITS
// ============================================================

/// Core OHLCV data trait
pub trait OHLCV {
    fn open(&self) -> f64;
    fn high(&self) -> f64;
    fn low(&self) -> f64;
    fn close(&self) -> f64;

    fn volume(&self) -> Option<f64> {
        None
    }
}

/// Extension trait with computed properties for OHLCV data
pub trait OHLCVExt: OHLCV {
    #[inline]
    fn is_bullish(&self) -> bool {
        self.close() > self.open()
    }

    #[inline]
    fn is_bearish(&self) -> bool {
        self.close() < self.open()
    }

    /// Validate OHLCV data consistency
    fn validate(&self) -> Result<()> {
        let prices = [self.open(), self.high(), self.low(), self.close()];
        if prices.iter().any(|p| p.is_nan()) {
            return Err(AnalysisError::InvalidCandle {
                index: 0,
                reason: "NaN in OHLC",
            });
        }
        if prices.iter().any(|p| p.is_infinite()) {
            return Err(AnalysisError::InvalidCandle {
                index: 0,
                reason: "Infinite value in OHLC",
            });
        }
        if prices.iter().any(|&p| p <= 0.0) {
            return Err(AnalysisError::InvalidCandle {
                index: 0,
                reason: "non-positive price",
            });
        }
        if self.high() < self.low() {
            return Err(AnalysisError::InvalidCandle {
                index: 0,
                reason: "high < low",
            });
        }
        Ok(())
    }
}

impl<T: OHLCV> OHLCVExt for T {}

/// Validate every candle, reporting the first failing index.
pub fn validate_candles<T: OHLCV>(bars: &[T]) -> Result<()> {
    for (i, bar) in bars.iter().enumerate() {
        bar.validate().map_err(|e| match e {
            AnalysisError::InvalidCandle { reason, .. } => {
                AnalysisError::InvalidCandle { index: i, reason }
            }
            other => other,
        })?;
    }
    Ok(())
}

// ============================================================
// CANDLES
// ============================================================

/// Plain candle record
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Candle {
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<f64>,
}

impl Candle {
    pub fn new(open: f64, high: f64, low: f64, close: f64) -> Self {
        Self {
            open,
            high,
            low,
            close,
            volume: None,
        }
    }

    pub fn with_volume(mut self, volume: f64) -> Self {
        self.volume = Some(volume);
        self
    }

    /// Convert an untyped record, failing if any of open/high/low/close is absent.
    pub fn from_record(index: usize, record: &CandleRecord) -> Result<Self> {
        match (record.open, record.high, record.low, record.close) {
            (Some(open), Some(high), Some(low), Some(close)) => Ok(Self {
                open,
                high,
                low,
                close,
                volume: record.volume,
            }),
            (open, high, low, close) => {
                let missing = [("open", open), ("high", high), ("low", low), ("close", close)]
                    .into_iter()
                    .filter(|(_, v)| v.is_none())
                    .map(|(name, _)| name)
                    .collect();
                Err(AnalysisError::Schema { index, missing })
            }
        }
    }
}

impl OHLCV for Candle {
    fn open(&self) -> f64 {
        self.open
    }

    fn high(&self) -> f64 {
        self.high
    }

    fn low(&self) -> f64 {
        self.low
    }

    fn close(&self) -> f64 {
        self.close
    }

    fn volume(&self) -> Option<f64> {
        self.volume
    }
}

/// Candle as it arrives from an untyped source; every field may be absent
#[derive(Debug, Clone, Copy, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct CandleRecord {
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: Option<f64>,
    pub volume: Option<f64>,
}

impl TryFrom<CandleRecord> for Candle {
    type Error = AnalysisError;

    fn try_from(record: CandleRecord) -> Result<Self> {
        Candle::from_record(0, &record)
    }
}

/// Convert records to candles, aborting on the first record with a missing field.
pub fn candles_from_records(records: &[CandleRecord]) -> Result<Vec<Candle>> {
    records
        .iter()
        .enumerate()
        .map(|(i, r)| Candle::from_record(i, r))
        .collect()
}

// ============================================================
// CLASSIFICATIONS
// ============================================================

/// Market trend from swing structure
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    /// Higher highs and higher lows
    Bullish,
    /// Lower highs and lower lows
    Bearish,
    #[default]
    Ranging,
}

impl Trend {
    pub fn as_str(self) -> &'static str {
        match self {
            Trend::Bullish => "bullish",
            Trend::Bearish => "bearish",
            Trend::Ranging => "ranging",
        }
    }
}

impl std::fmt::Display for Trend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Directional bias
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Bullish,
    #[default]
    Neutral,
    Bearish,
}

impl Direction {
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Bullish => "bullish",
            Direction::Neutral => "neutral",
            Direction::Bearish => "bearish",
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Confidence attached to a bias
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    #[default]
    Low,
    Medium,
    High,
}

impl Confidence {
    pub fn as_str(self) -> &'static str {
        match self {
            Confidence::Low => "low",
            Confidence::Medium => "medium",
            Confidence::High => "high",
        }
    }
}

impl std::fmt::Display for Confidence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================
// ANALYSIS COORDINATOR
// ============================================================

use std::collections::HashMap;

use engines::*;
use params::ParameterizedEngine;
use report::{AnalysisReport, KeyLevel, LevelKind, TradingBias};

/// Which optional passes [`AnalysisCoordinator::analyze`] runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct AnalyzeOptions {
    pub identify_order_blocks: bool,
    pub identify_liquidity_zones: bool,
    pub detect_sweeps: bool,
}

impl Default for AnalyzeOptions {
    fn default() -> Self {
        Self {
            identify_order_blocks: true,
            identify_liquidity_zones: true,
            detect_sweeps: true,
        }
    }
}

/// Analysis configuration
#[derive(Debug, Clone, Copy, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub structure: StructureParams,
    pub order_blocks: OrderBlockParams,
    pub liquidity: LiquidityParams,
    /// Reject NaN, infinite, non-positive or inverted candles before analysis
    pub validate_data: bool,
}

impl AnalysisConfig {
    /// Check every engine parameter against its metadata.
    pub fn validate(&self) -> Result<()> {
        self.structure.validate()?;
        self.order_blocks.validate()?;
        self.liquidity.validate()
    }
}

/// Runs the three engines over one candle slice and fuses their output
#[derive(Debug, Clone)]
pub struct AnalysisCoordinator<'a, T: OHLCV> {
    bars: &'a [T],
    config: AnalysisConfig,
    structure: StructureEngine<'a, T>,
    order_blocks: OrderBlockEngine<'a, T>,
    liquidity: LiquidityEngine<'a, T>,
}

impl<'a, T: OHLCV + Sync> AnalysisCoordinator<'a, T> {
    /// Coordinator with default parameters. Data is not validated.
    pub fn new(bars: &'a [T]) -> Self {
        Self::build(bars, AnalysisConfig::default())
    }

    /// Coordinator with `config`. Parameters are always checked; candles only if
    /// `config.validate_data` is set.
    pub fn with_config(bars: &'a [T], config: AnalysisConfig) -> Result<Self> {
        config.validate()?;
        if config.validate_data {
            validate_candles(bars)?;
        }
        Ok(Self::build(bars, config))
    }

    fn build(bars: &'a [T], config: AnalysisConfig) -> Self {
        Self {
            bars,
            config,
            structure: StructureEngine::with_params(bars, config.structure),
            order_blocks: OrderBlockEngine::with_params(bars, config.order_blocks),
            liquidity: LiquidityEngine::with_params(bars, config.liquidity),
        }
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn bars(&self) -> &'a [T] {
        self.bars
    }

    pub fn structure(&self) -> &StructureEngine<'a, T> {
        &self.structure
    }

    pub fn structure_mut(&mut self) -> &mut StructureEngine<'a, T> {
        &mut self.structure
    }

    pub fn order_blocks(&self) -> &OrderBlockEngine<'a, T> {
        &self.order_blocks
    }

    pub fn order_blocks_mut(&mut self) -> &mut OrderBlockEngine<'a, T> {
        &mut self.order_blocks
    }

    pub fn liquidity(&self) -> &LiquidityEngine<'a, T> {
        &self.liquidity
    }

    pub fn liquidity_mut(&mut self) -> &mut LiquidityEngine<'a, T> {
        &mut self.liquidity
    }

    /// Run the structure summary plus the enabled passes.
    ///
    /// The full block and zone lists are copied right after identification,
    /// before any status refresh or sweep detection touches their flags.
    /// Sweep detection runs last, on whatever zones are stored.
    pub fn analyze(&mut self, options: AnalyzeOptions) -> AnalysisReport {
        let Self {
            structure,
            order_blocks,
            liquidity,
            ..
        } = self;

        let (market_structure, ((blocks, active_blocks), (zones, active_zones, sweeps))) =
            rayon::join(
                || structure.get_market_structure_summary(),
                || {
                    rayon::join(
                        || {
                            if !options.identify_order_blocks {
                                return (Vec::new(), Vec::new());
                            }
                            let all = order_blocks.identify().to_vec();
                            (all, order_blocks.get_active_order_blocks())
                        },
                        || {
                            let (all, active) = if options.identify_liquidity_zones {
                                let all = liquidity.identify().to_vec();
                                (all, liquidity.get_active_liquidity_zones())
                            } else {
                                (Vec::new(), Vec::new())
                            };
                            let sweeps = if options.detect_sweeps {
                                liquidity.detect_liquidity_sweeps()
                            } else {
                                Vec::new()
                            };
                            (all, active, sweeps)
                        },
                    )
                },
            );

        tracing::debug!(
            trend = %market_structure.trend,
            order_blocks = blocks.len(),
            liquidity_zones = zones.len(),
            sweeps = sweeps.len(),
            "analysis complete"
        );

        AnalysisReport {
            market_structure,
            order_blocks: blocks,
            active_order_blocks: active_blocks,
            liquidity_zones: zones,
            active_liquidity_zones: active_zones,
            liquidity_sweeps: sweeps,
        }
    }

    /// Derive the directional bias from the trend and the stored blocks and zones.
    ///
    /// Reads whatever blocks and zones the engines currently hold; run
    /// [`AnalysisCoordinator::analyze`] first to populate them.
    ///
    /// The order-block level minimizes a signed gap (`last_close - top` for
    /// bullish, `bottom - last_close` for bearish), not an absolute distance.
    pub fn get_trading_bias(&mut self) -> TradingBias {
        let trend = self.structure.identify_trend();
        let active_blocks = self.order_blocks.get_active_order_blocks();
        let active_zones = self.liquidity.get_active_liquidity_zones();
        let last_close = self.bars.last().map(|b| b.close());

        let mut bias = TradingBias::new(trend);

        let Some(last_close) = last_close else {
            if trend == Trend::Ranging {
                bias.reasoning.push(RANGING_REASON.to_string());
            }
            return bias;
        };

        match trend {
            Trend::Bullish => {
                bias.bias = Direction::Bullish;
                bias.confidence = Confidence::Medium;
                bias.reasoning
                    .push("Market structure is bullish (higher highs and higher lows)".to_string());

                let support = helpers::first_min_by_key(
                    active_blocks.iter().filter(|b| b.side == BlockSide::Bullish),
                    |b| last_close - b.top,
                );
                if let Some(block) = support {
                    bias.key_levels.push(KeyLevel::new(LevelKind::Support, block.top));
                    bias.reasoning
                        .push(format!("Bullish order block support at {:.2}", block.top));
                }

                let target = helpers::first_min_by_key(
                    active_zones.iter().filter(|z| z.side == LiquiditySide::BuySide),
                    |z| (z.price - last_close).abs(),
                );
                if let Some(zone) = target {
                    bias.key_levels.push(KeyLevel::new(LevelKind::Resistance, zone.price));
                    bias.reasoning
                        .push(format!("Buy-side liquidity target at {:.2}", zone.price));
                }
            }
            Trend::Bearish => {
                bias.bias = Direction::Bearish;
                bias.confidence = Confidence::Medium;
                bias.reasoning
                    .push("Market structure is bearish (lower highs and lower lows)".to_string());

                let resistance = helpers::first_min_by_key(
                    active_blocks.iter().filter(|b| b.side == BlockSide::Bearish),
                    |b| b.bottom - last_close,
                );
                if let Some(block) = resistance {
                    bias.key_levels
                        .push(KeyLevel::new(LevelKind::Resistance, block.bottom));
                    bias.reasoning.push(format!(
                        "Bearish order block resistance at {:.2}",
                        block.bottom
                    ));
                }

                let target = helpers::first_min_by_key(
                    active_zones.iter().filter(|z| z.side == LiquiditySide::SellSide),
                    |z| (z.price - last_close).abs(),
                );
                if let Some(zone) = target {
                    bias.key_levels.push(KeyLevel::new(LevelKind::Support, zone.price));
                    bias.reasoning
                        .push(format!("Sell-side liquidity target at {:.2}", zone.price));
                }
            }
            Trend::Ranging => bias.reasoning.push(RANGING_REASON.to_string()),
        }

        bias
    }

    /// Run every pass, derive the bias and render the text report.
    pub fn get_analysis_summary(&mut self) -> String {
        let analysis = self.analyze(AnalyzeOptions::default());
        let bias = self.get_trading_bias();
        report::format_summary(&analysis, &bias)
    }
}

const RANGING_REASON: &str = "Market is ranging - wait for clear direction";

// ============================================================
// BUILDER
// ============================================================

/// Builder for [`AnalysisCoordinator`]; values go through the same checks as
/// [`ParameterizedEngine::with_params`] when [`AnalyzerBuilder::config`] runs
#[derive(Debug, Clone, Default)]
pub struct AnalyzerBuilder {
    lookback: Option<usize>,
    min_move: Option<f64>,
    tolerance: Option<f64>,
    validate_data: bool,
}

impl AnalyzerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Swing lookback in candles (default 5)
    pub fn lookback(mut self, lookback: usize) -> Self {
        self.lookback = Some(lookback);
        self
    }

    /// Minimum displacement for order blocks (default 0.01)
    pub fn min_move(mut self, min_move: f64) -> Self {
        self.min_move = Some(min_move);
        self
    }

    /// Equal-level tolerance for liquidity zones (default 0.001)
    pub fn tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = Some(tolerance);
        self
    }

    /// Enable/disable data validation
    pub fn validate_data(mut self, enable: bool) -> Self {
        self.validate_data = enable;
        self
    }

    /// Resolve the configuration without binding it to data
    pub fn config(&self) -> Result<AnalysisConfig> {
        let mut structure = HashMap::new();
        if let Some(lookback) = self.lookback {
            structure.insert("lookback", lookback as f64);
        }
        let mut order_blocks = HashMap::new();
        if let Some(min_move) = self.min_move {
            order_blocks.insert("min_move", min_move);
        }
        let mut liquidity = HashMap::new();
        if let Some(tolerance) = self.tolerance {
            liquidity.insert("tolerance", tolerance);
        }

        Ok(AnalysisConfig {
            structure: StructureParams::with_params(&structure)?,
            order_blocks: OrderBlockParams::with_params(&order_blocks)?,
            liquidity: LiquidityParams::with_params(&liquidity)?,
            validate_data: self.validate_data,
        })
    }

    /// Build the coordinator over `bars`
    pub fn build<T: OHLCV + Sync>(self, bars: &[T]) -> Result<AnalysisCoordinator<'_, T>> {
        let config = self.config()?;
        AnalysisCoordinator::with_config(bars, config)
    }
}

// ============================================================
// PARALLEL ANALYSIS
// ============================================================

use rayon::prelude::*;

/// Result of analyzing a single instrument
#[derive(Debug, Clone, serde::Serialize)]
pub struct InstrumentAnalysis {
    pub symbol: String,
    pub report: AnalysisReport,
    pub bias: TradingBias,
}

/// Error from analyzing a single instrument
#[derive(Debug, Clone)]
pub struct InstrumentError {
    pub symbol: String,
    pub error: AnalysisError,
}

/// Parallel analysis of multiple instruments
pub fn analyze_parallel<'a, T, I>(
    config: &AnalysisConfig,
    instruments: I,
    options: AnalyzeOptions,
) -> (Vec<InstrumentAnalysis>, Vec<InstrumentError>)
where
    T: OHLCV + Sync + 'a,
    I: IntoParallelIterator<Item = (&'a str, &'a [T])>,
{
    let results: Vec<_> = instruments
        .into_par_iter()
        .map(|(symbol, bars)| {
            AnalysisCoordinator::with_config(bars, *config)
                .map(|mut analyzer| {
                    let report = analyzer.analyze(options);
                    let bias = analyzer.get_trading_bias();
                    InstrumentAnalysis {
                        symbol: symbol.to_string(),
                        report,
                        bias,
                    }
                })
                .map_err(|error| InstrumentError {
                    symbol: symbol.to_string(),
                    error,
                })
        })
        .collect();

    let mut successes = Vec::new();
    let mut errors = Vec::new();

    for result in results {
        match result {
            Ok(r) => successes.push(r),
            Err(e) => errors.push(e),
        }
    }

    (successes, errors)
}

// ============================================================
// TESTS
// ============================================================
