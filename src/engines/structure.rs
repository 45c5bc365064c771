//! Market structure: swing points, trend regime and structure breaks.
//!
//! A swing high is a candle whose high is strictly above the highs of the
//! `lookback` candles on each side; a swing low mirrors it on lows. Equal
//! levels never qualify (they are liquidity, not structure).

use std::collections::HashMap;
use std::ops::Range;

use tracing::{debug, trace};

use super::helpers::DEFAULT_SWING_LOOKBACK;
use crate::{
    params::{check_keys, from_owned_map, get_period, ParamMeta, ParameterizedEngine},
    AnalysisError, Period, Result, Trend, OHLCV,
};

// ============================================================
// TYPES
// ============================================================

/// Kind of structure break at a candle close
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StructureBreak {
    /// Close beyond the last swing extreme while ranging
    BreakOfStructure,
    /// Close beyond the last swing extreme against the prevailing trend
    ChangeOfCharacter,
}

impl StructureBreak {
    pub fn as_str(self) -> &'static str {
        match self {
            StructureBreak::BreakOfStructure => "break_of_structure",
            StructureBreak::ChangeOfCharacter => "change_of_character",
        }
    }
}

impl std::fmt::Display for StructureBreak {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Swing-high and swing-low indices, each strictly increasing
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct SwingPoints {
    pub highs: Vec<usize>,
    pub lows: Vec<usize>,
    /// Lookback the points were computed with
    pub lookback: usize,
}

/// Snapshot of the market structure
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct StructureSummary {
    pub trend: Trend,
    pub swing_highs_count: usize,
    pub swing_lows_count: usize,
    pub last_swing_high: Option<f64>,
    pub last_swing_low: Option<f64>,
}

/// Parameters of the structure engine
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "HashMap<String, f64>")]
pub struct StructureParams {
    /// Candles on each side a swing point must dominate
    pub lookback: Period,
}

impl Default for StructureParams {
    fn default() -> Self {
        Self {
            lookback: Period::new_const(DEFAULT_SWING_LOOKBACK),
        }
    }
}

const STRUCTURE_PARAMS: &[ParamMeta] = &[ParamMeta::period(
    "lookback",
    DEFAULT_SWING_LOOKBACK as f64,
    (1.0, u32::MAX as f64),
    "Candles on each side a swing point must strictly exceed",
)];

impl StructureParams {
    /// Check the current values against the parameter metadata.
    pub fn validate(&self) -> Result<()> {
        STRUCTURE_PARAMS[0].validate(self.lookback.get() as f64)
    }
}

impl TryFrom<HashMap<String, f64>> for StructureParams {
    type Error = AnalysisError;

    fn try_from(params: HashMap<String, f64>) -> Result<Self> {
        from_owned_map(params)
    }
}

impl ParameterizedEngine for StructureParams {
    fn param_meta() -> &'static [ParamMeta] {
        STRUCTURE_PARAMS
    }

    fn with_params(params: &HashMap<&str, f64>) -> Result<Self> {
        check_keys(params, STRUCTURE_PARAMS, Self::engine_name())?;
        Ok(Self {
            lookback: get_period(params, &STRUCTURE_PARAMS[0])?,
        })
    }

    fn engine_name() -> &'static str {
        "structure"
    }
}

// ============================================================
// DETECTION PRIMITIVES
// ============================================================

/// Find swing highs and lows with a symmetric `lookback` window.
///
/// Returns empty lists when `bars.len() < 2 * lookback + 1`.
pub fn find_swing_points<T: OHLCV>(bars: &[T], lookback: Period) -> SwingPoints {
    let lookback = lookback.get();
    let len = bars.len();
    let mut swings = SwingPoints {
        highs: Vec::new(),
        lows: Vec::new(),
        lookback,
    };

    for i in lookback..len.saturating_sub(lookback) {
        let high = bars[i].high();
        let low = bars[i].low();

        let is_high = (1..=lookback).all(|j| high > bars[i - j].high() && high > bars[i + j].high());
        if is_high {
            swings.highs.push(i);
        }

        let is_low = (1..=lookback).all(|j| low < bars[i - j].low() && low < bars[i + j].low());
        if is_low {
            swings.lows.push(i);
        }
    }

    swings
}

/// Classify the trend from the two most recent swing highs and lows.
pub fn classify_trend<T: OHLCV>(bars: &[T], swings: &SwingPoints) -> Trend {
    let (highs, lows) = (&swings.highs, &swings.lows);
    if highs.len() < 2 || lows.len() < 2 {
        return Trend::Ranging;
    }

    let prev_high = bars[highs[highs.len() - 2]].high();
    let last_high = bars[highs[highs.len() - 1]].high();
    let prev_low = bars[lows[lows.len() - 2]].low();
    let last_low = bars[lows[lows.len() - 1]].low();

    if last_high > prev_high && last_low > prev_low {
        Trend::Bullish
    } else if last_high < prev_high && last_low < prev_low {
        Trend::Bearish
    } else {
        Trend::Ranging
    }
}

// ============================================================
// ENGINE
// ============================================================

/// Swing/trend engine over a borrowed candle slice.
///
/// Swing points are cached: [`StructureEngine::identify_swing_points`] always
/// recomputes, while [`StructureEngine::ensure_swing_points`] computes them with
/// the configured lookback only if nothing is cached yet.
#[derive(Debug, Clone)]
pub struct StructureEngine<'a, T: OHLCV> {
    bars: &'a [T],
    params: StructureParams,
    swings: Option<SwingPoints>,
    current_trend: Trend,
}

impl<'a, T: OHLCV> StructureEngine<'a, T> {
    pub fn new(bars: &'a [T]) -> Self {
        Self::with_params(bars, StructureParams::default())
    }

    pub fn with_params(bars: &'a [T], params: StructureParams) -> Self {
        Self {
            bars,
            params,
            swings: None,
            current_trend: Trend::Ranging,
        }
    }

    pub fn params(&self) -> &StructureParams {
        &self.params
    }

    /// Cached swing points, if computed.
    pub fn swing_points(&self) -> Option<&SwingPoints> {
        self.swings.as_ref()
    }

    /// Trend as of the last [`StructureEngine::identify_trend`] call.
    pub fn current_trend(&self) -> Trend {
        self.current_trend
    }

    /// Recompute and cache swing points with `lookback`.
    pub fn identify_swing_points(&mut self, lookback: Period) -> &SwingPoints {
        let swings = find_swing_points(self.bars, lookback);
        debug!(
            lookback = lookback.get(),
            swing_highs = swings.highs.len(),
            swing_lows = swings.lows.len(),
            "identified swing points"
        );
        self.swings.insert(swings)
    }

    /// Cached swing points, computing them with the configured lookback if absent.
    pub fn ensure_swing_points(&mut self) -> &SwingPoints {
        if self.swings.is_none() {
            let lookback = self.params.lookback;
            self.identify_swing_points(lookback);
        }
        self.swings.get_or_insert_with(SwingPoints::default)
    }

    /// Classify the trend from cached swing points and store it as the current trend.
    pub fn identify_trend(&mut self) -> Trend {
        let bars = self.bars;
        let trend = classify_trend(bars, self.ensure_swing_points());
        self.current_trend = trend;
        trend
    }

    /// Check whether the close at `index` breaks the last swing extreme.
    ///
    /// Uses the current trend as stored by the last [`StructureEngine::identify_trend`]
    /// call. Upward breaks are checked first.
    pub fn detect_structure_break(&mut self, index: usize) -> Option<StructureBreak> {
        let bars = self.bars;
        let trend = self.current_trend;
        let close = bars.get(index)?.close();
        let swings = self.ensure_swing_points();

        if matches!(trend, Trend::Bearish | Trend::Ranging) {
            if let Some(&last) = swings.highs.last() {
                if close > bars[last].high() {
                    return Some(match trend {
                        Trend::Bearish => StructureBreak::ChangeOfCharacter,
                        _ => StructureBreak::BreakOfStructure,
                    });
                }
            }
        }

        if matches!(trend, Trend::Bullish | Trend::Ranging) {
            if let Some(&last) = swings.lows.last() {
                if close < bars[last].low() {
                    return Some(match trend {
                        Trend::Bullish => StructureBreak::ChangeOfCharacter,
                        _ => StructureBreak::BreakOfStructure,
                    });
                }
            }
        }

        None
    }

    /// Run [`StructureEngine::detect_structure_break`] over a range of indices.
    pub fn detect_structure_breaks(&mut self, range: Range<usize>) -> Vec<(usize, StructureBreak)> {
        let end = range.end.min(self.bars.len());
        let breaks: Vec<_> = (range.start..end)
            .filter_map(|i| self.detect_structure_break(i).map(|b| (i, b)))
            .collect();
        trace!(breaks = breaks.len(), trend = %self.current_trend, "scanned structure breaks");
        breaks
    }

    /// Recompute swing points and trend, then summarize.
    pub fn get_market_structure_summary(&mut self) -> StructureSummary {
        let bars = self.bars;
        let lookback = self.params.lookback;
        self.identify_swing_points(lookback);
        let trend = self.identify_trend();
        let swings = self.ensure_swing_points();

        StructureSummary {
            trend,
            swing_highs_count: swings.highs.len(),
            swing_lows_count: swings.lows.len(),
            last_swing_high: swings.highs.last().map(|&i| bars[i].high()),
            last_swing_low: swings.lows.last().map(|&i| bars[i].low()),
        }
    }
}

// ============================================================
// TESTS
// ============================================================
