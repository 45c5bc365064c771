//! Liquidity zones (equal highs / equal lows) and the sweeps that run them.
//!
//! Resting stops cluster above equal highs (buy-side liquidity) and below
//! equal lows (sell-side liquidity). A sweep is a single candle that wicks
//! through such a level and closes back on the original side.

use std::collections::HashMap;

use tracing::{debug, trace};

use super::helpers::{
    first_min_by_key, window_bounds, within_tolerance, DEFAULT_EQUAL_TOLERANCE, EQUAL_LEVEL_WINDOW,
};
use crate::{
    params::{check_keys, from_owned_map, get_ratio, ParamMeta, ParameterizedEngine},
    AnalysisError, Ratio, Result, OHLCV,
};

// ============================================================
// TYPES
// ============================================================

/// Side of a liquidity pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LiquiditySide {
    /// Buy stops resting above equal highs
    BuySide,
    /// Sell stops resting below equal lows
    SellSide,
}

impl LiquiditySide {
    pub fn as_str(self) -> &'static str {
        match self {
            LiquiditySide::BuySide => "buy_side",
            LiquiditySide::SellSide => "sell_side",
        }
    }
}

impl std::fmt::Display for LiquiditySide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A price level touched by several near-equal highs or lows
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct LiquidityZone {
    pub index: usize,
    #[serde(rename = "type")]
    pub side: LiquiditySide,
    pub price: f64,
    /// Number of near-equal touches, at least 1
    pub strength: u32,
    pub swept: bool,
}

impl LiquidityZone {
    #[inline]
    pub fn is_active(&self) -> bool {
        !self.swept
    }
}

/// Kind of liquidity sweep
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SweepKind {
    BuySideSweep,
    SellSideSweep,
}

impl SweepKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SweepKind::BuySideSweep => "buy_side_sweep",
            SweepKind::SellSideSweep => "sell_side_sweep",
        }
    }
}

impl From<LiquiditySide> for SweepKind {
    fn from(side: LiquiditySide) -> Self {
        match side {
            LiquiditySide::BuySide => SweepKind::BuySideSweep,
            LiquiditySide::SellSide => SweepKind::SellSideSweep,
        }
    }
}

impl std::fmt::Display for SweepKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A candle that wicked through a zone and closed back across it
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct LiquiditySweep {
    /// Index of the sweeping candle
    pub index: usize,
    #[serde(rename = "type")]
    pub kind: SweepKind,
    /// Zone price that was swept
    pub price: f64,
    /// Wick high for buy-side sweeps, wick low for sell-side sweeps
    pub wick_extreme: f64,
    pub close: f64,
}

/// Parameters of the liquidity engine
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "HashMap<String, f64>")]
pub struct LiquidityParams {
    /// Two levels are equal when they differ by at most this fraction of price
    pub tolerance: Ratio,
}

impl Default for LiquidityParams {
    fn default() -> Self {
        Self {
            tolerance: Ratio::new_const(DEFAULT_EQUAL_TOLERANCE),
        }
    }
}

const LIQUIDITY_PARAMS: &[ParamMeta] = &[ParamMeta::ratio(
    "tolerance",
    DEFAULT_EQUAL_TOLERANCE,
    (0.0, 1.0),
    "Maximum fractional gap between two levels counted as equal",
)];

impl LiquidityParams {
    /// Check the current values against the parameter metadata.
    pub fn validate(&self) -> Result<()> {
        LIQUIDITY_PARAMS[0].validate(self.tolerance.get())
    }
}

impl TryFrom<HashMap<String, f64>> for LiquidityParams {
    type Error = AnalysisError;

    fn try_from(params: HashMap<String, f64>) -> Result<Self> {
        from_owned_map(params)
    }
}

impl ParameterizedEngine for LiquidityParams {
    fn param_meta() -> &'static [ParamMeta] {
        LIQUIDITY_PARAMS
    }

    fn with_params(params: &HashMap<&str, f64>) -> Result<Self> {
        check_keys(params, LIQUIDITY_PARAMS, Self::engine_name())?;
        Ok(Self {
            tolerance: get_ratio(params, &LIQUIDITY_PARAMS[0])?,
        })
    }

    fn engine_name() -> &'static str {
        "liquidity"
    }
}

// ============================================================
// DETECTION PRIMITIVES
// ============================================================

/// Price of the level a zone of `side` is built from.
#[inline]
fn level<T: OHLCV>(bar: &T, side: LiquiditySide) -> f64 {
    match side {
        LiquiditySide::BuySide => bar.high(),
        LiquiditySide::SellSide => bar.low(),
    }
}

/// Raw zones for one side, one per qualifying index in increasing order.
fn raw_zones<T: OHLCV>(bars: &[T], side: LiquiditySide, tolerance: f64) -> Vec<LiquidityZone> {
    let len = bars.len();
    let mut zones = Vec::new();

    for i in 1..len.saturating_sub(1) {
        let price = level(&bars[i], side);
        let (start, end) = window_bounds(i, EQUAL_LEVEL_WINDOW, len);
        let matches = (start..end)
            .filter(|&j| j != i && within_tolerance(price, level(&bars[j], side), tolerance))
            .count() as u32;

        let strength = matches + 1;
        if strength >= 2 {
            zones.push(LiquidityZone {
                index: i,
                side,
                price,
                strength,
                swept: false,
            });
        }
    }

    zones
}

/// Merge zones of the same side whose prices are within `tolerance`.
///
/// Walks `raw` in order; a zone matching an accepted zone only raises that
/// zone's strength and is dropped.
pub fn dedup_zones(raw: Vec<LiquidityZone>, tolerance: f64) -> Vec<LiquidityZone> {
    let mut unique: Vec<LiquidityZone> = Vec::with_capacity(raw.len());

    for zone in raw {
        let existing = unique
            .iter_mut()
            .find(|e| e.side == zone.side && within_tolerance(zone.price, e.price, tolerance));
        match existing {
            Some(e) => e.strength = e.strength.max(zone.strength),
            None => unique.push(zone),
        }
    }

    unique
}

/// First candle after the zone that sweeps it, if any.
fn find_sweep<T: OHLCV>(bars: &[T], zone: &LiquidityZone) -> Option<LiquiditySweep> {
    bars.iter()
        .enumerate()
        .skip(zone.index + 1)
        .find_map(|(i, bar)| {
            let wick_extreme = match zone.side {
                LiquiditySide::BuySide if bar.high() > zone.price && bar.close() < zone.price => {
                    bar.high()
                }
                LiquiditySide::SellSide if bar.low() < zone.price && bar.close() > zone.price => {
                    bar.low()
                }
                _ => return None,
            };
            Some(LiquiditySweep {
                index: i,
                kind: zone.side.into(),
                price: zone.price,
                wick_extreme,
                close: bar.close(),
            })
        })
}

// ============================================================
// ENGINE
// ============================================================

/// Liquidity zone identification and sweep tracking over a borrowed candle slice
#[derive(Debug, Clone)]
pub struct LiquidityEngine<'a, T: OHLCV> {
    bars: &'a [T],
    params: LiquidityParams,
    zones: Vec<LiquidityZone>,
}

impl<'a, T: OHLCV> LiquidityEngine<'a, T> {
    pub fn new(bars: &'a [T]) -> Self {
        Self::with_params(bars, LiquidityParams::default())
    }

    pub fn with_params(bars: &'a [T], params: LiquidityParams) -> Self {
        Self {
            bars,
            params,
            zones: Vec::new(),
        }
    }

    pub fn params(&self) -> &LiquidityParams {
        &self.params
    }

    /// All stored zones, swept ones included.
    pub fn liquidity_zones(&self) -> &[LiquidityZone] {
        &self.zones
    }

    /// Identify zones with the configured tolerance.
    pub fn identify(&mut self) -> &[LiquidityZone] {
        let tolerance = self.params.tolerance;
        self.identify_equal_highs_lows(tolerance)
    }

    /// Identify equal highs (buy-side) then equal lows (sell-side), deduplicated per side.
    ///
    /// Replaces any stored zones.
    pub fn identify_equal_highs_lows(&mut self, tolerance: Ratio) -> &[LiquidityZone] {
        let tol = tolerance.get();
        let mut raw = raw_zones(self.bars, LiquiditySide::BuySide, tol);
        raw.extend(raw_zones(self.bars, LiquiditySide::SellSide, tol));
        let raw_count = raw.len();

        self.zones = dedup_zones(raw, tol);
        debug!(
            tolerance = tol,
            raw_zones = raw_count,
            liquidity_zones = self.zones.len(),
            "identified liquidity zones"
        );
        &self.zones
    }

    /// Mark zones swept by a later candle and return the new sweep events.
    ///
    /// Zones already swept are skipped, so each zone yields at most one event.
    pub fn detect_liquidity_sweeps(&mut self) -> Vec<LiquiditySweep> {
        let bars = self.bars;
        let mut sweeps = Vec::new();

        for zone in self.zones.iter_mut().filter(|z| !z.swept) {
            if let Some(sweep) = find_sweep(bars, zone) {
                zone.swept = true;
                trace!(zone = zone.index, at = sweep.index, kind = %sweep.kind, "liquidity swept");
                sweeps.push(sweep);
            }
        }

        debug!(sweeps = sweeps.len(), "detected liquidity sweeps");
        sweeps
    }

    /// Copies of the zones not yet swept. Does not run sweep detection.
    pub fn get_active_liquidity_zones(&self) -> Vec<LiquidityZone> {
        self.zones.iter().filter(|z| z.is_active()).copied().collect()
    }

    /// Active zone closest to `price`, optionally restricted to one side.
    pub fn get_nearest_liquidity(&self, price: f64, side: Option<LiquiditySide>) -> Option<LiquidityZone> {
        first_min_by_key(
            self.zones
                .iter()
                .filter(|z| z.is_active() && side.map_or(true, |s| z.side == s))
                .copied(),
            |z| (z.price - price).abs(),
        )
    }
}

// ============================================================
// TESTS
// ============================================================
