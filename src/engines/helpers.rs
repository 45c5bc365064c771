//! Common helper functions shared across the engines.

use std::cmp::Ordering;

// ============================================================
// CONSTANTS
// ============================================================

/// Default swing lookback, in candles on each side
pub const DEFAULT_SWING_LOOKBACK: usize = 5;
/// Default minimum body move of the displacement candle, as a fraction of its open
pub const DEFAULT_MIN_MOVE: f64 = 0.01;
/// Default tolerance for two levels to count as equal, as a fraction of price
pub const DEFAULT_EQUAL_TOLERANCE: f64 = 0.001;
/// Candles inspected on each side of a level when counting equal highs/lows
pub const EQUAL_LEVEL_WINDOW: usize = 5;

// ============================================================
// HELPER FUNCTIONS
// ============================================================

/// `other` is within `tolerance` of `reference`, measured as a fraction of `reference`.
///
/// The comparison is asymmetric: the denominator is always `reference`.
#[inline]
pub fn within_tolerance(reference: f64, other: f64, tolerance: f64) -> bool {
    (reference - other).abs() / reference <= tolerance
}

/// Absolute body move of a candle as a fraction of its open.
#[inline]
pub fn body_move_fraction(open: f64, close: f64) -> f64 {
    (close - open).abs() / open
}

/// Half-open index window `[index - radius, index + radius + 1)` clamped to `0..len`.
#[inline]
pub fn window_bounds(index: usize, radius: usize, len: usize) -> (usize, usize) {
    (index.saturating_sub(radius), (index + radius + 1).min(len))
}

/// Total order for prices. Candle data never carries NaN once validated.
#[inline]
pub fn cmp_f64(a: f64, b: f64) -> Ordering {
    a.total_cmp(&b)
}

/// First item minimizing `key`; on ties the earliest item wins.
pub fn first_min_by_key<I, F>(items: I, mut key: F) -> Option<I::Item>
where
    I: IntoIterator,
    F: FnMut(&I::Item) -> f64,
{
    items
        .into_iter()
        .map(|item| (key(&item), item))
        .min_by(|(a, _), (b, _)| cmp_f64(*a, *b))
        .map(|(_, item)| item)
}
