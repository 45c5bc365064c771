//! Order blocks: the last opposite-colored candle before a strong displacement.
//!
//! A bullish block is a down candle followed by an up candle whose body moves at
//! least `min_move` of its open; a bearish block mirrors it. Each block is then
//! tracked forward until price closes through it.

use std::collections::HashMap;

use tracing::{debug, trace};

use super::helpers::{body_move_fraction, first_min_by_key, DEFAULT_MIN_MOVE};
use crate::{
    params::{check_keys, from_owned_map, get_ratio, ParamMeta, ParameterizedEngine},
    AnalysisError, OHLCVExt, Ratio, Result, OHLCV,
};

// ============================================================
// TYPES
// ============================================================

/// Side of an order block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockSide {
    /// Down candle before an up move (demand)
    Bullish,
    /// Up candle before a down move (supply)
    Bearish,
}

impl BlockSide {
    pub fn as_str(self) -> &'static str {
        match self {
            BlockSide::Bullish => "bullish",
            BlockSide::Bearish => "bearish",
        }
    }

    /// Capitalized label used in reports
    pub fn title(self) -> &'static str {
        match self {
            BlockSide::Bullish => "Bullish",
            BlockSide::Bearish => "Bearish",
        }
    }
}

impl std::fmt::Display for BlockSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An order block zone anchored at a single candle
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct OrderBlock {
    /// Index of the anchor candle
    pub index: usize,
    #[serde(rename = "type")]
    pub side: BlockSide,
    /// Anchor candle high
    pub top: f64,
    /// Anchor candle low
    pub bottom: f64,
    pub volume: Option<f64>,
    /// Price wicked back into the zone at least once
    pub tested: bool,
    /// Price closed through the zone; never reverts
    pub broken: bool,
}

impl OrderBlock {
    #[inline]
    pub fn is_active(&self) -> bool {
        !self.broken
    }

    #[inline]
    pub fn contains_price(&self, price: f64) -> bool {
        self.bottom <= price && price <= self.top
    }

    /// Zero inside the zone, otherwise the gap to the nearest edge.
    #[inline]
    pub fn distance_to(&self, price: f64) -> f64 {
        if self.contains_price(price) {
            0.0
        } else {
            (price - self.top).abs().min((price - self.bottom).abs())
        }
    }
}

/// Parameters of the order block engine
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "HashMap<String, f64>")]
pub struct OrderBlockParams {
    /// Minimum body move of the displacement candle, as a fraction of its open
    pub min_move: Ratio,
}

impl Default for OrderBlockParams {
    fn default() -> Self {
        Self {
            min_move: Ratio::new_const(DEFAULT_MIN_MOVE),
        }
    }
}

const ORDER_BLOCK_PARAMS: &[ParamMeta] = &[ParamMeta::ratio(
    "min_move",
    DEFAULT_MIN_MOVE,
    (0.0, 1.0),
    "Minimum displacement body as a fraction of its open",
)];

impl OrderBlockParams {
    /// Check the current values against the parameter metadata.
    pub fn validate(&self) -> Result<()> {
        ORDER_BLOCK_PARAMS[0].validate(self.min_move.get())
    }
}

impl TryFrom<HashMap<String, f64>> for OrderBlockParams {
    type Error = AnalysisError;

    fn try_from(params: HashMap<String, f64>) -> Result<Self> {
        from_owned_map(params)
    }
}

impl ParameterizedEngine for OrderBlockParams {
    fn param_meta() -> &'static [ParamMeta] {
        ORDER_BLOCK_PARAMS
    }

    fn with_params(params: &HashMap<&str, f64>) -> Result<Self> {
        check_keys(params, ORDER_BLOCK_PARAMS, Self::engine_name())?;
        Ok(Self {
            min_move: get_ratio(params, &ORDER_BLOCK_PARAMS[0])?,
        })
    }

    fn engine_name() -> &'static str {
        "order_blocks"
    }
}

// ============================================================
// DETECTION PRIMITIVES
// ============================================================

/// Order block anchored at `index`, if the next candle displaces away from it.
pub fn detect_order_block<T: OHLCV>(bars: &[T], index: usize, min_move: Ratio) -> Option<OrderBlock> {
    let curr = bars.get(index)?;
    let next = bars.get(index + 1)?;

    let side = if curr.is_bearish() && next.is_bullish() {
        BlockSide::Bullish
    } else if curr.is_bullish() && next.is_bearish() {
        BlockSide::Bearish
    } else {
        return None;
    };

    if body_move_fraction(next.open(), next.close()) < min_move.get() {
        return None;
    }

    Some(OrderBlock {
        index,
        side,
        top: curr.high(),
        bottom: curr.low(),
        volume: curr.volume(),
        tested: false,
        broken: false,
    })
}

/// Scan forward from the block's anchor, setting `tested` and `broken`.
fn track_block<T: OHLCV>(bars: &[T], block: &mut OrderBlock) {
    for bar in bars.iter().skip(block.index + 1) {
        match block.side {
            BlockSide::Bullish => {
                if block.contains_price(bar.low()) {
                    block.tested = true;
                }
                if bar.close() < block.bottom {
                    block.broken = true;
                    break;
                }
            }
            BlockSide::Bearish => {
                if block.contains_price(bar.high()) {
                    block.tested = true;
                }
                if bar.close() > block.top {
                    block.broken = true;
                    break;
                }
            }
        }
    }
}

// ============================================================
// ENGINE
// ============================================================

/// Order block identification and lifecycle tracking over a borrowed candle slice
#[derive(Debug, Clone)]
pub struct OrderBlockEngine<'a, T: OHLCV> {
    bars: &'a [T],
    params: OrderBlockParams,
    blocks: Vec<OrderBlock>,
}

impl<'a, T: OHLCV> OrderBlockEngine<'a, T> {
    pub fn new(bars: &'a [T]) -> Self {
        Self::with_params(bars, OrderBlockParams::default())
    }

    pub fn with_params(bars: &'a [T], params: OrderBlockParams) -> Self {
        Self {
            bars,
            params,
            blocks: Vec::new(),
        }
    }

    pub fn params(&self) -> &OrderBlockParams {
        &self.params
    }

    /// All stored blocks, broken ones included.
    pub fn order_blocks(&self) -> &[OrderBlock] {
        &self.blocks
    }

    /// Identify blocks with the configured `min_move`.
    pub fn identify(&mut self) -> &[OrderBlock] {
        let min_move = self.params.min_move;
        self.identify_order_blocks(min_move)
    }

    /// Identify blocks anchored at `1..=n-2`, replacing any stored list.
    pub fn identify_order_blocks(&mut self, min_move: Ratio) -> &[OrderBlock] {
        let bars = self.bars;
        self.blocks = (1..bars.len().saturating_sub(1))
            .filter_map(|i| detect_order_block(bars, i, min_move))
            .collect();
        debug!(
            min_move = min_move.get(),
            order_blocks = self.blocks.len(),
            "identified order blocks"
        );
        &self.blocks
    }

    /// Refresh `tested`/`broken` for every block not yet broken.
    pub fn update_order_block_status(&mut self) {
        let bars = self.bars;
        for block in self.blocks.iter_mut().filter(|b| !b.broken) {
            track_block(bars, block);
            if block.broken {
                trace!(index = block.index, side = %block.side, "order block broken");
            }
        }
    }

    /// Refresh status, then return copies of the blocks that are not broken.
    pub fn get_active_order_blocks(&mut self) -> Vec<OrderBlock> {
        self.update_order_block_status();
        self.blocks.iter().filter(|b| b.is_active()).copied().collect()
    }

    /// Active block closest to `price`, optionally restricted to one side.
    pub fn get_nearest_order_block(&mut self, price: f64, side: Option<BlockSide>) -> Option<OrderBlock> {
        let active = self.get_active_order_blocks();
        first_min_by_key(
            active.into_iter().filter(|b| side.map_or(true, |s| b.side == s)),
            |b| b.distance_to(price),
        )
    }
}

// ============================================================
// TESTS
// ============================================================
