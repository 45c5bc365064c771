//! Analysis engines
//!
//! Each engine owns one independent pass over the same read-only candle slice.
//!
//! # Engines
//!
//! - **Structure**: swing highs/lows, trend regime, break of structure / change of character
//! - **Order blocks**: last opposite candle before a strong move, tracked until tested or broken
//! - **Liquidity**: clusters of equal highs/lows and the sweeps that later run them

pub mod helpers;

pub mod liquidity;
pub mod order_blocks;
pub mod structure;

// Re-export all engines for convenience
pub use helpers::*;
pub use liquidity::*;
pub use order_blocks::*;
pub use structure::*;
