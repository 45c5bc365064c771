//! Run a full analysis over generated sample data and print the results.
//!
//! ```text
//! RUST_LOG=ictscan=debug cargo run --example basic_usage
//! ```

use std::error::Error;

use ictscan::prelude::*;
use rand::{rngs::StdRng, Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use tracing_subscriber::EnvFilter;

/// Seeded random walk that drifts up for the first half and down for the second
fn generate_sample_data(n: usize) -> std::result::Result<Vec<Candle>, Box<dyn Error>> {
    let mut rng = StdRng::seed_from_u64(42);
    let step = Normal::<f64>::new(0.0, 1.0)?;
    let open_noise = Normal::<f64>::new(0.0, 0.3)?;
    let wick_noise = Normal::<f64>::new(0.0, 0.5)?;

    let mut bars = Vec::with_capacity(n);
    let mut close: f64 = 100.0;
    for i in 0..n {
        if i > 0 {
            let drift = if i <= n / 2 { 0.05 } else { -0.05 };
            close += drift + step.sample(&mut rng);
        }

        let open = close + open_noise.sample(&mut rng);
        let high = open.max(close) + wick_noise.sample(&mut rng).abs();
        let low = open.min(close) - wick_noise.sample(&mut rng).abs();
        let volume = rng.gen_range(1000..10000) as f64;
        bars.push(Candle::new(open, high, low, close).with_volume(volume));
    }
    Ok(bars)
}

fn main() -> std::result::Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("Generating sample market data...");
    let bars = generate_sample_data(150)?;

    let mut analyzer = AnalyzerBuilder::new().validate_data(true).build(&bars)?;

    println!("\nPerforming comprehensive analysis...\n");
    println!("{}", analyzer.get_analysis_summary());

    let results = analyzer.analyze(AnalyzeOptions::default());

    println!("\n\nDETAILED RESULTS:");
    println!("{}", "=".repeat(50));

    println!("\nOrder Blocks Identified: {}", results.order_blocks.len());
    println!("Active Order Blocks: {}", results.active_order_blocks.len());
    if !results.active_order_blocks.is_empty() {
        println!("\nActive Order Blocks Details:");
        for (i, ob) in results.active_order_blocks.iter().take(5).enumerate() {
            println!("  {}. {} OB at index {}", i + 1, ob.side.title(), ob.index);
            println!("     Range: {:.2} - {:.2}", ob.bottom, ob.top);
            println!("     Tested: {}", ob.tested);
        }
    }

    println!("\nLiquidity Zones Identified: {}", results.liquidity_zones.len());
    println!("Active Liquidity Zones: {}", results.active_liquidity_zones.len());
    if !results.active_liquidity_zones.is_empty() {
        println!("\nActive Liquidity Zones Details:");
        for (i, zone) in results.active_liquidity_zones.iter().take(5).enumerate() {
            println!("  {}. {} at {:.2}", i + 1, zone.side, zone.price);
            println!("     Strength: {} touches", zone.strength);
        }
    }

    println!("\nLiquidity Sweeps Detected: {}", results.liquidity_sweeps.len());
    if !results.liquidity_sweeps.is_empty() {
        println!("\nRecent Liquidity Sweeps:");
        let skip = results.liquidity_sweeps.len().saturating_sub(3);
        for (i, sweep) in results.liquidity_sweeps.iter().skip(skip).enumerate() {
            println!("  {}. {} at index {}", i + 1, sweep.kind, sweep.index);
            println!("     Price: {:.2}", sweep.price);
        }
    }

    let structure = analyzer.structure_mut();
    let breaks = structure.detect_structure_breaks(0..bars.len());
    println!("\nStructure Breaks: {}", breaks.len());
    for (index, kind) in breaks.iter().rev().take(3) {
        println!("  - {kind} at index {index}");
    }

    Ok(())
}
