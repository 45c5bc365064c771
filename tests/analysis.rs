//! Integration tests for the ictscan analysis engines and coordinator.
//!
//! These tests drive the public API over small hand-built candle series.

use ictscan::prelude::*;

/// Simple test bar structure
#[derive(Debug, Clone, Copy)]
struct TestBar {
    o: f64,
    h: f64,
    l: f64,
    c: f64,
}

impl TestBar {
    fn new(o: f64, h: f64, l: f64, c: f64) -> Self {
        Self { o, h, l, c }
    }

    /// Candle with open == close halfway between high and low
    fn doji(h: f64, l: f64) -> Self {
        let mid = (h + l) / 2.0;
        Self::new(mid, h, l, mid)
    }
}

impl OHLCV for TestBar {
    fn open(&self) -> f64 {
        self.o
    }

    fn high(&self) -> f64 {
        self.h
    }

    fn low(&self) -> f64 {
        self.l
    }

    fn close(&self) -> f64 {
        self.c
    }
}

/// Monotone series: close[i] = 100 + i
fn make_monotone(n: usize) -> Vec<TestBar> {
    (0..n)
        .map(|i| {
            let c = 100.0 + i as f64;
            TestBar::new(c - 0.5, c + 0.5, c - 1.0, c)
        })
        .collect()
}

/// Flat dojis, then a bearish candle at 5 and a strong bullish candle at 6
fn make_order_block_series() -> Vec<TestBar> {
    let mut bars: Vec<TestBar> = (0..5).map(|_| TestBar::doji(100.5, 99.5)).collect();
    bars.push(TestBar::new(100.0, 101.0, 98.0, 99.0));
    bars.push(TestBar::new(99.0, 105.0, 99.0, 104.0));
    bars.push(TestBar::doji(104.5, 103.5));
    bars
}

/// Stepped filler with equal highs at 10 and 12 and a buy-side sweep at 15
fn make_liquidity_series() -> Vec<TestBar> {
    let mut bars: Vec<TestBar> = (0..20)
        .map(|i| {
            let b = 100.0 + i as f64;
            TestBar::new(b - 1.0, b, b - 2.0, b - 0.5)
        })
        .collect();
    bars[10] = TestBar::new(149.0, 150.0, 148.0, 149.5);
    bars[12] = TestBar::new(149.2, 150.1, 148.5, 150.05);
    bars[15] = TestBar::new(149.5, 151.0, 148.8, 149.0);
    bars
}

const ZIGZAG_HIGHS: [f64; 13] = [
    10.0, 11.0, 13.0, 11.5, 10.5, 12.0, 14.0, 12.5, 11.5, 13.0, 15.0, 14.0, 13.0,
];

/// Higher highs and higher lows with lookback 2, plus two bullish order blocks
fn make_bullish_series() -> Vec<TestBar> {
    let mut bars: Vec<TestBar> = ZIGZAG_HIGHS
        .iter()
        .map(|&h| TestBar::doji(h, h - 2.0))
        .collect();
    // block anchored at 3: top 11.5, bottom 9.5
    bars[3] = TestBar::new(10.8, 11.5, 9.5, 10.0);
    bars[4] = TestBar::new(8.8, 10.5, 8.5, 10.2);
    // block anchored at 7: top 12.5, bottom 10.5
    bars[7] = TestBar::new(12.0, 12.5, 10.5, 11.0);
    bars[8] = TestBar::new(9.8, 11.5, 9.5, 11.3);
    bars
}

/// Reflect a series around 15.0: bullish candles become bearish, highs become lows
fn mirror(bars: &[TestBar]) -> Vec<TestBar> {
    bars.iter()
        .map(|b| TestBar::new(30.0 - b.o, 30.0 - b.l, 30.0 - b.h, 30.0 - b.c))
        .collect()
}

/// Lower highs and lower lows with lookback 2, plus two bearish order blocks
/// (anchored at 3 and 7) and equal-low zones at 16, 17 and 18.5
fn make_bearish_series() -> Vec<TestBar> {
    mirror(&make_bullish_series())
}

fn analyzer(bars: &[TestBar], lookback: usize) -> AnalysisCoordinator<'_, TestBar> {
    AnalyzerBuilder::new()
        .lookback(lookback)
        .build(bars)
        .expect("valid config")
}

// ============================================================
// MARKET STRUCTURE
// ============================================================

#[test]
fn test_monotone_series_has_no_swings() {
    let bars = make_monotone(9);
    let mut engine = StructureEngine::new(&bars);
    let swings = engine.identify_swing_points(Period::new(2).unwrap());
    assert!(swings.highs.is_empty());
    assert!(swings.lows.is_empty());
    assert_eq!(engine.identify_trend(), Trend::Ranging);
}

#[test]
fn test_zigzag_swings_and_trend() {
    let bars = make_bullish_series();
    let mut a = analyzer(&bars, 2);
    let summary = a.structure_mut().get_market_structure_summary();
    assert_eq!(summary.trend, Trend::Bullish);
    assert_eq!(summary.swing_highs_count, 3);
    assert_eq!(summary.swing_lows_count, 2);
    assert_eq!(summary.last_swing_high, Some(15.0));
    assert_eq!(summary.last_swing_low, Some(9.5));

    let swings = a.structure().swing_points().unwrap();
    assert_eq!(swings.highs, vec![2, 6, 10]);
    assert_eq!(swings.lows, vec![4, 8]);
}

#[test]
fn test_short_series_is_ranging() {
    let bars = make_monotone(4);
    let mut a = analyzer(&bars, 2);
    let report = a.analyze(AnalyzeOptions::default());
    assert_eq!(report.market_structure.trend, Trend::Ranging);
    assert_eq!(report.market_structure.swing_highs_count, 0);
    assert_eq!(report.market_structure.last_swing_high, None);
}

// ============================================================
// ORDER BLOCKS
// ============================================================

#[test]
fn test_single_bullish_order_block() {
    let bars = make_order_block_series();
    let mut engine = OrderBlockEngine::new(&bars);
    let blocks = engine.identify().to_vec();

    assert_eq!(blocks.len(), 1);
    let block = blocks[0];
    assert_eq!(block.index, 5);
    assert_eq!(block.side, BlockSide::Bullish);
    assert_eq!(block.top, 101.0);
    assert_eq!(block.bottom, 98.0);
    assert!(!block.tested);
    assert!(!block.broken);

    let active = engine.get_active_order_blocks();
    assert_eq!(active.len(), 1);
    // candle 6 dips to 99 inside the block
    assert!(active[0].tested);
}

#[test]
fn test_close_below_block_breaks_it() {
    let mut bars = make_order_block_series();
    bars.push(TestBar::new(104.0, 104.5, 89.0, 90.0));

    let mut engine = OrderBlockEngine::new(&bars);
    assert_eq!(engine.identify().len(), 1);

    engine.update_order_block_status();
    assert!(engine.order_blocks()[0].broken);
    assert!(engine.get_active_order_blocks().is_empty());
    assert!(engine.get_nearest_order_block(100.0, None).is_none());
}

#[test]
fn test_nearest_order_block_prefers_containing_block() {
    let bars = make_bullish_series();
    let mut engine = OrderBlockEngine::new(&bars);
    engine.identify();

    let inside = engine.get_nearest_order_block(12.0, None).unwrap();
    assert_eq!(inside.index, 7);
    let below = engine.get_nearest_order_block(9.0, Some(BlockSide::Bullish)).unwrap();
    assert_eq!(below.index, 3);
    assert!(engine.get_nearest_order_block(9.0, Some(BlockSide::Bearish)).is_none());
}

// ============================================================
// LIQUIDITY
// ============================================================

#[test]
fn test_equal_highs_merge_into_one_zone() {
    let bars = make_liquidity_series();
    let mut engine = LiquidityEngine::new(&bars);
    let zones = engine.identify().to_vec();

    assert_eq!(zones.len(), 1);
    assert_eq!(zones[0].index, 10);
    assert_eq!(zones[0].side, LiquiditySide::BuySide);
    assert_eq!(zones[0].price, 150.0);
    assert_eq!(zones[0].strength, 2);
}

#[test]
fn test_wick_through_and_close_back_sweeps_zone() {
    let bars = make_liquidity_series();
    let mut engine = LiquidityEngine::new(&bars);
    engine.identify();

    let sweeps = engine.detect_liquidity_sweeps();
    assert_eq!(sweeps.len(), 1);
    assert_eq!(sweeps[0].index, 15);
    assert_eq!(sweeps[0].kind, SweepKind::BuySideSweep);
    assert_eq!(sweeps[0].price, 150.0);
    assert_eq!(sweeps[0].wick_extreme, 151.0);
    assert_eq!(sweeps[0].close, 149.0);

    assert!(engine.liquidity_zones()[0].swept);
    assert!(engine.get_active_liquidity_zones().is_empty());
    assert!(engine.detect_liquidity_sweeps().is_empty());
}

#[test]
fn test_analyze_snapshots_zones_before_sweeps() {
    let bars = make_liquidity_series();
    let mut a = AnalysisCoordinator::new(&bars);
    let report = a.analyze(AnalyzeOptions::default());

    assert_eq!(report.liquidity_zones.len(), 1);
    assert!(!report.liquidity_zones[0].swept);
    assert_eq!(report.active_liquidity_zones.len(), 1);
    assert_eq!(report.liquidity_sweeps.len(), 1);
    assert!(a.liquidity().get_active_liquidity_zones().is_empty());
}

#[test]
fn test_sweeps_without_zone_pass_find_nothing() {
    let bars = make_liquidity_series();
    let mut a = AnalysisCoordinator::new(&bars);
    let report = a.analyze(AnalyzeOptions {
        identify_liquidity_zones: false,
        ..AnalyzeOptions::default()
    });
    assert!(report.liquidity_zones.is_empty());
    assert!(report.liquidity_sweeps.is_empty());
}

// ============================================================
// TRADING BIAS
// ============================================================

#[test]
fn test_bullish_bias_levels() {
    let bars = make_bullish_series();
    let mut a = analyzer(&bars, 2);
    let report = a.analyze(AnalyzeOptions::default());
    assert_eq!(report.order_blocks.len(), 2);
    assert_eq!(report.active_order_blocks.len(), 2);

    let bias = a.get_trading_bias();
    assert_eq!(bias.bias, Direction::Bullish);
    assert_eq!(bias.confidence, Confidence::Medium);
    assert_eq!(bias.trend, Trend::Bullish);
    assert_eq!(
        bias.key_levels,
        vec![
            KeyLevel::new(LevelKind::Support, 12.5),
            KeyLevel::new(LevelKind::Resistance, 13.0),
        ]
    );
    assert_eq!(
        bias.reasoning,
        vec![
            "Market structure is bullish (higher highs and higher lows)".to_string(),
            "Bullish order block support at 12.50".to_string(),
            "Buy-side liquidity target at 13.00".to_string(),
        ]
    );
}

#[test]
fn test_bullish_support_uses_signed_gap() {
    // Last close is 12.0. The block topped at 11.5 is as close in absolute
    // terms (0.5) and comes first, but the signed gap picks the one at 12.5.
    let bars = make_bullish_series();
    let mut a = analyzer(&bars, 2);
    a.analyze(AnalyzeOptions::default());

    let bias = a.get_trading_bias();
    assert_eq!(bias.level(LevelKind::Support), Some(12.5));
}

#[test]
fn test_bearish_bias_levels() {
    let bars = make_bearish_series();
    let mut a = analyzer(&bars, 2);
    let report = a.analyze(AnalyzeOptions::default());
    assert_eq!(report.market_structure.trend, Trend::Bearish);
    assert_eq!(report.active_order_blocks.len(), 2);
    assert!(report
        .active_order_blocks
        .iter()
        .all(|b| b.side == BlockSide::Bearish));
    // buy-side zones are scanned first: 20.5 is swept by candle 4, then the
    // equal lows at 18.5 by candle 5
    let sweeps: Vec<(usize, SweepKind, f64)> = report
        .liquidity_sweeps
        .iter()
        .map(|s| (s.index, s.kind, s.price))
        .collect();
    assert_eq!(
        sweeps,
        vec![(4, SweepKind::BuySideSweep, 20.5), (5, SweepKind::SellSideSweep, 18.5)]
    );

    let bias = a.get_trading_bias();
    assert_eq!(bias.bias, Direction::Bearish);
    assert_eq!(bias.confidence, Confidence::Medium);
    assert_eq!(bias.trend, Trend::Bearish);
    assert_eq!(
        bias.key_levels,
        vec![
            KeyLevel::new(LevelKind::Resistance, 17.5),
            KeyLevel::new(LevelKind::Support, 17.0),
        ]
    );
    assert_eq!(
        bias.reasoning,
        vec![
            "Market structure is bearish (lower highs and lower lows)".to_string(),
            "Bearish order block resistance at 17.50".to_string(),
            "Sell-side liquidity target at 17.00".to_string(),
        ]
    );
}

#[test]
fn test_bearish_resistance_uses_signed_gap() {
    // Last close is 18.0. The block with bottom 18.5 comes first and is as
    // close in absolute terms (0.5), but `bottom - close` picks the one at 17.5.
    let bars = make_bearish_series();
    let mut a = analyzer(&bars, 2);
    a.analyze(AnalyzeOptions::default());

    let blocks = a.order_blocks().order_blocks();
    assert_eq!(blocks[0].bottom, 18.5);
    assert_eq!(blocks[1].bottom, 17.5);
    assert_eq!(a.get_trading_bias().level(LevelKind::Resistance), Some(17.5));
}

#[test]
fn test_ranging_bias_has_no_levels() {
    let bars = make_monotone(30);
    let mut a = AnalysisCoordinator::new(&bars);
    a.analyze(AnalyzeOptions::default());

    let bias = a.get_trading_bias();
    assert_eq!(bias.bias, Direction::Neutral);
    assert_eq!(bias.confidence, Confidence::Low);
    assert!(bias.key_levels.is_empty());
    assert_eq!(bias.reasoning, vec!["Market is ranging - wait for clear direction".to_string()]);
}

// ============================================================
// SUMMARY & SERIALIZATION
// ============================================================

#[test]
fn test_analysis_summary() {
    let bars = make_bullish_series();
    let mut a = analyzer(&bars, 2);
    let text = a.get_analysis_summary();

    assert!(text.starts_with(&"=".repeat(50)));
    assert_eq!(text.lines().nth(1), Some("OTHERS ANALYSIS SUMMARY"));
    assert!(text.contains("Market Trend: BULLISH"));
    assert!(text.contains("Swing Highs: 3"));
    assert!(text.contains("Swing Lows: 2"));
    assert!(text.contains("Total Order Blocks: 2"));
    assert!(text.contains("    - Bullish OB: 9.50 - 11.50"));
    assert!(text.contains("  Direction: BULLISH"));
    assert!(text.contains("    - Support: 12.50"));
    assert!(text.contains("    - Resistance: 13.00"));
    assert!(text.ends_with(&"=".repeat(50)));
}

#[test]
fn test_report_serializes_with_snake_case_tags() {
    let bars = make_liquidity_series();
    let mut a = AnalysisCoordinator::new(&bars);
    let report = a.analyze(AnalyzeOptions::default());

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["market_structure"]["trend"], "ranging");
    assert_eq!(json["liquidity_zones"][0]["type"], "buy_side");
    assert_eq!(json["liquidity_sweeps"][0]["type"], "buy_side_sweep");
}

#[test]
fn test_records_from_json() {
    let json = r#"[
        {"open": 1.0, "high": 2.0, "low": 0.5, "close": 1.5, "volume": 10.0},
        {"open": 1.5, "high": 2.5, "low": 1.0, "close": 2.0}
    ]"#;
    let records: Vec<CandleRecord> = serde_json::from_str(json).unwrap();
    let candles = candles_from_records(&records).unwrap();
    assert_eq!(candles.len(), 2);
    assert_eq!(candles[0].volume, Some(10.0));
    assert_eq!(candles[1].volume, None);

    let missing: Vec<CandleRecord> = serde_json::from_str(r#"[{"open": 1.0, "high": 2.0}]"#).unwrap();
    assert!(matches!(
        candles_from_records(&missing),
        Err(AnalysisError::Schema { index: 0, .. })
    ));
}

#[test]
fn test_config_from_json() {
    let config: AnalysisConfig =
        serde_json::from_str(r#"{"structure": {"lookback": 3}, "validate_data": true}"#).unwrap();
    assert_eq!(config.structure.lookback.get(), 3);
    assert_eq!(config.liquidity.tolerance.get(), 0.001);
    assert!(config.validate_data);

    assert!(serde_json::from_str::<AnalysisConfig>(r#"{"structure": {"lookback": 0}}"#).is_err());
}
