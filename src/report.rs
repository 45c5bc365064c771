//! Analysis results, trading bias and the plain-text summary.

use crate::{
    engines::{LiquiditySweep, LiquidityZone, OrderBlock, StructureSummary},
    Confidence, Direction, Trend,
};

// ============================================================
// ANALYSIS REPORT
// ============================================================

/// Output of one [`crate::AnalysisCoordinator::analyze`] call
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct AnalysisReport {
    pub market_structure: StructureSummary,
    /// All identified blocks, with the flags they carried before the status refresh
    pub order_blocks: Vec<OrderBlock>,
    pub active_order_blocks: Vec<OrderBlock>,
    /// All identified zones, with the flags they carried before sweep detection
    pub liquidity_zones: Vec<LiquidityZone>,
    pub active_liquidity_zones: Vec<LiquidityZone>,
    pub liquidity_sweeps: Vec<LiquiditySweep>,
}

// ============================================================
// TRADING BIAS
// ============================================================

/// Role of a key level relative to price
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LevelKind {
    Support,
    Resistance,
}

impl LevelKind {
    pub fn title(self) -> &'static str {
        match self {
            LevelKind::Support => "Support",
            LevelKind::Resistance => "Resistance",
        }
    }
}

/// Named price level backing a bias
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct KeyLevel {
    pub kind: LevelKind,
    pub price: f64,
}

impl KeyLevel {
    pub fn new(kind: LevelKind, price: f64) -> Self {
        Self { kind, price }
    }
}

/// Directional bias with its supporting levels and reasons
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TradingBias {
    pub bias: Direction,
    pub confidence: Confidence,
    pub trend: Trend,
    /// Levels in the order they were found
    pub key_levels: Vec<KeyLevel>,
    pub reasoning: Vec<String>,
}

impl TradingBias {
    /// Neutral, low-confidence bias for `trend` with no levels or reasons
    pub fn new(trend: Trend) -> Self {
        Self {
            bias: Direction::Neutral,
            confidence: Confidence::Low,
            trend,
            key_levels: Vec::new(),
            reasoning: Vec::new(),
        }
    }

    /// First level of the given kind
    pub fn level(&self, kind: LevelKind) -> Option<f64> {
        self.key_levels.iter().find(|l| l.kind == kind).map(|l| l.price)
    }
}

// ============================================================
// SUMMARY
// ============================================================

const RULE_WIDTH: usize = 50;
const MAX_LISTED_BLOCKS: usize = 3;

/// Render the fixed-layout text summary.
pub fn format_summary(report: &AnalysisReport, bias: &TradingBias) -> String {
    let rule = "=".repeat(RULE_WIDTH);
    let structure = &report.market_structure;
    let mut lines: Vec<String> = Vec::new();

    lines.push(rule.clone());
    lines.push("OTHERS ANALYSIS SUMMARY".to_string());
    lines.push(rule.clone());
    lines.push(String::new());

    lines.push(format!("Market Trend: {}", structure.trend.as_str().to_uppercase()));
    lines.push(format!("Swing Highs: {}", structure.swing_highs_count));
    lines.push(format!("Swing Lows: {}", structure.swing_lows_count));
    lines.push(String::new());

    lines.push(format!("Total Order Blocks: {}", report.order_blocks.len()));
    lines.push(format!("Active Order Blocks: {}", report.active_order_blocks.len()));
    if !report.active_order_blocks.is_empty() {
        lines.push("  Active OBs:".to_string());
        for block in report.active_order_blocks.iter().take(MAX_LISTED_BLOCKS) {
            lines.push(format!(
                "    - {} OB: {:.2} - {:.2}",
                block.side.title(),
                block.bottom,
                block.top
            ));
        }
    }
    lines.push(String::new());

    lines.push(format!("Total Liquidity Zones: {}", report.liquidity_zones.len()));
    lines.push(format!("Active Liquidity Zones: {}", report.active_liquidity_zones.len()));
    lines.push(format!("Liquidity Sweeps Detected: {}", report.liquidity_sweeps.len()));
    lines.push(String::new());

    lines.push("TRADING BIAS:".to_string());
    lines.push(format!("  Direction: {}", bias.bias.as_str().to_uppercase()));
    lines.push(format!("  Confidence: {}", bias.confidence.as_str().to_uppercase()));
    if !bias.key_levels.is_empty() {
        lines.push("  Key Levels:".to_string());
        for level in &bias.key_levels {
            lines.push(format!("    - {}: {:.2}", level.kind.title(), level.price));
        }
    }
    lines.push(String::new());

    lines.push("  Reasoning:".to_string());
    for reason in &bias.reasoning {
        lines.push(format!("    - {reason}"));
    }
    lines.push(String::new());
    lines.push(rule);

    lines.join("\n")
}
