//! Parameter metadata for the analysis engines
//!
//! This module provides metadata about engine parameters, enabling:
//! - Parameter documentation
//! - Building engine parameters from untyped key/value maps
//!
//! Every way of configuring an engine (builder, key/value map, serde) ends in
//! [`ParamMeta::validate`], so all of them accept and reject the same values.
//!
//! # Example
//!
//! ```rust
//! use ictscan::params::ParameterizedEngine;
//! use ictscan::prelude::*;
//!
//! for param in LiquidityParams::param_meta() {
//!     println!("{}: {:?} (default: {})", param.name, param.param_type, param.default);
//! }
//! ```

use std::collections::HashMap;

use crate::{AnalysisError, Period, Ratio, Result};

// ============================================================
// PARAMETER TYPES
// ============================================================

/// Type of parameter value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
  /// Strictly positive fraction (price move or tolerance as a fraction of price)
  Ratio,
  /// Period value (positive integer, counted in candles)
  Period,
}

/// Metadata for a single engine parameter
#[derive(Debug, Clone)]
pub struct ParamMeta {
  /// Parameter name (e.g., "tolerance")
  pub name: &'static str,
  /// Parameter type (Ratio or Period)
  pub param_type: ParamType,
  /// Default value
  pub default: f64,
  /// Accepted bounds (min, max); the lower bound is exclusive for ratios
  pub range: (f64, f64),
  /// Human-readable description
  pub description: &'static str,
}

impl ParamMeta {
  /// Create a new ParamMeta for a Ratio parameter
  pub const fn ratio(
    name: &'static str,
    default: f64,
    range: (f64, f64),
    description: &'static str,
  ) -> Self {
    Self { name, param_type: ParamType::Ratio, default, range, description }
  }

  /// Create a new ParamMeta for a Period parameter
  pub const fn period(
    name: &'static str,
    default: f64,
    range: (f64, f64),
    description: &'static str,
  ) -> Self {
    Self { name, param_type: ParamType::Period, default, range, description }
  }

  /// Validate a value for this parameter
  pub fn validate(&self, value: f64) -> Result<()> {
    if value.is_nan() || value.is_infinite() {
      return Err(AnalysisError::InvalidValue("parameter cannot be NaN or infinite"));
    }
    let (min, max) = self.range;
    let below = match self.param_type {
      ParamType::Ratio => value <= min,
      ParamType::Period => value < min,
    };
    if below || value > max {
      return Err(AnalysisError::OutOfRange { field: self.name, value, min, max });
    }
    match self.param_type {
      ParamType::Ratio => Ok(()),
      ParamType::Period => {
        if value < 1.0 || value.fract() != 0.0 {
          return Err(AnalysisError::InvalidValue("Period must be a positive integer"));
        }
        Ok(())
      },
    }
  }
}

// ============================================================
// PARAMETERIZED ENGINE TRAIT
// ============================================================

/// Trait for engine parameter sets that can be built from untyped maps
///
/// Implementing this trait enables:
/// - Discovery of available parameters
/// - Creation of parameters from a config map
/// - Grid search over parameter values
pub trait ParameterizedEngine: Sized {
  /// Returns metadata for all configurable parameters
  fn param_meta() -> &'static [ParamMeta];

  /// Creates parameters from a HashMap
  ///
  /// Missing parameters use their default values. Keys this engine does not
  /// know are rejected.
  fn with_params(params: &HashMap<&str, f64>) -> Result<Self>;

  /// Returns the engine name used in diagnostics
  fn engine_name() -> &'static str;
}

// ============================================================
// PARAMETER VALUE HELPERS
// ============================================================

/// Reject keys that no parameter in `meta` declares
pub fn check_keys(params: &HashMap<&str, f64>, meta: &[ParamMeta], engine: &str) -> Result<()> {
  for key in params.keys() {
    if !meta.iter().any(|m| m.name == *key) {
      return Err(AnalysisError::InvalidConfig(format!("unknown parameter `{key}` for {engine}")));
    }
  }
  Ok(())
}

/// Helper to get a Ratio from params with default fallback, checked against `meta`
pub fn get_ratio(params: &HashMap<&str, f64>, meta: &ParamMeta) -> Result<Ratio> {
  let value = params.get(meta.name).copied().unwrap_or(meta.default);
  meta.validate(value)?;
  Ratio::new(value)
}

/// Helper to get a Period from params with default fallback, checked against `meta`
pub fn get_period(params: &HashMap<&str, f64>, meta: &ParamMeta) -> Result<Period> {
  let value = params.get(meta.name).copied().unwrap_or(meta.default);
  meta.validate(value)?;
  Period::new(value as usize)
}

/// Build engine parameters from an owned map, as produced by deserialization
pub fn from_owned_map<P: ParameterizedEngine>(params: HashMap<String, f64>) -> Result<P> {
  let borrowed: HashMap<&str, f64> = params.iter().map(|(k, v)| (k.as_str(), *v)).collect();
  P::with_params(&borrowed)
}

// ============================================================
// TESTS
// ============================================================
