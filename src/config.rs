//! Simulation configuration supplied by the UI layer.

use crate::selection::SelectionMethod;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Parameters of one scoring + selection + backtest run.
///
/// The core never reaches for shared caches or global state; everything a
/// run depends on arrives through this struct and the price table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Index whose constituents form the candidate universe; also labels
    /// the benchmark row of the metrics table.
    pub index_code: String,

    /// Months of history before the test start used for training
    #[serde(default = "default_training_months")]
    pub training_months: u32,

    /// First date of the test window
    pub test_start: NaiveDate,

    /// Score used to rank candidate pairs
    #[serde(default = "default_method")]
    pub method: SelectionMethod,

    /// Rolling window length for spread statistics (days)
    #[serde(default = "default_window_size")]
    pub window_size: usize,

    /// Z-score distance from the rolling mean that opens a position
    #[serde(default = "default_open_threshold")]
    pub open_threshold: f64,

    /// Z-score distance that closes a position (at most open_threshold)
    #[serde(default = "default_close_threshold")]
    pub close_threshold: f64,

    /// How many disjoint pairs to trade
    #[serde(default = "default_top_n")]
    pub top_n: usize,

    /// Concurrent scoring workers
    #[serde(default = "default_scoring_workers")]
    pub scoring_workers: usize,
}

// Default value functions for serde
fn default_training_months() -> u32 {
    12
}
fn default_method() -> SelectionMethod {
    SelectionMethod::Mdm
}
fn default_window_size() -> usize {
    10
}
fn default_open_threshold() -> f64 {
    2.0
}
fn default_close_threshold() -> f64 {
    0.5
}
fn default_top_n() -> usize {
    5
}
fn default_scoring_workers() -> usize {
    crate::scoring::DEFAULT_SCORING_WORKERS
}

impl SimulationConfig {
    /// Validate structural constraints before any computation starts.
    pub fn validate(&self) -> Result<(), String> {
        if self.index_code.is_empty() {
            return Err("index_code cannot be empty".to_string());
        }
        if self.training_months == 0 {
            return Err("training_months must be at least 1".to_string());
        }
        if self.window_size == 0 {
            return Err("window_size must be at least 1".to_string());
        }
        if !self.open_threshold.is_finite() || self.open_threshold <= 0.0 {
            return Err(format!(
                "open_threshold must be positive, got {}",
                self.open_threshold
            ));
        }
        if !self.close_threshold.is_finite() || self.close_threshold < 0.0 {
            return Err(format!(
                "close_threshold cannot be negative, got {}",
                self.close_threshold
            ));
        }
        if self.close_threshold > self.open_threshold {
            return Err(format!(
                "close_threshold {} must not exceed open_threshold {}",
                self.close_threshold, self.open_threshold
            ));
        }
        if self.top_n == 0 {
            return Err("top_n must be at least 1".to_string());
        }
        if self.scoring_workers == 0 {
            return Err("scoring_workers must be at least 1".to_string());
        }
        Ok(())
    }
}
