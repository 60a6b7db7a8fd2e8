//! CLI command handlers.
//!
//! This module contains the implementation for each CLI subcommand,
//! delegating to the scoring and simulation pipelines.

mod score;
mod simulate;

pub use score::run_score;
pub use simulate::run_simulate;
