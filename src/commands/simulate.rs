//! Simulate command handler.
//!
//! Implements the `simulate` subcommand: run the full scoring, selection
//! and backtest pipeline over a price CSV and report the results.

use crate::config::SimulationConfig;
use crate::data::loader::load_price_csv;
use crate::error::PairTraderError;
use crate::pipeline::run_simulation;
use std::path::Path;
use tracing::info;

/// Run the full pipeline and print the selection and metrics tables.
pub async fn run_simulate(
    prices_path: &Path,
    config: &SimulationConfig,
    output_path: Option<&Path>,
) -> Result<(), PairTraderError> {
    let prices = load_price_csv(prices_path)?;
    let report = run_simulation(&prices, config).await?;

    println!(
        "\n=== SELECTED PAIRS (method: {}) ===",
        config.method.as_str()
    );
    println!(
        "{:<24} | {:>12} | {:>12} | {:>12}",
        "Pair", "MDM", "MFR", "G"
    );
    println!("{}", "-".repeat(68));
    for entry in &report.selected {
        println!(
            "{:<24} | {:>12.6} | {:>12.6} | {:>12.6}",
            entry.pair.to_string(),
            entry.score.mdm,
            entry.score.mfr,
            entry.score.granger
        );
    }

    println!("\n=== PERFORMANCE ===");
    println!("{:<12} | {:>10} | {:>10}", "Type", "Sharpe", "MDD");
    println!("{}", "-".repeat(38));
    for row in &report.metrics {
        println!(
            "{:<12} | {:>10.3} | {:>10.3}",
            row.label, row.sharpe, row.max_drawdown
        );
    }

    if let Some(last) = report.performance.last() {
        println!(
            "\nFinal equity: strategy {:.4}, {} {:.4} over {} test days",
            last.strategy,
            config.index_code,
            last.index,
            report.performance.len()
        );
    }

    if let Some(path) = output_path {
        let json = serde_json::to_string_pretty(&report)?;
        std::fs::write(path, json)?;
        info!(output = %path.display(), "Simulation report saved");
    }

    Ok(())
}
