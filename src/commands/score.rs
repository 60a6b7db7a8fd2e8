//! Score command handler.
//!
//! Implements the `score` subcommand: load a dense price CSV, score
//! every admissible pair, print the table, and optionally write the
//! records as JSON.

use crate::data::loader::load_price_csv;
use crate::error::PairTraderError;
use crate::pipeline::score_pairs;
use std::path::Path;
use tracing::info;

/// Run pair scoring over a price CSV.
pub async fn run_score(
    prices_path: &Path,
    workers: usize,
    output_path: Option<&Path>,
) -> Result<(), PairTraderError> {
    let prices = load_price_csv(prices_path)?;
    let scores = score_pairs(&prices, workers).await?;

    println!(
        "\n{:<24} | {:>12} | {:>12} | {:>12}",
        "Pair", "MDM", "MFR", "G"
    );
    println!("{}", "-".repeat(68));
    for entry in &scores {
        println!(
            "{:<24} | {:>12.6} | {:>12.6} | {:>12.6}",
            entry.pair.to_string(),
            entry.score.mdm,
            entry.score.mfr,
            entry.score.granger
        );
    }

    if let Some(path) = output_path {
        let json = serde_json::to_string_pretty(&scores)?;
        std::fs::write(path, json)?;
        info!(output = %path.display(), pairs = scores.len(), "Score table saved");
    }

    Ok(())
}
