//! End-to-end simulation pipeline.
//!
//! Wires the stages together: score every admissible pair, select the
//! top disjoint candidates, generate spread signals, aggregate the
//! backtest, and reduce the equity curves to summary metrics. Structural
//! configuration errors are rejected before any computation; statistical
//! edge cases flow through as undefined values.

use crate::backtest::{simulate, PerformanceRecord};
use crate::config::SimulationConfig;
use crate::data::PriceTable;
use crate::error::PairTraderError;
use crate::performance::{performance_metrics, PerformanceMetrics};
use crate::scoring::{score_all_pairs, PairId, ScoredPair};
use crate::selection::select_top_n;
use crate::signal::generate_position_matrix;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

/// Everything the presentation layer consumes from one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationReport {
    /// Score table for every admissible pair
    pub scores: Vec<ScoredPair>,
    /// The security-disjoint pairs the strategy traded
    pub selected: Vec<ScoredPair>,
    /// Strategy and benchmark equity, normalized to 1.0 at test start
    pub performance: Vec<PerformanceRecord>,
    /// Sharpe and drawdown per curve
    pub metrics: Vec<PerformanceMetrics>,
}

/// Score every admissible pair of the price table's tradable securities.
pub async fn score_pairs(
    prices: &PriceTable,
    workers: usize,
) -> Result<Vec<ScoredPair>, PairTraderError> {
    score_all_pairs(Arc::new(prices.returns()), workers).await
}

/// Run the full scoring, selection, and backtest pipeline.
pub async fn run_simulation(
    prices: &PriceTable,
    config: &SimulationConfig,
) -> Result<SimulationReport, PairTraderError> {
    config.validate().map_err(PairTraderError::InvalidConfig)?;

    let returns = Arc::new(prices.returns());
    let test_returns = returns.from_date(config.test_start);
    if test_returns.is_empty() {
        return Err(PairTraderError::InsufficientData {
            expected: 1,
            actual: 0,
        });
    }

    info!(
        index = %config.index_code,
        method = %config.method,
        test_start = %config.test_start,
        window = config.window_size,
        "Starting pair-trading simulation"
    );

    let scores = score_all_pairs(Arc::clone(&returns), config.scoring_workers).await?;
    let selected = select_top_n(&scores, config.method, config.top_n);

    let pair_ids: Vec<PairId> = selected.iter().map(|s| s.pair.clone()).collect();
    let positions = generate_position_matrix(
        prices,
        &pair_ids,
        config.test_start,
        config.window_size,
        config.open_threshold,
        config.close_threshold,
    )?;

    let performance = simulate(&positions, &test_returns)?;
    let metrics = performance_metrics(&performance, config.method.as_str(), &config.index_code);

    info!(
        scored = scores.len(),
        selected = selected.len(),
        test_days = performance.dates().len(),
        "Simulation complete"
    );

    Ok(SimulationReport {
        scores,
        selected,
        performance: performance.records(),
        metrics,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::INDEX_COLUMN;
    use crate::selection::SelectionMethod;
    use chrono::NaiveDate;

    fn date(day: u32) -> NaiveDate {
        // 40 consecutive days spanning two months
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + chrono::Days::new(day as u64 - 1)
    }

    fn synthetic_prices() -> PriceTable {
        let n = 40usize;
        let dates: Vec<NaiveDate> = (1..=n as u32).map(date).collect();
        let wobble = |i: usize, phase: usize| ((i * 31 + phase) % 11) as f64 / 10.0;
        let mut columns = Vec::new();
        for (c, code) in ["AAA", "BBB", "CCC", "DDD"].iter().enumerate() {
            let prices: Vec<f64> = (0..n)
                .map(|i| 100.0 + (c as f64 + 1.0) * wobble(i, c * 3) + i as f64 * 0.1)
                .collect();
            columns.push((code.to_string(), prices));
        }
        columns.push((
            INDEX_COLUMN.to_string(),
            (0..n).map(|i| 1000.0 + i as f64 + wobble(i, 7)).collect(),
        ));
        PriceTable::new(dates, columns).unwrap()
    }

    fn config() -> SimulationConfig {
        serde_json::from_str(
            r#"{"index_code": "SPX", "test_start": "2024-01-20", "window_size": 5,
                "open_threshold": 1.0, "close_threshold": 0.1, "top_n": 2,
                "scoring_workers": 4}"#,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_invalid_config_rejected_before_scoring() {
        let prices = synthetic_prices();
        let bad = SimulationConfig {
            close_threshold: 5.0,
            ..config()
        };
        let result = run_simulation(&prices, &bad).await;
        assert!(matches!(result, Err(PairTraderError::InvalidConfig(_))));
    }

    #[tokio::test]
    async fn test_report_shape_and_normalization() {
        let prices = synthetic_prices();
        let report = run_simulation(&prices, &config()).await.unwrap();

        // 4 tradable securities -> 6 admissible pairs.
        assert_eq!(report.scores.len(), 6);
        assert!(report.selected.len() <= 2);

        // Disjointness invariant.
        let mut seen = std::collections::HashSet::new();
        for entry in &report.selected {
            assert!(seen.insert(entry.pair.first().to_string()));
            assert!(seen.insert(entry.pair.second().to_string()));
        }

        // Both curves start at exactly 1.0.
        let first = &report.performance[0];
        assert_eq!(first.strategy, 1.0);
        assert_eq!(first.index, 1.0);
        assert_eq!(report.metrics.len(), 2);
    }

    #[tokio::test]
    async fn test_deterministic_across_runs() {
        let prices = synthetic_prices();
        let a = run_simulation(&prices, &config()).await.unwrap();
        let b = run_simulation(&prices, &config()).await.unwrap();
        assert_eq!(
            serde_json::to_string(&a).unwrap(),
            serde_json::to_string(&b).unwrap()
        );
    }

    #[tokio::test]
    async fn test_test_start_beyond_data_rejected() {
        let prices = synthetic_prices();
        let late = SimulationConfig {
            test_start: NaiveDate::from_ymd_opt(2030, 1, 1).unwrap(),
            method: SelectionMethod::Granger,
            ..config()
        };
        let result = run_simulation(&prices, &late).await;
        assert!(matches!(
            result,
            Err(PairTraderError::InsufficientData { .. })
        ));
    }
}
