//! Risk-adjusted performance reduction of equity curves.

use crate::backtest::PerformanceSeries;
use serde::{Deserialize, Serialize};

/// Trading days per year for Sharpe annualization
const ANNUALIZATION_FACTOR: f64 = 252.0;

/// Summary metrics of one equity curve.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    #[serde(rename = "Type")]
    pub label: String,
    #[serde(rename = "Sharpe")]
    pub sharpe: f64,
    #[serde(rename = "MDD")]
    pub max_drawdown: f64,
}

/// Annualized Sharpe ratio of an equity curve: sqrt(252) times the mean
/// daily percentage change over its population standard deviation,
/// ignoring undefined days. A zero deviation yields an undefined value
/// rather than a crash; the caller decides how to present it.
pub fn sharpe_ratio(equity: &[f64]) -> f64 {
    let changes: Vec<f64> = equity
        .windows(2)
        .map(|w| (w[1] - w[0]) / w[0])
        .filter(|r| !r.is_nan())
        .collect();
    if changes.is_empty() {
        return f64::NAN;
    }

    let n = changes.len() as f64;
    let mean = changes.iter().sum::<f64>() / n;
    let variance = changes.iter().map(|r| (r - mean) * (r - mean)).sum::<f64>() / n;
    let std_dev = variance.sqrt();

    ANNUALIZATION_FACTOR.sqrt() * mean / std_dev
}

/// Simplified peak-to-trough drawdown: (max - min) / max over the whole
/// window, not a running-maximum drawdown. Preserved exactly as defined.
pub fn max_drawdown(equity: &[f64]) -> f64 {
    if equity.is_empty() || equity.iter().any(|v| v.is_nan()) {
        return f64::NAN;
    }
    let mut max = f64::NEG_INFINITY;
    let mut min = f64::INFINITY;
    for value in equity {
        if *value > max {
            max = *value;
        }
        if *value < min {
            min = *value;
        }
    }
    (max - min) / max
}

/// Reduce a performance series to one metrics row per curve. The
/// benchmark row comes first, mirroring the table the dashboard renders.
pub fn performance_metrics(
    series: &PerformanceSeries,
    strategy_label: &str,
    benchmark_label: &str,
) -> Vec<PerformanceMetrics> {
    vec![
        PerformanceMetrics {
            label: benchmark_label.to_string(),
            sharpe: sharpe_ratio(series.benchmark()),
            max_drawdown: max_drawdown(series.benchmark()),
        },
        PerformanceMetrics {
            label: strategy_label.to_string(),
            sharpe: sharpe_ratio(series.strategy()),
            max_drawdown: max_drawdown(series.strategy()),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_curve_has_undefined_sharpe() {
        let equity = vec![1.0; 10];
        assert!(sharpe_ratio(&equity).is_nan());
    }

    #[test]
    fn test_positive_drift_has_positive_sharpe() {
        let equity: Vec<f64> = (0..20).map(|i| 1.0 + 0.01 * i as f64 + 0.001 * (i % 3) as f64).collect();
        assert!(sharpe_ratio(&equity) > 0.0);
    }

    #[test]
    fn test_sharpe_ignores_undefined_days() {
        let clean = vec![1.0, 1.01, 1.03, 1.02, 1.05];
        let mut noisy = clean.clone();
        noisy.insert(2, f64::NAN);
        // A NAN day contributes two undefined changes; the remaining
        // changes still produce a finite ratio.
        assert!(sharpe_ratio(&noisy).is_finite());
    }

    #[test]
    fn test_short_curve_is_undefined() {
        assert!(sharpe_ratio(&[1.0]).is_nan());
        assert!(sharpe_ratio(&[]).is_nan());
    }

    #[test]
    fn test_max_drawdown_is_peak_to_trough_range() {
        // Range formula, not running-maximum: min before max still counts.
        let equity = vec![0.8, 1.0, 1.6, 1.2];
        assert!((max_drawdown(&equity) - (1.6 - 0.8) / 1.6).abs() < 1e-12);
    }

    #[test]
    fn test_max_drawdown_of_flat_curve_is_zero() {
        let equity = vec![1.0; 5];
        assert_eq!(max_drawdown(&equity), 0.0);
    }

    #[test]
    fn test_metrics_rows_cover_both_curves() {
        use crate::backtest::simulate;
        use crate::data::{PriceTable, INDEX_COLUMN};
        use crate::scoring::PairId;
        use crate::signal::generate_position_matrix;
        use chrono::NaiveDate;

        let date = |d: u32| NaiveDate::from_ymd_opt(2024, 1, d).unwrap();
        let table = PriceTable::new(
            (1..=5).map(date).collect(),
            vec![
                ("AAA".to_string(), vec![100.0, 101.0, 99.0, 100.0, 102.0]),
                ("BBB".to_string(), vec![50.0; 5]),
                (INDEX_COLUMN.to_string(), vec![1000.0, 1010.0, 990.0, 1000.0, 1005.0]),
            ],
        )
        .unwrap();
        let matrix = generate_position_matrix(
            &table,
            &[PairId::new("AAA", "BBB")],
            date(1),
            3,
            1.0,
            0.0,
        )
        .unwrap();
        let series = simulate(&matrix, &table.returns()).unwrap();
        let metrics = performance_metrics(&series, "MDM", "SPX");
        assert_eq!(metrics.len(), 2);
        assert_eq!(metrics[0].label, "SPX");
        assert_eq!(metrics[1].label, "MDM");
    }
}
