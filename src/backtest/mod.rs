//! Backtest aggregation: lagged positions against realized returns.
//!
//! A position decided on day T's closing spread can only earn day T+1's
//! return, so the position matrix is shifted forward one day before it
//! meets the return table. Both equity curves start at exactly 1.0 on the
//! first test date.

use crate::data::{ReturnTable, INDEX_COLUMN};
use crate::error::PairTraderError;
use crate::signal::PositionMatrix;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Strategy and benchmark equity curves over the test window.
#[derive(Debug, Clone)]
pub struct PerformanceSeries {
    dates: Vec<NaiveDate>,
    strategy: Vec<f64>,
    benchmark: Vec<f64>,
}

/// One row of the performance table, the row-oriented interchange form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceRecord {
    pub date: NaiveDate,
    pub strategy: f64,
    pub index: f64,
}

impl PerformanceSeries {
    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn strategy(&self) -> &[f64] {
        &self.strategy
    }

    pub fn benchmark(&self) -> &[f64] {
        &self.benchmark
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn records(&self) -> Vec<PerformanceRecord> {
        self.dates
            .iter()
            .zip(self.strategy.iter().zip(self.benchmark.iter()))
            .map(|(date, (strategy, index))| PerformanceRecord {
                date: *date,
                strategy: *strategy,
                index: *index,
            })
            .collect()
    }
}

/// Aggregate lagged positions into equity curves.
///
/// `returns` must already be restricted to the test window and share its
/// date index with the position matrix. Daily strategy return is the sum
/// over securities of shifted position times realized return, skipping
/// undefined terms; equity compounds with undefined factors treated as
/// flat days.
pub fn simulate(
    positions: &PositionMatrix,
    returns: &ReturnTable,
) -> Result<PerformanceSeries, PairTraderError> {
    if positions.dates() != returns.dates() {
        return Err(PairTraderError::InvalidArgument(
            "position matrix and return table cover different dates".to_string(),
        ));
    }
    let benchmark_returns = returns
        .series(INDEX_COLUMN)
        .ok_or_else(|| PairTraderError::UnknownSecurity(INDEX_COLUMN.to_string()))?;

    let days = returns.len();
    let mut strategy_returns = vec![0.0f64; days];
    for code in positions.securities() {
        let Some(security_returns) = returns.series(code) else {
            return Err(PairTraderError::UnknownSecurity(code.clone()));
        };
        let Some(held) = positions.positions(code) else {
            continue;
        };
        for t in 1..days {
            // Yesterday's signal is today's held position.
            let contribution = f64::from(held[t - 1]) * security_returns[t];
            if contribution.is_finite() {
                strategy_returns[t] += contribution;
            }
        }
    }

    let strategy = normalized_equity(&strategy_returns);
    let benchmark = normalized_equity(benchmark_returns);

    info!(
        days,
        final_strategy = strategy.last().copied().unwrap_or(f64::NAN),
        final_benchmark = benchmark.last().copied().unwrap_or(f64::NAN),
        "Backtest simulation complete"
    );

    Ok(PerformanceSeries {
        dates: positions.dates().to_vec(),
        strategy,
        benchmark,
    })
}

/// Cumulative product of (1 + r) with undefined factors treated as 1,
/// divided by its own first value so the curve starts at exactly 1.0.
fn normalized_equity(returns: &[f64]) -> Vec<f64> {
    let mut acc = 1.0f64;
    let mut curve: Vec<f64> = returns
        .iter()
        .map(|r| {
            if r.is_nan() {
                acc
            } else {
                acc *= 1.0 + r;
                acc
            }
        })
        .collect();
    if let Some(&base) = curve.first() {
        for value in &mut curve {
            *value /= base;
        }
    }
    curve
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::PriceTable;
    use crate::scoring::PairId;
    use crate::signal::generate_position_matrix;
    use chrono::NaiveDate;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    fn prices(columns: Vec<(&str, Vec<f64>)>) -> PriceTable {
        let len = columns[0].1.len() as u32;
        PriceTable::new(
            (1..=len).map(date).collect(),
            columns
                .into_iter()
                .map(|(code, values)| (code.to_string(), values))
                .collect(),
        )
        .unwrap()
    }

    fn flat_matrix(table: &PriceTable, pair: PairId) -> PositionMatrix {
        // Impossible thresholds keep every position at zero.
        generate_position_matrix(table, &[pair], date(1), 3, 1e12, 0.0).unwrap()
    }

    #[test]
    fn test_all_flat_positions_give_constant_equity() {
        let table = prices(vec![
            ("AAA", vec![100.0, 105.0, 95.0, 101.0, 99.0]),
            ("BBB", vec![50.0, 51.0, 49.5, 50.2, 50.0]),
            (INDEX_COLUMN, vec![1000.0, 1010.0, 990.0, 1005.0, 1002.0]),
        ]);
        let matrix = flat_matrix(&table, PairId::new("AAA", "BBB"));
        let series = simulate(&matrix, &table.returns()).unwrap();
        for value in series.strategy() {
            assert_eq!(*value, 1.0);
        }
    }

    #[test]
    fn test_both_curves_start_at_one() {
        let table = prices(vec![
            ("AAA", vec![100.0, 120.0, 95.0, 101.0]),
            ("BBB", vec![50.0, 51.0, 49.5, 50.2]),
            (INDEX_COLUMN, vec![1000.0, 1100.0, 990.0, 1005.0]),
        ]);
        let matrix = flat_matrix(&table, PairId::new("AAA", "BBB"));
        let series = simulate(&matrix, &table.returns()).unwrap();
        assert_eq!(series.strategy()[0], 1.0);
        assert_eq!(series.benchmark()[0], 1.0);
    }

    #[test]
    fn test_position_earns_next_days_return() {
        // A short on AAA decided at test index 3 (prices 100,101,99,100,
        // 102 against a constant leg) must only affect the following day.
        let table = prices(vec![
            ("AAA", vec![100.0, 101.0, 99.0, 100.0, 102.0, 104.0]),
            ("BBB", vec![50.0; 6]),
            (INDEX_COLUMN, vec![1000.0; 6]),
        ]);
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

        // Signal day itself is unaffected (lag invariant).
        assert_eq!(series.strategy()[3], 1.0);
        // Next day: short AAA over its up-move, long BBB flat.
        let aaa_return = 104.0 / 102.0 - 1.0;
        let expected = 1.0 - aaa_return;
        assert!((series.strategy()[4] - expected).abs() < 1e-12);
    }

    #[test]
    fn test_benchmark_tracks_index_returns() {
        let table = prices(vec![
            ("AAA", vec![100.0; 4]),
            ("BBB", vec![50.0; 4]),
            (INDEX_COLUMN, vec![1000.0, 1010.0, 1020.1, 1030.301]),
        ]);
        let matrix = flat_matrix(&table, PairId::new("AAA", "BBB"));
        let series = simulate(&matrix, &table.returns()).unwrap();
        let benchmark = series.benchmark();
        assert_eq!(benchmark[0], 1.0);
        assert!((benchmark[1] - 1.01).abs() < 1e-9);
        assert!((benchmark[2] - 1.0201).abs() < 1e-9);
    }

    #[test]
    fn test_undefined_benchmark_day_holds_curve_flat() {
        let table = prices(vec![
            ("AAA", vec![100.0; 4]),
            ("BBB", vec![50.0; 4]),
            (INDEX_COLUMN, vec![1000.0, 1010.0, f64::NAN, 1030.0]),
        ]);
        let matrix = flat_matrix(&table, PairId::new("AAA", "BBB"));
        let series = simulate(&matrix, &table.returns()).unwrap();
        let benchmark = series.benchmark();
        // NAN return days compound as flat.
        assert_eq!(benchmark[1], benchmark[2]);
    }

    #[test]
    fn test_mismatched_dates_rejected() {
        let table = prices(vec![
            ("AAA", vec![100.0; 4]),
            ("BBB", vec![50.0; 4]),
            (INDEX_COLUMN, vec![1000.0; 4]),
        ]);
        let matrix = flat_matrix(&table, PairId::new("AAA", "BBB"));
        let restricted = table.returns().from_date(date(3));
        let result = simulate(&matrix, &restricted);
        assert!(matches!(result, Err(PairTraderError::InvalidArgument(_))));
    }
}
