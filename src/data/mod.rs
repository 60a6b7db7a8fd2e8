//! Dense price and return tables keyed by date and security code.
//!
//! The price table is the input boundary of the engine: the data-retrieval
//! layer supplies adjusted close prices for an index and its constituents,
//! pre-joined with a benchmark column named `index`. Missing observations
//! are `f64::NAN` and flow through the statistics as undefined values.

pub mod loader;

use crate::error::PairTraderError;
use chrono::NaiveDate;
use std::collections::HashMap;

/// Column name of the benchmark price series.
pub const INDEX_COLUMN: &str = "index";

/// Read-only dense table of adjusted close prices.
///
/// Dates are strictly increasing and every column has one value per date.
/// Column iteration order is fixed at construction so that downstream pair
/// generation and tie-breaking are reproducible bit-for-bit.
#[derive(Debug, Clone)]
pub struct PriceTable {
    dates: Vec<NaiveDate>,
    securities: Vec<String>,
    series: HashMap<String, Vec<f64>>,
}

impl PriceTable {
    /// Build a table from ordered columns, validating shape and date order.
    pub fn new(
        dates: Vec<NaiveDate>,
        columns: Vec<(String, Vec<f64>)>,
    ) -> Result<Self, PairTraderError> {
        for pair in dates.windows(2) {
            if pair[1] <= pair[0] {
                return Err(PairTraderError::InvalidArgument(format!(
                    "dates must be strictly increasing, got {} after {}",
                    pair[1], pair[0]
                )));
            }
        }

        let mut securities = Vec::with_capacity(columns.len());
        let mut series = HashMap::with_capacity(columns.len());
        for (code, values) in columns {
            if values.len() != dates.len() {
                return Err(PairTraderError::InvalidArgument(format!(
                    "column '{}' has {} values for {} dates",
                    code,
                    values.len(),
                    dates.len()
                )));
            }
            if series.insert(code.clone(), values).is_some() {
                return Err(PairTraderError::InvalidArgument(format!(
                    "duplicate security code '{}'",
                    code
                )));
            }
            securities.push(code);
        }

        Ok(Self {
            dates,
            securities,
            series,
        })
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    /// All column codes in construction order, including the benchmark.
    pub fn securities(&self) -> &[String] {
        &self.securities
    }

    /// Column codes excluding the benchmark column.
    pub fn tradable_securities(&self) -> Vec<&str> {
        self.securities
            .iter()
            .filter(|code| code.as_str() != INDEX_COLUMN)
            .map(String::as_str)
            .collect()
    }

    pub fn series(&self, code: &str) -> Option<&[f64]> {
        self.series.get(code).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    /// Derive the percentage-change table. The first row has no prior
    /// observation and is dropped; NAN cells propagate.
    pub fn returns(&self) -> ReturnTable {
        let dates = self.dates.iter().skip(1).copied().collect();
        let series = self
            .series
            .iter()
            .map(|(code, prices)| {
                let rets = prices
                    .windows(2)
                    .map(|w| (w[1] - w[0]) / w[0])
                    .collect::<Vec<f64>>();
                (code.clone(), rets)
            })
            .collect();
        ReturnTable {
            dates,
            securities: self.securities.clone(),
            series,
        }
    }
}

/// Daily percentage changes derived from a [`PriceTable`], same shape minus
/// the first row.
#[derive(Debug, Clone)]
pub struct ReturnTable {
    dates: Vec<NaiveDate>,
    securities: Vec<String>,
    series: HashMap<String, Vec<f64>>,
}

impl ReturnTable {
    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn securities(&self) -> &[String] {
        &self.securities
    }

    /// Column codes excluding the benchmark column.
    pub fn tradable_securities(&self) -> Vec<&str> {
        self.securities
            .iter()
            .filter(|code| code.as_str() != INDEX_COLUMN)
            .map(String::as_str)
            .collect()
    }

    pub fn series(&self, code: &str) -> Option<&[f64]> {
        self.series.get(code).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    /// Restrict the table to dates at or after `start`.
    pub fn from_date(&self, start: NaiveDate) -> ReturnTable {
        let offset = self.dates.partition_point(|d| *d < start);
        let dates = self.dates[offset..].to_vec();
        let series = self
            .series
            .iter()
            .map(|(code, rets)| (code.clone(), rets[offset..].to_vec()))
            .collect();
        ReturnTable {
            dates,
            securities: self.securities.clone(),
            series,
        }
    }
}
