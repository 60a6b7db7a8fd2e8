//! CSV loader for dense price tables.
//!
//! Expected layout: first column holds `%Y-%m-%d` dates, every other column
//! is one security's adjusted close series, with the benchmark under the
//! `index` header. Empty cells become NAN.

use super::PriceTable;
use crate::error::PairTraderError;
use chrono::NaiveDate;
use std::path::Path;
use tracing::info;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Read a dense price CSV into a [`PriceTable`].
pub fn load_price_csv(path: &Path) -> Result<PriceTable, PairTraderError> {
    let mut reader = csv::Reader::from_path(path)?;
    let headers = reader.headers()?.clone();
    if headers.len() < 2 {
        return Err(PairTraderError::InvalidArgument(
            "price CSV needs a date column and at least one security column".to_string(),
        ));
    }

    let codes: Vec<String> = headers.iter().skip(1).map(str::to_string).collect();
    let mut dates: Vec<NaiveDate> = Vec::new();
    let mut columns: Vec<Vec<f64>> = vec![Vec::new(); codes.len()];

    for record in reader.records() {
        let record = record?;
        let raw_date = record.get(0).unwrap_or_default();
        let date = NaiveDate::parse_from_str(raw_date, DATE_FORMAT)
            .map_err(|e| PairTraderError::DateParse(format!("'{}': {}", raw_date, e)))?;
        dates.push(date);

        for (i, column) in columns.iter_mut().enumerate() {
            let cell = record.get(i + 1).unwrap_or_default().trim();
            column.push(parse_cell(cell)?);
        }
    }

    info!(
        path = %path.display(),
        rows = dates.len(),
        securities = codes.len(),
        "Loaded price table"
    );

    PriceTable::new(dates, codes.into_iter().zip(columns).collect())
}

fn parse_cell(cell: &str) -> Result<f64, PairTraderError> {
    if cell.is_empty() || cell.eq_ignore_ascii_case("nan") {
        return Ok(f64::NAN);
    }
    cell.parse::<f64>()
        .map_err(|_| PairTraderError::MalformedNumber(cell.to_string()))
}
