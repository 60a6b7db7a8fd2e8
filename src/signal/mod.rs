//! Spread signal generation for selected pairs.
//!
//! The spread is the raw price ratio of the two legs. Rolling mean and
//! sample standard deviation over a trailing window turn it into entry
//! and exit bands, and an explicit per-pair state machine converts each
//! day's band crossing into long/short/flat position signals.
//!
//! The state machine has four states because an open signal never clears
//! the opposite open flag: a SHORT fired while the long flag is still set
//! leaves both set (`LongShort`). Close rules clear one flag at a time.

use crate::data::PriceTable;
use crate::error::PairTraderError;
use crate::scoring::PairId;
use chrono::NaiveDate;
use std::collections::HashMap;
use tracing::{debug, info};

/// Per-pair position state, reset at the start of every simulation run.
///
/// `LongShort` is the reachable combination where both open flags are
/// set; it decays one flag at a time through the close rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PositionState {
    #[default]
    Flat,
    Long,
    Short,
    LongShort,
}

impl PositionState {
    pub fn is_long(&self) -> bool {
        matches!(self, PositionState::Long | PositionState::LongShort)
    }

    pub fn is_short(&self) -> bool {
        matches!(self, PositionState::Short | PositionState::LongShort)
    }

    fn with_short(self) -> Self {
        if self.is_long() {
            PositionState::LongShort
        } else {
            PositionState::Short
        }
    }

    fn with_long(self) -> Self {
        if self.is_short() {
            PositionState::LongShort
        } else {
            PositionState::Long
        }
    }

    fn without_short(self) -> Self {
        if self.is_long() {
            PositionState::Long
        } else {
            PositionState::Flat
        }
    }

    fn without_long(self) -> Self {
        if self.is_short() {
            PositionState::Short
        } else {
            PositionState::Flat
        }
    }
}

/// Signal emitted for one pair on one day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpreadSignal {
    /// Sell the first leg, buy the second
    OpenShort,
    /// Buy the first leg, sell the second
    OpenLong,
    /// Flatten both legs
    Close,
}

/// One evaluation of the guard chain, first match wins.
///
/// NAN band values (warmup or missing data) fail every comparison, so no
/// signal fires and the position is left unset for forward-filling.
pub fn evaluate_day(
    state: PositionState,
    ratio: f64,
    mean: f64,
    std_dev: f64,
    open_threshold: f64,
    close_threshold: f64,
) -> (PositionState, Option<SpreadSignal>) {
    if ratio > mean + open_threshold * std_dev {
        (state.with_short(), Some(SpreadSignal::OpenShort))
    } else if ratio < mean - open_threshold * std_dev {
        (state.with_long(), Some(SpreadSignal::OpenLong))
    } else if state.is_short() && ratio <= mean + close_threshold * std_dev {
        (state.without_short(), Some(SpreadSignal::Close))
    } else if state.is_long() && ratio >= mean - close_threshold * std_dev {
        (state.without_long(), Some(SpreadSignal::Close))
    } else {
        (state, None)
    }
}

/// Trailing-window mean and sample standard deviation per observation.
///
/// The first `window - 1` entries are NAN, as is any window containing a
/// NAN; with `window == 1` the sample deviation is undefined everywhere.
pub fn rolling_stats(series: &[f64], window: usize) -> Vec<(f64, f64)> {
    let mut stats = Vec::with_capacity(series.len());
    for i in 0..series.len() {
        if window == 0 || i + 1 < window {
            stats.push((f64::NAN, f64::NAN));
            continue;
        }
        let slice = &series[i + 1 - window..=i];
        let n = window as f64;
        let mean = slice.iter().sum::<f64>() / n;
        let variance = slice.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / (n - 1.0);
        stats.push((mean, variance.sqrt()));
    }
    stats
}

/// Daily positions per security over the test window, values in
/// {-1, 0, +1}, forward-filled with a leading flat default.
#[derive(Debug, Clone)]
pub struct PositionMatrix {
    dates: Vec<NaiveDate>,
    securities: Vec<String>,
    positions: HashMap<String, Vec<i8>>,
}

impl PositionMatrix {
    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn securities(&self) -> &[String] {
        &self.securities
    }

    pub fn positions(&self, code: &str) -> Option<&[i8]> {
        self.positions.get(code).map(Vec::as_slice)
    }
}

/// Raw (pre-fill) signal output of one pair run: one optional position
/// per evaluation date and leg.
struct PairSignals {
    first: Vec<Option<i8>>,
    second: Vec<Option<i8>>,
}

/// Generate daily position signals for selected pairs over the test
/// window.
///
/// Rolling statistics are computed over the full price history, so the
/// window is already warm on the first test date; signals are only
/// evaluated (and positions only held) on dates at or after `test_start`.
pub fn generate_position_matrix(
    prices: &PriceTable,
    pairs: &[PairId],
    test_start: NaiveDate,
    window: usize,
    open_threshold: f64,
    close_threshold: f64,
) -> Result<PositionMatrix, PairTraderError> {
    // Evaluation dates are the return dates (prices minus the first row)
    // at or after the test start.
    let eval_start = prices
        .dates()
        .iter()
        .skip(1)
        .position(|d| *d >= test_start)
        .map(|p| p + 1)
        .unwrap_or(prices.len());
    let eval_dates: Vec<NaiveDate> = prices.dates()[eval_start..].to_vec();

    let mut securities = Vec::with_capacity(pairs.len() * 2);
    let mut positions = HashMap::with_capacity(pairs.len() * 2);

    for pair in pairs {
        let signals = run_pair(
            prices,
            pair,
            eval_start,
            window,
            open_threshold,
            close_threshold,
        )?;
        for (code, raw) in [
            (pair.first(), signals.first),
            (pair.second(), signals.second),
        ] {
            if positions.insert(code.to_string(), forward_fill(&raw)).is_none() {
                securities.push(code.to_string());
            }
        }
    }

    info!(
        pairs = pairs.len(),
        days = eval_dates.len(),
        "Position matrix generated"
    );
    Ok(PositionMatrix {
        dates: eval_dates,
        securities,
        positions,
    })
}

fn run_pair(
    prices: &PriceTable,
    pair: &PairId,
    eval_start: usize,
    window: usize,
    open_threshold: f64,
    close_threshold: f64,
) -> Result<PairSignals, PairTraderError> {
    let first = prices
        .series(pair.first())
        .ok_or_else(|| PairTraderError::UnknownSecurity(pair.first().to_string()))?;
    let second = prices
        .series(pair.second())
        .ok_or_else(|| PairTraderError::UnknownSecurity(pair.second().to_string()))?;

    let ratio: Vec<f64> = first.iter().zip(second.iter()).map(|(a, b)| a / b).collect();
    let stats = rolling_stats(&ratio, window);

    let mut state = PositionState::default();
    let days = prices.len().saturating_sub(eval_start);
    let mut signals = PairSignals {
        first: Vec::with_capacity(days),
        second: Vec::with_capacity(days),
    };

    for i in eval_start..prices.len() {
        let (mean, std_dev) = stats[i];
        let (next_state, signal) = evaluate_day(
            state,
            ratio[i],
            mean,
            std_dev,
            open_threshold,
            close_threshold,
        );
        if next_state != state {
            debug!(
                pair = %pair,
                day = %prices.dates()[i],
                from = ?state,
                to = ?next_state,
                "State transition"
            );
        }
        state = next_state;

        match signal {
            Some(SpreadSignal::OpenShort) => {
                signals.first.push(Some(-1));
                signals.second.push(Some(1));
            }
            Some(SpreadSignal::OpenLong) => {
                signals.first.push(Some(1));
                signals.second.push(Some(-1));
            }
            Some(SpreadSignal::Close) => {
                signals.first.push(Some(0));
                signals.second.push(Some(0));
            }
            None => {
                signals.first.push(None);
                signals.second.push(None);
            }
        }
    }

    Ok(signals)
}

/// A day with no signal inherits the prior day's position; leading gaps
/// are flat.
fn forward_fill(raw: &[Option<i8>]) -> Vec<i8> {
    let mut last = 0i8;
    raw.iter()
        .map(|signal| {
            if let Some(position) = signal {
                last = *position;
            }
            last
        })
        .collect()
}
