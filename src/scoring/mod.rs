//! Pair scoring across the combinatorial candidate set.
//!
//! Every admissible unordered pair of tradable securities gets three
//! dissimilarity scores computed from the return table: the minimum
//! distance measure (MDM), the market-factor ratio (MFR), and a lag-1
//! Granger causality score (G). Lower is better for all three.
//!
//! Failure contract: a degenerate pair (too few observations, zero
//! variance, singular regression) records NAN sentinel scores instead of
//! aborting the batch. NAN scores sort last during selection, so
//! unscorable pairs are never picked ahead of scored ones.

pub mod granger;

use crate::data::{ReturnTable, INDEX_COLUMN};
use crate::error::PairTraderError;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// Canonical separator between the two codes of a pair id.
pub const PAIR_SEPARATOR: char = '|';

/// Currency-like codes that sneak into constituent data; they are data
/// artifacts, not tradable equities, and never form pairs.
pub const CURRENCY_EXCLUSIONS: &[&str] = &["EUR", "USD", "GBP"];

/// Default number of concurrent scoring workers.
pub const DEFAULT_SCORING_WORKERS: usize = 10;

/// Unordered pair of distinct security codes.
///
/// The stored order is the canonical representative: the first code
/// appears earlier in the security list the pair was generated from.
/// Reversed duplicates are never produced.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PairId {
    first: String,
    second: String,
}

impl PairId {
    pub fn new(first: impl Into<String>, second: impl Into<String>) -> Self {
        Self {
            first: first.into(),
            second: second.into(),
        }
    }

    pub fn first(&self) -> &str {
        &self.first
    }

    pub fn second(&self) -> &str {
        &self.second
    }

    pub fn contains(&self, code: &str) -> bool {
        self.first == code || self.second == code
    }
}

impl fmt::Display for PairId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.first, PAIR_SEPARATOR, self.second)
    }
}

impl FromStr for PairId {
    type Err = PairTraderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split(PAIR_SEPARATOR);
        match (parts.next(), parts.next(), parts.next()) {
            (Some(first), Some(second), None) if !first.is_empty() && !second.is_empty() => {
                Ok(Self::new(first, second))
            }
            _ => Err(PairTraderError::MalformedPairId(s.to_string())),
        }
    }
}

impl Serialize for PairId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for PairId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(D::Error::custom)
    }
}

/// The three dissimilarity scores of one pair. NAN marks an unscorable
/// metric.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PairScore {
    #[serde(rename = "MDM")]
    pub mdm: f64,
    #[serde(rename = "MFR")]
    pub mfr: f64,
    #[serde(rename = "G")]
    pub granger: f64,
}

/// One row of the score table, serialized as a flat record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredPair {
    #[serde(rename = "PAIR")]
    pub pair: PairId,
    #[serde(flatten)]
    pub score: PairScore,
}

/// Enumerate every admissible unordered pair from an ordered security
/// list: distinct codes, one canonical representative per pair, currency
/// artifacts excluded.
pub fn admissible_pairs(securities: &[&str]) -> Vec<PairId> {
    let mut pairs = Vec::new();
    for i in 0..securities.len() {
        if CURRENCY_EXCLUSIONS.contains(&securities[i]) {
            continue;
        }
        for j in (i + 1)..securities.len() {
            if CURRENCY_EXCLUSIONS.contains(&securities[j]) {
                continue;
            }
            pairs.push(PairId::new(securities[i], securities[j]));
        }
    }
    pairs
}

/// Minimum distance measure: normalize each security's cumulative-return
/// curve to start at 1.0, then sum the squared pointwise differences.
pub fn mdm(p1: &[f64], p2: &[f64]) -> f64 {
    if p1.is_empty() || p1.len() != p2.len() {
        return f64::NAN;
    }
    let c1 = cumulative_curve(p1);
    let c2 = cumulative_curve(p2);
    let base1 = c1[0];
    let base2 = c2[0];
    c1.iter()
        .zip(c2.iter())
        .map(|(a, b)| {
            let diff = a / base1 - b / base2;
            diff * diff
        })
        .sum()
}

fn cumulative_curve(returns: &[f64]) -> Vec<f64> {
    let mut acc = 1.0;
    returns
        .iter()
        .map(|r| {
            acc *= 1.0 + r;
            acc
        })
        .collect()
}

/// Market-factor ratio: |beta_A / beta_B - 1| where each beta is the
/// security's covariance with the benchmark over the benchmark variance.
///
/// The source implementation compared the first security against itself
/// (a copy-paste defect that pins MFR at zero); this is the corrected
/// form over the two distinct series.
pub fn mfr(p1: &[f64], p2: &[f64], index_returns: &[f64]) -> f64 {
    let beta1 = market_beta(p1, index_returns);
    let beta2 = market_beta(p2, index_returns);
    (beta1 / beta2 - 1.0).abs()
}

/// Beta = sample covariance(returns, benchmark) / population
/// variance(benchmark). The mismatched denominators mirror the source;
/// they cancel in the MFR ratio.
fn market_beta(returns: &[f64], index_returns: &[f64]) -> f64 {
    let n = returns.len();
    if n < 2 || index_returns.len() != n {
        return f64::NAN;
    }
    let n_f64 = n as f64;
    let mean_r = returns.iter().sum::<f64>() / n_f64;
    let mean_i = index_returns.iter().sum::<f64>() / n_f64;

    let mut covariance = 0.0;
    let mut index_var = 0.0;
    for (r, i) in returns.iter().zip(index_returns.iter()) {
        covariance += (r - mean_r) * (i - mean_i);
        index_var += (i - mean_i) * (i - mean_i);
    }
    covariance /= n_f64 - 1.0;
    index_var /= n_f64;

    covariance / index_var
}

/// Compute all three scores for one pair over the shared return table.
pub fn score_pair(returns: &ReturnTable, pair: &PairId) -> PairScore {
    let (Some(p1), Some(p2), Some(index)) = (
        returns.series(pair.first()),
        returns.series(pair.second()),
        returns.series(INDEX_COLUMN),
    ) else {
        return PairScore {
            mdm: f64::NAN,
            mfr: f64::NAN,
            granger: f64::NAN,
        };
    };

    PairScore {
        mdm: mdm(p1, p2),
        mfr: mfr(p1, p2, index),
        granger: granger::granger_score(p1, p2),
    }
}

/// Score every admissible pair concurrently on a bounded worker pool.
///
/// Pair computations are pure and read-only over the shared return table,
/// so tasks run without locking; the semaphore caps in-flight work and
/// results are re-ordered by generation index so the output sequence is
/// reproducible bit-for-bit.
pub async fn score_all_pairs(
    returns: Arc<ReturnTable>,
    workers: usize,
) -> Result<Vec<ScoredPair>, PairTraderError> {
    if returns.series(INDEX_COLUMN).is_none() {
        return Err(PairTraderError::UnknownSecurity(INDEX_COLUMN.to_string()));
    }

    let pairs = admissible_pairs(&returns.tradable_securities());
    info!(
        candidates = returns.tradable_securities().len(),
        pairs = pairs.len(),
        workers,
        "Scoring candidate pairs"
    );

    let semaphore = Arc::new(Semaphore::new(workers.max(1)));
    let mut join_set = JoinSet::new();

    for (idx, pair) in pairs.into_iter().enumerate() {
        let semaphore = Arc::clone(&semaphore);
        let returns = Arc::clone(&returns);
        join_set.spawn(async move {
            let _permit = semaphore.acquire_owned().await.ok();
            let score = score_pair(&returns, &pair);
            debug!(pair = %pair, mdm = score.mdm, mfr = score.mfr, g = score.granger, "Pair scored");
            (idx, ScoredPair { pair, score })
        });
    }

    let mut indexed = Vec::new();
    while let Some(result) = join_set.join_next().await {
        match result {
            Ok(entry) => indexed.push(entry),
            Err(e) => warn!(error = %e, "Scoring task failed, dropping pair"),
        }
    }
    indexed.sort_by_key(|(idx, _)| *idx);

    let scored: Vec<ScoredPair> = indexed.into_iter().map(|(_, entry)| entry).collect();
    let unscorable = scored
        .iter()
        .filter(|s| s.score.mdm.is_nan() && s.score.mfr.is_nan() && s.score.granger.is_nan())
        .count();
    info!(scored = scored.len(), unscorable, "Scoring complete");
    Ok(scored)
}
