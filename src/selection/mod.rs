//! Greedy disjoint top-N pair selection.
//!
//! Pairs are ranked ascending on the chosen score with a stable sort, so
//! ties keep the scoring batch's generation order and the selected
//! sequence is reproducible bit-for-bit. NAN scores rank last, matching
//! how the upstream scorer marks unscorable pairs.

use crate::error::PairTraderError;
use crate::scoring::{PairScore, ScoredPair};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info};

/// The score used to rank candidate pairs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SelectionMethod {
    /// Minimum distance measure between normalized cumulative returns
    #[serde(rename = "MDM")]
    Mdm,
    /// Market-factor (beta) ratio
    #[serde(rename = "MFR")]
    Mfr,
    /// Bidirectional lag-1 Granger causality score
    #[serde(rename = "G")]
    Granger,
}

impl SelectionMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            SelectionMethod::Mdm => "MDM",
            SelectionMethod::Mfr => "MFR",
            SelectionMethod::Granger => "G",
        }
    }

    fn score_of(&self, score: &PairScore) -> f64 {
        match self {
            SelectionMethod::Mdm => score.mdm,
            SelectionMethod::Mfr => score.mfr,
            SelectionMethod::Granger => score.granger,
        }
    }
}

impl fmt::Display for SelectionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SelectionMethod {
    type Err = PairTraderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "MDM" => Ok(SelectionMethod::Mdm),
            "MFR" => Ok(SelectionMethod::Mfr),
            "G" => Ok(SelectionMethod::Granger),
            _ => Err(PairTraderError::InvalidArgument(format!(
                "unexpected selection method '{}': choose one of [G, MDM, MFR]",
                s
            ))),
        }
    }
}

/// Ascending score order with NAN last; equal scores stay in input order
/// via the caller's stable sort.
fn compare_scores(a: f64, b: f64) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
    }
}

/// Pick up to `n` pairs by the given method, never reusing a security.
///
/// The result may hold fewer than `n` pairs when disjoint candidates run
/// out.
pub fn select_top_n(scored: &[ScoredPair], method: SelectionMethod, n: usize) -> Vec<ScoredPair> {
    let mut ranked: Vec<&ScoredPair> = scored.iter().collect();
    ranked.sort_by(|a, b| compare_scores(method.score_of(&a.score), method.score_of(&b.score)));

    let mut chosen_securities: HashSet<&str> = HashSet::new();
    let mut chosen: Vec<ScoredPair> = Vec::with_capacity(n);

    for candidate in ranked {
        if chosen.len() >= n {
            break;
        }
        let first = candidate.pair.first();
        let second = candidate.pair.second();
        if chosen_securities.contains(first) || chosen_securities.contains(second) {
            debug!(pair = %candidate.pair, "Skipping pair, security already chosen");
            continue;
        }
        chosen_securities.insert(first);
        chosen_securities.insert(second);
        chosen.push(candidate.clone());
    }

    info!(
        method = %method,
        requested = n,
        selected = chosen.len(),
        "Pair selection complete"
    );
    chosen
}
