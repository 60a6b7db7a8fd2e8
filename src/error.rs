//! Error types for the pair-trading engine

use thiserror::Error;

/// Errors that can occur while scoring, selecting, or simulating pairs
#[derive(Error, Debug)]
pub enum PairTraderError {
    /// Unknown selection method or other rejected argument
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Invalid simulation configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Pair id string does not contain exactly one separator
    #[error("Malformed pair id '{0}': expected exactly one '|' separator")]
    MalformedPairId(String),

    /// Not enough rows in the supplied window for the requested operation
    #[error("Insufficient data: expected at least {expected} rows, got {actual}")]
    InsufficientData { expected: usize, actual: usize },

    /// A referenced security code is not present in the price table
    #[error("Unknown security code: {0}")]
    UnknownSecurity(String),

    /// A price cell could not be parsed as a number
    #[error("Malformed price value: {0}")]
    MalformedNumber(String),

    /// Date parsing error
    #[error("Date parsing error: {0}")]
    DateParse(String),

    /// I/O error (file operations)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV parsing error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
