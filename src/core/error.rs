//! Error types shared across the crate.
//!
//! `AppError` covers failures that can reach a caller (configuration, bad
//! domain input, SMTP pre-flight). Network-tier failures during verification are
//! modelled separately by [`ProbeError`] and [`LookupError`]; they are
//! inspected by the prober and resolver and never escape the pipeline.

use std::time::Duration;
use thiserror::Error;

/// Library-level error type.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Domain extraction failed: {0}")]
    DomainExtraction(String),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("SMTP check inconclusive: {0}")]
    SmtpInconclusive(String),
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, AppError>;

/// Why a single verification tier did not produce a positive answer.
///
/// Every variant means "this tier failed, try the next one".
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProbeError {
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("rejected with {code}: {message}")]
    Rejected { code: u16, message: String },

    #[error("blocked: {0}")]
    Blocked(String),

    #[error("connection failed: {0}")]
    Connection(String),
}

/// Outcome of a DNS query that yielded nothing usable.
///
/// The resolver treats all variants identically ("not found") but keeps the
/// distinction for logging.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    #[error("no records found for {0}")]
    NotFound(String),

    #[error("lookup timed out")]
    Timeout,

    #[error("transient resolution failure: {0}")]
    Transient(String),
}
