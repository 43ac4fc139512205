//! Typed error kinds for the harvest engine
//!
//! The pagination driver pattern-matches on these to decide whether a page is
//! retried, the run is paused, or the run fails. Application plumbing above
//! the driver uses `eyre` like the rest of the crate.

use reqwest::StatusCode;

/// Status codes the transport layer retries with backoff
pub const RETRYABLE_STATUSES: [u16; 5] = [429, 500, 502, 503, 504];

/// Failure of a single page fetch
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// Timeouts, connection failures and retryable statuses that outlived the
    /// retry budget
    #[error("transient failure after retries: {0}")]
    Transient(String),

    /// The server rejected the request with a status the transport layer does
    /// not retry
    #[error("HTTP {status}: {body}")]
    Rejected { status: StatusCode, body: String },

    /// Anything else: an undecodable body, a broken URL
    #[error("unexpected failure: {0}")]
    Unexpected(String),
}

impl FetchError {
    /// Whether the retry layer should try this request again
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient(_))
    }

    /// Classify an HTTP status
    pub fn from_status(status: StatusCode, body: String) -> Self {
        if RETRYABLE_STATUSES.contains(&status.as_u16()) {
            Self::Transient(format!("HTTP {status}: {body}"))
        } else {
            Self::Rejected { status, body }
        }
    }

    /// Classify a reqwest transport error
    pub fn from_transport(err: reqwest::Error) -> Self {
        if err.is_timeout() || err.is_connect() || err.is_request() {
            Self::Transient(err.to_string())
        } else if let Some(status) = err.status() {
            Self::from_status(status, err.to_string())
        } else {
            Self::Unexpected(err.to_string())
        }
    }
}

/// Why a single record produced no training examples
#[derive(Debug, thiserror::Error)]
pub enum TransformError {
    #[error("record has fields but no key")]
    MissingKey,

    #[error("record {key} is malformed: {reason}")]
    Malformed { key: String, reason: String },
}

/// Terminal outcome of a harvest run that did not complete
#[derive(Debug, thiserror::Error)]
pub enum HarvestError {
    /// Transient failures outlasted the retry layer; the checkpoint is intact
    /// and a later invocation resumes from it
    #[error("paused on {collection} at offset {offset}: {source}")]
    Paused {
        collection: String,
        offset: u64,
        #[source]
        source: FetchError,
    },

    /// The server kept rejecting the same page
    #[error("{collection} at offset {offset} rejected {attempts} times (HTTP {status})")]
    Rejected {
        collection: String,
        offset: u64,
        status: StatusCode,
        attempts: u32,
    },

    /// Unexpected failures kept recurring on the same page
    #[error("{collection} at offset {offset} failed {attempts} times: {source}")]
    Exhausted {
        collection: String,
        offset: u64,
        attempts: u32,
        #[source]
        source: FetchError,
    },

    /// Writing examples or the checkpoint failed
    #[error("storage failure: {0:#}")]
    Storage(eyre::Report),
}

impl From<eyre::Report> for HarvestError {
    fn from(err: eyre::Report) -> Self {
        Self::Storage(err)
    }
}
