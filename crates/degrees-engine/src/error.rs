use std::io;
use thiserror::Error;

/// Non-success signals a live lookup can produce.
///
/// Only `Unauthorized` (and `RetriesExhausted` when a retry cap is set) ever
/// leaves the client; the rest are retried or degraded in place.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OracleError {
    #[error("rate limited by upstream")]
    RateLimited,
    #[error("API key rejected by upstream")]
    Unauthorized,
    #[error("upstream unavailable: {0}")]
    Unavailable(String),
    #[error("malformed response: {0}")]
    Malformed(String),
}

impl OracleError {
    /// Degraded outcomes are converted to empty results instead of failing.
    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::Unavailable(_) | Self::Malformed(_))
    }
}

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("cache serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Outcomes of a degrees-of-separation query that reach the caller.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("no player named {0:?}")]
    NotFound(String),
    #[error("no connection between {source_id} and {target_id}")]
    NoPath { source_id: String, target_id: String },
    #[error("API key invalid, please get a new one")]
    Unauthorized,
    #[error("gave up on {key} after {attempts} rate-limited attempts")]
    RetriesExhausted { key: String, attempts: u32 },
    #[error("search cancelled after round {0}")]
    Cancelled(u32),
    #[error(transparent)]
    Cache(#[from] CacheError),
}

impl SearchError {
    /// Fatal errors terminate the whole process rather than one query.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Unauthorized | Self::RetriesExhausted { .. })
    }
}

pub type Result<T> = std::result::Result<T, SearchError>;
