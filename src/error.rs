//! Unified error handling for the carousel crate
//!
//! Domain errors stay with their modules (`LedgerError`, `TransportError`,
//! `SourceError`, `SchedulerError`); this module provides a single `Error`
//! enum wrapping them for callers that cross module boundaries, plus a
//! crate-wide `Result` alias.

use std::io;
use thiserror::Error;

// Re-export domain-specific errors for convenience
pub use crate::ledger::LedgerError;
pub use crate::scheduler::SchedulerError;
pub use crate::source::SourceError;
pub use crate::transport::TransportError;

/// Unified error type for the carousel crate
#[derive(Error, Debug)]
pub enum Error {
    /// Ledger errors (invariant violations and storage failures)
    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    /// Transport errors (per-item publish and fetch failures)
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Candidate source errors
    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    /// Scheduler errors
    #[error("Scheduler error: {0}")]
    Scheduler(#[from] SchedulerError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP client errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Configuration errors
    #[error("Config error: {0}")]
    Config(String),
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Check if this error is recoverable (the operation can be retried)
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Ledger(e) => !e.is_fatal(),
            Self::Transport(e) => e.is_retryable(),
            Self::Source(_) => true,
            Self::Scheduler(e) => !e.is_fatal(),
            Self::Io(_) => true,
            Self::Json(_) => false,
            Self::Http(_) => true,
            Self::Config(_) => false,
        }
    }
}

/// Result type alias using the unified Error type
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Outcome;

    #[test]
    fn test_source_errors_are_recoverable() {
        let err: Error = SourceError::Unavailable("connection refused".to_string()).into();
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_transport_recoverability_follows_variant() {
        let rate_limited: Error = TransportError::RateLimited.into();
        assert!(rate_limited.is_recoverable());

        let not_found: Error = TransportError::NotFound.into();
        assert!(!not_found.is_recoverable());
    }

    #[test]
    fn test_ledger_invariant_violations_not_recoverable() {
        let err: Error = LedgerError::ConflictingOutcome {
            id: 1,
            existing: Outcome::Published,
            attempted: Outcome::SkippedFiltered,
        }
        .into();
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_config_error() {
        let err = Error::config("missing token");
        assert!(!err.is_recoverable());
        assert!(err.to_string().contains("missing token"));
    }
}
