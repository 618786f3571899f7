//! Durable dedup ledger
//!
//! The ledger is the relay's memory: one record per item id that has
//! received a final outcome, plus a high-water-mark cursor for poll-based
//! sources. Records are append-only during normal operation and outcomes
//! are decided exactly once.
//!
//! Two backends implement the same trait:
//! - [`file::FileLedger`] - a single JSON document, written atomically
//! - [`sqlite::SqliteLedger`] - a SQLite database in WAL mode

pub mod file;
pub mod sqlite;

pub use file::FileLedger;
pub use sqlite::SqliteLedger;

use crate::models::{ItemId, Outcome};

/// Result type for ledger operations
pub type LedgerResult<T> = Result<T, LedgerError>;

/// Errors raised by ledger backends.
///
/// `ConflictingOutcome` and `Regression` are invariant violations: they
/// must never occur in correct operation and indicate ledger corruption.
/// Callers halt on them instead of proceeding with ambiguous state.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// A different outcome was already recorded for this item id
    #[error("conflicting outcome for item {id}: already {existing}, attempted {attempted}")]
    ConflictingOutcome {
        id: ItemId,
        existing: Outcome,
        attempted: Outcome,
    },

    /// Attempted to move the cursor backwards
    #[error("cursor regression: current {current}, attempted {attempted}")]
    Regression { current: ItemId, attempted: ItemId },

    /// Backend I/O failure
    #[error("ledger I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Backend serialization failure
    #[error("ledger serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// SQLite failure
    #[error("ledger database error: {0}")]
    Database(#[from] rusqlite::Error),
}

impl LedgerError {
    /// True for invariant violations that must halt the scheduler.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::ConflictingOutcome { .. } | Self::Regression { .. }
        )
    }
}

/// Per-outcome record counts, surfaced by the status command.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LedgerStats {
    pub total: usize,
    pub published: usize,
    pub skipped_filtered: usize,
    pub skipped_empty: usize,
    pub failed_permanent: usize,
}

impl LedgerStats {
    pub(crate) fn count(&mut self, outcome: Outcome) {
        self.total += 1;
        match outcome {
            Outcome::Published => self.published += 1,
            Outcome::SkippedFiltered => self.skipped_filtered += 1,
            Outcome::SkippedEmpty => self.skipped_empty += 1,
            Outcome::FailedPermanent => self.failed_permanent += 1,
        }
    }
}

/// Durable record of decided item ids.
///
/// Implementations must make `record` and `advance_cursor` durable before
/// returning: the scheduler relies on a returned `Ok` meaning the decision
/// survives a crash.
pub trait PublishLedger: Send + Sync {
    /// True if any outcome has been recorded for `id`, regardless of which.
    /// A filtered or failed item is just as decided as a published one.
    fn has(&self, id: ItemId) -> LedgerResult<bool>;

    /// Record the final outcome for `id`.
    ///
    /// Recording the same outcome twice is a no-op; recording a different
    /// outcome for an already-decided id is `ConflictingOutcome`.
    fn record(&self, id: ItemId, outcome: Outcome) -> LedgerResult<()>;

    /// Highest item id fully processed, or `None` for a fresh ledger.
    fn cursor(&self) -> LedgerResult<Option<ItemId>>;

    /// Move the cursor forward. Moving it backwards is `Regression`;
    /// re-advancing to the current value is a no-op.
    fn advance_cursor(&self, to: ItemId) -> LedgerResult<()>;

    /// Per-outcome counts.
    fn stats(&self) -> LedgerResult<LedgerStats>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ledger_error_fatality() {
        let conflict = LedgerError::ConflictingOutcome {
            id: 7,
            existing: Outcome::Published,
            attempted: Outcome::FailedPermanent,
        };
        assert!(conflict.is_fatal());

        let regression = LedgerError::Regression {
            current: 10,
            attempted: 5,
        };
        assert!(regression.is_fatal());

        let io = LedgerError::Io(std::io::Error::new(std::io::ErrorKind::Other, "disk"));
        assert!(!io.is_fatal());
    }

    #[test]
    fn test_stats_count() {
        let mut stats = LedgerStats::default();
        stats.count(Outcome::Published);
        stats.count(Outcome::Published);
        stats.count(Outcome::SkippedFiltered);
        stats.count(Outcome::FailedPermanent);

        assert_eq!(stats.total, 4);
        assert_eq!(stats.published, 2);
        assert_eq!(stats.skipped_filtered, 1);
        assert_eq!(stats.skipped_empty, 0);
        assert_eq!(stats.failed_permanent, 1);
    }
}
