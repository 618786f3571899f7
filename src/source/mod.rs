//! Candidate sources
//!
//! A candidate source answers one question per tick: which items are
//! currently available for consideration? It applies no dedup and no quota;
//! the scheduler owns both. Two strategies exist:
//!
//! - [`historical::HistoricalWindowSource`] pulls everything inside a
//!   bounded lookback window across the configured feeds (pull model)
//! - [`poll::IncrementalPollSource`] pulls items past the ledger cursor
//!   (poll model)

pub mod historical;
pub mod poll;

pub use historical::HistoricalWindowSource;
pub use poll::IncrementalPollSource;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::models::{Item, ItemId};
use crate::transport::TransportError;

/// Result type for source operations
pub type SourceResult<T> = Result<T, SourceError>;

/// Errors reported by candidate sources.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// The backing transport could not be reached; retry next tick.
    /// The scheduler must not mutate ledger or cursor state on this.
    #[error("source unavailable: {0}")]
    Unavailable(String),
}

impl From<TransportError> for SourceError {
    fn from(err: TransportError) -> Self {
        Self::Unavailable(err.to_string())
    }
}

/// Supplier of candidate items for one tick.
#[async_trait]
pub trait CandidateSource: Send + Sync {
    /// Source name for logging.
    fn name(&self) -> &str;

    /// Fetch the currently available candidates.
    ///
    /// `now` anchors window-based sources; `cursor` anchors poll-based
    /// sources (each implementation uses what it needs). Returned items are
    /// in the implementation's documented order and may include ids the
    /// ledger has already decided.
    async fn fetch(&self, now: DateTime<Utc>, cursor: Option<ItemId>) -> SourceResult<Vec<Item>>;
}
