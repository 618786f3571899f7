//! Feed transport
//!
//! The transport is the boundary to whatever messaging platform hosts the
//! feeds: it fetches items from a source feed and copies or re-sends them
//! to a destination feed. The scheduler only ever talks to the [`Transport`]
//! trait; [`http::HttpTransport`] is the production implementation.

pub mod http;

pub use http::{HttpTransport, HttpTransportConfig};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::models::{Item, ItemId};

/// Result type for transport operations
pub type TransportResult<T> = Result<T, TransportError>;

/// Errors reported by the transport.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The referenced item or feed does not exist
    #[error("not found")]
    NotFound,

    /// The relay lacks permission on the feed
    #[error("permission denied")]
    PermissionDenied,

    /// The platform asked us to slow down
    #[error("rate limited")]
    RateLimited,

    /// Anything else (network failure, unexpected response)
    #[error("transport error: {0}")]
    Unknown(String),
}

impl TransportError {
    /// True if retrying the same call later could succeed.
    /// Missing items and missing permissions do not heal on retry.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimited | Self::Unknown(_))
    }
}

/// Reference to a feed on the platform (channel, group, chat).
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct FeedRef(pub String);

impl FeedRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for FeedRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a message created on the destination feed.
pub type MessageId = String;

/// Platform boundary consumed by the scheduler and candidate sources.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Transport name for logging.
    fn name(&self) -> &str;

    /// Copy or re-send `item` from `source` to `target`.
    ///
    /// When `cleaned_text` is set it replaces the original text/caption;
    /// otherwise the item is copied verbatim by id.
    async fn publish(
        &self,
        target: &FeedRef,
        source: &FeedRef,
        item: &Item,
        cleaned_text: Option<&str>,
    ) -> TransportResult<MessageId>;

    /// Items on `feed` with `timestamp >= since`, oldest first.
    async fn fetch_range(&self, feed: &FeedRef, since: DateTime<Utc>) -> TransportResult<Vec<Item>>;

    /// Up to `max` items on `feed` with `id > after`, id ascending.
    async fn fetch_since(
        &self,
        feed: &FeedRef,
        after: ItemId,
        max: usize,
    ) -> TransportResult<Vec<Item>>;
}
