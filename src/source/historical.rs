//! Historical-window candidate source
//!
//! Pull model: every fetch returns all items across the configured source
//! feeds whose timestamp falls inside the lookback window, merged and
//! ordered by timestamp ascending (ties broken by id). Repeated calls with
//! the same inputs return the same result, modulo upstream feed changes, so
//! the scheduler can safely re-run a tick after a crash.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use futures::future::try_join_all;
use std::sync::Arc;

use super::{CandidateSource, SourceResult};
use crate::models::{Item, ItemId};
use crate::transport::{FeedRef, Transport};

/// Window-based [`CandidateSource`] over one or more feeds.
pub struct HistoricalWindowSource {
    transport: Arc<dyn Transport>,
    feeds: Vec<FeedRef>,
    lookback: Duration,
}

impl HistoricalWindowSource {
    /// Create a source over `feeds` with the given lookback window.
    pub fn new(transport: Arc<dyn Transport>, feeds: Vec<FeedRef>, lookback: Duration) -> Self {
        Self {
            transport,
            feeds,
            lookback,
        }
    }

    /// The configured lookback window.
    pub fn lookback(&self) -> Duration {
        self.lookback
    }
}

#[async_trait]
impl CandidateSource for HistoricalWindowSource {
    fn name(&self) -> &str {
        "historical-window"
    }

    async fn fetch(&self, now: DateTime<Utc>, _cursor: Option<ItemId>) -> SourceResult<Vec<Item>> {
        let since = now - self.lookback;

        let batches = try_join_all(
            self.feeds
                .iter()
                .map(|feed| self.transport.fetch_range(feed, since)),
        )
        .await?;

        let mut merged: Vec<Item> = batches.into_iter().flatten().collect();

        // Upstream may be sloppy about the window bound; enforce it here so
        // repeated fetches stay comparable.
        merged.retain(|item| item.timestamp >= since);
        merged.sort_by_key(|item| (item.timestamp, item.id));

        tracing::debug!(
            feeds = self.feeds.len(),
            count = merged.len(),
            "Fetched lookback window"
        );

        Ok(merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ItemKind;
    use crate::transport::{MessageId, TransportError, TransportResult};
    use chrono::TimeZone;

    struct FixedTransport {
        items: Vec<Item>,
    }

    #[async_trait]
    impl Transport for FixedTransport {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn publish(
            &self,
            _target: &FeedRef,
            _source: &FeedRef,
            _item: &Item,
            _cleaned_text: Option<&str>,
        ) -> TransportResult<MessageId> {
            Err(TransportError::PermissionDenied)
        }

        async fn fetch_range(
            &self,
            _feed: &FeedRef,
            _since: DateTime<Utc>,
        ) -> TransportResult<Vec<Item>> {
            Ok(self.items.clone())
        }

        async fn fetch_since(
            &self,
            _feed: &FeedRef,
            _after: ItemId,
            _max: usize,
        ) -> TransportResult<Vec<Item>> {
            Ok(Vec::new())
        }
    }

    fn item_at(id: ItemId, hour: u32) -> Item {
        Item {
            id,
            timestamp: Utc.with_ymd_and_hms(2024, 6, 1, hour, 0, 0).unwrap(),
            kind: ItemKind::Text,
            raw_text: Some(format!("item {id}")),
            media_ref: None,
        }
    }

    #[tokio::test]
    async fn test_orders_by_timestamp_then_id() {
        let transport = Arc::new(FixedTransport {
            items: vec![item_at(3, 10), item_at(1, 12), item_at(2, 10)],
        });
        let source = HistoricalWindowSource::new(
            transport,
            vec![FeedRef::new("feed-a")],
            Duration::hours(24),
        );

        let now = Utc.with_ymd_and_hms(2024, 6, 1, 13, 0, 0).unwrap();
        let items = source.fetch(now, None).await.unwrap();

        let ids: Vec<ItemId> = items.iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![2, 3, 1]);
    }

    #[tokio::test]
    async fn test_enforces_window_bound() {
        let transport = Arc::new(FixedTransport {
            items: vec![item_at(1, 2), item_at(2, 11)],
        });
        let source = HistoricalWindowSource::new(
            transport,
            vec![FeedRef::new("feed-a")],
            Duration::hours(3),
        );

        let now = Utc.with_ymd_and_hms(2024, 6, 1, 13, 0, 0).unwrap();
        let items = source.fetch(now, None).await.unwrap();

        // Item 1 (02:00) is outside the 3-hour window ending at 13:00
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, 2);
    }

    #[tokio::test]
    async fn test_repeated_fetch_is_stable() {
        let transport = Arc::new(FixedTransport {
            items: vec![item_at(5, 10), item_at(4, 11)],
        });
        let source = HistoricalWindowSource::new(
            transport,
            vec![FeedRef::new("feed-a")],
            Duration::hours(24),
        );

        let now = Utc.with_ymd_and_hms(2024, 6, 1, 13, 0, 0).unwrap();
        let first = source.fetch(now, None).await.unwrap();
        let second = source.fetch(now, None).await.unwrap();

        let first_ids: Vec<ItemId> = first.iter().map(|i| i.id).collect();
        let second_ids: Vec<ItemId> = second.iter().map(|i| i.id).collect();
        assert_eq!(first_ids, second_ids);
    }
}
