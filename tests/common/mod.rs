//! Common test utilities

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};

use carousel::models::{Item, ItemId, ItemKind};
use carousel::transport::{FeedRef, MessageId, Transport, TransportError, TransportResult};

/// Create a sequence of text items with ids `first..=last`, one minute apart
#[allow(dead_code)]
pub fn item_run(first: ItemId, last: ItemId) -> Vec<Item> {
    (first..=last)
        .map(|id| Item {
            id,
            timestamp: Utc
                .with_ymd_and_hms(2024, 6, 1, 9, 0, 0)
                .unwrap()
                + chrono::Duration::minutes((id - first) as i64),
            kind: ItemKind::Text,
            raw_text: Some(format!("content {id}")),
            media_ref: None,
        })
        .collect()
}

/// An instant on the scenario day at the given hour (UTC)
#[allow(dead_code)]
pub fn at_hour(hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, hour, 0, 0).unwrap()
}

/// In-memory transport backed by a fixed feed, recording every publish
pub struct MockTransport {
    feed_items: Mutex<Vec<Item>>,
    published: Mutex<Vec<ItemId>>,
    publish_calls: AtomicUsize,
    fail_ids: Mutex<Vec<ItemId>>,
}

#[allow(dead_code)]
impl MockTransport {
    pub fn new(feed_items: Vec<Item>) -> Self {
        Self {
            feed_items: Mutex::new(feed_items),
            published: Mutex::new(Vec::new()),
            publish_calls: AtomicUsize::new(0),
            fail_ids: Mutex::new(Vec::new()),
        }
    }

    /// Make publishing the given item fail with NotFound
    pub fn fail_publish_of(&self, id: ItemId) {
        self.fail_ids.lock().unwrap().push(id);
    }

    /// Ids published so far, in publish order
    pub fn published_ids(&self) -> Vec<ItemId> {
        self.published.lock().unwrap().clone()
    }

    /// Number of publish calls made
    pub fn publish_call_count(&self) -> usize {
        self.publish_calls.load(Ordering::SeqCst)
    }

    /// Append an item to the backing feed
    pub fn push_item(&self, item: Item) {
        self.feed_items.lock().unwrap().push(item);
    }
}

#[async_trait]
impl Transport for MockTransport {
    fn name(&self) -> &str {
        "mock"
    }

    async fn publish(
        &self,
        _target: &FeedRef,
        _source: &FeedRef,
        item: &Item,
        _cleaned_text: Option<&str>,
    ) -> TransportResult<MessageId> {
        self.publish_calls.fetch_add(1, Ordering::SeqCst);

        if self.fail_ids.lock().unwrap().contains(&item.id) {
            return Err(TransportError::NotFound);
        }

        self.published.lock().unwrap().push(item.id);
        Ok(format!("msg-{}", item.id))
    }

    async fn fetch_range(
        &self,
        _feed: &FeedRef,
        since: DateTime<Utc>,
    ) -> TransportResult<Vec<Item>> {
        let items = self.feed_items.lock().unwrap();
        Ok(items
            .iter()
            .filter(|item| item.timestamp >= since)
            .cloned()
            .collect())
    }

    async fn fetch_since(
        &self,
        _feed: &FeedRef,
        after: ItemId,
        max: usize,
    ) -> TransportResult<Vec<Item>> {
        let items = self.feed_items.lock().unwrap();
        let mut matching: Vec<Item> = items.iter().filter(|i| i.id > after).cloned().collect();
        matching.sort_by_key(|i| i.id);
        matching.truncate(max);
        Ok(matching)
    }
}
