//! Rotation scheduler: the tick state machine
//!
//! One tick walks a fixed sequence of stages: gate, fetch, filter, select,
//! publish, commit. The stages never reorder because later stages depend on
//! the ledger reads of earlier ones being consistent with *this* tick. A
//! re-entrancy guard serializes ticks: scheduled and manually forced ticks
//! queue behind the same mutex, so two ticks can never race to publish the
//! same candidate.
//!
//! Delivery guarantee is at-least-once: if the process dies between a
//! successful publish call and its ledger record, the item is offered and
//! published again after restart. The reverse gap does not exist; outcomes
//! are recorded durably before the tick moves on.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use super::error::SchedulerResult;
use super::selection::SelectionPolicy;
use super::window::PublishingWindow;
use crate::filter::{ContentFilter, FilterReason};
use crate::ledger::PublishLedger;
use crate::models::{Item, ItemId, Outcome, SkipReason, TickReport, TickSummary};
use crate::source::{CandidateSource, SourceError};
use crate::transport::{FeedRef, MessageId, Transport, TransportError};

/// Source and destination feeds of one relay route.
#[derive(Debug, Clone)]
pub struct FeedRoute {
    /// Feed items are copied from.
    pub source: FeedRef,
    /// Feed items are copied to.
    pub target: FeedRef,
}

/// Send pacing and per-item retry policy.
#[derive(Debug, Clone)]
pub struct PacingConfig {
    /// Fixed delay between consecutive sends within one tick.
    pub inter_send_delay: Duration,

    /// Attempts per item before the failure becomes permanent. Only
    /// rate-limit and unknown errors are retried; a missing item or a
    /// permission error fails on the first attempt.
    pub max_send_attempts: u32,

    /// Base backoff between retry attempts (doubles per attempt).
    pub retry_backoff: Duration,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            inter_send_delay: Duration::from_secs(3),
            max_send_attempts: 3,
            retry_backoff: Duration::from_secs(1),
        }
    }
}

/// The orchestrator. Owns one route and runs one tick at a time.
pub struct RotationScheduler {
    source: Arc<dyn CandidateSource>,
    transport: Arc<dyn Transport>,
    ledger: Arc<dyn PublishLedger>,
    filter: ContentFilter,
    route: FeedRoute,
    window: PublishingWindow,
    policy: SelectionPolicy,
    pacing: PacingConfig,
    guard: Mutex<()>,
}

impl RotationScheduler {
    /// Build a scheduler; validates the publishing window up front.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        source: Arc<dyn CandidateSource>,
        transport: Arc<dyn Transport>,
        ledger: Arc<dyn PublishLedger>,
        filter: ContentFilter,
        route: FeedRoute,
        window: PublishingWindow,
        policy: SelectionPolicy,
        pacing: PacingConfig,
    ) -> SchedulerResult<Self> {
        window.validate()?;

        Ok(Self {
            source,
            transport,
            ledger,
            filter,
            route,
            window,
            policy,
            pacing,
            guard: Mutex::new(()),
        })
    }

    /// The configured publishing window.
    pub fn window(&self) -> &PublishingWindow {
        &self.window
    }

    /// The backing ledger (for the status surface).
    pub fn ledger(&self) -> &Arc<dyn PublishLedger> {
        &self.ledger
    }

    /// Run one tick at the current instant.
    pub async fn run_tick(&self, force: bool) -> SchedulerResult<TickReport> {
        self.run_tick_at(Utc::now(), force).await
    }

    /// Run one tick at an explicit instant.
    ///
    /// `force` bypasses the publishing-window gate (used by the manual
    /// trigger surface) but never the ledger or the quota.
    pub async fn run_tick_at(&self, now: DateTime<Utc>, force: bool) -> SchedulerResult<TickReport> {
        let _tick = self.guard.lock().await;

        // Gating
        if !force && !self.window.allowed(now)? {
            tracing::debug!("Outside publishing window, tick skipped");
            return Ok(TickReport::Skipped(SkipReason::OutsideWindow));
        }

        // Fetching
        let cursor = self.ledger.cursor()?;
        let fetched = match self.source.fetch(now, cursor).await {
            Ok(items) => items,
            Err(SourceError::Unavailable(reason)) => {
                tracing::warn!(source = self.source.name(), %reason, "Candidate source unavailable, retrying next tick");
                return Ok(TickReport::Skipped(SkipReason::SourceUnavailable));
            }
        };

        if fetched.is_empty() {
            tracing::debug!("No candidates fetched");
            return Ok(TickReport::Skipped(SkipReason::NothingEligible));
        }

        // Filtering: every undecided item gets a verdict; rejections become
        // permanent here, before any publishing happens.
        let mut summary = TickSummary::default();
        let mut decided_now: HashSet<ItemId> = HashSet::new();
        let mut candidates: Vec<Item> = Vec::new();
        let mut cleaned_by_id: HashMap<ItemId, String> = HashMap::new();

        for item in &fetched {
            if self.ledger.has(item.id)? {
                summary.already_seen += 1;
                continue;
            }

            let verdict = self.filter.evaluate(item);
            if verdict.accept {
                cleaned_by_id.insert(item.id, verdict.cleaned_text);
                candidates.push(item.clone());
            } else {
                let outcome = match verdict.reason {
                    FilterReason::EmptyContent => Outcome::SkippedEmpty,
                    _ => Outcome::SkippedFiltered,
                };
                self.ledger.record(item.id, outcome)?;
                decided_now.insert(item.id);
                summary.filtered += 1;
                tracing::info!(
                    item_id = item.id,
                    reason = verdict.reason.as_str(),
                    "Candidate rejected by content filter"
                );
            }
        }

        // Selecting
        candidates.sort_by_key(|item| (item.timestamp, item.id));
        let selected = self
            .policy
            .select(&candidates, self.window.quota_per_tick);

        // Publishing
        for (index, item) in selected.iter().enumerate() {
            if index > 0 {
                tokio::time::sleep(self.pacing.inter_send_delay).await;
            }

            let cleaned = cleaned_by_id.get(&item.id).map(String::as_str);
            match self.publish_with_retry(item, cleaned).await {
                Ok(message_id) => {
                    self.ledger.record(item.id, Outcome::Published)?;
                    decided_now.insert(item.id);
                    tracing::info!(item_id = item.id, %message_id, "Item published");
                    summary.published.push((item.id, message_id));
                }
                Err(e) => {
                    // One exhausted failure is final; the item is never
                    // offered again.
                    self.ledger.record(item.id, Outcome::FailedPermanent)?;
                    decided_now.insert(item.id);
                    summary.failed += 1;
                    tracing::warn!(item_id = item.id, error = %e, "Publish failed permanently");
                }
            }
        }

        // Committing: move the cursor to the highest fetched id below which
        // every fetched candidate has a recorded outcome. Quota leftovers
        // hold the cursor back so a poll source offers them again.
        let mut ids: Vec<ItemId> = fetched.iter().map(|item| item.id).collect();
        ids.sort_unstable();
        ids.dedup();

        let mut commit_to = None;
        for id in ids {
            if decided_now.contains(&id) || self.ledger.has(id)? {
                commit_to = Some(id);
            } else {
                break;
            }
        }

        if let Some(to) = commit_to {
            if cursor.map_or(true, |c| to > c) {
                self.ledger.advance_cursor(to)?;
                tracing::debug!(cursor = to, "Cursor advanced");
            }
        }
        summary.cursor = self.ledger.cursor()?;

        if summary.published.is_empty()
            && summary.filtered == 0
            && summary.failed == 0
        {
            return Ok(TickReport::Skipped(SkipReason::NothingEligible));
        }

        Ok(TickReport::Completed(summary))
    }

    /// Publish one item, retrying transient transport failures with
    /// exponential backoff. Non-retryable failures return immediately.
    async fn publish_with_retry(
        &self,
        item: &Item,
        cleaned_text: Option<&str>,
    ) -> Result<MessageId, TransportError> {
        let mut attempt = 0;

        loop {
            attempt += 1;

            match self
                .transport
                .publish(&self.route.target, &self.route.source, item, cleaned_text)
                .await
            {
                Ok(message_id) => return Ok(message_id),
                Err(e) if e.is_retryable() && attempt < self.pacing.max_send_attempts => {
                    let delay = self.pacing.retry_backoff * 2u32.pow(attempt - 1);
                    tracing::warn!(
                        item_id = item.id,
                        attempt,
                        error = %e,
                        "Publish attempt failed, backing off"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
