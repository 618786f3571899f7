//! Tick loop
//!
//! Drives the scheduler on a fixed interval until a shutdown signal fires.
//! Every firing runs one unforced tick; skipped ticks (outside the window,
//! source outage, nothing eligible) are logged and the loop keeps going.
//! Only fatal scheduler errors stop the loop: a ledger whose invariants
//! broke must not keep deciding outcomes.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use super::error::SchedulerResult;
use super::rotation::RotationScheduler;
use crate::models::TickReport;

/// Interval-driven runner around a [`RotationScheduler`].
pub struct TickLoop {
    scheduler: Arc<RotationScheduler>,
    interval: Duration,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
}

impl TickLoop {
    /// Create a loop firing every `interval`.
    pub fn new(scheduler: Arc<RotationScheduler>, interval: Duration) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        Self {
            scheduler,
            interval,
            shutdown_tx,
            shutdown_rx,
        }
    }

    /// Handle used to stop the loop from another task.
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            tx: self.shutdown_tx.clone(),
        }
    }

    /// Run until shutdown. A tick in flight when shutdown fires is
    /// cancelled; outcomes it already recorded stay valid, undecided items
    /// are simply retried on the next start.
    pub async fn run(&self) -> SchedulerResult<()> {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        let mut shutdown = self.shutdown_rx.clone();

        tracing::info!(interval_secs = self.interval.as_secs(), "Tick loop started");

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match self.scheduler.run_tick(false).await {
                        Ok(TickReport::Completed(summary)) => {
                            tracing::info!(summary = %summary.display_line(), "Tick completed");
                        }
                        Ok(TickReport::Skipped(reason)) => {
                            tracing::debug!(%reason, "Tick skipped");
                        }
                        Err(e) if e.is_fatal() => {
                            tracing::error!(error = %e, "Fatal scheduler error, stopping tick loop");
                            return Err(e);
                        }
                        Err(e) => {
                            tracing::warn!(error = %e, "Tick failed, retrying next interval");
                        }
                    }
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        tracing::info!("Shutdown requested, tick loop stopping");
                        return Ok(());
                    }
                }
            }
        }
    }
}

/// Clonable stop signal for a running [`TickLoop`].
#[derive(Clone)]
pub struct ShutdownHandle {
    tx: watch::Sender<bool>,
}

impl ShutdownHandle {
    /// Request the loop to stop after the current select arm.
    pub fn shutdown(&self) {
        let _ = self.tx.send(true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::ContentFilter;
    use crate::ledger::SqliteLedger;
    use crate::models::{Item, ItemId};
    use crate::scheduler::rotation::{FeedRoute, PacingConfig};
    use crate::scheduler::selection::SelectionPolicy;
    use crate::scheduler::window::PublishingWindow;
    use crate::source::{CandidateSource, SourceResult};
    use crate::transport::{FeedRef, MessageId, Transport, TransportResult};
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};

    struct EmptySource;

    #[async_trait]
    impl CandidateSource for EmptySource {
        fn name(&self) -> &str {
            "empty"
        }

        async fn fetch(
            &self,
            _now: DateTime<Utc>,
            _cursor: Option<ItemId>,
        ) -> SourceResult<Vec<Item>> {
            Ok(Vec::new())
        }
    }

    struct NullTransport;

    #[async_trait]
    impl Transport for NullTransport {
        fn name(&self) -> &str {
            "null"
        }

        async fn publish(
            &self,
            _target: &FeedRef,
            _source: &FeedRef,
            item: &Item,
            _cleaned_text: Option<&str>,
        ) -> TransportResult<MessageId> {
            Ok(format!("msg-{}", item.id))
        }

        async fn fetch_range(
            &self,
            _feed: &FeedRef,
            _since: DateTime<Utc>,
        ) -> TransportResult<Vec<Item>> {
            Ok(Vec::new())
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

    fn idle_scheduler() -> Arc<RotationScheduler> {
        let window = PublishingWindow {
            start_hour: 0,
            end_hour: 24,
            quota_per_tick: 1,
            timezone: "UTC".to_string(),
        };

        Arc::new(
            RotationScheduler::new(
                Arc::new(EmptySource),
                Arc::new(NullTransport),
                Arc::new(SqliteLedger::in_memory().unwrap()),
                ContentFilter::new(&[]),
                FeedRoute {
                    source: FeedRef::new("src"),
                    target: FeedRef::new("dst"),
                },
                window,
                SelectionPolicy::OldestFirst,
                PacingConfig::default(),
            )
            .unwrap(),
        )
    }

    #[tokio::test]
    async fn test_shutdown_stops_loop() {
        let tick_loop = TickLoop::new(idle_scheduler(), Duration::from_millis(10));
        let handle = tick_loop.shutdown_handle();

        let runner = tokio::spawn(async move { tick_loop.run().await });

        tokio::time::sleep(Duration::from_millis(50)).await;
        handle.shutdown();

        let result = tokio::time::timeout(Duration::from_secs(1), runner)
            .await
            .expect("loop did not stop")
            .unwrap();
        assert!(result.is_ok());
    }
}
