use crate::composer::MessageComposer;
use crate::cursor::{CursorState, CursorStore, WatchedAddress};
use crate::delivery::DeliveryChannel;
use crate::enrich::Enricher;
use crate::poller::ActivityPoller;
use futures::StreamExt;
use futures::stream;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// What happened to one address during a cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddressOutcome {
    /// Nothing new (or the poll failed).
    Idle,
    /// New records arrived but every one was excluded.
    Filtered { dropped: usize },
    Delivered { events: usize, dropped: usize },
    /// Delivery failed; the cursor was left in place for a retry.
    DeliveryFailed,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub addresses: usize,
    pub delivered_messages: usize,
    pub delivered_events: usize,
    pub dropped_records: usize,
    pub failed_deliveries: usize,
}

impl CycleReport {
    fn record(&mut self, outcome: &AddressOutcome) {
        self.addresses += 1;
        match outcome {
            AddressOutcome::Idle => {}
            AddressOutcome::Filtered { dropped } => self.dropped_records += dropped,
            AddressOutcome::Delivered { events, dropped } => {
                self.delivered_messages += 1;
                self.delivered_events += events;
                self.dropped_records += dropped;
            }
            AddressOutcome::DeliveryFailed => self.failed_deliveries += 1,
        }
    }
}

/// The per-address stages: poll, enrich, compose, deliver.
pub struct Pipeline {
    pub poller: ActivityPoller,
    pub enricher: Enricher,
    pub composer: MessageComposer,
    pub channel: Arc<dyn DeliveryChannel>,
}

impl Pipeline {
    /// Runs one address through every stage. The cursor only moves once the
    /// new records have been delivered or all dropped by the exclusion rule.
    pub async fn process(&self, watched: &mut WatchedAddress) -> AddressOutcome {
        let outcome = self.poller.poll(&watched.address, &watched.cursor).await;

        if outcome.records.is_empty() {
            // A fresh cursor still takes the baseline here.
            watched.cursor.advance(outcome.newest_signature);
            return AddressOutcome::Idle;
        }

        let mut events = Vec::with_capacity(outcome.records.len());
        let mut dropped = 0;
        // oldest first, so the message reads chronologically
        for record in outcome.records.into_iter().rev() {
            match self.enricher.enrich(record).await {
                Some(event) => events.push(event),
                None => dropped += 1,
            }
        }

        let Some(message) = self.composer.compose(&events) else {
            debug!(
                "All {} new record(s) for {} were excluded",
                dropped, watched.address
            );
            watched.cursor.advance(outcome.newest_signature);
            return AddressOutcome::Filtered { dropped };
        };

        match self.channel.deliver(&message).await {
            Ok(()) => {
                watched.cursor.advance(outcome.newest_signature);
                info!(
                    "Notified {} event(s) for {} ({} excluded)",
                    events.len(),
                    watched.address,
                    dropped
                );
                AddressOutcome::Delivered {
                    events: events.len(),
                    dropped,
                }
            }
            Err(e) => {
                error!(
                    "Delivery failed for {}, will retry next cycle: {}",
                    watched.address, e
                );
                AddressOutcome::DeliveryFailed
            }
        }
    }
}

/// Scheduler loop: bootstraps every cursor once, then runs a pipeline cycle
/// per interval until shutdown is requested.
pub struct Watcher {
    pipeline: Pipeline,
    cursors: CursorStore,
    poll_interval: Duration,
    concurrency: usize,
}

impl Watcher {
    pub fn new(
        pipeline: Pipeline,
        cursors: CursorStore,
        poll_interval: Duration,
        concurrency: usize,
    ) -> Self {
        Self {
            pipeline,
            cursors,
            poll_interval,
            concurrency: concurrency.max(1),
        }
    }

    pub fn cursor(&self, address: &str) -> Option<&CursorState> {
        self.cursors.get(address)
    }

    /// Polls every address once to establish its cursor. Nothing is
    /// delivered; an address whose poll fails stays uninitialized and takes
    /// its baseline on the next cycle instead.
    pub async fn bootstrap(&mut self) {
        let poller = &self.pipeline.poller;
        stream::iter(self.cursors.iter_mut())
            .for_each_concurrent(self.concurrency, move |watched| async move {
                let outcome = poller.poll(&watched.address, &watched.cursor).await;
                watched.cursor.advance(outcome.newest_signature);
                match &watched.cursor.last_signature {
                    Some(signature) => info!("Baseline for {} set at {}", watched.address, signature),
                    None => info!("No baseline yet for {}", watched.address),
                }
            })
            .await;
    }

    /// Runs every address through the pipeline once, at most `concurrency`
    /// addresses at a time.
    pub async fn run_cycle(&mut self) -> CycleReport {
        let pipeline = &self.pipeline;
        let outcomes: Vec<AddressOutcome> = stream::iter(self.cursors.iter_mut())
            .map(move |watched| pipeline.process(watched))
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        let mut report = CycleReport::default();
        for outcome in &outcomes {
            report.record(outcome);
        }
        report
    }

    /// Bootstraps, then cycles until `shutdown` fires. A cycle in flight is
    /// always completed before returning.
    pub async fn run(&mut self, shutdown: CancellationToken) {
        if self.cursors.is_empty() {
            warn!("No addresses to watch");
            return;
        }
        info!(
            "Bootstrapping cursors for {} address(es)",
            self.cursors.len()
        );
        tokio::select! {
            _ = shutdown.cancelled() => {
                info!("Shutdown requested during bootstrap");
                return;
            }
            _ = self.bootstrap() => {}
        }

        info!(
            "Watching {} address(es) every {}s",
            self.cursors.len(),
            self.poll_interval.as_secs()
        );

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Shutdown requested, stopping watch loop");
                    break;
                }
                _ = sleep(self.poll_interval) => {}
            }

            let cycle_start = Instant::now();
            let report = self.run_cycle().await;
            info!(
                "Cycle finished in {:?}: {} message(s), {} event(s), {} excluded, {} failed deliveries",
                cycle_start.elapsed(),
                report.delivered_messages,
                report.delivered_events,
                report.dropped_records,
                report.failed_deliveries
            );
        }
    }
}
