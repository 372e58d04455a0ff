use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use log::{info, warn, error};

use crate::config::DEFAULT_POLL_SECS;
use crate::pipeline::UpdateSender;
use crate::quotes::QuoteSource;
use crate::store::RankedStore;

#[derive(Debug, Default, Clone, PartialEq)]
pub struct CycleSummary {
    pub fetched: usize,
    pub empty: usize,
    pub failed: usize,
    pub dropped: usize,
}

/// Fetches every configured symbol on a fixed cadence, records the score and
/// hands the update to the broadcaster.
pub struct Poller {
    source: Arc<dyn QuoteSource>,
    store: Arc<dyn RankedStore>,
    updates: UpdateSender,
    symbols: Vec<String>,
    poll_interval: Duration,
}

impl Poller {
    /// A zero `poll_interval` falls back to the default cadence.
    pub fn new(
        source: Arc<dyn QuoteSource>,
        store: Arc<dyn RankedStore>,
        updates: UpdateSender,
        symbols: Vec<String>,
        poll_interval: Duration,
    ) -> Self {
        let poll_interval = if poll_interval.is_zero() {
            warn!("Zero poll interval, using {}s", DEFAULT_POLL_SECS);
            Duration::from_secs(DEFAULT_POLL_SECS)
        } else {
            poll_interval
        };

        Self {
            source,
            store,
            updates,
            symbols,
            poll_interval,
        }
    }

    pub fn start(self) -> JoinHandle<()> {
        tokio::spawn(async move { self.run().await })
    }

    /// Polls once right away, then once per interval, for the life of the process.
    pub async fn run(self) {
        let mut interval_timer = interval(self.poll_interval);
        interval_timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!("Polling {} symbols every {}s: {}",
              self.symbols.len(), self.poll_interval.as_secs(), self.symbols.join(","));

        loop {
            interval_timer.tick().await;
            let summary = self.poll_once().await;
            info!("Poll cycle complete - fetched: {}, empty: {}, failed: {}, dropped: {}",
                  summary.fetched, summary.empty, summary.failed, summary.dropped);
        }
    }

    /// One pass over the symbol list in configured order.
    pub async fn poll_once(&self) -> CycleSummary {
        let mut summary = CycleSummary::default();

        for symbol in &self.symbols {
            let update = match self.source.fetch(symbol).await {
                Ok(Some(update)) => update,
                Ok(None) => {
                    summary.empty += 1;
                    continue;
                }
                Err(e) => {
                    warn!("Failed to fetch quote for {}: {}", symbol, e);
                    summary.failed += 1;
                    continue;
                }
            };

            summary.fetched += 1;

            // Recorded whether or not the channel has room.
            if let Err(e) = self.store.record_score(&update.symbol, update.percent_change).await {
                error!("Failed to record score for {}: {}", update.symbol, e);
            }

            if !self.updates.enqueue(update) {
                summary.dropped += 1;
            }
        }

        summary
    }
}
