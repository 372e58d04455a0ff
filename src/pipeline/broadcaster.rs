use std::sync::Arc;
use tokio::task::JoinHandle;
use log::{info, warn, error, debug};

use crate::pipeline::UpdateReceiver;
use crate::quotes::StockUpdate;
use crate::websocket::{Subscriber, SubscriberId, SubscriberRegistry};

#[derive(Debug, Default, Clone, PartialEq)]
pub struct FanOutReport {
    pub delivered: usize,
    pub evicted: usize,
}

/// Drains the update channel and writes every update to every subscriber.
///
/// This is the only path that writes to subscriber connections. A subscriber
/// whose write fails is closed and dropped from the registry before the next
/// update is sent.
pub struct Broadcaster {
    updates: UpdateReceiver,
    registry: SubscriberRegistry,
}

impl Broadcaster {
    pub fn new(updates: UpdateReceiver, registry: SubscriberRegistry) -> Self {
        Self { updates, registry }
    }

    pub fn start(self) -> JoinHandle<()> {
        tokio::spawn(async move { self.run().await })
    }

    pub async fn run(mut self) {
        info!("Broadcaster started");

        while let Some(update) = self.updates.dequeue().await {
            let report = self.broadcast(&update).await;
            debug!("Broadcasted {} to {} subscribers ({} evicted)",
                   update.symbol, report.delivered, report.evicted);
        }

        info!("Update channel closed, broadcaster stopping");
    }

    /// Delivers one update to all current subscribers while holding the registry lock.
    ///
    /// Failed subscribers leave the registry under that same lock; closing
    /// them happens after it is released.
    pub async fn broadcast(&self, update: &StockUpdate) -> FanOutReport {
        let payload = match update.to_json() {
            Ok(json) => json,
            Err(e) => {
                error!("Failed to serialize update for {}: {}", update.symbol, e);
                return FanOutReport::default();
            }
        };

        let mut report = FanOutReport::default();
        let mut evicted: Vec<Arc<dyn Subscriber>> = Vec::new();

        {
            let mut subscribers = self.registry.lock().await;
            let mut failed: Vec<SubscriberId> = Vec::new();

            for (id, subscriber) in subscribers.iter() {
                match subscriber.deliver(&payload).await {
                    Ok(()) => report.delivered += 1,
                    Err(e) => {
                        warn!("Delivery to subscriber {} failed, evicting: {}", id, e);
                        failed.push(*id);
                    }
                }
            }

            for id in failed {
                if let Some(subscriber) = subscribers.remove(&id) {
                    evicted.push(subscriber);
                }
            }
        }

        report.evicted = evicted.len();
        for subscriber in evicted {
            subscriber.close().await;
        }

        report
    }
}
