use tokio::sync::mpsc::{self, error::TrySendError};
use log::debug;

use crate::quotes::StockUpdate;

/// Creates the bounded queue between the poller and the broadcaster.
///
/// Overflow drops the newest update: the producer never waits, and updates
/// already buffered stay in place.
pub fn update_channel(capacity: usize) -> (UpdateSender, UpdateReceiver) {
    let (tx, rx) = mpsc::channel(capacity);
    (UpdateSender { tx }, UpdateReceiver { rx })
}

#[derive(Clone)]
pub struct UpdateSender {
    tx: mpsc::Sender<StockUpdate>,
}

impl UpdateSender {
    /// Returns `false` when the update was discarded.
    pub fn enqueue(&self, update: StockUpdate) -> bool {
        match self.tx.try_send(update) {
            Ok(()) => true,
            Err(TrySendError::Full(update)) => {
                debug!("Update channel full, dropping update for {}", update.symbol);
                false
            }
            Err(TrySendError::Closed(update)) => {
                debug!("Update channel closed, dropping update for {}", update.symbol);
                false
            }
        }
    }
}

pub struct UpdateReceiver {
    rx: mpsc::Receiver<StockUpdate>,
}

impl UpdateReceiver {
    /// Waits for the next update; `None` once every sender is gone.
    pub async fn dequeue(&mut self) -> Option<StockUpdate> {
        self.rx.recv().await
    }
}
