use std::collections::HashMap;
use std::sync::Arc;
use async_trait::async_trait;
use tokio::sync::{Mutex, MutexGuard};
use uuid::Uuid;
use log::info;

use crate::errors::DeliveryError;

pub type SubscriberId = Uuid;

/// A live connection that receives broadcast updates.
#[async_trait]
pub trait Subscriber: Send + Sync {
    fn id(&self) -> SubscriberId;

    async fn deliver(&self, payload: &str) -> Result<(), DeliveryError>;

    async fn close(&self);
}

pub type SubscriberMap = HashMap<SubscriberId, Arc<dyn Subscriber>>;

/// The set of connected subscribers, shared by connection handlers and the
/// broadcaster. Every mutation and every full iteration goes through one lock.
#[derive(Clone, Default)]
pub struct SubscriberRegistry {
    subscribers: Arc<Mutex<SubscriberMap>>,
}

impl SubscriberRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add(&self, subscriber: Arc<dyn Subscriber>) {
        let mut subscribers = self.subscribers.lock().await;
        let id = subscriber.id();
        subscribers.insert(id, subscriber);
        info!("Subscriber {} registered ({} active)", id, subscribers.len());
    }

    /// Safe to call for a subscriber that is already gone.
    pub async fn remove(&self, id: SubscriberId) -> Option<Arc<dyn Subscriber>> {
        let mut subscribers = self.subscribers.lock().await;
        let removed = subscribers.remove(&id);
        if removed.is_some() {
            info!("Subscriber {} unregistered ({} active)", id, subscribers.len());
        }
        removed
    }

    pub async fn contains(&self, id: SubscriberId) -> bool {
        self.subscribers.lock().await.contains_key(&id)
    }

    pub async fn len(&self) -> usize {
        self.subscribers.lock().await.len()
    }

    /// Exclusive access for a whole fan-out pass.
    pub async fn lock(&self) -> MutexGuard<'_, SubscriberMap> {
        self.subscribers.lock().await
    }
}
