pub mod redis_store;
#[cfg(test)]
pub mod memory;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::StoreError;

pub use redis_store::RedisRankedStore;

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct LeaderboardEntry {
    pub symbol: String,
    pub score: f64,
}

/// Latest percent-change score per symbol, kept by an external sorted-set service.
///
/// Recording a score replaces whatever was stored for that symbol before.
/// Entries with equal scores come back in the backing store's own order.
#[async_trait]
pub trait RankedStore: Send + Sync {
    async fn record_score(&self, symbol: &str, score: f64) -> Result<(), StoreError>;

    async fn read_all_descending(&self) -> Result<Vec<LeaderboardEntry>, StoreError>;
}
