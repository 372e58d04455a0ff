use std::sync::Arc;
use async_trait::async_trait;
use redis::AsyncCommands;
use log::debug;

use crate::errors::StoreError;
use crate::store::{LeaderboardEntry, RankedStore};

/// Sorted-set leaderboard in Redis.
///
/// Ties on score are returned in reverse lexical order of the symbol, which is
/// how `ZREVRANGE` orders members with equal scores.
#[derive(Clone)]
pub struct RedisRankedStore {
    client: Arc<redis::Client>,
    key: String,
}

impl RedisRankedStore {
    pub fn new(redis_url: &str, key: &str) -> Result<Self, StoreError> {
        let client = redis::Client::open(redis_url)?;
        Ok(Self {
            client: Arc::new(client),
            key: key.to_string(),
        })
    }

    async fn get_connection(&self) -> Result<redis::aio::MultiplexedConnection, StoreError> {
        let conn = self.client.get_multiplexed_async_connection().await?;
        Ok(conn)
    }
}

#[async_trait]
impl RankedStore for RedisRankedStore {
    async fn record_score(&self, symbol: &str, score: f64) -> Result<(), StoreError> {
        let mut conn = self.get_connection().await?;
        let _: () = conn.zadd(&self.key, symbol, score).await?;
        debug!("Recorded {} = {:.4} in '{}'", symbol, score, self.key);
        Ok(())
    }

    async fn read_all_descending(&self) -> Result<Vec<LeaderboardEntry>, StoreError> {
        let mut conn = self.get_connection().await?;
        let members: Vec<(String, f64)> = conn.zrevrange_withscores(&self.key, 0, -1).await?;

        Ok(members
            .into_iter()
            .map(|(symbol, score)| LeaderboardEntry { symbol, score })
            .collect())
    }
}
