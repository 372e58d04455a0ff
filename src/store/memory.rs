use std::collections::HashMap;
use std::sync::Mutex;
use async_trait::async_trait;

use crate::errors::StoreError;
use crate::store::{LeaderboardEntry, RankedStore};

/// In-process stand-in for the Redis leaderboard, with the same tie-break.
#[derive(Default)]
pub struct MemoryRankedStore {
    scores: Mutex<HashMap<String, f64>>,
    writes: Mutex<usize>,
}

impl MemoryRankedStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write_count(&self) -> usize {
        *self.writes.lock().unwrap()
    }
}

#[async_trait]
impl RankedStore for MemoryRankedStore {
    async fn record_score(&self, symbol: &str, score: f64) -> Result<(), StoreError> {
        self.scores.lock().unwrap().insert(symbol.to_string(), score);
        *self.writes.lock().unwrap() += 1;
        Ok(())
    }

    async fn read_all_descending(&self) -> Result<Vec<LeaderboardEntry>, StoreError> {
        let mut entries: Vec<LeaderboardEntry> = self.scores.lock().unwrap()
            .iter()
            .map(|(symbol, score)| LeaderboardEntry { symbol: symbol.clone(), score: *score })
            .collect();

        entries.sort_by(|a, b| {
            b.score.total_cmp(&a.score).then_with(|| b.symbol.cmp(&a.symbol))
        });
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn symbols(entries: &[LeaderboardEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.symbol.as_str()).collect()
    }

    #[tokio::test]
    async fn test_read_all_descending() {
        let store = MemoryRankedStore::new();
        store.record_score("AAPL", 5.0).await.unwrap();
        store.record_score("GOOGL", -2.0).await.unwrap();
        store.record_score("MSFT", 10.0).await.unwrap();

        let entries = store.read_all_descending().await.unwrap();
        assert_eq!(symbols(&entries), vec!["MSFT", "AAPL", "GOOGL"]);
        assert_eq!(entries[0].score, 10.0);
        assert_eq!(entries[2].score, -2.0);
    }

    #[tokio::test]
    async fn test_record_overwrites_previous_score() {
        let store = MemoryRankedStore::new();
        store.record_score("AAPL", 5.0).await.unwrap();
        store.record_score("AAPL", 3.0).await.unwrap();

        let entries = store.read_all_descending().await.unwrap();
        assert_eq!(entries, vec![LeaderboardEntry { symbol: "AAPL".to_string(), score: 3.0 }]);
        assert_eq!(store.write_count(), 2);
    }

    #[tokio::test]
    async fn test_equal_scores_reverse_lexical() {
        let store = MemoryRankedStore::new();
        store.record_score("AMZN", 1.0).await.unwrap();
        store.record_score("TSLA", 1.0).await.unwrap();
        store.record_score("META", 1.0).await.unwrap();

        let entries = store.read_all_descending().await.unwrap();
        assert_eq!(symbols(&entries), vec!["TSLA", "META", "AMZN"]);
    }
}
