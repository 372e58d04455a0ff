use std::env;
use std::time::Duration;
use log::warn;

use crate::errors::ConfigError;

// Server Configuration
pub const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1:8082";
pub const DEFAULT_API_BIND_ADDRESS: &str = "127.0.0.1:8081";
pub const DEFAULT_INDEX_FILE: &str = "index.html";
pub const STATS_INTERVAL_SECS: u64 = 60;

// Polling Configuration
pub const DEFAULT_SYMBOLS: [&str; 2] = ["AAPL", "GOOGL"];
pub const DEFAULT_POLL_SECS: u64 = 60;
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 10;
pub const PROVIDER_BASE_URL: &str = "https://www.alphavantage.co/query";

// Ranked Store Configuration
pub const DEFAULT_REDIS_URL: &str = "redis://localhost:6379";
pub const DEFAULT_LEADERBOARD_KEY: &str = "leaderboard";

// Broadcast Configuration
pub const UPDATE_CHANNEL_SIZE: usize = 128;
pub const DELIVERY_TIMEOUT_SECS: u64 = 5;

pub struct Config {
    pub bind_address: String,
    pub api_bind_address: String,
    pub symbols: Vec<String>,
    pub poll_interval: Duration,
    pub provider_key: Option<String>,
    pub fetch_timeout: Duration,
    pub redis_url: String,
    pub leaderboard_key: String,
    pub index_file: String,
    pub log_level: String,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            bind_address: env::var("BIND_ADDRESS")
                .unwrap_or_else(|_| DEFAULT_BIND_ADDRESS.to_string()),
            api_bind_address: env::var("API_BIND_ADDRESS")
                .unwrap_or_else(|_| DEFAULT_API_BIND_ADDRESS.to_string()),
            symbols: parse_symbols(env::var("STOCK_SYMBOLS").ok().as_deref()),
            poll_interval: parse_poll_interval(env::var("POLL_SECONDS").ok().as_deref()),
            provider_key: env::var("ALPHA_VANTAGE_KEY")
                .ok()
                .map(|key| key.trim().to_string())
                .filter(|key| !key.is_empty()),
            fetch_timeout: Duration::from_secs(
                env::var("FETCH_TIMEOUT_SECS")
                    .ok()
                    .and_then(|v| v.trim().parse::<u64>().ok())
                    .filter(|secs| *secs > 0)
                    .unwrap_or(DEFAULT_FETCH_TIMEOUT_SECS),
            ),
            redis_url: env::var("REDIS_URL")
                .unwrap_or_else(|_| DEFAULT_REDIS_URL.to_string()),
            leaderboard_key: env::var("LEADERBOARD_KEY")
                .unwrap_or_else(|_| DEFAULT_LEADERBOARD_KEY.to_string()),
            index_file: env::var("INDEX_FILE")
                .unwrap_or_else(|_| DEFAULT_INDEX_FILE.to_string()),
            log_level: env::var("RUST_LOG")
                .unwrap_or_else(|_| "info".to_string()),
        }
    }

    /// Returns the provider key, failing when the process was started without one.
    pub fn validate(&self) -> Result<&str, ConfigError> {
        if !std::path::Path::new(&self.index_file).exists() {
            warn!("Index file not found: {} (root page will return 404)", self.index_file);
        }

        self.provider_key
            .as_deref()
            .ok_or(ConfigError::MissingProviderKey)
    }

    pub fn log_config(&self) {
        println!("Server Configuration:");
        println!("  WebSocket Address: {}", self.bind_address);
        println!("  API Address: {}", self.api_bind_address);
        println!("  Symbols: {}", self.symbols.join(","));
        println!("  Poll Interval: {}s", self.poll_interval.as_secs());
        println!("  Fetch Timeout: {}s", self.fetch_timeout.as_secs());
        println!("  Redis URL: {}", self.redis_url);
        println!("  Leaderboard Key: {}", self.leaderboard_key);
        println!("  Log Level: {}", self.log_level);
        match &self.provider_key {
            Some(key) => println!("  Provider Key: {}***", key.chars().take(4).collect::<String>()),
            None => println!("  Provider Key: <missing>"),
        }
    }
}

/// Splits a comma separated symbol list, keeping configured order.
pub fn parse_symbols(raw: Option<&str>) -> Vec<String> {
    let symbols: Vec<String> = raw
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();

    if symbols.is_empty() {
        DEFAULT_SYMBOLS.iter().map(|s| s.to_string()).collect()
    } else {
        symbols
    }
}

pub fn parse_poll_interval(raw: Option<&str>) -> Duration {
    let secs = raw
        .and_then(|v| v.trim().parse::<i64>().ok())
        .filter(|secs| *secs > 0)
        .map(|secs| secs as u64)
        .unwrap_or(DEFAULT_POLL_SECS);
    Duration::from_secs(secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_key(key: Option<&str>) -> Config {
        let mut config = Config::from_env();
        config.provider_key = key.map(str::to_string);
        config
    }

    #[test]
    fn test_config_from_env() {
        let config = Config::from_env();
        assert!(!config.bind_address.is_empty());
        assert!(!config.api_bind_address.is_empty());
        assert!(!config.symbols.is_empty());
        assert!(config.poll_interval > Duration::ZERO);
    }

    #[test]
    fn test_missing_provider_key_is_fatal() {
        let config = config_with_key(None);
        assert!(matches!(config.validate(), Err(ConfigError::MissingProviderKey)));

        let config = config_with_key(Some("demo-key"));
        assert_eq!(config.validate().unwrap(), "demo-key");
    }

    #[test]
    fn test_parse_symbols() {
        assert_eq!(parse_symbols(None), vec!["AAPL", "GOOGL"]);
        assert_eq!(parse_symbols(Some("  ")), vec!["AAPL", "GOOGL"]);
        assert_eq!(parse_symbols(Some(" , ,")), vec!["AAPL", "GOOGL"]);
        assert_eq!(
            parse_symbols(Some("MSFT, TSLA ,,NVDA")),
            vec!["MSFT", "TSLA", "NVDA"]
        );
    }

    #[test]
    fn test_parse_poll_interval() {
        assert_eq!(parse_poll_interval(None), Duration::from_secs(60));
        assert_eq!(parse_poll_interval(Some("15")), Duration::from_secs(15));
        assert_eq!(parse_poll_interval(Some(" 5 ")), Duration::from_secs(5));
        assert_eq!(parse_poll_interval(Some("0")), Duration::from_secs(60));
        assert_eq!(parse_poll_interval(Some("-3")), Duration::from_secs(60));
        assert_eq!(parse_poll_interval(Some("soon")), Duration::from_secs(60));
    }
}
