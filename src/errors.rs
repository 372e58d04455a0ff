use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing ALPHA_VANTAGE_KEY")]
    MissingProviderKey,
}

/// Anything that keeps a quote request from producing a parseable body.
#[derive(Error, Debug)]
pub enum QuoteError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("provider returned HTTP {0}")]
    Status(u16),

    #[error("malformed provider response: {0}")]
    Decode(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum DeliveryError {
    #[error("websocket write failed: {0}")]
    Send(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("websocket write timed out")]
    Timeout,

    #[error("subscriber closed")]
    Closed,
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),
}
