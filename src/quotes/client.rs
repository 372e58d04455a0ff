use std::collections::HashMap;
use std::time::Duration;
use async_trait::async_trait;
use serde::Deserialize;
use log::debug;

use crate::errors::QuoteError;
use crate::quotes::StockUpdate;

const PRICE_FIELD: &str = "05. price";
const PREVIOUS_CLOSE_FIELD: &str = "08. previous close";

/// A source of latest quotes, one request per symbol.
///
/// `Ok(None)` means the provider answered but had no usable data for the
/// symbol this time (unknown symbol, rate-limit placeholder, zero previous
/// close). Only transport and decoding failures are errors.
#[async_trait]
pub trait QuoteSource: Send + Sync {
    async fn fetch(&self, symbol: &str) -> Result<Option<StockUpdate>, QuoteError>;
}

#[derive(Debug, Deserialize)]
struct GlobalQuoteResponse {
    #[serde(rename = "Global Quote", default)]
    global_quote: HashMap<String, String>,
}

pub struct AlphaVantageClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl AlphaVantageClient {
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> Result<Self, QuoteError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.to_string(),
            api_key: api_key.to_string(),
        })
    }
}

#[async_trait]
impl QuoteSource for AlphaVantageClient {
    async fn fetch(&self, symbol: &str) -> Result<Option<StockUpdate>, QuoteError> {
        let response = self.http
            .get(&self.base_url)
            .query(&[
                ("function", "GLOBAL_QUOTE"),
                ("symbol", symbol),
                ("apikey", self.api_key.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(QuoteError::Status(status.as_u16()));
        }

        let body = response.text().await?;
        parse_global_quote(symbol, &body)
    }
}

/// Parses a GLOBAL_QUOTE body into an update for `symbol`.
pub fn parse_global_quote(symbol: &str, body: &str) -> Result<Option<StockUpdate>, QuoteError> {
    let payload: GlobalQuoteResponse = serde_json::from_str(body)?;

    if payload.global_quote.is_empty() {
        debug!("No quote data returned for {}", symbol);
        return Ok(None);
    }

    let current = numeric_field(&payload.global_quote, PRICE_FIELD);
    let previous = numeric_field(&payload.global_quote, PREVIOUS_CLOSE_FIELD);

    Ok(StockUpdate::from_prices(symbol, current, previous))
}

// Missing or unparsable numbers count as zero.
fn numeric_field(quote: &HashMap<String, String>, field: &str) -> f64 {
    quote.get(field)
        .and_then(|value| value.trim().parse::<f64>().ok())
        .unwrap_or(0.0)
}
