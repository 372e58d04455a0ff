use serde::{Deserialize, Serialize};

/// One symbol's freshly computed price and percent change for a poll cycle.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct StockUpdate {
    pub symbol: String,
    pub price: f64,
    #[serde(rename = "change")]
    pub percent_change: f64,
}

impl StockUpdate {
    /// Returns `None` when the previous close is zero; there is nothing to
    /// compare the current price against.
    pub fn from_prices(symbol: &str, current: f64, previous: f64) -> Option<Self> {
        if previous == 0.0 {
            return None;
        }

        Some(StockUpdate {
            symbol: symbol.to_string(),
            price: current,
            percent_change: (current - previous) / previous * 100.0,
        })
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
