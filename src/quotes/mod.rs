pub mod client;
pub mod update;

pub use client::{AlphaVantageClient, QuoteSource};
pub use update::StockUpdate;
