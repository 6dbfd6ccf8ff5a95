//! Trustboard: crypto candle ETL core
//!
//! This crate turns raw market data from two public price providers into a
//! uniform, gap-free candle table with data-quality flags:
//! - [CoinGecko](https://www.coingecko.com/en/api) market-chart price ticks
//! - [Kraken](https://docs.kraken.com/api/docs/rest-api/get-ohlc-data) OHLC candles
//!
//! # Features
//!
//! - **Data**: raw provider records and the normalized [`Candle`](data::Candle) row
//! - **Normalization**: bucketing, gap filling and quality flags per provider
//! - **Combining**: one time-ordered table across providers
//! - **Exchange**: HTTP fetchers for both providers
//! - **Storage**: raw and transformed CSV files
//! - **Dashboard**: KPI and health computations over persisted candles
//!
//! # Example
//!
//! ```no_run
//! use trustboard::prelude::*;
//!
//! # async fn run() -> std::result::Result<(), EtlError> {
//! let client = MarketDataClient::new(FetchConfig::default())?;
//! let ticks = client.fetch_coingecko_market_chart("bitcoin", "usd", 7).await?;
//! let ohlc = client.fetch_kraken_ohlc("XBTUSD", 5, None).await?;
//!
//! let params = NormalizeParams::new("bitcoin", 5, 0.10);
//! let coingecko = normalize(&RawTable::CoinGecko(ticks), &params)?;
//! let kraken = normalize(&RawTable::Kraken(ohlc), &params)?;
//! let combined = combine(vec![coingecko, kraken])?;
//! println!("{} candles", combined.len());
//! # Ok(())
//! # }
//! ```

pub mod combine;
pub mod config;
pub mod dashboard;
pub mod data;
pub mod error;
pub mod exchange;
pub mod normalize;
pub mod storage;

// Re-export commonly used types
pub mod prelude {
    pub use crate::combine::*;
    pub use crate::config::*;
    pub use crate::dashboard::*;
    pub use crate::data::*;
    pub use crate::error::*;
    pub use crate::exchange::{MarketDataClient, KRAKEN_INTERVALS};
    pub use crate::normalize::{normalize, NormalizeParams};
    pub use crate::storage::*;
}
