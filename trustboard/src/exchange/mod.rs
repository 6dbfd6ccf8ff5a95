//! Exchange integration module
//!
//! HTTP fetchers for the CoinGecko market-chart and Kraken OHLC endpoints.
//! Payload decoding lives next to each provider so it can be tested without
//! a network.

pub mod client;
pub mod coingecko;
pub mod kraken;

pub use client::*;
pub use coingecko::{parse_market_chart, MarketChartResponse};
pub use kraken::{parse_ohlc_response, KrakenOhlcResponse, KRAKEN_INTERVALS};
