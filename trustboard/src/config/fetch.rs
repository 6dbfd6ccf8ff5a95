//! Provider endpoint configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const COINGECKO_BASE_URL: &str = "https://api.coingecko.com/api/v3";
pub const KRAKEN_BASE_URL: &str = "https://api.kraken.com";

/// HTTP settings for the market data fetchers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// CoinGecko API root (e.g., "https://api.coingecko.com/api/v3")
    pub coingecko_base_url: String,
    /// Kraken API root (e.g., "https://api.kraken.com")
    pub kraken_base_url: String,
    /// Optional CoinGecko demo API key, sent as `x-cg-demo-api-key`
    pub coingecko_api_key: Option<String>,
    /// Per-request timeout
    pub timeout: Duration,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            coingecko_base_url: COINGECKO_BASE_URL.to_string(),
            kraken_base_url: KRAKEN_BASE_URL.to_string(),
            coingecko_api_key: None,
            timeout: Duration::from_secs(30),
        }
    }
}
