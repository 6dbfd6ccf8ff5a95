//! Pipeline run configuration

use crate::normalize::NormalizeParams;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const COINGECKO_RAW_FILE: &str = "coingecko_data.csv";
pub const KRAKEN_RAW_FILE: &str = "kraken_ohlc.csv";
pub const TRANSFORMED_FILE: &str = "transformed_crypto_data.csv";
pub const CANDLE_TABLE: &str = "fact_price_candle";

/// What to fetch and how to normalize it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// CoinGecko coin id (e.g., "bitcoin"); upper-cased it becomes the asset
    pub coin_id: String,
    /// Quote currency (e.g., "usd")
    pub vs_currency: String,
    /// Lookback window in days
    pub days: u32,
    /// Kraken pair (e.g., "XBTUSD")
    pub kraken_pair: String,
    /// Candle width in minutes
    pub interval_min: u32,
    /// Spike threshold as a fraction (e.g., 0.10 = 10%)
    pub spike_pct: f64,
    /// Optional Kraken `since` cursor (unix seconds)
    pub kraken_since: Option<i64>,
    /// Directory holding the raw and transformed CSV files
    pub data_dir: PathBuf,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            coin_id: "bitcoin".to_string(),
            vs_currency: "usd".to_string(),
            days: 7,
            kraken_pair: "XBTUSD".to_string(),
            interval_min: 5,
            spike_pct: 0.10,
            kraken_since: None,
            data_dir: PathBuf::from("data"),
        }
    }
}

impl PipelineConfig {
    pub fn asset(&self) -> String {
        self.coin_id.to_uppercase()
    }

    pub fn normalize_params(&self) -> NormalizeParams {
        NormalizeParams::new(&self.coin_id, self.interval_min, self.spike_pct)
    }

    pub fn coingecko_raw_path(&self) -> PathBuf {
        self.data_dir.join(COINGECKO_RAW_FILE)
    }

    pub fn kraken_raw_path(&self) -> PathBuf {
        self.data_dir.join(KRAKEN_RAW_FILE)
    }

    pub fn transformed_path(&self) -> PathBuf {
        self.data_dir.join(TRANSFORMED_FILE)
    }
}
