//! Where the dashboard reads candles from

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use shared::{fetch_candles_since, DbPool};
use std::path::PathBuf;
use trustboard::data::Candle;
use trustboard::storage::read_candles;

pub enum CandleStore {
    /// `fact_price_candle` in the warehouse
    Database(DbPool),
    /// The transformed CSV written by the etl
    Csv(PathBuf),
}

impl CandleStore {
    pub fn describe(&self) -> String {
        match self {
            CandleStore::Database(_) => "database".to_string(),
            CandleStore::Csv(path) => format!("csv file {}", path.display()),
        }
    }

    /// Candles starting at or after `since`, sorted by `(ts_start, source)`
    pub async fn load_since(&self, since: DateTime<Utc>) -> Result<Vec<Candle>> {
        match self {
            CandleStore::Database(pool) => fetch_candles_since(pool, since).await,
            CandleStore::Csv(path) => {
                let path = path.clone();
                let candles = tokio::task::spawn_blocking(move || read_candles(&path))
                    .await
                    .context("csv reader task panicked")??;
                Ok(candles.into_iter().filter(|c| c.ts_start >= since).collect())
            }
        }
    }
}
