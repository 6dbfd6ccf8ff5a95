//! The extract, transform and load stages

use crate::repositories::CandleRepository;
use anyhow::anyhow;
use migration::{Migrator, MigratorTrait};
use shared::get_db_connection;
use std::fmt;
use std::sync::Arc;
use tracing::{info, warn};
use trustboard::combine::combine;
use trustboard::config::{FetchConfig, PipelineConfig};
use trustboard::data::{Candle, CandleSeries, OhlcRow, PriceTick, RawTable};
use trustboard::exchange::MarketDataClient;
use trustboard::normalize::normalize;
use trustboard::storage::{
    read_candles, read_ohlc_rows, read_price_ticks, write_candles, write_ohlc_rows,
    write_price_ticks,
};

/// Pipeline stage a failure is attributed to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Extract,
    Normalize,
    Combine,
    Persist,
    Load,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Extract => "extract",
            Stage::Normalize => "normalize",
            Stage::Combine => "combine",
            Stage::Persist => "persist",
            Stage::Load => "load",
        };
        f.write_str(name)
    }
}

#[derive(Debug, thiserror::Error)]
#[error("{stage} failed: {cause:#}")]
pub struct StageError {
    pub stage: Stage,
    pub cause: anyhow::Error,
}

trait StageContext<T> {
    fn stage(self, stage: Stage) -> Result<T, StageError>;
}

impl<T, E: Into<anyhow::Error>> StageContext<T> for Result<T, E> {
    fn stage(self, stage: Stage) -> Result<T, StageError> {
        self.map_err(|e| StageError {
            stage,
            cause: e.into(),
        })
    }
}

/// Raw tables fetched in one extract run
#[derive(Debug, Clone, Default)]
pub struct Extracted {
    pub ticks: Vec<PriceTick>,
    pub ohlc: Vec<OhlcRow>,
}

pub struct Pipeline {
    fetch: FetchConfig,
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(fetch: FetchConfig, config: PipelineConfig) -> Self {
        Self { fetch, config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Fetch both providers and save each raw table that arrived.
    ///
    /// A failed fetch does not stop the other one, but fails the stage.
    pub async fn extract(&self) -> Result<Extracted, StageError> {
        let client = MarketDataClient::new(self.fetch.clone()).stage(Stage::Extract)?;
        let mut failures = Vec::new();
        let mut extracted = Extracted::default();

        match client
            .fetch_coingecko_market_chart(&self.config.coin_id, &self.config.vs_currency, self.config.days)
            .await
        {
            Ok(ticks) => {
                write_price_ticks(&self.config.coingecko_raw_path(), &ticks).stage(Stage::Persist)?;
                extracted.ticks = ticks;
            }
            Err(e) => {
                warn!("CoinGecko fetch failed: {}", e);
                failures.push(e.to_string());
            }
        }

        match client
            .fetch_kraken_ohlc(&self.config.kraken_pair, self.config.interval_min, self.config.kraken_since)
            .await
        {
            Ok(rows) => {
                write_ohlc_rows(&self.config.kraken_raw_path(), &rows).stage(Stage::Persist)?;
                extracted.ohlc = rows;
            }
            Err(e) => {
                warn!("Kraken fetch failed: {}", e);
                failures.push(e.to_string());
            }
        }

        if !failures.is_empty() {
            return Err(StageError {
                stage: Stage::Extract,
                cause: anyhow!("{} of 2 fetches failed: {}", failures.len(), failures.join("; ")),
            });
        }
        info!(
            "Extracted {} CoinGecko ticks and {} Kraken candles",
            extracted.ticks.len(),
            extracted.ohlc.len()
        );
        Ok(extracted)
    }

    /// Normalize the raw CSV files on disk and write the combined table
    pub fn transform(&self) -> Result<CandleSeries, StageError> {
        let ticks = read_price_ticks(&self.config.coingecko_raw_path()).stage(Stage::Normalize)?;
        let ohlc = read_ohlc_rows(&self.config.kraken_raw_path()).stage(Stage::Normalize)?;
        self.transform_tables(Extracted { ticks, ohlc })
    }

    /// Normalize in-memory raw tables and write the combined table
    pub fn transform_tables(&self, extracted: Extracted) -> Result<CandleSeries, StageError> {
        let params = self.config.normalize_params();
        let coingecko = normalize(&RawTable::CoinGecko(extracted.ticks), &params).stage(Stage::Normalize)?;
        let kraken = normalize(&RawTable::Kraken(extracted.ohlc), &params).stage(Stage::Normalize)?;
        info!(
            "Normalized {} CoinGecko and {} Kraken candles at {}m",
            coingecko.len(),
            kraken.len(),
            params.interval_min
        );

        let combined = combine(vec![coingecko, kraken]).stage(Stage::Combine)?;
        info!(
            "Combined table: {} candles, missing rate {:.2}%, anomaly rate {:.2}%",
            combined.len(),
            combined.missing_rate() * 100.0,
            combined.anomaly_rate() * 100.0
        );
        write_candles(&self.config.transformed_path(), combined.candles()).stage(Stage::Persist)?;
        Ok(combined)
    }

    /// Replace the warehouse table with the transformed candles.
    ///
    /// Reads the transformed CSV when no candles are handed in.
    pub async fn load(&self, database_url: &str, candles: Option<Vec<Candle>>) -> Result<u64, StageError> {
        let candles = match candles {
            Some(candles) => candles,
            None => read_candles(&self.config.transformed_path()).stage(Stage::Load)?,
        };

        let db = get_db_connection(database_url).await.stage(Stage::Load)?;
        Migrator::up(&db, None).await.stage(Stage::Load)?;

        let repository = CandleRepository::new(Arc::new(db));
        let written = repository.replace_all(&candles).await.stage(Stage::Load)?;
        let total = repository.count().await.stage(Stage::Load)?;
        info!("Loaded {} candles, table now holds {} rows", written, total);
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, Utc};
    use std::path::Path;
    use std::time::Duration as StdDuration;

    fn base() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-03-01T09:00:00Z").unwrap().with_timezone(&Utc)
    }

    fn pipeline(data_dir: &Path, base_url: &str) -> Pipeline {
        let fetch = FetchConfig {
            coingecko_base_url: base_url.to_string(),
            kraken_base_url: base_url.to_string(),
            coingecko_api_key: None,
            timeout: StdDuration::from_secs(2),
        };
        let config = PipelineConfig {
            data_dir: data_dir.to_path_buf(),
            ..PipelineConfig::default()
        };
        Pipeline::new(fetch, config)
    }

    fn closed_port_url() -> String {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);
        url
    }

    fn raw_tables() -> Extracted {
        Extracted {
            ticks: (0..30)
                .map(|i| PriceTick::new(base() + Duration::seconds(i * 40), 100.0 + i as f64, Some(10.0)))
                .collect(),
            ohlc: (0..4)
                .map(|i| {
                    OhlcRow::new(base() + Duration::minutes(i * 5), 100.0, 101.0, 99.0, 100.5)
                        .with_volume(100.2, 1.0, 3)
                })
                .collect(),
        }
    }

    #[test]
    fn test_stage_error_names_the_stage() {
        let err = StageError {
            stage: Stage::Normalize,
            cause: anyhow!("no rows"),
        };
        assert_eq!(err.to_string(), "normalize failed: no rows");
    }

    #[test]
    fn test_transform_from_raw_files() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = pipeline(dir.path(), "http://unused");
        let raw = raw_tables();
        write_price_ticks(&pipeline.config().coingecko_raw_path(), &raw.ticks).unwrap();
        write_ohlc_rows(&pipeline.config().kraken_raw_path(), &raw.ohlc).unwrap();

        let combined = pipeline.transform().unwrap();
        // 30 ticks every 40s span 09:00..09:19:20, four 5m buckets
        assert_eq!(combined.len(), 8);
        assert!(combined.iter().all(|c| c.asset == "BITCOIN" && c.interval_min == 5));

        let persisted = read_candles(&pipeline.config().transformed_path()).unwrap();
        assert_eq!(persisted, combined.into_vec());
    }

    #[test]
    fn test_transform_without_raw_files_fails_in_normalize() {
        let dir = tempfile::tempdir().unwrap();
        let err = pipeline(dir.path(), "http://unused").transform().unwrap_err();
        assert_eq!(err.stage, Stage::Normalize);
    }

    #[test]
    fn test_transform_empty_table_fails_in_normalize() {
        let dir = tempfile::tempdir().unwrap();
        let mut raw = raw_tables();
        raw.ohlc.clear();
        let err = pipeline(dir.path(), "http://unused").transform_tables(raw).unwrap_err();
        assert_eq!(err.stage, Stage::Normalize);
        assert!(!dir.path().join("transformed_crypto_data.csv").exists());
    }

    #[tokio::test]
    async fn test_extract_reports_every_failed_fetch() {
        let dir = tempfile::tempdir().unwrap();
        let err = pipeline(dir.path(), &closed_port_url()).extract().await.unwrap_err();

        assert_eq!(err.stage, Stage::Extract);
        assert!(err.to_string().contains("2 of 2 fetches failed"));
        assert!(!dir.path().join("coingecko_data.csv").exists());
        assert!(!dir.path().join("kraken_ohlc.csv").exists());
    }
}
