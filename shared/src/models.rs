//! Read model for persisted candles

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, MySqlPool};
use tracing::debug;
use trustboard::config::CANDLE_TABLE;
use trustboard::data::{Candle, Source};

/// One row of `fact_price_candle`
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CandleRow {
    pub source: String,
    pub asset: String,
    pub interval_min: i32,
    pub ts_start: DateTime<Utc>,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: Option<f64>,
    pub vwap: Option<f64>,
    pub volume: Option<f64>,
    pub count: Option<i64>,
    pub is_missing: bool,
    pub bad_candle: bool,
    pub spike_flag: bool,
    pub anomaly_flag: bool,
}

impl TryFrom<CandleRow> for Candle {
    type Error = anyhow::Error;

    fn try_from(row: CandleRow) -> Result<Self> {
        let source: Source = row.source.parse().map_err(|e: String| anyhow!(e))?;
        let interval_min = u32::try_from(row.interval_min)
            .map_err(|_| anyhow!("negative interval_min {} in {}", row.interval_min, CANDLE_TABLE))?;
        Ok(Candle {
            source,
            asset: row.asset,
            interval_min,
            ts_start: row.ts_start,
            open: row.open,
            high: row.high,
            low: row.low,
            close: row.close,
            vwap: row.vwap,
            volume: row.volume,
            count: row.count,
            is_missing: row.is_missing,
            bad_candle: row.bad_candle,
            spike_flag: row.spike_flag,
            anomaly_flag: row.anomaly_flag,
        })
    }
}

/// All candles starting at or after `since`, ordered by `(ts_start, source)`
pub async fn fetch_candles_since(pool: &MySqlPool, since: DateTime<Utc>) -> Result<Vec<Candle>> {
    let query = format!(
        r#"
        SELECT source, asset, interval_min, ts_start, open, high, low, close,
               vwap, volume, count, is_missing, bad_candle, spike_flag, anomaly_flag
        FROM {}
        WHERE ts_start >= ?
        ORDER BY ts_start, source
        "#,
        CANDLE_TABLE
    );

    let rows = sqlx::query_as::<_, CandleRow>(&query)
        .bind(since)
        .fetch_all(pool)
        .await?;
    debug!("Fetched {} rows from {} since {}", rows.len(), CANDLE_TABLE, since);

    rows.into_iter().map(Candle::try_from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(source: &str, interval_min: i32) -> CandleRow {
        CandleRow {
            source: source.to_string(),
            asset: "BITCOIN".to_string(),
            interval_min,
            ts_start: DateTime::parse_from_rfc3339("2024-03-01T09:00:00Z").unwrap().with_timezone(&Utc),
            open: None,
            high: None,
            low: None,
            close: None,
            vwap: None,
            volume: None,
            count: None,
            is_missing: true,
            bad_candle: false,
            spike_flag: false,
            anomaly_flag: false,
        }
    }

    #[test]
    fn test_row_into_candle() {
        let candle = Candle::try_from(row("coingecko", 5)).unwrap();
        assert_eq!(candle.source, Source::CoinGecko);
        assert_eq!(candle.interval_min, 5);
        assert!(candle.is_missing);
    }

    #[test]
    fn test_unknown_source_is_rejected() {
        assert!(Candle::try_from(row("binance", 5)).is_err());
        assert!(Candle::try_from(row("kraken", -5)).is_err());
    }
}
