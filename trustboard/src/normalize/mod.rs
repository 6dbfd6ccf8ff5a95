//! Candle normalization
//!
//! Converts each provider's raw table into a gap-free sequence of
//! fixed-interval [`Candle`]s with quality flags:
//! - Kraken candles are mapped onto the grid by exact timestamp
//! - CoinGecko ticks are bucketed and aggregated into OHLC
//!
//! Normalization is a pure function of its inputs.

pub mod coingecko;
pub mod flags;
pub mod grid;
pub mod kraken;

pub use flags::{is_bad_candle, is_spike, spike_flags};
pub use grid::{bucket_starts, floor_to_interval, Grid};

use crate::data::{Candle, RawTable, Source};
use crate::error::DataError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Per-call normalization parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizeParams {
    /// Asset symbol, stored upper-case
    pub asset: String,
    /// Bucket width in minutes, > 0
    pub interval_min: u32,
    /// Spike threshold as a fraction, > 0 (e.g., 0.10 = 10%)
    pub spike_pct: f64,
}

impl NormalizeParams {
    pub fn new(asset: &str, interval_min: u32, spike_pct: f64) -> Self {
        Self {
            asset: asset.to_uppercase(),
            interval_min,
            spike_pct,
        }
    }

    pub fn validate(&self) -> Result<(), DataError> {
        if self.interval_min == 0 {
            return Err(DataError::InvalidParams("interval_min must be positive".to_string()));
        }
        if !self.spike_pct.is_finite() || self.spike_pct <= 0.0 {
            return Err(DataError::InvalidParams(format!(
                "spike_pct must be a positive fraction, got {}",
                self.spike_pct
            )));
        }
        if self.asset.trim().is_empty() {
            return Err(DataError::InvalidParams("asset must not be empty".to_string()));
        }
        Ok(())
    }
}

/// Normalize one provider's raw table
pub fn normalize(raw: &RawTable, params: &NormalizeParams) -> Result<Vec<Candle>, DataError> {
    match raw {
        RawTable::CoinGecko(ticks) => coingecko::normalize(ticks, params),
        RawTable::Kraken(rows) => kraken::normalize(rows, params),
    }
}

/// OHLCV values of one grid bucket, before flagging
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bar {
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: Option<f64>,
    pub vwap: Option<f64>,
    pub volume: Option<f64>,
    pub count: Option<i64>,
}

/// Turn a time-ordered grid of bars into flagged candles
pub(crate) fn finish<I>(source: Source, params: &NormalizeParams, bars: I) -> Vec<Candle>
where
    I: IntoIterator<Item = (DateTime<Utc>, Bar)>,
{
    let mut candles = Vec::new();
    let mut prev_close = None;

    for (ts_start, bar) in bars {
        let bad_candle = is_bad_candle(bar.open, bar.high, bar.low, bar.close);
        let spike_flag = is_spike(prev_close, bar.close, params.spike_pct);
        prev_close = bar.close;

        candles.push(Candle {
            source,
            asset: params.asset.clone(),
            interval_min: params.interval_min,
            ts_start,
            open: bar.open,
            high: bar.high,
            low: bar.low,
            close: bar.close,
            vwap: bar.vwap,
            volume: bar.volume,
            count: bar.count,
            is_missing: bar.open.is_none(),
            bad_candle,
            spike_flag,
            anomaly_flag: bad_candle || spike_flag,
        });
    }

    candles
}

/// Keep rows with a parsed timestamp, sorted by time, first row per timestamp.
///
/// Fails when there are no rows, or when no timestamp could be parsed.
pub(crate) fn parsed_in_order<'a, T>(
    source: Source,
    rows: &'a [T],
    ts_of: impl Fn(&T) -> Option<DateTime<Utc>>,
) -> Result<Vec<(DateTime<Utc>, &'a T)>, DataError> {
    if rows.is_empty() {
        return Err(DataError::EmptyInput { provider: source });
    }

    let mut parsed: Vec<(DateTime<Utc>, &T)> = rows
        .iter()
        .filter_map(|row| ts_of(row).map(|ts| (ts, row)))
        .collect();
    if parsed.is_empty() {
        return Err(DataError::UnparseableTimestamps {
            provider: source,
            rows: rows.len(),
        });
    }
    let unparsed = rows.len() - parsed.len();
    if unparsed > 0 {
        tracing::warn!("{}: dropped {} rows with unparseable timestamps", source, unparsed);
    }

    // Stable sort, so the first row wins among equal timestamps
    parsed.sort_by_key(|(ts, _)| *ts);
    let before = parsed.len();
    parsed.dedup_by_key(|(ts, _)| *ts);
    if parsed.len() < before {
        tracing::debug!("{}: dropped {} duplicate timestamps", source, before - parsed.len());
    }

    Ok(parsed)
}
