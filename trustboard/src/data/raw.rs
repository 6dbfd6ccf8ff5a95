//! Raw provider records, before normalization

use crate::data::Source;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One CoinGecko market-chart observation.
///
/// CoinGecko returns irregular price snapshots, not bucketed candles. A `None`
/// timestamp means the source value could not be parsed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceTick {
    pub ts: Option<DateTime<Utc>>,
    pub price: Option<f64>,
    /// Snapshot of the rolling 24h volume at `ts`
    pub volume: Option<f64>,
}

impl PriceTick {
    pub fn new(ts: DateTime<Utc>, price: f64, volume: Option<f64>) -> Self {
        Self {
            ts: Some(ts),
            price: Some(price),
            volume,
        }
    }
}

/// One Kraken OHLC row: `[time, open, high, low, close, vwap, volume, count]`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OhlcRow {
    pub time: Option<DateTime<Utc>>,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: Option<f64>,
    pub vwap: Option<f64>,
    pub volume: Option<f64>,
    pub count: Option<i64>,
}

impl OhlcRow {
    /// Row with all price fields present; vwap/volume/count left empty.
    pub fn new(time: DateTime<Utc>, open: f64, high: f64, low: f64, close: f64) -> Self {
        Self {
            time: Some(time),
            open: Some(open),
            high: Some(high),
            low: Some(low),
            close: Some(close),
            ..Default::default()
        }
    }

    pub fn with_volume(mut self, vwap: f64, volume: f64, count: i64) -> Self {
        self.vwap = Some(vwap);
        self.volume = Some(volume);
        self.count = Some(count);
        self
    }
}

/// A provider's raw table, tagged by the shape it arrives in.
#[derive(Debug, Clone, PartialEq)]
pub enum RawTable {
    /// Irregular price ticks to be bucketed
    CoinGecko(Vec<PriceTick>),
    /// Exchange candles already bucketed at the requested interval
    Kraken(Vec<OhlcRow>),
}

impl RawTable {
    pub fn source(&self) -> Source {
        match self {
            RawTable::CoinGecko(_) => Source::CoinGecko,
            RawTable::Kraken(_) => Source::Kraken,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            RawTable::CoinGecko(ticks) => ticks.len(),
            RawTable::Kraken(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
