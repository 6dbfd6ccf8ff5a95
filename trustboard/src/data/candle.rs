//! Normalized candle data structures

use crate::dashboard::rate;
use crate::data::{parse_count, parse_number, parse_timestamp};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Price data provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    CoinGecko,
    Kraken,
}

impl Source {
    pub const ALL: [Source; 2] = [Source::CoinGecko, Source::Kraken];

    pub fn as_str(&self) -> &'static str {
        match self {
            Source::CoinGecko => "coingecko",
            Source::Kraken => "kraken",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Source {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "coingecko" => Ok(Source::CoinGecko),
            "kraken" => Ok(Source::Kraken),
            other => Err(format!("unknown source: {}", other)),
        }
    }
}

// Sources order by name so that ties on `ts_start` break alphabetically.
impl Ord for Source {
    fn cmp(&self, other: &Self) -> Ordering {
        self.as_str().cmp(other.as_str())
    }
}

impl PartialOrd for Source {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// One normalized fixed-interval candle.
///
/// Field order is the persisted column order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub source: Source,
    /// Upper-case asset symbol, e.g. "BITCOIN"
    pub asset: String,
    /// Bucket width in minutes
    pub interval_min: u32,
    /// Start of the bucket (UTC)
    #[serde(deserialize_with = "de_timestamp")]
    pub ts_start: DateTime<Utc>,
    #[serde(deserialize_with = "de_opt_number")]
    pub open: Option<f64>,
    #[serde(deserialize_with = "de_opt_number")]
    pub high: Option<f64>,
    #[serde(deserialize_with = "de_opt_number")]
    pub low: Option<f64>,
    #[serde(deserialize_with = "de_opt_number")]
    pub close: Option<f64>,
    #[serde(deserialize_with = "de_opt_number")]
    pub vwap: Option<f64>,
    #[serde(deserialize_with = "de_opt_number")]
    pub volume: Option<f64>,
    #[serde(deserialize_with = "de_opt_count")]
    pub count: Option<i64>,
    /// No observation fell into this bucket
    #[serde(deserialize_with = "de_flag")]
    pub is_missing: bool,
    /// OHLC values are mutually inconsistent
    #[serde(deserialize_with = "de_flag")]
    pub bad_candle: bool,
    /// Close moved more than the spike threshold from the previous close
    #[serde(deserialize_with = "de_flag")]
    pub spike_flag: bool,
    /// `bad_candle || spike_flag`
    #[serde(deserialize_with = "de_flag")]
    pub anomaly_flag: bool,
}

/// Persisted column names, in order.
pub const CANDLE_COLUMNS: [&str; 15] = [
    "source",
    "asset",
    "interval_min",
    "ts_start",
    "open",
    "high",
    "low",
    "close",
    "vwap",
    "volume",
    "count",
    "is_missing",
    "bad_candle",
    "spike_flag",
    "anomaly_flag",
];

impl Candle {
    /// Sort key used for every combined table
    pub fn order_key(&self) -> (DateTime<Utc>, Source) {
        (self.ts_start, self.source)
    }
}

/// Collection of candles
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CandleSeries {
    candles: Vec<Candle>,
}

impl CandleSeries {
    /// Create new empty series
    pub fn new() -> Self {
        Self::default()
    }

    /// Create from vector of candles
    pub fn from_vec(candles: Vec<Candle>) -> Self {
        Self { candles }
    }

    /// Get number of candles
    pub fn len(&self) -> usize {
        self.candles.len()
    }

    /// Check if series is empty
    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    /// Get all candles
    pub fn candles(&self) -> &[Candle] {
        &self.candles
    }

    pub fn into_vec(self) -> Vec<Candle> {
        self.candles
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Candle> {
        self.candles.iter()
    }

    /// Get close prices as vector
    pub fn closes(&self) -> Vec<Option<f64>> {
        self.candles.iter().map(|c| c.close).collect()
    }

    /// Share of buckets with no observation
    pub fn missing_rate(&self) -> f64 {
        rate(&self.candles, |c| c.is_missing)
    }

    /// Share of candles flagged as bad or spiking
    pub fn anomaly_rate(&self) -> f64 {
        rate(&self.candles, |c| c.anomaly_flag)
    }

    /// Sort by `(ts_start, source)`, keeping input order for equal keys
    pub fn sort_by_time(&mut self) {
        self.candles.sort_by_key(Candle::order_key);
    }

    /// Split back into one table per source, each keeping its relative order
    pub fn split_by_source(&self) -> BTreeMap<Source, Vec<Candle>> {
        let mut tables: BTreeMap<Source, Vec<Candle>> = BTreeMap::new();
        for candle in &self.candles {
            tables.entry(candle.source).or_default().push(candle.clone());
        }
        tables
    }
}

impl From<Vec<Candle>> for CandleSeries {
    fn from(candles: Vec<Candle>) -> Self {
        Self::from_vec(candles)
    }
}

impl IntoIterator for CandleSeries {
    type Item = Candle;
    type IntoIter = std::vec::IntoIter<Candle>;

    fn into_iter(self) -> Self::IntoIter {
        self.candles.into_iter()
    }
}

/// Cell value as it may appear in a CSV file or JSON document.
#[derive(Deserialize)]
#[serde(untagged)]
enum Cell {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl Cell {
    fn number(self) -> Option<f64> {
        match self {
            Cell::Int(i) => Some(i as f64),
            Cell::Float(f) if f.is_finite() => Some(f),
            Cell::Float(_) | Cell::Bool(_) => None,
            Cell::Text(t) => parse_number(&t),
        }
    }
}

fn de_timestamp<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
    let text = String::deserialize(d)?;
    parse_timestamp(&text)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {}", text)))
}

fn de_opt_number<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
    Ok(Option::<Cell>::deserialize(d)?.and_then(Cell::number))
}

fn de_opt_count<'de, D: Deserializer<'de>>(d: D) -> Result<Option<i64>, D::Error> {
    Ok(match Option::<Cell>::deserialize(d)? {
        Some(Cell::Int(i)) => Some(i),
        Some(Cell::Text(t)) => parse_count(&t),
        Some(other) => other.number().filter(|v| v.fract() == 0.0).map(|v| v as i64),
        None => None,
    })
}

// Missing or unreadable flags deserialize as false, never null.
fn de_flag<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
    Ok(match Option::<Cell>::deserialize(d)? {
        Some(Cell::Bool(b)) => b,
        Some(Cell::Int(i)) => i != 0,
        Some(Cell::Float(f)) => f != 0.0,
        Some(Cell::Text(t)) => matches!(t.trim().to_lowercase().as_str(), "true" | "t" | "yes"),
        None => false,
    })
}
