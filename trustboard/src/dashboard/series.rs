//! Time series behind the dashboard charts

use crate::data::{Candle, Source};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

/// `(bucket start, value)` points in time order
pub type Series = Vec<(DateTime<Utc>, f64)>;

/// Per-source series for the price, volume and anomaly charts.
///
/// Buckets with no value are left out, so a missing candle shows up as a gap
/// between points rather than a zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChartSeries {
    pub close: BTreeMap<Source, Series>,
    pub volume: BTreeMap<Source, Series>,
    /// Close of every flagged candle
    pub anomalies: BTreeMap<Source, Series>,
}

impl ChartSeries {
    /// `candles` must be sorted by `(ts_start, source)`
    pub fn compute(candles: &[Candle]) -> Self {
        let mut series = Self::default();
        for candle in candles {
            if let Some(close) = candle.close {
                push(&mut series.close, candle.source, candle.ts_start, close);
                if candle.anomaly_flag {
                    push(&mut series.anomalies, candle.source, candle.ts_start, close);
                }
            }
            if let Some(volume) = candle.volume {
                push(&mut series.volume, candle.source, candle.ts_start, volume);
            }
        }
        series
    }

    pub fn is_empty(&self) -> bool {
        self.close.is_empty() && self.volume.is_empty()
    }
}

fn push(map: &mut BTreeMap<Source, Series>, source: Source, ts: DateTime<Utc>, value: f64) {
    map.entry(source).or_default().push((ts, value));
}
