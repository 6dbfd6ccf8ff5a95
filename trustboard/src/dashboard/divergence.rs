//! Price divergence between the two providers

use crate::dashboard::Series;
use crate::data::{Candle, Source};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

/// Kraken vs CoinGecko close, over buckets where both have a close
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Divergence {
    /// Overlapping buckets
    pub points: usize,
    /// `(kraken - coingecko) / coingecko` at the latest overlapping bucket
    pub latest_pct: f64,
    pub latest_ts: DateTime<Utc>,
    /// Mean of `|kraken - coingecko| / coingecko`
    pub mean_abs_pct: f64,
    /// Largest `|kraken - coingecko| / coingecko`
    pub max_abs_pct: f64,
    /// `(kraken - coingecko) / coingecko` at every overlapping bucket
    pub series: Series,
}

impl Divergence {
    /// `None` when the sources never overlap
    pub fn compute(candles: &[Candle]) -> Option<Self> {
        let mut pairs: BTreeMap<DateTime<Utc>, (Option<f64>, Option<f64>)> = BTreeMap::new();
        for candle in candles {
            let Some(close) = candle.close else { continue };
            let entry = pairs.entry(candle.ts_start).or_default();
            match candle.source {
                Source::CoinGecko => entry.0 = Some(close),
                Source::Kraken => entry.1 = Some(close),
            }
        }

        let diffs: Series = pairs
            .into_iter()
            .filter_map(|(ts, pair)| match pair {
                (Some(cg), Some(kr)) if cg != 0.0 => Some((ts, (kr - cg) / cg)),
                _ => None,
            })
            .collect();

        let (latest_ts, latest_pct) = *diffs.last()?;
        let abs: Vec<f64> = diffs.iter().map(|(_, d)| d.abs()).collect();
        Some(Self {
            points: diffs.len(),
            latest_pct,
            latest_ts,
            mean_abs_pct: abs.iter().sum::<f64>() / abs.len() as f64,
            max_abs_pct: abs.iter().cloned().fold(0.0, f64::max),
            series: diffs,
        })
    }
}
