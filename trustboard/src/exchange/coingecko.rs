//! CoinGecko market-chart payloads

use crate::data::{from_unix, PriceTick};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// `GET /coins/{id}/market_chart` body: `[[ts_ms, value], ...]` series
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MarketChartResponse {
    #[serde(default)]
    pub prices: Vec<(f64, Option<f64>)>,
    #[serde(default)]
    pub total_volumes: Vec<(f64, Option<f64>)>,
}

/// Left-join volumes onto prices by millisecond timestamp.
///
/// Output is sorted by time with one tick per timestamp (the first seen).
pub fn parse_market_chart(body: MarketChartResponse) -> Vec<PriceTick> {
    let mut volumes: HashMap<i64, Option<f64>> = HashMap::new();
    for (ts_ms, volume) in body.total_volumes {
        volumes.entry(ts_ms as i64).or_insert(volume);
    }

    let mut ticks: Vec<PriceTick> = body
        .prices
        .into_iter()
        .map(|(ts_ms, price)| {
            let ts_ms = ts_ms as i64;
            PriceTick {
                ts: from_unix(ts_ms),
                price: price.filter(|p| p.is_finite()),
                volume: volumes.get(&ts_ms).copied().flatten(),
            }
        })
        .collect();

    ticks.sort_by_key(|t| t.ts);
    ticks.dedup_by_key(|t| t.ts);
    ticks
}
