//! CoinGecko tick normalization
//!
//! CoinGecko market-chart data is a stream of price snapshots. Ticks are
//! grouped into epoch-aligned buckets and each bucket becomes one candle:
//! open is the first price, close the last, high/low the extremes, and volume
//! the mean of the volume snapshots seen in the bucket. CoinGecko reports no
//! vwap or trade count.

use super::{finish, floor_to_interval, parsed_in_order, Bar, Grid, NormalizeParams};
use crate::data::{Candle, PriceTick, Source};
use crate::error::DataError;
use tracing::debug;

/// Running aggregate of the ticks in one bucket
#[derive(Debug, Clone, Default)]
struct TickBucket {
    open: Option<f64>,
    high: Option<f64>,
    low: Option<f64>,
    close: Option<f64>,
    volume_sum: f64,
    volume_n: usize,
}

impl TickBucket {
    fn add(&mut self, tick: &PriceTick) {
        if let Some(price) = tick.price {
            self.open.get_or_insert(price);
            self.high = Some(self.high.map_or(price, |h| h.max(price)));
            self.low = Some(self.low.map_or(price, |l| l.min(price)));
            self.close = Some(price);
        }
        if let Some(volume) = tick.volume {
            self.volume_sum += volume;
            self.volume_n += 1;
        }
    }

    fn into_bar(self) -> Bar {
        let volume = if self.volume_n > 0 {
            Some(self.volume_sum / self.volume_n as f64)
        } else {
            None
        };
        Bar {
            open: self.open,
            high: self.high,
            low: self.low,
            close: self.close,
            vwap: None,
            volume,
            count: None,
        }
    }
}

pub fn normalize(ticks: &[PriceTick], params: &NormalizeParams) -> Result<Vec<Candle>, DataError> {
    params.validate()?;
    let parsed = parsed_in_order(Source::CoinGecko, ticks, |tick| tick.ts)?;

    let interval = params.interval_min;
    let bucketed: Vec<_> = parsed
        .into_iter()
        .filter_map(|(ts, tick)| floor_to_interval(ts, interval).map(|bucket| (bucket, tick)))
        .collect();

    let (start, end) = match (bucketed.first(), bucketed.last()) {
        (Some(first), Some(last)) => (first.0, last.0),
        _ => {
            return Err(DataError::UnparseableTimestamps {
                provider: Source::CoinGecko,
                rows: ticks.len(),
            });
        }
    };

    let mut grid: Grid<TickBucket> = Grid::spanning(start, end, interval)?;
    for (bucket, tick) in bucketed {
        if let Some(slot) = grid.slot_mut(&bucket) {
            slot.get_or_insert_with(TickBucket::default).add(tick);
        }
    }
    debug!(
        "coingecko: {} ticks into {} buckets, {} empty",
        ticks.len(),
        grid.len(),
        grid.len() - grid.filled()
    );

    let bars = grid
        .into_iter()
        .map(|(ts, bucket)| (ts, bucket.map(TickBucket::into_bar).unwrap_or_default()));

    Ok(finish(Source::CoinGecko, params, bars))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, Utc};

    fn base() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-03-01T09:00:00Z").unwrap().with_timezone(&Utc)
    }

    fn tick(secs: i64, price: f64, volume: f64) -> PriceTick {
        PriceTick::new(base() + Duration::seconds(secs), price, Some(volume))
    }

    fn params() -> NormalizeParams {
        NormalizeParams::new("bitcoin", 5, 0.10)
    }

    #[test]
    fn test_ohlc_from_ticks_in_time_order() {
        // deliberately unsorted input
        let ticks = vec![
            tick(240, 101.0, 30.0),
            tick(10, 100.0, 10.0),
            tick(60, 104.0, 20.0),
            tick(120, 98.0, 20.0),
        ];
        let candles = normalize(&ticks, &params()).unwrap();

        assert_eq!(candles.len(), 1);
        let c = &candles[0];
        assert_eq!(c.ts_start, base());
        assert_eq!(c.open, Some(100.0));
        assert_eq!(c.high, Some(104.0));
        assert_eq!(c.low, Some(98.0));
        assert_eq!(c.close, Some(101.0));
        // mean, not sum
        assert_eq!(c.volume, Some(20.0));
        assert_eq!(c.vwap, None);
        assert_eq!(c.count, None);
        assert_eq!(c.source, Source::CoinGecko);
    }

    #[test]
    fn test_epoch_aligned_buckets_with_gap() {
        let ticks = vec![tick(130, 100.0, 1.0), tick(60 * 11, 101.0, 3.0)];
        let candles = normalize(&ticks, &params()).unwrap();

        let starts: Vec<_> = candles.iter().map(|c| c.ts_start).collect();
        assert_eq!(
            starts,
            vec![base(), base() + Duration::minutes(5), base() + Duration::minutes(10)]
        );
        assert!(candles[1].is_missing);
        assert_eq!(candles[1].volume, None);
        assert!(!candles[1].bad_candle && !candles[1].spike_flag);
    }

    #[test]
    fn test_null_price_tick_leaves_bucket_missing() {
        let ticks = vec![
            tick(0, 100.0, 1.0),
            PriceTick {
                ts: Some(base() + Duration::minutes(5)),
                price: None,
                volume: Some(7.0),
            },
        ];
        let candles = normalize(&ticks, &params()).unwrap();

        assert_eq!(candles.len(), 2);
        assert!(candles[1].is_missing);
        assert_eq!(candles[1].volume, Some(7.0));
    }

    #[test]
    fn test_missing_volumes_are_ignored_in_mean() {
        let ticks = vec![
            tick(0, 100.0, 4.0),
            PriceTick::new(base() + Duration::seconds(30), 100.0, None),
        ];
        let candles = normalize(&ticks, &params()).unwrap();
        assert_eq!(candles[0].volume, Some(4.0));
    }

    #[test]
    fn test_spike_between_buckets() {
        let ticks = vec![tick(0, 100.0, 1.0), tick(300, 100.0, 1.0), tick(600, 150.0, 1.0)];
        let candles = normalize(&ticks, &params()).unwrap();
        let spikes: Vec<_> = candles.iter().map(|c| c.spike_flag).collect();
        assert_eq!(spikes, vec![false, false, true]);
    }

    #[test]
    fn test_all_timestamps_unparseable() {
        let ticks = vec![PriceTick {
            ts: None,
            price: Some(1.0),
            volume: None,
        }];
        let err = normalize(&ticks, &params()).unwrap_err();
        assert!(matches!(
            err,
            DataError::UnparseableTimestamps { provider: Source::CoinGecko, rows: 1 }
        ));
    }

    #[test]
    fn test_tick_at_latest_instant() {
        let last = crate::data::parse_timestamp("8210266876799000").unwrap();
        let candles = normalize(&[PriceTick::new(last, 1.0, Some(2.0))], &params()).unwrap();
        assert_eq!(candles.len(), 1);
        assert_eq!(candles[0].close, Some(1.0));
        assert!(candles[0].ts_start <= last);
    }

    #[test]
    fn test_span_too_wide_is_rejected() {
        let last = crate::data::parse_timestamp("8210266876799000").unwrap();
        let ticks = vec![tick(0, 1.0, 1.0), PriceTick::new(last, 2.0, Some(1.0))];
        let err = normalize(&ticks, &params()).unwrap_err();
        assert!(matches!(err, DataError::SpanTooLarge { .. }));
    }
}
