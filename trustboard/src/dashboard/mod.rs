//! Dashboard computations
//!
//! Pure KPI and health calculations over persisted candles. The `api` crate
//! renders these; nothing here does I/O.

pub mod divergence;
pub mod series;
pub mod summary;

pub use divergence::*;
pub use series::*;
pub use summary::*;

use crate::data::{Candle, Source};
use chrono::{DateTime, Duration, Utc};

/// Rows with `ts_start >= now - days` from the selected sources, sorted by
/// `(ts_start, source)`
pub fn filter_window(candles: &[Candle], now: DateTime<Utc>, days: u32, sources: &[Source]) -> Vec<Candle> {
    let cutoff = now - Duration::days(i64::from(days));
    let mut window: Vec<Candle> = candles
        .iter()
        .filter(|c| c.ts_start >= cutoff && sources.contains(&c.source))
        .cloned()
        .collect();
    window.sort_by_key(Candle::order_key);
    window
}

/// Human "time ago" label: `Nm ago`, `Nh ago` or `Nd ago`
pub fn time_ago(delta: Duration) -> String {
    let minutes = delta.num_minutes().max(0);
    if minutes < 60 {
        return format!("{}m ago", minutes);
    }
    let hours = minutes / 60;
    if hours < 48 {
        return format!("{}h ago", hours);
    }
    format!("{}d ago", hours / 24)
}

/// Fraction of rows for which `flag` holds; 0 for an empty slice
pub fn rate(candles: &[Candle], flag: impl Fn(&Candle) -> bool) -> f64 {
    if candles.is_empty() {
        return 0.0;
    }
    candles.iter().filter(|c| flag(c)).count() as f64 / candles.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_ago() {
        assert_eq!(time_ago(Duration::seconds(59)), "0m ago");
        assert_eq!(time_ago(Duration::minutes(59)), "59m ago");
        assert_eq!(time_ago(Duration::minutes(60)), "1h ago");
        assert_eq!(time_ago(Duration::hours(47)), "47h ago");
        assert_eq!(time_ago(Duration::hours(48)), "2d ago");
        assert_eq!(time_ago(Duration::minutes(-5)), "0m ago");
    }
}
