//! Data-quality flags
//!
//! A comparison with a missing operand is never true, so missing rows come
//! out unflagged rather than null.

fn lt(a: Option<f64>, b: Option<f64>) -> bool {
    matches!((a, b), (Some(a), Some(b)) if a < b)
}

/// OHLC values violate `low <= open, close <= high`
pub fn is_bad_candle(open: Option<f64>, high: Option<f64>, low: Option<f64>, close: Option<f64>) -> bool {
    lt(high, open) || lt(high, close) || lt(open, low) || lt(close, low) || lt(high, low)
}

/// `|close / prev_close - 1| > spike_pct`.
///
/// False when either close is missing or the previous close is zero; the
/// comparison never reaches across a gap to an older close.
pub fn is_spike(prev_close: Option<f64>, close: Option<f64>, spike_pct: f64) -> bool {
    match (prev_close, close) {
        (Some(prev), Some(curr)) if prev != 0.0 => (curr / prev - 1.0).abs() > spike_pct,
        _ => false,
    }
}

/// Spike flags for a close series; the first element is always false
pub fn spike_flags(closes: &[Option<f64>], spike_pct: f64) -> Vec<bool> {
    let mut flags = Vec::with_capacity(closes.len());
    let mut prev = None;
    for &close in closes {
        flags.push(is_spike(prev, close, spike_pct));
        prev = close;
    }
    flags
}
