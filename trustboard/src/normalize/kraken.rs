//! Kraken OHLC normalization
//!
//! Kraken already returns candles at the requested interval, so each row is
//! placed on the grid by exact timestamp match and empty buckets stay null.

use super::{finish, parsed_in_order, Bar, Grid, NormalizeParams};
use crate::data::{Candle, OhlcRow, Source};
use crate::error::DataError;
use tracing::{debug, warn};

pub fn normalize(rows: &[OhlcRow], params: &NormalizeParams) -> Result<Vec<Candle>, DataError> {
    params.validate()?;
    let parsed = parsed_in_order(Source::Kraken, rows, |row| row.time)?;

    let (start, end) = match (parsed.first(), parsed.last()) {
        (Some(first), Some(last)) => (first.0, last.0),
        _ => return Err(DataError::EmptyInput { provider: Source::Kraken }),
    };

    let mut grid: Grid<&OhlcRow> = Grid::spanning(start, end, params.interval_min)?;
    let mut off_grid = 0usize;
    for (ts, row) in parsed {
        if !grid.place(ts, row) {
            off_grid += 1;
        }
    }
    if off_grid > 0 {
        warn!(
            "kraken: {} rows not aligned to the {}m grid were dropped",
            off_grid, params.interval_min
        );
    }
    debug!(
        "kraken: {} buckets, {} filled, {} missing",
        grid.len(),
        grid.filled(),
        grid.len() - grid.filled()
    );

    let bars = grid.into_iter().map(|(ts, row)| {
        let bar = row
            .map(|r| Bar {
                open: r.open,
                high: r.high,
                low: r.low,
                close: r.close,
                vwap: r.vwap,
                volume: r.volume,
                count: r.count,
            })
            .unwrap_or_default();
        (ts, bar)
    });

    Ok(finish(Source::Kraken, params, bars))
}
