//! Merge normalized tables from several providers

use crate::data::{Candle, CandleSeries};
use crate::error::DataError;
use tracing::info;

/// Concatenate normalized tables and sort by `(ts_start, source)`.
///
/// Rows are never deduplicated across providers: the same bucket from two
/// sources yields two rows.
pub fn combine(tables: Vec<Vec<Candle>>) -> Result<CandleSeries, DataError> {
    if tables.is_empty() {
        return Err(DataError::NoTables);
    }

    let table_count = tables.len();
    let mut series = CandleSeries::from_vec(tables.into_iter().flatten().collect());
    series.sort_by_time();

    info!("Combined {} tables into {} candles", table_count, series.len());
    Ok(series)
}
