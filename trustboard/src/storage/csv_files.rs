//! CSV persistence for raw and normalized tables

use crate::data::{
    parse_count, parse_number, parse_timestamp, Candle, OhlcRow, PriceTick, CANDLE_COLUMNS,
};
use crate::error::{DataError, PersistError};
use chrono::{DateTime, SecondsFormat, Utc};
use csv::{Reader, StringRecord, Writer, WriterBuilder};
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

const TICK_COLUMNS: [&str; 3] = ["ts", "price", "volume"];
const OHLC_COLUMNS: [&str; 8] = ["time", "open", "high", "low", "close", "vwap", "volume", "count"];

/// Save CoinGecko ticks as `ts,price,volume`
pub fn write_price_ticks(path: &Path, ticks: &[PriceTick]) -> Result<(), PersistError> {
    write_replacing(path, |writer| {
        writer.write_record(TICK_COLUMNS)?;
        for tick in ticks {
            writer.write_record([ts_cell(tick.ts), num_cell(tick.price), num_cell(tick.volume)])?;
        }
        Ok(())
    })?;
    info!("Wrote {} CoinGecko ticks to {}", ticks.len(), path.display());
    Ok(())
}

/// Load CoinGecko ticks; unreadable values become nulls
pub fn read_price_ticks(path: &Path) -> Result<Vec<PriceTick>, DataError> {
    let (headers, records) = read_records(path)?;
    let ts = column(path, &headers, "ts")?;
    let price = column(path, &headers, "price")?;
    let volume = column(path, &headers, "volume")?;

    Ok(records
        .iter()
        .map(|record| PriceTick {
            ts: parse_timestamp(field(record, ts)),
            price: parse_number(field(record, price)),
            volume: parse_number(field(record, volume)),
        })
        .collect())
}

/// Save Kraken rows as `time,open,high,low,close,vwap,volume,count`
pub fn write_ohlc_rows(path: &Path, rows: &[OhlcRow]) -> Result<(), PersistError> {
    write_replacing(path, |writer| {
        writer.write_record(OHLC_COLUMNS)?;
        for row in rows {
            writer.write_record([
                ts_cell(row.time),
                num_cell(row.open),
                num_cell(row.high),
                num_cell(row.low),
                num_cell(row.close),
                num_cell(row.vwap),
                num_cell(row.volume),
                row.count.map(|c| c.to_string()).unwrap_or_default(),
            ])?;
        }
        Ok(())
    })?;
    info!("Wrote {} Kraken rows to {}", rows.len(), path.display());
    Ok(())
}

/// Load Kraken rows; unreadable values become nulls
pub fn read_ohlc_rows(path: &Path) -> Result<Vec<OhlcRow>, DataError> {
    let (headers, records) = read_records(path)?;
    let idx = OHLC_COLUMNS
        .iter()
        .map(|name| column(path, &headers, name))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(records
        .iter()
        .map(|record| OhlcRow {
            time: parse_timestamp(field(record, idx[0])),
            open: parse_number(field(record, idx[1])),
            high: parse_number(field(record, idx[2])),
            low: parse_number(field(record, idx[3])),
            close: parse_number(field(record, idx[4])),
            vwap: parse_number(field(record, idx[5])),
            volume: parse_number(field(record, idx[6])),
            count: parse_count(field(record, idx[7])),
        })
        .collect())
}

/// Serialize candles with a header row, in persisted column order
pub fn write_candles_to<W: io::Write>(out: W, candles: &[Candle]) -> Result<(), csv::Error> {
    let mut writer = WriterBuilder::new().has_headers(false).from_writer(out);
    fill_candles(&mut writer, candles)?;
    writer.flush()?;
    Ok(())
}

/// Replace the transformed candle file in full
pub fn write_candles(path: &Path, candles: &[Candle]) -> Result<(), PersistError> {
    write_replacing(path, |writer| fill_candles(writer, candles))?;
    info!("Wrote {} candles to {}", candles.len(), path.display());
    Ok(())
}

/// Load the transformed candle file
pub fn read_candles(path: &Path) -> Result<Vec<Candle>, DataError> {
    let mut reader = Reader::from_path(path).map_err(|source| read_error(path, source))?;
    reader
        .deserialize::<Candle>()
        .collect::<Result<Vec<_>, _>>()
        .map_err(|source| read_error(path, source))
}

// The header is written explicitly so an empty table still has one.
fn fill_candles<W: io::Write>(writer: &mut Writer<W>, candles: &[Candle]) -> Result<(), csv::Error> {
    writer.write_record(CANDLE_COLUMNS)?;
    for candle in candles {
        writer.serialize(candle)?;
    }
    Ok(())
}

/// Write to a sibling temp file, then rename over `path`, so readers never
/// see a half-written table.
fn write_replacing<F>(path: &Path, fill: F) -> Result<(), PersistError>
where
    F: FnOnce(&mut Writer<File>) -> Result<(), csv::Error>,
{
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).map_err(|source| io_error(dir, source))?;
    }

    let tmp = temp_path(path);
    let result = write_file(&tmp, fill).and_then(|()| {
        fs::rename(&tmp, path).map_err(|source| io_error(path, source))
    });
    if result.is_err() {
        if let Err(e) = fs::remove_file(&tmp) {
            warn!("Could not remove {}: {}", tmp.display(), e);
        }
    }
    result
}

fn write_file<F>(tmp: &Path, fill: F) -> Result<(), PersistError>
where
    F: FnOnce(&mut Writer<File>) -> Result<(), csv::Error>,
{
    let file = File::create(tmp).map_err(|source| io_error(tmp, source))?;
    let mut writer = WriterBuilder::new().has_headers(false).from_writer(file);
    fill(&mut writer).map_err(|source| PersistError::Csv {
        path: tmp.to_path_buf(),
        source,
    })?;
    writer.flush().map_err(|source| io_error(tmp, source))?;
    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

fn read_records(path: &Path) -> Result<(Vec<String>, Vec<StringRecord>), DataError> {
    let mut reader = Reader::from_path(path).map_err(|source| read_error(path, source))?;
    let headers = reader
        .headers()
        .map_err(|source| read_error(path, source))?
        .iter()
        .map(clean_column_name)
        .collect();
    let records = reader
        .records()
        .collect::<Result<Vec<_>, _>>()
        .map_err(|source| read_error(path, source))?;
    Ok((headers, records))
}

/// Strip, lower-case and snake-case a header name
pub fn clean_column_name(name: &str) -> String {
    name.trim().to_lowercase().replace(' ', "_")
}

fn column(path: &Path, headers: &[String], name: &str) -> Result<usize, DataError> {
    headers
        .iter()
        .position(|h| h == name)
        .ok_or_else(|| DataError::MissingColumn {
            path: path.to_path_buf(),
            column: name.to_string(),
        })
}

fn field(record: &StringRecord, idx: usize) -> &str {
    record.get(idx).unwrap_or("")
}

fn ts_cell(ts: Option<DateTime<Utc>>) -> String {
    ts.map(|t| t.to_rfc3339_opts(SecondsFormat::AutoSi, true))
        .unwrap_or_default()
}

fn num_cell(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn read_error(path: &Path, source: csv::Error) -> DataError {
    DataError::Read {
        path: path.to_path_buf(),
        source,
    }
}

fn io_error(path: &Path, source: io::Error) -> PersistError {
    PersistError::Io {
        path: path.to_path_buf(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::from_unix;

    #[test]
    fn test_clean_column_name() {
        assert_eq!(clean_column_name(" Total Volume "), "total_volume");
        assert_eq!(clean_column_name("TS"), "ts");
    }

    #[test]
    fn test_temp_path_is_sibling() {
        assert_eq!(
            temp_path(Path::new("data/transformed_crypto_data.csv")),
            PathBuf::from("data/transformed_crypto_data.csv.tmp")
        );
    }

    #[test]
    fn test_raw_tick_file_tolerates_messy_input() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("coingecko_data.csv");
        fs::write(
            &path,
            " TS ,Price,Volume\n2024-03-01 09:00:00+00:00,62000.5,31000000000\nbad-time,abc,\n1709283900000,62010,\n",
        )
        .unwrap();

        let ticks = read_price_ticks(&path).unwrap();
        assert_eq!(ticks.len(), 3);
        assert_eq!(ticks[0].ts, from_unix(1709283600));
        assert_eq!(ticks[0].price, Some(62000.5));
        assert_eq!(ticks[0].volume, Some(31_000_000_000.0));
        assert_eq!(ticks[1].ts, None);
        assert_eq!(ticks[1].price, None);
        assert_eq!(ticks[2].ts, from_unix(1709283900));
        assert_eq!(ticks[2].volume, None);
    }

    #[test]
    fn test_missing_column_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kraken_ohlc.csv");
        fs::write(&path, "time,open,high,low,close\n1709283600,1,1,1,1\n").unwrap();

        let err = read_ohlc_rows(&path).unwrap_err();
        match err {
            DataError::MissingColumn { column, .. } => assert_eq!(column, "vwap"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_read_missing_file() {
        let err = read_candles(Path::new("/nonexistent/transformed.csv")).unwrap_err();
        assert!(matches!(err, DataError::Read { .. }));
    }

    #[test]
    fn test_write_creates_directory_and_leaves_no_temp() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("kraken_ohlc.csv");
        let row = OhlcRow::new(from_unix(1709283600).unwrap(), 1.0, 2.0, 0.5, 1.5).with_volume(1.2, 3.0, 4);

        write_ohlc_rows(&path, &[row.clone()]).unwrap();
        assert!(!temp_path(&path).exists());
        assert_eq!(read_ohlc_rows(&path).unwrap(), vec![row]);
    }
}
