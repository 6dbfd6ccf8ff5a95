//! Integration tests for trustboard

use chrono::{DateTime, Duration, Utc};
use trustboard::combine::combine;
use trustboard::data::{Candle, OhlcRow, PriceTick, RawTable, Source};
use trustboard::error::DataError;
use trustboard::normalize::{normalize, NormalizeParams};
use trustboard::storage::{
    read_candles, read_ohlc_rows, read_price_ticks, write_candles, write_candles_to,
    write_ohlc_rows, write_price_ticks,
};

fn base() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2024-03-01T09:00:00Z").unwrap().with_timezone(&Utc)
}

/// Helper function to create gap-free Kraken candles with a gentle drift
fn create_kraken_rows(count: i64, interval_min: i64) -> Vec<OhlcRow> {
    (0..count)
        .map(|i| {
            let price = 100.0 + (i as f64 * 0.1) + (i % 10) as f64 * 0.5;
            OhlcRow::new(base() + Duration::minutes(i * interval_min), price, price + 1.0, price - 1.0, price)
                .with_volume(price, 1.5, 12)
        })
        .collect()
}

/// Helper function to create irregular CoinGecko ticks, roughly every 70 seconds
fn create_ticks(count: i64) -> Vec<PriceTick> {
    (0..count)
        .map(|i| PriceTick::new(base() + Duration::seconds(i * 70), 100.0 + (i % 7) as f64, Some(1000.0 + i as f64)))
        .collect()
}

fn params() -> NormalizeParams {
    NormalizeParams::new("bitcoin", 5, 0.10)
}

#[test]
fn test_gap_free_input_yields_one_row_per_boundary() {
    let candles = normalize(&RawTable::Kraken(create_kraken_rows(50, 5)), &params()).unwrap();

    assert_eq!(candles.len(), 50);
    for pair in candles.windows(2) {
        assert_eq!(pair[1].ts_start - pair[0].ts_start, Duration::minutes(5));
    }
    assert!(candles.iter().all(|c| !c.is_missing));
}

#[test]
fn test_sparse_input_is_filled_and_strictly_increasing() {
    let rows: Vec<OhlcRow> = create_kraken_rows(40, 5)
        .into_iter()
        .enumerate()
        .filter(|(i, _)| i % 3 != 1)
        .map(|(_, r)| r)
        .collect();
    let candles = normalize(&RawTable::Kraken(rows), &params()).unwrap();

    assert_eq!(candles.len(), 40);
    assert_eq!(candles.first().unwrap().ts_start, base());
    assert_eq!(candles.last().unwrap().ts_start, base() + Duration::minutes(39 * 5));
    for pair in candles.windows(2) {
        assert_eq!(pair[1].ts_start - pair[0].ts_start, Duration::minutes(5));
    }
    let missing = candles.iter().filter(|c| c.is_missing).count();
    assert_eq!(missing, 13);
}

#[test]
fn test_anomaly_is_bad_or_spike_on_every_row() {
    let mut rows = create_kraken_rows(30, 5);
    rows.remove(7);
    rows[3].high = Some(1.0);
    rows[12].close = Some(500.0);
    rows[20].open = None;

    let kraken = normalize(&RawTable::Kraken(rows), &params()).unwrap();
    let coingecko = normalize(&RawTable::CoinGecko(create_ticks(200)), &params()).unwrap();

    for candle in kraken.iter().chain(coingecko.iter()) {
        assert_eq!(candle.anomaly_flag, candle.bad_candle || candle.spike_flag);
        if candle.is_missing && candle.close.is_none() {
            assert!(!candle.bad_candle);
            assert!(!candle.spike_flag);
        }
    }
    assert!(kraken.iter().any(|c| c.bad_candle));
    assert!(kraken.iter().any(|c| c.spike_flag));
}

#[test]
fn test_normalize_is_idempotent_byte_for_byte() {
    let raw = RawTable::CoinGecko(create_ticks(120));

    let mut first = Vec::new();
    write_candles_to(&mut first, &normalize(&raw, &params()).unwrap()).unwrap();
    let mut second = Vec::new();
    write_candles_to(&mut second, &normalize(&raw, &params()).unwrap()).unwrap();

    assert!(!first.is_empty());
    assert_eq!(first, second);
}

#[test]
fn test_combine_then_split_round_trips() {
    let coingecko = normalize(&RawTable::CoinGecko(create_ticks(100)), &params()).unwrap();
    let kraken = normalize(&RawTable::Kraken(create_kraken_rows(20, 5)), &params()).unwrap();

    let combined = combine(vec![coingecko.clone(), kraken.clone()]).unwrap();
    assert_eq!(combined.len(), coingecko.len() + kraken.len());
    for pair in combined.candles().windows(2) {
        assert!(pair[0].order_key() <= pair[1].order_key());
    }

    let split = combined.split_by_source();
    assert_eq!(split[&Source::CoinGecko], coingecko);
    assert_eq!(split[&Source::Kraken], kraken);
}

#[test]
fn test_scenario_gap_between_minute_0_and_10() {
    let rows = vec![
        OhlcRow::new(base(), 100.0, 101.0, 99.0, 100.5).with_volume(100.2, 3.0, 9),
        OhlcRow::new(base() + Duration::minutes(10), 100.5, 102.0, 100.0, 101.0).with_volume(101.1, 2.0, 4),
    ];
    let candles = normalize(&RawTable::Kraken(rows), &params()).unwrap();

    let starts: Vec<_> = candles.iter().map(|c| c.ts_start).collect();
    assert_eq!(starts, vec![base(), base() + Duration::minutes(5), base() + Duration::minutes(10)]);

    let gap = &candles[1];
    assert!(gap.is_missing);
    assert_eq!(
        (gap.open, gap.high, gap.low, gap.close, gap.vwap, gap.volume, gap.count),
        (None, None, None, None, None, None, None)
    );
}

#[test]
fn test_scenario_spike_on_third_close() {
    let rows: Vec<OhlcRow> = [100.0, 100.0, 150.0]
        .iter()
        .enumerate()
        .map(|(i, &close)| OhlcRow::new(base() + Duration::minutes(i as i64 * 5), close, close, close, close))
        .collect();
    let candles = normalize(&RawTable::Kraken(rows), &params()).unwrap();

    let spikes: Vec<_> = candles.iter().map(|c| c.spike_flag).collect();
    assert_eq!(spikes, vec![false, false, true]);
}

#[test]
fn test_scenario_high_below_open_is_bad() {
    let rows = vec![OhlcRow::new(base(), 10.0, 5.0, 1.0, 8.0)];
    let candles = normalize(&RawTable::Kraken(rows), &params()).unwrap();
    assert!(candles[0].bad_candle);
    assert!(candles[0].anomaly_flag);
}

#[test]
fn test_scenario_same_timestamp_from_both_sources() {
    let coingecko = normalize(
        &RawTable::CoinGecko(vec![PriceTick::new(base() + Duration::seconds(20), 100.0, Some(5.0))]),
        &params(),
    )
    .unwrap();
    let kraken = normalize(&RawTable::Kraken(vec![OhlcRow::new(base(), 100.0, 100.0, 100.0, 100.0)]), &params()).unwrap();

    let combined = combine(vec![kraken, coingecko]).unwrap();
    let rows: Vec<_> = combined.iter().map(|c| (c.ts_start, c.source)).collect();
    assert_eq!(rows, vec![(base(), Source::CoinGecko), (base(), Source::Kraken)]);
}

#[test]
fn test_unparseable_input_fails_with_data_error() {
    let ticks = vec![PriceTick { ts: None, price: Some(1.0), volume: None }];
    assert!(matches!(
        normalize(&RawTable::CoinGecko(ticks), &params()),
        Err(DataError::UnparseableTimestamps { .. })
    ));
}

#[test]
fn test_csv_pipeline_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let cg_path = dir.path().join("coingecko_data.csv");
    let kr_path = dir.path().join("kraken_ohlc.csv");
    let out_path = dir.path().join("transformed_crypto_data.csv");

    write_price_ticks(&cg_path, &create_ticks(60)).unwrap();
    write_ohlc_rows(&kr_path, &create_kraken_rows(12, 5)).unwrap();

    let ticks = read_price_ticks(&cg_path).unwrap();
    let rows = read_ohlc_rows(&kr_path).unwrap();
    assert_eq!(ticks, create_ticks(60));
    assert_eq!(rows, create_kraken_rows(12, 5));

    let combined = combine(vec![
        normalize(&RawTable::CoinGecko(ticks), &params()).unwrap(),
        normalize(&RawTable::Kraken(rows), &params()).unwrap(),
    ])
    .unwrap();
    write_candles(&out_path, combined.candles()).unwrap();

    let header = std::fs::read_to_string(&out_path).unwrap();
    assert!(header.starts_with(
        "source,asset,interval_min,ts_start,open,high,low,close,vwap,volume,count,is_missing,bad_candle,spike_flag,anomaly_flag\n"
    ));

    let loaded: Vec<Candle> = read_candles(&out_path).unwrap();
    assert_eq!(loaded, combined.into_vec());
}

#[test]
fn test_read_candles_written_by_other_tools() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("transformed_crypto_data.csv");
    std::fs::write(
        &path,
        "source,asset,interval_min,ts_start,open,high,low,close,vwap,volume,count,is_missing,bad_candle,spike_flag,anomaly_flag\n\
         coingecko,BITCOIN,5,2024-03-01 09:00:00+00:00,100.0,101.0,99.0,100.5,,2500.0,,False,False,False,False\n\
         kraken,BITCOIN,5,2024-03-01 09:05:00+00:00,,,,,,,,True,False,False,False\n\
         kraken,BITCOIN,5,2024-03-01 09:10:00+00:00,1.0,2.0,0.5,1.5,1.2,3.0,12.0,False,False,True,True\n",
    )
    .unwrap();

    let candles = read_candles(&path).unwrap();
    assert_eq!(candles.len(), 3);
    assert_eq!(candles[0].source, Source::CoinGecko);
    assert_eq!(candles[0].vwap, None);
    assert_eq!(candles[0].volume, Some(2500.0));
    assert!(candles[1].is_missing);
    assert_eq!(candles[1].close, None);
    assert_eq!(candles[2].count, Some(12));
    assert!(candles[2].spike_flag && candles[2].anomaly_flag);
    assert_eq!(candles[2].ts_start, base() + Duration::minutes(10));
}
