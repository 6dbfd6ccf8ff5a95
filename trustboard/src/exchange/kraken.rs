//! Kraken OHLC payloads

use crate::data::{from_unix, parse_count, parse_number, OhlcRow, Source};
use crate::error::FetchError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

/// Interval widths (minutes) accepted by `/0/public/OHLC`
pub const KRAKEN_INTERVALS: [u32; 9] = [1, 5, 15, 30, 60, 240, 1440, 10080, 21600];

/// `GET /0/public/OHLC` body:
/// `{"error": [...], "result": {"<pair>": [[time, o, h, l, c, vwap, volume, count]], "last": <ts>}}`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KrakenOhlcResponse {
    #[serde(default)]
    pub error: Vec<String>,
    #[serde(default)]
    pub result: Option<Map<String, Value>>,
}

/// Extract OHLC rows, surfacing Kraken's `error` array as a failure.
///
/// Kraken renames pairs (XBTUSD becomes XXBTZUSD), so the data is taken from
/// the first result key that is not `last`. Fields that do not parse are
/// kept as nulls.
pub fn parse_ohlc_response(pair: &str, body: KrakenOhlcResponse) -> Result<Vec<OhlcRow>, FetchError> {
    if !body.error.is_empty() {
        return Err(FetchError::Provider {
            provider: Source::Kraken,
            messages: body.error,
        });
    }

    let result = body.result.unwrap_or_default();
    if let Some(last) = result.get("last") {
        debug!("kraken: next `since` cursor is {}", last);
    }
    let data = result
        .iter()
        .find(|(key, _)| key.as_str() != "last")
        .map(|(_, value)| value)
        .ok_or_else(|| FetchError::MissingPair { pair: pair.to_string() })?;

    let rows = data.as_array().ok_or_else(|| FetchError::Decode {
        provider: Source::Kraken,
        message: format!("OHLC data for {} is not an array", pair),
    })?;

    Ok(rows.iter().map(parse_row).collect())
}

fn parse_row(row: &Value) -> OhlcRow {
    let cell = |i: usize| row.get(i);
    let number = |i: usize| cell(i).and_then(value_f64);

    OhlcRow {
        time: cell(0).and_then(value_f64).and_then(|t| from_unix(t as i64)),
        open: number(1),
        high: number(2),
        low: number(3),
        close: number(4),
        vwap: number(5),
        volume: number(6),
        count: cell(7).and_then(|v| match v {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => parse_count(s),
            _ => None,
        }),
    }
}

fn value_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|v| v.is_finite()),
        Value::String(s) => parse_number(s),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(json: &str) -> KrakenOhlcResponse {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_parse_rows() {
        let rows = parse_ohlc_response(
            "XBTUSD",
            body(
                r#"{"error": [], "result": {
                    "XXBTZUSD": [
                        [1709283600, "62000.0", "62100.5", "61950.0", "62050.0", "62020.1", "12.5", 340],
                        [1709283900, "62050.0", "oops", "62000.0", "62010.0", "62030.0", "3.0", "7"]
                    ],
                    "last": 1709283900
                }}"#,
            ),
        )
        .unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].time, from_unix(1709283600));
        assert_eq!(rows[0].open, Some(62000.0));
        assert_eq!(rows[0].high, Some(62100.5));
        assert_eq!(rows[0].vwap, Some(62020.1));
        assert_eq!(rows[0].volume, Some(12.5));
        assert_eq!(rows[0].count, Some(340));
        assert_eq!(rows[1].high, None);
        assert_eq!(rows[1].count, Some(7));
    }

    #[test]
    fn test_error_array_is_fatal() {
        let err = parse_ohlc_response(
            "NOPE",
            body(r#"{"error": ["EQuery:Unknown asset pair"]}"#),
        )
        .unwrap_err();
        match err {
            FetchError::Provider { provider, messages } => {
                assert_eq!(provider, Source::Kraken);
                assert_eq!(messages, vec!["EQuery:Unknown asset pair".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_pair() {
        let err = parse_ohlc_response("XBTUSD", body(r#"{"error": [], "result": {"last": 1}}"#))
            .unwrap_err();
        assert!(matches!(err, FetchError::MissingPair { .. }));
    }

    #[test]
    fn test_short_row_yields_nulls() {
        let rows = parse_ohlc_response(
            "XBTUSD",
            body(r#"{"error": [], "result": {"XXBTZUSD": [[1709283600, "1.0"]], "last": 0}}"#),
        )
        .unwrap();
        assert_eq!(rows[0].open, Some(1.0));
        assert_eq!(rows[0].close, None);
        assert_eq!(rows[0].count, None);
    }
}
