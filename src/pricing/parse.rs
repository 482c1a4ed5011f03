//! Decoding of the pricing feed payload.
//!
//! The feed has shipped several record layouts over time, so field names and
//! timestamp encodings are matched loosely. Parsing is a pure function of the
//! body bytes.

use crate::error::FetchError;
use crate::pricing::types::{PricePoint, PriceSeries};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use chrono_tz::Tz;
use serde_json::Value;

/// Object keys that may hold the record list
const LIST_KEYS: [&str; 5] = ["data", "prices", "feed", "results", "items"];
/// Record keys that may hold the timestamp, in priority order
const TIMESTAMP_KEYS: [&str; 5] = ["millisUTC", "timestamp", "time", "date", "datetime"];
/// Record keys that may hold the price, in priority order
const PRICE_KEYS: [&str; 4] = ["price", "value", "cost", "rate"];

/// How decoded points are localized and filtered
#[derive(Debug, Clone, Copy)]
pub struct ParseOptions {
    pub timezone: Tz,
    pub min_price: f64,
    pub max_price: f64,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            timezone: chrono_tz::America::Chicago,
            min_price: 0.0,
            max_price: 1000.0,
        }
    }
}

/// Result of decoding one payload
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedFeed {
    pub series: PriceSeries,
    /// Records seen in the payload, including skipped ones
    pub total_records: usize,
}

/// Decode a raw response body into a price series
pub fn parse_feed(body: &[u8], opts: &ParseOptions) -> Result<ParsedFeed, FetchError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(FetchError::Empty { records: 0 });
    }
    let value: Value = serde_json::from_slice(body)?;
    parse_value(&value, opts)
}

/// Decode an already-parsed JSON document
pub fn parse_value(value: &Value, opts: &ParseOptions) -> Result<ParsedFeed, FetchError> {
    let records = extract_records(value)?;
    let total_records = records.len();

    let points: Vec<PricePoint> = records
        .into_iter()
        .filter_map(|record| parse_record(record, opts))
        .collect();

    if points.is_empty() {
        return Err(FetchError::Empty {
            records: total_records,
        });
    }

    Ok(ParsedFeed {
        series: PriceSeries::from_points(points),
        total_records,
    })
}

/// Locate the list of records inside the payload
fn extract_records(value: &Value) -> Result<Vec<&Value>, FetchError> {
    match value {
        Value::Array(items) => Ok(items.iter().collect()),
        Value::Object(map) => {
            if map.is_empty() {
                return Ok(Vec::new());
            }
            // The first list-valued key decides; an empty list there means
            // the object itself is read as a lone record
            let listed = LIST_KEYS.iter().find_map(|key| match map.get(*key) {
                Some(Value::Array(items)) => Some(items),
                _ => None,
            });
            match listed {
                Some(items) if !items.is_empty() => Ok(items.iter().collect()),
                _ => Ok(vec![value]),
            }
        }
        Value::Null => Ok(Vec::new()),
        other => Err(FetchError::malformed(format!(
            "unexpected data format: {}",
            json_kind(other)
        ))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn parse_record(record: &Value, opts: &ParseOptions) -> Option<PricePoint> {
    let obj = record.as_object()?;

    // The first timestamp key present decides, even if its value is unusable
    let raw_ts = TIMESTAMP_KEYS.iter().find_map(|k| obj.get(*k))?;
    let raw_ts = match raw_ts {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };

    let price = PRICE_KEYS
        .iter()
        .filter_map(|k| obj.get(*k))
        .find_map(price_from_value)?;

    if !(opts.min_price..=opts.max_price).contains(&price) {
        return None;
    }

    let timestamp = parse_timestamp(&raw_ts, &opts.timezone)?;
    Some(PricePoint::new(timestamp, price))
}

fn price_from_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|p| p.is_finite())
}

/// Parse a feed timestamp and express it in `tz`.
///
/// Accepted encodings: 13-digit epoch milliseconds, `YYYYMMDDHHMMSS`,
/// `YYYYMMDDHHMM`, RFC 3339 and naive ISO 8601. Values without an offset are
/// read as UTC.
pub fn parse_timestamp(raw: &str, tz: &Tz) -> Option<DateTime<Tz>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    let all_digits = raw.bytes().all(|b| b.is_ascii_digit());
    let utc = if all_digits && raw.len() == 13 {
        DateTime::<Utc>::from_timestamp_millis(raw.parse::<i64>().ok()?)?
    } else if all_digits && raw.len() == 14 {
        NaiveDateTime::parse_from_str(raw, "%Y%m%d%H%M%S")
            .ok()?
            .and_utc()
    } else if all_digits && raw.len() == 12 {
        NaiveDateTime::parse_from_str(raw, "%Y%m%d%H%M")
            .ok()?
            .and_utc()
    } else {
        parse_iso(raw)?
    };

    Some(utc.with_timezone(tz))
}

fn parse_iso(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f%:z", "%Y-%m-%d %H:%M:%S%.f%:z"] {
        if let Ok(dt) = DateTime::parse_from_str(raw, fmt) {
            return Some(dt.with_timezone(&Utc));
        }
    }
    for fmt in [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M",
    ] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .map(|d| d.and_time(NaiveTime::MIN).and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Timelike};
    use chrono_tz::America::Chicago;

    #[test]
    fn parses_epoch_millis_into_chicago() {
        // 2025-07-29 00:00:00 UTC -> 2025-07-28 19:00 CDT
        let ts = parse_timestamp("1753747200000", &Chicago).unwrap();
        assert_eq!(ts, Chicago.with_ymd_and_hms(2025, 7, 28, 19, 0, 0).unwrap());
    }

    #[test]
    fn parses_compact_formats_as_utc() {
        let a = parse_timestamp("20250115183000", &Chicago).unwrap();
        let b = parse_timestamp("202501151830", &Chicago).unwrap();
        assert_eq!(a, b);
        // CST is UTC-6
        assert_eq!(a.hour(), 12);
        assert_eq!(a.minute(), 30);
    }

    #[test]
    fn parses_iso_variants() {
        let expected = Chicago.with_ymd_and_hms(2025, 1, 15, 12, 30, 0).unwrap();
        for raw in [
            "2025-01-15T18:30:00Z",
            "2025-01-15T18:30:00+00:00",
            "2025-01-15T12:30:00-06:00",
            "2025-01-15T18:30:00",
            "2025-01-15 18:30:00",
            "2025-01-15T18:30",
        ] {
            assert_eq!(parse_timestamp(raw, &Chicago), Some(expected), "{raw}");
        }
    }

    #[test]
    fn rejects_garbage_timestamps() {
        assert_eq!(parse_timestamp("", &Chicago), None);
        assert_eq!(parse_timestamp("0", &Chicago), None);
        assert_eq!(parse_timestamp("yesterday", &Chicago), None);
        assert_eq!(parse_timestamp("20251399999999", &Chicago), None);
    }

    #[test]
    fn comed_feed_layout() {
        let body = br#"[
            {"millisUTC":"1753747500000","price":"3.1"},
            {"millisUTC":"1753747200000","price":"2.9"}
        ]"#;
        let parsed = parse_feed(body, &ParseOptions::default()).unwrap();
        assert_eq!(parsed.total_records, 2);
        assert_eq!(parsed.series.len(), 2);
        assert_eq!(parsed.series.points()[0].price, 2.9);
        assert_eq!(parsed.series.points()[1].price, 3.1);
    }

    #[test]
    fn wrapped_list_and_alternate_fields() {
        let body = br#"{"prices":[
            {"time":"2025-01-15T18:30:00Z","value":4.5},
            {"datetime":"2025-01-15T18:35:00Z","rate":"n/a","cost":5}
        ]}"#;
        let parsed = parse_feed(body, &ParseOptions::default()).unwrap();
        assert_eq!(parsed.series.len(), 2);
        assert_eq!(parsed.series.points()[1].price, 5.0);
    }

    #[test]
    fn first_list_key_wins_even_when_empty() {
        let body = br#"{"data":[],"prices":[{"millisUTC":"1753747200000","price":"2.0"}]}"#;
        assert_eq!(
            parse_feed(body, &ParseOptions::default()),
            Err(FetchError::Empty { records: 1 })
        );

        // Non-list values under earlier keys are passed over
        let body = br#"{"data":"n/a","prices":[{"millisUTC":"1753747200000","price":"2.0"}]}"#;
        let parsed = parse_feed(body, &ParseOptions::default()).unwrap();
        assert_eq!(parsed.series.len(), 1);
    }

    #[test]
    fn single_object_is_one_record() {
        let body = br#"{"millisUTC":1753747200000,"price":2.0}"#;
        let parsed = parse_feed(body, &ParseOptions::default()).unwrap();
        assert_eq!(parsed.total_records, 1);
        assert_eq!(parsed.series.len(), 1);
    }

    #[test]
    fn skips_out_of_range_and_incomplete_records() {
        let body = br#"[
            {"millisUTC":"1753747200000","price":"-1.0"},
            {"millisUTC":"1753747500000","price":"1500"},
            {"millisUTC":"1753747800000"},
            {"price":"2.0"},
            "not a record",
            {"millisUTC":"1753748100000","price":"2.2"}
        ]"#;
        let parsed = parse_feed(body, &ParseOptions::default()).unwrap();
        assert_eq!(parsed.total_records, 6);
        assert_eq!(parsed.series.len(), 1);
        assert_eq!(parsed.series.points()[0].price, 2.2);
    }

    #[test]
    fn malformed_and_empty_payloads() {
        let opts = ParseOptions::default();
        assert!(matches!(
            parse_feed(b"<html>oops</html>", &opts),
            Err(FetchError::Malformed { .. })
        ));
        assert!(matches!(
            parse_feed(b"\"hello\"", &opts),
            Err(FetchError::Malformed { .. })
        ));
        assert_eq!(
            parse_feed(b"", &opts),
            Err(FetchError::Empty { records: 0 })
        );
        assert_eq!(
            parse_feed(b"[]", &opts),
            Err(FetchError::Empty { records: 0 })
        );
        assert_eq!(
            parse_feed(b"{}", &opts),
            Err(FetchError::Empty { records: 0 })
        );
        assert_eq!(
            parse_feed(br#"[{"price":"1"}]"#, &opts),
            Err(FetchError::Empty { records: 1 })
        );
    }

    #[test]
    fn honors_custom_bounds() {
        let opts = ParseOptions {
            min_price: -5.0,
            max_price: 5.0,
            ..ParseOptions::default()
        };
        let body = br#"[{"millisUTC":"1753747200000","price":"-2.5"}]"#;
        let parsed = parse_feed(body, &opts).unwrap();
        assert_eq!(parsed.series.points()[0].price, -2.5);
    }
}
