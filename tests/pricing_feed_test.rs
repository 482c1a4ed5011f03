use chrono::{DateTime, TimeZone};
use chrono_tz::America::Chicago;
use chrono_tz::Tz;
use comed_dashboard::error::FetchError;
use comed_dashboard::pricing::{
    Granularity, ParseOptions, PricePoint, PriceSeries, aggregate, parse_feed, points_in, recent,
    stats, week_windows,
};

fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Tz> {
    Chicago.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
}

/// Feed-shaped body with one record every five minutes, newest first
fn feed_body(start: DateTime<Tz>, prices: &[f64]) -> Vec<u8> {
    let records: Vec<serde_json::Value> = prices
        .iter()
        .enumerate()
        .rev()
        .map(|(i, p)| {
            let ts = start + chrono::Duration::minutes(5 * i as i64);
            serde_json::json!({
                "millisUTC": ts.timestamp_millis().to_string(),
                "price": format!("{:.1}", p),
            })
        })
        .collect();
    serde_json::to_vec(&records).unwrap()
}

#[test]
fn parsed_series_is_sorted_and_unique() {
    let start = at(2025, 7, 1, 9, 0);
    let mut body: Vec<serde_json::Value> =
        serde_json::from_slice(&feed_body(start, &[3.0, 5.0, 4.0, 2.0])).unwrap();
    // Same instant as the first record, reported again later in the payload
    body.push(serde_json::json!({
        "millisUTC": start.timestamp_millis().to_string(),
        "price": "9.9",
    }));
    let bytes = serde_json::to_vec(&body).unwrap();

    let parsed = parse_feed(&bytes, &ParseOptions::default()).unwrap();
    assert_eq!(parsed.total_records, 5);
    assert_eq!(parsed.series.len(), 4);
    let ts: Vec<_> = parsed.series.iter().map(|p| p.timestamp).collect();
    assert!(ts.windows(2).all(|w| w[0] < w[1]));
    assert_eq!(parsed.series.first().unwrap().price, 9.9);

    // Parsing the same body twice yields the same series
    let again = parse_feed(&bytes, &ParseOptions::default()).unwrap();
    assert_eq!(again, parsed);
}

#[test]
fn hour_average_of_three_samples() {
    let start = at(2025, 7, 1, 14, 0);
    let parsed = parse_feed(&feed_body(start, &[3.0, 5.0, 4.0]), &ParseOptions::default()).unwrap();
    let buckets = parsed.series.aggregate(Granularity::Hour);
    assert_eq!(buckets.len(), 1);
    assert_eq!(buckets[0].period_start, start);
    assert_eq!(buckets[0].count, 3);
    assert!((buckets[0].average_price - 4.0).abs() < 1e-9);
}

#[test]
fn unusable_payloads_are_typed_errors() {
    let opts = ParseOptions::default();
    assert!(matches!(
        parse_feed(b"<html>maintenance</html>", &opts),
        Err(FetchError::Malformed { .. })
    ));
    assert_eq!(
        parse_feed(b"[]", &opts).unwrap_err(),
        FetchError::Empty { records: 0 }
    );
    let all_bad = br#"[{"millisUTC":"1751378400000","price":"-5"},{"price":"2.0"}]"#;
    assert_eq!(
        parse_feed(all_bad, &opts).unwrap_err(),
        FetchError::Empty { records: 2 }
    );
}

#[test]
fn weeks_partition_a_month_of_data() {
    // Hourly samples from Sunday 2025-06-01 through Wednesday 2025-07-02 noon
    let first = at(2025, 6, 1, 0, 0);
    let now = at(2025, 7, 2, 12, 0);
    let mut points = Vec::new();
    let mut ts = first;
    while ts <= now {
        points.push(PricePoint::new(ts, 3.0));
        ts += chrono::Duration::hours(1);
    }
    let series = PriceSeries::from_points(points);

    let windows = week_windows(&now, 5);
    assert_eq!(windows.len(), 5);
    assert_eq!(windows[0].start, at(2025, 6, 29, 0, 0));
    assert_eq!(windows[4].start, at(2025, 6, 1, 0, 0));

    let total: usize = windows
        .iter()
        .map(|w| points_in(&series, &w.start, &w.end).len())
        .sum();
    assert_eq!(total, series.len());

    let weekly = aggregate(series.points(), Granularity::Week);
    assert_eq!(weekly.len(), 5);
    assert!(weekly.iter().all(|b| (b.average_price - 3.0).abs() < 1e-9));
}

#[test]
fn recent_window_and_stats() {
    let start = at(2025, 7, 1, 0, 0);
    let points = (0..200)
        .map(|i| PricePoint::new(start + chrono::Duration::minutes(5 * i), (i % 10) as f64))
        .collect();
    let series = PriceSeries::from_points(points);

    let last = recent(&series, 144);
    assert_eq!(last.len(), 144);
    assert_eq!(last.last(), series.last());

    let s = stats(last).unwrap();
    assert_eq!(s.count, 144);
    assert_eq!(s.min, 0.0);
    assert_eq!(s.max, 9.0);
    assert!(stats(&[]).is_none());
}
