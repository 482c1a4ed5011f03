use crate::pricing::types::{
    AggregateBucket, Granularity, PricePoint, PriceSeries, PriceStats, WeekWindow,
    local_midnight, week_start,
};
use chrono::{DateTime, Duration};
use chrono_tz::Tz;
use std::collections::BTreeMap;

/// Average prices per bucket.
///
/// Buckets come back ordered by start; a bucket with no points never appears.
pub fn aggregate(points: &[PricePoint], granularity: Granularity) -> Vec<AggregateBucket> {
    let mut buckets: BTreeMap<DateTime<Tz>, (f64, usize)> = BTreeMap::new();
    for p in points {
        let entry = buckets
            .entry(granularity.truncate(&p.timestamp))
            .or_insert((0.0, 0));
        entry.0 += p.price;
        entry.1 += 1;
    }

    buckets
        .into_iter()
        .map(|(period_start, (sum, count))| AggregateBucket {
            period_start,
            average_price: sum / count as f64,
            count,
        })
        .collect()
}

impl PriceSeries {
    pub fn aggregate(&self, granularity: Granularity) -> Vec<AggregateBucket> {
        aggregate(self.points(), granularity)
    }
}

/// Mean, median and range of the given prices; `None` when empty
pub fn stats(points: &[PricePoint]) -> Option<PriceStats> {
    if points.is_empty() {
        return None;
    }
    let mut prices: Vec<f64> = points.iter().map(|p| p.price).collect();
    prices.sort_by(f64::total_cmp);

    let count = prices.len();
    let average = prices.iter().sum::<f64>() / count as f64;
    let median = if count % 2 == 1 {
        prices[count / 2]
    } else {
        (prices[count / 2 - 1] + prices[count / 2]) / 2.0
    };

    Some(PriceStats {
        average,
        median,
        min: prices[0],
        max: prices[count - 1],
        count,
    })
}

/// The `count` most recent Sunday-to-Saturday weeks, newest first.
///
/// Window 1 contains `now`. Each window ends one microsecond before the next
/// Sunday midnight.
pub fn week_windows(now: &DateTime<Tz>, count: usize) -> Vec<WeekWindow> {
    let tz = now.timezone();
    let current_sunday = week_start(now).date_naive();

    (0..count)
        .map(|i| {
            let sunday = current_sunday - Duration::weeks(i as i64);
            let start = local_midnight(&tz, sunday);
            let next = local_midnight(&tz, sunday + Duration::weeks(1));
            WeekWindow {
                index: i + 1,
                start,
                end: next - Duration::microseconds(1),
            }
        })
        .collect()
}

/// Points with `start <= timestamp <= end`
pub fn points_in<'a>(
    series: &'a PriceSeries,
    start: &DateTime<Tz>,
    end: &DateTime<Tz>,
) -> &'a [PricePoint] {
    let points = series.points();
    let lo = points.partition_point(|p| p.timestamp < *start);
    let hi = points.partition_point(|p| p.timestamp <= *end);
    if lo >= hi { &[] } else { &points[lo..hi] }
}

/// The last `n` points, oldest first
pub fn recent(series: &PriceSeries, n: usize) -> &[PricePoint] {
    let points = series.points();
    &points[points.len().saturating_sub(n)..]
}
