use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, TimeZone, Timelike};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

/// One 5-minute price sample, in cents per kWh
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PricePoint {
    pub timestamp: DateTime<Tz>,
    pub price: f64,
}

impl PricePoint {
    pub fn new(timestamp: DateTime<Tz>, price: f64) -> Self {
        Self { timestamp, price }
    }
}

/// Price samples ordered by timestamp, at most one per instant
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct PriceSeries {
    points: Vec<PricePoint>,
}

impl PriceSeries {
    /// Build a series from unordered points.
    ///
    /// Points are sorted by instant; when several share an instant the one
    /// that came last in the input wins.
    pub fn from_points(mut points: Vec<PricePoint>) -> Self {
        // Stable sort keeps input order among equal instants
        points.sort_by_key(|p| p.timestamp);
        let mut deduped: Vec<PricePoint> = Vec::with_capacity(points.len());
        for p in points {
            match deduped.last_mut() {
                Some(last) if last.timestamp == p.timestamp => *last = p,
                _ => deduped.push(p),
            }
        }
        Self { points: deduped }
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first(&self) -> Option<&PricePoint> {
        self.points.first()
    }

    pub fn last(&self) -> Option<&PricePoint> {
        self.points.last()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PricePoint> {
        self.points.iter()
    }
}

/// Bucket width used when averaging prices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Hour,
    /// Sunday 00:00 to the following Sunday, local time
    Week,
}

impl Granularity {
    /// Start of the bucket containing `ts`
    pub fn truncate(self, ts: &DateTime<Tz>) -> DateTime<Tz> {
        match self {
            Self::Hour => truncate_to_hour(ts),
            Self::Week => week_start(ts),
        }
    }
}

/// Mean price over one bucket
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateBucket {
    pub period_start: DateTime<Tz>,
    pub average_price: f64,
    pub count: usize,
}

/// Summary statistics over a run of prices
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PriceStats {
    pub average: f64,
    pub median: f64,
    pub min: f64,
    pub max: f64,
    pub count: usize,
}

/// One Sunday-to-Saturday week, `index` 1 being the current week
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeekWindow {
    pub index: usize,
    pub start: DateTime<Tz>,
    pub end: DateTime<Tz>,
}

/// Drop minutes and below, keeping the UTC offset of `ts`.
///
/// Works on the instant rather than the wall clock so the repeated hour at a
/// DST fall-back stays two distinct hours.
pub(crate) fn truncate_to_hour(ts: &DateTime<Tz>) -> DateTime<Tz> {
    let into_hour = Duration::seconds(i64::from(ts.minute()) * 60 + i64::from(ts.second()))
        + Duration::nanoseconds(i64::from(ts.nanosecond()));
    *ts - into_hour
}

/// Sunday 00:00 local time of the week containing `ts`
pub(crate) fn week_start(ts: &DateTime<Tz>) -> DateTime<Tz> {
    let days_since_sunday = i64::from(ts.weekday().num_days_from_sunday());
    let sunday = ts.date_naive() - Duration::days(days_since_sunday);
    local_midnight(&ts.timezone(), sunday)
}

/// First instant of `date` in `tz`
pub(crate) fn local_midnight(tz: &Tz, date: NaiveDate) -> DateTime<Tz> {
    let naive = date.and_time(NaiveTime::MIN);
    tz.from_local_datetime(&naive)
        .earliest()
        // Midnight skipped by a DST gap: fall back to the UTC reading
        .unwrap_or_else(|| tz.from_utc_datetime(&naive))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono_tz::America::Chicago;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Tz> {
        Chicago.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    #[test]
    fn from_points_sorts_and_dedupes() {
        let series = PriceSeries::from_points(vec![
            PricePoint::new(at(2025, 3, 4, 10, 5), 2.0),
            PricePoint::new(at(2025, 3, 4, 10, 0), 1.0),
            PricePoint::new(at(2025, 3, 4, 10, 5), 3.0),
        ]);
        assert_eq!(series.len(), 2);
        assert_eq!(series.points()[0].price, 1.0);
        // Last duplicate wins
        assert_eq!(series.points()[1].price, 3.0);
    }

    #[test]
    fn hour_truncation() {
        let ts = Chicago.with_ymd_and_hms(2025, 7, 1, 14, 37, 12).unwrap();
        assert_eq!(Granularity::Hour.truncate(&ts), at(2025, 7, 1, 14, 0));
    }

    #[test]
    fn hour_truncation_keeps_repeated_dst_hour_apart() {
        // 2025-11-02 01:30 happens twice in Chicago
        let first = Chicago
            .with_ymd_and_hms(2025, 11, 2, 1, 30, 0)
            .earliest()
            .unwrap();
        let second = Chicago
            .with_ymd_and_hms(2025, 11, 2, 1, 30, 0)
            .latest()
            .unwrap();
        let a = Granularity::Hour.truncate(&first);
        let b = Granularity::Hour.truncate(&second);
        assert_ne!(a, b);
        assert_eq!((b - a).num_hours(), 1);
    }

    #[test]
    fn week_truncation_starts_on_sunday() {
        // Wednesday 2025-03-05
        let ts = at(2025, 3, 5, 18, 45);
        let start = Granularity::Week.truncate(&ts);
        assert_eq!(start, at(2025, 3, 2, 0, 0));
        assert_eq!(start.weekday(), chrono::Weekday::Sun);

        // A Sunday maps to itself at midnight
        let sunday = at(2025, 3, 9, 12, 0);
        assert_eq!(Granularity::Week.truncate(&sunday), at(2025, 3, 9, 0, 0));
    }
}
