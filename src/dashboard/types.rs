use crate::config::ReferenceLine;
use crate::pricing::{AggregateBucket, FetchedFeed, PricePoint, PriceStats};
use chrono::DateTime;
use chrono_tz::Tz;
use serde::Serialize;

/// Commands accepted by the refresher from other components (web, etc.)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DashboardCommand {
    /// Fetch immediately and restart the refresh timer
    RefreshNow,
}

/// Last successful fetch, kept so a failed refresh can fall back to it
#[derive(Debug, Clone)]
pub struct LastFetch {
    pub feed: FetchedFeed,
    pub fetched_at: DateTime<Tz>,
}

/// Most recent points and their statistics
#[derive(Debug, Clone, Default, Serialize)]
pub struct RecentSection {
    pub points: Vec<PricePoint>,
    pub stats: Option<PriceStats>,
}

/// One week of the weekly analysis
#[derive(Debug, Clone, Serialize)]
pub struct WeekSection {
    pub index: usize,
    pub start: DateTime<Tz>,
    pub end: DateTime<Tz>,
    pub points: Vec<PricePoint>,
    pub stats: PriceStats,
    /// Data covers only part of the week
    pub partial: bool,
    pub data_start: DateTime<Tz>,
    pub data_end: DateTime<Tz>,
}

/// Everything the UI renders after one refresh cycle
#[derive(Debug, Clone, Serialize)]
pub struct DashboardSnapshot {
    pub refresh_id: u64,
    pub generated_at: DateTime<Tz>,
    pub last_success_at: Option<DateTime<Tz>>,
    pub source_url: Option<String>,
    pub total_records: usize,
    pub point_count: usize,
    pub timezone: String,
    pub reference_line: ReferenceLine,
    pub refresh_interval_secs: u64,
    pub recent: RecentSection,
    /// Hourly averages over the recent points
    pub hourly: Vec<AggregateBucket>,
    /// Weeks with data, newest first
    pub weeks: Vec<WeekSection>,
    /// Weekly averages across the analysed weeks, oldest first
    pub weekly_averages: Vec<AggregateBucket>,
    /// Message from the last failed refresh; data above is from the previous success
    pub error: Option<String>,
}
