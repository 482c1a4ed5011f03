use super::types::{DashboardSnapshot, LastFetch, RecentSection, WeekSection};
use crate::config::DashboardConfig;
use crate::pricing::{Granularity, aggregate, points_in, recent, stats, week_windows};
use chrono::DateTime;
use chrono_tz::Tz;

fn build_recent_section(last: Option<&LastFetch>, settings: &DashboardConfig) -> RecentSection {
    let Some(last) = last else {
        return RecentSection::default();
    };
    let points = recent(&last.feed.series, settings.recent_points);
    RecentSection {
        points: points.to_vec(),
        stats: stats(points),
    }
}

fn build_week_sections(
    last: Option<&LastFetch>,
    now: &DateTime<Tz>,
    settings: &DashboardConfig,
) -> Vec<WeekSection> {
    let Some(last) = last else {
        return Vec::new();
    };
    week_windows(now, settings.weeks)
        .into_iter()
        .filter_map(|w| {
            let points = points_in(&last.feed.series, &w.start, &w.end);
            let stats = stats(points)?;
            let data_start = points.first()?.timestamp;
            let data_end = points.last()?.timestamp;
            let partial = data_start.date_naive() > w.start.date_naive()
                || data_end.date_naive() < w.end.date_naive();
            Some(WeekSection {
                index: w.index,
                start: w.start,
                end: w.end,
                points: points.to_vec(),
                stats,
                partial,
                data_start,
                data_end,
            })
        })
        .collect()
}

/// Assemble the view for one refresh cycle.
///
/// `last` is the newest successful fetch, which may predate this cycle when
/// `error` is set.
pub fn build_snapshot(
    last: Option<&LastFetch>,
    now: &DateTime<Tz>,
    settings: &DashboardConfig,
    refresh_id: u64,
    error: Option<String>,
) -> DashboardSnapshot {
    let recent = build_recent_section(last, settings);
    let hourly = aggregate(&recent.points, Granularity::Hour);
    let weeks = build_week_sections(last, now, settings);

    let weekly_averages = match (last, weeks.last(), weeks.first()) {
        (Some(last), Some(oldest), Some(newest)) => aggregate(
            points_in(&last.feed.series, &oldest.start, &newest.end),
            Granularity::Week,
        ),
        _ => Vec::new(),
    };

    DashboardSnapshot {
        refresh_id,
        generated_at: *now,
        last_success_at: last.map(|l| l.fetched_at),
        source_url: last.map(|l| l.feed.source_url.clone()),
        total_records: last.map_or(0, |l| l.feed.total_records),
        point_count: last.map_or(0, |l| l.feed.series.len()),
        timezone: settings.timezone.clone(),
        reference_line: settings.reference_line,
        refresh_interval_secs: settings.refresh_interval_secs,
        recent,
        hourly,
        weeks,
        weekly_averages,
        error,
    }
}
