//! Auto-refresh loop for the pricing dashboard
//!
//! The refresher owns the only mutable state in the process: the last
//! successful fetch. Each cycle fetches the feed, builds a
//! [`DashboardSnapshot`] and publishes it on a watch channel that the web
//! layer reads. A failed fetch republishes the previous data with the error
//! attached.

use crate::config::{Config, DashboardConfig};
use crate::error::{DashboardError, Result};
use crate::logging::{StructuredLogger, get_logger};
use crate::pricing::PriceSource;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use std::sync::Arc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, watch};
use tokio::time::{Duration, MissedTickBehavior, interval};

pub mod snapshot;
pub mod types;

pub use snapshot::build_snapshot;
pub use types::{DashboardCommand, DashboardSnapshot, LastFetch, RecentSection, WeekSection};

/// Receiver side of the snapshot channel; `None` until the first cycle ends
pub type SnapshotReceiver = watch::Receiver<Option<Arc<DashboardSnapshot>>>;

/// Cheap, cloneable access to the refresher for other components
#[derive(Clone)]
pub struct DashboardHandle {
    snapshot_rx: SnapshotReceiver,
    commands_tx: mpsc::Sender<DashboardCommand>,
}

impl DashboardHandle {
    /// Latest published snapshot
    pub fn latest(&self) -> Option<Arc<DashboardSnapshot>> {
        self.snapshot_rx.borrow().clone()
    }

    /// Receiver that wakes on every new snapshot
    pub fn subscribe(&self) -> SnapshotReceiver {
        self.snapshot_rx.clone()
    }

    /// Ask the refresher to fetch now instead of waiting for the timer.
    ///
    /// At most one request is queued; asking again while one is pending
    /// succeeds without queueing another fetch.
    pub fn request_refresh(&self) -> Result<()> {
        match self.commands_tx.try_send(DashboardCommand::RefreshNow) {
            Ok(()) | Err(TrySendError::Full(_)) => Ok(()),
            Err(TrySendError::Closed(_)) => {
                Err(DashboardError::web("dashboard refresher is not running"))
            }
        }
    }
}

/// Periodic fetch-aggregate-publish loop
pub struct DashboardRefresher {
    settings: DashboardConfig,
    timezone: Tz,
    source: Arc<dyn PriceSource>,
    logger: StructuredLogger,
    snapshot_tx: watch::Sender<Option<Arc<DashboardSnapshot>>>,
    commands_rx: mpsc::Receiver<DashboardCommand>,
    last_fetch: Option<LastFetch>,
    refresh_count: u64,
}

impl DashboardRefresher {
    /// Create the refresher and the handle other components use to reach it
    pub fn new(config: &Config, source: Arc<dyn PriceSource>) -> Result<(Self, DashboardHandle)> {
        let timezone = config.timezone()?;
        let (snapshot_tx, snapshot_rx) = watch::channel(None);
        let (commands_tx, commands_rx) = mpsc::channel(1);

        let refresher = Self {
            settings: config.dashboard.clone(),
            timezone,
            source,
            logger: get_logger("dashboard"),
            snapshot_tx,
            commands_rx,
            last_fetch: None,
            refresh_count: 0,
        };
        let handle = DashboardHandle {
            snapshot_rx,
            commands_tx,
        };
        Ok((refresher, handle))
    }

    pub fn last_fetch(&self) -> Option<&LastFetch> {
        self.last_fetch.as_ref()
    }

    /// Run one cycle against the wall clock
    pub async fn refresh_once(&mut self) -> Arc<DashboardSnapshot> {
        let now = Utc::now().with_timezone(&self.timezone);
        self.refresh_at(now).await
    }

    /// Run one cycle as if the current time were `now`
    pub async fn refresh_at(&mut self, now: DateTime<Tz>) -> Arc<DashboardSnapshot> {
        self.refresh_count += 1;
        let logger = self.logger.for_refresh(self.refresh_count);

        let error = match self.source.fetch_latest(now).await {
            Ok(feed) => {
                logger.info(&format!(
                    "Refresh succeeded: {} points ({} records)",
                    feed.series.len(),
                    feed.total_records
                ));
                self.last_fetch = Some(LastFetch {
                    feed,
                    fetched_at: now,
                });
                None
            }
            Err(e) => {
                let kept = self
                    .last_fetch
                    .as_ref()
                    .map_or(0, |l| l.feed.series.len());
                logger.warn(&format!(
                    "Refresh failed: {}; keeping {} previous points",
                    e, kept
                ));
                Some(format!("Error fetching data: {}", e))
            }
        };

        let snapshot = Arc::new(build_snapshot(
            self.last_fetch.as_ref(),
            &now,
            &self.settings,
            self.refresh_count,
            error,
        ));
        self.snapshot_tx.send_replace(Some(snapshot.clone()));
        snapshot
    }

    /// Refresh on the configured interval until every handle is dropped.
    ///
    /// The first cycle runs immediately. A `RefreshNow` command runs a cycle
    /// and restarts the interval.
    pub async fn run(mut self) {
        let period = Duration::from_secs(self.settings.refresh_interval_secs);
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut commands_open = true;

        self.logger.info(&format!(
            "Dashboard refresher started; interval={}s",
            self.settings.refresh_interval_secs
        ));

        loop {
            if self.snapshot_tx.is_closed() {
                self.logger.info("No snapshot readers left; refresher stopping");
                break;
            }

            tokio::select! {
                biased;
                _ = ticker.tick() => {
                    self.refresh_once().await;
                }
                cmd = self.commands_rx.recv(), if commands_open => match cmd {
                    Some(DashboardCommand::RefreshNow) => {
                        self.logger.info("Manual refresh requested");
                        self.refresh_once().await;
                        ticker.reset();
                    }
                    None => commands_open = false,
                },
            }
        }
    }
}
