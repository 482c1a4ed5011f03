//! Configuration management
//!
//! Loads the dashboard configuration from YAML. Every section has defaults so
//! an empty or missing file yields a working setup against the public ComEd
//! feed.

use crate::error::{DashboardError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

mod defaults;

/// Environment variable that points at an explicit config file
pub const CONFIG_PATH_ENV: &str = "COMED_DASHBOARD_CONFIG";

/// Largest accepted `dashboard.weeks`
pub const MAX_WEEKS: usize = 52;
/// Largest accepted `feed.lookback_days`
pub const MAX_LOOKBACK_DAYS: u32 = 400;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(schemars::JsonSchema))]
#[serde(default)]
pub struct Config {
    /// Price feed connection settings
    pub feed: FeedConfig,

    /// Refresh cadence and view settings
    pub dashboard: DashboardConfig,

    /// Logging configuration
    pub logging: LoggingConfig,

    /// Web server binding configuration
    pub web: WebConfig,
}

/// ComEd hourly pricing feed settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(schemars::JsonSchema))]
#[serde(default)]
pub struct FeedConfig {
    /// API base URL; query parameters are appended per request
    pub base_url: String,

    /// How many days back each fetch requests
    pub lookback_days: u32,

    /// HTTP timeout in seconds
    pub timeout_secs: u64,

    /// Lowest accepted price in cents/kWh
    pub min_price: f64,

    /// Highest accepted price in cents/kWh
    pub max_price: f64,
}

/// Horizontal reference line drawn over price charts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(schemars::JsonSchema))]
#[serde(rename_all = "lowercase")]
pub enum ReferenceLine {
    None,
    Average,
    Median,
}

/// Dashboard view and refresh settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(schemars::JsonSchema))]
#[serde(default)]
pub struct DashboardConfig {
    /// Seconds between automatic refreshes
    pub refresh_interval_secs: u64,

    /// Number of most recent points shown in the recent activity chart
    pub recent_points: usize,

    /// Number of Sunday-aligned weeks in the weekly analysis
    pub weeks: usize,

    /// IANA timezone used for display and bucketing
    pub timezone: String,

    /// Reference line shown on charts
    pub reference_line: ReferenceLine,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(schemars::JsonSchema))]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    pub level: String,

    /// Path to log file; its parent directory receives the rolling files
    pub file: String,

    /// Number of rotated files to keep
    pub backup_count: u32,

    /// Whether to log to console
    pub console_output: bool,

    /// Whether to use JSON format
    pub json_format: bool,
}

/// Web server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(schemars::JsonSchema))]
#[serde(default)]
pub struct WebConfig {
    /// Bind address
    pub host: String,

    /// TCP port
    pub port: u16,

    /// Directory holding the static dashboard page
    pub static_dir: String,
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from the env override or the default locations
    pub fn load() -> Result<Self> {
        Self::load_from(Self::locate().as_deref())
    }

    /// Read `path` (defaults when `None`) and validate the result
    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => Config::default(),
        };
        config.validate()?;
        Ok(config)
    }

    /// First config file to use, if any
    fn locate() -> Option<PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV)
            && !path.trim().is_empty()
        {
            return Some(PathBuf::from(path.trim()));
        }

        ["comed_dashboard.yaml", "/etc/comed-dashboard/config.yaml"]
            .into_iter()
            .map(PathBuf::from)
            .find(|p| p.exists())
    }

    /// Save configuration to a YAML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    /// Resolve the configured display timezone
    pub fn timezone(&self) -> Result<chrono_tz::Tz> {
        self.dashboard.timezone.parse::<chrono_tz::Tz>().map_err(|_| {
            DashboardError::validation(
                "dashboard.timezone",
                format!("Unknown timezone '{}'", self.dashboard.timezone),
            )
        })
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.feed.base_url.trim().is_empty() {
            return Err(DashboardError::validation(
                "feed.base_url",
                "URL cannot be empty",
            ));
        }

        if self.feed.lookback_days == 0 || self.feed.lookback_days > MAX_LOOKBACK_DAYS {
            return Err(DashboardError::validation(
                "feed.lookback_days",
                format!("Must be between 1 and {}", MAX_LOOKBACK_DAYS),
            ));
        }

        if self.feed.timeout_secs == 0 {
            return Err(DashboardError::validation(
                "feed.timeout_secs",
                "Must be greater than 0",
            ));
        }

        if !(self.feed.min_price.is_finite() && self.feed.max_price.is_finite())
            || self.feed.min_price > self.feed.max_price
        {
            return Err(DashboardError::validation(
                "feed.min_price",
                "Price bounds must be finite with min <= max",
            ));
        }

        if self.dashboard.refresh_interval_secs == 0 {
            return Err(DashboardError::validation(
                "dashboard.refresh_interval_secs",
                "Must be greater than 0",
            ));
        }

        if self.dashboard.recent_points == 0 {
            return Err(DashboardError::validation(
                "dashboard.recent_points",
                "Must be greater than 0",
            ));
        }

        if self.dashboard.weeks == 0 || self.dashboard.weeks > MAX_WEEKS {
            return Err(DashboardError::validation(
                "dashboard.weeks",
                format!("Must be between 1 and {}", MAX_WEEKS),
            ));
        }

        // Weekly analysis is useless if the fetch window cannot reach it
        let needed_days = u32::try_from(self.dashboard.weeks - 1)
            .ok()
            .and_then(|w| w.checked_mul(7))
            .and_then(|d| d.checked_add(1))
            .ok_or_else(|| DashboardError::validation("dashboard.weeks", "Value is too large"))?;
        if self.feed.lookback_days < needed_days {
            return Err(DashboardError::validation(
                "feed.lookback_days",
                format!(
                    "Must cover at least {} days for {} weeks",
                    needed_days, self.dashboard.weeks
                ),
            ));
        }

        self.timezone()?;

        if self.web.port == 0 {
            return Err(DashboardError::validation(
                "web.port",
                "Port must be greater than 0",
            ));
        }

        Ok(())
    }
}
