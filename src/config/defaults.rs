use super::*;

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            base_url: "https://hourlypricing.comed.com/api".to_string(),
            lookback_days: 30,
            timeout_secs: 30,
            min_price: 0.0,
            max_price: 1000.0,
        }
    }
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            refresh_interval_secs: 300,
            // 12 hours of 5-minute prices
            recent_points: 144,
            weeks: 5,
            timezone: "America/Chicago".to_string(),
            reference_line: ReferenceLine::Average,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "INFO".to_string(),
            file: "/tmp/comed-dashboard.log".to_string(),
            backup_count: 5,
            console_output: true,
            json_format: false,
        }
    }
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8089,
            static_dir: "./webui".to_string(),
        }
    }
}
