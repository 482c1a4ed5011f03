use crate::config::FeedConfig;
use crate::error::{FetchError, Result};
use crate::logging::{LogContext, StructuredLogger, get_logger_with_context};
use crate::pricing::parse::{ParseOptions, ParsedFeed, parse_feed};
use crate::pricing::types::PriceSeries;
use chrono::{DateTime, Duration};
use chrono_tz::Tz;
use reqwest::header::{ACCEPT, USER_AGENT};

/// A fetched and decoded feed window
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedFeed {
    pub series: PriceSeries,
    pub total_records: usize,
    pub source_url: String,
}

/// Anything that can produce the latest price series
#[async_trait::async_trait]
pub trait PriceSource: Send + Sync {
    /// Fetch the configured window ending at `now`
    async fn fetch_latest(&self, now: DateTime<Tz>) -> std::result::Result<FetchedFeed, FetchError>;
}

/// Build the 5-minute feed URL for a window.
///
/// The feed takes whole days: the start day from 00:00 and the end day
/// through 23:59, both in the caller's local dates.
pub fn build_feed_url(base_url: &str, start: &DateTime<Tz>, end: &DateTime<Tz>) -> String {
    format!(
        "{}?type=5minutefeed&datestart={}&dateend={}",
        base_url.trim_end_matches('?'),
        start.format("%Y%m%d0000"),
        end.format("%Y%m%d2359")
    )
}

/// ComEd hourly pricing API client
pub struct ComedClient {
    base_url: String,
    lookback_days: u32,
    options: ParseOptions,
    http: reqwest::Client,
    logger: StructuredLogger,
}

impl ComedClient {
    /// Create a client from the feed configuration
    pub fn new(cfg: &FeedConfig, timezone: Tz) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(cfg.timeout_secs))
            .build()?;
        Ok(Self {
            base_url: cfg.base_url.trim().to_string(),
            lookback_days: cfg.lookback_days,
            options: ParseOptions {
                timezone,
                min_price: cfg.min_price,
                max_price: cfg.max_price,
            },
            http,
            logger: get_logger_with_context(
                LogContext::new("feed").with_field("base_url", cfg.base_url.trim().to_string()),
            ),
        })
    }

    /// Feed URL for the lookback window ending at `now`
    pub fn latest_url(&self, now: &DateTime<Tz>) -> String {
        let start = *now - Duration::days(i64::from(self.lookback_days));
        build_feed_url(&self.base_url, &start, now)
    }

    /// Fetch and decode an explicit window
    pub async fn fetch_window(
        &self,
        start: &DateTime<Tz>,
        end: &DateTime<Tz>,
    ) -> std::result::Result<FetchedFeed, FetchError> {
        let url = build_feed_url(&self.base_url, start, end);
        self.fetch_url(url).await
    }

    async fn fetch_url(&self, url: String) -> std::result::Result<FetchedFeed, FetchError> {
        self.logger.debug(&format!("GET {}", url));

        let resp = self
            .http
            .get(&url)
            .header(ACCEPT, "application/json")
            .header(
                USER_AGENT,
                concat!("comed-dashboard/", env!("CARGO_PKG_VERSION")),
            )
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            self.logger
                .error(&format!("Pricing API error: {}", status));
            return Err(FetchError::Status {
                status: status.as_u16(),
            });
        }

        let body = resp.bytes().await?;
        self.logger
            .trace(&format!("Received {} bytes ({})", body.len(), status));
        let ParsedFeed {
            series,
            total_records,
        } = parse_feed(&body, &self.options)?;

        self.logger.info(&format!(
            "Fetched {} price points from {} records",
            series.len(),
            total_records
        ));

        Ok(FetchedFeed {
            series,
            total_records,
            source_url: url,
        })
    }
}

#[async_trait::async_trait]
impl PriceSource for ComedClient {
    async fn fetch_latest(&self, now: DateTime<Tz>) -> std::result::Result<FetchedFeed, FetchError> {
        self.fetch_url(self.latest_url(&now)).await
    }
}
