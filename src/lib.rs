//! # ComEd pricing dashboard
//!
//! Pulls 5-minute electricity prices from ComEd's Hourly Pricing API,
//! aggregates them into hourly and weekly views, and serves the result to a
//! small browser dashboard that refreshes every five minutes.
//!
//! ## Architecture
//!
//! - `config`: YAML configuration with defaults and validation
//! - `logging`: Structured logging and tracing
//! - `pricing`: Feed client, payload decoding and aggregation
//! - `dashboard`: Auto-refresh loop and snapshot assembly
//! - `web`: HTTP server, JSON API and static UI

pub mod config;
pub mod dashboard;
pub mod error;
pub mod logging;
pub mod pricing;
pub mod web;

// Re-export commonly used types
pub use config::Config;
pub use dashboard::{DashboardHandle, DashboardRefresher, DashboardSnapshot};
pub use error::{DashboardError, FetchError, Result};
