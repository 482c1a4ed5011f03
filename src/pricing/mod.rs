//! ComEd hourly pricing feed: fetching, decoding and aggregation
//!
//! `client` talks HTTP, `parse` turns the body into a [`PriceSeries`], and
//! `aggregate` groups a series into hourly or weekly averages.

pub mod aggregate;
pub mod client;
pub mod parse;
pub mod types;

pub use aggregate::{aggregate, points_in, recent, stats, week_windows};
pub use client::{ComedClient, FetchedFeed, PriceSource, build_feed_url};
pub use parse::{ParseOptions, ParsedFeed, parse_feed, parse_timestamp};
pub use types::{AggregateBucket, Granularity, PricePoint, PriceSeries, PriceStats, WeekWindow};
