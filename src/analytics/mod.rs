//! Access log analytics
//!
//! This module resolves request hosts to countries and folds a log stream
//! into request counts:
//!
//! - `geoip`: range index answering IPv4 → country code
//! - `resolver`: memoized host name → IPv4 resolution
//! - `aggregator`: single-pass reduction of log records into counters
//! - `report`: top-N rankings of the finished counters

pub mod aggregator;
pub mod geoip;
pub mod models;
pub mod report;
pub mod resolver;

pub use aggregator::{LogAggregator, PipelineOptions};
pub use geoip::RangeCountryIndex;
pub use models::{Aggregates, IpRange, LogRecord, Tally, TimeWindow, UNKNOWN_COUNTRY};
pub use report::{RankEntry, Report};
pub use resolver::{HostResolver, NameService, SystemNameService};
