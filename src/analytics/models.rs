//! Data models for analytics

use chrono::{DateTime, FixedOffset, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Country code used when a host cannot be placed in any known range
pub const UNKNOWN_COUNTRY: &str = "ZZ";

/// A contiguous block of IPv4 addresses assigned to one country
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IpRange {
    /// First address of the block (inclusive)
    pub from_ip: u32,

    /// Last address of the block (inclusive)
    pub to_ip: u32,

    /// ISO country code (e.g., "US", "GB")
    pub country_code: String,

    /// Country name
    pub country_name: String,
}

impl IpRange {
    pub fn contains(&self, ip: u32) -> bool {
        self.from_ip <= ip && ip <= self.to_ip
    }
}

/// One parsed access log line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    /// Requesting host, either a hostname or an IP literal
    pub host: String,

    /// Request time with the offset written in the log
    pub timestamp: DateTime<FixedOffset>,
}

/// Half-open UTC interval `[from, to)` used for the per-host window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl TimeWindow {
    pub fn new(from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        Self { from, to }
    }

    /// Whether `timestamp` falls inside the window once converted to UTC
    pub fn contains(&self, timestamp: &DateTime<FixedOffset>) -> bool {
        let instant = timestamp.with_timezone(&Utc);
        self.from <= instant && instant < self.to
    }
}

impl Default for TimeWindow {
    /// 18th to 20th of August 1995, the window reported for the NASA traces
    fn default() -> Self {
        let midnight = |day| {
            Utc.with_ymd_and_hms(1995, 8, day, 0, 0, 0)
                .single()
                .unwrap_or_default()
        };

        Self::new(midnight(18), midnight(21))
    }
}

/// Counter keyed by string that remembers the order keys were first seen
///
/// Rankings are built from `iter()`, so ties between equal counts resolve
/// to the key that appeared first in the stream.
#[derive(Debug, Clone, Default)]
pub struct Tally {
    counts: HashMap<String, TallySlot>,
}

#[derive(Debug, Clone, Copy)]
struct TallySlot {
    count: u64,
    first_seen: usize,
}

impl Tally {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment(&mut self, key: &str) {
        if let Some(slot) = self.counts.get_mut(key) {
            slot.count += 1;
            return;
        }

        let first_seen = self.counts.len();
        self.counts.insert(
            key.to_string(),
            TallySlot {
                count: 1,
                first_seen,
            },
        );
    }

    pub fn get(&self, key: &str) -> u64 {
        self.counts.get(key).map(|slot| slot.count).unwrap_or(0)
    }

    /// Entries in first-seen order
    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> + '_ {
        let mut entries: Vec<_> = self.counts.iter().collect();
        entries.sort_unstable_by_key(|(_, slot)| slot.first_seen);
        entries
            .into_iter()
            .map(|(key, slot)| (key.as_str(), slot.count))
    }

    /// Sum of all counts
    pub fn sum(&self) -> u64 {
        self.counts.values().map(|slot| slot.count).sum()
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}

/// Final state of one aggregation run
#[derive(Debug, Clone, Default)]
pub struct Aggregates {
    /// Records folded into the counters
    pub total: u64,

    /// Malformed lines dropped in lenient mode (always 0 in strict mode)
    pub skipped: u64,

    /// Requests per host whose timestamp falls in the window
    pub host_count_in_window: Tally,

    /// Requests per country code over the whole stream
    pub country_count: Tally,
}
