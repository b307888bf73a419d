//! Top-N rankings over finished aggregates

use serde::Serialize;
use std::fmt;

use crate::analytics::models::{Aggregates, Tally, TimeWindow};

/// One line of a ranking
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RankEntry {
    pub name: String,
    pub count: u64,
}

impl RankEntry {
    pub fn new(name: impl Into<String>, count: u64) -> Self {
        Self {
            name: name.into(),
            count,
        }
    }
}

/// Highest counts first, at most `n` entries
///
/// The sort is stable over first-seen order, so equal counts keep the
/// order in which their keys first appeared.
pub fn top_n(tally: &Tally, n: usize) -> Vec<RankEntry> {
    let mut ranked: Vec<RankEntry> = tally
        .iter()
        .map(|(name, count)| RankEntry::new(name, count))
        .collect();

    ranked.sort_by(|a, b| b.count.cmp(&a.count));
    ranked.truncate(n);
    ranked
}

pub fn top_hosts(host_count_in_window: &Tally, n: usize) -> Vec<RankEntry> {
    top_n(host_count_in_window, n)
}

pub fn top_countries(country_count: &Tally, n: usize) -> Vec<RankEntry> {
    top_n(country_count, n)
}

/// Summary printed at the end of a run
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub total: u64,
    pub skipped: u64,
    pub window: TimeWindow,
    pub top_hosts: Vec<RankEntry>,
    pub top_countries: Vec<RankEntry>,
}

impl Report {
    pub fn new(
        aggregates: &Aggregates,
        window: TimeWindow,
        host_limit: usize,
        country_limit: usize,
    ) -> Self {
        Self {
            total: aggregates.total,
            skipped: aggregates.skipped,
            window,
            top_hosts: top_hosts(&aggregates.host_count_in_window, host_limit),
            top_countries: top_countries(&aggregates.country_count, country_limit),
        }
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Total number of HTTP requests: {}", self.total)?;
        if self.skipped > 0 {
            writeln!(f, "Skipped malformed lines: {}", self.skipped)?;
        }

        writeln!(
            f,
            "Top {} hosts from {} to {}:",
            self.top_hosts.len(),
            self.window.from.format("%Y-%m-%d %H:%M"),
            self.window.to.format("%Y-%m-%d %H:%M"),
        )?;
        for entry in &self.top_hosts {
            writeln!(f, "  {:<40} {}", entry.name, entry.count)?;
        }

        writeln!(f, "Top countries by requests (ZZ = unknown):")?;
        for entry in &self.top_countries {
            writeln!(f, "  {:<40} {}", entry.name, entry.count)?;
        }

        Ok(())
    }
}
