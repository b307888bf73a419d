//! Streaming aggregation over parsed access log records
//!
//! The aggregator makes exactly one forward pass over the record iterator.
//! Nothing but the running counters is kept, so memory use depends on the
//! number of distinct hosts and countries, not on the size of the log.

use tracing::{info, warn};

use crate::analytics::geoip::RangeCountryIndex;
use crate::analytics::models::{Aggregates, LogRecord, TimeWindow, UNKNOWN_COUNTRY};
use crate::analytics::resolver::HostResolver;
use crate::error::{Error, Result};

/// Tunables for a single aggregation run
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Window counted into `host_count_in_window`
    pub window: TimeWindow,
    /// Log progress every this many records (0 disables it)
    pub progress_interval: u64,
    /// Skip malformed lines instead of aborting the run
    pub lenient: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            window: TimeWindow::default(),
            progress_interval: 10_000,
            lenient: false,
        }
    }
}

/// Folds log records into [`Aggregates`]
pub struct LogAggregator<'a> {
    index: &'a RangeCountryIndex,
    resolver: &'a HostResolver,
    options: PipelineOptions,
}

impl<'a> LogAggregator<'a> {
    pub fn new(
        index: &'a RangeCountryIndex,
        resolver: &'a HostResolver,
        options: PipelineOptions,
    ) -> Self {
        Self {
            index,
            resolver,
            options,
        }
    }

    /// Consume `records` in order and return the final counters
    ///
    /// A malformed record aborts the run unless lenient mode is on; any
    /// other error (e.g. I/O on the underlying log) always aborts.
    pub async fn run<I>(&self, records: I) -> Result<Aggregates>
    where
        I: IntoIterator<Item = Result<LogRecord>>,
    {
        let mut aggregates = Aggregates::default();

        for record in records {
            let record = match record {
                Ok(record) => record,
                Err(err @ Error::MalformedRecord { .. }) if self.options.lenient => {
                    warn!("Skipping {}", err);
                    aggregates.skipped += 1;
                    continue;
                }
                Err(err) => return Err(err),
            };

            let interval = self.options.progress_interval;
            if interval > 0 && aggregates.total % interval == 0 {
                info!("Processed {} records", aggregates.total);
            }

            self.fold(&mut aggregates, &record).await;
        }

        info!(
            total = aggregates.total,
            skipped = aggregates.skipped,
            hosts_in_window = aggregates.host_count_in_window.len(),
            countries = aggregates.country_count.len(),
            "Aggregation finished"
        );

        Ok(aggregates)
    }

    /// Country code for `host`; resolution failures and range misses both
    /// land in `ZZ`
    pub async fn country_of(&self, host: &str) -> &'a str {
        let country = match self.resolver.resolve(host).await {
            Some(ip) => self.index.lookup(ip),
            None => UNKNOWN_COUNTRY,
        };

        if country.is_empty() {
            UNKNOWN_COUNTRY
        } else {
            country
        }
    }

    async fn fold(&self, aggregates: &mut Aggregates, record: &LogRecord) {
        aggregates.total += 1;

        let country = self.country_of(&record.host).await;

        if self.options.window.contains(&record.timestamp) {
            aggregates.host_count_in_window.increment(&record.host);
        }

        aggregates.country_count.increment(country);
    }
}
