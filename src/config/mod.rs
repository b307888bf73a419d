use anyhow::Context;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::analytics::{HostResolver, PipelineOptions, TimeWindow};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub input: InputConfig,
    pub window: TimeWindow,
    pub report: ReportConfig,
    pub resolver: ResolverConfig,
    pub pipeline: PipelineConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputConfig {
    /// IP2Location-style CSV of IPv4 ranges
    pub ranges_path: PathBuf,
    /// Access log, plain or gzip-compressed
    pub log_path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    pub top_hosts: usize,
    pub top_countries: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
    pub max_cache_entries: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub progress_interval: u64,
    /// Skip malformed log lines instead of failing the run
    pub lenient: bool,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from any key lookup (the process environment
    /// in production, a map in tests)
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let ranges_path = PathBuf::from(var("WEBLOG_RANGES_PATH", "IP2LOCATION-LITE-DB1.CSV"));
        let log_path = PathBuf::from(var("WEBLOG_LOG_PATH", "NASA_access_log_Aug95.gz"));

        let defaults = TimeWindow::default();
        let from = match lookup("WEBLOG_WINDOW_FROM") {
            Some(raw) => parse_utc(&raw).context("Invalid WEBLOG_WINDOW_FROM")?,
            None => defaults.from,
        };
        let to = match lookup("WEBLOG_WINDOW_TO") {
            Some(raw) => parse_utc(&raw).context("Invalid WEBLOG_WINDOW_TO")?,
            None => defaults.to,
        };
        let window = checked_window(from, to)?;

        let top_hosts = var("WEBLOG_TOP_HOSTS", "10")
            .parse::<usize>()
            .context("WEBLOG_TOP_HOSTS must be a non-negative integer")?;
        let top_countries = var("WEBLOG_TOP_COUNTRIES", "1")
            .parse::<usize>()
            .context("WEBLOG_TOP_COUNTRIES must be a non-negative integer")?;

        let max_cache_entries = match lookup("WEBLOG_DNS_CACHE_ENTRIES") {
            Some(raw) => raw
                .parse::<u64>()
                .context("WEBLOG_DNS_CACHE_ENTRIES must be a non-negative integer")?,
            None => HostResolver::DEFAULT_CAPACITY,
        };

        let progress_interval = match lookup("WEBLOG_PROGRESS_INTERVAL") {
            Some(raw) => raw
                .parse::<u64>()
                .context("WEBLOG_PROGRESS_INTERVAL must be a non-negative integer")?,
            None => PipelineOptions::default().progress_interval,
        };

        let lenient = lookup("WEBLOG_LENIENT")
            .map(|v| matches!(v.to_lowercase().as_str(), "true" | "1" | "yes"))
            .unwrap_or(false);

        Ok(Config {
            input: InputConfig {
                ranges_path,
                log_path,
            },
            window,
            report: ReportConfig {
                top_hosts,
                top_countries,
            },
            resolver: ResolverConfig { max_cache_entries },
            pipeline: PipelineConfig {
                progress_interval,
                lenient,
            },
        })
    }

    pub fn pipeline_options(&self) -> PipelineOptions {
        PipelineOptions {
            window: self.window,
            progress_interval: self.pipeline.progress_interval,
            lenient: self.pipeline.lenient,
        }
    }
}

/// Accept either RFC 3339 (`1995-08-18T00:00:00Z`) or a bare date, which
/// means midnight UTC
pub fn parse_utc(raw: &str) -> anyhow::Result<DateTime<Utc>> {
    let raw = raw.trim();

    if let Ok(instant) = DateTime::parse_from_rfc3339(raw) {
        return Ok(instant.with_timezone(&Utc));
    }

    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .with_context(|| format!("'{raw}' is neither RFC 3339 nor YYYY-MM-DD"))?;

    Ok(date.and_time(chrono::NaiveTime::MIN).and_utc())
}

/// Reject empty or inverted windows
pub fn checked_window(from: DateTime<Utc>, to: DateTime<Utc>) -> anyhow::Result<TimeWindow> {
    if from >= to {
        anyhow::bail!("Window start {from} must be before window end {to}");
    }
    Ok(TimeWindow::new(from, to))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> anyhow::Result<Config> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();

        assert_eq!(config.input.log_path, PathBuf::from("NASA_access_log_Aug95.gz"));
        assert_eq!(config.window, TimeWindow::default());
        assert_eq!(config.report.top_hosts, 10);
        assert_eq!(config.report.top_countries, 1);
        assert_eq!(config.resolver.max_cache_entries, 100_000);
        assert_eq!(config.pipeline.progress_interval, 10_000);
        assert!(!config.pipeline.lenient);
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("WEBLOG_LOG_PATH", "/data/access.log"),
            ("WEBLOG_WINDOW_FROM", "1995-08-01"),
            ("WEBLOG_WINDOW_TO", "1995-08-02T12:00:00+02:00"),
            ("WEBLOG_TOP_HOSTS", "3"),
            ("WEBLOG_LENIENT", "yes"),
        ])
        .unwrap();

        assert_eq!(config.input.log_path, PathBuf::from("/data/access.log"));
        assert_eq!(
            config.window.from,
            Utc.with_ymd_and_hms(1995, 8, 1, 0, 0, 0).unwrap()
        );
        assert_eq!(
            config.window.to,
            Utc.with_ymd_and_hms(1995, 8, 2, 10, 0, 0).unwrap()
        );
        assert_eq!(config.report.top_hosts, 3);
        assert!(config.pipeline.lenient);
        assert!(config.pipeline_options().lenient);
    }

    #[test]
    fn test_inverted_window_is_rejected() {
        let result = config_from(&[
            ("WEBLOG_WINDOW_FROM", "1995-08-21"),
            ("WEBLOG_WINDOW_TO", "1995-08-18"),
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_unparseable_numbers_are_rejected() {
        for key in [
            "WEBLOG_TOP_HOSTS",
            "WEBLOG_TOP_COUNTRIES",
            "WEBLOG_DNS_CACHE_ENTRIES",
            "WEBLOG_PROGRESS_INTERVAL",
        ] {
            let err = config_from(&[(key, "lots")]).unwrap_err();
            assert!(
                format!("{err:#}").contains(key),
                "{key} error should name the variable, got {err:#}"
            );
        }
    }

    #[test]
    fn test_numeric_overrides() {
        let config = config_from(&[
            ("WEBLOG_DNS_CACHE_ENTRIES", "500"),
            ("WEBLOG_PROGRESS_INTERVAL", "0"),
        ])
        .unwrap();

        assert_eq!(config.resolver.max_cache_entries, 500);
        assert_eq!(config.pipeline.progress_interval, 0);
    }

    #[test]
    fn test_bad_date_is_rejected() {
        let result = config_from(&[("WEBLOG_WINDOW_FROM", "18/Aug/1995")]);
        assert!(result.is_err());
    }
}
