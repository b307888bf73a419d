use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

use weblog_geo::analytics::{HostResolver, LogAggregator, RangeCountryIndex, Report};
use weblog_geo::config::{self, Config};
use weblog_geo::source::AccessLog;

#[derive(Parser)]
#[command(name = "weblog-geo")]
#[command(about = "Request counts per host and country for a web access log", long_about = None)]
struct Cli {
    /// IP range CSV (overrides WEBLOG_RANGES_PATH)
    #[arg(long)]
    ranges: Option<PathBuf>,

    /// Access log, plain or .gz (overrides WEBLOG_LOG_PATH)
    #[arg(long)]
    log: Option<PathBuf>,

    /// Window start, RFC 3339 or YYYY-MM-DD (overrides WEBLOG_WINDOW_FROM)
    #[arg(long)]
    from: Option<String>,

    /// Window end, exclusive (overrides WEBLOG_WINDOW_TO)
    #[arg(long)]
    to: Option<String>,

    /// Number of hosts to rank
    #[arg(long)]
    top_hosts: Option<usize>,

    /// Number of countries to rank
    #[arg(long)]
    top_countries: Option<usize>,

    /// Skip malformed log lines instead of aborting
    #[arg(long)]
    lenient: bool,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,
}

impl Cli {
    fn apply(&self, config: &mut Config) -> Result<()> {
        if let Some(ref path) = self.ranges {
            config.input.ranges_path = path.clone();
        }
        if let Some(ref path) = self.log {
            config.input.log_path = path.clone();
        }

        let from = match self.from {
            Some(ref raw) => config::parse_utc(raw).context("Invalid --from")?,
            None => config.window.from,
        };
        let to = match self.to {
            Some(ref raw) => config::parse_utc(raw).context("Invalid --to")?,
            None => config.window.to,
        };
        config.window = config::checked_window(from, to)?;

        if let Some(n) = self.top_hosts {
            config.report.top_hosts = n;
        }
        if let Some(n) = self.top_countries {
            config.report.top_countries = n;
        }
        if self.lenient {
            config.pipeline.lenient = true;
        }

        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so the report on stdout stays machine-readable
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = Config::from_env()?;
    cli.apply(&mut config)?;
    info!("Loaded configuration");

    let index = RangeCountryIndex::from_csv(&config.input.ranges_path).with_context(|| {
        format!(
            "Failed to build IP range index from {}",
            config.input.ranges_path.display()
        )
    })?;

    let resolver = HostResolver::system(config.resolver.max_cache_entries);

    let log = AccessLog::open(&config.input.log_path).with_context(|| {
        format!(
            "Failed to open access log {}",
            config.input.log_path.display()
        )
    })?;
    info!("Reading access log from {}", config.input.log_path.display());

    let aggregator = LogAggregator::new(&index, &resolver, config.pipeline_options());
    let aggregates = aggregator.run(log).await?;

    let report = Report::new(
        &aggregates,
        config.window,
        config.report.top_hosts,
        config.report.top_countries,
    );

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{report}");
    }

    Ok(())
}
