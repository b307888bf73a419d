//! Memoized host name resolution
//!
//! Access logs repeat the same few hosts many times, while a DNS round trip
//! costs far more than the rest of the per-record work. `HostResolver`
//! therefore keeps every answer, including failures, in a bounded Moka cache
//! that it owns outright.

use async_trait::async_trait;
use moka::future::Cache;
use std::io;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use tracing::debug;

/// Forward name lookup used by [`HostResolver`]
#[async_trait]
pub trait NameService: Send + Sync {
    /// Resolve `host` to its first IPv4 address
    ///
    /// `Ok(None)` means the name exists but has no IPv4 address.
    async fn resolve_ipv4(&self, host: &str) -> io::Result<Option<Ipv4Addr>>;
}

/// Name service backed by the operating system resolver
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemNameService;

#[async_trait]
impl NameService for SystemNameService {
    async fn resolve_ipv4(&self, host: &str) -> io::Result<Option<Ipv4Addr>> {
        if let Ok(addr) = host.parse::<Ipv4Addr>() {
            return Ok(Some(addr));
        }

        let addrs = tokio::net::lookup_host((host, 0)).await?;

        Ok(addrs
            .filter_map(|addr| match addr.ip() {
                IpAddr::V4(v4) => Some(v4),
                IpAddr::V6(_) => None,
            })
            .next())
    }
}

/// Caching wrapper around a [`NameService`]
pub struct HostResolver {
    /// Underlying name service
    names: Arc<dyn NameService>,
    /// Resolution cache; `None` records a failed lookup
    cache: Cache<String, Option<Ipv4Addr>>,
}

impl HostResolver {
    pub const DEFAULT_CAPACITY: u64 = 100_000;

    pub fn new(names: Arc<dyn NameService>, max_cache_entries: u64) -> Self {
        let cache = Cache::builder().max_capacity(max_cache_entries).build();

        Self { names, cache }
    }

    /// Resolver using the system DNS
    pub fn system(max_cache_entries: u64) -> Self {
        Self::new(Arc::new(SystemNameService), max_cache_entries)
    }

    /// Resolve `host`, hitting the name service at most once per cached host
    ///
    /// Failures are not errors: they come back as `None` and are cached, so
    /// a host that does not resolve is not retried during the run.
    /// Concurrent calls for the same host wait on a single lookup.
    pub async fn resolve(&self, host: &str) -> Option<Ipv4Addr> {
        self.cache
            .get_with(host.to_string(), async {
                match self.names.resolve_ipv4(host).await {
                    Ok(addr) => addr,
                    Err(e) => {
                        debug!("Failed to resolve host {}: {}", host, e);
                        None
                    }
                }
            })
            .await
    }
}
