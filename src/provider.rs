//! Cache-provider adapter.
//!
//! The host CMS talks to its CDN through a generic cache-provider
//! interface; this module adapts that contract onto the purge client. The
//! flush operations are fire-and-forget: the client has already logged any
//! failed calls, and a stale edge cache must not break the content
//! operation that triggered the flush.

use async_trait::async_trait;
use tracing::debug;

use crate::client::PurgeClient;

/// Contract the host system's cache layer programs against.
#[async_trait]
pub trait CacheProvider: Send + Sync {
    /// Whether the provider is configured and able to purge.
    fn is_active(&self) -> bool;

    /// Invalidate the given URLs at the edge.
    async fn flush_cache_for_urls(&self, urls: &[String]);

    /// Invalidate everything in every configured zone.
    async fn flush_all_urls(&self);

    /// Whether responses for this host may be marked as cached, i.e. the
    /// host is one of the configured domains.
    fn should_request_be_marked_as_cached(&self, host: &str) -> bool;
}

/// Adapter wiring the cache-provider contract to the Cloudflare client.
pub struct CloudflareProvider {
    client: PurgeClient,
}

impl CloudflareProvider {
    pub fn new(client: PurgeClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl CacheProvider for CloudflareProvider {
    fn is_active(&self) -> bool {
        self.client.is_active()
    }

    async fn flush_cache_for_urls(&self, urls: &[String]) {
        let report = self.client.purge_urls(urls).await;
        debug!(
            attempted = report.attempted(),
            failed = report.failures().count(),
            "flushed edge cache for URLs"
        );
    }

    async fn flush_all_urls(&self) {
        let report = self.client.purge_everything().await;
        debug!(
            attempted = report.attempted(),
            failed = report.failures().count(),
            "flushed edge cache for all zones"
        );
    }

    fn should_request_be_marked_as_cached(&self, host: &str) -> bool {
        self.client.zones().contains(host)
    }
}
