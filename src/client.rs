//! Cloudflare purge client.
//!
//! Owns one HTTP client per zone and turns purge requests into
//! `purge_cache` calls: URL purges are routed to their owning zones and
//! batched into provider-sized chunks, zone and global purges go straight
//! out. Sibling calls run concurrently and independently; a failed call is
//! logged and recorded in the report, never raised to the caller.

use std::time::Duration;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures::future::join_all;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};
use url::Url;

use crate::config::{PurgeConfig, ZoneRegistry};
use crate::error::PurgeError;
use crate::report::{PurgeOutcome, PurgeReport, PurgeTarget};
use crate::routing::group_urls_by_zones;

/// One caller-initiated invalidation intent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PurgeRequest {
    SingleUrl(String),
    UrlList(Vec<String>),
    ZoneEverything(String),
    AllZones,
}

#[derive(Debug, Serialize)]
struct PurgeFiles<'a> {
    files: &'a [String],
}

#[derive(Debug, Serialize)]
struct PurgeEverything {
    purge_everything: bool,
}

/// Cloudflare API response wrapper
#[derive(Debug, Deserialize)]
struct ApiResponse {
    success: bool,
    #[serde(default)]
    errors: Vec<ApiError>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    code: i32,
    message: String,
}

/// HTTP client bound to one zone's purge endpoint, with the bearer token
/// and content type baked into its default headers.
#[derive(Debug, Clone)]
struct ZoneClient {
    http: reqwest::Client,
    endpoint: Url,
}

/// Cloudflare purge client.
///
/// Construct once per process; per-zone HTTP clients are created lazily on
/// first use and reused for every later call.
pub struct PurgeClient {
    config: PurgeConfig,
    clients: DashMap<String, ZoneClient>,
}

impl PurgeClient {
    pub fn new(config: PurgeConfig) -> Self {
        Self {
            config,
            clients: DashMap::new(),
        }
    }

    /// Build a client from `CLOUDFLARE_API_TOKEN` and `CLOUDFLARE_ZONES`.
    pub fn from_env() -> Result<Self, PurgeError> {
        Ok(Self::new(PurgeConfig::from_env()?))
    }

    /// True iff an API token is configured. When inactive, every purge
    /// operation is a silent no-op, so call sites never need to guard.
    pub fn is_active(&self) -> bool {
        self.config.is_active()
    }

    /// The configured domain → zone mapping.
    pub fn zones(&self) -> &ZoneRegistry {
        &self.config.zones
    }

    /// Purge a single URL from the zone(s) that own it.
    pub async fn purge_url(&self, url: &str) -> PurgeReport {
        self.purge_urls(&[url.to_string()]).await
    }

    /// Purge a list of URLs, routed to their owning zones and batched into
    /// provider-sized chunks. URLs outside every configured zone are
    /// skipped.
    pub async fn purge_urls(&self, urls: &[String]) -> PurgeReport {
        if !self.is_active() {
            debug!("purge skipped: no API token configured");
            return PurgeReport::new();
        }
        let grouped = group_urls_by_zones(urls, &self.config.zones);
        let reports = join_all(
            grouped
                .iter()
                .map(|(zone_id, zone_urls)| self.purge_in_chunks(zone_id, zone_urls)),
        )
        .await;
        let mut report = PurgeReport::new();
        for zone_report in reports {
            report.extend(zone_report);
        }
        report
    }

    /// Purge everything cached for one zone.
    pub async fn purge_zone(&self, zone_id: &str) -> PurgeReport {
        if !self.is_active() {
            debug!("purge skipped: no API token configured");
            return PurgeReport::new();
        }
        let mut report = PurgeReport::new();
        report.push(self.purge_zone_everything(zone_id).await);
        report
    }

    /// Purge everything in every configured zone, independently.
    pub async fn purge_everything(&self) -> PurgeReport {
        if !self.is_active() {
            debug!("purge skipped: no API token configured");
            return PurgeReport::new();
        }
        let zone_ids = self.config.zones.zone_ids();
        join_all(
            zone_ids
                .into_iter()
                .map(|zone_id| self.purge_zone_everything(zone_id)),
        )
        .await
        .into_iter()
        .collect()
    }

    /// Dispatch one purge request to the matching operation.
    pub async fn dispatch(&self, request: PurgeRequest) -> PurgeReport {
        match request {
            PurgeRequest::SingleUrl(url) => self.purge_url(&url).await,
            PurgeRequest::UrlList(urls) => self.purge_urls(&urls).await,
            PurgeRequest::ZoneEverything(zone_id) => self.purge_zone(&zone_id).await,
            PurgeRequest::AllZones => self.purge_everything().await,
        }
    }

    /// Cloudflare only accepts a limited number of URLs per request, so a
    /// zone's list is purged in chunks. Chunks are independent: one failing
    /// call never stops the others.
    async fn purge_in_chunks(&self, zone_id: &str, urls: &[String]) -> PurgeReport {
        if urls.is_empty() {
            return PurgeReport::new();
        }
        join_all(
            urls.chunks(self.config.chunk_size)
                .map(|chunk| self.purge_files(zone_id, chunk)),
        )
        .await
        .into_iter()
        .collect()
    }

    async fn purge_files(&self, zone_id: &str, urls: &[String]) -> PurgeOutcome {
        debug!(zone = %zone_id, count = urls.len(), "purge_cache: files");
        let result = self.post_purge(zone_id, &PurgeFiles { files: urls }).await;
        if let Err(e) = &result {
            error!(zone = %zone_id, urls = ?urls, error = %e, "could not purge URLs via POST purge_cache");
        }
        PurgeOutcome {
            zone_id: zone_id.to_string(),
            target: PurgeTarget::Files(urls.to_vec()),
            result,
        }
    }

    async fn purge_zone_everything(&self, zone_id: &str) -> PurgeOutcome {
        debug!(zone = %zone_id, "purge_cache: purge_everything");
        let result = self
            .post_purge(zone_id, &PurgeEverything { purge_everything: true })
            .await;
        if let Err(e) = &result {
            error!(zone = %zone_id, error = %e, "could not purge zone via POST purge_cache");
        }
        PurgeOutcome {
            zone_id: zone_id.to_string(),
            target: PurgeTarget::Everything,
            result,
        }
    }

    async fn post_purge<B: Serialize>(&self, zone_id: &str, body: &B) -> Result<(), PurgeError> {
        let client = self.zone_client(zone_id)?;
        let response = client
            .http
            .post(client.endpoint.clone())
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(PurgeError::Api { status, message });
        }

        let envelope: ApiResponse = response.json().await?;
        if !envelope.success {
            let message = envelope
                .errors
                .iter()
                .map(|e| format!("{} ({})", e.message, e.code))
                .collect::<Vec<_>>()
                .join(", ");
            return Err(PurgeError::Api { status, message });
        }
        Ok(())
    }

    /// Get or lazily create the HTTP client for a zone. The entry API makes
    /// first use insert-if-absent, so concurrent callers never build two
    /// clients for the same zone.
    fn zone_client(&self, zone_id: &str) -> Result<ZoneClient, PurgeError> {
        match self.clients.entry(zone_id.to_string()) {
            Entry::Occupied(entry) => Ok(entry.get().clone()),
            Entry::Vacant(entry) => {
                let client = self.build_zone_client(zone_id)?;
                entry.insert(client.clone());
                Ok(client)
            }
        }
    }

    fn build_zone_client(&self, zone_id: &str) -> Result<ZoneClient, PurgeError> {
        let token = self.config.api_token.as_deref().unwrap_or_default();
        let mut auth = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|_| PurgeError::Config("API token is not a valid header value".into()))?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let http = reqwest::Client::builder()
            .user_agent(concat!("cloudflare-purge/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .timeout(Duration::from_secs(30))
            .build()?;

        let endpoint = self
            .config
            .api_base
            .join(&format!("zones/{zone_id}/purge_cache"))
            .map_err(|e| {
                PurgeError::Config(format!("invalid purge endpoint for zone {zone_id}: {e}"))
            })?;

        Ok(ZoneClient { http, endpoint })
    }
}
