//! Purge agent configuration.
//!
//! The API token, the domain → zone mapping, and the API endpoint are
//! carried in an explicit [`PurgeConfig`] value injected into the client at
//! construction time, instead of being read from ambient process globals at
//! every call site.

use std::env;
use std::fs;
use std::path::Path;

use url::Url;

use crate::error::PurgeError;

/// Environment variable holding the Cloudflare API bearer token.
/// Its presence is the sole activation signal.
pub const API_TOKEN_VAR: &str = "CLOUDFLARE_API_TOKEN";

/// Environment variable holding the domain → zone id mapping as inline JSON.
pub const ZONES_VAR: &str = "CLOUDFLARE_ZONES";

/// Environment variable pointing at a JSON file with the same mapping.
pub const ZONES_FILE_VAR: &str = "CLOUDFLARE_ZONES_FILE";

/// Cloudflare accepts at most 30 URLs per purge_cache call.
pub const DEFAULT_CHUNK_SIZE: usize = 30;

const DEFAULT_API_BASE: &str = "https://api.cloudflare.com/client/v4/";

/// One configured domain and the zone that owns it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneEntry {
    pub domain: String,
    pub zone_id: String,
}

/// Ordered mapping of configured domains to Cloudflare zone ids.
///
/// Multiple domains may point at distinct zones (or share one), but no two
/// entries may share a domain. Iteration order is configuration order.
#[derive(Debug, Clone, Default)]
pub struct ZoneRegistry {
    entries: Vec<ZoneEntry>,
}

impl ZoneRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from `(domain, zone id)` pairs, keeping order.
    ///
    /// Domains are lowercased and stripped of a leading dot before they are
    /// stored; a repeated domain is a configuration error.
    pub fn from_pairs<I, S, Z>(pairs: I) -> Result<Self, PurgeError>
    where
        I: IntoIterator<Item = (S, Z)>,
        S: Into<String>,
        Z: Into<String>,
    {
        let mut entries: Vec<ZoneEntry> = Vec::new();
        for (domain, zone_id) in pairs {
            let domain = domain
                .into()
                .trim()
                .trim_start_matches('.')
                .to_ascii_lowercase();
            if domain.is_empty() {
                return Err(PurgeError::Config("empty domain in zone mapping".into()));
            }
            if entries.iter().any(|entry| entry.domain == domain) {
                return Err(PurgeError::Config(format!(
                    "duplicate domain in zone mapping: {domain}"
                )));
            }
            entries.push(ZoneEntry {
                domain,
                zone_id: zone_id.into(),
            });
        }
        Ok(Self { entries })
    }

    /// Parse a JSON object of the form `{"example.com": "zone-id", ...}`.
    pub fn from_json(json: &str) -> Result<Self, PurgeError> {
        let map: serde_json::Map<String, serde_json::Value> = serde_json::from_str(json)
            .map_err(|e| PurgeError::Config(format!("invalid zone mapping JSON: {e}")))?;
        let mut pairs = Vec::with_capacity(map.len());
        for (domain, value) in map {
            let zone_id = value.as_str().ok_or_else(|| {
                PurgeError::Config(format!("zone id for {domain} must be a string"))
            })?;
            pairs.push((domain, zone_id.to_string()));
        }
        Self::from_pairs(pairs)
    }

    /// Load the mapping from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self, PurgeError> {
        let json = fs::read_to_string(path)
            .map_err(|e| PurgeError::Config(format!("could not read {}: {e}", path.display())))?;
        Self::from_json(&json)
    }

    /// Whether the given host is one of the configured domains (exact match).
    pub fn contains(&self, host: &str) -> bool {
        let host = host.to_ascii_lowercase();
        self.entries.iter().any(|entry| entry.domain == host)
    }

    pub fn entries(&self) -> impl Iterator<Item = &ZoneEntry> + '_ {
        self.entries.iter()
    }

    /// Distinct zone ids in configuration order.
    pub fn zone_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = Vec::new();
        for entry in &self.entries {
            if !ids.contains(&entry.zone_id.as_str()) {
                ids.push(&entry.zone_id);
            }
        }
        ids
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Everything the purge client needs, injected explicitly.
#[derive(Debug, Clone)]
pub struct PurgeConfig {
    /// Bearer token for the Cloudflare API. `None` (or empty) means the
    /// agent is inactive and every purge operation becomes a no-op.
    pub api_token: Option<String>,
    /// Domain → zone mapping used to route URL purges.
    pub zones: ZoneRegistry,
    /// API base endpoint; only tests and self-hosted gateways override it.
    pub api_base: Url,
    /// Maximum URLs per purge_cache call.
    pub chunk_size: usize,
}

impl PurgeConfig {
    pub fn new(api_token: Option<String>, zones: ZoneRegistry) -> Self {
        Self {
            api_token,
            zones,
            api_base: Url::parse(DEFAULT_API_BASE).expect("default API base URL is valid"),
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    /// Read the token and zone mapping from the process environment.
    ///
    /// A missing token is not an error: the agent just stays inactive, so
    /// environments without CDN configuration work without guards.
    pub fn from_env() -> Result<Self, PurgeError> {
        let api_token = env::var(API_TOKEN_VAR)
            .ok()
            .filter(|token| !token.trim().is_empty());
        let zones = if let Ok(json) = env::var(ZONES_VAR) {
            ZoneRegistry::from_json(&json)?
        } else if let Ok(path) = env::var(ZONES_FILE_VAR) {
            ZoneRegistry::from_file(Path::new(&path))?
        } else {
            ZoneRegistry::new()
        };
        Ok(Self::new(api_token, zones))
    }

    /// Point the client at a different API endpoint (e.g. a mock server).
    pub fn with_api_base(mut self, api_base: Url) -> Self {
        self.api_base = api_base;
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// True iff a non-empty API token is configured.
    pub fn is_active(&self) -> bool {
        self.api_token
            .as_deref()
            .is_some_and(|token| !token.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_json_preserves_order() {
        let registry =
            ZoneRegistry::from_json(r#"{"zeta.com": "Z1", "alpha.com": "Z2", "mid.com": "Z3"}"#)
                .unwrap();
        let domains: Vec<&str> = registry.entries().map(|e| e.domain.as_str()).collect();
        assert_eq!(domains, ["zeta.com", "alpha.com", "mid.com"]);
    }

    #[test]
    fn duplicate_domain_is_rejected() {
        let result = ZoneRegistry::from_pairs([("Example.com", "Z1"), ("example.com", "Z2")]);
        assert!(matches!(result, Err(PurgeError::Config(_))));
    }

    #[test]
    fn zone_id_must_be_a_string() {
        let result = ZoneRegistry::from_json(r#"{"example.com": 42}"#);
        assert!(matches!(result, Err(PurgeError::Config(_))));
    }

    #[test]
    fn contains_is_an_exact_host_match() {
        let registry = ZoneRegistry::from_pairs([("example.com", "Z1")]).unwrap();
        assert!(registry.contains("example.com"));
        assert!(registry.contains("EXAMPLE.com"));
        assert!(!registry.contains("www.example.com"));
        assert!(!registry.contains("other.com"));
    }

    #[test]
    fn zone_ids_deduplicate_in_order() {
        let registry = ZoneRegistry::from_pairs([
            ("example.com", "Z1"),
            ("example.org", "Z2"),
            ("www.example.com", "Z1"),
        ])
        .unwrap();
        assert_eq!(registry.zone_ids(), ["Z1", "Z2"]);
    }

    #[test]
    fn missing_or_blank_token_is_inactive() {
        assert!(!PurgeConfig::new(None, ZoneRegistry::new()).is_active());
        assert!(!PurgeConfig::new(Some("   ".into()), ZoneRegistry::new()).is_active());
        assert!(PurgeConfig::new(Some("token".into()), ZoneRegistry::new()).is_active());
    }

    #[test]
    fn chunk_size_never_drops_to_zero() {
        let config = PurgeConfig::new(None, ZoneRegistry::new()).with_chunk_size(0);
        assert_eq!(config.chunk_size, 1);
    }
}
