//! Cloudflare CDN purge agent.
//!
//! Purges cached content at the Cloudflare edge on behalf of an origin
//! content-management system: single URLs, URL batches routed to their
//! owning zones, whole zones, or every configured zone. Purging is
//! best-effort by design: a failed provider call is logged and recorded
//! in the returned report, never raised into the content operation that
//! triggered it.

pub mod client;
pub mod config;
pub mod error;
pub mod provider;
pub mod report;
pub mod routing;

pub use client::{PurgeClient, PurgeRequest};
pub use config::{PurgeConfig, ZoneRegistry};
pub use error::PurgeError;
pub use provider::{CacheProvider, CloudflareProvider};
pub use report::{PurgeOutcome, PurgeReport, PurgeTarget};
