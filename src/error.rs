//! Error types for purge operations.

use thiserror::Error;

/// Errors from talking to the Cloudflare purge API or loading configuration.
///
/// Purge operations never return these directly; each call's error is
/// carried in its [`crate::report::PurgeOutcome`] so callers decide whether
/// a failed purge matters.
#[derive(Debug, Error)]
pub enum PurgeError {
    /// The request never completed: connect failure, timeout, TLS, body I/O.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Cloudflare answered but refused the call.
    #[error("Cloudflare API error ({status}): {message}")]
    Api {
        status: reqwest::StatusCode,
        message: String,
    },

    /// Invalid or unreadable configuration.
    #[error("configuration error: {0}")]
    Config(String),
}
