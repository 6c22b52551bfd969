//! Error types for panelkit operations.
//!
//! This module defines the main error type [`PanelError`], which covers
//! transport failures raised by the shared request path and the registry
//! failures raised before any network call is made.
//!
//! Extraction misses are never errors: adapters fall back to alternate
//! selectors or default values. Cache I/O problems are never errors either;
//! the cache logs them and reports a miss.
//!
//! # Example
//!
//! ```rust
//! use panelkit_core::{PanelError, RegistryError};
//!
//! let err = PanelError::from(RegistryError::UnknownSource { id: "nope".into() });
//! assert_eq!(err.registry_kind(), Some("UnknownSourceError"));
//! ```

use thiserror::Error;

/// Main error type for scraping operations.
#[derive(Error, Debug)]
pub enum PanelError {
    /// HTTP request errors from reqwest, with the URL that was being fetched.
    ///
    /// Covers DNS failures, refused connections, TLS problems and body
    /// decoding failures.
    #[error("HTTP request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// Request timeout.
    ///
    /// Returned when an HTTP request exceeds the configured timeout duration.
    #[error("Request to {url} timed out after {timeout} seconds")]
    Timeout { url: String, timeout: u64 },

    /// The upstream answered with a non-2xx status.
    #[error("Request to {url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    /// Invalid URL provided.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Source resolution failed.
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

impl PanelError {
    /// Returns true for failures that happened on the wire.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Http { .. } | Self::Timeout { .. } | Self::Status { .. })
    }

    /// Name of the registry failure, if this is one.
    pub fn registry_kind(&self) -> Option<&'static str> {
        match self {
            Self::Registry(err) => Some(err.name()),
            _ => None,
        }
    }
}

/// Failures raised synchronously by the adapter registry.
///
/// Callers match on the variant or on [`RegistryError::name`]; the full set
/// of names is available as [`RegistryError::KINDS`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// The id is not present in the source catalog.
    #[error("Unknown source: {id}")]
    UnknownSource { id: String },

    /// The source is in the catalog but switched off.
    #[error("Source is disabled: {id}")]
    SourceDisabled { id: String },

    /// The source is enabled but no adapter is bound to it.
    #[error("Source has no adapter implementation: {id}")]
    SourceNotImplemented { id: String },
}

impl RegistryError {
    /// Every registry error name, in declaration order.
    pub const KINDS: [&'static str; 3] = ["UnknownSourceError", "SourceDisabledError", "SourceNotImplementedError"];

    /// Stable name of this failure kind.
    pub fn name(&self) -> &'static str {
        match self {
            Self::UnknownSource { .. } => Self::KINDS[0],
            Self::SourceDisabled { .. } => Self::KINDS[1],
            Self::SourceNotImplemented { .. } => Self::KINDS[2],
        }
    }

    /// The source id the failure refers to.
    pub fn source_id(&self) -> &str {
        match self {
            Self::UnknownSource { id } | Self::SourceDisabled { id } | Self::SourceNotImplemented { id } => id,
        }
    }
}

/// Result type alias for PanelError.
pub type Result<T> = std::result::Result<T, PanelError>;
