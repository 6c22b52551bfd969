//! Service configuration.

use crate::fetch::FetchConfig;
use crate::source::mangahaven;

/// Configuration for a [`ComicService`](crate::service::ComicService).
///
/// # Example
///
/// ```rust
/// use panelkit_core::PanelConfig;
///
/// let config = PanelConfig::builder()
///     .default_source("comicpark")
///     .timeout(30)
///     .header("Accept-Language", "en")
///     .build();
///
/// assert_eq!(config.default_source, "comicpark");
/// assert_eq!(config.fetch.timeout, 30);
/// ```
#[derive(Debug, Clone)]
pub struct PanelConfig {
    /// Source used when a call names none (default: `mangahaven`).
    pub default_source: String,

    /// Settings for the shared request path.
    pub fetch: FetchConfig,
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self { default_source: mangahaven::SOURCE_ID.to_string(), fetch: FetchConfig::default() }
    }
}

impl PanelConfig {
    /// Creates a new builder for PanelConfig.
    pub fn builder() -> PanelConfigBuilder {
        PanelConfigBuilder::new()
    }
}

/// Builder for PanelConfig.
pub struct PanelConfigBuilder {
    config: PanelConfig,
}

impl PanelConfigBuilder {
    /// Creates a new builder with default values.
    pub fn new() -> Self {
        Self { config: PanelConfig::default() }
    }

    /// Sets the default source id.
    pub fn default_source(mut self, id: impl Into<String>) -> Self {
        self.config.default_source = id.into();
        self
    }

    /// Sets the request timeout in seconds.
    pub fn timeout(mut self, seconds: u64) -> Self {
        self.config.fetch.timeout = seconds;
        self
    }

    /// Sets the User-Agent header.
    pub fn user_agent(mut self, value: impl Into<String>) -> Self {
        self.config.fetch.user_agent = value.into();
        self
    }

    /// Adds a default header, replacing an earlier one with the same name.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        self.config.fetch.headers.retain(|(existing, _)| !existing.eq_ignore_ascii_case(&name));
        self.config.fetch.headers.push((name, value.into()));
        self
    }

    /// Replaces the whole fetch configuration.
    pub fn fetch(mut self, fetch: FetchConfig) -> Self {
        self.config.fetch = fetch;
        self
    }

    /// Builds the config.
    pub fn build(self) -> PanelConfig {
        self.config
    }
}

impl Default for PanelConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
