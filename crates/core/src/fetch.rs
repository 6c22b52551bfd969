//! Shared, proxy-aware request path.
//!
//! Every adapter fetches through one [`HttpFetcher`]. Each request resolves
//! the current proxy settings, merges the default headers with the caller's
//! overrides, applies the fixed timeout and issues a GET. Failures carry the
//! URL and are propagated; deciding whether to degrade is the caller's job.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::{Deserialize, Deserializer, Serialize};
use url::Url;

use crate::store::KeyValueStore;
use crate::{PanelError, Result};

/// Store key under which the proxy settings are persisted.
pub const PROXY_SETTINGS_KEY: &str = "panelkit:proxy";

/// HTTP client configuration for fetching pages.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Request timeout in seconds.
    pub timeout: u64,
    /// User-Agent string.
    pub user_agent: String,
    /// Extra headers sent with every request.
    pub headers: Vec<(String, String)>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout: 15,
            user_agent: "Mozilla/5.0 (Linux; Android 13; Pixel 7) AppleWebKit/537.36 (KHTML, like Gecko) \
                         Chrome/120.0 Mobile Safari/537.36"
                .to_string(),
            headers: vec![
                (
                    "Accept".to_string(),
                    "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8".to_string(),
                ),
                ("Accept-Language".to_string(), "zh-CN,zh;q=0.9,en;q=0.8".to_string()),
            ],
        }
    }
}

impl FetchConfig {
    /// Defaults first, then `overrides`; a later header with the same name
    /// replaces an earlier one. Names or values that are not valid HTTP are
    /// skipped.
    pub fn merged_headers(&self, overrides: &[(&str, &str)]) -> HeaderMap {
        let defaults = self.headers.iter().map(|(name, value)| (name.as_str(), value.as_str()));
        let all = std::iter::once(("User-Agent", self.user_agent.as_str()))
            .chain(defaults)
            .chain(overrides.iter().copied());

        let mut headers = HeaderMap::new();
        for (name, value) in all {
            match (HeaderName::from_bytes(name.as_bytes()), HeaderValue::from_str(value)) {
                (Ok(name), Ok(value)) => {
                    headers.insert(name, value);
                }
                _ => tracing::debug!(header = name, "skipping invalid header"),
            }
        }
        headers
    }
}

/// Proxy protocol.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProxyKind {
    #[default]
    Http,
    Https,
    Socks5,
}

impl ProxyKind {
    fn scheme(self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Https => "https",
            Self::Socks5 => "socks5",
        }
    }
}

/// Proxy settings as provided by the transport-config collaborator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub host: String,
    /// Accepts either a JSON string or a number.
    #[serde(default, deserialize_with = "port_from_string_or_int")]
    pub port: String,
    #[serde(default, rename = "type")]
    pub kind: ProxyKind,
}

fn port_from_string_or_int<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Port {
        Number(u64),
        Text(String),
    }

    Ok(match Port::deserialize(deserializer)? {
        Port::Number(n) => n.to_string(),
        Port::Text(s) => s,
    })
}

impl ProxyConfig {
    /// Proxy URL, or `None` when the config is disabled or incomplete.
    pub fn proxy_url(&self) -> Option<String> {
        let host = self.host.trim();
        let port = self.port.trim();
        if !self.enabled || host.is_empty() || port.parse::<u16>().is_err() {
            return None;
        }
        Some(format!("{}://{}:{}", self.kind.scheme(), host, port))
    }
}

/// Transport-config collaborator, consulted on every request.
#[async_trait]
pub trait ProxySource: Send + Sync {
    async fn current(&self) -> Option<ProxyConfig>;
}

/// Always connects directly.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProxy;

#[async_trait]
impl ProxySource for NoProxy {
    async fn current(&self) -> Option<ProxyConfig> {
        None
    }
}

/// A fixed proxy configuration.
#[derive(Debug, Clone)]
pub struct StaticProxy(pub ProxyConfig);

#[async_trait]
impl ProxySource for StaticProxy {
    async fn current(&self) -> Option<ProxyConfig> {
        Some(self.0.clone())
    }
}

/// Reads the proxy settings from the key-value store on every request.
///
/// Missing or unreadable settings mean a direct connection.
pub struct StoredProxySettings {
    store: Arc<dyn KeyValueStore>,
}

impl StoredProxySettings {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Persists new settings.
    pub async fn save(&self, config: &ProxyConfig) -> std::result::Result<(), crate::store::StoreError> {
        let json = serde_json::to_string(config).map_err(|e| crate::store::StoreError::Data(e.to_string()))?;
        self.store.set(PROXY_SETTINGS_KEY, json).await
    }
}

#[async_trait]
impl ProxySource for StoredProxySettings {
    async fn current(&self) -> Option<ProxyConfig> {
        let raw = match self.store.get(PROXY_SETTINGS_KEY).await {
            Ok(raw) => raw?,
            Err(e) => {
                tracing::warn!(error = %e, "failed to read proxy settings, connecting directly");
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(config) => Some(config),
            Err(e) => {
                tracing::warn!(error = %e, "ignoring malformed proxy settings");
                None
            }
        }
    }
}

/// The shared request routine used by every adapter.
pub struct HttpFetcher {
    config: FetchConfig,
    proxy: Arc<dyn ProxySource>,
}

impl HttpFetcher {
    pub fn new(config: FetchConfig, proxy: Arc<dyn ProxySource>) -> Self {
        Self { config, proxy }
    }

    /// A fetcher with default settings and no proxy.
    pub fn direct() -> Self {
        Self::new(FetchConfig::default(), Arc::new(NoProxy))
    }

    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    /// Fetches `url` and returns the body as text.
    ///
    /// `headers` override the configured defaults for this call only.
    pub async fn get(&self, url: &str, headers: &[(&str, &str)]) -> Result<String> {
        let parsed = Url::parse(url).map_err(|e| PanelError::InvalidUrl(format!("{}: {}", url, e)))?;

        let mut builder = Client::builder().timeout(Duration::from_secs(self.config.timeout));
        builder = match self.proxy.current().await.as_ref().and_then(ProxyConfig::proxy_url) {
            Some(proxy_url) => match reqwest::Proxy::all(&proxy_url) {
                Ok(proxy) => {
                    tracing::debug!(proxy = %proxy_url, url, "routing request through proxy");
                    builder.proxy(proxy)
                }
                Err(e) => {
                    tracing::warn!(proxy = %proxy_url, error = %e, "unusable proxy, connecting directly");
                    builder.no_proxy()
                }
            },
            None => builder.no_proxy(),
        };

        let client = builder.build().map_err(|source| PanelError::Http { url: url.to_string(), source })?;

        let response = client
            .get(parsed)
            .headers(self.config.merged_headers(headers))
            .send()
            .await
            .map_err(|e| self.transport_error(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(PanelError::Status { url: url.to_string(), status: status.as_u16() });
        }

        response.text().await.map_err(|e| self.transport_error(url, e))
    }

    fn transport_error(&self, url: &str, source: reqwest::Error) -> PanelError {
        if source.is_timeout() {
            PanelError::Timeout { url: url.to_string(), timeout: self.config.timeout }
        } else {
            PanelError::Http { url: url.to_string(), source }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[test]
    fn test_fetch_config_default() {
        let config = FetchConfig::default();
        assert_eq!(config.timeout, 15);
        assert!(config.user_agent.contains("Mozilla"));
    }

    #[test]
    fn test_merged_headers_override() {
        let config = FetchConfig::default();
        let headers = config.merged_headers(&[("Referer", "https://example.com/"), ("Accept-Language", "en")]);

        assert_eq!(headers.get("referer").unwrap(), "https://example.com/");
        assert_eq!(headers.get("accept-language").unwrap(), "en");
        assert!(headers.get("user-agent").unwrap().to_str().unwrap().contains("Mozilla"));
    }

    #[test]
    fn test_merged_headers_skips_invalid() {
        let config = FetchConfig::default();
        let headers = config.merged_headers(&[("Bad Header", "x"), ("X-Ok", "line\nbreak")]);

        assert!(headers.get("x-ok").is_none());
        assert_eq!(headers.len(), 3);
    }

    #[test]
    fn test_proxy_url_requires_complete_config() {
        let mut config = ProxyConfig {
            enabled: true,
            host: "127.0.0.1".to_string(),
            port: "7890".to_string(),
            kind: ProxyKind::Socks5,
        };
        assert_eq!(config.proxy_url(), Some("socks5://127.0.0.1:7890".to_string()));

        config.enabled = false;
        assert_eq!(config.proxy_url(), None);

        config.enabled = true;
        config.port = String::new();
        assert_eq!(config.proxy_url(), None);

        config.port = "8080".to_string();
        config.host = "  ".to_string();
        assert_eq!(config.proxy_url(), None);
    }

    #[test]
    fn test_proxy_config_port_string_or_int() {
        let numeric: ProxyConfig =
            serde_json::from_str(r#"{"enabled":true,"host":"h","port":1080,"type":"socks5"}"#).unwrap();
        let text: ProxyConfig =
            serde_json::from_str(r#"{"enabled":true,"host":"h","port":"1080","type":"https"}"#).unwrap();

        assert_eq!(numeric.port, "1080");
        assert_eq!(numeric.kind, ProxyKind::Socks5);
        assert_eq!(text.port, "1080");
        assert_eq!(text.kind, ProxyKind::Https);
    }

    #[tokio::test]
    async fn test_stored_proxy_settings() {
        let store = Arc::new(MemoryStore::new());
        let settings = StoredProxySettings::new(store.clone());
        assert_eq!(settings.current().await, None);

        let config = ProxyConfig { enabled: true, host: "p".to_string(), port: "3128".to_string(), kind: ProxyKind::Http };
        settings.save(&config).await.unwrap();
        assert_eq!(settings.current().await, Some(config));

        store.set(PROXY_SETTINGS_KEY, "{not json".to_string()).await.unwrap();
        assert_eq!(settings.current().await, None);
    }

    #[tokio::test]
    async fn test_fetch_invalid_url() {
        let fetcher = HttpFetcher::direct();
        let result = fetcher.get("not-a-url", &[]).await;

        assert!(matches!(result, Err(PanelError::InvalidUrl(_))));
    }
}
