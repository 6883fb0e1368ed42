//! HTTP transport used by extractors.
//!
//! Extractors never talk to `reqwest` directly; they receive a
//! [`Transport`] so the fetch layer can be swapped (tests use an in-memory
//! stub). [`HttpTransport`] is the production implementation:
//! - HTTP/2 with fallback to HTTP/1.1
//! - TLS 1.3 via rustls
//! - Brotli, Gzip, Deflate compression (auto-negotiated)
//! - Connection pooling with keep-alive
//! - Connect and per-request timeouts

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, instrument};
use url::Url;

use crate::config::Config;
use crate::error::{ResolveError, Result};

/// Fetch capability handed to extractors.
#[async_trait]
pub trait Transport: Send + Sync {
    /// GET `url` and return the response body as text.
    ///
    /// Non-success statuses are reported as [`ResolveError::Network`].
    async fn get_text(&self, url: &Url) -> Result<String>;
}

/// `reqwest`-backed [`Transport`].
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Create a transport with default settings.
    pub fn new() -> Result<Self> {
        Self::from_config(&Config::default())
    }

    /// Create a transport using the timeouts and user agent from `config`.
    pub fn from_config(config: &Config) -> Result<Self> {
        let client = Client::builder()
            // Don't assume HTTP/2 - let server negotiate
            .http2_adaptive_window(true)
            .pool_max_idle_per_host(4)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(60))
            .tcp_nodelay(true)
            .use_rustls_tls()
            .brotli(true)
            .gzip(true)
            .deflate(true)
            .user_agent(config.user_agent.as_str())
            .connect_timeout(config.connect_timeout())
            .timeout(config.timeout())
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()?;

        Ok(Self { client })
    }

    /// Get the underlying reqwest client
    #[must_use]
    pub fn inner(&self) -> &Client {
        &self.client
    }
}

#[async_trait]
impl Transport for HttpTransport {
    #[instrument(skip(self), fields(url = %url))]
    async fn get_text(&self, url: &Url) -> Result<String> {
        debug!("Sending request");
        let response = self.client.get(url.as_str()).send().await?;

        let status = response.status();
        debug!(status = %status, version = ?response.version(), "Response received");

        if !status.is_success() {
            return Err(ResolveError::Network(format!("{url} returned HTTP {status}")));
        }

        Ok(response.text().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_from_default_config() {
        assert!(HttpTransport::new().is_ok());
    }

    #[test]
    fn builds_with_custom_user_agent() {
        let config = Config {
            user_agent: "tuber-test/1.0".to_string(),
            timeout_secs: 3,
            ..Config::default()
        };
        let transport = HttpTransport::from_config(&config).unwrap();
        let request = transport.inner().get("https://example.com").build().unwrap();
        assert_eq!(request.url().as_str(), "https://example.com/");
    }

    #[tokio::test]
    async fn refused_connection_is_a_network_error() {
        let transport = HttpTransport::new().unwrap();
        // Port 9 (discard) on loopback is closed in test environments.
        let url = Url::parse("http://127.0.0.1:9/").unwrap();
        let err = transport.get_text(&url).await.unwrap_err();
        assert_eq!(err.kind(), "network");
    }
}
