//! Resolution client.
//!
//! [`Client::fetch_media_info`] is the single entry point: validate the URI,
//! pick an extractor from the registry, run it under a deadline and a
//! cancellation token, then check the result against the model invariants.
//! The caller receives either a fully valid [`MediaInfo`] or a
//! [`ResolveError`], never a partial aggregate.
//!
//! # Example
//!
//! ```rust,no_run
//! use tuber::Client;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = Client::new()?;
//! let info = client.fetch_media_info("https://cdn.example.com/clip.mp4").await?;
//! println!("{} ({} streams)", info.title, info.stream_count());
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::config::Config;
use crate::error::{ResolveError, Result};
use crate::http_client::{HttpTransport, Transport};
use crate::model::MediaInfo;
use crate::registry::{self, ExtractorRegistry};

/// Length of a bare YouTube video id.
const YOUTUBE_ID_LEN: usize = 11;

/// Per-call options for [`Client::fetch_media_info_with`].
#[derive(Debug, Clone, Default)]
pub struct FetchOptions {
    /// Deadline for the whole extraction; the client default when `None`.
    pub timeout: Option<Duration>,
    /// Cancelling this token aborts the call with [`ResolveError::Cancelled`].
    pub cancel: CancellationToken,
}

impl FetchOptions {
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }
}

/// Resolves media URIs into [`MediaInfo`].
///
/// Cheap to clone; clones share the registry and transport.
#[derive(Clone)]
pub struct Client {
    registry: Arc<ExtractorRegistry>,
    transport: Arc<dyn Transport>,
    default_timeout: Duration,
}

impl Client {
    /// Client backed by the global registry and an HTTP transport configured
    /// from the user's config file.
    ///
    /// # Errors
    ///
    /// Fails if the HTTP client cannot be built.
    pub fn new() -> Result<Self> {
        let config = Config::load().unwrap_or_else(|e| {
            warn!("Ignoring unusable config: {e:#}");
            Config::default()
        });
        let transport = HttpTransport::from_config(&config)?;

        Ok(Self::with_parts(registry::global(), Arc::new(transport)).with_timeout(config.timeout()))
    }

    /// Client with its own built-in registry, configured from `config`.
    ///
    /// # Errors
    ///
    /// Fails if the HTTP client cannot be built.
    pub fn from_config(config: &Config) -> Result<Self> {
        let registry = Arc::new(ExtractorRegistry::with_builtins(config));
        let transport = Arc::new(HttpTransport::from_config(config)?);

        Ok(Self::with_parts(registry, transport).with_timeout(config.timeout()))
    }

    /// Client over an explicit registry and transport.
    pub fn with_parts(registry: Arc<ExtractorRegistry>, transport: Arc<dyn Transport>) -> Self {
        Self {
            registry,
            transport,
            default_timeout: Config::default().timeout(),
        }
    }

    /// Replace the default per-call deadline.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    pub fn registry(&self) -> &ExtractorRegistry {
        &self.registry
    }

    /// Resolve `uri` with the default timeout and no cancellation.
    ///
    /// # Errors
    ///
    /// Any [`ResolveError`]; see [`Client::fetch_media_info_with`].
    pub async fn fetch_media_info(&self, uri: &str) -> Result<MediaInfo> {
        self.fetch_media_info_with(uri, &FetchOptions::default()).await
    }

    /// Resolve `uri`.
    ///
    /// # Errors
    ///
    /// - [`ResolveError::InvalidUri`] for malformed input
    /// - [`ResolveError::NoExtractor`] when no extractor claims the URI
    /// - [`ResolveError::Cancelled`] when `options.cancel` fires
    /// - [`ResolveError::Network`] when the deadline passes
    /// - [`ResolveError::InvariantViolation`] for a malformed extractor result
    /// - whatever the extractor itself reports
    #[instrument(skip(self, options))]
    pub async fn fetch_media_info_with(&self, uri: &str, options: &FetchOptions) -> Result<MediaInfo> {
        let url = parse_uri(uri)?;

        if options.cancel.is_cancelled() {
            return Err(ResolveError::Cancelled);
        }

        let extractor = self.registry.find_for(&url)?;
        let name = extractor.name();
        let timeout = options.timeout.unwrap_or(self.default_timeout);
        info!(%url, extractor = name, "Resolving media info");

        let extraction = tokio::time::timeout(timeout, extractor.extract(&url, self.transport.as_ref()));

        let info = tokio::select! {
            biased;

            () = options.cancel.cancelled() => {
                debug!(extractor = name, "Resolution cancelled");
                return Err(ResolveError::Cancelled);
            }
            result = extraction => result.map_err(|_| {
                ResolveError::Network(format!(
                    "timed out after {:.1}s resolving {url}",
                    timeout.as_secs_f64()
                ))
            })??,
        };

        if let Err(e) = info.validate() {
            warn!(extractor = name, "Rejected media info: {e}");
            return Err(e);
        }

        info!(
            extractor = name,
            streams = info.streams.len(),
            adaptive_streams = info.adaptive_streams.len(),
            "Resolved media info"
        );
        Ok(info)
    }
}

/// Validate user input into a URL.
///
/// A bare 11-character YouTube id is expanded into a watch URL.
pub fn parse_uri(input: &str) -> Result<Url> {
    let input = input.trim();
    if input.is_empty() {
        return Err(ResolveError::InvalidUri("empty URI".into()));
    }

    if is_youtube_id(input) {
        debug!(id = input, "Treating input as a YouTube video id");
        return Ok(Url::parse(&format!("https://www.youtube.com/watch?v={input}"))?);
    }

    Url::parse(input).map_err(|e| ResolveError::InvalidUri(format!("{input}: {e}")))
}

fn is_youtube_id(s: &str) -> bool {
    s.len() == YOUTUBE_ID_LEN
        && s.bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use crate::extractor::stub::StubTransport;
    use crate::extractor::Extractor;
    use crate::model::StreamDescriptor;

    /// Returns a fixed aggregate, optionally after a delay.
    #[derive(Clone)]
    struct Fixed {
        info: MediaInfo,
        delay: Duration,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Extractor for Fixed {
        fn name(&self) -> &'static str {
            "fixed"
        }

        async fn extract(&self, _uri: &Url, _transport: &dyn Transport) -> Result<MediaInfo> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            Ok(self.info.clone())
        }
    }

    fn demo() -> MediaInfo {
        MediaInfo::builder()
            .title("Demo")
            .duration_seconds(120.5)
            .stream(
                StreamDescriptor::new("https://cdn/1.mp4")
                    .with_resolution(1920, 1080, 30.0)
                    .with_codecs("h264", "aac"),
            )
            .build()
    }

    fn client_with(info: MediaInfo, delay: Duration) -> (Client, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let extractor = Fixed {
            info,
            delay,
            calls: Arc::clone(&calls),
        };
        let registry = Arc::new(ExtractorRegistry::new());
        registry.register(
            "fixed",
            |u: &Url| u.host_str() == Some("example.com"),
            move || Box::new(extractor.clone()),
        );
        (Client::with_parts(registry, Arc::new(StubTransport::new())), calls)
    }

    #[tokio::test]
    async fn returns_extractor_result_unchanged() {
        let (client, _) = client_with(demo(), Duration::ZERO);
        let info = client.fetch_media_info("https://example.com/video/1").await.unwrap();
        assert_eq!(info, demo());
    }

    #[tokio::test]
    async fn repeated_calls_are_equal() {
        let (client, calls) = client_with(demo(), Duration::ZERO);
        let first = client.fetch_media_info("https://example.com/video/1").await.unwrap();
        let second = client.fetch_media_info("https://example.com/video/1").await.unwrap();
        assert_eq!(first, second);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn rejects_codec_pair_violation() {
        let mut broken = demo();
        broken.streams[0].audio_codec = None;
        let (client, _) = client_with(broken, Duration::ZERO);

        let err = client.fetch_media_info("https://example.com/video/1").await.unwrap_err();
        assert!(matches!(err, ResolveError::InvariantViolation(_)));
    }

    #[tokio::test]
    async fn unmatched_uri_never_runs_an_extractor() {
        let (client, calls) = client_with(demo(), Duration::ZERO);
        let err = client.fetch_media_info("https://other.org/video/1").await.unwrap_err();
        assert!(matches!(err, ResolveError::NoExtractor(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn malformed_uri_is_rejected() {
        let (client, _) = client_with(demo(), Duration::ZERO);
        for input in ["", "   ", "not a uri", "/relative/path"] {
            let err = client.fetch_media_info(input).await.unwrap_err();
            assert!(matches!(err, ResolveError::InvalidUri(_)), "{input:?}");
        }
    }

    #[tokio::test]
    async fn deadline_maps_to_network_error() {
        let (client, _) = client_with(demo(), Duration::from_secs(30));
        let options = FetchOptions::default().with_timeout(Duration::from_millis(20));

        let err = client
            .fetch_media_info_with("https://example.com/video/1", &options)
            .await
            .unwrap_err();
        assert!(matches!(err, ResolveError::Network(ref m) if m.contains("timed out")));
    }

    #[tokio::test]
    async fn cancellation_aborts_extraction() {
        let (client, calls) = client_with(demo(), Duration::from_secs(30));
        let token = CancellationToken::new();
        let options = FetchOptions::default().with_cancel(token.clone());

        let canceller = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            token.cancel();
        });

        let err = client
            .fetch_media_info_with("https://example.com/video/1", &options)
            .await
            .unwrap_err();
        canceller.await.unwrap();

        assert_eq!(err, ResolveError::Cancelled);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn pre_cancelled_token_fails_fast() {
        let (client, calls) = client_with(demo(), Duration::ZERO);
        let token = CancellationToken::new();
        token.cancel();

        let err = client
            .fetch_media_info_with(
                "https://example.com/video/1",
                &FetchOptions::default().with_cancel(token),
            )
            .await
            .unwrap_err();
        assert_eq!(err, ResolveError::Cancelled);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn bare_youtube_ids_become_watch_urls() {
        assert_eq!(
            parse_uri("dQw4w9WgXcQ").unwrap().as_str(),
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ"
        );
        assert!(parse_uri("dQw4w9WgXc").is_err());
        assert!(parse_uri("dQw4w9WgX!Q").is_err());
    }
}
