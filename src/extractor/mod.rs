//! Site- and protocol-specific extractors.
//!
//! # Architecture
//!
//! - [`Extractor`]: async trait turning one URI into a [`MediaInfo`]
//! - [`crate::ExtractorRegistry`]: picks the extractor for a URI
//! - Built-ins: [`direct`] (plain media files and HLS/DASH manifests),
//!   [`piped`], [`invidious`] and [`peertube`]
//!
//! Extractors never touch the network directly. They receive a
//! [`Transport`] from the client, which keeps them testable against canned
//! responses.

pub mod direct;
pub mod invidious;
pub mod peertube;
pub mod piped;

use async_trait::async_trait;
use url::Url;

use crate::error::Result;
use crate::http_client::Transport;
use crate::model::MediaInfo;

pub use direct::DirectExtractor;
pub use invidious::InvidiousExtractor;
pub use peertube::PeertubeExtractor;
pub use piped::PipedExtractor;

/// Converts a site/protocol-specific media URI into normalized metadata.
#[async_trait]
pub trait Extractor: Send + Sync {
    /// Short lowercase extractor name (e.g., `"piped"`, `"direct"`).
    fn name(&self) -> &'static str;

    /// Resolve `uri`, fetching whatever the site needs through `transport`.
    ///
    /// # Errors
    ///
    /// [`crate::ResolveError::Network`], [`crate::ResolveError::Parse`] or
    /// [`crate::ResolveError::UnsupportedContent`].
    async fn extract(&self, uri: &Url, transport: &dyn Transport) -> Result<MediaInfo>;
}

/// Parse a JSON body, naming the source on failure.
pub(crate) fn parse_json<T: serde::de::DeserializeOwned>(body: &str, url: &Url) -> Result<T> {
    serde_json::from_str(body).map_err(|e| {
        crate::ResolveError::Parse(format!("unexpected response from {url}: {e}"))
    })
}
