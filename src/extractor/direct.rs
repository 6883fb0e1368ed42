//! Plain media files and manifests addressed by URL.
//!
//! - `.mp4` / `.webm`: one progressive stream, no fetch
//! - `.mpd`: one adaptive DASH stream pointing at the manifest
//! - `.m3u8`: fetched and expanded through [`crate::hls`]

use async_trait::async_trait;
use tracing::debug;
use url::Url;

use super::Extractor;
use crate::codecs::mime_type_from_extension;
use crate::error::{ResolveError, Result};
use crate::hls;
use crate::http_client::Transport;
use crate::model::{ManifestType, MediaInfo, StreamDescriptor};
use crate::uri;

const EXTENSIONS: &[&str] = &["m3u8", "mpd", "mp4", "webm"];

/// Extractor for direct media links.
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectExtractor;

impl DirectExtractor {
    /// Returns `true` for HTTP(S) URLs whose path ends in a known extension.
    pub fn matches(url: &Url) -> bool {
        matches!(url.scheme(), "http" | "https") && extension(url).is_some()
    }
}

fn extension(url: &Url) -> Option<String> {
    let (_, ext) = url.path().rsplit_once('.')?;
    let ext = ext.to_ascii_lowercase();
    EXTENSIONS.contains(&ext.as_str()).then_some(ext)
}

#[async_trait]
impl Extractor for DirectExtractor {
    fn name(&self) -> &'static str {
        "direct"
    }

    async fn extract(&self, url: &Url, transport: &dyn Transport) -> Result<MediaInfo> {
        let ext = extension(url)
            .ok_or_else(|| ResolveError::UnsupportedContent(format!("not a media file: {url}")))?;
        let title = uri::file_name(url).unwrap_or_else(|| url.to_string());
        let mut info = MediaInfo::builder().title(title);

        match ext.as_str() {
            "m3u8" => {
                let body = transport.get_text(url).await?;
                let playlist = hls::parse(&body, url)?;
                debug!(
                    master = playlist.is_master,
                    variants = playlist.streams.len(),
                    "Parsed HLS playlist"
                );
                info.set_duration_seconds(playlist.duration_seconds);
                for stream in playlist.streams {
                    info.push_adaptive_stream(stream);
                }
            }
            "mpd" => {
                info.push_adaptive_stream(
                    StreamDescriptor::new(url.as_str()).with_manifest_type(ManifestType::Dash),
                );
            }
            _ => {
                info.push_stream(
                    StreamDescriptor::new(url.as_str()).with_mime_type(mime_type_from_extension(&ext)),
                );
            }
        }

        Ok(info.build())
    }
}
