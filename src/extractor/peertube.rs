//! PeerTube instance provider.
//!
//! API: `<scheme>://<host>/api/v1/videos/<id>`. Progressive files come from
//! `files`; the first entry of `streamingPlaylists` is an HLS master that is
//! fetched and expanded into adaptive streams.
//!
//! URIs may use the `peertube://` scheme to force matching on hosts that are
//! not configured; such URIs are fetched over HTTPS.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};
use url::Url;

use super::{parse_json, Extractor};
use crate::config::Config;
use crate::error::{ResolveError, Result};
use crate::hls;
use crate::http_client::Transport;
use crate::model::{MediaInfo, MimeType, StreamDescriptor};
use crate::uri;

const SCHEME: &str = "peertube";
const ID_PATHS: &[&str] = &["/videos/watch/", "/w/"];

/// Extractor for PeerTube instances.
#[derive(Debug, Clone, Default)]
pub struct PeertubeExtractor {
    hosts: Vec<String>,
}

impl PeertubeExtractor {
    pub fn from_config(config: &Config) -> Self {
        Self {
            hosts: config.hosts.peertube.clone(),
        }
    }

    pub fn matches(&self, url: &Url) -> bool {
        let known = url.scheme() == SCHEME
            || (matches!(url.scheme(), "http" | "https") && uri::matches_hosts(url, &self.hosts));
        known && uri::id_from_paths(url, ID_PATHS).is_some()
    }
}

/// Plain `http` stays plain; `https` and `peertube` use TLS.
fn api_url(url: &Url, id: &str) -> Result<Url> {
    let scheme = if url.scheme() == "http" { "http" } else { "https" };
    let host = url
        .host_str()
        .ok_or_else(|| ResolveError::InvalidUri(format!("missing host in {url}")))?;
    let authority = match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    };
    debug!(secure = scheme == "https", "Using scheme");

    Ok(Url::parse(&format!("{scheme}://{authority}/api/v1/videos/{id}"))?)
}

#[async_trait]
impl Extractor for PeertubeExtractor {
    fn name(&self) -> &'static str {
        "peertube"
    }

    async fn extract(&self, url: &Url, transport: &dyn Transport) -> Result<MediaInfo> {
        let id = uri::id_from_paths(url, ID_PATHS)
            .ok_or_else(|| ResolveError::UnsupportedContent(format!("no video id in {url}")))?;
        debug!(host = url.host_str(), id = %id, "Requested video");

        let api_url = api_url(url, &id)?;
        let body = transport.get_text(&api_url).await?;
        let video: VideoResponse = parse_json(&body, &api_url)?;

        let duration = video.duration.unwrap_or(0);
        let mut info = MediaInfo::builder()
            .id(video.id.map(|n| n.to_string()).unwrap_or(id))
            .title(video.name.unwrap_or_default())
            .description(video.description)
            .duration_seconds(f64::from(duration));

        for file in video.files {
            let Some(file_url) = file.file_url else {
                continue;
            };
            // Height doubles as the format id.
            let height = file.resolution.and_then(|r| r.id).unwrap_or(0);
            // Instances rarely report a bitrate; estimate it from the file size.
            let bitrate = match (file.bitrate, file.size, duration) {
                (Some(bitrate), _, _) if bitrate > 0 => bitrate,
                (_, Some(size), secs) if size > 0 && secs > 0 => {
                    size.saturating_mul(8) / u64::from(secs)
                }
                _ => 0,
            };

            info.push_stream(
                StreamDescriptor::new(file_url)
                    .with_itag(height)
                    .with_resolution(0, height, f64::from(file.fps.unwrap_or(0)))
                    .with_bitrate(bitrate)
                    .with_codecs("avc1", "mp4a")
                    .with_mime_type(MimeType::VideoMp4),
            );
        }

        if let Some(playlist_url) = video
            .streaming_playlists
            .into_iter()
            .find_map(|p| p.playlist_url)
        {
            let playlist_url = Url::parse(&playlist_url)?;
            match fetch_playlist(&playlist_url, transport).await {
                Ok(streams) => {
                    for stream in streams {
                        info.push_adaptive_stream(stream);
                    }
                }
                // Progressive files are still usable.
                Err(e) if info.stream_count() > 0 => {
                    warn!("Skipping unusable streaming playlist: {e}");
                }
                Err(e) => return Err(e),
            }
        }

        Ok(info.build())
    }
}

async fn fetch_playlist(url: &Url, transport: &dyn Transport) -> Result<Vec<StreamDescriptor>> {
    let body = transport.get_text(url).await?;
    Ok(hls::parse(&body, url)?.streams)
}

// Serde structures for PeerTube API responses

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoResponse {
    id: Option<u64>,
    name: Option<String>,
    description: Option<String>,
    duration: Option<u32>,
    #[serde(default)]
    files: Vec<RawFile>,
    #[serde(default)]
    streaming_playlists: Vec<RawPlaylist>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawFile {
    file_url: Option<String>,
    resolution: Option<RawResolution>,
    fps: Option<u32>,
    bitrate: Option<u64>,
    size: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct RawResolution {
    id: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPlaylist {
    playlist_url: Option<String>,
}
