//! Piped frontend provider.
//!
//! Piped has no fixed API path, so every site host needs a matching API
//! host. The default instance is hard-wired; for other instances the API host
//! is taken from the configured `piped_api` list by shared domain
//! (`piped.example.org` → `pipedapi.example.org`).
//!
//! API: `https://<api host>/streams/<video id>`

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};
use url::Url;

use super::{parse_json, Extractor};
use crate::codecs::mime_type_from_str;
use crate::config::Config;
use crate::error::{ResolveError, Result};
use crate::hls;
use crate::http_client::Transport;
use crate::model::{ByteRange, ManifestType, MediaInfo, MediaInfoBuilder, StreamDescriptor};
use crate::uri;

pub const DEFAULT_HOST: &str = "piped.kavin.rocks";
pub const DEFAULT_API_HOST: &str = "pipedapi.kavin.rocks";

/// Extractor for Piped instances.
#[derive(Debug, Clone)]
pub struct PipedExtractor {
    hosts: Vec<String>,
    api_hosts: Vec<String>,
}

impl Default for PipedExtractor {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl PipedExtractor {
    pub fn from_config(config: &Config) -> Self {
        let mut hosts = vec![DEFAULT_HOST.to_string()];
        hosts.extend(config.hosts.piped.iter().cloned());

        Self {
            hosts,
            api_hosts: config.hosts.piped_api.clone(),
        }
    }

    /// Returns `true` for a known instance host with a video id.
    pub fn matches(&self, url: &Url) -> bool {
        uri::matches_hosts(url, &self.hosts) && video_id(url).is_some()
    }

    fn api_host(&self, url: &Url) -> Option<&str> {
        let host = uri::parsed_host(url)?;
        if host.eq_ignore_ascii_case(DEFAULT_HOST) {
            debug!("Using default API endpoint");
            return Some(DEFAULT_API_HOST);
        }

        let site_domain = uri::domain(host);
        let api = self
            .api_hosts
            .iter()
            .find(|api| api.ends_with(site_domain))
            .map(String::as_str);
        debug!(?api, "Resolved API endpoint");
        api
    }
}

fn video_id(url: &Url) -> Option<String> {
    uri::query_value(url, "v").or_else(|| uri::id_from_paths(url, &["/v/"]))
}

#[async_trait]
impl Extractor for PipedExtractor {
    fn name(&self) -> &'static str {
        "piped"
    }

    async fn extract(&self, url: &Url, transport: &dyn Transport) -> Result<MediaInfo> {
        let id = video_id(url)
            .ok_or_else(|| ResolveError::UnsupportedContent(format!("no video id in {url}")))?;
        let api = self.api_host(url).ok_or_else(|| {
            ResolveError::UnsupportedContent(format!(
                "No API endpoint known for host: {}",
                url.host_str().unwrap_or_default()
            ))
        })?;

        let api_url = Url::parse(&format!("https://{api}/streams/{id}"))?;
        let body = transport.get_text(&api_url).await?;
        let response: StreamsResponse = parse_json(&body, &api_url)?;

        if response.error.is_some() {
            return Err(ResolveError::UnsupportedContent(
                response
                    .message
                    .unwrap_or_else(|| "Piped API call error".to_string()),
            ));
        }

        let mut info = MediaInfo::builder()
            .id(&id)
            .title(response.title.unwrap_or_default())
            .description(response.description)
            .duration_seconds(response.duration.filter(|d| *d > 0.0).unwrap_or(0.0));

        if response.livestream {
            if let Some(hls_url) = response.hls {
                return live_stream(info, &hls_url, response.proxy_url.as_deref(), transport).await;
            }
        }

        for stream in &response.video_streams {
            // 3GPP is deprecated
            if stream.format.as_deref() == Some("v3GPP") {
                continue;
            }
            push_stream(&mut info, stream, true);
        }
        for stream in &response.audio_streams {
            push_stream(&mut info, stream, false);
        }
        for chapter in response.chapters {
            info.push_chapter(
                chapter.start.unwrap_or(0).saturating_mul(1000),
                chapter.title.unwrap_or_default(),
            );
        }

        Ok(info.build())
    }
}

async fn live_stream(
    mut info: MediaInfoBuilder,
    hls_url: &str,
    proxy: Option<&str>,
    transport: &dyn Transport,
) -> Result<MediaInfo> {
    let hls_url = Url::parse(hls_url)?;
    let proxy = proxy.and_then(|p| Url::parse(p).ok());
    let body = transport.get_text(&hls_url).await?;
    let playlist = hls::parse(&body, &hls_url)?;

    for mut stream in playlist.streams {
        if let Some(proxy) = &proxy {
            match uri::replace_source(&stream.uri, proxy) {
                Some(moved) => stream.uri = moved,
                None => warn!(uri = %stream.uri, "Could not move stream onto proxy"),
            }
        }
        info.push_adaptive_stream(stream);
    }

    Ok(info.build())
}

/// Piped does not say which streams are adaptive; audio and video-only
/// streams are treated as DASH, everything else as progressive.
fn push_stream(info: &mut MediaInfoBuilder, raw: &RawStream, is_video: bool) {
    let Some(url) = raw.url.as_deref() else {
        return;
    };

    let itag = Url::parse(url)
        .ok()
        .and_then(|u| uri::query_value(&u, "itag"))
        .and_then(|v| v.parse().ok())
        .unwrap_or(0);

    let mut stream = StreamDescriptor::new(url)
        .with_itag(itag)
        .with_bitrate(raw.bitrate.unwrap_or(0))
        .with_mime_type(raw.mime_type.as_deref().map(mime_type_from_str).unwrap_or_default());

    if is_video {
        stream = stream.with_resolution(
            raw.width.unwrap_or(0),
            raw.height.unwrap_or(0),
            f64::from(raw.fps.unwrap_or(0)),
        );
    }

    if !is_video || raw.video_only {
        stream = stream.with_manifest_type(ManifestType::Dash).with_ranges(
            range(raw.init_start, raw.init_end),
            range(raw.index_start, raw.index_end),
        );
        if !info.push_adaptive_stream(stream) {
            debug!(url, "Dropped duplicated adaptive stream");
        }
    } else {
        info.push_stream(stream);
    }
}

fn range(start: Option<u64>, end: Option<u64>) -> Option<ByteRange> {
    ByteRange::new(start?, end?)
}

// Serde structures for Piped API responses

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StreamsResponse {
    error: Option<String>,
    message: Option<String>,
    title: Option<String>,
    description: Option<String>,
    duration: Option<f64>,
    #[serde(default)]
    livestream: bool,
    hls: Option<String>,
    proxy_url: Option<String>,
    #[serde(default)]
    video_streams: Vec<RawStream>,
    #[serde(default)]
    audio_streams: Vec<RawStream>,
    #[serde(default)]
    chapters: Vec<RawChapter>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawStream {
    url: Option<String>,
    format: Option<String>,
    mime_type: Option<String>,
    #[serde(default)]
    video_only: bool,
    bitrate: Option<u64>,
    width: Option<u32>,
    height: Option<u32>,
    fps: Option<u32>,
    init_start: Option<u64>,
    init_end: Option<u64>,
    index_start: Option<u64>,
    index_end: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct RawChapter {
    title: Option<String>,
    start: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Hosts;
    use crate::extractor::stub::StubTransport;
    use crate::model::MimeType;

    const API: &str = "https://pipedapi.kavin.rocks/streams/dQw4w9WgXcQ";

    const RESPONSE: &str = r#"{
        "title": "Never Gonna Give You Up",
        "description": "The official video",
        "duration": 212,
        "livestream": false,
        "hls": null,
        "chapters": [
            {"title": "Chorus", "start": 43},
            {"title": "Intro", "start": 0}
        ],
        "videoStreams": [
            {"url": "https://proxy.example/videoplayback?itag=18&id=x", "format": "MPEG_4",
             "mimeType": "video/mp4", "videoOnly": false, "bitrate": 500000,
             "width": 640, "height": 360, "fps": 30, "codec": null},
            {"url": "https://proxy.example/videoplayback?itag=17&id=x", "format": "v3GPP",
             "mimeType": "video/3gpp", "videoOnly": false},
            {"url": "https://proxy.example/videoplayback?itag=137&id=x", "format": "MPEG_4",
             "mimeType": "video/mp4", "videoOnly": true, "bitrate": 4000000,
             "width": 1920, "height": 1080, "fps": 30, "codec": "avc1.640028",
             "initStart": 0, "initEnd": 740, "indexStart": 741, "indexEnd": 1200},
            {"url": null, "format": "MPEG_4", "videoOnly": true}
        ],
        "audioStreams": [
            {"url": "https://proxy.example/videoplayback?itag=140&id=x", "format": "M4A",
             "mimeType": "audio/mp4", "bitrate": 130000, "codec": "mp4a.40.2",
             "initStart": 0, "initEnd": 631, "indexStart": 632, "indexEnd": 900}
        ]
    }"#;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn matches_instances_with_video_ids() {
        let piped = PipedExtractor::default();
        assert!(piped.matches(&url("https://piped.kavin.rocks/watch?v=dQw4w9WgXcQ")));
        assert!(piped.matches(&url("https://www.piped.kavin.rocks/v/dQw4w9WgXcQ")));
        assert!(!piped.matches(&url("https://piped.kavin.rocks/trending")));
        assert!(!piped.matches(&url("https://other.example/watch?v=dQw4w9WgXcQ")));
    }

    #[test]
    fn api_host_follows_site_domain() {
        let config = Config {
            hosts: Hosts {
                piped: vec!["piped.example.org".into()],
                piped_api: vec!["pipedapi.other.net".into(), "api.example.org".into()],
                ..Hosts::default()
            },
            ..Config::default()
        };
        let piped = PipedExtractor::from_config(&config);
        assert_eq!(piped.api_host(&url("https://piped.example.org/watch?v=1")), Some("api.example.org"));
        assert_eq!(piped.api_host(&url("https://piped.kavin.rocks/watch?v=1")), Some(DEFAULT_API_HOST));
        assert_eq!(piped.api_host(&url("https://piped.unknown.io/watch?v=1")), None);
    }

    #[tokio::test]
    async fn maps_streams_and_chapters() {
        let transport = StubTransport::new().with(API, RESPONSE);
        let info = PipedExtractor::default()
            .extract(&url("https://piped.kavin.rocks/watch?v=dQw4w9WgXcQ"), &transport)
            .await
            .unwrap();

        assert_eq!(info.id, "dQw4w9WgXcQ");
        assert_eq!(info.title, "Never Gonna Give You Up");
        assert!((info.duration_seconds - 212.0).abs() < f64::EPSILON);

        assert_eq!(info.streams.len(), 1);
        let muxed = &info.streams[0];
        assert_eq!(muxed.itag, 18);
        assert_eq!((muxed.width, muxed.height), (640, 360));
        assert_eq!(muxed.mime_type, MimeType::VideoMp4);

        assert_eq!(info.adaptive_streams.len(), 2);
        let video = &info.adaptive_streams[0];
        assert_eq!(video.itag, 137);
        assert_eq!(video.manifest_type, ManifestType::Dash);
        assert_eq!(video.init_range, ByteRange::new(0, 740));
        assert_eq!(video.index_range, ByteRange::new(741, 1200));
        assert!(!video.has_codecs());

        let audio = &info.adaptive_streams[1];
        assert_eq!(audio.mime_type, MimeType::AudioMp4);
        assert_eq!((audio.width, audio.height), (0, 0));

        assert_eq!(info.chapters.len(), 2);
        assert_eq!(info.chapters[0].title, "Intro");
        assert_eq!(info.chapters[1].start_ms, 43_000);
        assert!(info.validate().is_ok());
    }

    #[tokio::test]
    async fn api_error_is_unsupported_content() {
        let transport = StubTransport::new().with(
            API,
            r#"{"error": "ExtractionException", "message": "Video unavailable"}"#,
        );
        let err = PipedExtractor::default()
            .extract(&url("https://piped.kavin.rocks/watch?v=dQw4w9WgXcQ"), &transport)
            .await
            .unwrap_err();
        assert_eq!(err, ResolveError::UnsupportedContent("Video unavailable".into()));
    }

    #[tokio::test]
    async fn livestream_is_moved_onto_proxy() {
        let transport = StubTransport::new()
            .with(
                API,
                r#"{"title": "Live", "duration": -1, "livestream": true,
                    "hls": "https://manifest.googlevideo.com/api/master.m3u8",
                    "proxyUrl": "https://proxy.example"}"#,
            )
            .with(
                "https://manifest.googlevideo.com/api/master.m3u8",
                "#EXTM3U\n#EXT-X-STREAM-INF:BANDWIDTH=800000,RESOLUTION=854x480,CODECS=\"avc1.4d401f,mp4a.40.2\"\nhttps://manifest.googlevideo.com/480/index.m3u8\n",
            );

        let info = PipedExtractor::default()
            .extract(&url("https://piped.kavin.rocks/watch?v=dQw4w9WgXcQ"), &transport)
            .await
            .unwrap();

        assert_eq!(info.duration_seconds, 0.0);
        assert!(info.streams.is_empty());
        assert_eq!(info.adaptive_streams[0].uri, "https://proxy.example/480/index.m3u8");
        assert_eq!(info.adaptive_streams[0].codecs(), Some(("avc1.4d401f", "mp4a.40.2")));
    }

    #[tokio::test]
    async fn unknown_api_host_fails_without_fetching() {
        let config = Config {
            hosts: Hosts {
                piped: vec!["piped.unknown.io".into()],
                ..Hosts::default()
            },
            ..Config::default()
        };
        let transport = StubTransport::new();
        let err = PipedExtractor::from_config(&config)
            .extract(&url("https://piped.unknown.io/watch?v=dQw4w9WgXcQ"), &transport)
            .await
            .unwrap_err();
        assert!(matches!(err, ResolveError::UnsupportedContent(_)));
        assert_eq!(transport.calls(), 0);
    }
}
