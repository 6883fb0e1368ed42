//! Invidious instance provider.
//!
//! Every instance exposes the same API at `/api/v1/videos/<id>`. Stream URLs
//! in the response point at YouTube's CDN or at the instance proxy; they are
//! rewritten onto the instance so playback goes through it.
//!
//! With `youtube_instance` configured, plain `youtube.com` / `youtu.be` links
//! are resolved through that instance as well.

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use tracing::{debug, warn};
use url::Url;

use super::{parse_json, Extractor};
use crate::codecs::parse_mime_with_codecs;
use crate::config::Config;
use crate::error::{ResolveError, Result};
use crate::hls;
use crate::http_client::Transport;
use crate::model::{ByteRange, ManifestType, MediaInfo, MediaInfoBuilder, StreamDescriptor};
use crate::uri;

/// Hosts known to expose the API at `/api/v1/`.
pub const DEFAULT_HOSTS: &[&str] = &[
    "invidious.snopyta.org",
    "vid.puffyan.us",
    "inv.riverside.rocks",
    "invidio.xamh.de",
    "vid.mint.lgbt",
    "invidious.hub.ne.kr",
];

const YOUTUBE_HOSTS: &[&str] = &["youtube.com", "youtube-nocookie.com"];

/// Itags never worth returning (3GP).
const SKIPPED_ITAGS: &[u32] = &[17];

/// Timestamp lines such as `1:02:03 Title` or `0:00 - Intro`.
static CHAPTER_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^\s*((?:\d{1,2}:)?\d{1,2}:\d{2})\s*[-:|]?\s*(\S.*?)\s*$").unwrap()
});

/// Extractor for Invidious instances.
#[derive(Debug, Clone)]
pub struct InvidiousExtractor {
    hosts: Vec<String>,
    youtube_instance: Option<Url>,
}

impl Default for InvidiousExtractor {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl InvidiousExtractor {
    pub fn from_config(config: &Config) -> Self {
        let mut hosts: Vec<String> = DEFAULT_HOSTS.iter().map(|h| (*h).to_string()).collect();
        hosts.extend(config.hosts.invidious.iter().cloned());

        let youtube_instance = config.youtube_instance.as_deref().and_then(|raw| {
            Url::parse(raw)
                .map_err(|e| warn!("Ignoring youtube_instance '{raw}': {e}"))
                .ok()
        });

        Self {
            hosts,
            youtube_instance,
        }
    }

    /// Returns `true` for a known instance (or, when configured, a YouTube
    /// link) with a video id.
    pub fn matches(&self, url: &Url) -> bool {
        self.target(url).is_some()
    }

    /// API source and video id for `url`.
    fn target(&self, url: &Url) -> Option<(Url, String)> {
        if uri::matches_hosts(url, &self.hosts) {
            return Some((uri::source(url)?, watch_id(url)?));
        }

        let instance = self.youtube_instance.as_ref()?;
        let id = if uri::matches_hosts(url, YOUTUBE_HOSTS) {
            watch_id(url)?
        } else if uri::matches_hosts(url, &["youtu.be"]) {
            uri::id_from_paths(url, &["/"])?
        } else {
            return None;
        };
        Some((uri::source(instance)?, id))
    }
}

fn watch_id(url: &Url) -> Option<String> {
    uri::query_value(url, "v").or_else(|| uri::id_from_paths(url, &["/v/"]))
}

#[async_trait]
impl Extractor for InvidiousExtractor {
    fn name(&self) -> &'static str {
        "invidious"
    }

    async fn extract(&self, url: &Url, transport: &dyn Transport) -> Result<MediaInfo> {
        let (source, id) = self
            .target(url)
            .ok_or_else(|| ResolveError::UnsupportedContent(format!("no video id in {url}")))?;
        debug!(%source, id = %id, "Requested video");

        let api_url = source.join(&format!("/api/v1/videos/{id}"))?;
        let body = transport.get_text(&api_url).await?;
        let video: VideoResponse = parse_json(&body, &api_url)?;

        let mut info = MediaInfo::builder()
            .id(video.video_id.unwrap_or(id))
            .title(video.title.unwrap_or_default())
            .duration_seconds(video.length_seconds.unwrap_or(0.0).max(0.0))
            .description(video.description.clone());

        if video.live_now {
            if let Some(hls_url) = &video.hls_url {
                let hls_url = source.join(hls_url)?;
                let body = transport.get_text(&hls_url).await?;
                for stream in hls::parse(&body, &hls_url)?.streams {
                    info.push_adaptive_stream(stream);
                }
                return Ok(info.build());
            }
        }

        for raw in &video.format_streams {
            if let Some(stream) = filled_stream(raw, &source) {
                info.push_stream(stream);
            }
        }
        for raw in &video.adaptive_formats {
            if let Some(stream) = filled_stream(raw, &source) {
                let stream = stream
                    .with_manifest_type(ManifestType::Dash)
                    .with_ranges(parse_range(raw.init.as_deref()), parse_range(raw.index.as_deref()));
                info.push_adaptive_stream(stream);
            }
        }
        if let Some(description) = &video.description {
            insert_chapters_from_description(&mut info, description);
        }

        Ok(info.build())
    }
}

fn filled_stream(raw: &RawFormat, source: &Url) -> Option<StreamDescriptor> {
    let itag = raw.itag.as_ref()?.as_u64()?;
    let itag = u32::try_from(itag).ok().filter(|i| *i > 0)?;
    if SKIPPED_ITAGS.contains(&itag) {
        return None;
    }
    let url = uri::replace_source(raw.url.as_deref()?, source)?;

    // Prefer "WxH", fall back to "720p" for the height.
    let (width, height) = match (&raw.size, &raw.resolution) {
        (Some(size), _) => size
            .split_once('x')
            .and_then(|(w, h)| Some((w.parse().ok()?, h.parse().ok()?)))
            .unwrap_or((0, 0)),
        (None, Some(res)) => (0, res.trim_end_matches('p').parse().unwrap_or(0)),
        (None, None) => (0, 0),
    };

    let mut stream = StreamDescriptor::new(url)
        .with_itag(itag)
        .with_bitrate(raw.bitrate.as_ref().and_then(Lenient::as_u64).unwrap_or(0));

    if width > 0 || height > 0 {
        stream = stream.with_resolution(width, height, f64::from(raw.fps.unwrap_or(0)));
    }
    if let Some(mime) = &raw.mime {
        let (mime_type, pair) = parse_mime_with_codecs(mime);
        stream = stream.with_mime_type(mime_type).with_codec_pair(pair);
    }

    Some(stream)
}

/// Parse `"start-end"`.
fn parse_range(range: Option<&str>) -> Option<ByteRange> {
    let (start, end) = range?.split_once('-')?;
    ByteRange::new(start.trim().parse().ok()?, end.trim().parse().ok()?)
}

/// Chapters from timestamp lines, used only when the list starts at `0:00`.
fn insert_chapters_from_description(info: &mut MediaInfoBuilder, description: &str) {
    let chapters: Vec<(u64, &str)> = CHAPTER_LINE
        .captures_iter(description)
        .filter_map(|caps| {
            let start = timestamp_ms(caps.get(1)?.as_str())?;
            Some((start, caps.get(2)?.as_str()))
        })
        .collect();

    if chapters.first().map(|(start, _)| *start) != Some(0) {
        return;
    }
    debug!(count = chapters.len(), "Found chapters in description");
    for (start, title) in chapters {
        info.push_chapter(start, title);
    }
}

fn timestamp_ms(stamp: &str) -> Option<u64> {
    stamp
        .split(':')
        .try_fold(0u64, |acc, part| Some(acc * 60 + part.parse::<u64>().ok()?))
        .map(|secs| secs * 1000)
}

// Serde structures for Invidious API responses

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoResponse {
    video_id: Option<String>,
    title: Option<String>,
    description: Option<String>,
    length_seconds: Option<f64>,
    #[serde(default)]
    live_now: bool,
    hls_url: Option<String>,
    #[serde(default)]
    format_streams: Vec<RawFormat>,
    #[serde(default)]
    adaptive_formats: Vec<RawFormat>,
}

#[derive(Debug, Deserialize)]
struct RawFormat {
    url: Option<String>,
    itag: Option<Lenient>,
    #[serde(rename = "type")]
    mime: Option<String>,
    bitrate: Option<Lenient>,
    size: Option<String>,
    resolution: Option<String>,
    fps: Option<u32>,
    init: Option<String>,
    index: Option<String>,
}

/// Invidious reports some numbers as strings.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Lenient {
    Number(u64),
    Text(String),
}

impl Lenient {
    fn as_u64(&self) -> Option<u64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(s) => s.trim().parse().ok(),
        }
    }
}
