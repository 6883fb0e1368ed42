//! Normalized media metadata returned by every extractor.
//!
//! A [`MediaInfo`] is produced once per successful resolution and handed to
//! the caller by value. It holds two ordered collections of
//! [`StreamDescriptor`]s: progressive streams (single files) and adaptive
//! streams (segmented or manifest-based delivery). Both keep the order the
//! extractor reported, which is the site's quality/priority order.

use serde::{Deserialize, Serialize};

use crate::error::{ResolveError, Result};

/// Container/MIME type of a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MimeType {
    #[default]
    Unknown,
    VideoMp4,
    AudioMp4,
    VideoWebm,
    AudioWebm,
}

impl MimeType {
    /// Returns `true` for audio-only container types.
    #[must_use]
    pub fn is_audio(self) -> bool {
        matches!(self, Self::AudioMp4 | Self::AudioWebm)
    }

    /// The canonical MIME string, or `None` when unknown.
    #[must_use]
    pub fn as_str(self) -> Option<&'static str> {
        match self {
            Self::Unknown => None,
            Self::VideoMp4 => Some("video/mp4"),
            Self::AudioMp4 => Some("audio/mp4"),
            Self::VideoWebm => Some("video/webm"),
            Self::AudioWebm => Some("audio/webm"),
        }
    }
}

/// Manifest flavour an adaptive stream belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ManifestType {
    #[default]
    Unknown,
    Dash,
    Hls,
}

/// Inclusive byte range inside a segment-base DASH stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
}

impl ByteRange {
    /// Build a range, rejecting empty or reversed ones.
    #[must_use]
    pub fn new(start: u64, end: u64) -> Option<Self> {
        (end > start).then_some(Self { start, end })
    }
}

/// One playable media variant.
///
/// The video and audio codecs are either both known or both absent; see
/// [`StreamDescriptor::has_codecs`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamDescriptor {
    /// Direct URI of the media file or playlist.
    pub uri: String,
    /// Width in pixels (0 when unknown or audio only).
    pub width: u32,
    /// Height in pixels (0 when unknown or audio only).
    pub height: u32,
    /// Frames per second (0 when unknown).
    pub fps: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_codec: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_codec: Option<String>,
    /// Site-specific format identifier (0 when unknown).
    pub itag: u32,
    /// Bitrate in bits per second (0 when unknown).
    pub bitrate: u64,
    pub mime_type: MimeType,
    /// Manifest flavour, meaningful for adaptive streams only.
    pub manifest_type: ManifestType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub init_range: Option<ByteRange>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index_range: Option<ByteRange>,
}

impl StreamDescriptor {
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            width: 0,
            height: 0,
            fps: 0.0,
            video_codec: None,
            audio_codec: None,
            itag: 0,
            bitrate: 0,
            mime_type: MimeType::Unknown,
            manifest_type: ManifestType::Unknown,
            init_range: None,
            index_range: None,
        }
    }

    #[must_use]
    pub fn with_resolution(mut self, width: u32, height: u32, fps: f64) -> Self {
        self.width = width;
        self.height = height;
        self.fps = fps;
        self
    }

    /// Set both codecs at once.
    #[must_use]
    pub fn with_codecs(mut self, video: impl Into<String>, audio: impl Into<String>) -> Self {
        self.video_codec = Some(video.into());
        self.audio_codec = Some(audio.into());
        self
    }

    /// Set the codec pair when both halves are known, clear it otherwise.
    #[must_use]
    pub fn with_codec_pair(mut self, pair: Option<(String, String)>) -> Self {
        let (video, audio) = pair.unzip();
        self.video_codec = video;
        self.audio_codec = audio;
        self
    }

    #[must_use]
    pub fn with_itag(mut self, itag: u32) -> Self {
        self.itag = itag;
        self
    }

    #[must_use]
    pub fn with_bitrate(mut self, bitrate: u64) -> Self {
        self.bitrate = bitrate;
        self
    }

    #[must_use]
    pub fn with_mime_type(mut self, mime_type: MimeType) -> Self {
        self.mime_type = mime_type;
        self
    }

    #[must_use]
    pub fn with_manifest_type(mut self, manifest_type: ManifestType) -> Self {
        self.manifest_type = manifest_type;
        self
    }

    #[must_use]
    pub fn with_ranges(mut self, init: Option<ByteRange>, index: Option<ByteRange>) -> Self {
        self.init_range = init;
        self.index_range = index;
        self
    }

    /// Codec pair, if known.
    pub fn codecs(&self) -> Option<(&str, &str)> {
        match (&self.video_codec, &self.audio_codec) {
            (Some(v), Some(a)) => Some((v.as_str(), a.as_str())),
            _ => None,
        }
    }

    pub fn has_codecs(&self) -> bool {
        self.codecs().is_some()
    }

    fn validate(&self, collection: &str, index: usize) -> Result<()> {
        if self.uri.is_empty() {
            return Err(ResolveError::InvariantViolation(format!(
                "{collection} stream #{index} has an empty URI"
            )));
        }
        if self.video_codec.is_some() != self.audio_codec.is_some() {
            return Err(ResolveError::InvariantViolation(format!(
                "{collection} stream #{index} has only one of video/audio codec"
            )));
        }
        if !self.fps.is_finite() || self.fps < 0.0 {
            return Err(ResolveError::InvariantViolation(format!(
                "{collection} stream #{index} has invalid fps {}",
                self.fps
            )));
        }
        Ok(())
    }
}

/// A named position inside the media.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chapter {
    /// Start offset in milliseconds.
    pub start_ms: u64,
    pub title: String,
}

/// Resolved metadata for one media URI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaInfo {
    /// Site-specific media identifier (may be empty).
    pub id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Duration in seconds, 0 when unknown (e.g. live).
    pub duration_seconds: f64,
    /// Progressive streams in extractor-reported order.
    pub streams: Vec<StreamDescriptor>,
    /// Adaptive streams in extractor-reported order.
    pub adaptive_streams: Vec<StreamDescriptor>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub chapters: Vec<Chapter>,
}

impl MediaInfo {
    pub fn builder() -> MediaInfoBuilder {
        MediaInfoBuilder::default()
    }

    /// Total number of streams across both collections.
    pub fn stream_count(&self) -> usize {
        self.streams.len() + self.adaptive_streams.len()
    }

    /// Check the model invariants.
    ///
    /// - duration is finite and non-negative
    /// - every stream has a URI, a sane fps and either both codecs or none
    /// - at least one stream exists
    pub fn validate(&self) -> Result<()> {
        if !self.duration_seconds.is_finite() || self.duration_seconds < 0.0 {
            return Err(ResolveError::InvariantViolation(format!(
                "duration must be a non-negative number, got {}",
                self.duration_seconds
            )));
        }

        for (i, stream) in self.streams.iter().enumerate() {
            stream.validate("progressive", i)?;
        }
        for (i, stream) in self.adaptive_streams.iter().enumerate() {
            stream.validate("adaptive", i)?;
        }

        if self.stream_count() == 0 {
            return Err(ResolveError::InvariantViolation(
                "extractor returned media info without any streams".into(),
            ));
        }

        Ok(())
    }
}

/// Incremental construction of a [`MediaInfo`] inside an extractor.
#[derive(Debug, Default)]
pub struct MediaInfoBuilder {
    id: String,
    title: String,
    description: Option<String>,
    duration_seconds: f64,
    streams: Vec<StreamDescriptor>,
    adaptive_streams: Vec<StreamDescriptor>,
    chapters: Vec<Chapter>,
}

impl MediaInfoBuilder {
    #[must_use]
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    #[must_use]
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    #[must_use]
    pub fn description(mut self, description: Option<String>) -> Self {
        self.description = description.filter(|d| !d.is_empty());
        self
    }

    #[must_use]
    pub fn duration_seconds(mut self, duration: f64) -> Self {
        self.duration_seconds = duration;
        self
    }

    pub fn set_duration_seconds(&mut self, duration: f64) {
        self.duration_seconds = duration;
    }

    /// Streams pushed so far, across both collections.
    pub fn stream_count(&self) -> usize {
        self.streams.len() + self.adaptive_streams.len()
    }

    pub fn push_stream(&mut self, stream: StreamDescriptor) {
        self.streams.push(stream);
    }

    /// Append an adaptive stream unless one with the same URI is present.
    ///
    /// Returns `false` when the stream was dropped as a duplicate.
    pub fn push_adaptive_stream(&mut self, stream: StreamDescriptor) -> bool {
        if self.adaptive_streams.iter().any(|s| s.uri == stream.uri) {
            return false;
        }
        self.adaptive_streams.push(stream);
        true
    }

    pub fn push_chapter(&mut self, start_ms: u64, title: impl Into<String>) {
        self.chapters.push(Chapter {
            start_ms,
            title: title.into(),
        });
    }

    #[must_use]
    pub fn stream(mut self, stream: StreamDescriptor) -> Self {
        self.push_stream(stream);
        self
    }

    #[must_use]
    pub fn adaptive_stream(mut self, stream: StreamDescriptor) -> Self {
        self.push_adaptive_stream(stream);
        self
    }

    pub fn build(mut self) -> MediaInfo {
        // Stable sort keeps insertion order for equal offsets.
        self.chapters.sort_by_key(|c| c.start_ms);

        MediaInfo {
            id: self.id,
            title: self.title,
            description: self.description,
            duration_seconds: self.duration_seconds,
            streams: self.streams,
            adaptive_streams: self.adaptive_streams,
            chapters: self.chapters,
        }
    }
}
