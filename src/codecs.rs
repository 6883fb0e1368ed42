//! MIME type and codec string helpers.
//!
//! Sites describe formats as MIME strings such as
//! `video/mp4; codecs="avc1.42001E, mp4a.40.2"` or as bare RFC 6381 codec
//! lists (`avc1.64001f,mp4a.40.2` in HLS `CODECS` attributes). These helpers
//! turn both into a [`MimeType`] and an optional video/audio codec pair.

use crate::model::MimeType;

/// Audio codec prefixes seen in the wild.
const AUDIO_CODEC_PREFIXES: &[&str] = &[
    "mp4a", "opus", "vorbis", "flac", "ac-3", "ec-3", "mp3", "alac", "dtsc",
];

/// Detect the container type from a MIME string like `video/webm`.
///
/// Parameters after `;` are ignored.
pub fn mime_type_from_str(s: &str) -> MimeType {
    let base = s.split(';').next().unwrap_or(s).trim().to_ascii_lowercase();

    let is_mp4 = base.ends_with("mp4");
    let is_webm = !is_mp4 && base.ends_with("webm");

    match (base.starts_with("video"), base.starts_with("audio")) {
        (true, _) if is_mp4 => MimeType::VideoMp4,
        (true, _) if is_webm => MimeType::VideoWebm,
        (_, true) if is_mp4 => MimeType::AudioMp4,
        (_, true) if is_webm => MimeType::AudioWebm,
        _ => MimeType::Unknown,
    }
}

/// Detect the container type from a file extension (without the dot).
pub fn mime_type_from_extension(ext: &str) -> MimeType {
    match ext.to_ascii_lowercase().as_str() {
        "mp4" | "m4v" => MimeType::VideoMp4,
        "m4a" => MimeType::AudioMp4,
        "webm" => MimeType::VideoWebm,
        "weba" => MimeType::AudioWebm,
        _ => MimeType::Unknown,
    }
}

/// Returns `true` when the codec identifier names an audio codec.
pub fn is_audio_codec(codec: &str) -> bool {
    let codec = codec.trim().to_ascii_lowercase();
    AUDIO_CODEC_PREFIXES.iter().any(|p| codec.starts_with(p))
}

/// Split a codec list into a video/audio pair.
///
/// Returns `None` unless the list names at least one video and one audio
/// codec. The first of each kind wins when a list names several.
pub fn split_codec_list(list: &str) -> Option<(String, String)> {
    let mut video = None;
    let mut audio = None;

    for codec in list.split(',').map(str::trim).filter(|c| !c.is_empty()) {
        if is_audio_codec(codec) {
            audio.get_or_insert_with(|| codec.to_string());
        } else {
            video.get_or_insert_with(|| codec.to_string());
        }
    }

    video.zip(audio)
}

/// Parse a full MIME string with an optional `codecs` parameter.
///
/// ```
/// use tuber::codecs::parse_mime_with_codecs;
/// use tuber::MimeType;
///
/// let (mime, pair) = parse_mime_with_codecs(r#"video/mp4; codecs="avc1.42001E, mp4a.40.2""#);
/// assert_eq!(mime, MimeType::VideoMp4);
/// assert_eq!(pair, Some(("avc1.42001E".to_string(), "mp4a.40.2".to_string())));
/// ```
pub fn parse_mime_with_codecs(s: &str) -> (MimeType, Option<(String, String)>) {
    let mime = mime_type_from_str(s);

    let codecs = s.split(';').skip(1).find_map(|param| {
        let (key, value) = param.split_once('=')?;
        (key.trim().eq_ignore_ascii_case("codecs")).then(|| value.trim().trim_matches('"'))
    });

    let pair = match codecs {
        // Audio containers carry a single codec, so there is never a pair.
        Some(_) if mime.is_audio() => None,
        Some(list) => split_codec_list(list),
        None => None,
    };

    (mime, pair)
}
