//! HLS playlist parsing.
//!
//! Turns an M3U8 document into adaptive [`StreamDescriptor`]s:
//!
//! - **Master playlists**: one stream per `#EXT-X-STREAM-INF` variant plus one
//!   per `#EXT-X-MEDIA` rendition that carries its own `URI`.
//! - **Media playlists**: a single stream pointing at the playlist itself,
//!   with the duration summed from `#EXTINF` tags.
//!
//! Relative URIs are resolved against the playlist URL. Variants that share
//! a URI (common when one video rendition is paired with several audio
//! groups) are kept once.

use tracing::debug;
use url::Url;

use crate::codecs::split_codec_list;
use crate::error::{ResolveError, Result};
use crate::model::{ManifestType, StreamDescriptor};

const STREAM_INF: &str = "#EXT-X-STREAM-INF:";
const MEDIA: &str = "#EXT-X-MEDIA:";
const EXTINF: &str = "#EXTINF:";

/// Parsed playlist.
#[derive(Debug, Clone, PartialEq)]
pub struct Playlist {
    /// Adaptive streams in playlist order.
    pub streams: Vec<StreamDescriptor>,
    /// Sum of segment durations (media playlists only, 0 otherwise).
    pub duration_seconds: f64,
    /// Whether the document was a master playlist.
    pub is_master: bool,
}

/// Parse an HLS playlist fetched from `base`.
pub fn parse(text: &str, base: &Url) -> Result<Playlist> {
    let mut lines = text
        .trim_start_matches('\u{feff}')
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty());

    if lines.next() != Some("#EXTM3U") {
        return Err(ResolveError::Parse(format!(
            "{base} is not an HLS playlist (missing #EXTM3U)"
        )));
    }

    let mut streams: Vec<StreamDescriptor> = Vec::new();
    let mut pending: Option<StreamDescriptor> = None;
    let mut is_master = false;
    let mut segments = 0usize;
    let mut duration = 0.0;
    let mut next_itag = 1u32;

    let push = |streams: &mut Vec<StreamDescriptor>, stream: StreamDescriptor| {
        if streams.iter().any(|s| s.uri == stream.uri) {
            debug!(uri = %stream.uri, "Dropped duplicated HLS variant");
        } else {
            debug!(uri = %stream.uri, itag = stream.itag, "Added HLS variant");
            streams.push(stream);
        }
    };

    for line in lines {
        if let Some(attrs) = line.strip_prefix(STREAM_INF) {
            is_master = true;
            pending = Some(variant_from_attributes(attrs, next_itag));
            next_itag += 1;
        } else if let Some(attrs) = line.strip_prefix(MEDIA) {
            is_master = true;
            if let Some(stream) = rendition_from_attributes(attrs, base, next_itag) {
                next_itag += 1;
                push(&mut streams, stream);
            }
        } else if let Some(rest) = line.strip_prefix(EXTINF) {
            segments += 1;
            let secs = rest.split(',').next().unwrap_or_default().trim();
            duration += secs.parse::<f64>().unwrap_or(0.0);
        } else if !line.starts_with('#') {
            if let Some(mut stream) = pending.take() {
                stream.uri = resolve(base, line)?;
                push(&mut streams, stream);
            }
        }
    }

    if is_master {
        return Ok(Playlist {
            streams,
            duration_seconds: 0.0,
            is_master,
        });
    }

    if segments == 0 {
        return Err(ResolveError::Parse(format!(
            "HLS playlist {base} has neither variants nor segments"
        )));
    }

    Ok(Playlist {
        streams: vec![StreamDescriptor::new(base.as_str())
            .with_itag(1)
            .with_manifest_type(ManifestType::Hls)],
        duration_seconds: duration,
        is_master,
    })
}

fn variant_from_attributes(attrs: &str, itag: u32) -> StreamDescriptor {
    let mut stream = StreamDescriptor::new(String::new())
        .with_itag(itag)
        .with_manifest_type(ManifestType::Hls);
    let mut bandwidth = 0;
    let mut average = 0;

    for (key, value) in attributes(attrs) {
        match key {
            "BANDWIDTH" => bandwidth = value.parse().unwrap_or(0),
            "AVERAGE-BANDWIDTH" => average = value.parse().unwrap_or(0),
            "RESOLUTION" => {
                if let Some((w, h)) = value.split_once(['x', 'X']) {
                    stream.width = w.parse().unwrap_or(0);
                    stream.height = h.parse().unwrap_or(0);
                }
            }
            "FRAME-RATE" => {
                // Unknown or nonsensical rates are reported as 0.
                stream.fps = value
                    .parse::<f64>()
                    .ok()
                    .filter(|fps| fps.is_finite() && *fps >= 0.0)
                    .unwrap_or(0.0);
            }
            "CODECS" => stream = stream.with_codec_pair(split_codec_list(value)),
            _ => {}
        }
    }

    stream.bitrate = if average > 0 { average } else { bandwidth };
    stream
}

fn rendition_from_attributes(attrs: &str, base: &Url, itag: u32) -> Option<StreamDescriptor> {
    let mut uri = None;
    let mut media_type = None;

    for (key, value) in attributes(attrs) {
        match key {
            "URI" => uri = Some(value),
            "TYPE" => media_type = Some(value),
            _ => {}
        }
    }

    // Subtitles and closed captions are not playable streams.
    if !matches!(media_type, Some("AUDIO" | "VIDEO")) {
        return None;
    }

    let uri = resolve(base, uri?).ok()?;
    Some(
        StreamDescriptor::new(uri)
            .with_itag(itag)
            .with_manifest_type(ManifestType::Hls),
    )
}

fn resolve(base: &Url, reference: &str) -> Result<String> {
    base.join(reference)
        .map(String::from)
        .map_err(|e| ResolveError::Parse(format!("bad URI '{reference}' in playlist: {e}")))
}

/// Split an HLS attribute list, honouring quoted values.
fn attributes(list: &str) -> Vec<(&str, &str)> {
    let mut out = Vec::new();
    let mut start = 0;
    let mut quoted = false;

    for (i, c) in list.char_indices() {
        match c {
            '"' => quoted = !quoted,
            ',' if !quoted => {
                push_attribute(&mut out, &list[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    push_attribute(&mut out, &list[start..]);

    out
}

fn push_attribute<'a>(out: &mut Vec<(&'a str, &'a str)>, pair: &'a str) {
    if let Some((key, value)) = pair.split_once('=') {
        out.push((key.trim(), value.trim().trim_matches('"')));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MASTER: &str = "#EXTM3U
#EXT-X-INDEPENDENT-SEGMENTS
#EXT-X-MEDIA:TYPE=AUDIO,GROUP-ID=\"aac\",NAME=\"English\",DEFAULT=YES,URI=\"audio/en.m3u8\"
#EXT-X-MEDIA:TYPE=SUBTITLES,GROUP-ID=\"subs\",NAME=\"English\",URI=\"subs/en.m3u8\"
#EXT-X-STREAM-INF:BANDWIDTH=5000000,AVERAGE-BANDWIDTH=4500000,RESOLUTION=1920x1080,FRAME-RATE=29.970,CODECS=\"avc1.640028,mp4a.40.2\",AUDIO=\"aac\"
1080p/index.m3u8
#EXT-X-STREAM-INF:BANDWIDTH=1200000,RESOLUTION=640x360,CODECS=\"avc1.4d401e\"
https://cdn.example.com/360p/index.m3u8
#EXT-X-STREAM-INF:BANDWIDTH=1300000,RESOLUTION=640x360,CODECS=\"avc1.4d401e\"
https://cdn.example.com/360p/index.m3u8
";

    fn base() -> Url {
        Url::parse("https://media.example.com/live/master.m3u8").unwrap()
    }

    #[test]
    fn parses_master_playlist() {
        let playlist = parse(MASTER, &base()).unwrap();
        assert!(playlist.is_master);
        assert_eq!(playlist.streams.len(), 3);

        let audio = &playlist.streams[0];
        assert_eq!(audio.uri, "https://media.example.com/live/audio/en.m3u8");
        assert!(!audio.has_codecs());

        let hd = &playlist.streams[1];
        assert_eq!(hd.uri, "https://media.example.com/live/1080p/index.m3u8");
        assert_eq!((hd.width, hd.height), (1920, 1080));
        assert!((hd.fps - 29.97).abs() < 1e-9);
        assert_eq!(hd.bitrate, 4_500_000);
        assert_eq!(hd.codecs(), Some(("avc1.640028", "mp4a.40.2")));
        assert_eq!(hd.manifest_type, ManifestType::Hls);

        let sd = &playlist.streams[2];
        assert_eq!(sd.uri, "https://cdn.example.com/360p/index.m3u8");
        assert_eq!(sd.bitrate, 1_200_000);
        // Video-only codec list leaves the pair empty.
        assert!(!sd.has_codecs());
    }

    #[test]
    fn bogus_frame_rates_become_zero() {
        let text = "#EXTM3U
#EXT-X-STREAM-INF:BANDWIDTH=1,RESOLUTION=-640x360,FRAME-RATE=-25,CODECS=\"avc1.4d401e,mp4a.40.2\"
neg.m3u8
#EXT-X-STREAM-INF:BANDWIDTH=2,FRAME-RATE=NaN
nan.m3u8
#EXT-X-STREAM-INF:BANDWIDTH=3,FRAME-RATE=inf
inf.m3u8
#EXT-X-STREAM-INF:BANDWIDTH=4,FRAME-RATE=25
ok.m3u8
";
        let playlist = parse(text, &base()).unwrap();
        let rates: Vec<f64> = playlist.streams.iter().map(|s| s.fps).collect();
        assert_eq!(rates, [0.0, 0.0, 0.0, 25.0]);
        assert_eq!((playlist.streams[0].width, playlist.streams[0].height), (0, 360));
    }

    #[test]
    fn parses_media_playlist() {
        let text = "#EXTM3U
#EXT-X-TARGETDURATION:10
#EXTINF:9.5,
seg0.ts
#EXTINF:10.0,
seg1.ts
#EXTINF:4.25,title
seg2.ts
#EXT-X-ENDLIST
";
        let playlist = parse(text, &base()).unwrap();
        assert!(!playlist.is_master);
        assert_eq!(playlist.streams.len(), 1);
        assert_eq!(playlist.streams[0].uri, base().as_str());
        assert!((playlist.duration_seconds - 23.75).abs() < 1e-9);
    }

    #[test]
    fn rejects_non_playlists() {
        let err = parse("<html></html>", &base()).unwrap_err();
        assert!(matches!(err, ResolveError::Parse(_)));
    }

    #[test]
    fn rejects_empty_playlists() {
        let err = parse("#EXTM3U\n#EXT-X-VERSION:3\n", &base()).unwrap_err();
        assert!(err.to_string().contains("neither variants nor segments"));
    }

    #[test]
    fn splits_quoted_attribute_lists() {
        let attrs = attributes("BANDWIDTH=1,CODECS=\"avc1,mp4a.40.2\",NAME=\"a=b\"");
        assert_eq!(
            attrs,
            vec![("BANDWIDTH", "1"), ("CODECS", "avc1,mp4a.40.2"), ("NAME", "a=b")]
        );
    }

    #[test]
    fn tolerates_byte_order_mark_and_crlf() {
        let text = "\u{feff}#EXTM3U\r\n#EXT-X-STREAM-INF:BANDWIDTH=1\r\nv.m3u8\r\n";
        let playlist = parse(text, &base()).unwrap();
        assert_eq!(playlist.streams[0].uri, "https://media.example.com/live/v.m3u8");
    }
}
