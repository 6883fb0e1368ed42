use std::fmt::Write as _;

use anyhow::Result;

use tuber::{Client, MediaInfo, StreamDescriptor};

/// Resolve `uri` and print the result.
///
/// Resolution failures are reported on stderr and are not fatal.
pub async fn cmd_info(client: &Client, uri: &str, json: bool) -> Result<()> {
    let info = match client.fetch_media_info(uri).await {
        Ok(info) => info,
        Err(e) => {
            eprintln!("{e}");
            return Ok(());
        }
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&info)?);
    } else {
        print!("{}", format_info(&info));
    }

    Ok(())
}

/// Plain-text rendering: summary, blank line, then one block per stream.
pub fn format_info(info: &MediaInfo) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "TITLE: {}", info.title);
    let _ = writeln!(out, "DURATION: {}", info.duration_seconds);
    let _ = writeln!(out, "STREAMS: {}", info.streams.len());
    let _ = writeln!(out, "ADAPTIVE STREAMS: {}", info.adaptive_streams.len());
    out.push('\n');

    for stream in info.streams.iter().chain(&info.adaptive_streams) {
        write_stream(&mut out, stream);
    }
    out
}

fn write_stream(out: &mut String, stream: &StreamDescriptor) {
    if let Some((video, audio)) = stream.codecs() {
        let _ = writeln!(out, "VIDEO CODEC: {video}");
        let _ = writeln!(out, "AUDIO CODEC: {audio}");
    }
    let _ = writeln!(
        out,
        "RESOLUTION: {}x{}@{}",
        stream.width, stream.height, stream.fps
    );
    let _ = writeln!(out, "URI: {}", stream.uri);
    out.push('\n');
}
