//! `tuber` - media page URI to playable stream resolver
//!
//! # Features
//!
//! - **Extractor registry**: first-match dispatch of URIs to site extractors
//! - **Built-in extractors**: Piped, Invidious, PeerTube and direct media links
//! - **Normalized model**: progressive and adaptive streams with codecs,
//!   resolution, bitrate and byte ranges
//! - **HLS parsing**: master and media playlists
//! - **Deadlines and cancellation** for every resolution
//!
//! # Example
//!
//! ```rust,no_run
//! use tuber::Client;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = Client::new()?;
//!     let info = client.fetch_media_info("https://piped.kavin.rocks/watch?v=dQw4w9WgXcQ").await?;
//!     println!("{} has {} streams", info.title, info.stream_count());
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod codecs;
pub mod config;
pub mod error;
pub mod extractor;
pub mod hls;
pub mod http_client;
pub mod model;
pub mod registry;
pub mod uri;

pub use client::{Client, FetchOptions};
pub use config::Config;
pub use error::{ResolveError, Result};
pub use extractor::Extractor;
pub use http_client::{HttpTransport, Transport};
pub use model::{
    ByteRange, Chapter, ManifestType, MediaInfo, MediaInfoBuilder, MimeType, StreamDescriptor,
};
pub use registry::ExtractorRegistry;

/// Version of tuber
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
