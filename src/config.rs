//! Server and per-request delivery configuration.
//!
//! [`ServerConfig`] is built once at startup and shared read-only between
//! requests. [`DeliveryConfig`] is derived per request from the `/stream`
//! query string, falling back to the server-wide defaults.

use std::net::SocketAddr;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use mime_guess::mime::{self, Mime};
use serde::Deserialize;

use crate::error::StreamError;
use crate::range::parse_digits;

pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;
pub const DEFAULT_PACE_INTERVAL: Duration = Duration::from_millis(500);
pub const MAX_CHUNK_SIZE: usize = 16 * 1024 * 1024;
pub const MAX_PACE_INTERVAL_MS: u64 = 600_000;

/// How one session spaces its chunks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pacing {
    /// Chunks go out as fast as the sink accepts them.
    Unpaced,
    /// Wait this long after every emitted chunk, the last one included.
    Paced(Duration),
}

/// Chunking and pacing for a single `/stream` response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryConfig {
    pub chunk_size: NonZeroUsize,
    pub pace_interval: Duration,
    pub buffering: bool,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        DeliveryConfig {
            chunk_size: NonZeroUsize::new(DEFAULT_CHUNK_SIZE).expect("default chunk size is non-zero"),
            pace_interval: DEFAULT_PACE_INTERVAL,
            buffering: false,
        }
    }
}

impl DeliveryConfig {
    /// Pacing for a `206` response. Only paced when buffering is enabled.
    pub fn ranged_pacing(&self) -> Pacing {
        if self.buffering {
            Pacing::Paced(self.pace_interval)
        } else {
            Pacing::Unpaced
        }
    }

    /// Pacing for a `200` response. Always paced, `buffering` is ignored.
    ///
    /// The asymmetry with [`DeliveryConfig::ranged_pacing`] is what existing
    /// players are tuned against, so it is kept as is.
    pub fn full_pacing(&self) -> Pacing {
        Pacing::Paced(self.pace_interval)
    }
}

/// Raw `/stream` query string. Values are kept as strings so that bad input
/// maps to [`StreamError::InvalidConfig`] instead of an extractor rejection.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct DeliveryQuery {
    #[serde(rename = "chunkSize")]
    pub chunk_size: Option<String>,
    pub delay: Option<String>,
    pub buffer: Option<String>,
}

impl DeliveryQuery {
    /// Validates the query against `defaults`, which fill any missing parameter.
    pub fn resolve(&self, defaults: &DeliveryConfig) -> Result<DeliveryConfig, StreamError> {
        let chunk_size = match &self.chunk_size {
            Some(raw) => parse_chunk_size(raw)?,
            None => defaults.chunk_size,
        };
        let pace_interval = match &self.delay {
            Some(raw) => parse_delay(raw)?,
            None => defaults.pace_interval,
        };
        let buffering = match &self.buffer {
            Some(raw) => parse_flag("buffer", raw)?,
            None => defaults.buffering,
        };
        Ok(DeliveryConfig { chunk_size, pace_interval, buffering })
    }
}

pub fn parse_chunk_size(raw: &str) -> Result<NonZeroUsize, StreamError> {
    let invalid = |reason: String| StreamError::InvalidConfig { param: "chunkSize", reason };
    let size: usize =
        parse_digits(raw.trim()).ok_or_else(|| invalid(format!("{raw:?} is not a positive integer")))?;
    if size > MAX_CHUNK_SIZE {
        return Err(invalid(format!("{size} exceeds the maximum of {MAX_CHUNK_SIZE} bytes")));
    }
    NonZeroUsize::new(size).ok_or_else(|| invalid("must be greater than zero".to_string()))
}

pub fn parse_delay(raw: &str) -> Result<Duration, StreamError> {
    let invalid = |reason: String| StreamError::InvalidConfig { param: "delay", reason };
    let millis: u64 =
        parse_digits(raw.trim()).ok_or_else(|| invalid(format!("{raw:?} is not a non-negative integer")))?;
    if millis > MAX_PACE_INTERVAL_MS {
        return Err(invalid(format!("{millis}ms exceeds the maximum of {MAX_PACE_INTERVAL_MS}ms")));
    }
    Ok(Duration::from_millis(millis))
}

fn parse_flag(param: &'static str, raw: &str) -> Result<bool, StreamError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" | "" => Ok(false),
        _ => Err(StreamError::InvalidConfig { param, reason: format!("{raw:?} is not a boolean") }),
    }
}

/// Process-wide settings, passed to [`crate::router`] at construction.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_address: SocketAddr,
    pub media_path: PathBuf,
    pub content_type: Mime,
    pub delivery_defaults: DeliveryConfig,
}

impl ServerConfig {
    /// Config for `media_path` with the content type guessed from its extension.
    pub fn new(bind_address: SocketAddr, media_path: impl Into<PathBuf>) -> Self {
        let media_path = media_path.into();
        let content_type = guess_content_type(&media_path);
        ServerConfig {
            bind_address,
            media_path,
            content_type,
            delivery_defaults: DeliveryConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig::new(SocketAddr::from(([0, 0, 0, 0], 8000)), "record.mp3")
    }
}

/// Falls back to `audio/mpeg` when the extension says nothing useful.
pub fn guess_content_type(path: &Path) -> Mime {
    mime_guess::from_path(path)
        .first()
        .filter(|mime| *mime != mime::APPLICATION_OCTET_STREAM)
        .unwrap_or_else(audio_mpeg)
}

fn audio_mpeg() -> Mime {
    "audio/mpeg".parse().expect("audio/mpeg is a valid mime type")
}
