//! # axum-paced-range
//!
//! Serves a single media file over HTTP with byte-range support and
//! artificial delivery pacing, for exercising media players against a slow,
//! controllable source.
//!
//! A `GET /stream` request is answered in four steps:
//!
//! 1. [`MediaResource::resolve`] looks up the file and its size.
//! 2. [`parse_range`] validates an optional `Range` header into a [`ByteRange`].
//! 3. [`ResponsePlan`] picks `200` or `206` and the entity headers.
//! 4. A [`DeliverySession`] seeks a fresh handle and streams the window as
//!    fixed-size chunks, sleeping between them according to [`Pacing`].
//!
//! Ranged responses are only paced when `buffer=true`; full-file responses
//! are always paced. See [`DeliveryConfig`].
//!
//! ```no_run
//! use axum_paced_range::{router, ServerConfig};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let config = ServerConfig::default();
//!     let listener = tokio::net::TcpListener::bind(config.bind_address).await.unwrap();
//!     axum::serve(listener, router(config)).await.unwrap();
//! }
//! ```

mod config;
mod error;
mod headers;
mod range;
mod resource;
mod server;
mod session;

pub use config::{
    guess_content_type, parse_chunk_size, parse_delay, DeliveryConfig, DeliveryQuery, Pacing, ServerConfig,
    DEFAULT_CHUNK_SIZE, DEFAULT_PACE_INTERVAL, MAX_CHUNK_SIZE, MAX_PACE_INTERVAL_MS,
};
pub use error::{RangeNotSatisfiable, StreamError};
pub use headers::ResponsePlan;
pub use range::{parse_range, ByteRange};
pub use resource::{AsyncSeekStart, KnownSize, MediaResource, RangeBody};
pub use server::router;
pub use session::DeliverySession;
