use std::net::SocketAddr;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::time::Duration;

use axum_paced_range::{parse_chunk_size, parse_delay, router, DeliveryConfig, ServerConfig};
use clap::Parser;
use mime_guess::mime::Mime;
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Serve one media file over HTTP with byte ranges and paced delivery.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Address to listen on
    #[arg(long, default_value = "0.0.0.0:8000")]
    bind: SocketAddr,

    /// Media file served at /stream
    #[arg(long, default_value = "record.mp3")]
    media: PathBuf,

    /// Content-Type of the media file, guessed from its extension if unset
    #[arg(long)]
    content_type: Option<Mime>,

    /// Default chunk size in bytes when a request has no chunkSize
    #[arg(long, default_value = "65536", value_parser = parse_chunk_size)]
    chunk_size: NonZeroUsize,

    /// Default delay after each chunk in ms when a request has no delay
    #[arg(long = "delay", default_value = "500", value_parser = parse_delay)]
    pace_interval: Duration,

    /// Pace ranged responses by default
    #[arg(long)]
    buffer: bool,

    /// Console log level, RUST_LOG takes precedence
    #[arg(long, default_value = "info")]
    log_level: Level,
}

impl Args {
    fn into_config(self) -> ServerConfig {
        let mut config = ServerConfig::new(self.bind, self.media);
        if let Some(content_type) = self.content_type {
            config.content_type = content_type;
        }
        config.delivery_defaults = DeliveryConfig {
            chunk_size: self.chunk_size,
            pace_interval: self.pace_interval,
            buffering: self.buffer,
        };
        config
    }
}

fn init_tracing(level: Level) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.to_string()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    init_tracing(args.log_level);

    let config = args.into_config();
    let bind_address = config.bind_address;
    tracing::info!(
        media = %config.media_path.display(),
        content_type = %config.content_type,
        defaults = ?config.delivery_defaults,
        "starting"
    );

    let listener = tokio::net::TcpListener::bind(bind_address).await?;
    tracing::info!("Streaming server running at http://{}/stream", listener.local_addr()?);
    axum::serve(listener, router(config)).await?;
    Ok(())
}
