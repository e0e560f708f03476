// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use aws_config::{BehaviorVersion, Region};
use clap::{Parser, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;

use podserve::catalog::{DynamoCatalog, MemoryCatalog, SharedCatalogStore};
use podserve::config::{
    Backend, CatalogConfig, Config, IngestConfig, MediaConfig, RetryPolicy, ServerConfig,
    WaitPolicy,
};
use podserve::media::{MemoryBlobStore, S3BlobStore, SharedBlobStore};
use podserve::{AppState, HttpClient, ReqwestClient, build_router};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormat {
    Pretty,
    Json,
}

/// Serve a podcast episode catalog and its media
#[derive(Parser, Debug)]
#[command(name = "podserve")]
#[command(about = "Serve a podcast episode catalog and its media")]
#[command(version)]
struct Args {
    /// Address the HTTP server binds to
    #[arg(long, env = "PODSERVE_LISTEN", default_value = "0.0.0.0:8080")]
    listen: SocketAddr,

    /// Store implementations: aws or memory
    #[arg(long, env = "PODSERVE_BACKEND", default_value = "aws")]
    backend: Backend,

    /// AWS region (defaults to the SDK provider chain)
    #[arg(long, env = "PODSERVE_REGION")]
    region: Option<String>,

    /// DynamoDB table holding the episode catalog
    #[arg(long, env = "PODSERVE_TABLE_NAME", default_value = "")]
    table_name: String,

    /// DynamoDB endpoint override
    #[arg(long, env = "PODSERVE_DYNAMODB_ENDPOINT")]
    dynamodb_endpoint: Option<String>,

    /// Attempts per catalog request
    #[arg(long, env = "PODSERVE_CATALOG_MAX_ATTEMPTS", default_value = "3")]
    catalog_max_attempts: u32,

    /// S3 bucket holding episode media
    #[arg(long, env = "PODSERVE_BUCKET", default_value = "")]
    bucket: String,

    /// Prefix for every media storage key
    #[arg(long, env = "PODSERVE_KEY_PREFIX", default_value = "")]
    key_prefix: String,

    /// S3 endpoint override (enables path-style addressing)
    #[arg(long, env = "PODSERVE_S3_ENDPOINT")]
    s3_endpoint: Option<String>,

    /// Seconds to wait for media to appear before answering not found
    #[arg(long, env = "PODSERVE_MEDIA_WAIT_SECS", default_value = "30")]
    media_wait_secs: u64,

    /// Milliseconds between media existence checks
    #[arg(long, env = "PODSERVE_MEDIA_POLL_MS", default_value = "500")]
    media_poll_ms: u64,

    /// Consecutive failed existence checks tolerated
    #[arg(long, env = "PODSERVE_MEDIA_MAX_FAILURES", default_value = "3")]
    media_max_failures: u32,

    /// Largest media download accepted, in bytes
    #[arg(long, env = "PODSERVE_MAX_MEDIA_BYTES", default_value = "536870912")]
    max_media_bytes: u64,

    /// Timeout for a single media download, in seconds
    #[arg(long, env = "PODSERVE_DOWNLOAD_TIMEOUT_SECS", default_value = "300")]
    download_timeout_secs: u64,

    /// Upload attempts per media object
    #[arg(long, env = "PODSERVE_UPLOAD_ATTEMPTS", default_value = "3")]
    upload_attempts: u32,

    /// Backoff before the first upload retry, in milliseconds
    #[arg(long, env = "PODSERVE_UPLOAD_BACKOFF_MS", default_value = "200")]
    upload_backoff_ms: u64,

    /// Cap on episodes imported from one feed (0 = no cap)
    #[arg(long, env = "PODSERVE_MAX_FEED_EPISODES", default_value = "0")]
    max_feed_episodes: usize,

    /// Do not log ingestion stage events
    #[arg(long, env = "PODSERVE_QUIET_INGEST")]
    quiet_ingest: bool,

    /// Base URL used for access links by the memory backend
    #[arg(long, env = "PODSERVE_MEMORY_BASE_URL", default_value = "http://localhost:8080/media")]
    memory_base_url: String,

    /// Log output format
    #[arg(long, env = "PODSERVE_LOG_FORMAT", value_enum, default_value = "pretty")]
    log_format: LogFormat,

    /// Default log filter when RUST_LOG is unset
    #[arg(long, env = "PODSERVE_LOG_LEVEL", default_value = "info")]
    log_level: String,
}

impl Args {
    fn to_config(&self) -> Config {
        Config {
            server: ServerConfig {
                listen: self.listen,
            },
            backend: self.backend,
            region: self.region.clone(),
            catalog: CatalogConfig {
                table_name: self.table_name.clone(),
                endpoint_url: self.dynamodb_endpoint.clone(),
                max_attempts: self.catalog_max_attempts,
            },
            media: MediaConfig {
                bucket: self.bucket.clone(),
                key_prefix: self.key_prefix.clone(),
                endpoint_url: self.s3_endpoint.clone(),
                wait: WaitPolicy {
                    timeout: Duration::from_secs(self.media_wait_secs),
                    poll_interval: Duration::from_millis(self.media_poll_ms),
                    max_failures: self.media_max_failures,
                },
            },
            ingest: IngestConfig {
                max_media_bytes: self.max_media_bytes,
                download_timeout: Duration::from_secs(self.download_timeout_secs),
                upload_retry: RetryPolicy {
                    max_attempts: self.upload_attempts,
                    initial_backoff: Duration::from_millis(self.upload_backoff_ms),
                },
                max_feed_episodes: self.max_feed_episodes,
                report_events: !self.quiet_ingest,
            },
        }
    }
}

fn init_tracing(log_level: &str, format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    match format {
        LogFormat::Json => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init(),
        LogFormat::Pretty => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }
}

async fn aws_stores(config: &Config) -> (SharedCatalogStore, SharedBlobStore) {
    let mut loader = aws_config::defaults(BehaviorVersion::latest());
    if let Some(region) = &config.region {
        loader = loader.region(Region::new(region.clone()));
    }
    let sdk_config = loader.load().await;

    let mut dynamo = aws_sdk_dynamodb::config::Builder::from(&sdk_config).retry_config(
        aws_sdk_dynamodb::config::retry::RetryConfig::standard()
            .with_max_attempts(config.catalog.max_attempts),
    );
    if let Some(endpoint) = &config.catalog.endpoint_url {
        dynamo = dynamo.endpoint_url(endpoint);
    }
    let catalog = DynamoCatalog::new(
        aws_sdk_dynamodb::Client::from_conf(dynamo.build()),
        config.catalog.table_name.clone(),
    );

    // Uploads retry on their own schedule
    let mut s3 = aws_sdk_s3::config::Builder::from(&sdk_config)
        .retry_config(aws_sdk_s3::config::retry::RetryConfig::disabled());
    if let Some(endpoint) = &config.media.endpoint_url {
        s3 = s3.endpoint_url(endpoint).force_path_style(true);
    }
    let blobs = S3BlobStore::new(
        aws_sdk_s3::Client::from_conf(s3.build()),
        config.media.bucket.clone(),
    );

    (Arc::new(catalog), Arc::new(blobs))
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutdown signal received");
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(&args.log_level, args.log_format);

    let config = args.to_config();
    config.validate().context("Invalid configuration")?;

    let (catalog, blobs): (SharedCatalogStore, SharedBlobStore) = match config.backend {
        Backend::Aws => aws_stores(&config).await,
        Backend::Memory => (
            Arc::new(MemoryCatalog::new()),
            Arc::new(MemoryBlobStore::new("podserve", args.memory_base_url.clone())),
        ),
    };

    let http: Arc<dyn HttpClient> = Arc::new(
        ReqwestClient::with_timeout(config.ingest.download_timeout)
            .context("Failed to build HTTP client")?,
    );

    let app = build_router(AppState::new(&config, catalog, blobs, http));

    let listener = tokio::net::TcpListener::bind(config.server.listen)
        .await
        .with_context(|| format!("Failed to bind {}", config.server.listen))?;

    info!(
        listen = %config.server.listen,
        backend = ?config.backend,
        "Serving podcast catalog"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    Ok(())
}
