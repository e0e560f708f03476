// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! HTTP surface of the service

mod error;
mod handlers;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post, put};
use tower_http::trace::TraceLayer;

use crate::catalog::{CatalogReader, SharedCatalogStore};
use crate::config::Config;
use crate::http::HttpClient;
use crate::ingest::{EpisodeImporter, IngestionPipeline};
use crate::media::{MediaLocator, SharedBlobStore};

pub use error::ApiError;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub catalog: SharedCatalogStore,
    pub reader: CatalogReader,
    pub locator: Arc<MediaLocator>,
    pub pipeline: Arc<IngestionPipeline>,
    pub importer: Arc<EpisodeImporter>,
    pub key_prefix: Arc<str>,
}

impl AppState {
    /// Wire every component from validated configuration and the chosen stores
    pub fn new(
        config: &Config,
        catalog: SharedCatalogStore,
        blobs: SharedBlobStore,
        http: Arc<dyn HttpClient>,
    ) -> Self {
        let key_prefix = config.media.key_prefix.as_str();

        Self {
            reader: CatalogReader::new(Arc::clone(&catalog)),
            locator: Arc::new(MediaLocator::new(Arc::clone(&blobs), config.media.wait)),
            pipeline: Arc::new(IngestionPipeline::new(
                Arc::clone(&http),
                blobs,
                key_prefix,
                config.ingest.clone(),
            )),
            importer: Arc::new(EpisodeImporter::new(
                http,
                Arc::clone(&catalog),
                config.ingest.max_feed_episodes,
            )),
            key_prefix: Arc::from(key_prefix),
            catalog,
        }
    }
}

/// Build the router.
///
/// - `GET  /podcast`              list episodes (`podcast`, `in-title`)
/// - `POST /podcast`              import episodes or an RSS feed
/// - `POST /podcast/ingest`       download and store an episode's media
/// - `GET  /podcast/{id}`         describe one episode
/// - `GET  /podcast/{id}/play`    redirect to the episode's media (`content`)
/// - `PUT  /podcast/{id}/status`  set the processing status
/// - `GET  /healthz`              liveness
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route(
            "/podcast",
            get(handlers::list_episodes).post(handlers::import_episodes),
        )
        .route("/podcast/ingest", post(handlers::ingest_episode))
        .route("/podcast/{id}", get(handlers::get_episode))
        .route("/podcast/{id}/play", get(handlers::play_episode))
        .route("/podcast/{id}/status", put(handlers::update_status))
        .route("/healthz", get(handlers::healthz))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
