// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

pub mod api;
pub mod catalog;
pub mod config;
pub mod episode;
pub mod error;
pub mod http;
pub mod ingest;
pub mod media;

// Re-export main types for convenience
pub use api::{ApiError, AppState, build_router};
pub use catalog::{
    CatalogReader, CatalogStore, DynamoCatalog, MemoryCatalog, Predicate, SharedCatalogStore,
    build_filter,
};
pub use config::{Backend, Config, IngestConfig, RetryPolicy, WaitPolicy};
pub use episode::{Attribute, Episode, EpisodeStatus, Projection};
pub use error::{
    BlobError, CatalogError, Classify, ConfigError, DownloadError, ErrorKind, FeedError,
    FilterError, ImportError, IngestError, MediaError,
};
pub use http::{HttpClient, HttpResponse, ReqwestClient};
pub use ingest::{EpisodeImporter, ImportOutcome, ImportRequest, IngestionPipeline};
pub use media::{BlobStore, ContentKind, MediaLocator, MemoryBlobStore, S3BlobStore, SharedBlobStore};
