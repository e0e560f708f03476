// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::sync::Arc;

use bytes::{Bytes, BytesMut};
use futures::StreamExt;
use url::Url;

use super::content_type::resolve_content_type;
use super::progress::{
    IngestEvent, IngestStage, NoopReporter, SharedIngestReporter, TracingReporter,
};
use crate::config::IngestConfig;
use crate::episode::Episode;
use crate::error::{DownloadError, IngestError};
use crate::http::HttpClient;
use crate::media::{ContentKind, SharedBlobStore};

/// Source media held in memory between download and upload
struct Downloaded {
    body: Bytes,
    content_type: Option<String>,
}

impl IngestError {
    /// The pipeline stage in which this error stops an ingestion run
    pub fn stage(&self) -> IngestStage {
        match self {
            IngestError::MissingField { .. }
            | IngestError::InvalidMediaUrl { .. }
            | IngestError::Download(_) => IngestStage::Downloading,
            IngestError::UnknownContentType { .. } => IngestStage::TypeResolving,
            IngestError::UploadFailed { .. } | IngestError::CapacityExceeded { .. } => {
                IngestStage::Uploading
            }
        }
    }
}

/// Downloads an episode's source media, stores it under the episode's media
/// key and returns the episode with content type and key filled in
///
/// Writing the returned episode to the catalog is left to the caller.
pub struct IngestionPipeline {
    client: Arc<dyn HttpClient>,
    store: SharedBlobStore,
    key_prefix: String,
    config: IngestConfig,
    reporter: SharedIngestReporter,
}

impl IngestionPipeline {
    pub fn new(
        client: Arc<dyn HttpClient>,
        store: SharedBlobStore,
        key_prefix: impl Into<String>,
        config: IngestConfig,
    ) -> Self {
        let reporter = if config.report_events {
            TracingReporter::shared()
        } else {
            NoopReporter::shared()
        };

        Self {
            client,
            store,
            key_prefix: key_prefix.into(),
            config,
            reporter,
        }
    }

    /// Replace the reporter chosen from the configuration
    pub fn with_reporter(mut self, reporter: SharedIngestReporter) -> Self {
        self.reporter = reporter;
        self
    }

    /// Run the pipeline for one episode
    ///
    /// Re-running for the same id overwrites the object at the same key.
    pub async fn ingest(&self, episode: Episode) -> Result<Episode, IngestError> {
        let episode_id = episode.id.clone();

        let result = self.run(episode).await;
        if let Err(err) = &result {
            self.reporter.report(IngestEvent::Failed {
                episode_id,
                stage: err.stage(),
                error: err.to_string(),
            });
        }
        result
    }

    async fn run(&self, mut episode: Episode) -> Result<Episode, IngestError> {
        if episode.id.is_empty() {
            return Err(IngestError::MissingField { field: "id" });
        }
        let media_url = episode
            .media_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .ok_or(IngestError::MissingField { field: "media_url" })?;
        let source = Url::parse(media_url).map_err(|source| IngestError::InvalidMediaUrl {
            url: media_url.to_string(),
            source,
        })?;

        self.enter(&episode.id, IngestStage::Downloading);
        let downloaded = self.download(&episode.id, &source).await?;

        self.enter(&episode.id, IngestStage::TypeResolving);
        let content_type = resolve_content_type(
            episode.media_content_type.as_deref(),
            downloaded.content_type.as_deref(),
            &source,
        )
        .ok_or_else(|| IngestError::UnknownContentType {
            url: source.to_string(),
        })?;

        self.enter(&episode.id, IngestStage::Uploading);
        let key = ContentKind::Media.storage_key(&episode.id, &self.key_prefix);
        let bytes = downloaded.body.len() as u64;
        self.upload(&episode.id, &key, downloaded.body, &content_type)
            .await?;

        self.enter(&episode.id, IngestStage::Persisting);
        episode.media_content_type = Some(content_type.clone());
        episode.media_key = Some(key.clone());

        self.enter(&episode.id, IngestStage::Done);
        self.reporter.report(IngestEvent::Completed {
            episode_id: episode.id.clone(),
            media_key: key,
            content_type,
            bytes,
        });

        Ok(episode)
    }

    fn enter(&self, episode_id: &str, stage: IngestStage) {
        self.reporter.report(IngestEvent::StageEntered {
            episode_id: episode_id.to_string(),
            stage,
        });
    }

    /// Stream the source into memory, enforcing the size limit as bytes arrive
    async fn download(&self, episode_id: &str, source: &Url) -> Result<Downloaded, DownloadError> {
        let url = source.as_str();
        let limit = self.config.max_media_bytes;
        let too_large = || DownloadError::TooLarge {
            url: url.to_string(),
            limit,
        };

        let response = self
            .client
            .get_stream(url)
            .await
            .map_err(|e| DownloadError::HttpFailed {
                url: url.to_string(),
                source: e,
            })?;

        if response.status >= 400 {
            return Err(DownloadError::HttpStatus {
                url: url.to_string(),
                status: response.status,
            });
        }
        if response.content_length.is_some_and(|len| len > limit) {
            return Err(too_large());
        }

        let mut buffer = BytesMut::new();
        let mut stream = response.body;

        while let Some(chunk_result) = stream.next().await {
            let chunk = chunk_result.map_err(|e| DownloadError::StreamFailed {
                url: url.to_string(),
                source: e,
            })?;

            if (buffer.len() + chunk.len()) as u64 > limit {
                return Err(too_large());
            }
            buffer.extend_from_slice(&chunk);

            self.reporter.report(IngestEvent::DownloadProgress {
                episode_id: episode_id.to_string(),
                bytes_downloaded: buffer.len() as u64,
                total_bytes: response.content_length,
            });
        }

        Ok(Downloaded {
            body: buffer.freeze(),
            content_type: response.content_type,
        })
    }

    /// Put with bounded retry; a throttled final attempt maps to `CapacityExceeded`
    async fn upload(
        &self,
        episode_id: &str,
        key: &str,
        body: Bytes,
        content_type: &str,
    ) -> Result<(), IngestError> {
        let policy = self.config.upload_retry;
        let mut attempt: u32 = 1;

        loop {
            match self.store.put(key, body.clone(), content_type).await {
                Ok(()) => return Ok(()),
                Err(err) if attempt >= policy.max_attempts => {
                    let key = key.to_string();
                    return Err(if err.is_throttled() {
                        IngestError::CapacityExceeded {
                            key,
                            attempts: attempt,
                            source: err,
                        }
                    } else {
                        IngestError::UploadFailed {
                            key,
                            attempts: attempt,
                            source: err,
                        }
                    });
                }
                Err(err) => {
                    let backoff = policy.backoff(attempt);
                    self.reporter.report(IngestEvent::UploadRetrying {
                        episode_id: episode_id.to_string(),
                        attempt,
                        backoff,
                        error: err.to_string(),
                    });
                    tokio::time::sleep(backoff).await;
                    attempt += 1;
                }
            }
        }
    }
}
