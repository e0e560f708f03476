// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

/// States an ingestion run moves through
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestStage {
    Downloading,
    TypeResolving,
    Uploading,
    Persisting,
    Done,
}

impl IngestStage {
    pub fn as_str(self) -> &'static str {
        match self {
            IngestStage::Downloading => "downloading",
            IngestStage::TypeResolving => "type_resolving",
            IngestStage::Uploading => "uploading",
            IngestStage::Persisting => "persisting",
            IngestStage::Done => "done",
        }
    }
}

impl fmt::Display for IngestStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Events emitted while an episode's media is ingested
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestEvent {
    /// The pipeline moved into a new stage
    StageEntered {
        episode_id: String,
        stage: IngestStage,
    },

    /// More of the source media has been received
    DownloadProgress {
        episode_id: String,
        bytes_downloaded: u64,
        /// Expected content length in bytes, if known
        total_bytes: Option<u64>,
    },

    /// An upload attempt failed and will be retried after `backoff`
    UploadRetrying {
        episode_id: String,
        attempt: u32,
        backoff: Duration,
        error: String,
    },

    /// Media is stored and the metadata merged
    Completed {
        episode_id: String,
        media_key: String,
        content_type: String,
        bytes: u64,
    },

    /// The pipeline stopped in `stage`
    Failed {
        episode_id: String,
        stage: IngestStage,
        error: String,
    },
}

/// Receives ingestion events.
///
/// Implementations may log them, collect them for tests, or forward them
/// elsewhere.
pub trait IngestReporter: Send + Sync {
    fn report(&self, event: IngestEvent);
}

/// A shared reference to an ingestion reporter
pub type SharedIngestReporter = Arc<dyn IngestReporter>;

/// Drops every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopReporter;

impl IngestReporter for NoopReporter {
    fn report(&self, _event: IngestEvent) {}
}

impl NoopReporter {
    pub fn shared() -> SharedIngestReporter {
        Arc::new(Self)
    }
}

/// Writes events to the `tracing` log
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl TracingReporter {
    pub fn shared() -> SharedIngestReporter {
        Arc::new(Self)
    }
}

impl IngestReporter for TracingReporter {
    fn report(&self, event: IngestEvent) {
        match event {
            IngestEvent::StageEntered { episode_id, stage } => {
                debug!(%episode_id, %stage, "Ingestion stage entered");
            }
            IngestEvent::DownloadProgress {
                episode_id,
                bytes_downloaded,
                total_bytes,
            } => {
                debug!(%episode_id, bytes_downloaded, ?total_bytes, "Download progress");
            }
            IngestEvent::UploadRetrying {
                episode_id,
                attempt,
                backoff,
                error,
            } => {
                warn!(
                    %episode_id,
                    attempt,
                    backoff_ms = backoff.as_millis() as u64,
                    %error,
                    "Retrying media upload"
                );
            }
            IngestEvent::Completed {
                episode_id,
                media_key,
                content_type,
                bytes,
            } => {
                info!(%episode_id, %media_key, %content_type, bytes, "Episode media ingested");
            }
            IngestEvent::Failed {
                episode_id,
                stage,
                error,
            } => {
                warn!(%episode_id, %stage, %error, "Episode ingestion failed");
            }
        }
    }
}
