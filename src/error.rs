// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::time::Duration;

use thiserror::Error;

/// Broad failure categories a caller can react to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing or malformed request input
    Validation,
    /// Episode or media object absent
    NotFound,
    /// Store throttling; the caller should slow down
    CapacityExceeded,
    /// Download, upload or transport failure
    Upstream,
    /// Ingestion could not determine a MIME type
    UnknownContentType,
}

/// Errors that can be sorted into an [`ErrorKind`]
pub trait Classify {
    fn kind(&self) -> ErrorKind;
}

/// Errors that can occur when building a catalog filter from query parameters
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FilterError {
    #[error("Filter parameter '{key}' requires a non-empty value")]
    UnsupportedFilter { key: String },
}

impl Classify for FilterError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Validation
    }
}

/// Errors that can occur when reading from or writing to the episode catalog
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Episode '{id}' not found")]
    EpisodeNotFound { id: String },

    #[error("Catalog capacity exceeded during {operation}: {message}")]
    CapacityExceeded {
        operation: &'static str,
        message: String,
    },

    #[error("Catalog {operation} failed: {message}")]
    Unavailable {
        operation: &'static str,
        message: String,
    },

    #[error("Malformed catalog item: {reason}")]
    InvalidItem { reason: String },
}

impl Classify for CatalogError {
    fn kind(&self) -> ErrorKind {
        match self {
            CatalogError::EpisodeNotFound { .. } => ErrorKind::NotFound,
            CatalogError::CapacityExceeded { .. } => ErrorKind::CapacityExceeded,
            CatalogError::Unavailable { .. } | CatalogError::InvalidItem { .. } => {
                ErrorKind::Upstream
            }
        }
    }
}

/// Errors reported by a blob store backend
#[derive(Error, Debug)]
pub enum BlobError {
    #[error("Blob store throttled {operation} for {key}: {message}")]
    Throttled {
        operation: &'static str,
        key: String,
        message: String,
    },

    #[error("Blob store {operation} failed for {key}: {message}")]
    RequestFailed {
        operation: &'static str,
        key: String,
        message: String,
    },

    #[error("Failed to presign access URL for {key}: {message}")]
    PresignFailed { key: String, message: String },
}

impl BlobError {
    pub fn is_throttled(&self) -> bool {
        matches!(self, BlobError::Throttled { .. })
    }
}

impl Classify for BlobError {
    fn kind(&self) -> ErrorKind {
        if self.is_throttled() {
            ErrorKind::CapacityExceeded
        } else {
            ErrorKind::Upstream
        }
    }
}

/// Errors that can occur when resolving or locating episode media
#[derive(Error, Debug)]
pub enum MediaError {
    #[error("Unknown content kind '{value}', expected 'media' or 'text'")]
    InvalidContentKind { value: String },

    #[error("Media object {key} not available after {waited:?}")]
    MediaNotFound { key: String, waited: Duration },

    #[error("Media store error: {0}")]
    Store(#[from] BlobError),
}

impl Classify for MediaError {
    fn kind(&self) -> ErrorKind {
        match self {
            MediaError::InvalidContentKind { .. } => ErrorKind::Validation,
            MediaError::MediaNotFound { .. } => ErrorKind::NotFound,
            MediaError::Store(e) => e.kind(),
        }
    }
}

/// Errors that can occur while downloading source media
#[derive(Error, Debug)]
pub enum DownloadError {
    #[error("HTTP request failed for {url}: {source}")]
    HttpFailed {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("HTTP error {status} for {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("Stream error while downloading {url}: {source}")]
    StreamFailed {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Media at {url} exceeds the {limit} byte limit")]
    TooLarge { url: String, limit: u64 },
}

/// Errors that can occur while ingesting episode media
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Episode is missing required field '{field}'")]
    MissingField { field: &'static str },

    #[error("Invalid media URL '{url}': {source}")]
    InvalidMediaUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("Download failed: {0}")]
    Download(#[from] DownloadError),

    #[error("Unable to determine content type for {url}")]
    UnknownContentType { url: String },

    #[error("Upload of {key} failed after {attempts} attempts: {source}")]
    UploadFailed {
        key: String,
        attempts: u32,
        #[source]
        source: BlobError,
    },

    #[error("Upload of {key} throttled after {attempts} attempts: {source}")]
    CapacityExceeded {
        key: String,
        attempts: u32,
        #[source]
        source: BlobError,
    },
}

impl Classify for IngestError {
    fn kind(&self) -> ErrorKind {
        match self {
            IngestError::MissingField { .. } | IngestError::InvalidMediaUrl { .. } => {
                ErrorKind::Validation
            }
            IngestError::Download(_) | IngestError::UploadFailed { .. } => ErrorKind::Upstream,
            IngestError::UnknownContentType { .. } => ErrorKind::UnknownContentType,
            IngestError::CapacityExceeded { .. } => ErrorKind::CapacityExceeded,
        }
    }
}

/// Errors that can occur when fetching or parsing RSS feeds
#[derive(Error, Debug)]
pub enum FeedError {
    #[error("Failed to fetch feed from {url}: {source}")]
    FetchFailed {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Failed to parse RSS feed: {0}")]
    ParseFailed(#[from] rss::Error),

    #[error("Invalid feed URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Feed item '{title}' has no enclosure (audio file)")]
    MissingEnclosure { title: String },
}

impl Classify for FeedError {
    fn kind(&self) -> ErrorKind {
        match self {
            FeedError::InvalidUrl(_) => ErrorKind::Validation,
            _ => ErrorKind::Upstream,
        }
    }
}

/// Errors that can occur when importing new episodes into the catalog
#[derive(Error, Debug)]
pub enum ImportError {
    #[error("Import request is missing required field '{field}'")]
    MissingField { field: &'static str },

    #[error("Feed error: {0}")]
    Feed(#[from] FeedError),

    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),
}

impl Classify for ImportError {
    fn kind(&self) -> ErrorKind {
        match self {
            ImportError::MissingField { .. } => ErrorKind::Validation,
            ImportError::Feed(e) => e.kind(),
            ImportError::Catalog(e) => e.kind(),
        }
    }
}

/// Errors found while validating configuration at startup
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Configuration value '{field}' {reason}")]
    Invalid { field: &'static str, reason: String },

    #[error("Unknown backend '{0}', expected 'aws' or 'memory'")]
    UnknownBackend(String),
}
