// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Media variants, blob storage and time-limited access URLs

mod kind;
mod locator;
mod memory;
mod s3;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::BlobError;

pub use kind::{ContentKind, MediaVariant};
pub use locator::{ACCESS_URL_TTL, AccessUrl, MediaLocator};
pub use memory::{MemoryBlobStore, StoredObject};
pub use s3::S3BlobStore;

/// Object store bound to a single bucket
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Write an object, replacing any previous content under the same key
    async fn put(&self, key: &str, body: Bytes, content_type: &str) -> Result<(), BlobError>;

    /// Check whether an object exists without fetching it
    async fn exists(&self, key: &str) -> Result<bool, BlobError>;

    /// Sign a read-only URL for one object, valid for `ttl`
    ///
    /// Signing is local and does not contact the store.
    async fn presign_get(&self, key: &str, ttl: Duration) -> Result<String, BlobError>;
}

/// A blob store shared across request handlers
pub type SharedBlobStore = Arc<dyn BlobStore>;
