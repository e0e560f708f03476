// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use tokio::sync::RwLock;

use super::BlobStore;
use crate::error::BlobError;

/// An object held by [`MemoryBlobStore`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub body: Bytes,
    pub content_type: String,
}

/// Process-local blob store for development runs and tests
///
/// Access URLs point at `{base_url}/{bucket}/{key}` and carry the expiry as
/// a unix timestamp; nothing serves them.
pub struct MemoryBlobStore {
    bucket: String,
    base_url: String,
    objects: RwLock<HashMap<String, StoredObject>>,
}

impl MemoryBlobStore {
    pub fn new(bucket: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            objects: RwLock::new(HashMap::new()),
        }
    }

    pub async fn get(&self, key: &str) -> Option<StoredObject> {
        self.objects.read().await.get(key).cloned()
    }

    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.objects.read().await.is_empty()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(&self, key: &str, body: Bytes, content_type: &str) -> Result<(), BlobError> {
        let object = StoredObject {
            body,
            content_type: content_type.to_string(),
        };
        self.objects.write().await.insert(key.to_string(), object);
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool, BlobError> {
        Ok(self.objects.read().await.contains_key(key))
    }

    async fn presign_get(&self, key: &str, ttl: Duration) -> Result<String, BlobError> {
        let expires = Utc::now().timestamp().saturating_add(ttl.as_secs() as i64);
        Ok(format!(
            "{}/{}/{}?expires={}",
            self.base_url, self.bucket, key, expires
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_overwrites_previous_content() {
        let store = MemoryBlobStore::new("bucket", "http://localhost/");

        store
            .put("k", Bytes::from_static(b"old"), "audio/mpeg")
            .await
            .unwrap();
        store
            .put("k", Bytes::from_static(b"new"), "audio/mp4")
            .await
            .unwrap();

        let stored = store.get("k").await.unwrap();
        assert_eq!(stored.body, Bytes::from_static(b"new"));
        assert_eq!(stored.content_type, "audio/mp4");
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn exists_reflects_contents() {
        let store = MemoryBlobStore::new("bucket", "http://localhost");
        assert!(!store.exists("k").await.unwrap());

        store.put("k", Bytes::new(), "text/plain").await.unwrap();
        assert!(store.exists("k").await.unwrap());
    }

    #[tokio::test]
    async fn presigned_url_embeds_expiry() {
        let store = MemoryBlobStore::new("bucket", "http://localhost/");
        let now = Utc::now().timestamp();

        let url = store
            .presign_get("podcasts/e1/raw-media", Duration::from_secs(60))
            .await
            .unwrap();

        let (path, expires) = url.split_once("?expires=").unwrap();
        assert_eq!(path, "http://localhost/bucket/podcasts/e1/raw-media");
        let expires: i64 = expires.parse().unwrap();
        assert!(expires >= now + 60 && expires <= now + 61);
    }
}
