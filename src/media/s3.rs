// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::config::http::HttpResponse;
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use bytes::Bytes;

use super::BlobStore;
use crate::error::BlobError;

/// Blob store backed by one S3 bucket
pub struct S3BlobStore {
    client: Client,
    bucket: String,
}

impl S3BlobStore {
    pub fn new(client: Client, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
        }
    }
}

#[async_trait]
impl BlobStore for S3BlobStore {
    async fn put(&self, key: &str, body: Bytes, content_type: &str) -> Result<(), BlobError> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(body))
            .content_type(content_type)
            .send()
            .await
            .map_err(|err| classify("PutObject", key, err))?;

        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool, BlobError> {
        match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(err) if err.as_service_error().is_some_and(|e| e.is_not_found()) => Ok(false),
            Err(err) => Err(classify("HeadObject", key, err)),
        }
    }

    async fn presign_get(&self, key: &str, ttl: Duration) -> Result<String, BlobError> {
        let presign_failed = |message: String| BlobError::PresignFailed {
            key: key.to_string(),
            message,
        };

        let config = PresigningConfig::expires_in(ttl)
            .map_err(|err| presign_failed(DisplayErrorContext(&err).to_string()))?;

        let request = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(config)
            .await
            .map_err(|err| presign_failed(DisplayErrorContext(&err).to_string()))?;

        Ok(request.uri().to_string())
    }
}

fn classify<E>(operation: &'static str, key: &str, err: SdkError<E, HttpResponse>) -> BlobError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
{
    let code = err.as_service_error().and_then(|e| e.code());
    let status = err.raw_response().map(|response| response.status().as_u16());
    let throttled = is_throttled(code, status);
    let message = DisplayErrorContext(&err).to_string();

    if throttled {
        BlobError::Throttled {
            operation,
            key: key.to_string(),
            message,
        }
    } else {
        BlobError::RequestFailed {
            operation,
            key: key.to_string(),
            message,
        }
    }
}

fn is_throttled(code: Option<&str>, status: Option<u16>) -> bool {
    matches!(code, Some("SlowDown" | "ThrottlingException")) || status == Some(503)
}
