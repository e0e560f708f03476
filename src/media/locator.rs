// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;
use tokio::time::{Instant, sleep};
use tracing::{debug, warn};

use super::SharedBlobStore;
use crate::config::WaitPolicy;
use crate::error::MediaError;

/// Lifetime of every issued access URL
pub const ACCESS_URL_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// A time-limited, read-only URL for one stored object
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccessUrl {
    pub url: String,
    pub expires_at: DateTime<Utc>,
}

/// Waits for stored media to appear and signs access URLs for it
pub struct MediaLocator {
    store: SharedBlobStore,
    policy: WaitPolicy,
}

impl MediaLocator {
    pub fn new(store: SharedBlobStore, policy: WaitPolicy) -> Self {
        Self { store, policy }
    }

    /// Wait until `key` exists, then issue an access URL valid for 24 hours
    ///
    /// Polling stops at the configured timeout with `MediaNotFound`. Failed
    /// existence checks back off exponentially and are surfaced once
    /// `max_failures` of them happen in a row.
    pub async fn locate(&self, key: &str) -> Result<AccessUrl, MediaError> {
        self.wait_for(key).await?;

        let issued_at = Utc::now();
        let url = self.store.presign_get(key, ACCESS_URL_TTL).await?;
        debug!(key, "Issued media access URL");

        Ok(AccessUrl {
            url,
            expires_at: issued_at + TimeDelta::seconds(ACCESS_URL_TTL.as_secs() as i64),
        })
    }

    async fn wait_for(&self, key: &str) -> Result<(), MediaError> {
        let started = Instant::now();
        let deadline = started + self.policy.timeout;
        let mut failures: u32 = 0;

        loop {
            let delay = match self.store.exists(key).await {
                Ok(true) => return Ok(()),
                Ok(false) => {
                    failures = 0;
                    self.policy.poll_interval
                }
                Err(err) => {
                    failures += 1;
                    if failures >= self.policy.max_failures {
                        return Err(err.into());
                    }
                    warn!(key, failures, error = %err, "Media existence check failed");
                    self.policy
                        .poll_interval
                        .saturating_mul(1 << (failures - 1).min(16))
                }
            };

            let now = Instant::now();
            if now >= deadline {
                return Err(MediaError::MediaNotFound {
                    key: key.to_string(),
                    waited: now - started,
                });
            }
            sleep(delay.min(deadline - now)).await;
        }
    }
}
