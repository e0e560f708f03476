// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::sync::Arc;

use serde::Deserialize;
use sha2::{Digest, Sha256};
use tracing::{debug, info};
use uuid::Uuid;

use super::feed::{FeedItem, fetch_feed};
use crate::catalog::SharedCatalogStore;
use crate::episode::{Episode, EpisodeStatus, Projection};
use crate::error::ImportError;
use crate::http::HttpClient;

/// Body of an import request; either part may be left out
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ImportRequest {
    #[serde(default)]
    pub import_episode: Option<ImportEpisode>,
    #[serde(default)]
    pub import_rss_feed: Option<ImportRssFeed>,
}

/// A single episode described directly by the client
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ImportEpisode {
    /// Generated when absent
    pub id: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub podcast: Option<String>,
    pub url: Option<String>,
    /// Needed only when the download will not reveal the type
    pub content_type: Option<String>,
}

/// An RSS feed whose newest items should be imported
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ImportRssFeed {
    /// Podcast name for the imported episodes; the channel title otherwise
    pub title: Option<String>,
    pub url: Option<String>,
    /// 0 takes the configured maximum
    pub max_num_episodes: usize,
}

/// Result of an import request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportOutcome {
    /// Nothing to import was found in the request
    Empty,
    /// Every candidate is already in the catalog and has not failed
    AlreadyImported,
    /// These episodes were written to the catalog as pending
    Imported(Vec<Episode>),
}

/// Turns import requests into pending catalog entries
pub struct EpisodeImporter {
    client: Arc<dyn HttpClient>,
    catalog: SharedCatalogStore,
    max_feed_episodes: usize,
}

impl EpisodeImporter {
    pub fn new(
        client: Arc<dyn HttpClient>,
        catalog: SharedCatalogStore,
        max_feed_episodes: usize,
    ) -> Self {
        Self {
            client,
            catalog,
            max_feed_episodes,
        }
    }

    pub async fn import(&self, request: ImportRequest) -> Result<ImportOutcome, ImportError> {
        let mut candidates = Vec::new();

        if let Some(single) = request.import_episode {
            candidates.push(single_episode(single)?);
        }
        if let Some(feed) = request.import_rss_feed {
            candidates.extend(self.feed_episodes(feed).await?);
        }

        if candidates.is_empty() {
            return Ok(ImportOutcome::Empty);
        }

        let fresh = self.drop_known(candidates).await?;
        if fresh.is_empty() {
            return Ok(ImportOutcome::AlreadyImported);
        }

        for episode in &fresh {
            self.catalog.put_item(episode).await?;
        }
        info!(count = fresh.len(), "Imported episodes");

        Ok(ImportOutcome::Imported(fresh))
    }

    async fn feed_episodes(&self, feed: ImportRssFeed) -> Result<Vec<Episode>, ImportError> {
        let url = required(feed.url, "url")?;
        let channel = fetch_feed(self.client.as_ref(), &url).await?;
        debug!(%url, items = channel.items.len(), "Fetched feed for import");

        let podcast = feed
            .title
            .filter(|title| !title.trim().is_empty())
            .unwrap_or(channel.title);

        let limit = item_limit(feed.max_num_episodes, self.max_feed_episodes);
        let items = channel.items.into_iter().take(limit.unwrap_or(usize::MAX));

        Ok(items.map(|item| feed_episode(item, &podcast)).collect())
    }

    /// Keep episodes that are new to the catalog or whose last run failed
    async fn drop_known(&self, candidates: Vec<Episode>) -> Result<Vec<Episode>, ImportError> {
        let mut fresh = Vec::with_capacity(candidates.len());

        for episode in candidates {
            let existing = self
                .catalog
                .get_item(&episode.id, Projection::Describe)
                .await?;
            match existing {
                Some(known) if known.status != Some(EpisodeStatus::Failure) => {
                    debug!(episode_id = %episode.id, "Skipping already imported episode");
                }
                _ => fresh.push(episode),
            }
        }

        Ok(fresh)
    }
}

fn required(value: Option<String>, field: &'static str) -> Result<String, ImportError> {
    value
        .filter(|value| !value.trim().is_empty())
        .ok_or(ImportError::MissingField { field })
}

fn single_episode(request: ImportEpisode) -> Result<Episode, ImportError> {
    let title = required(request.title, "title")?;
    let url = required(request.url, "url")?;
    let id = request
        .id
        .filter(|id| !id.is_empty())
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    Ok(Episode {
        title: Some(title),
        description: request.description,
        podcast: request.podcast,
        media_url: Some(url),
        media_content_type: request.content_type,
        status: Some(EpisodeStatus::Pending),
        ..Episode::new(id)
    })
}

fn feed_episode(item: FeedItem, podcast: &str) -> Episode {
    let id = feed_episode_id(item.identity());
    Episode {
        title: item.title,
        description: item.description,
        podcast: Some(podcast.to_string()),
        published: item.published,
        media_url: Some(String::from(item.enclosure_url)),
        media_content_type: item.enclosure_type,
        status: Some(EpisodeStatus::Pending),
        ..Episode::new(id)
    }
}

/// Feed guids are opaque, so the catalog id is their SHA-256 in hex
fn feed_episode_id(identity: &str) -> String {
    format!("{:x}", Sha256::digest(identity.as_bytes()))
}

/// How many feed items to take; `None` means all of them
///
/// A zero on either side leaves that side unbounded.
fn item_limit(requested: usize, configured: usize) -> Option<usize> {
    match (requested, configured) {
        (0, 0) => None,
        (0, max) => Some(max),
        (ask, 0) => Some(ask),
        (ask, max) => Some(ask.min(max)),
    }
}
