// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::collections::BTreeMap;
use std::ops::Bound;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{CatalogStore, ContinuationToken, ScanPage, ScanRequest};
use crate::episode::{Episode, EpisodeStatus, Projection};
use crate::error::CatalogError;

/// Process-local catalog keyed by episode id
///
/// Scans walk the map in id order and cut a page before filtering, so a
/// filtered page may come back short or empty while more data remains.
pub struct MemoryCatalog {
    items: RwLock<BTreeMap<String, Episode>>,
    page_size: usize,
}

impl MemoryCatalog {
    pub const DEFAULT_PAGE_SIZE: usize = 100;

    pub fn new() -> Self {
        Self::with_page_size(Self::DEFAULT_PAGE_SIZE)
    }

    pub fn with_page_size(page_size: usize) -> Self {
        Self {
            items: RwLock::new(BTreeMap::new()),
            page_size: page_size.max(1),
        }
    }

    pub async fn len(&self) -> usize {
        self.items.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.items.read().await.is_empty()
    }
}

impl Default for MemoryCatalog {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CatalogStore for MemoryCatalog {
    async fn get_item(
        &self,
        id: &str,
        projection: Projection,
    ) -> Result<Option<Episode>, CatalogError> {
        let items = self.items.read().await;
        Ok(items.get(id).map(|episode| episode.projected(projection)))
    }

    async fn scan_page(
        &self,
        request: &ScanRequest,
        start: Option<&ContinuationToken>,
    ) -> Result<ScanPage, CatalogError> {
        let items = self.items.read().await;
        let lower = match start {
            Some(token) => Bound::Excluded(token.0.as_str()),
            None => Bound::Unbounded,
        };

        let page: Vec<&Episode> = items
            .range::<str, _>((lower, Bound::Unbounded))
            .map(|(_, episode)| episode)
            .take(self.page_size)
            .collect();

        let next = page.last().and_then(|last| {
            items
                .range::<str, _>((Bound::Excluded(last.id.as_str()), Bound::Unbounded))
                .next()
                .map(|_| ContinuationToken(last.id.clone()))
        });

        let items = page
            .into_iter()
            .filter(|episode| {
                request
                    .predicate
                    .as_ref()
                    .is_none_or(|predicate| predicate.matches(episode))
            })
            .map(|episode| episode.projected(request.projection))
            .collect();

        Ok(ScanPage { items, next })
    }

    async fn put_item(&self, episode: &Episode) -> Result<(), CatalogError> {
        if episode.id.is_empty() {
            return Err(CatalogError::InvalidItem {
                reason: "episode id is empty".to_string(),
            });
        }

        let mut items = self.items.write().await;
        let mut replacement = episode.clone();
        if replacement.status == Some(EpisodeStatus::Unknown) {
            replacement.status = items.get(&episode.id).and_then(|stored| stored.status);
        }
        items.insert(episode.id.clone(), replacement);
        Ok(())
    }

    async fn update_status(&self, id: &str, status: EpisodeStatus) -> Result<(), CatalogError> {
        let mut items = self.items.write().await;
        let episode = items
            .get_mut(id)
            .ok_or_else(|| CatalogError::EpisodeNotFound { id: id.to_string() })?;
        episode.status = Some(status);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Predicate;
    use crate::episode::Attribute;

    fn request(predicate: Option<Predicate>) -> ScanRequest {
        ScanRequest {
            projection: Projection::List,
            predicate,
        }
    }

    async fn catalog_with(ids: &[&str], page_size: usize) -> MemoryCatalog {
        let catalog = MemoryCatalog::with_page_size(page_size);
        for id in ids {
            let episode = Episode {
                title: Some(format!("Episode {id}")),
                podcast: Some("AWS Podcast".to_string()),
                ..Episode::new(*id)
            };
            catalog.put_item(&episode).await.unwrap();
        }
        catalog
    }

    #[tokio::test]
    async fn pages_carry_continuation_until_exhausted() {
        let catalog = catalog_with(&["a", "b", "c"], 2).await;

        let first = catalog.scan_page(&request(None), None).await.unwrap();
        assert_eq!(first.items.len(), 2);
        assert_eq!(first.next, Some(ContinuationToken("b".to_string())));

        let second = catalog
            .scan_page(&request(None), first.next.as_ref())
            .await
            .unwrap();
        assert_eq!(second.items.len(), 1);
        assert_eq!(second.items[0].id, "c");
        assert!(!second.has_more());
    }

    #[tokio::test]
    async fn filter_applies_after_page_is_cut() {
        let catalog = catalog_with(&["a", "b", "c"], 2).await;
        let predicate = Predicate::equals(Attribute::Title, "Episode c");

        let first = catalog
            .scan_page(&request(Some(predicate)), None)
            .await
            .unwrap();
        assert!(first.items.is_empty());
        assert!(first.has_more());
    }

    #[tokio::test]
    async fn update_status_requires_existing_episode() {
        let catalog = catalog_with(&["a"], 10).await;

        catalog
            .update_status("a", EpisodeStatus::Processing)
            .await
            .unwrap();
        let stored = catalog.get_item("a", Projection::Full).await.unwrap().unwrap();
        assert_eq!(stored.status, Some(EpisodeStatus::Processing));

        let err = catalog
            .update_status("missing", EpisodeStatus::Complete)
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::EpisodeNotFound { .. }));
    }

    #[tokio::test]
    async fn put_item_rejects_empty_id() {
        let catalog = MemoryCatalog::new();
        let result = catalog.put_item(&Episode::default()).await;
        assert!(matches!(result, Err(CatalogError::InvalidItem { .. })));
        assert!(catalog.is_empty().await);
    }

    #[tokio::test]
    async fn put_with_unknown_status_keeps_stored_status() {
        let catalog = catalog_with(&["e1"], 10).await;
        catalog
            .update_status("e1", EpisodeStatus::Transcribing)
            .await
            .unwrap();

        let replacement = Episode {
            title: Some("Renamed".to_string()),
            status: Some(EpisodeStatus::Unknown),
            ..Episode::new("e1")
        };
        catalog.put_item(&replacement).await.unwrap();

        let stored = catalog
            .get_item("e1", Projection::Full)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.title.as_deref(), Some("Renamed"));
        assert_eq!(stored.status, Some(EpisodeStatus::Transcribing));
        assert!(stored.podcast.is_none());
    }
}
