// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::sync::Arc;

use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};
use tracing::debug;

use super::{ContinuationToken, Predicate, ScanRequest, SharedCatalogStore};
use crate::episode::{Episode, Projection};
use crate::error::CatalogError;

/// Lazily scanned episodes, fetched page by page as the stream is polled
pub type EpisodeStream = BoxStream<'static, Result<Episode, CatalogError>>;

enum ScanState {
    Start,
    Continue(ContinuationToken),
    Done,
}

/// Read access to the episode catalog
#[derive(Clone)]
pub struct CatalogReader {
    store: SharedCatalogStore,
}

impl CatalogReader {
    pub fn new(store: SharedCatalogStore) -> Self {
        Self { store }
    }

    /// Look up one episode by id
    ///
    /// An empty id is reported as not found without consulting the store.
    pub async fn get_by_id(&self, id: &str, projection: Projection) -> Result<Episode, CatalogError> {
        if id.is_empty() {
            return Err(CatalogError::EpisodeNotFound { id: String::new() });
        }

        self.store
            .get_item(id, projection)
            .await?
            .ok_or_else(|| CatalogError::EpisodeNotFound { id: id.to_string() })
    }

    /// Scan the whole catalog, following continuation tokens until exhausted
    ///
    /// Pages are only requested as the returned stream is consumed. Item order
    /// is whatever the store yields.
    pub fn list_projected(
        &self,
        predicate: Option<Predicate>,
        projection: Projection,
    ) -> EpisodeStream {
        let store = Arc::clone(&self.store);
        let request = Arc::new(ScanRequest {
            projection,
            predicate,
        });

        stream::try_unfold(ScanState::Start, move |state| {
            let store = Arc::clone(&store);
            let request = Arc::clone(&request);
            async move {
                let start = match state {
                    ScanState::Start => None,
                    ScanState::Continue(token) => Some(token),
                    ScanState::Done => return Ok(None),
                };

                let page = store.scan_page(&request, start.as_ref()).await?;
                debug!(
                    items = page.items.len(),
                    more_data = page.has_more(),
                    "Scanned catalog page"
                );

                let next = match page.next {
                    Some(token) => ScanState::Continue(token),
                    None => ScanState::Done,
                };
                Ok::<_, CatalogError>(Some((page.items, next)))
            }
        })
        .map_ok(|items| stream::iter(items.into_iter().map(Ok::<_, CatalogError>)))
        .try_flatten()
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{CatalogStore, MemoryCatalog, ScanPage};
    use crate::episode::{Attribute, EpisodeStatus};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn episode(id: &str, podcast: &str, title: &str) -> Episode {
        Episode {
            title: Some(title.to_string()),
            podcast: Some(podcast.to_string()),
            description: Some(format!("About {title}")),
            status: Some(EpisodeStatus::Complete),
            ..Episode::new(id)
        }
    }

    async fn seeded(page_size: usize) -> Arc<MemoryCatalog> {
        let catalog = Arc::new(MemoryCatalog::with_page_size(page_size));
        for (id, podcast, title) in [
            ("a", "AWS Podcast", "A sample title"),
            ("b", "Other", "Another sample"),
            ("c", "AWS Podcast", "Unrelated"),
            ("d", "AWS Podcast", "sample two"),
            ("e", "Other", "Last one"),
        ] {
            catalog.put_item(&episode(id, podcast, title)).await.unwrap();
        }
        catalog
    }

    /// Counts every call before delegating to the in-memory store
    struct CountingStore {
        inner: MemoryCatalog,
        get_calls: AtomicUsize,
        scan_calls: AtomicUsize,
    }

    #[async_trait]
    impl CatalogStore for CountingStore {
        async fn get_item(
            &self,
            id: &str,
            projection: Projection,
        ) -> Result<Option<Episode>, CatalogError> {
            self.get_calls.fetch_add(1, Ordering::SeqCst);
            self.inner.get_item(id, projection).await
        }

        async fn scan_page(
            &self,
            request: &ScanRequest,
            start: Option<&ContinuationToken>,
        ) -> Result<ScanPage, CatalogError> {
            self.scan_calls.fetch_add(1, Ordering::SeqCst);
            self.inner.scan_page(request, start).await
        }

        async fn put_item(&self, episode: &Episode) -> Result<(), CatalogError> {
            self.inner.put_item(episode).await
        }

        async fn update_status(
            &self,
            id: &str,
            status: EpisodeStatus,
        ) -> Result<(), CatalogError> {
            self.inner.update_status(id, status).await
        }
    }

    fn counting(page_size: usize) -> Arc<CountingStore> {
        Arc::new(CountingStore {
            inner: MemoryCatalog::with_page_size(page_size),
            get_calls: AtomicUsize::new(0),
            scan_calls: AtomicUsize::new(0),
        })
    }

    struct ThrottledStore;

    #[async_trait]
    impl CatalogStore for ThrottledStore {
        async fn get_item(&self, _: &str, _: Projection) -> Result<Option<Episode>, CatalogError> {
            Err(CatalogError::CapacityExceeded {
                operation: "GetItem",
                message: "ProvisionedThroughputExceededException".to_string(),
            })
        }

        async fn scan_page(
            &self,
            _: &ScanRequest,
            _: Option<&ContinuationToken>,
        ) -> Result<ScanPage, CatalogError> {
            Err(CatalogError::CapacityExceeded {
                operation: "Scan",
                message: "ProvisionedThroughputExceededException".to_string(),
            })
        }

        async fn put_item(&self, _: &Episode) -> Result<(), CatalogError> {
            Ok(())
        }

        async fn update_status(&self, _: &str, _: EpisodeStatus) -> Result<(), CatalogError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn get_by_id_applies_projection() {
        let reader = CatalogReader::new(seeded(10).await);

        let found = reader.get_by_id("a", Projection::Describe).await.unwrap();
        assert_eq!(found.id, "a");
        assert_eq!(found.status, Some(EpisodeStatus::Complete));
        assert_eq!(found.description.as_deref(), Some("About A sample title"));
    }

    #[tokio::test]
    async fn get_by_id_reports_missing_episode() {
        let reader = CatalogReader::new(seeded(10).await);

        let err = reader.get_by_id("zzz", Projection::Describe).await.unwrap_err();
        assert!(matches!(err, CatalogError::EpisodeNotFound { id } if id == "zzz"));
    }

    #[tokio::test]
    async fn empty_id_never_reaches_the_store() {
        let store = counting(10);
        let reader = CatalogReader::new(store.clone());

        let err = reader.get_by_id("", Projection::Describe).await.unwrap_err();
        assert!(matches!(err, CatalogError::EpisodeNotFound { .. }));
        assert_eq!(store.get_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn list_follows_every_page() {
        let store = counting(2);
        for (id, podcast, title) in [
            ("a", "AWS Podcast", "one"),
            ("b", "AWS Podcast", "two"),
            ("c", "AWS Podcast", "three"),
            ("d", "AWS Podcast", "four"),
            ("e", "AWS Podcast", "five"),
        ] {
            store.put_item(&episode(id, podcast, title)).await.unwrap();
        }
        let reader = CatalogReader::new(store.clone());

        let items: Vec<Episode> = reader
            .list_projected(None, Projection::List)
            .try_collect()
            .await
            .unwrap();

        assert_eq!(items.len(), 5);
        assert_eq!(store.scan_calls.load(Ordering::SeqCst), 3);
        assert!(items.iter().all(|e| e.description.is_none()));
    }

    #[tokio::test]
    async fn list_is_lazy() {
        let store = counting(2);
        let reader = CatalogReader::new(store.clone());

        let _stream = reader.list_projected(None, Projection::List);
        assert_eq!(store.scan_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn list_applies_predicate_across_pages() {
        let reader = CatalogReader::new(seeded(2).await);
        let predicate = Predicate::equals(Attribute::Podcast, "AWS Podcast")
            .and(Predicate::contains(Attribute::Title, "sample"));

        let ids: Vec<String> = reader
            .list_projected(Some(predicate), Projection::List)
            .map_ok(|episode| episode.id)
            .try_collect()
            .await
            .unwrap();

        assert_eq!(ids, vec!["a".to_string(), "d".to_string()]);
    }

    #[tokio::test]
    async fn throttling_surfaces_as_capacity_exceeded() {
        let reader = CatalogReader::new(Arc::new(ThrottledStore));

        let result: Result<Vec<Episode>, _> = reader
            .list_projected(None, Projection::List)
            .try_collect()
            .await;
        assert!(matches!(result, Err(CatalogError::CapacityExceeded { .. })));

        let err = reader.get_by_id("a", Projection::Describe).await.unwrap_err();
        assert!(matches!(err, CatalogError::CapacityExceeded { .. }));
    }
}
