// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Episode catalog: filter building, paginated reads and store backends

mod dynamo;
mod filter;
mod memory;
mod reader;

use std::sync::Arc;

use async_trait::async_trait;

use crate::episode::{Episode, EpisodeStatus, Projection};
use crate::error::CatalogError;

pub use dynamo::DynamoCatalog;
pub use filter::{FilterExpression, IN_TITLE_PARAM, PODCAST_PARAM, Predicate, build_filter};
pub use memory::MemoryCatalog;
pub use reader::{CatalogReader, EpisodeStream};

/// Opaque marker from which a scan continues
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContinuationToken(pub String);

/// Parameters of one catalog scan, shared by every page request
#[derive(Debug, Clone)]
pub struct ScanRequest {
    pub projection: Projection,
    pub predicate: Option<Predicate>,
}

/// One page of scan results
#[derive(Debug, Clone, Default)]
pub struct ScanPage {
    pub items: Vec<Episode>,
    /// Present when the store holds more data past this page
    pub next: Option<ContinuationToken>,
}

impl ScanPage {
    pub fn has_more(&self) -> bool {
        self.next.is_some()
    }
}

/// Document store holding episodes keyed by id
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Primary-key lookup
    async fn get_item(
        &self,
        id: &str,
        projection: Projection,
    ) -> Result<Option<Episode>, CatalogError>;

    /// Fetch a single page of a scan, starting after `start` when given
    async fn scan_page(
        &self,
        request: &ScanRequest,
        start: Option<&ContinuationToken>,
    ) -> Result<ScanPage, CatalogError>;

    /// Insert or replace an episode; an unrecognized status keeps the stored one
    async fn put_item(&self, episode: &Episode) -> Result<(), CatalogError>;

    /// Set the status of an existing episode
    async fn update_status(&self, id: &str, status: EpisodeStatus) -> Result<(), CatalogError>;
}

/// A catalog store shared across request handlers
pub type SharedCatalogStore = Arc<dyn CatalogStore>;
