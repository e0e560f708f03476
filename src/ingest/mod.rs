// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Getting episodes and their media into the service

mod content_type;
mod feed;
mod import;
mod pipeline;
mod progress;

pub use content_type::resolve_content_type;
pub use feed::{FeedChannel, FeedItem, fetch_feed, parse_feed};
pub use import::{EpisodeImporter, ImportEpisode, ImportOutcome, ImportRequest, ImportRssFeed};
pub use pipeline::IngestionPipeline;
pub use progress::{
    IngestEvent, IngestReporter, IngestStage, NoopReporter, SharedIngestReporter, TracingReporter,
};
