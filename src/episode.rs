// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use serde::{Deserialize, Serialize};

/// Processing status of an episode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EpisodeStatus {
    Pending,
    Uploading,
    Transcribing,
    Processing,
    Complete,
    Failure,
    /// Any value this service does not recognize
    #[serde(other)]
    Unknown,
}

impl EpisodeStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            EpisodeStatus::Pending => "pending",
            EpisodeStatus::Uploading => "uploading",
            EpisodeStatus::Transcribing => "transcribing",
            EpisodeStatus::Processing => "processing",
            EpisodeStatus::Complete => "complete",
            EpisodeStatus::Failure => "failure",
            EpisodeStatus::Unknown => "",
        }
    }
}

impl From<&str> for EpisodeStatus {
    fn from(value: &str) -> Self {
        match value {
            "pending" => EpisodeStatus::Pending,
            "uploading" => EpisodeStatus::Uploading,
            "transcribing" => EpisodeStatus::Transcribing,
            "processing" => EpisodeStatus::Processing,
            "complete" => EpisodeStatus::Complete,
            "failure" => EpisodeStatus::Failure,
            _ => EpisodeStatus::Unknown,
        }
    }
}

impl std::fmt::Display for EpisodeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stored attribute of an episode, named as it appears in the catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Attribute {
    Id,
    Title,
    Description,
    Podcast,
    Status,
    Published,
    MediaUrl,
    MediaContentType,
    MediaKey,
    TranscriptionKey,
    TranscriptionJobId,
    TranscribeMetadataKey,
}

impl Attribute {
    pub const ALL: [Attribute; 12] = [
        Attribute::Id,
        Attribute::Title,
        Attribute::Description,
        Attribute::Podcast,
        Attribute::Status,
        Attribute::Published,
        Attribute::MediaUrl,
        Attribute::MediaContentType,
        Attribute::MediaKey,
        Attribute::TranscriptionKey,
        Attribute::TranscriptionJobId,
        Attribute::TranscribeMetadataKey,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            Attribute::Id => "id",
            Attribute::Title => "title",
            Attribute::Description => "description",
            Attribute::Podcast => "podcast",
            Attribute::Status => "status",
            Attribute::Published => "published",
            Attribute::MediaUrl => "media_url",
            Attribute::MediaContentType => "media_content_type",
            Attribute::MediaKey => "media_key",
            Attribute::TranscriptionKey => "transcription_key",
            Attribute::TranscriptionJobId => "transcription_job_id",
            Attribute::TranscribeMetadataKey => "transcribe_metadata_key",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|attribute| attribute.name() == name)
    }
}

/// Which attributes a catalog read returns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Projection {
    /// Every stored attribute
    Full,
    /// Public fields of a single episode
    Describe,
    /// Fields returned when listing the catalog
    List,
}

const DESCRIBE_ATTRIBUTES: &[Attribute] = &[
    Attribute::Id,
    Attribute::Title,
    Attribute::Description,
    Attribute::Podcast,
    Attribute::Status,
];

const LIST_ATTRIBUTES: &[Attribute] = &[Attribute::Id, Attribute::Title, Attribute::Podcast];

impl Projection {
    /// The projected attributes, or `None` when the whole item is wanted
    pub fn attributes(self) -> Option<&'static [Attribute]> {
        match self {
            Projection::Full => None,
            Projection::Describe => Some(DESCRIBE_ATTRIBUTES),
            Projection::List => Some(LIST_ATTRIBUTES),
        }
    }
}

fn is_absent(value: &Option<String>) -> bool {
    value.as_deref().is_none_or(str::is_empty)
}

fn is_absent_status(status: &Option<EpisodeStatus>) -> bool {
    status.is_none_or(|s| s == EpisodeStatus::Unknown)
}

/// A catalog entry describing one podcast installment and its media artifacts
///
/// Every field but `id` is optional; absent or empty fields are left out of
/// the serialized form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Episode {
    #[serde(default)]
    pub id: String,
    #[serde(default, skip_serializing_if = "is_absent")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "is_absent")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "is_absent")]
    pub podcast: Option<String>,
    #[serde(default, skip_serializing_if = "is_absent_status")]
    pub status: Option<EpisodeStatus>,
    #[serde(default, skip_serializing_if = "is_absent")]
    pub published: Option<String>,
    #[serde(default, skip_serializing_if = "is_absent")]
    pub media_url: Option<String>,
    #[serde(default, skip_serializing_if = "is_absent")]
    pub media_content_type: Option<String>,
    #[serde(default, skip_serializing_if = "is_absent")]
    pub media_key: Option<String>,
    #[serde(default, skip_serializing_if = "is_absent")]
    pub transcription_key: Option<String>,
    #[serde(default, skip_serializing_if = "is_absent")]
    pub transcription_job_id: Option<String>,
    #[serde(default, skip_serializing_if = "is_absent")]
    pub transcribe_metadata_key: Option<String>,
}

impl Episode {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    /// Read an attribute as text; empty values count as absent
    pub fn get(&self, attribute: Attribute) -> Option<&str> {
        let value = match attribute {
            Attribute::Id => Some(self.id.as_str()),
            Attribute::Status => self.status.map(EpisodeStatus::as_str),
            Attribute::Title => self.title.as_deref(),
            Attribute::Description => self.description.as_deref(),
            Attribute::Podcast => self.podcast.as_deref(),
            Attribute::Published => self.published.as_deref(),
            Attribute::MediaUrl => self.media_url.as_deref(),
            Attribute::MediaContentType => self.media_content_type.as_deref(),
            Attribute::MediaKey => self.media_key.as_deref(),
            Attribute::TranscriptionKey => self.transcription_key.as_deref(),
            Attribute::TranscriptionJobId => self.transcription_job_id.as_deref(),
            Attribute::TranscribeMetadataKey => self.transcribe_metadata_key.as_deref(),
        };
        value.filter(|v| !v.is_empty())
    }

    /// Write an attribute from its textual form
    pub fn set(&mut self, attribute: Attribute, value: String) {
        match attribute {
            Attribute::Id => self.id = value,
            Attribute::Status => self.status = Some(EpisodeStatus::from(value.as_str())),
            Attribute::Title => self.title = Some(value),
            Attribute::Description => self.description = Some(value),
            Attribute::Podcast => self.podcast = Some(value),
            Attribute::Published => self.published = Some(value),
            Attribute::MediaUrl => self.media_url = Some(value),
            Attribute::MediaContentType => self.media_content_type = Some(value),
            Attribute::MediaKey => self.media_key = Some(value),
            Attribute::TranscriptionKey => self.transcription_key = Some(value),
            Attribute::TranscriptionJobId => self.transcription_job_id = Some(value),
            Attribute::TranscribeMetadataKey => self.transcribe_metadata_key = Some(value),
        }
    }

    /// Copy of this episode holding only the given attributes
    pub fn project(&self, attributes: &[Attribute]) -> Episode {
        let mut projected = Episode::default();
        for &attribute in attributes {
            if let Some(value) = self.get(attribute) {
                projected.set(attribute, value.to_string());
            }
        }
        projected
    }

    /// Copy of this episode reduced to a read projection
    pub fn projected(&self, projection: Projection) -> Episode {
        match projection.attributes() {
            Some(attributes) => self.project(attributes),
            None => self.clone(),
        }
    }

    /// Lay every present attribute of `other` over this episode
    ///
    /// Attributes absent from `other`, and an unrecognized status, leave the
    /// current value in place.
    pub fn overlay(&mut self, other: &Episode) {
        for (attribute, value) in other.attributes() {
            self.set(attribute, value.to_string());
        }
    }

    /// Iterate over all present attributes
    pub fn attributes(&self) -> impl Iterator<Item = (Attribute, &str)> {
        Attribute::ALL
            .into_iter()
            .filter_map(|attribute| self.get(attribute).map(|value| (attribute, value)))
    }
}
