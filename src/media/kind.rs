// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::fmt;
use std::str::FromStr;

use crate::error::MediaError;

/// Which artifact of an episode a play request targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ContentKind {
    /// The raw audio as ingested
    #[default]
    Media,
    /// The transcription text
    Text,
}

impl ContentKind {
    /// Resolve the requested kind, defaulting to media when none is given
    ///
    /// An empty selector counts as absent.
    pub fn resolve(requested: Option<&str>) -> Result<Self, MediaError> {
        match requested {
            None | Some("") => Ok(ContentKind::Media),
            Some(value) => value.parse(),
        }
    }

    /// Storage key of this variant for an episode
    ///
    /// Media keys carry a `/` after the id while text keys do not; stored
    /// objects already use these exact layouts.
    pub fn storage_key(self, episode_id: &str, key_prefix: &str) -> String {
        match self {
            ContentKind::Media => format!("{key_prefix}{episode_id}/raw-media"),
            ContentKind::Text => format!("{key_prefix}{episode_id}transcription.txt"),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ContentKind::Media => "media",
            ContentKind::Text => "text",
        }
    }
}

impl FromStr for ContentKind {
    type Err = MediaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "media" => Ok(ContentKind::Media),
            "text" => Ok(ContentKind::Text),
            other => Err(MediaError::InvalidContentKind {
                value: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A resolved (kind, storage key) pair for one episode
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaVariant {
    pub kind: ContentKind,
    pub storage_key: String,
}

impl MediaVariant {
    pub fn new(kind: ContentKind, episode_id: &str, key_prefix: &str) -> Self {
        Self {
            kind,
            storage_key: kind.storage_key(episode_id, key_prefix),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_known_kinds() {
        assert_eq!(ContentKind::resolve(None).unwrap(), ContentKind::Media);
        assert_eq!(ContentKind::resolve(Some("")).unwrap(), ContentKind::Media);
        assert_eq!(ContentKind::resolve(Some("media")).unwrap(), ContentKind::Media);
        assert_eq!(ContentKind::resolve(Some("text")).unwrap(), ContentKind::Text);
    }

    #[test]
    fn rejects_unknown_kind() {
        let err = ContentKind::resolve(Some("video")).unwrap_err();
        assert!(matches!(err, MediaError::InvalidContentKind { value } if value == "video"));
    }

    #[test]
    fn kind_comparison_is_by_value() {
        let requested = String::from("te") + "xt";
        assert_eq!(
            ContentKind::resolve(Some(requested.as_str())).unwrap(),
            ContentKind::Text
        );
    }

    #[test]
    fn derives_asymmetric_keys() {
        assert_eq!(
            ContentKind::Media.storage_key("abc123", "podcasts/"),
            "podcasts/abc123/raw-media"
        );
        assert_eq!(
            ContentKind::Text.storage_key("abc123", "podcasts/"),
            "podcasts/abc123transcription.txt"
        );
    }

    #[test]
    fn variant_carries_derived_key() {
        let variant = MediaVariant::new(ContentKind::Media, "e1", "");
        assert_eq!(variant.storage_key, "e1/raw-media");
        assert_eq!(variant.kind.to_string(), "media");
    }
}
