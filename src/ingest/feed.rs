// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use url::Url;

use crate::error::FeedError;
use crate::http::HttpClient;

/// A parsed podcast feed, reduced to what an import needs
#[derive(Debug, Clone)]
pub struct FeedChannel {
    pub title: String,
    pub items: Vec<FeedItem>,
}

/// A single feed entry that carries downloadable media
#[derive(Debug, Clone)]
pub struct FeedItem {
    pub title: Option<String>,
    pub description: Option<String>,
    /// `pubDate` exactly as published
    pub published: Option<String>,
    pub guid: Option<String>,
    pub enclosure_url: Url,
    pub enclosure_type: Option<String>,
}

impl FeedItem {
    /// Stable identity of the item: its guid, or the enclosure URL without one
    pub fn identity(&self) -> &str {
        self.guid.as_deref().unwrap_or(self.enclosure_url.as_str())
    }
}

/// Fetch and parse a feed
pub async fn fetch_feed(client: &dyn HttpClient, url: &str) -> Result<FeedChannel, FeedError> {
    Url::parse(url)?;
    let bytes = client
        .get_bytes(url)
        .await
        .map_err(|e| FeedError::FetchFailed {
            url: url.to_string(),
            source: e,
        })?;
    parse_feed(&bytes)
}

/// Parse RSS feed XML, skipping items without a usable enclosure
pub fn parse_feed(xml_bytes: &[u8]) -> Result<FeedChannel, FeedError> {
    let channel = rss::Channel::read_from(xml_bytes)?;

    let items = channel
        .items()
        .iter()
        .filter_map(|item| parse_item(item).ok())
        .collect();

    Ok(FeedChannel {
        title: channel.title().to_string(),
        items,
    })
}

fn parse_item(item: &rss::Item) -> Result<FeedItem, FeedError> {
    let title = item.title().map(String::from);

    let enclosure = item
        .enclosure()
        .ok_or_else(|| FeedError::MissingEnclosure {
            title: title.clone().unwrap_or_default(),
        })?;

    Ok(FeedItem {
        enclosure_url: Url::parse(enclosure.url())?,
        enclosure_type: non_empty(enclosure.mime_type()),
        title,
        description: item.description().and_then(non_empty),
        published: item.pub_date().and_then(non_empty),
        guid: item.guid().and_then(|guid| non_empty(guid.value())),
    })
}

fn non_empty(value: &str) -> Option<String> {
    Some(value.trim())
        .filter(|value| !value.is_empty())
        .map(String::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::HttpResponse;
    use async_trait::async_trait;
    use bytes::Bytes;

    const FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>AWS Podcast</title>
    <link>https://example.com</link>
    <description>Weekly news</description>
    <item>
      <title>Episode 2: A sample title</title>
      <description>Second episode</description>
      <pubDate>Tue, 02 Jan 2024 10:00:00 +0000</pubDate>
      <guid>episode-2</guid>
      <enclosure url="https://cdn.example.com/ep2.mp3" length="2000" type="audio/mpeg"/>
    </item>
    <item>
      <title>Episode 1</title>
      <enclosure url="https://cdn.example.com/ep1.m4a" length="1000" type=""/>
    </item>
    <item>
      <title>Show notes only</title>
    </item>
  </channel>
</rss>"#;

    struct FeedClient;

    #[async_trait]
    impl HttpClient for FeedClient {
        async fn get_bytes(&self, _url: &str) -> Result<Bytes, reqwest::Error> {
            Ok(Bytes::from_static(FEED.as_bytes()))
        }

        async fn get_stream(&self, _url: &str) -> Result<HttpResponse, reqwest::Error> {
            unreachable!("feeds are fetched in one piece")
        }
    }

    #[test]
    fn parses_items_with_enclosures() {
        let channel = parse_feed(FEED.as_bytes()).unwrap();

        assert_eq!(channel.title, "AWS Podcast");
        assert_eq!(channel.items.len(), 2);

        let latest = &channel.items[0];
        assert_eq!(latest.title.as_deref(), Some("Episode 2: A sample title"));
        assert_eq!(latest.published.as_deref(), Some("Tue, 02 Jan 2024 10:00:00 +0000"));
        assert_eq!(latest.enclosure_type.as_deref(), Some("audio/mpeg"));
        assert_eq!(latest.identity(), "episode-2");
    }

    #[test]
    fn identity_falls_back_to_enclosure_url() {
        let channel = parse_feed(FEED.as_bytes()).unwrap();
        let oldest = &channel.items[1];

        assert!(oldest.guid.is_none());
        assert!(oldest.enclosure_type.is_none());
        assert_eq!(oldest.identity(), "https://cdn.example.com/ep1.m4a");
    }

    #[test]
    fn rejects_invalid_xml() {
        assert!(matches!(
            parse_feed(b"not xml at all"),
            Err(FeedError::ParseFailed(_))
        ));
    }

    #[tokio::test]
    async fn fetch_validates_url_before_requesting() {
        let err = fetch_feed(&FeedClient, "not a url").await.unwrap_err();
        assert!(matches!(err, FeedError::InvalidUrl(_)));

        let channel = fetch_feed(&FeedClient, "https://example.com/feed.xml")
            .await
            .unwrap();
        assert_eq!(channel.items.len(), 2);
    }
}
