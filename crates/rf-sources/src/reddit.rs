//! Reddit "top of the day" source.

use async_trait::async_trait;
use rf_core::{generate_tags, ContentItem};
use serde::Deserialize;

use crate::http::send_json;
use crate::source::ContentSource;

const BASE_URL: &str = "https://www.reddit.com";

/// Reddit rejects anonymous default agents.
const USER_AGENT: &str = "reelforge-content-bot/1.0";

/// Posts fetched per request.
const LIMIT: &str = "5";

/// Fetches the day's top posts of the subreddit named after the topic.
pub struct RedditSource {
    http: reqwest::Client,
    base_url: String,
}

impl RedditSource {
    pub fn new(http: reqwest::Client) -> Self {
        Self::with_base_url(http, BASE_URL)
    }

    pub fn with_base_url(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
        }
    }

    fn listing_url(&self, topic: &str) -> rf_core::Result<url::Url> {
        let mut url = url::Url::parse(&self.base_url)
            .map_err(|e| rf_core::Error::Validation(format!("bad reddit base url: {e}")))?;
        let subreddit: String = topic
            .to_lowercase()
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect();
        url.path_segments_mut()
            .map_err(|_| rf_core::Error::Validation("reddit base url cannot be a base".into()))?
            .pop_if_empty()
            .extend(["r", subreddit.as_str(), "top", ".json"]);
        Ok(url)
    }
}

#[async_trait]
impl ContentSource for RedditSource {
    fn name(&self) -> &str {
        "reddit"
    }

    async fn fetch(&self, topic: &str) -> rf_core::Result<Vec<ContentItem>> {
        let url = self.listing_url(topic)?;
        let request = self
            .http
            .get(url)
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .query(&[("limit", LIMIT), ("t", "day")]);
        let listing: Listing = send_json(self.name(), request).await?;

        Ok(listing
            .data
            .children
            .into_iter()
            .map(|child| {
                let post = child.data;
                let text = if post.selftext.trim().is_empty() {
                    post.title.clone()
                } else {
                    post.selftext.clone()
                };
                ContentItem {
                    source: self.name().to_string(),
                    tags: generate_tags(&post.title),
                    url: post.url,
                    excerpt: post.selftext,
                    text,
                    title: post.title,
                    asset_path: None,
                }
            })
            .collect())
    }
}

#[derive(Debug, Deserialize)]
struct Listing {
    data: ListingData,
}

#[derive(Debug, Deserialize)]
struct ListingData {
    #[serde(default)]
    children: Vec<Child>,
}

#[derive(Debug, Deserialize)]
struct Child {
    data: Post,
}

#[derive(Debug, Deserialize)]
struct Post {
    #[serde(default)]
    title: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    selftext: String,
}
