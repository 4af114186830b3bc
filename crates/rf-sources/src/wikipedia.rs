//! Wikipedia page-summary source.

use async_trait::async_trait;
use rf_core::ContentItem;
use serde::Deserialize;

use crate::http::send_json;
use crate::source::ContentSource;

const BASE_URL: &str = "https://en.wikipedia.org/api/rest_v1";

/// Fetches the REST summary of the page named after the topic.
pub struct WikipediaSource {
    http: reqwest::Client,
    base_url: String,
}

impl WikipediaSource {
    pub fn new(http: reqwest::Client) -> Self {
        Self::with_base_url(http, BASE_URL)
    }

    pub fn with_base_url(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
        }
    }

    fn summary_url(&self, topic: &str) -> rf_core::Result<url::Url> {
        let mut url = url::Url::parse(&self.base_url)
            .map_err(|e| rf_core::Error::Validation(format!("bad wikipedia base url: {e}")))?;
        let title = topic.trim().replace(' ', "_");
        url.path_segments_mut()
            .map_err(|_| rf_core::Error::Validation("wikipedia base url cannot be a base".into()))?
            .pop_if_empty()
            .extend(["page", "summary", title.as_str()]);
        Ok(url)
    }
}

#[async_trait]
impl ContentSource for WikipediaSource {
    fn name(&self) -> &str {
        "wikipedia"
    }

    async fn fetch(&self, topic: &str) -> rf_core::Result<Vec<ContentItem>> {
        let url = self.summary_url(topic)?;
        let summary: Summary = send_json(self.name(), self.http.get(url)).await?;

        let tags = vec!["wikipedia".to_string(), summary.title.to_lowercase()];
        Ok(vec![ContentItem {
            source: self.name().to_string(),
            url: summary
                .content_urls
                .and_then(|u| u.desktop)
                .map(|d| d.page)
                .unwrap_or_default(),
            excerpt: summary.extract.clone(),
            text: summary.extract,
            title: summary.title,
            tags,
            asset_path: None,
        }])
    }
}

#[derive(Debug, Deserialize)]
struct Summary {
    #[serde(default)]
    title: String,
    #[serde(default)]
    extract: String,
    #[serde(default)]
    content_urls: Option<ContentUrls>,
}

#[derive(Debug, Deserialize)]
struct ContentUrls {
    desktop: Option<PageUrl>,
}

#[derive(Debug, Deserialize)]
struct PageUrl {
    page: String,
}
