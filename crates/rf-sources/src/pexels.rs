//! Pexels stock-media supplier.

use std::path::Path;

use async_trait::async_trait;
use rf_core::{MediaAsset, MediaKind};
use serde::Deserialize;

use crate::http::{download_to_file, send_json};
use crate::visual::VisualSupplier;

const BASE_URL: &str = "https://api.pexels.com";

/// Video searches accept clips this many seconds either side of the hint.
const DURATION_SLACK_SECS: f64 = 5.0;

/// Searches Pexels photos (`/v1/search`) or videos (`/videos/search`).
pub struct PexelsSupplier {
    http: reqwest::Client,
    download_http: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl PexelsSupplier {
    /// `download_http` serves the media download and usually carries a
    /// longer timeout than the search client.
    pub fn new(http: reqwest::Client, download_http: reqwest::Client, api_key: impl Into<String>) -> Self {
        Self {
            http,
            download_http,
            api_key: api_key.into(),
            base_url: BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl VisualSupplier for PexelsSupplier {
    fn name(&self) -> &str {
        "pexels"
    }

    async fn search(
        &self,
        query: &str,
        kind: MediaKind,
        count: u32,
        duration_hint_secs: f64,
    ) -> rf_core::Result<Vec<MediaAsset>> {
        let per_page = count.max(1).to_string();

        match kind {
            MediaKind::Video => {
                let min = (duration_hint_secs - DURATION_SLACK_SECS).max(0.0).round() as u64;
                let max = (duration_hint_secs + DURATION_SLACK_SECS).round() as u64;
                let request = self
                    .http
                    .get(format!("{}/videos/search", self.base_url))
                    .header(reqwest::header::AUTHORIZATION, &self.api_key)
                    .query(&[
                        ("query", query),
                        ("per_page", per_page.as_str()),
                        ("min_duration", min.to_string().as_str()),
                        ("max_duration", max.to_string().as_str()),
                    ]);
                let resp: VideoSearch = send_json(self.name(), request).await?;

                Ok(resp
                    .videos
                    .into_iter()
                    .filter_map(|v| {
                        let file = v.video_files.into_iter().next()?;
                        Some(MediaAsset {
                            id: v.id,
                            kind: MediaKind::Video,
                            url: v.url,
                            source_url: file.link,
                        })
                    })
                    .collect())
            }
            MediaKind::Photo => {
                let request = self
                    .http
                    .get(format!("{}/v1/search", self.base_url))
                    .header(reqwest::header::AUTHORIZATION, &self.api_key)
                    .query(&[("query", query), ("per_page", per_page.as_str())]);
                let resp: PhotoSearch = send_json(self.name(), request).await?;

                Ok(resp
                    .photos
                    .into_iter()
                    .map(|p| MediaAsset {
                        id: p.id,
                        kind: MediaKind::Photo,
                        url: p.url,
                        source_url: p.src.original,
                    })
                    .collect())
            }
        }
    }

    async fn download(&self, asset: &MediaAsset, dest: &Path) -> rf_core::Result<()> {
        let bytes = download_to_file(&self.download_http, self.name(), &asset.source_url, dest).await?;
        tracing::debug!(asset_id = asset.id, bytes, path = %dest.display(), "Downloaded stock media");
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct VideoSearch {
    #[serde(default)]
    videos: Vec<Video>,
}

#[derive(Debug, Deserialize)]
struct Video {
    id: u64,
    #[serde(default)]
    url: String,
    #[serde(default)]
    video_files: Vec<VideoFile>,
}

#[derive(Debug, Deserialize)]
struct VideoFile {
    link: String,
}

#[derive(Debug, Deserialize)]
struct PhotoSearch {
    #[serde(default)]
    photos: Vec<Photo>,
}

#[derive(Debug, Deserialize)]
struct Photo {
    id: u64,
    #[serde(default)]
    url: String,
    src: PhotoSrc,
}

#[derive(Debug, Deserialize)]
struct PhotoSrc {
    original: String,
}
