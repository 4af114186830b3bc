//! Data model carried through a generation run.
//!
//! A [`ContentItem`] is produced by a content source, gains its final asset
//! path once after composition, and is then handed read-only to the
//! publishers. A [`MediaAsset`] is a transient stock-provider candidate that
//! only lives until it has been downloaded.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Maximum description length accepted by the platforms we publish to.
const MAX_DESCRIPTION_CHARS: usize = 4900;

/// Characters stripped from the edges of title words during tag generation.
const TAG_TRIM: &[char] = &['.', ',', ';', ':', '"', '\'', '!', '?'];

// ---------------------------------------------------------------------------
// ContentItem
// ---------------------------------------------------------------------------

/// A unit of fetched material used as the narration and visual basis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentItem {
    /// Name of the source that produced this item (e.g. "wikipedia").
    pub source: String,
    pub title: String,
    pub url: String,
    /// Short excerpt, preferred for narration.
    pub excerpt: String,
    /// Full text of the article or post.
    pub text: String,
    pub tags: Vec<String>,
    /// Final composed video, attached once after composition.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset_path: Option<PathBuf>,
}

impl ContentItem {
    /// Whether the item carries any text usable for narration.
    pub fn has_text(&self) -> bool {
        !self.excerpt.trim().is_empty() || !self.text.trim().is_empty()
    }

    /// The text to narrate: the excerpt when present, otherwise the full text.
    pub fn narration_text(&self) -> &str {
        if self.excerpt.trim().is_empty() {
            self.text.trim()
        } else {
            self.excerpt.trim()
        }
    }

    /// Upload description: the narration text, truncated to the platform
    /// limit, followed by a source attribution line.
    pub fn description(&self) -> String {
        let body: String = self
            .narration_text()
            .chars()
            .take(MAX_DESCRIPTION_CHARS)
            .collect();
        if self.url.is_empty() {
            body
        } else {
            format!("{body}\n\nSource: {}", self.url)
        }
    }

    /// Attach the final asset path.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Internal`] if an asset is already attached.
    pub fn attach_asset(&mut self, path: &Path) -> crate::Result<()> {
        if let Some(existing) = &self.asset_path {
            return Err(crate::Error::Internal(format!(
                "content item already has an asset: {}",
                existing.display()
            )));
        }
        self.asset_path = Some(path.to_path_buf());
        Ok(())
    }
}

/// Generate tags from a title: words trimmed of punctuation, lowercased, and
/// longer than three characters.
pub fn generate_tags(title: &str) -> Vec<String> {
    title
        .split_whitespace()
        .map(|w| w.trim_matches(TAG_TRIM).to_lowercase())
        .filter(|w| w.chars().count() > 3)
        .collect()
}

// ---------------------------------------------------------------------------
// MediaAsset
// ---------------------------------------------------------------------------

/// Kind of stock visual.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    #[default]
    Video,
    Photo,
}

impl MediaKind {
    /// File extension used when the asset is downloaded.
    pub fn extension(&self) -> &'static str {
        match self {
            MediaKind::Video => "mp4",
            MediaKind::Photo => "jpg",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaKind::Video => f.write_str("video"),
            MediaKind::Photo => f.write_str("photo"),
        }
    }
}

impl FromStr for MediaKind {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "video" => Ok(MediaKind::Video),
            "photo" => Ok(MediaKind::Photo),
            other => Err(crate::Error::Validation(format!(
                "unknown media kind '{other}' (expected video or photo)"
            ))),
        }
    }
}

/// A candidate visual returned by a stock provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaAsset {
    /// Provider-side identifier.
    pub id: u64,
    pub kind: MediaKind,
    /// Provider page URL.
    pub url: String,
    /// Direct link to the downloadable file.
    pub source_url: String,
}
