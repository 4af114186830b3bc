//! Visual supplier capability and acquisition.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use rf_core::{MediaAsset, MediaKind};

/// Candidates requested per search. Providers drop results they cannot
/// resolve to a download link, so asking for one can come back empty.
pub const SEARCH_CANDIDATES: u32 = 5;

/// A stock-media provider.
#[async_trait]
pub trait VisualSupplier: Send + Sync {
    fn name(&self) -> &str;

    /// Candidate assets for `query`, in provider order.
    async fn search(
        &self,
        query: &str,
        kind: MediaKind,
        count: u32,
        duration_hint_secs: f64,
    ) -> rf_core::Result<Vec<MediaAsset>>;

    /// Download `asset` to `dest`. A partial file is removed on failure.
    async fn download(&self, asset: &MediaAsset, dest: &Path) -> rf_core::Result<()>;
}

/// Search for `topic`, download the first usable candidate into `dir` as
/// `<stem>.<ext>` and return the local path.
///
/// Zero candidates is [`rf_core::Error::NoCandidates`]. The downloaded file
/// belongs to the caller.
pub async fn acquire_visual(
    supplier: &dyn VisualSupplier,
    topic: &str,
    kind: MediaKind,
    duration_hint_secs: f64,
    dir: &Path,
    stem: &str,
) -> rf_core::Result<(PathBuf, MediaKind)> {
    let candidates = supplier
        .search(topic, kind, SEARCH_CANDIDATES, duration_hint_secs)
        .await?;
    let Some(asset) = candidates.into_iter().next() else {
        return Err(rf_core::Error::NoCandidates(format!(
            "{} returned no {kind} for '{topic}'",
            supplier.name()
        )));
    };

    let dest = dir.join(format!("{stem}.{}", asset.kind.extension()));
    supplier.download(&asset, &dest).await?;

    tracing::info!(
        supplier = supplier.name(),
        asset_id = asset.id,
        kind = %asset.kind,
        page = %asset.url,
        path = %dest.display(),
        "Acquired visual"
    );
    Ok((dest, asset.kind))
}
