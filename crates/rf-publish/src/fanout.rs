//! Concurrent publish to every platform a user has configured.

use std::sync::Arc;

use rf_core::config::UserConfig;
use rf_core::ContentItem;
use serde::Serialize;

use crate::publisher::{Publisher, PublisherRegistry};

/// Result of publishing to one platform.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlatformOutcome {
    pub platform: String,
    /// `None` on success, otherwise the failure reason.
    pub error: Option<String>,
}

impl PlatformOutcome {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Per-platform results of one fan-out, in configuration order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PublishReport {
    pub outcomes: Vec<PlatformOutcome>,
}

impl PublishReport {
    /// Every configured platform succeeded.
    pub fn is_full(&self) -> bool {
        self.outcomes.iter().all(PlatformOutcome::is_ok)
    }

    pub fn succeeded(&self) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter(|o| o.is_ok())
            .map(|o| o.platform.as_str())
            .collect()
    }

    pub fn failed(&self) -> Vec<&PlatformOutcome> {
        self.outcomes.iter().filter(|o| !o.is_ok()).collect()
    }
}

/// Publish `item` to every platform configured for `user`.
///
/// All clients are resolved first; a platform that fails to resolve is
/// recorded as failed and never blocks the rest. Resolved uploads run
/// concurrently and every one of them is awaited before returning, so one
/// platform's failure neither cancels nor delays the others.
///
/// # Errors
///
/// Only when `item` has no attached asset. Platform failures are reported
/// in the returned [`PublishReport`].
pub async fn publish(
    registry: &PublisherRegistry,
    user: &UserConfig,
    item: &ContentItem,
) -> rf_core::Result<PublishReport> {
    let asset = item
        .asset_path
        .clone()
        .ok_or_else(|| rf_core::Error::pipeline("publish", "content item has no asset attached"))?;

    let title = Arc::new(item.title.clone());
    let description = Arc::new(item.description());
    let tags = Arc::new(item.tags.clone());
    let asset = Arc::new(asset);

    let mut outcomes: Vec<Option<PlatformOutcome>> = vec![None; user.platforms.len()];
    let mut uploads = Vec::new();

    for (idx, cfg) in user.platforms.iter().enumerate() {
        let publisher: Arc<dyn Publisher> = match registry.resolve(cfg) {
            Ok(p) => p,
            Err(e) => {
                tracing::warn!(platform = %cfg.name, error = %e, "Cannot resolve platform client");
                outcomes[idx] = Some(PlatformOutcome {
                    platform: cfg.name.clone(),
                    error: Some(e.to_string()),
                });
                continue;
            }
        };

        let (asset, title, description, tags) =
            (asset.clone(), title.clone(), description.clone(), tags.clone());
        let handle = tokio::spawn(async move {
            publisher
                .upload(&asset, &title, &description, &tags)
                .await
        });
        uploads.push((idx, cfg.name.clone(), handle));
    }

    for (idx, platform, handle) in uploads {
        let error = match handle.await {
            Ok(Ok(())) => {
                tracing::info!(platform = %platform, "Published");
                None
            }
            Ok(Err(e)) => {
                tracing::warn!(platform = %platform, error = %e, "Upload failed");
                Some(e.to_string())
            }
            Err(join_err) => {
                tracing::error!(platform = %platform, error = %join_err, "Upload task panicked");
                Some(format!("upload task aborted: {join_err}"))
            }
        };
        outcomes[idx] = Some(PlatformOutcome { platform, error });
    }

    Ok(PublishReport {
        outcomes: outcomes.into_iter().flatten().collect(),
    })
}
