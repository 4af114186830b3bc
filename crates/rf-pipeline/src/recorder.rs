//! Persistence of published videos.

use std::path::Path;

use async_trait::async_trait;
use rf_core::config::UserConfig;
use rf_core::{ContentItem, RunId};
use rf_db::{DbPool, NewVideo, Video};
use rf_publish::PublishReport;

/// Stores a record of each published video.
#[async_trait]
pub trait VideoRecorder: Send + Sync {
    async fn record(
        &self,
        run_id: RunId,
        user: &UserConfig,
        item: &ContentItem,
        video: &Path,
        report: &PublishReport,
    ) -> rf_core::Result<()>;
}

/// [`VideoRecorder`] writing to the SQLite `videos` table.
#[derive(Clone)]
pub struct SqliteRecorder {
    pool: DbPool,
}

impl SqliteRecorder {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl VideoRecorder for SqliteRecorder {
    async fn record(
        &self,
        run_id: RunId,
        user: &UserConfig,
        item: &ContentItem,
        video: &Path,
        report: &PublishReport,
    ) -> rf_core::Result<()> {
        let pool = self.pool.clone();
        let email = user.email.clone();
        let title = item.title.clone();
        let description = item.description();
        let source_url = item.url.clone();
        let file_path = video.to_string_lossy().to_string();
        let ok: Vec<String> = report.succeeded().iter().map(|s| s.to_string()).collect();
        let failed: Vec<String> = report.failed().iter().map(|o| o.platform.clone()).collect();
        let status = if report.is_full() {
            "published_full"
        } else {
            "published_partial"
        };

        let video: Video = tokio::task::spawn_blocking(move || {
            let conn = rf_db::get_conn(&pool)?;
            rf_db::queries::videos::create_video(
                &conn,
                &NewVideo {
                    run_id,
                    user_email: &email,
                    title: &title,
                    description: &description,
                    source_url: &source_url,
                    file_path: &file_path,
                    platforms_ok: &ok,
                    platforms_failed: &failed,
                    status,
                },
            )
        })
        .await
        .map_err(|e| rf_core::Error::Internal(format!("record task failed: {e}")))??;

        tracing::debug!(video_id = %video.id, status = %video.status, "Recorded video");
        Ok(())
    }
}
