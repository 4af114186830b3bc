//! Cron-driven tick loop.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rf_core::config::UserConfig;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::run::Pipeline;
use crate::state::RunState;

/// Supplies the users for a tick. Called once per tick, so configuration
/// changes are picked up without a restart.
pub type UserLoader = Arc<dyn Fn() -> rf_core::Result<Vec<UserConfig>> + Send + Sync>;

/// Fires a pipeline tick for every matching instant of a cron schedule.
///
/// A tick that is still running when the next one fires keeps running; the
/// two overlap rather than queue.
pub struct Scheduler {
    schedule: cron::Schedule,
    pipeline: Pipeline,
    loader: UserLoader,
    run_on_start: bool,
}

impl Scheduler {
    /// Parse `expr` (seconds-first cron, UTC).
    pub fn new(expr: &str, pipeline: Pipeline, loader: UserLoader) -> rf_core::Result<Self> {
        let schedule = cron::Schedule::from_str(expr)
            .map_err(|e| rf_core::Error::Validation(format!("invalid cron expression '{expr}': {e}")))?;
        Ok(Self {
            schedule,
            pipeline,
            loader,
            run_on_start: false,
        })
    }

    pub fn with_run_on_start(mut self, run_on_start: bool) -> Self {
        self.run_on_start = run_on_start;
        self
    }

    /// The first fire time strictly after `after`.
    pub fn next_fire(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.schedule.after(&after).next()
    }

    /// Run until `cancel` fires, then wait for in-flight ticks.
    pub async fn run(self, cancel: CancellationToken) {
        let mut ticks = JoinSet::new();

        if self.run_on_start {
            self.spawn_tick(&mut ticks);
        }

        loop {
            let Some(next) = self.next_fire(Utc::now()) else {
                tracing::warn!("Schedule has no upcoming fire times; stopping");
                break;
            };
            let wait = (next - Utc::now()).to_std().unwrap_or(Duration::ZERO);
            tracing::debug!(next = %next, "Waiting for next tick");

            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Scheduler shutting down");
                    break;
                }
                _ = tokio::time::sleep(wait) => {
                    self.spawn_tick(&mut ticks);
                }
                Some(done) = ticks.join_next(), if !ticks.is_empty() => {
                    if let Err(e) = done {
                        tracing::error!(error = %e, "Tick task died");
                    }
                }
            }
        }

        if !ticks.is_empty() {
            tracing::info!(in_flight = ticks.len(), "Waiting for in-flight ticks");
        }
        while let Some(done) = ticks.join_next().await {
            if let Err(e) = done {
                tracing::error!(error = %e, "Tick task died");
            }
        }
    }

    fn spawn_tick(&self, ticks: &mut JoinSet<()>) {
        let pipeline = self.pipeline.clone();
        let loader = self.loader.clone();
        ticks.spawn(async move { tick(pipeline, loader).await });
    }
}

async fn tick(pipeline: Pipeline, loader: UserLoader) {
    let users = match loader() {
        Ok(users) => users,
        Err(e) => {
            tracing::error!(error = %e, "Cannot load users; skipping tick");
            return;
        }
    };
    tracing::info!(users = users.len(), "Tick started");

    let reports = pipeline.run_tick(users).await;

    let published = reports
        .iter()
        .filter(|r| matches!(r.state(), RunState::Published { .. }))
        .count();
    let abandoned = reports
        .iter()
        .filter(|r| r.state() == RunState::Abandoned)
        .count();
    let failed = reports.len() - published - abandoned;
    tracing::info!(
        published,
        abandoned,
        failed,
        videos_generated = pipeline.counter().get(),
        "Tick finished"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::counter::GenerationCounter;
    use crate::run::{Capabilities, PipelineSettings};
    use async_trait::async_trait;
    use chrono::TimeZone;
    use rf_av::{ComposeRequest, Composer, Narrator, Scratch};
    use rf_core::{MediaAsset, MediaKind};
    use rf_publish::PublisherRegistry;
    use rf_sources::{SourceRegistry, VisualSupplier};
    use std::path::{Path, PathBuf};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Unused;

    #[async_trait]
    impl Narrator for Unused {
        fn name(&self) -> &'static str {
            "unused"
        }
        async fn synthesize(&self, _: &str, _: &Scratch) -> rf_core::Result<PathBuf> {
            Err(rf_core::Error::Internal("unexpected narration".into()))
        }
    }

    #[async_trait]
    impl VisualSupplier for Unused {
        fn name(&self) -> &str {
            "unused"
        }
        async fn search(&self, _: &str, _: MediaKind, _: u32, _: f64) -> rf_core::Result<Vec<MediaAsset>> {
            Ok(vec![])
        }
        async fn download(&self, _: &MediaAsset, _: &Path) -> rf_core::Result<()> {
            Ok(())
        }
    }

    #[async_trait]
    impl Composer for Unused {
        async fn compose(&self, _: &ComposeRequest<'_>) -> rf_core::Result<PathBuf> {
            Err(rf_core::Error::Internal("unexpected compose".into()))
        }
    }

    fn pipeline(root: &Path) -> Pipeline {
        let caps = Capabilities {
            sources: SourceRegistry::new(),
            narrator: Arc::new(Unused),
            visuals: Arc::new(Unused),
            composer: Arc::new(Unused),
            publishers: PublisherRegistry::new(),
            recorder: None,
        };
        let settings = PipelineSettings {
            scratch_root: root.join("scratch"),
            output_dir: root.join("videos"),
            media_kind: MediaKind::Video,
            duration_hint_secs: 15.0,
            overlay_text: false,
            watermark: None,
        };
        Pipeline::new(caps, settings, GenerationCounter::new())
    }

    fn counting_loader(calls: Arc<AtomicUsize>, fail: bool) -> UserLoader {
        Arc::new(move || {
            calls.fetch_add(1, Ordering::SeqCst);
            if fail {
                return Err(rf_core::Error::Validation("bad config".into()));
            }
            Ok(vec![UserConfig {
                email: "a@example.com".into(),
                topic: "space".into(),
                sources: vec!["nowhere".into()],
                platforms: vec![],
            }])
        })
    }

    async fn wait_for(calls: &AtomicUsize, n: usize) {
        for _ in 0..200 {
            if calls.load(Ordering::SeqCst) >= n {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("loader was not called {n} time(s)");
    }

    #[test]
    fn invalid_cron_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let loader = counting_loader(Arc::new(AtomicUsize::new(0)), false);
        let err = Scheduler::new("not a cron", pipeline(dir.path()), loader)
            .err()
            .unwrap();
        assert!(matches!(err, rf_core::Error::Validation(_)));
    }

    #[test]
    fn next_fire_is_daily_at_one() {
        let dir = tempfile::tempdir().unwrap();
        let loader = counting_loader(Arc::new(AtomicUsize::new(0)), false);
        let scheduler =
            Scheduler::new(rf_core::config::DEFAULT_SCHEDULE, pipeline(dir.path()), loader).unwrap();

        let after = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(
            scheduler.next_fire(after),
            Some(Utc.with_ymd_and_hms(2024, 1, 1, 1, 0, 0).unwrap())
        );
        let after = Utc.with_ymd_and_hms(2024, 1, 1, 1, 0, 0).unwrap();
        assert_eq!(
            scheduler.next_fire(after),
            Some(Utc.with_ymd_and_hms(2024, 1, 2, 1, 0, 0).unwrap())
        );
    }

    #[tokio::test]
    async fn run_on_start_ticks_once_then_stops_on_cancel() {
        let dir = tempfile::tempdir().unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let scheduler = Scheduler::new(
            rf_core::config::DEFAULT_SCHEDULE,
            pipeline(dir.path()),
            counting_loader(calls.clone(), false),
        )
        .unwrap()
        .with_run_on_start(true);

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(scheduler.run(cancel.clone()));

        wait_for(&calls, 1).await;
        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("scheduler did not stop")
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn loader_error_skips_tick() {
        let dir = tempfile::tempdir().unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let p = pipeline(dir.path());
        let scheduler = Scheduler::new(
            rf_core::config::DEFAULT_SCHEDULE,
            p.clone(),
            counting_loader(calls.clone(), true),
        )
        .unwrap()
        .with_run_on_start(true);

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(scheduler.run(cancel.clone()));
        wait_for(&calls, 1).await;
        cancel.cancel();
        handle.await.unwrap();
        assert_eq!(p.counter().get(), 0);
    }

    #[tokio::test]
    async fn every_second_schedule_fires_repeatedly() {
        let dir = tempfile::tempdir().unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let scheduler = Scheduler::new(
            "* * * * * *",
            pipeline(dir.path()),
            counting_loader(calls.clone(), false),
        )
        .unwrap();

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(scheduler.run(cancel.clone()));
        for _ in 0..2 {
            tokio::time::timeout(Duration::from_secs(5), async {
                let seen = calls.load(Ordering::SeqCst);
                loop {
                    if calls.load(Ordering::SeqCst) > seen {
                        break;
                    }
                    tokio::time::sleep(Duration::from_millis(10)).await;
                }
            })
            .await
            .expect("no tick within five seconds");
        }
        cancel.cancel();
        handle.await.unwrap();
        assert!(calls.load(Ordering::SeqCst) >= 2);
    }
}
