//! One generation run per user, and one tick across all users.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use rf_av::{discard, ComposeRequest, Composer, Narrator, Overlay, Scratch, TempArtifact};
use rf_core::config::{Config, UserConfig};
use rf_core::{ContentItem, MediaKind, RunId};
use rf_publish::{PublishReport, PublisherRegistry};
use rf_sources::{acquire_visual, fetch_content, SourceRegistry, VisualSupplier};
use tracing::Instrument;

use crate::counter::GenerationCounter;
use crate::recorder::VideoRecorder;
use crate::state::{RunOutcome, RunReport, RunState, Stage};

/// The capabilities a run calls out to.
pub struct Capabilities {
    pub sources: SourceRegistry,
    pub narrator: Arc<dyn Narrator>,
    pub visuals: Arc<dyn VisualSupplier>,
    pub composer: Arc<dyn Composer>,
    pub publishers: PublisherRegistry,
    pub recorder: Option<Arc<dyn VideoRecorder>>,
}

/// Run-level settings taken from configuration.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub scratch_root: PathBuf,
    pub output_dir: PathBuf,
    pub media_kind: MediaKind,
    pub duration_hint_secs: f64,
    pub overlay_text: bool,
    pub watermark: Option<PathBuf>,
}

impl PipelineSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            scratch_root: config.paths.scratch_root(),
            output_dir: config.paths.output_dir.clone(),
            media_kind: config.stock.media_kind,
            duration_hint_secs: config.stock.duration_hint_secs,
            overlay_text: config.compose.overlay_text,
            watermark: config.compose.watermark.clone(),
        }
    }
}

struct Inner {
    caps: Capabilities,
    settings: PipelineSettings,
    counter: GenerationCounter,
}

/// The generation-and-publish pipeline. Cheap to clone.
#[derive(Clone)]
pub struct Pipeline {
    inner: Arc<Inner>,
}

/// Why a run stopped before publishing.
enum Halt {
    Abandon(String),
    Fail(Stage, rf_core::Error),
}

impl Pipeline {
    pub fn new(caps: Capabilities, settings: PipelineSettings, counter: GenerationCounter) -> Self {
        Self {
            inner: Arc::new(Inner {
                caps,
                settings,
                counter,
            }),
        }
    }

    pub fn counter(&self) -> &GenerationCounter {
        &self.inner.counter
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.inner.settings
    }

    /// Run every user concurrently and wait for all of them.
    ///
    /// A run that panics is reported as failed for that user only, under
    /// the same run id its logs and scratch directory carry.
    pub async fn run_tick(&self, users: Vec<UserConfig>) -> Vec<RunReport> {
        let mut handles = Vec::with_capacity(users.len());
        for user in users {
            let pipeline = self.clone();
            let run_id = RunId::new();
            let email = user.email.clone();
            let handle = tokio::spawn(async move { pipeline.run_with_id(run_id, &user).await });
            handles.push((run_id, email, handle));
        }

        let mut reports = Vec::with_capacity(handles.len());
        for (run_id, email, handle) in handles {
            match handle.await {
                Ok(report) => reports.push(report),
                Err(e) => {
                    tracing::error!(run_id = %run_id.short(), user = %email, error = %e, "Run task died");
                    reports.push(RunReport {
                        run_id,
                        user: email,
                        outcome: RunOutcome::Failed {
                            stage: Stage::Run,
                            error: format!("run task died: {e}"),
                        },
                        trail: vec![RunState::Failed],
                    });
                }
            }
        }
        reports
    }

    /// Take one user from START to a terminal state.
    pub async fn run_user(&self, user: &UserConfig) -> RunReport {
        self.run_with_id(RunId::new(), user).await
    }

    async fn run_with_id(&self, run_id: RunId, user: &UserConfig) -> RunReport {
        let span = tracing::info_span!("run", run_id = %run_id.short(), user = %user.email);

        async move {
            let mut trail = vec![RunState::Start];
            let outcome = match self.execute(run_id, user, &mut trail).await {
                Ok((video, report)) => RunOutcome::Published { video, report },
                Err(Halt::Abandon(reason)) => {
                    tracing::info!(reason = %reason, "Run abandoned");
                    RunOutcome::Abandoned { reason }
                }
                Err(Halt::Fail(stage, e)) => {
                    tracing::error!(stage = %stage, error = %e, "Run failed");
                    RunOutcome::Failed {
                        stage,
                        error: e.to_string(),
                    }
                }
            };
            trail.push(outcome.state());
            tracing::info!(state = %outcome.state(), "Run finished");

            RunReport {
                run_id,
                user: user.email.clone(),
                outcome,
                trail,
            }
        }
        .instrument(span)
        .await
    }

    async fn execute(
        &self,
        run_id: RunId,
        user: &UserConfig,
        trail: &mut Vec<RunState>,
    ) -> Result<(PathBuf, PublishReport), Halt> {
        let caps = &self.inner.caps;
        let settings = &self.inner.settings;

        let items = fetch_content(&caps.sources, &user.topic, &user.sources).await;
        let Some(mut item) = items.into_iter().next() else {
            return Err(Halt::Abandon(format!(
                "no content for topic '{}' from {:?}",
                user.topic, user.sources
            )));
        };
        trail.push(RunState::ContentFetched);
        tracing::info!(source = %item.source, title = %item.title, "Content selected");

        let scratch = Scratch::new(&settings.scratch_root, run_id)
            .map_err(|e| Halt::Fail(Stage::Setup, e))?;

        trail.push(RunState::SynthAndAcquire);
        let (visual, audio) = self.synthesize_and_acquire(user, &item, &scratch).await?;
        let visual_guard = TempArtifact::new(visual.0.clone());
        let audio_guard = TempArtifact::new(audio.clone());

        let output = settings.output_dir.join(format!("{run_id}.mp4"));
        let request = ComposeRequest {
            visual: &visual.0,
            visual_kind: visual.1,
            audio: &audio,
            overlay: Overlay {
                text: settings.overlay_text.then(|| item.title.clone()),
                watermark: settings.watermark.clone(),
            },
            output,
            scratch: &scratch,
        };
        let video = caps
            .composer
            .compose(&request)
            .await
            .map_err(|e| Halt::Fail(Stage::Compose, e))?;
        self.inner.counter.increment();
        trail.push(RunState::Composed);

        item.attach_asset(&video)
            .map_err(|e| Halt::Fail(Stage::Compose, e))?;
        // Inputs are consumed; free scratch space before the uploads.
        drop(visual_guard);
        drop(audio_guard);
        scratch.close();

        let report = rf_publish::publish(&caps.publishers, user, &item)
            .await
            .map_err(|e| Halt::Fail(Stage::Publish, e))?;

        self.record(run_id, user, &item, &video, &report).await;
        Ok((video, report))
    }

    /// Narration and visual acquisition, concurrently.
    ///
    /// A genuine failure of either stage fails the run; an empty visual
    /// search on its own abandons it.
    async fn synthesize_and_acquire(
        &self,
        user: &UserConfig,
        item: &ContentItem,
        scratch: &Scratch,
    ) -> Result<((PathBuf, MediaKind), PathBuf), Halt> {
        let caps = &self.inner.caps;
        let settings = &self.inner.settings;
        let stem = format!("visual-{}", scratch.run_id().short());

        let (audio, visual) = tokio::join!(
            caps.narrator.synthesize(item.narration_text(), scratch),
            acquire_visual(
                caps.visuals.as_ref(),
                &user.topic,
                settings.media_kind,
                settings.duration_hint_secs,
                scratch.path(),
                &stem,
            ),
        );

        match (audio, visual) {
            (Ok(audio), Ok(visual)) => Ok((visual, audio)),
            (Err(e), visual) => {
                if let Ok((path, _)) = visual {
                    discard(&path);
                }
                Err(Halt::Fail(Stage::Narration, e))
            }
            (Ok(audio), Err(e)) => {
                discard(&audio);
                if e.is_empty_result() {
                    Err(Halt::Abandon(e.to_string()))
                } else {
                    Err(Halt::Fail(Stage::Visual, e))
                }
            }
        }
    }

    async fn record(
        &self,
        run_id: RunId,
        user: &UserConfig,
        item: &ContentItem,
        video: &Path,
        report: &PublishReport,
    ) {
        let Some(recorder) = &self.inner.caps.recorder else {
            return;
        };
        if let Err(e) = recorder.record(run_id, user, item, video, report).await {
            tracing::warn!(error = %e, "Failed to record video");
        }
    }
}
