//! # rf-pipeline
//!
//! The generation-and-publish pipeline and its scheduler.
//!
//! - **[`Pipeline`]** -- runs one user through fetch, narration and visual
//!   acquisition (concurrently), composition and publish fan-out, returning a
//!   [`RunReport`]. [`Pipeline::run_tick`] runs every user of a tick
//!   concurrently and isolates their failures.
//! - **[`RunState`] / [`RunOutcome`]** -- the per-run state machine.
//! - **[`GenerationCounter`]** -- shared count of composed videos, mirrored
//!   to the `videos_generated_total` metric.
//! - **[`Scheduler`]** -- fires ticks on a cron schedule until cancelled.
//! - **[`VideoRecorder`]** -- optional persistence of published videos.

pub mod counter;
pub mod recorder;
pub mod run;
pub mod scheduler;
pub mod state;

pub use counter::{GenerationCounter, VIDEOS_GENERATED};
pub use recorder::{SqliteRecorder, VideoRecorder};
pub use run::{Capabilities, Pipeline, PipelineSettings};
pub use scheduler::{Scheduler, UserLoader};
pub use state::{RunOutcome, RunReport, RunState, Stage};
