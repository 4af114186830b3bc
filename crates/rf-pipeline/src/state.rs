//! Per-run state machine.
//!
//! ```text
//! START -> CONTENT_FETCHED -> (ABANDONED | SYNTH_AND_ACQUIRE) -> COMPOSED
//!       -> PUBLISHED(partial|full) | FAILED
//! ```

use std::fmt;
use std::path::PathBuf;

use rf_core::RunId;
use rf_publish::PublishReport;
use serde::Serialize;

/// States a run passes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RunState {
    Start,
    ContentFetched,
    Abandoned,
    SynthAndAcquire,
    Composed,
    Published { partial: bool },
    Failed,
}

impl RunState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RunState::Abandoned | RunState::Published { .. } | RunState::Failed
        )
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunState::Start => f.write_str("START"),
            RunState::ContentFetched => f.write_str("CONTENT_FETCHED"),
            RunState::Abandoned => f.write_str("ABANDONED"),
            RunState::SynthAndAcquire => f.write_str("SYNTH_AND_ACQUIRE"),
            RunState::Composed => f.write_str("COMPOSED"),
            RunState::Published { partial: true } => f.write_str("PUBLISHED(partial)"),
            RunState::Published { partial: false } => f.write_str("PUBLISHED(full)"),
            RunState::Failed => f.write_str("FAILED"),
        }
    }
}

/// Pipeline stage that can fail a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Setup,
    Narration,
    Visual,
    Compose,
    Publish,
    /// The run task itself died (panic).
    Run,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::Setup => "setup",
            Stage::Narration => "narration",
            Stage::Visual => "visual",
            Stage::Compose => "compose",
            Stage::Publish => "publish",
            Stage::Run => "run",
        };
        f.write_str(s)
    }
}

/// How a run ended.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RunOutcome {
    Abandoned { reason: String },
    Failed { stage: Stage, error: String },
    Published { video: PathBuf, report: PublishReport },
}

impl RunOutcome {
    /// The terminal state this outcome corresponds to.
    pub fn state(&self) -> RunState {
        match self {
            RunOutcome::Abandoned { .. } => RunState::Abandoned,
            RunOutcome::Failed { .. } => RunState::Failed,
            RunOutcome::Published { report, .. } => RunState::Published {
                partial: !report.is_full(),
            },
        }
    }
}

/// Everything known about one finished run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: RunId,
    pub user: String,
    pub outcome: RunOutcome,
    /// States visited, in order, ending with the terminal state.
    pub trail: Vec<RunState>,
}

impl RunReport {
    pub fn state(&self) -> RunState {
        self.outcome.state()
    }

    pub fn reached(&self, state: RunState) -> bool {
        self.trail.contains(&state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rf_publish::PlatformOutcome;

    #[test]
    fn display_names() {
        assert_eq!(RunState::SynthAndAcquire.to_string(), "SYNTH_AND_ACQUIRE");
        assert_eq!(
            RunState::Published { partial: true }.to_string(),
            "PUBLISHED(partial)"
        );
        assert_eq!(Stage::Compose.to_string(), "compose");
    }

    #[test]
    fn terminal_states() {
        assert!(RunState::Abandoned.is_terminal());
        assert!(RunState::Failed.is_terminal());
        assert!(RunState::Published { partial: false }.is_terminal());
        assert!(!RunState::Composed.is_terminal());
        assert!(!RunState::Start.is_terminal());
    }

    #[test]
    fn outcome_state_reflects_partial_publish() {
        let report = PublishReport {
            outcomes: vec![
                PlatformOutcome { platform: "youtube".into(), error: None },
                PlatformOutcome { platform: "vimeo".into(), error: Some("boom".into()) },
            ],
        };
        let outcome = RunOutcome::Published {
            video: PathBuf::from("/v.mp4"),
            report,
        };
        assert_eq!(outcome.state(), RunState::Published { partial: true });
    }
}
