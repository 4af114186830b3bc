//! # rf-av
//!
//! Audio/video processing and external tool management for the reelforge
//! pipeline.
//!
//! This crate provides:
//!
//! - **Tool discovery** ([`ToolRegistry`]) -- find and cache paths to ffmpeg,
//!   gtts-cli and espeak.
//! - **Command execution** ([`ToolCommand`]) -- async builder with timeout
//!   support for running external processes.
//! - **Scratch management** ([`Scratch`]) -- a per-run temporary directory
//!   that is removed when the run ends, on every path.
//! - **Narration** ([`Narrator`]) -- text-to-speech with a primary backend and
//!   a transcoding fallback.
//! - **Composition** ([`Composer`], [`FfmpegCompositor`]) -- merge a visual,
//!   the narration and optional overlays into the final video.

pub mod command;
pub mod compose;
pub mod narration;
pub mod scratch;
pub mod tools;

// ---- Re-exports for convenience ----

pub use command::{ToolCommand, ToolOutput};
pub use compose::{ComposeRequest, Composer, FfmpegCompositor, Overlay};
pub use narration::{EspeakNarrator, FallbackNarrator, GttsNarrator, Narrator};
pub use scratch::{discard, Scratch, TempArtifact};
pub use tools::{ToolConfig, ToolInfo, ToolRegistry};
