//! Narration synthesis.
//!
//! A [`Narrator`] turns text into an audio file inside the run's scratch
//! directory. [`GttsNarrator`] is the primary backend; [`EspeakNarrator`]
//! renders a wav and transcodes it to mp3 with ffmpeg. [`FallbackNarrator`]
//! chains the two: the fallback runs only when the primary fails, and when
//! both fail the stage fails once with both reasons.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;

use crate::scratch::{Scratch, TempArtifact};
use crate::tools::ToolRegistry;

/// Text-to-speech capability.
#[async_trait]
pub trait Narrator: Send + Sync {
    /// Short backend name used in logs and errors.
    fn name(&self) -> &'static str;

    /// Render `text` to an audio file inside `scratch` and return its path.
    async fn synthesize(&self, text: &str, scratch: &Scratch) -> rf_core::Result<PathBuf>;
}

/// Path of the narration output for a run.
fn narration_path(scratch: &Scratch, ext: &str) -> PathBuf {
    scratch.temp_file(&format!("narration-{}.{ext}", scratch.run_id().short()))
}

/// Write the narration text to a scratch file so it never travels through
/// argv (length limits, leading dashes).
fn write_text_file(text: &str, scratch: &Scratch, backend: &str) -> rf_core::Result<TempArtifact> {
    let path = scratch.temp_file(&format!(
        "narration-{}-{backend}.txt",
        scratch.run_id().short()
    ));
    std::fs::write(&path, text)?;
    Ok(TempArtifact::new(path))
}

fn ensure_text(text: &str) -> rf_core::Result<()> {
    if text.trim().is_empty() {
        return Err(rf_core::Error::Validation(
            "narration text is empty".into(),
        ));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// gTTS
// ---------------------------------------------------------------------------

/// Google Translate TTS through `gtts-cli`.
pub struct GttsNarrator {
    tools: Arc<ToolRegistry>,
}

impl GttsNarrator {
    pub fn new(tools: Arc<ToolRegistry>) -> Self {
        Self { tools }
    }
}

#[async_trait]
impl Narrator for GttsNarrator {
    fn name(&self) -> &'static str {
        "gtts"
    }

    async fn synthesize(&self, text: &str, scratch: &Scratch) -> rf_core::Result<PathBuf> {
        ensure_text(text)?;
        let output = narration_path(scratch, "mp3");
        let text_file = write_text_file(text, scratch, self.name())?;

        let mut cmd = self.tools.command("gtts-cli")?;
        cmd.arg("--file")
            .arg(text_file.path().to_string_lossy().as_ref())
            .arg("--output")
            .arg(output.to_string_lossy().as_ref());
        cmd.execute().await?;

        Ok(output)
    }
}

// ---------------------------------------------------------------------------
// espeak
// ---------------------------------------------------------------------------

/// Local `espeak` synthesis, transcoded from wav to mp3 with ffmpeg.
pub struct EspeakNarrator {
    tools: Arc<ToolRegistry>,
}

impl EspeakNarrator {
    pub fn new(tools: Arc<ToolRegistry>) -> Self {
        Self { tools }
    }
}

#[async_trait]
impl Narrator for EspeakNarrator {
    fn name(&self) -> &'static str {
        "espeak"
    }

    async fn synthesize(&self, text: &str, scratch: &Scratch) -> rf_core::Result<PathBuf> {
        ensure_text(text)?;
        let output = narration_path(scratch, "mp3");
        let wav = TempArtifact::new(narration_path(scratch, "wav"));
        let text_file = write_text_file(text, scratch, self.name())?;

        let mut espeak = self.tools.command("espeak")?;
        espeak
            .arg("-f")
            .arg(text_file.path().to_string_lossy().as_ref())
            .arg("-w")
            .arg(wav.path().to_string_lossy().as_ref());
        espeak.execute().await?;

        let mut ffmpeg = self.tools.command("ffmpeg")?;
        ffmpeg
            .args(["-y", "-i"])
            .arg(wav.path().to_string_lossy().as_ref())
            .args(["-q:a", "2"])
            .arg(output.to_string_lossy().as_ref());
        ffmpeg.execute().await?;

        Ok(output)
    }
}

// ---------------------------------------------------------------------------
// Fallback chain
// ---------------------------------------------------------------------------

/// Try `primary`, then `fallback`. There is no third attempt.
pub struct FallbackNarrator {
    primary: Box<dyn Narrator>,
    fallback: Box<dyn Narrator>,
}

impl FallbackNarrator {
    pub fn new(primary: Box<dyn Narrator>, fallback: Box<dyn Narrator>) -> Self {
        Self { primary, fallback }
    }

    /// The standard chain: gtts-cli, then espeak + ffmpeg.
    pub fn standard(tools: Arc<ToolRegistry>) -> Self {
        Self::new(
            Box::new(GttsNarrator::new(tools.clone())),
            Box::new(EspeakNarrator::new(tools)),
        )
    }
}

#[async_trait]
impl Narrator for FallbackNarrator {
    fn name(&self) -> &'static str {
        "fallback"
    }

    async fn synthesize(&self, text: &str, scratch: &Scratch) -> rf_core::Result<PathBuf> {
        let primary_err = match self.primary.synthesize(text, scratch).await {
            Ok(path) => {
                tracing::info!(backend = self.primary.name(), path = %path.display(), "Narration synthesized");
                return Ok(path);
            }
            Err(e) => e,
        };

        tracing::warn!(
            backend = self.primary.name(),
            error = %primary_err,
            "Primary narration backend failed; trying {}",
            self.fallback.name()
        );

        match self.fallback.synthesize(text, scratch).await {
            Ok(path) => {
                tracing::info!(backend = self.fallback.name(), path = %path.display(), "Narration synthesized");
                Ok(path)
            }
            Err(fallback_err) => Err(rf_core::Error::pipeline(
                "narration",
                format!(
                    "{}: {primary_err}; {}: {fallback_err}",
                    self.primary.name(),
                    self.fallback.name()
                ),
            )),
        }
    }
}
