//! Video composition with ffmpeg.
//!
//! Composition runs in up to two ffmpeg passes:
//!
//! 1. **Text pass** (optional): render the overlay text onto the visual with
//!    `drawtext`. The text is read from a scratch file so it never needs
//!    filter escaping.
//! 2. **Mux pass**: combine the (possibly text-rendered) visual with the
//!    narration, optionally overlaying a watermark at the bottom-right, and
//!    cut to the shorter of the two streams.
//!
//! Intermediate files are removed whether composition succeeds or fails, and
//! a partially written output is deleted on failure.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use rf_core::config::ComposeConfig;
use rf_core::MediaKind;

use crate::scratch::{discard, Scratch, TempArtifact};
use crate::tools::ToolRegistry;

/// Longest overlay line, in characters.
const WRAP_WIDTH: usize = 32;
/// Overlay lines kept before the text is cut.
const MAX_LINES: usize = 6;

/// What to draw over the visual.
#[derive(Debug, Clone, Default)]
pub struct Overlay {
    /// Text rendered centred over the visual.
    pub text: Option<String>,
    /// Image overlaid at the bottom-right corner.
    pub watermark: Option<PathBuf>,
}

/// Inputs for one composition.
#[derive(Debug)]
pub struct ComposeRequest<'a> {
    pub visual: &'a Path,
    pub visual_kind: MediaKind,
    pub audio: &'a Path,
    pub overlay: Overlay,
    /// Final video location; parent directories are created as needed.
    pub output: PathBuf,
    pub scratch: &'a Scratch,
}

/// Combines a visual and a narration track into a single video.
#[async_trait]
pub trait Composer: Send + Sync {
    async fn compose(&self, req: &ComposeRequest<'_>) -> rf_core::Result<PathBuf>;
}

/// [`Composer`] backed by the ffmpeg CLI.
pub struct FfmpegCompositor {
    tools: Arc<ToolRegistry>,
    settings: ComposeConfig,
}

impl FfmpegCompositor {
    pub fn new(tools: Arc<ToolRegistry>, settings: ComposeConfig) -> Self {
        Self { tools, settings }
    }

    /// Arguments for the drawtext pass.
    fn text_pass_args(
        &self,
        visual: &Path,
        kind: MediaKind,
        text_file: &Path,
        output: &Path,
    ) -> Vec<String> {
        let mut args: Vec<String> = vec!["-y".into()];
        if kind == MediaKind::Photo {
            args.extend(["-loop".into(), "1".into()]);
        }
        args.extend(["-i".into(), visual.to_string_lossy().to_string()]);
        args.extend([
            "-vf".into(),
            format!(
                "drawtext=textfile={}:fontcolor={}:fontsize={}:x=(w-text_w)/2:y=(h-text_h)/2",
                escape_filter_path(text_file),
                self.settings.font_color,
                self.settings.font_size
            ),
        ]);
        args.extend([
            "-t".into(),
            self.settings.max_duration_secs.to_string(),
            "-an".into(),
            "-c:v".into(),
            self.settings.video_codec.clone(),
            "-pix_fmt".into(),
            "yuv420p".into(),
            output.to_string_lossy().to_string(),
        ]);
        args
    }

    /// Arguments for the final mux pass.
    fn mux_args(
        &self,
        visual: &Path,
        kind: MediaKind,
        audio: &Path,
        watermark: Option<&Path>,
        output: &Path,
    ) -> Vec<String> {
        let mut args: Vec<String> = vec!["-y".into()];
        if kind == MediaKind::Photo {
            args.extend(["-loop".into(), "1".into()]);
        }
        args.extend(["-i".into(), visual.to_string_lossy().to_string()]);
        args.extend(["-i".into(), audio.to_string_lossy().to_string()]);

        match watermark {
            Some(wm) => {
                args.extend(["-i".into(), wm.to_string_lossy().to_string()]);
                args.extend([
                    "-filter_complex".into(),
                    "[0:v][2:v]overlay=W-w-10:H-h-10:format=auto[v]".into(),
                    "-map".into(),
                    "[v]".into(),
                ]);
            }
            None => args.extend(["-map".into(), "0:v".into()]),
        }

        args.extend([
            "-map".into(),
            "1:a".into(),
            "-c:v".into(),
            self.settings.video_codec.clone(),
            "-c:a".into(),
            self.settings.audio_codec.clone(),
            "-pix_fmt".into(),
            "yuv420p".into(),
            "-shortest".into(),
            "-t".into(),
            self.settings.max_duration_secs.to_string(),
            output.to_string_lossy().to_string(),
        ]);
        args
    }

    async fn run_ffmpeg(&self, args: Vec<String>) -> rf_core::Result<()> {
        let mut cmd = self.tools.command("ffmpeg")?;
        cmd.args(args);
        cmd.execute().await?;
        Ok(())
    }

    async fn compose_inner(&self, req: &ComposeRequest<'_>) -> rf_core::Result<()> {
        let short = req.scratch.run_id().short();
        let mut visual = req.visual.to_path_buf();
        let mut kind = req.visual_kind;

        // Held until the end of this function so the intermediates outlive
        // the mux pass and are removed on every exit path.
        let mut _intermediates: Vec<TempArtifact> = Vec::new();

        if let Some(text) = req.overlay.text.as_deref().filter(|t| !t.trim().is_empty()) {
            let text_file = TempArtifact::new(
                req.scratch.temp_file(&format!("compose-{short}-text.txt")),
            );
            std::fs::write(text_file.path(), wrap_text(text, WRAP_WIDTH, MAX_LINES))?;

            let rendered = TempArtifact::new(
                req.scratch.temp_file(&format!("compose-{short}-text.mp4")),
            );
            let args = self.text_pass_args(&visual, kind, text_file.path(), rendered.path());
            self.run_ffmpeg(args).await?;
            tracing::debug!(path = %rendered.path().display(), "Rendered text overlay");

            visual = rendered.path().to_path_buf();
            kind = MediaKind::Video;
            _intermediates.push(text_file);
            _intermediates.push(rendered);
        }

        let args = self.mux_args(
            &visual,
            kind,
            req.audio,
            req.overlay.watermark.as_deref(),
            &req.output,
        );
        self.run_ffmpeg(args).await
    }
}

#[async_trait]
impl Composer for FfmpegCompositor {
    async fn compose(&self, req: &ComposeRequest<'_>) -> rf_core::Result<PathBuf> {
        if let Some(parent) = req.output.parent() {
            std::fs::create_dir_all(parent)?;
        }

        match self.compose_inner(req).await {
            Ok(()) => {
                tracing::info!(output = %req.output.display(), "Composed video");
                Ok(req.output.clone())
            }
            Err(e) => {
                discard(&req.output);
                Err(e)
            }
        }
    }
}

/// Greedy word wrap for the drawtext overlay. Text beyond `max_lines` is cut
/// and marked with an ellipsis.
pub fn wrap_text(text: &str, width: usize, max_lines: usize) -> String {
    let mut lines: Vec<String> = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        if !current.is_empty() && current.chars().count() + 1 + word.chars().count() > width {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        lines.push(current);
    }

    if lines.len() > max_lines {
        lines.truncate(max_lines);
        if let Some(last) = lines.last_mut() {
            last.push_str("...");
        }
    }
    lines.join("\n")
}

/// Quote a path for use as a filter option value.
fn escape_filter_path(path: &Path) -> String {
    let raw = path.to_string_lossy();
    format!("'{}'", raw.replace('\'', r"'\''"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rf_core::RunId;

    fn compositor(settings: ComposeConfig) -> FfmpegCompositor {
        FfmpegCompositor::new(Arc::new(ToolRegistry::default()), settings)
    }

    #[test]
    fn wrap_text_breaks_on_width() {
        let wrapped = wrap_text("the quick brown fox jumps over the lazy dog", 15, 10);
        for line in wrapped.lines() {
            assert!(line.chars().count() <= 15, "line too long: {line}");
        }
        assert_eq!(wrapped.replace('\n', " "), "the quick brown fox jumps over the lazy dog");
    }

    #[test]
    fn wrap_text_truncates_extra_lines() {
        let wrapped = wrap_text("one two three four five six", 3, 2);
        assert_eq!(wrapped, "one\ntwo...");
    }

    #[test]
    fn wrap_text_long_word_stays_whole() {
        assert_eq!(wrap_text("supercalifragilistic", 5, 3), "supercalifragilistic");
    }

    #[test]
    fn escape_quotes_in_path() {
        assert_eq!(escape_filter_path(Path::new("/tmp/a.txt")), "'/tmp/a.txt'");
        assert_eq!(
            escape_filter_path(Path::new("/tmp/it's.txt")),
            r"'/tmp/it'\''s.txt'"
        );
    }

    #[test]
    fn mux_without_watermark_maps_visual_and_audio() {
        let c = compositor(ComposeConfig::default());
        let args = c.mux_args(
            Path::new("v.mp4"),
            MediaKind::Video,
            Path::new("a.mp3"),
            None,
            Path::new("out.mp4"),
        );
        let joined = args.join(" ");
        assert!(joined.starts_with("-y -i v.mp4 -i a.mp3 -map 0:v -map 1:a"), "{joined}");
        assert!(joined.contains("-c:v libx264 -c:a aac"));
        assert!(joined.contains("-shortest"));
        assert!(!joined.contains("-loop"));
        assert_eq!(args.last().unwrap(), "out.mp4");
    }

    #[test]
    fn mux_with_watermark_uses_overlay_filter() {
        let c = compositor(ComposeConfig::default());
        let args = c.mux_args(
            Path::new("v.jpg"),
            MediaKind::Photo,
            Path::new("a.mp3"),
            Some(Path::new("wm.png")),
            Path::new("out.mp4"),
        );
        let joined = args.join(" ");
        assert!(joined.starts_with("-y -loop 1 -i v.jpg -i a.mp3 -i wm.png"), "{joined}");
        assert!(joined.contains("[0:v][2:v]overlay=W-w-10:H-h-10:format=auto[v]"));
        assert!(joined.contains("-map [v] -map 1:a"));
        assert!(joined.contains("-t 60"));
    }

    #[test]
    fn text_pass_uses_configured_font() {
        let settings = ComposeConfig {
            font_size: 32,
            font_color: "yellow".into(),
            ..Default::default()
        };
        let c = compositor(settings);
        let args = c.text_pass_args(
            Path::new("v.mp4"),
            MediaKind::Video,
            Path::new("/s/t.txt"),
            Path::new("/s/t.mp4"),
        );
        let vf = &args[args.iter().position(|a| a == "-vf").unwrap() + 1];
        assert_eq!(
            vf,
            "drawtext=textfile='/s/t.txt':fontcolor=yellow:fontsize=32:x=(w-text_w)/2:y=(h-text_h)/2"
        );
        assert!(args.contains(&"-an".to_string()));
    }

    #[tokio::test]
    async fn missing_ffmpeg_fails_and_leaves_no_output() {
        let root = tempfile::tempdir().unwrap();
        let scratch = Scratch::new(root.path(), RunId::new()).unwrap();
        let output = root.path().join("out/final.mp4");
        let c = compositor(ComposeConfig::default());

        let req = ComposeRequest {
            visual: Path::new("v.mp4"),
            visual_kind: MediaKind::Video,
            audio: Path::new("a.mp3"),
            overlay: Overlay {
                text: Some("hello".into()),
                watermark: None,
            },
            output: output.clone(),
            scratch: &scratch,
        };
        let err = c.compose(&req).await.unwrap_err();
        assert!(err.to_string().contains("ffmpeg not found"), "got: {err}");
        assert!(!output.exists());
        assert_eq!(std::fs::read_dir(scratch.path()).unwrap().count(), 0);
    }

    #[cfg(unix)]
    fn fake_ffmpeg(dir: &Path, body: &str) -> ToolRegistry {
        use std::os::unix::fs::PermissionsExt;
        let path = dir.join("ffmpeg");
        std::fs::write(&path, format!("#!/bin/sh\nfor a; do last=$a; done\necho data > \"$last\"\n{body}")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        ToolRegistry::default().with_tool("ffmpeg", path, std::time::Duration::from_secs(5))
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn intermediates_removed_after_success() {
        let root = tempfile::tempdir().unwrap();
        let bin = tempfile::tempdir().unwrap();
        let scratch = Scratch::new(root.path(), RunId::new()).unwrap();
        let output = root.path().join("videos/final.mp4");
        let c = FfmpegCompositor::new(
            Arc::new(fake_ffmpeg(bin.path(), "")),
            ComposeConfig::default(),
        );

        let req = ComposeRequest {
            visual: Path::new("v.mp4"),
            visual_kind: MediaKind::Video,
            audio: Path::new("a.mp3"),
            overlay: Overlay {
                text: Some("a headline worth reading".into()),
                watermark: None,
            },
            output: output.clone(),
            scratch: &scratch,
        };
        let path = c.compose(&req).await.unwrap();
        assert_eq!(path, output);
        assert!(output.exists());
        assert_eq!(std::fs::read_dir(scratch.path()).unwrap().count(), 0);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn failed_mux_removes_partial_output_and_intermediates() {
        let root = tempfile::tempdir().unwrap();
        let bin = tempfile::tempdir().unwrap();
        let scratch = Scratch::new(root.path(), RunId::new()).unwrap();
        let output = root.path().join("final.mp4");
        let tools = fake_ffmpeg(
            bin.path(),
            "case \"$*\" in *-shortest*) echo 'mux failed' >&2; exit 1;; esac\n",
        );
        let c = FfmpegCompositor::new(Arc::new(tools), ComposeConfig::default());

        let req = ComposeRequest {
            visual: Path::new("v.mp4"),
            visual_kind: MediaKind::Video,
            audio: Path::new("a.mp3"),
            overlay: Overlay {
                text: Some("headline".into()),
                watermark: None,
            },
            output: output.clone(),
            scratch: &scratch,
        };
        let err = c.compose(&req).await.unwrap_err();
        assert!(err.to_string().contains("mux failed"), "got: {err}");
        assert!(!output.exists());
        assert_eq!(std::fs::read_dir(scratch.path()).unwrap().count(), 0);
    }
}
