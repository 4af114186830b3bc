//! Application configuration types.
//!
//! The top-level [`Config`] struct is deserialized from JSON (or TOML, by file
//! extension) and carries the user list plus every sub-config the pipeline
//! needs. Every section defaults sensibly so a completely empty `{}` file is
//! valid.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::content::MediaKind;
use crate::error::Result;
use crate::Error;

/// Default cron expression: every day at 01:00:00 UTC.
pub const DEFAULT_SCHEDULE: &str = "0 0 1 * * *";

// ---------------------------------------------------------------------------
// Top-level Config
// ---------------------------------------------------------------------------

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub schedule: ScheduleConfig,
    pub paths: PathsConfig,
    pub tools: ToolsConfig,
    pub compose: ComposeConfig,
    pub stock: StockConfig,
    pub http: HttpConfig,
    pub metrics: MetricsConfig,
    pub database: DatabaseConfig,
    pub users: Vec<UserConfig>,
}

impl Config {
    /// Deserialize a `Config` from a JSON string.
    pub fn from_json(json_str: &str) -> Result<Self> {
        serde_json::from_str(json_str)
            .map_err(|e| Error::Validation(format!("config parse error: {e}")))
    }

    /// Deserialize a `Config` from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        toml::from_str(toml_str)
            .map_err(|e| Error::Validation(format!("config parse error: {e}")))
    }

    /// Load configuration from a file, choosing the format by extension
    /// (`.toml` is TOML, anything else JSON).
    ///
    /// A missing or malformed file is an error.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let is_toml = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
        if is_toml {
            Self::from_toml(&contents)
        } else {
            Self::from_json(&contents)
        }
    }

    /// Return a list of validation warnings (non-fatal issues).
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.schedule.cron.split_whitespace().count() < 6 {
            warnings.push(format!(
                "schedule.cron '{}' should have 6 or 7 fields (seconds first)",
                self.schedule.cron
            ));
        }

        if self.users.is_empty() {
            warnings.push("no users configured; scheduler ticks will do nothing".into());
        }

        if self.stock.api_key.is_none() {
            warnings.push("stock.api_key is not set; visual acquisition will fail".into());
        }

        if self.metrics.enabled && self.metrics.listen.parse::<std::net::SocketAddr>().is_err() {
            warnings.push(format!(
                "metrics.listen '{}' is not a valid socket address",
                self.metrics.listen
            ));
        }

        if let Some(ref wm) = self.compose.watermark {
            if !wm.exists() {
                warnings.push(format!(
                    "compose.watermark {} does not exist",
                    wm.display()
                ));
            }
        }

        for (i, user) in self.users.iter().enumerate() {
            if user.email.is_empty() {
                warnings.push(format!("users[{i}].email is empty"));
            }
            if user.topic.trim().is_empty() {
                warnings.push(format!("users[{i}].topic is empty"));
            }
            if user.sources.is_empty() {
                warnings.push(format!("users[{i}].sources is empty; runs will be abandoned"));
            }
            if user.platforms.is_empty() {
                warnings.push(format!("users[{i}].platforms is empty; nothing will be published"));
            }
            for (j, platform) in user.platforms.iter().enumerate() {
                if platform.name.is_empty() {
                    warnings.push(format!("users[{i}].platforms[{j}].name is empty"));
                }
                if platform.credentials.is_none() {
                    warnings.push(format!(
                        "users[{i}].platforms[{j}] ({}) has no credentials",
                        platform.name
                    ));
                }
            }
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

/// One configured user: a topic, the sources to draw content from, and the
/// platforms to publish to.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserConfig {
    pub email: String,
    #[serde(alias = "theme")]
    pub topic: String,
    #[serde(default)]
    pub sources: Vec<String>,
    #[serde(default)]
    pub platforms: Vec<PlatformConfig>,
}

/// A platform the user publishes to.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlatformConfig {
    pub name: String,
    /// Credentials reference (for YouTube: the OAuth client-secret file).
    #[serde(default, alias = "credentials_ref")]
    pub credentials: Option<PathBuf>,
    #[serde(default)]
    pub api_key: Option<String>,
    /// Upload target override (for YouTube: the upload endpoint URL).
    #[serde(default)]
    pub upload_path: Option<String>,
    /// OAuth token file; defaults to `token.json` next to the credentials.
    #[serde(default)]
    pub token: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

/// When the scheduler fires.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Cron expression with a leading seconds field, evaluated in UTC.
    pub cron: String,
    /// Run one tick immediately when the scheduler starts.
    pub run_on_start: bool,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            cron: DEFAULT_SCHEDULE.into(),
            run_on_start: false,
        }
    }
}

/// Filesystem locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Root for per-run scratch directories; `None` means the OS temp dir.
    pub scratch_dir: Option<PathBuf>,
    /// Where finished videos are written.
    pub output_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            scratch_dir: None,
            output_dir: PathBuf::from("./data/videos"),
        }
    }
}

impl PathsConfig {
    /// The effective scratch root.
    pub fn scratch_root(&self) -> PathBuf {
        self.scratch_dir
            .clone()
            .unwrap_or_else(std::env::temp_dir)
    }
}

/// Paths to external CLI tools.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub ffmpeg_path: Option<PathBuf>,
    pub gtts_path: Option<PathBuf>,
    pub espeak_path: Option<PathBuf>,
    #[serde(default = "default_tool_timeout")]
    pub timeout_secs: u64,
}

fn default_tool_timeout() -> u64 {
    600
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: None,
            gtts_path: None,
            espeak_path: None,
            timeout_secs: default_tool_timeout(),
        }
    }
}

/// Compositor settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ComposeConfig {
    /// Render the narration text over the visual before muxing.
    pub overlay_text: bool,
    /// Image overlaid at the bottom-right corner.
    pub watermark: Option<PathBuf>,
    pub font_size: u32,
    pub font_color: String,
    pub video_codec: String,
    pub audio_codec: String,
    /// Hard cap on the output length; bounds looped photo visuals.
    pub max_duration_secs: u64,
}

impl Default for ComposeConfig {
    fn default() -> Self {
        Self {
            overlay_text: true,
            watermark: None,
            font_size: 48,
            font_color: "white".into(),
            video_codec: "libx264".into(),
            audio_codec: "aac".into(),
            max_duration_secs: 60,
        }
    }
}

/// Stock visual provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StockConfig {
    pub provider: String,
    pub api_key: Option<String>,
    pub media_kind: MediaKind,
    /// Target clip length in seconds; video searches accept +/- 5 seconds.
    pub duration_hint_secs: f64,
    /// Override for the provider API base URL.
    pub base_url: Option<String>,
}

impl Default for StockConfig {
    fn default() -> Self {
        Self {
            provider: "pexels".into(),
            api_key: None,
            media_kind: MediaKind::Video,
            duration_hint_secs: 15.0,
            base_url: None,
        }
    }
}

/// Outbound HTTP settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Timeout for content-source and stock-search requests.
    pub timeout_secs: u64,
    /// Timeout for media downloads and platform uploads.
    pub upload_timeout_secs: u64,
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            upload_timeout_secs: 600,
            user_agent: concat!("reelforge/", env!("CARGO_PKG_VERSION")).into(),
        }
    }
}

/// Prometheus exporter settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub enabled: bool,
    pub listen: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            listen: "0.0.0.0:9090".into(),
        }
    }
}

/// Video record persistence.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite file; `None` disables persistence.
    pub path: Option<PathBuf>,
}
