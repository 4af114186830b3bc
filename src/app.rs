//! Wiring of configuration into a runnable pipeline.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use rf_av::{FallbackNarrator, FfmpegCompositor, ToolRegistry};
use rf_core::config::{Config, UserConfig};
use rf_db::DbPool;
use rf_pipeline::{
    Capabilities, GenerationCounter, Pipeline, PipelineSettings, SqliteRecorder, UserLoader,
    VideoRecorder,
};
use rf_publish::PublisherRegistry;
use rf_sources::{build_client, PexelsSupplier, SourceRegistry, VisualSupplier};

/// A pipeline assembled from configuration.
pub struct App {
    pub pipeline: Pipeline,
    pub db: Option<DbPool>,
}

/// Build every capability the pipeline needs from `config`.
pub fn build(config: &Config) -> anyhow::Result<App> {
    let tools = Arc::new(ToolRegistry::discover(&config.tools));

    let http = build_client(
        Duration::from_secs(config.http.timeout_secs),
        &config.http.user_agent,
    )?;
    let transfer_http = build_client(
        Duration::from_secs(config.http.upload_timeout_secs),
        &config.http.user_agent,
    )?;

    let visuals = stock_supplier(config, http.clone(), transfer_http.clone())?;

    let db = match &config.database.path {
        Some(path) => Some(
            rf_db::init_pool(path)
                .with_context(|| format!("opening database {}", path.display()))?,
        ),
        None => None,
    };
    let recorder = db
        .clone()
        .map(|pool| Arc::new(SqliteRecorder::new(pool)) as Arc<dyn VideoRecorder>);

    let caps = Capabilities {
        sources: SourceRegistry::with_defaults(http),
        narrator: Arc::new(FallbackNarrator::standard(tools.clone())),
        visuals,
        composer: Arc::new(FfmpegCompositor::new(tools, config.compose.clone())),
        publishers: PublisherRegistry::with_defaults(transfer_http),
        recorder,
    };

    let pipeline = Pipeline::new(
        caps,
        PipelineSettings::from_config(config),
        GenerationCounter::new(),
    );
    Ok(App { pipeline, db })
}

fn stock_supplier(
    config: &Config,
    http: reqwest::Client,
    download_http: reqwest::Client,
) -> anyhow::Result<Arc<dyn VisualSupplier>> {
    match config.stock.provider.to_lowercase().as_str() {
        "pexels" => {
            let key = match &config.stock.api_key {
                Some(key) => key.clone(),
                None => {
                    tracing::warn!("stock.api_key is not set; visual searches will be rejected");
                    String::new()
                }
            };
            let mut supplier = PexelsSupplier::new(http, download_http, key);
            if let Some(base) = &config.stock.base_url {
                supplier = supplier.with_base_url(base.clone());
            }
            Ok(Arc::new(supplier))
        }
        other => Err(rf_core::Error::unsupported("stock provider", other).into()),
    }
}

/// Load configuration, falling back to defaults when no path is given.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    match path {
        Some(p) => Config::load(p).with_context(|| format!("loading config {}", p.display())),
        None => {
            tracing::info!("No config file specified; using defaults");
            Ok(Config::default())
        }
    }
}

/// A loader that re-reads the user list at every tick.
///
/// With no config file the users captured at startup are reused.
pub fn user_loader(path: Option<PathBuf>, fallback: Vec<UserConfig>) -> UserLoader {
    match path {
        Some(path) => Arc::new(move || Config::load(&path).map(|c| c.users)),
        None => Arc::new(move || Ok(fallback.clone())),
    }
}

/// Restrict `users` to the one with `email`, if given.
pub fn select_users(users: Vec<UserConfig>, email: Option<&str>) -> anyhow::Result<Vec<UserConfig>> {
    let Some(email) = email else {
        return Ok(users);
    };
    let selected: Vec<UserConfig> = users.into_iter().filter(|u| u.email == email).collect();
    if selected.is_empty() {
        anyhow::bail!("no configured user with email {email}");
    }
    Ok(selected)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(email: &str) -> UserConfig {
        UserConfig {
            email: email.into(),
            topic: "space".into(),
            ..Default::default()
        }
    }

    #[test]
    fn select_users_filters_by_email() {
        let users = vec![user("a@example.com"), user("b@example.com")];
        let selected = select_users(users.clone(), Some("b@example.com")).unwrap();
        assert_eq!(selected, vec![user("b@example.com")]);
        assert_eq!(select_users(users.clone(), None).unwrap().len(), 2);
        assert!(select_users(users, Some("c@example.com")).is_err());
    }

    #[test]
    fn unknown_stock_provider_is_rejected() {
        let mut config = Config::default();
        config.stock.provider = "pixabay".into();
        let err = build(&config).err().unwrap();
        assert!(err.to_string().contains("Unsupported stock provider: pixabay"));
    }

    #[test]
    fn build_opens_database_when_configured() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.database.path = Some(dir.path().join("db").join("reelforge.db"));
        let app = build(&config).unwrap();
        assert!(app.db.is_some());
        assert!(dir.path().join("db").join("reelforge.db").exists());
    }

    #[test]
    fn loader_rereads_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"users":[{"email":"a@example.com","topic":"space"}]}"#).unwrap();

        let loader = user_loader(Some(path.clone()), vec![]);
        assert_eq!(loader().unwrap().len(), 1);

        std::fs::write(
            &path,
            r#"{"users":[{"email":"a@example.com","topic":"space"},{"email":"b@example.com","topic":"sea"}]}"#,
        )
        .unwrap();
        assert_eq!(loader().unwrap().len(), 2);

        std::fs::write(&path, "not json").unwrap();
        assert!(loader().is_err());
    }

    #[test]
    fn loader_without_file_reuses_startup_users() {
        let loader = user_loader(None, vec![user("a@example.com")]);
        assert_eq!(loader().unwrap(), vec![user("a@example.com")]);
    }
}
