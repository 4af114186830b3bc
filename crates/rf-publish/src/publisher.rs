//! Platform publish capability and the registry that builds clients.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use rf_core::config::PlatformConfig;

use crate::youtube::YouTubePublisher;

/// Uploads a finished video to one platform.
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Platform name used in logs and reports.
    fn platform(&self) -> &str;

    async fn upload(
        &self,
        asset: &Path,
        title: &str,
        description: &str,
        tags: &[String],
    ) -> rf_core::Result<()>;
}

/// Builds a client for one platform entry of a user.
pub type PublisherFactory =
    Arc<dyn Fn(&PlatformConfig) -> rf_core::Result<Arc<dyn Publisher>> + Send + Sync>;

/// Publisher factories keyed by lowercase platform name.
#[derive(Clone, Default)]
pub struct PublisherRegistry {
    factories: HashMap<String, PublisherFactory>,
}

impl PublisherRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in platforms (youtube). `http` is shared by
    /// every client the registry builds.
    pub fn with_defaults(http: reqwest::Client) -> Self {
        let mut registry = Self::new();
        registry.register(
            "youtube",
            Arc::new(move |cfg: &PlatformConfig| -> rf_core::Result<Arc<dyn Publisher>> {
                let publisher = YouTubePublisher::from_config(http.clone(), cfg)?;
                Ok(Arc::new(publisher) as Arc<dyn Publisher>)
            }),
        );
        registry
    }

    pub fn register(&mut self, name: &str, factory: PublisherFactory) {
        self.factories.insert(name.to_lowercase(), factory);
    }

    /// Build the client for a platform entry.
    ///
    /// # Errors
    ///
    /// [`rf_core::Error::Unsupported`] for an unknown platform name, or
    /// whatever the factory reports (missing credentials, unreadable files).
    pub fn resolve(&self, cfg: &PlatformConfig) -> rf_core::Result<Arc<dyn Publisher>> {
        let factory = self
            .factories
            .get(&cfg.name.trim().to_lowercase())
            .ok_or_else(|| rf_core::Error::unsupported("platform", &cfg.name))?;
        factory(cfg)
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.factories.keys().cloned().collect();
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Noop;

    #[async_trait]
    impl Publisher for Noop {
        fn platform(&self) -> &str {
            "noop"
        }
        async fn upload(&self, _: &Path, _: &str, _: &str, _: &[String]) -> rf_core::Result<()> {
            Ok(())
        }
    }

    fn platform(name: &str) -> PlatformConfig {
        PlatformConfig {
            name: name.into(),
            ..Default::default()
        }
    }

    #[test]
    fn unknown_platform_is_unsupported() {
        let registry = PublisherRegistry::new();
        let err = registry.resolve(&platform("tiktok")).err().unwrap();
        assert_eq!(err.to_string(), "Unsupported platform: tiktok");
    }

    #[test]
    fn resolve_is_case_insensitive() {
        let mut registry = PublisherRegistry::new();
        registry.register("Noop", Arc::new(|_: &PlatformConfig| -> rf_core::Result<Arc<dyn Publisher>> {
            Ok(Arc::new(Noop))
        }));
        let publisher = registry.resolve(&platform("NOOP")).ok().unwrap();
        assert_eq!(publisher.platform(), "noop");
    }

    #[test]
    fn youtube_without_credentials_fails_to_resolve() {
        let registry = PublisherRegistry::with_defaults(reqwest::Client::new());
        assert_eq!(registry.names(), vec!["youtube"]);
        let err = registry.resolve(&platform("youtube")).err().unwrap();
        assert!(err.to_string().contains("credentials"), "got: {err}");
    }
}
