//! Content source capability, registry and aggregation.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use rf_core::ContentItem;

use crate::reddit::RedditSource;
use crate::wikipedia::WikipediaSource;

/// A named fetcher that turns a topic into content items.
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// Registry key, matched case-insensitively.
    fn name(&self) -> &str;

    async fn fetch(&self, topic: &str) -> rf_core::Result<Vec<ContentItem>>;
}

/// Content sources keyed by lowercase name.
#[derive(Clone, Default)]
pub struct SourceRegistry {
    sources: HashMap<String, Arc<dyn ContentSource>>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the built-in sources (wikipedia, reddit).
    pub fn with_defaults(client: reqwest::Client) -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(WikipediaSource::new(client.clone())));
        registry.register(Arc::new(RedditSource::new(client)));
        registry
    }

    /// Register a source under its name, replacing any previous entry.
    pub fn register(&mut self, source: Arc<dyn ContentSource>) {
        self.sources.insert(source.name().to_lowercase(), source);
    }

    pub fn resolve(&self, name: &str) -> rf_core::Result<Arc<dyn ContentSource>> {
        self.sources
            .get(&name.trim().to_lowercase())
            .cloned()
            .ok_or_else(|| rf_core::Error::unsupported("content source", name))
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.sources.keys().cloned().collect();
        names.sort();
        names
    }
}

/// Fetch `topic` from every named source and concatenate the results in
/// source order.
///
/// Unknown and failing sources are logged and skipped, and items without
/// any text are dropped. An empty result is not an error: it is the
/// caller's signal to abandon the run.
pub async fn fetch_content(
    registry: &SourceRegistry,
    topic: &str,
    sources: &[String],
) -> Vec<ContentItem> {
    let fetches = sources.iter().map(|name| async move {
        let source = match registry.resolve(name) {
            Ok(source) => source,
            Err(e) => {
                tracing::warn!(source = %name, error = %e, "Skipping content source");
                return Vec::new();
            }
        };

        match source.fetch(topic).await {
            Ok(items) => {
                let total = items.len();
                let items: Vec<ContentItem> = items.into_iter().filter(|i| i.has_text()).collect();
                tracing::info!(
                    source = %name,
                    topic = %topic,
                    items = items.len(),
                    dropped = total - items.len(),
                    "Fetched content"
                );
                items
            }
            Err(e) => {
                tracing::warn!(source = %name, topic = %topic, error = %e, "Content source failed");
                Vec::new()
            }
        }
    });

    futures::future::join_all(fetches)
        .await
        .into_iter()
        .flatten()
        .collect()
}
