//! Count of composed videos.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Prometheus name of the generated-videos counter.
pub const VIDEOS_GENERATED: &str = "videos_generated_total";

/// Shared handle counting fully composed videos.
///
/// Clones share one count. Each increment is also reported to the `metrics`
/// facade, which is a no-op until an exporter is installed.
#[derive(Debug, Clone, Default)]
pub struct GenerationCounter {
    count: Arc<AtomicU64>,
}

impl GenerationCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment(&self) {
        self.count.fetch_add(1, Ordering::Relaxed);
        metrics::counter!(VIDEOS_GENERATED).increment(1);
    }

    pub fn get(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }
}
