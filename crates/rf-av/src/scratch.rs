//! Per-run scratch storage.
//!
//! A [`Scratch`] is a temporary directory owned by exactly one pipeline run.
//! Its name embeds the run id, so two runs never share a path even when they
//! start within the same clock tick. Everything the run downloads or renders
//! along the way lives inside it, and the directory is removed when the run
//! ends, whether it succeeded, failed, or panicked.

use std::path::{Path, PathBuf};

use rf_core::RunId;
use tempfile::TempDir;

/// Scratch directory for one pipeline run.
///
/// # Example
///
/// ```no_run
/// use rf_av::Scratch;
/// use rf_core::RunId;
///
/// let scratch = Scratch::new(&std::env::temp_dir(), RunId::new()).unwrap();
/// let audio = scratch.temp_file("narration.mp3");
/// // ... render into `audio` ...
/// scratch.close();
/// ```
#[derive(Debug)]
pub struct Scratch {
    dir: TempDir,
    run_id: RunId,
}

impl Scratch {
    /// Create a scratch directory for `run_id` under `root`.
    ///
    /// `root` is created if it does not exist yet.
    pub fn new(root: &Path, run_id: RunId) -> rf_core::Result<Self> {
        std::fs::create_dir_all(root)?;
        let dir = tempfile::Builder::new()
            .prefix(&format!("run-{run_id}-"))
            .tempdir_in(root)
            .map_err(|e| rf_core::Error::Io { source: e })?;

        tracing::debug!(run_id = %run_id, path = %dir.path().display(), "Created scratch dir");

        Ok(Self { dir, run_id })
    }

    /// The run this scratch belongs to.
    pub fn run_id(&self) -> RunId {
        self.run_id
    }

    /// Path to the scratch directory.
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Create a path for a named temporary file inside the scratch dir.
    pub fn temp_file(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Remove the scratch directory now.
    ///
    /// Removal failures are logged, never returned: cleanup must not turn a
    /// finished run into a failed one.
    pub fn close(self) {
        let path = self.dir.path().to_path_buf();
        let run_id = self.run_id;
        if let Err(e) = self.dir.close() {
            tracing::warn!(
                run_id = %run_id,
                path = %path.display(),
                error = %e,
                "Failed to remove scratch dir"
            );
        }
    }
}

/// Delete a file, logging (not returning) any failure other than the file
/// already being gone.
pub fn discard(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => tracing::debug!(path = %path.display(), "Removed temporary file"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(
            path = %path.display(),
            error = %e,
            "Failed to remove temporary file"
        ),
    }
}

/// A temporary file that is deleted when the guard goes out of scope.
#[derive(Debug)]
pub struct TempArtifact {
    path: PathBuf,
}

impl TempArtifact {
    /// Guard `path`; the file does not need to exist yet.
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempArtifact {
    fn drop(&mut self) {
        discard(&self.path);
    }
}
