//! Unified error type for the reelforge pipeline.
//!
//! All crates funnel their failures into [`Error`]. The orchestrator uses
//! [`Error::is_empty_result`] to tell an "abandon this run" condition apart
//! from a genuine stage failure.

use std::fmt;

/// Unified error type covering all failure modes in reelforge.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The requested entity could not be found.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// The kind of entity (e.g. "video", "tool").
        entity: String,
        /// The identifier that was looked up.
        id: String,
    },

    /// Configuration or request data failed validation.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A database operation failed.
    #[error("Database error: {source}")]
    Database {
        /// The underlying database error.
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// An I/O operation failed.
    #[error("IO error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// A remote HTTP service (content source, stock provider, platform)
    /// failed or answered with an unexpected status.
    #[error("HTTP error [{service}]: {message}")]
    Http {
        /// Name of the remote service.
        service: String,
        /// Human-readable error description.
        message: String,
    },

    /// An external tool (ffmpeg, gtts-cli, espeak) returned an error.
    #[error("Tool error [{tool}]: {message}")]
    Tool {
        /// Name of the tool that failed.
        tool: String,
        /// Human-readable error description, including captured diagnostics.
        message: String,
    },

    /// A pipeline stage failed.
    #[error("Pipeline error [{step}]: {message}")]
    Pipeline {
        /// The pipeline stage that failed.
        step: String,
        /// Human-readable error description.
        message: String,
    },

    /// A search returned nothing usable.
    #[error("No candidates: {0}")]
    NoCandidates(String),

    /// A named capability (content source, platform, stock provider) has no
    /// registered implementation.
    #[error("Unsupported {kind}: {name}")]
    Unsupported {
        /// What kind of capability was requested.
        kind: String,
        /// The name that failed to resolve.
        name: String,
    },

    /// Catch-all for unexpected internal errors.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Whether this error is an empty-result condition rather than a failure.
    pub fn is_empty_result(&self) -> bool {
        matches!(self, Error::NoCandidates(_))
    }

    /// Convenience constructor for [`Error::NotFound`].
    pub fn not_found(entity: impl Into<String>, id: impl fmt::Display) -> Self {
        Error::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    /// Convenience constructor for [`Error::Database`].
    pub fn database(source: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Error::Database {
            source: source.into(),
        }
    }

    /// Convenience constructor for [`Error::Http`].
    pub fn http(service: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Http {
            service: service.into(),
            message: message.into(),
        }
    }

    /// Convenience constructor for [`Error::Tool`].
    pub fn tool(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Tool {
            tool: tool.into(),
            message: message.into(),
        }
    }

    /// Convenience constructor for [`Error::Pipeline`].
    pub fn pipeline(step: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Pipeline {
            step: step.into(),
            message: message.into(),
        }
    }

    /// Convenience constructor for [`Error::Unsupported`].
    pub fn unsupported(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Error::Unsupported {
            kind: kind.into(),
            name: name.into(),
        }
    }
}

/// Result alias using the crate-level [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
