//! rf-core: shared types, IDs, errors, configuration, and the content model.
//!
//! This crate is the foundational dependency for all other rf-* crates,
//! providing type-safe identifiers, a unified error type, the data model that
//! flows through a generation run, and application configuration.

pub mod config;
pub mod content;
pub mod error;
pub mod ids;

// Re-export the most commonly used items at the crate root.
pub use content::{generate_tags, ContentItem, MediaAsset, MediaKind};
pub use error::{Error, Result};
pub use ids::*;
