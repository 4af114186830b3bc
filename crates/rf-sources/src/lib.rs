//! # rf-sources
//!
//! Inputs of a generation run: written content and stock visuals.
//!
//! - **Content sources** ([`ContentSource`], [`SourceRegistry`]) -- named
//!   fetchers resolved through a registration table; [`fetch_content`]
//!   aggregates them for one topic, skipping unknown or failing sources.
//! - **Visual suppliers** ([`VisualSupplier`]) -- stock-media search and
//!   download; [`acquire_visual`] takes the first candidate and stores it
//!   locally.

pub mod http;
pub mod pexels;
pub mod reddit;
pub mod source;
pub mod visual;
pub mod wikipedia;

pub use http::build_client;
pub use pexels::PexelsSupplier;
pub use reddit::RedditSource;
pub use source::{fetch_content, ContentSource, SourceRegistry};
pub use visual::{acquire_visual, VisualSupplier};
pub use wikipedia::WikipediaSource;
