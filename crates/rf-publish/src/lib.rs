//! # rf-publish
//!
//! Delivery of a finished video to the platforms a user publishes to.
//!
//! Platform clients implement [`Publisher`] and are built from a user's
//! platform entry by a [`PublisherRegistry`] factory keyed by platform name.
//! [`publish`] resolves every configured platform, uploads to all of them
//! concurrently and waits for each to finish, returning a per-platform
//! [`PublishReport`].

pub mod fanout;
pub mod publisher;
pub mod youtube;

pub use fanout::{publish, PlatformOutcome, PublishReport};
pub use publisher::{Publisher, PublisherFactory, PublisherRegistry};
pub use youtube::YouTubePublisher;
