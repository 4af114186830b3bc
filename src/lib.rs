//! Reelforge - scheduled short-video generation and publishing
//!
//! This library crate exposes the binary's wiring for integration testing.

pub mod app;
pub mod telemetry;
