//! catwalk library crate.
//!
//! Collects garment reference images and drives a hosted video model through
//! submit, poll and download. Exposed for the binary and integration tests.

pub mod cli;
pub mod collector;
pub mod config;
pub mod keys;
pub mod messages;
pub mod model;
pub mod orchestrator;
pub mod veo;
