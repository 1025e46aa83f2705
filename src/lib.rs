//! Cache-aware editorial front pages.
//!
//! A front is a named page composed of regions, each filled by a content
//! query, overlaid with placement slots gated by request conditions.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
pub mod presentation;
pub mod util;
