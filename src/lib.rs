//! precache - offline-first asset cache
//!
//! Pre-caches an application's shell document, loader script and binary
//! module in a store named after the running build, answers requests
//! cache-first with network fallback, and removes the stores of superseded
//! builds when a new one activates.

pub mod cache;
pub mod cli;
pub mod config;
pub mod controller;
pub mod error;
pub mod fetch;
pub mod host;
pub mod loader;
pub mod ui;

pub use error::{PrecacheError, PrecacheResult};
