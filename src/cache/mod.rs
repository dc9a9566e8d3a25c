//! Versioned cache stores for offline delivery
//!
//! Every deployed version of the application owns exactly one named store.
//! Stores are populated once, in a single batch, and are never edited
//! afterwards; a new deployment gets a new store and the old one is
//! deleted when the new version activates.
//!
//! # Store Lifecycle
//!
//! | Phase | Store | Description |
//! |-------|-------|-------------|
//! | Provision | created + filled | All manifest assets fetched, then committed together |
//! | Active | read-only | Lookups only |
//! | Superseded | deleted | Removed by the next version's reconcile |

pub mod disk;
pub mod identity;
pub mod manifest;
pub mod memory;
pub mod store;

pub use disk::DiskStorage;
pub use identity::{compiled_build_id, CacheIdentity, DEFAULT_NAMESPACE};
pub use manifest::{AssetManifest, DEFAULT_ASSETS};
pub use memory::MemoryStorage;
pub use store::{format_bytes, CacheStorage, StoreSummary};
