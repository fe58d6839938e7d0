//! Artifact cache for apkforge
//!
//! Two halves:
//! - [`hashing`]: request fingerprints over input bytes, options and icon
//! - [`store`]: the write-once, fingerprint-addressed artifact directory

pub mod hashing;
pub mod store;

pub use hashing::{fingerprint_request, fingerprint_with_manifest, ContentHasher, HashManifest};
pub use store::{ArtifactStore, StoreStats, StoreStatsSnapshot};
