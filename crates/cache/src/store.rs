//! Fingerprint-addressed artifact store
//!
//! Every artifact lives at `<root>/<fingerprint>.<extension>`. Entries are
//! written once, by renaming a fully written staging file into place, and
//! never mutated afterwards. Staging files are hidden and unique per job so
//! a crashed or failed run never leaves something that looks like a hit.

use apkforge_core::{Error, Fingerprint, Result};
use apkforge_utils::atomic_file::copy_atomic;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, warn};
use uuid::Uuid;

/// Counters describing store activity since construction
#[derive(Debug, Default)]
pub struct StoreStats {
    pub hits: AtomicU64,
    pub misses: AtomicU64,
    pub publishes: AtomicU64,
    pub discards: AtomicU64,
}

/// Point-in-time copy of [`StoreStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStatsSnapshot {
    pub hits: u64,
    pub misses: u64,
    pub publishes: u64,
    pub discards: u64,
}

impl StoreStats {
    pub fn snapshot(&self) -> StoreStatsSnapshot {
        StoreStatsSnapshot {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            publishes: self.publishes.load(Ordering::Relaxed),
            discards: self.discards.load(Ordering::Relaxed),
        }
    }
}

/// Write-once store of processed artifacts keyed by fingerprint
#[derive(Debug)]
pub struct ArtifactStore {
    root: PathBuf,
    extension: String,
    stats: StoreStats,
}

impl ArtifactStore {
    /// Create a store rooted at `root`. Nothing is touched on disk until
    /// [`ArtifactStore::ensure_root`] or a publish.
    pub fn new(root: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            extension: extension.into(),
            stats: StoreStats::default(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    pub fn stats(&self) -> StoreStatsSnapshot {
        self.stats.snapshot()
    }

    /// Create the store directory if it does not exist
    pub fn ensure_root(&self) -> Result<()> {
        fs::create_dir_all(&self.root)
            .map_err(|e| Error::storage(&self.root, "create cache directory", e))
    }

    /// Final location of the artifact for `fingerprint`
    pub fn path_for(&self, fingerprint: &Fingerprint) -> PathBuf {
        self.root
            .join(format!("{}.{}", fingerprint.to_hex(), self.extension))
    }

    /// Existing artifact for `fingerprint`, if one was published
    pub fn lookup(&self, fingerprint: &Fingerprint) -> Option<PathBuf> {
        let path = self.path_for(fingerprint);
        if path.is_file() {
            self.stats.hits.fetch_add(1, Ordering::Relaxed);
            Some(path)
        } else {
            self.stats.misses.fetch_add(1, Ordering::Relaxed);
            None
        }
    }

    /// Fresh hidden path the tool writes its output to.
    ///
    /// Lives inside the store root so the final rename never crosses a
    /// filesystem boundary.
    pub fn staging_path(&self, fingerprint: &Fingerprint) -> PathBuf {
        self.root.join(format!(
            ".{}.{}.partial.{}",
            fingerprint.to_hex(),
            Uuid::new_v4().simple(),
            self.extension
        ))
    }

    /// Move a completed staging file into its final place.
    ///
    /// An entry that already exists is kept and the staging file dropped,
    /// so published artifacts are never replaced.
    pub fn publish(&self, fingerprint: &Fingerprint, staging: &Path) -> Result<PathBuf> {
        if !staging.is_file() {
            return Err(Error::output_missing(staging));
        }

        let target = self.path_for(fingerprint);
        if target.is_file() {
            debug!(
                fingerprint = %fingerprint.short(),
                "artifact already published, dropping staged copy"
            );
            self.discard(staging);
            return Ok(target);
        }

        fs::rename(staging, &target).map_err(|e| {
            self.discard(staging);
            Error::storage(&target, "publish artifact", e)
        })?;

        self.stats.publishes.fetch_add(1, Ordering::Relaxed);
        debug!(fingerprint = %fingerprint.short(), path = %target.display(), "artifact published");
        Ok(target)
    }

    /// Remove a staging file. Missing files are fine.
    pub fn discard(&self, staging: &Path) {
        match fs::remove_file(staging) {
            Ok(()) => {
                self.stats.discards.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                warn!(path = %staging.display(), error = %e, "failed to discard staging file");
            }
        }
    }

    /// Copy a published artifact to `destination` atomically
    pub fn deliver(&self, artifact: &Path, destination: &Path) -> Result<u64> {
        let bytes = copy_atomic(artifact, destination)?;
        debug!(
            from = %artifact.display(),
            to = %destination.display(),
            bytes,
            "artifact delivered"
        );
        Ok(bytes)
    }
}
