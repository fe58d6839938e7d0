//! Shared utilities for apkforge
//!
//! Archive extraction, atomic file writes, XDG path resolution and
//! tracing setup used across the workspace.

pub mod archive;
pub mod atomic_file;
pub mod tracing;
pub mod xdg;

pub use archive::{extract, ArchiveFormat, ExtractionReport};
pub use atomic_file::*;
pub use xdg::*;
