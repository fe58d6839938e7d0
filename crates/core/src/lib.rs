//! Core domain types, errors, and constants for apkforge.
//!
//! ## Key Components
//!
//! - **`errors`**: the primary `Error` enum and `Result` alias. Every
//!   failure the executor, cache, and extractor can report is one of its
//!   variants.
//! - **`types`**: `ProcessingRequest`, `ProcessingOptions`, and the
//!   `Fingerprint` newtype, and the resolved `Toolchain`.
//! - **`constants`**: environment variable names, defaults, and the
//!   on-disk tool layout.

pub mod constants;
pub mod errors;
pub mod types;

pub use self::{
    constants::*,
    errors::{Error, Result},
    types::*,
};
