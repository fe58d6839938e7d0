//! Configuration management for apkforge
//!
//! This crate resolves every directory, tool location, and limit once, from
//! defaults, `APKFORGE_*` environment variables, and explicit overrides.

pub mod config;

pub use config::*;
