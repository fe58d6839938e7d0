//! Subprocess environment as a base map plus ordered overrides
//!
//! The tool environment is computed, not mutated in place: an
//! [`EnvOverlay`] records what to change and [`EnvOverlay::apply`] produces
//! the final map. That keeps it testable without spawning anything.

use apkforge_core::PATH_VAR;
use std::collections::HashMap;
use std::env;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// One change applied on top of the base environment
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvOp {
    /// Replace (or add) a variable
    Set { key: String, value: String },
    /// Put a directory in front of a path-list variable
    PrependPath { key: String, dir: PathBuf },
}

/// Ordered list of environment changes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvOverlay {
    ops: Vec<EnvOp>,
}

impl EnvOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `key` to `value`
    pub fn set(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.ops.push(EnvOp::Set {
            key: key.into(),
            value: value.into(),
        });
        self
    }

    /// Prepend `dir` to the path list in `key`
    pub fn prepend_path(mut self, key: impl Into<String>, dir: impl Into<PathBuf>) -> Self {
        self.ops.push(EnvOp::PrependPath {
            key: key.into(),
            dir: dir.into(),
        });
        self
    }

    /// Prepend `dir` to `PATH`
    pub fn prepend_to_path(self, dir: impl Into<PathBuf>) -> Self {
        self.prepend_path(PATH_VAR, dir)
    }

    pub fn ops(&self) -> &[EnvOp] {
        &self.ops
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Apply every operation in order over `base`
    pub fn apply(&self, base: &HashMap<String, String>) -> HashMap<String, String> {
        let mut env = base.clone();
        for op in &self.ops {
            match op {
                EnvOp::Set { key, value } => {
                    env.insert(key.clone(), value.clone());
                }
                EnvOp::PrependPath { key, dir } => {
                    let joined = prepend_dir(dir, env.get(key).map(String::as_str));
                    env.insert(key.clone(), joined);
                }
            }
        }
        env
    }
}

/// `dir` followed by the entries of `existing`, using the platform separator
fn prepend_dir(dir: &Path, existing: Option<&str>) -> String {
    let mut entries: Vec<PathBuf> = vec![dir.to_path_buf()];
    if let Some(existing) = existing.filter(|s| !s.is_empty()) {
        entries.extend(env::split_paths(existing));
    }
    match env::join_paths(&entries) {
        Ok(joined) => os_to_string(joined),
        // `dir` contains the separator itself
        Err(_) => existing.unwrap_or_default().to_string(),
    }
}

fn os_to_string(value: OsString) -> String {
    value.to_string_lossy().into_owned()
}
