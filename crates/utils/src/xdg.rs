use std::env;
use std::path::{Path, PathBuf};

const APP_DIR: &str = "apkforge";
const ARTIFACTS_DIR: &str = "artifacts";

/// XDG Base Directory paths for apkforge
pub struct XdgPaths;

impl XdgPaths {
    /// `$XDG_DATA_HOME/apkforge`, holding the provisioned runtime and tool
    pub fn data_dir() -> PathBuf {
        resolve(env::var_os("XDG_DATA_HOME"), ".local/share").join(APP_DIR)
    }

    /// `$XDG_CACHE_HOME/apkforge`
    pub fn cache_dir() -> PathBuf {
        resolve(env::var_os("XDG_CACHE_HOME"), ".cache").join(APP_DIR)
    }

    /// Directory holding fingerprint-named artifacts
    pub fn artifact_cache_dir() -> PathBuf {
        Self::cache_dir().join(ARTIFACTS_DIR)
    }
}

/// Base directory from an XDG variable, or `fallback` under the home
/// directory. Empty and relative values count as unset.
fn resolve(value: Option<std::ffi::OsString>, fallback: &str) -> PathBuf {
    match value.map(PathBuf::from) {
        Some(dir) if dir.is_absolute() => dir,
        _ => dirs::home_dir()
            .map(|home| home.join(fallback))
            .unwrap_or_else(|| Path::new(fallback).to_path_buf()),
    }
}
