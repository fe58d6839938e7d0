//! Centralized configuration for apkforge
//!
//! `ForgeConfig` is the single source of truth for every path and limit the
//! executor and provisioner need. It is immutable after construction and
//! resolved once, so nothing downstream depends on the process working
//! directory.

use apkforge_core::constants::*;
use apkforge_core::{Error, Result};
use apkforge_utils::xdg::XdgPaths;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

/// Immutable configuration shared by all apkforge components.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForgeConfig {
    /// Root for provisioned runtime and tool files
    pub data_dir: PathBuf,

    /// Directory holding fingerprint-named artifacts
    pub cache_dir: PathBuf,

    /// Explicit runtime executable; provisioned when absent
    pub runtime_path: Option<PathBuf>,

    /// Explicit tool program file; provisioned when absent
    pub tool_path: Option<PathBuf>,

    /// Maximum simultaneous tool invocations
    pub max_concurrent: usize,

    /// Heap ceiling passed to the runtime (`-Xmx<value>`)
    pub heap_limit: String,

    /// Heap ceiling for processes the tool spawns itself
    pub nested_heap_limit: String,

    /// Extension of cached and delivered artifacts
    pub artifact_extension: String,

    /// Per-job deadline covering permit wait and tool run
    pub job_timeout: Option<Duration>,

    /// Download source for the runtime archive; platform default when absent
    pub runtime_url: Option<String>,

    /// Download source for the tool archive
    pub tool_url: String,

    /// Where configuration values came from
    pub source: ConfigSource,
}

/// Source of configuration for debugging and precedence tracking
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Default configuration
    Default,
    /// Environment variables
    Environment,
    /// Command line arguments (possibly layered on environment)
    CommandLine,
}

impl Default for ForgeConfig {
    fn default() -> Self {
        Self {
            data_dir: XdgPaths::data_dir(),
            cache_dir: XdgPaths::artifact_cache_dir(),
            runtime_path: None,
            tool_path: None,
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            heap_limit: DEFAULT_HEAP_LIMIT.to_string(),
            nested_heap_limit: DEFAULT_NESTED_HEAP_LIMIT.to_string(),
            artifact_extension: DEFAULT_ARTIFACT_EXTENSION.to_string(),
            job_timeout: None,
            runtime_url: None,
            tool_url: DEFAULT_TOOL_URL.to_string(),
            source: ConfigSource::Default,
        }
    }
}

impl ForgeConfig {
    /// Start a builder from defaults
    pub fn builder() -> ForgeConfigBuilder {
        ForgeConfigBuilder::new()
    }

    /// Directory the runtime archive is unpacked into
    pub fn runtime_dir(&self) -> PathBuf {
        self.data_dir.join(RUNTIME_DIR_NAME)
    }

    /// Directory the tool archive is unpacked into
    pub fn tool_dir(&self) -> PathBuf {
        self.data_dir.join(TOOL_DIR_NAME)
    }

    /// Conventional location of the tool after provisioning
    pub fn default_tool_path(&self) -> PathBuf {
        self.tool_dir().join(TOOL_ARCHIVE_ROOT).join(TOOL_FILE_NAME)
    }

    /// Scratch directory for downloads
    pub fn download_dir(&self) -> PathBuf {
        self.data_dir.join(DOWNLOAD_DIR_NAME)
    }
}

/// Builder applying defaults < environment < explicit settings
#[derive(Debug, Clone)]
pub struct ForgeConfigBuilder {
    config: ForgeConfig,
}

impl ForgeConfigBuilder {
    /// Create a new builder with default configuration
    pub fn new() -> Self {
        Self {
            config: ForgeConfig::default(),
        }
    }

    /// Layer `APKFORGE_*` variables from the process environment
    pub fn from_env(self) -> Result<Self> {
        let vars: HashMap<String, String> = std::env::vars().collect();
        self.from_vars(&vars)
    }

    /// Layer `APKFORGE_*` variables from an explicit map
    pub fn from_vars(mut self, vars: &HashMap<String, String>) -> Result<Self> {
        let get = |key: &str| vars.get(key).filter(|v| !v.is_empty()).cloned();
        let mut touched = false;

        if let Some(dir) = get(APKFORGE_DATA_DIR_VAR) {
            self.config.data_dir = PathBuf::from(dir);
            touched = true;
        }
        if let Some(dir) = get(APKFORGE_CACHE_DIR_VAR) {
            self.config.cache_dir = PathBuf::from(dir);
            touched = true;
        }
        if let Some(path) = get(APKFORGE_RUNTIME_VAR) {
            self.config.runtime_path = Some(PathBuf::from(path));
            touched = true;
        }
        if let Some(path) = get(APKFORGE_TOOL_VAR) {
            self.config.tool_path = Some(PathBuf::from(path));
            touched = true;
        }
        if let Some(value) = get(APKFORGE_MAX_CONCURRENT_VAR) {
            self.config.max_concurrent = value.parse().map_err(|e| {
                Error::configuration(format!("{APKFORGE_MAX_CONCURRENT_VAR}='{value}': {e}"))
            })?;
            touched = true;
        }
        if let Some(value) = get(APKFORGE_JOB_TIMEOUT_VAR) {
            let secs: u64 = value.parse().map_err(|e| {
                Error::configuration(format!("{APKFORGE_JOB_TIMEOUT_VAR}='{value}': {e}"))
            })?;
            self.config.job_timeout = Some(Duration::from_secs(secs));
            touched = true;
        }

        if touched {
            self.config.source = ConfigSource::Environment;
        }
        Ok(self)
    }

    /// Set the data directory
    pub fn with_data_dir(mut self, dir: PathBuf) -> Self {
        self.config.data_dir = dir;
        self.config.source = ConfigSource::CommandLine;
        self
    }

    /// Set the artifact cache directory
    pub fn with_cache_dir(mut self, dir: PathBuf) -> Self {
        self.config.cache_dir = dir;
        self.config.source = ConfigSource::CommandLine;
        self
    }

    /// Use an explicit runtime executable
    pub fn with_runtime_path(mut self, path: PathBuf) -> Self {
        self.config.runtime_path = Some(path);
        self.config.source = ConfigSource::CommandLine;
        self
    }

    /// Use an explicit tool program file
    pub fn with_tool_path(mut self, path: PathBuf) -> Self {
        self.config.tool_path = Some(path);
        self.config.source = ConfigSource::CommandLine;
        self
    }

    /// Set the concurrency bound
    pub fn with_max_concurrent(mut self, max: usize) -> Self {
        self.config.max_concurrent = max;
        self.config.source = ConfigSource::CommandLine;
        self
    }

    /// Set the runtime heap ceiling
    pub fn with_heap_limit(mut self, limit: impl Into<String>) -> Self {
        self.config.heap_limit = limit.into();
        self
    }

    /// Set the nested heap ceiling
    pub fn with_nested_heap_limit(mut self, limit: impl Into<String>) -> Self {
        self.config.nested_heap_limit = limit.into();
        self
    }

    /// Set the artifact extension
    pub fn with_artifact_extension(mut self, ext: impl Into<String>) -> Self {
        self.config.artifact_extension = ext.into();
        self
    }

    /// Set a per-job timeout
    pub fn with_job_timeout(mut self, timeout: Duration) -> Self {
        self.config.job_timeout = Some(timeout);
        self.config.source = ConfigSource::CommandLine;
        self
    }

    /// Override the runtime download source
    pub fn with_runtime_url(mut self, url: impl Into<String>) -> Self {
        self.config.runtime_url = Some(url.into());
        self
    }

    /// Override the tool download source
    pub fn with_tool_url(mut self, url: impl Into<String>) -> Self {
        self.config.tool_url = url.into();
        self
    }

    /// Validate and build the configuration
    pub fn build(self) -> Result<ForgeConfig> {
        let config = self.config;

        if config.max_concurrent == 0 {
            return Err(Error::configuration(
                "max_concurrent must be at least 1",
            ));
        }
        validate_heap("heap_limit", &config.heap_limit)?;
        validate_heap("nested_heap_limit", &config.nested_heap_limit)?;
        if config.artifact_extension.is_empty()
            || config.artifact_extension.contains(['/', '\\', '.'])
        {
            return Err(Error::configuration(format!(
                "artifact_extension '{}' must be a bare extension like 'apk'",
                config.artifact_extension
            )));
        }
        if config.job_timeout == Some(Duration::ZERO) {
            return Err(Error::configuration("job_timeout must be positive"));
        }

        Ok(config)
    }
}

impl Default for ForgeConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Heap sizes follow the JVM `-Xmx` grammar: digits plus optional k/m/g
fn validate_heap(field: &str, value: &str) -> Result<()> {
    let digits = value.trim_end_matches(['k', 'K', 'm', 'M', 'g', 'G']);
    let suffix_len = value.len() - digits.len();
    if digits.is_empty() || suffix_len > 1 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(Error::configuration(format!(
            "{field} '{value}' is not a heap size (e.g. 256m)"
        )));
    }
    Ok(())
}
