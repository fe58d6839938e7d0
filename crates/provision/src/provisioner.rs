//! Locating, and when needed downloading, the runtime and the tool

use crate::download::Downloader;
use apkforge_config::ForgeConfig;
use apkforge_core::{Error, Result, Toolchain, RUNTIME_EXECUTABLE};
use apkforge_core::{RUNTIME_URL_LINUX_X64, RUNTIME_URL_WINDOWS_X64};
use apkforge_utils::archive::{extract, ArchiveFormat};
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument};
use walkdir::WalkDir;

/// Resolves a [`Toolchain`] from configuration, the data directory, or a
/// download
#[derive(Debug)]
pub struct Provisioner {
    config: ForgeConfig,
    downloader: Downloader,
}

impl Provisioner {
    pub fn new(config: ForgeConfig) -> Result<Self> {
        Ok(Self {
            config,
            downloader: Downloader::new()?,
        })
    }

    pub fn config(&self) -> &ForgeConfig {
        &self.config
    }

    /// Runtime executable, provisioning it into the data directory if needed
    #[instrument(skip(self))]
    pub async fn ensure_runtime(&self) -> Result<PathBuf> {
        if let Some(path) = &self.config.runtime_path {
            return configured_file("runtime", path);
        }

        let runtime_dir = self.config.runtime_dir();
        if let Some(found) = find_runtime(&runtime_dir) {
            debug!(path = %found.display(), "runtime already provisioned");
            return Ok(found);
        }

        let Some(url) = self.runtime_url() else {
            return runtime_from_path();
        };

        info!(dir = %runtime_dir.display(), "provisioning runtime");
        let download = self
            .downloader
            .fetch(&url, &self.config.download_dir())
            .await?;
        let report = extract_blocking(download.path(), &runtime_dir, ArchiveFormat::native()).await?;
        debug!(
            files = report.files,
            skipped = report.skipped.len(),
            "runtime archive extracted"
        );

        find_runtime(&runtime_dir).ok_or_else(|| {
            Error::configuration(format!(
                "runtime archive from '{url}' contains no '{RUNTIME_EXECUTABLE}'"
            ))
        })
    }

    /// Tool program file, provisioning it into the data directory if needed
    #[instrument(skip(self))]
    pub async fn ensure_tool(&self) -> Result<PathBuf> {
        if let Some(path) = &self.config.tool_path {
            return configured_file("tool", path);
        }

        let tool = self.config.default_tool_path();
        if tool.is_file() {
            debug!(path = %tool.display(), "tool already provisioned");
            return Ok(tool);
        }

        let tool_dir = self.config.tool_dir();
        info!(dir = %tool_dir.display(), "provisioning tool");
        let download = self
            .downloader
            .fetch(&self.config.tool_url, &self.config.download_dir())
            .await?;
        extract_blocking(download.path(), &tool_dir, ArchiveFormat::Zip).await?;

        if tool.is_file() {
            Ok(tool)
        } else {
            Err(Error::configuration(format!(
                "tool archive from '{}' did not contain '{}'",
                self.config.tool_url,
                tool.display()
            )))
        }
    }

    /// Both halves of the toolchain
    pub async fn ensure_all(&self) -> Result<Toolchain> {
        let runtime = self.ensure_runtime().await?;
        let tool = self.ensure_tool().await?;
        Ok(Toolchain::new(runtime, tool))
    }

    fn runtime_url(&self) -> Option<String> {
        self.config
            .runtime_url
            .clone()
            .or_else(|| platform_runtime_url().map(str::to_string))
    }
}

/// Default runtime download for the host, if there is one
pub fn platform_runtime_url() -> Option<&'static str> {
    match (std::env::consts::OS, std::env::consts::ARCH) {
        ("linux", "x86_64") => Some(RUNTIME_URL_LINUX_X64),
        ("windows", "x86_64") => Some(RUNTIME_URL_WINDOWS_X64),
        _ => None,
    }
}

/// First runtime executable below `root`
pub fn find_runtime(root: &Path) -> Option<PathBuf> {
    if !root.is_dir() {
        return None;
    }
    WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| entry.ok())
        .find(|entry| entry.file_type().is_file() && entry.file_name() == RUNTIME_EXECUTABLE)
        .map(|entry| entry.into_path())
}

fn configured_file(what: &str, path: &Path) -> Result<PathBuf> {
    if path.is_file() {
        Ok(path.to_path_buf())
    } else {
        Err(Error::configuration(format!(
            "configured {what} '{}' does not exist",
            path.display()
        )))
    }
}

fn runtime_from_path() -> Result<PathBuf> {
    which::which(RUNTIME_EXECUTABLE).map_err(|e| {
        Error::unsupported(
            "runtime download",
            format!(
                "no runtime download for {}/{} and '{RUNTIME_EXECUTABLE}' is not on PATH: {e}",
                std::env::consts::OS,
                std::env::consts::ARCH
            ),
        )
    })
}

async fn extract_blocking(
    archive: &Path,
    root: &Path,
    format: ArchiveFormat,
) -> Result<apkforge_utils::ExtractionReport> {
    let archive_owned = archive.to_path_buf();
    let root = root.to_path_buf();
    tokio::task::spawn_blocking(move || extract(&archive_owned, &root, format))
        .await
        .map_err(|e| Error::extraction(archive, e.to_string()))?
}
