//! Streaming HTTP downloads into scratch files

use apkforge_core::{Error, Result};
use reqwest::StatusCode;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};
use uuid::Uuid;

/// Bytes between two progress log lines
const PROGRESS_STEP: u64 = 10 * 1024 * 1024;

/// Downloaded file removed again when dropped
#[derive(Debug)]
pub struct Download {
    path: PathBuf,
    pub bytes: u64,
}

impl Download {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for Download {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

/// HTTP client for provisioning sources
#[derive(Debug, Clone)]
pub struct Downloader {
    client: reqwest::Client,
}

impl Downloader {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| Error::network("client", e.to_string()))?;
        Ok(Self { client })
    }

    /// Stream `url` into a fresh file under `scratch_dir`
    pub async fn fetch(&self, url: &str, scratch_dir: &Path) -> Result<Download> {
        tokio::fs::create_dir_all(scratch_dir)
            .await
            .map_err(|e| Error::storage(scratch_dir, "create download directory", e))?;

        let mut response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::network(url, e.to_string()))?;

        if response.status() != StatusCode::OK {
            return Err(Error::network(
                url,
                format!("unexpected status {}", response.status()),
            ));
        }

        let total = response.content_length();
        info!(url = %url, total_bytes = ?total, "downloading");

        let mut download = Download {
            path: scratch_dir.join(format!("{}.part", Uuid::new_v4().simple())),
            bytes: 0,
        };
        let mut file = tokio::fs::File::create(download.path())
            .await
            .map_err(|e| Error::storage(download.path(), "create download file", e))?;

        let mut next_report = PROGRESS_STEP;
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| Error::network(url, e.to_string()))?
        {
            file.write_all(&chunk)
                .await
                .map_err(|e| Error::storage(download.path(), "write download file", e))?;
            download.bytes += chunk.len() as u64;

            if download.bytes >= next_report {
                debug!(
                    received_mib = download.bytes / (1024 * 1024),
                    total_mib = ?total.map(|t| t / (1024 * 1024)),
                    "download progress"
                );
                next_report += PROGRESS_STEP;
            }
        }

        file.flush()
            .await
            .map_err(|e| Error::storage(download.path(), "flush download file", e))?;

        debug!(url = %url, bytes = download.bytes, "download complete");
        Ok(download)
    }
}
