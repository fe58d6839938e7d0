//! Runtime and tool provisioning for apkforge
//!
//! Resolves the runtime executable and the tool program file the executor
//! needs: explicit configuration first, then a previous provisioning run
//! under the data directory, then a fresh download.

pub mod download;
pub mod provisioner;

pub use download::{Download, Downloader};
pub use provisioner::{find_runtime, platform_runtime_url, Provisioner};
