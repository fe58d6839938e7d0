//! Resolved runtime and tool locations

use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};

/// The runtime executable and the tool program file it runs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Toolchain {
    pub runtime: PathBuf,
    pub tool: PathBuf,
}

impl Toolchain {
    pub fn new(runtime: impl Into<PathBuf>, tool: impl Into<PathBuf>) -> Self {
        Self {
            runtime: runtime.into(),
            tool: tool.into(),
        }
    }

    /// Directory holding the runtime executable, prepended to `PATH`
    pub fn runtime_dir(&self) -> Option<&Path> {
        self.runtime.parent().filter(|p| !p.as_os_str().is_empty())
    }

    /// Working directory for tool runs: the directory holding the tool
    pub fn tool_dir(&self) -> Option<&Path> {
        self.tool.parent().filter(|p| !p.as_os_str().is_empty())
    }

    /// Same toolchain with both paths resolved against the current working
    /// directory. A bare runtime name is left for `PATH` lookup.
    pub fn absolute(&self) -> io::Result<Self> {
        let runtime = if self.runtime_dir().is_some() {
            std::path::absolute(&self.runtime)?
        } else {
            self.runtime.clone()
        };
        Ok(Self {
            runtime,
            tool: std::path::absolute(&self.tool)?,
        })
    }
}
