//! Processing requests handed to the job executor

use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};

/// Rename/rebrand options for one processing request.
///
/// Empty strings are treated as absent: option presence, not type,
/// decides whether a tool flag is emitted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingOptions {
    /// New package identifier (e.g. `com.example.app`)
    pub target_identifier: Option<String>,
    /// New human-readable application name
    pub display_name: Option<String>,
    /// Replacement icon artifact
    pub icon_path: Option<PathBuf>,
    /// Rename deep references as well as the manifest
    pub deep: bool,
}

impl ProcessingOptions {
    /// Create an empty option set
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the target identifier
    pub fn with_target_identifier(mut self, id: impl Into<String>) -> Self {
        self.target_identifier = Some(id.into());
        self
    }

    /// Set the display name
    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    /// Set the icon artifact path
    pub fn with_icon(mut self, path: impl Into<PathBuf>) -> Self {
        self.icon_path = Some(path.into());
        self
    }

    /// Enable or disable deep mode
    pub fn with_deep(mut self, deep: bool) -> Self {
        self.deep = deep;
        self
    }

    /// Target identifier if present and non-empty
    pub fn target_identifier(&self) -> Option<&str> {
        non_empty(self.target_identifier.as_deref())
    }

    /// Display name if present and non-empty
    pub fn display_name(&self) -> Option<&str> {
        non_empty(self.display_name.as_deref())
    }

    /// Icon path if present and non-empty
    pub fn icon_path(&self) -> Option<&Path> {
        self.icon_path
            .as_deref()
            .filter(|p| !p.as_os_str().is_empty())
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

/// One call into the executor: input artifact, options, destination
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingRequest {
    input: PathBuf,
    options: ProcessingOptions,
    destination: PathBuf,
}

impl ProcessingRequest {
    /// Create a new request
    pub fn new(
        input: impl Into<PathBuf>,
        destination: impl Into<PathBuf>,
        options: ProcessingOptions,
    ) -> Self {
        Self {
            input: input.into(),
            options,
            destination: destination.into(),
        }
    }

    /// Path of the input artifact
    pub fn input(&self) -> &Path {
        &self.input
    }

    /// Requested options
    pub fn options(&self) -> &ProcessingOptions {
        &self.options
    }

    /// Directory that receives the result artifact
    pub fn destination(&self) -> &Path {
        &self.destination
    }

    /// Same request with input, icon and destination resolved against the
    /// current working directory
    pub fn absolute(&self) -> io::Result<Self> {
        let mut options = self.options.clone();
        if let Some(icon) = self.options.icon_path() {
            options.icon_path = Some(std::path::absolute(icon)?);
        }
        Ok(Self {
            input: std::path::absolute(&self.input)?,
            options,
            destination: std::path::absolute(&self.destination)?,
        })
    }
}
