use std::path::PathBuf;
use std::time::Duration;

/// Result type alias for apkforge operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for apkforge operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The input artifact does not exist or is not a readable file
    #[error("input artifact '{path}' not found or not readable")]
    InputNotFound { path: PathBuf },

    /// I/O failure while computing a fingerprint
    #[error("failed to fingerprint '{path}': {source}")]
    HashingFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The caller cancelled the operation
    #[error("operation '{operation}' was cancelled")]
    Cancelled { operation: String },

    /// Operation timeout errors
    #[error("operation '{operation}' timed out after {duration:?}")]
    Timeout {
        operation: String,
        duration: Duration,
    },

    /// The external tool could not be launched or exited non-zero
    #[error("{}", format_command_error(.command, .args, .message, .exit_code))]
    ExecutionFailed {
        command: String,
        args: Vec<String>,
        message: String,
        exit_code: Option<i32>,
    },

    /// The external tool exited successfully but produced no artifact
    #[error("tool reported success but produced no artifact at '{path}'")]
    OutputMissing { path: PathBuf },

    /// Cache or destination storage operations
    #[error("storage {operation} operation failed for '{path}': {source}")]
    StorageFailed {
        path: PathBuf,
        operation: String,
        #[source]
        source: std::io::Error,
    },

    /// An archive entry tried to escape the extraction root
    #[error("archive entry '{entry}' escapes the extraction root")]
    TraversalRejected { entry: String },

    /// Fatal archive I/O
    #[error("failed to extract '{archive}': {message}")]
    ExtractionFailed {
        archive: PathBuf,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration errors
    #[error("configuration error: {message}")]
    Configuration { message: String },

    /// Network-related errors
    #[error("network error for '{endpoint}': {message}")]
    Network { endpoint: String, message: String },

    /// Unsupported operation errors
    #[error("unsupported feature '{feature}': {message}")]
    Unsupported { feature: String, message: String },
}

fn format_command_error(
    command: &str,
    args: &[String],
    message: &str,
    exit_code: &Option<i32>,
) -> String {
    let args_str = args.join(" ");
    match exit_code {
        Some(code) => {
            if args_str.is_empty() {
                format!("command '{command}' failed with exit code {code}: {message}")
            } else {
                format!("command '{command} {args_str}' failed with exit code {code}: {message}")
            }
        }
        None => {
            if args_str.is_empty() {
                format!("command '{command}' failed: {message}")
            } else {
                format!("command '{command} {args_str}' failed: {message}")
            }
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        Error::StorageFailed {
            path: PathBuf::new(),
            operation: "unknown".to_string(),
            source: error,
        }
    }
}

impl Error {
    /// Create an input-not-found error
    #[must_use]
    pub fn input_not_found(path: impl Into<PathBuf>) -> Self {
        Error::InputNotFound { path: path.into() }
    }

    /// Create a hashing error
    #[must_use]
    pub fn hashing_failed(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::HashingFailed {
            path: path.into(),
            source,
        }
    }

    /// Create a cancellation error
    #[must_use]
    pub fn cancelled(operation: impl Into<String>) -> Self {
        Error::Cancelled {
            operation: operation.into(),
        }
    }

    /// Create a timeout error
    #[must_use]
    pub fn timeout(operation: impl Into<String>, duration: Duration) -> Self {
        Error::Timeout {
            operation: operation.into(),
            duration,
        }
    }

    /// Create an execution failure
    #[must_use]
    pub fn execution_failed(
        command: impl Into<String>,
        args: Vec<String>,
        message: impl Into<String>,
        exit_code: Option<i32>,
    ) -> Self {
        Error::ExecutionFailed {
            command: command.into(),
            args,
            message: message.into(),
            exit_code,
        }
    }

    /// Create an output-missing error
    #[must_use]
    pub fn output_missing(path: impl Into<PathBuf>) -> Self {
        Error::OutputMissing { path: path.into() }
    }

    /// Create a storage error with context
    #[must_use]
    pub fn storage(
        path: impl Into<PathBuf>,
        operation: impl Into<String>,
        source: std::io::Error,
    ) -> Self {
        Error::StorageFailed {
            path: path.into(),
            operation: operation.into(),
            source,
        }
    }

    /// Create a traversal rejection
    #[must_use]
    pub fn traversal_rejected(entry: impl Into<String>) -> Self {
        Error::TraversalRejected {
            entry: entry.into(),
        }
    }

    /// Create an extraction error without an underlying source
    #[must_use]
    pub fn extraction(archive: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Error::ExtractionFailed {
            archive: archive.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Create an extraction error with an underlying source
    #[must_use]
    pub fn extraction_with_source(
        archive: impl Into<PathBuf>,
        message: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Error::ExtractionFailed {
            archive: archive.into(),
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Create a configuration error
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Error::Configuration {
            message: message.into(),
        }
    }

    /// Create a network error
    #[must_use]
    pub fn network(endpoint: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Network {
            endpoint: endpoint.into(),
            message: message.into(),
        }
    }

    /// Create an unsupported feature error
    #[must_use]
    pub fn unsupported(feature: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Unsupported {
            feature: feature.into(),
            message: message.into(),
        }
    }

    /// True for caller-initiated aborts, whether explicit or by deadline
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Error::Cancelled { .. } | Error::Timeout { .. })
    }

    /// True when a caller-side retry may succeed.
    ///
    /// Tool failures are deterministic, so only storage and network
    /// failures qualify.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::StorageFailed { .. } | Error::Network { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_execution_failed_display() {
        let err = Error::execution_failed(
            "java",
            vec!["-jar".to_string(), "renamer.jar".to_string()],
            "boom",
            Some(2),
        );
        assert_eq!(
            err.to_string(),
            "command 'java -jar renamer.jar' failed with exit code 2: boom"
        );

        let err = Error::execution_failed("java", vec![], "not found", None);
        assert_eq!(err.to_string(), "command 'java' failed: not found");
    }

    #[test]
    fn test_cancellation_classification() {
        assert!(Error::cancelled("acquire permit").is_cancellation());
        assert!(Error::timeout("job", Duration::from_secs(1)).is_cancellation());
        assert!(!Error::output_missing("/tmp/x.apk").is_cancellation());
    }

    #[test]
    fn test_retryable_classification() {
        let storage = Error::storage(
            "/tmp/cache",
            "copy",
            std::io::Error::other("disk full"),
        );
        assert!(storage.is_retryable());
        assert!(Error::network("https://example.invalid", "503").is_retryable());
        assert!(!Error::execution_failed("java", vec![], "x", Some(1)).is_retryable());
        assert!(!Error::input_not_found("/nope").is_retryable());
    }

    #[test]
    fn test_io_conversion_is_storage() {
        let err: Error = std::io::Error::other("oops").into();
        assert!(matches!(err, Error::StorageFailed { .. }));
    }
}
