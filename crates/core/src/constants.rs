/// Constants used throughout the apkforge codebase
// Environment variable names
pub const APKFORGE_DATA_DIR_VAR: &str = "APKFORGE_DATA_DIR";
pub const APKFORGE_CACHE_DIR_VAR: &str = "APKFORGE_CACHE_DIR";
pub const APKFORGE_RUNTIME_VAR: &str = "APKFORGE_RUNTIME";
pub const APKFORGE_TOOL_VAR: &str = "APKFORGE_TOOL";
pub const APKFORGE_MAX_CONCURRENT_VAR: &str = "APKFORGE_MAX_CONCURRENT";
pub const APKFORGE_JOB_TIMEOUT_VAR: &str = "APKFORGE_JOB_TIMEOUT_SECS";
pub const APKFORGE_LOG_VAR: &str = "APKFORGE_LOG";

// Executor defaults
pub const DEFAULT_MAX_CONCURRENT: usize = 2;
pub const DEFAULT_HEAP_LIMIT: &str = "256m";
pub const DEFAULT_NESTED_HEAP_LIMIT: &str = "512m";
pub const DEFAULT_ARTIFACT_EXTENSION: &str = "apk";

// Variables injected into the tool environment
pub const PATH_VAR: &str = "PATH";
pub const NESTED_HEAP_VAR: &str = "JAVA_TOOL_OPTIONS";

// Tool layout under the data directory
pub const RUNTIME_DIR_NAME: &str = "runtime";
pub const TOOL_DIR_NAME: &str = "lib";
pub const TOOL_ARCHIVE_ROOT: &str = "ApkRenamer";
pub const TOOL_FILE_NAME: &str = "renamer.jar";
pub const DOWNLOAD_DIR_NAME: &str = "tmp";

// Provisioning sources
pub const DEFAULT_TOOL_URL: &str =
    "https://github.com/dvaoru/ApkRenamer/releases/download/1.9.7/ApkRenamer.zip";
pub const RUNTIME_URL_LINUX_X64: &str =
    "https://api.adoptium.net/v3/binary/latest/17/ga/linux/x64/jre/hotspot/normal/eclipse";
pub const RUNTIME_URL_WINDOWS_X64: &str =
    "https://api.adoptium.net/v3/binary/latest/17/ga/windows/x64/jre/hotspot/normal/eclipse";

#[cfg(windows)]
pub const RUNTIME_EXECUTABLE: &str = "java.exe";
#[cfg(not(windows))]
pub const RUNTIME_EXECUTABLE: &str = "java";
