//! Requests and configuration given relative to the caller's working
//! directory, run through the real process spawner.
//!
//! Kept in its own test binary: it changes the process working directory.

#![cfg(unix)]

use apkforge_core::{ProcessingOptions, ProcessingRequest, Toolchain};
use apkforge_worker::{ExecutorConfig, JobExecutor, SystemToolSpawner};
use std::collections::HashMap;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

/// Args: -Xmx<heap> -jar <tool> -a <input> -o <output> [-i <icon>]
const FAKE_RUNTIME: &str = r#"#!/bin/sh
[ -f "$3" ] || { echo "no tool at $3" >&2; exit 3; }
cat "$5" > "$7" || exit 9
if [ "$8" = "-i" ]; then
    cat "$9" >> "$7" || exit 10
fi
"#;

#[tokio::test]
async fn test_relative_request_and_config_paths() {
    let temp = TempDir::new().unwrap();
    let work = temp.path().join("work");

    let runtime = work.join("jre").join("bin").join("java");
    fs::create_dir_all(runtime.parent().unwrap()).unwrap();
    fs::write(&runtime, FAKE_RUNTIME).unwrap();
    fs::set_permissions(&runtime, fs::Permissions::from_mode(0o755)).unwrap();
    fs::create_dir_all(work.join("lib")).unwrap();
    fs::write(work.join("lib").join("renamer.jar"), b"").unwrap();
    fs::write(work.join("app.apk"), b"apk-bytes|").unwrap();
    fs::write(work.join("icon.png"), b"icon-bytes").unwrap();
    std::env::set_current_dir(&work).unwrap();

    let config = ExecutorConfig {
        toolchain: Toolchain::new("jre/bin/java", "lib/renamer.jar"),
        cache_dir: PathBuf::from("cache"),
        artifact_extension: "apk".to_string(),
        max_concurrent: 1,
        heap_limit: "256m".to_string(),
        nested_heap_limit: "512m".to_string(),
        job_timeout: None,
    };
    let mut env = HashMap::new();
    env.insert("PATH".to_string(), "/usr/bin:/bin".to_string());
    let executor = JobExecutor::new(config, Arc::new(SystemToolSpawner::new()))
        .unwrap()
        .with_base_env(env);

    assert!(executor.config().cache_dir.is_absolute());
    assert!(executor.config().toolchain.tool.is_absolute());

    let result = executor
        .process(&ProcessingRequest::new(
            "app.apk",
            "out",
            ProcessingOptions::new().with_icon("icon.png"),
        ))
        .await
        .unwrap();

    let cwd = std::env::current_dir().unwrap();
    assert!(result.starts_with(cwd.join("out")));
    assert_eq!(fs::read_to_string(&result).unwrap(), "apk-bytes|icon-bytes");
    assert!(Path::new("cache").is_dir());
    assert!(!cwd.join("lib").join("cache").exists());
}
