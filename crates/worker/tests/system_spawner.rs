//! End-to-end runs through the real process spawner with a scripted
//! stand-in for the runtime

#![cfg(unix)]

mod common;

use apkforge_core::{Error, ProcessingOptions, ProcessingRequest};
use apkforge_worker::{JobExecutor, SystemToolSpawner};
use std::collections::HashMap;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

/// Args: -Xmx<heap> -jar <tool> -a <input> -o <output> [flags...]
const FAKE_RUNTIME: &str = r#"#!/bin/sh
input="$5"
output="$7"
if [ "$8" = "-p" ] && [ "$9" = "com.fail" ]; then
    echo "refusing to rename" >&2
    exit 4
fi
cat "$input" > "$output"
printf '\nheap=%s\n' "$1" >> "$output"
printf 'nested=%s\n' "$JAVA_TOOL_OPTIONS" >> "$output"
printf 'cwd=%s\n' "$(pwd -P)" >> "$output"
printf 'path=%s\n' "$PATH" >> "$output"
"#;

fn install_runtime(temp: &TempDir) {
    let runtime = temp.path().join("jre").join("bin").join("java");
    fs::create_dir_all(runtime.parent().unwrap()).unwrap();
    fs::write(&runtime, FAKE_RUNTIME).unwrap();
    fs::set_permissions(&runtime, fs::Permissions::from_mode(0o755)).unwrap();

    let tool = temp.path().join("lib").join("renamer.jar");
    fs::create_dir_all(tool.parent().unwrap()).unwrap();
    fs::write(tool, b"").unwrap();
}

fn system_executor(temp: &TempDir) -> JobExecutor {
    install_runtime(temp);
    let mut env = HashMap::new();
    env.insert("PATH".to_string(), "/usr/bin:/bin".to_string());
    JobExecutor::new(common::config(temp, 1), Arc::new(SystemToolSpawner::new()))
        .unwrap()
        .with_base_env(env)
}

fn line<'a>(report: &'a str, key: &str) -> &'a str {
    report
        .lines()
        .find_map(|l| l.strip_prefix(&format!("{key}=")))
        .unwrap_or_default()
}

#[tokio::test]
async fn test_runs_in_tool_dir_with_overlay_environment() {
    let temp = TempDir::new().unwrap();
    let executor = system_executor(&temp);
    let input = common::write_input(&temp, "app.apk", b"original");

    let result = executor
        .process(&ProcessingRequest::new(
            &input,
            common::out_dir(&temp),
            ProcessingOptions::new().with_display_name("Renamed"),
        ))
        .await
        .unwrap();

    let report = fs::read_to_string(result).unwrap();
    assert!(report.starts_with("original"));
    assert_eq!(line(&report, "heap"), "-Xmx256m");
    assert_eq!(line(&report, "nested"), "-Xmx512m");

    let tool_dir = fs::canonicalize(temp.path().join("lib")).unwrap();
    assert_eq!(Path::new(line(&report, "cwd")), tool_dir.as_path());

    let runtime_dir = temp.path().join("jre").join("bin");
    let path = line(&report, "path");
    assert!(path.starts_with(&*runtime_dir.to_string_lossy()));
    assert!(path.ends_with("/usr/bin:/bin"));
}

#[tokio::test]
async fn test_nonzero_exit_reports_stderr() {
    let temp = TempDir::new().unwrap();
    let executor = system_executor(&temp);
    let input = common::write_input(&temp, "app.apk", b"original");

    let err = executor
        .process(&ProcessingRequest::new(
            &input,
            common::out_dir(&temp),
            ProcessingOptions::new().with_target_identifier("com.fail"),
        ))
        .await
        .unwrap_err();

    match err {
        Error::ExecutionFailed {
            exit_code, message, ..
        } => {
            assert_eq!(exit_code, Some(4));
            assert_eq!(message, "refusing to rename");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(common::cache_entries(&temp).is_empty());
}
