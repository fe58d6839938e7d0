//! Shared fixtures for executor tests

#![allow(dead_code)]

use apkforge_core::{Result, Toolchain};
use apkforge_worker::{ExecutorConfig, JobExecutor, ToolInvocation, ToolSpawner};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Output};
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

/// Spawner that simulates the tool: counts runs, tracks how many overlap,
/// and writes `renamed:<input bytes>` to the `-o` path on success
#[derive(Default)]
pub struct FakeSpawner {
    pub calls: AtomicUsize,
    pub active: AtomicUsize,
    pub peak: AtomicUsize,
    pub exit_code: AtomicI32,
    pub skip_output: AtomicBool,
    pub delay: Mutex<Duration>,
    pub seen: Mutex<Vec<ToolInvocation>>,
}

impl FakeSpawner {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_delay(delay: Duration) -> Arc<Self> {
        let spawner = Self::default();
        *spawner.delay.lock().unwrap() = delay;
        Arc::new(spawner)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn fail_with(&self, code: i32) {
        self.exit_code.store(code, Ordering::SeqCst);
    }
}

struct ActiveGuard<'a>(&'a AtomicUsize);

impl Drop for ActiveGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl ToolSpawner for FakeSpawner {
    async fn spawn(&self, invocation: &ToolInvocation) -> Result<Output> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push(invocation.clone());

        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        let _active = ActiveGuard(&self.active);

        let delay = *self.delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let code = self.exit_code.load(Ordering::SeqCst);
        if code == 0 && !self.skip_output.load(Ordering::SeqCst) {
            let input = arg_after(&invocation.args, "-a");
            let output = arg_after(&invocation.args, "-o");
            let mut content = b"renamed:".to_vec();
            content.extend(std::fs::read(input).unwrap());
            std::fs::write(output, content).unwrap();
        }

        Ok(Output {
            status: exit_status(code),
            stdout: Vec::new(),
            stderr: if code == 0 {
                Vec::new()
            } else {
                b"fake tool failure".to_vec()
            },
        })
    }
}

fn arg_after(args: &[String], flag: &str) -> PathBuf {
    let index = args.iter().position(|a| a == flag).unwrap();
    PathBuf::from(&args[index + 1])
}

pub fn exit_status(code: i32) -> ExitStatus {
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        ExitStatus::from_raw(code << 8)
    }
    #[cfg(windows)]
    {
        use std::os::windows::process::ExitStatusExt;
        ExitStatus::from_raw(code as u32)
    }
}

pub fn config(temp: &TempDir, max_concurrent: usize) -> ExecutorConfig {
    ExecutorConfig {
        toolchain: Toolchain::new(
            temp.path().join("jre").join("bin").join("java"),
            temp.path().join("lib").join("renamer.jar"),
        ),
        cache_dir: temp.path().join("cache"),
        artifact_extension: "apk".to_string(),
        max_concurrent,
        heap_limit: "256m".to_string(),
        nested_heap_limit: "512m".to_string(),
        job_timeout: None,
    }
}

pub fn executor(temp: &TempDir, spawner: Arc<FakeSpawner>, max_concurrent: usize) -> JobExecutor {
    JobExecutor::new(config(temp, max_concurrent), spawner).unwrap()
}

pub fn write_input(temp: &TempDir, name: &str, content: &[u8]) -> PathBuf {
    let path = temp.path().join("inputs").join(name);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, content).unwrap();
    path
}

/// Every entry in the cache directory, hidden ones included
pub fn cache_entries(temp: &TempDir) -> Vec<String> {
    let dir = temp.path().join("cache");
    if !dir.exists() {
        return Vec::new();
    }
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

pub async fn wait_for_calls(spawner: &FakeSpawner, calls: usize) {
    for _ in 0..200 {
        if spawner.calls() >= calls {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("spawner never reached {calls} calls");
}

pub fn out_dir(temp: &TempDir) -> PathBuf {
    temp.path().join("out")
}

pub fn file_name(path: &Path) -> String {
    path.file_name().unwrap().to_string_lossy().into_owned()
}
