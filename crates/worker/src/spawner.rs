use crate::invocation::ToolInvocation;
use apkforge_core::{Error, Result};
use async_trait::async_trait;
use std::process::{Output, Stdio};
use tokio::process::Command;
use tracing::{debug, trace};

/// Bytes of stderr kept for failure diagnostics
pub const STDERR_TAIL_BYTES: usize = 4096;

/// Trait for launching the external tool.
///
/// Production code uses [`SystemToolSpawner`]; tests substitute a fake
/// that records invocations and simulates outcomes without a runtime.
#[async_trait]
pub trait ToolSpawner: Send + Sync {
    /// Run `invocation` to completion and return its captured output.
    ///
    /// Launch failures are `ExecutionFailed`; a non-zero exit is not an
    /// error at this level. Dropping the returned future must stop the
    /// child.
    async fn spawn(&self, invocation: &ToolInvocation) -> Result<Output>;
}

/// Spawns the tool as a real child process
#[derive(Debug, Clone, Default)]
pub struct SystemToolSpawner;

impl SystemToolSpawner {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ToolSpawner for SystemToolSpawner {
    async fn spawn(&self, invocation: &ToolInvocation) -> Result<Output> {
        let mut cmd = Command::new(&invocation.program);
        cmd.args(&invocation.args)
            .env_clear()
            .envs(&invocation.env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        if let Some(dir) = &invocation.working_dir {
            cmd.current_dir(dir);
        }

        configure_platform_specific(&mut cmd);

        debug!(
            program = %invocation.program.display(),
            args = ?invocation.args,
            "spawning tool"
        );

        let failed = |what: &str, e: std::io::Error| {
            Error::execution_failed(
                invocation.program_display(),
                invocation.args.clone(),
                format!("failed to {what} tool: {e}"),
                None,
            )
        };
        let child = cmd.spawn().map_err(|e| failed("launch", e))?;
        let group = ProcessGroup::new(child.id());
        let output = child
            .wait_with_output()
            .await
            .map_err(|e| failed("wait for", e))?;
        group.disarm();

        trace!(
            status = ?output.status,
            stdout_bytes = output.stdout.len(),
            stderr_bytes = output.stderr.len(),
            "tool exited"
        );

        Ok(output)
    }
}

fn configure_platform_specific(cmd: &mut Command) {
    // Own process group so a terminal Ctrl-C reaches us, not the tool; the
    // child is then stopped through cancellation.
    #[cfg(unix)]
    cmd.process_group(0);

    #[cfg(not(unix))]
    let _ = cmd;
}

/// Process group led by a running tool. Dropped while still armed, it
/// kills the whole group, so processes the tool started go with it.
struct ProcessGroup {
    leader: Option<u32>,
}

impl ProcessGroup {
    fn new(leader: Option<u32>) -> Self {
        Self { leader }
    }

    /// The leader exited on its own; leave the group alone
    fn disarm(mut self) {
        self.leader = None;
    }
}

impl Drop for ProcessGroup {
    fn drop(&mut self) {
        let Some(leader) = self.leader.take() else {
            return;
        };
        debug!(pgid = leader, "killing tool process group");
        kill_group(leader);
    }
}

#[cfg(unix)]
fn kill_group(leader: u32) {
    // SAFETY: `kill` has no memory effects. The leader has not been reaped,
    // so its pid still names this group.
    unsafe {
        libc::kill(-(leader as libc::pid_t), libc::SIGKILL);
    }
}

#[cfg(not(unix))]
fn kill_group(_leader: u32) {}

/// Last [`STDERR_TAIL_BYTES`] of `stderr`, lossily decoded and trimmed
pub fn stderr_tail(stderr: &[u8]) -> String {
    let start = stderr.len().saturating_sub(STDERR_TAIL_BYTES);
    String::from_utf8_lossy(&stderr[start..]).trim().to_string()
}

/// Turn a completed, unsuccessful run into an `ExecutionFailed` error
pub fn failure_from_output(invocation: &ToolInvocation, output: &Output) -> Error {
    let tail = stderr_tail(&output.stderr);
    let message = match (output.status.code(), tail.is_empty()) {
        (Some(_), true) => "tool exited unsuccessfully".to_string(),
        (None, true) => "tool terminated by signal".to_string(),
        (_, false) => tail,
    };
    Error::execution_failed(
        invocation.program_display(),
        invocation.args.clone(),
        message,
        output.status.code(),
    )
}
