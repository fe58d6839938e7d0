//! Job execution for apkforge
//!
//! This crate runs processing requests against the external tool: it
//! builds the tool invocation and its environment, spawns the tool, bounds
//! how many run at once, and collapses identical concurrent requests.

pub mod env_overlay;
pub mod inflight;
pub mod invocation;
pub mod job_executor;
pub mod spawner;

pub use env_overlay::{EnvOp, EnvOverlay};
pub use inflight::{InFlightRegistry, InFlightSlot};
pub use invocation::{InvocationBuilder, ToolInvocation};
pub use job_executor::{ExecutorConfig, JobExecutor};
pub use spawner::{failure_from_output, stderr_tail, SystemToolSpawner, ToolSpawner};

pub use tokio_util::sync::CancellationToken;
