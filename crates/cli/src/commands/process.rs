use apkforge_config::ForgeConfig;
use apkforge_core::{ProcessingOptions, ProcessingRequest, Result, Toolchain, RUNTIME_EXECUTABLE};
use apkforge_provision::Provisioner;
use apkforge_worker::{CancellationToken, ExecutorConfig, JobExecutor, SystemToolSpawner};
use std::path::PathBuf;
use std::sync::Arc;

pub async fn execute(
    config: ForgeConfig,
    input: PathBuf,
    out: PathBuf,
    options: ProcessingOptions,
    no_provision: bool,
) -> Result<()> {
    let toolchain = if no_provision {
        local_toolchain(&config)
    } else {
        Provisioner::new(config.clone())?.ensure_all().await?
    };
    tracing::debug!(
        runtime = %toolchain.runtime.display(),
        tool = %toolchain.tool.display(),
        "toolchain resolved"
    );

    let executor = JobExecutor::new(
        ExecutorConfig::from_forge(&config, toolchain),
        Arc::new(SystemToolSpawner::new()),
    )?;

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, cancelling");
            on_interrupt.cancel();
        }
    });

    let request = ProcessingRequest::new(input, out, options);
    let result = executor.process_with_cancel(&request, cancel).await?;
    println!("{}", result.display());
    Ok(())
}

/// Configured paths, falling back to the runtime on `PATH` and the
/// conventional tool location
fn local_toolchain(config: &ForgeConfig) -> Toolchain {
    let runtime = config
        .runtime_path
        .clone()
        .unwrap_or_else(|| PathBuf::from(RUNTIME_EXECUTABLE));
    let tool = config
        .tool_path
        .clone()
        .unwrap_or_else(|| config.default_tool_path());
    Toolchain::new(runtime, tool)
}
