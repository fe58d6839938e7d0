//! Bounded, cache-aware job executor
//!
//! `JobExecutor::process` turns a [`ProcessingRequest`] into a result
//! artifact in the request's destination directory. Results are cached by
//! fingerprint; a miss runs the external tool under a fixed-size permit
//! pool and publishes the output into the cache before delivering it.

use crate::inflight::InFlightRegistry;
use crate::invocation::{InvocationBuilder, ToolInvocation};
use crate::spawner::{failure_from_output, ToolSpawner};
use apkforge_cache::{fingerprint_request, ArtifactStore};
use apkforge_config::ForgeConfig;
use apkforge_core::{Error, Fingerprint, ProcessingRequest, Result, Toolchain};
use apkforge_utils::tracing::{cache_event, job_completed, job_started};
use std::collections::HashMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

/// Everything the executor needs, resolved up front
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutorConfig {
    pub toolchain: Toolchain,
    pub cache_dir: PathBuf,
    pub artifact_extension: String,
    pub max_concurrent: usize,
    pub heap_limit: String,
    pub nested_heap_limit: String,
    pub job_timeout: Option<Duration>,
}

impl ExecutorConfig {
    /// Executor settings from the shared configuration and a resolved toolchain
    pub fn from_forge(config: &ForgeConfig, toolchain: Toolchain) -> Self {
        Self {
            toolchain,
            cache_dir: config.cache_dir.clone(),
            artifact_extension: config.artifact_extension.clone(),
            max_concurrent: config.max_concurrent,
            heap_limit: config.heap_limit.clone(),
            nested_heap_limit: config.nested_heap_limit.clone(),
            job_timeout: config.job_timeout,
        }
    }
}

/// Runs processing requests with caching and a concurrency bound
pub struct JobExecutor {
    config: ExecutorConfig,
    store: Arc<ArtifactStore>,
    spawner: Arc<dyn ToolSpawner>,
    permits: Arc<Semaphore>,
    in_flight: InFlightRegistry,
    invocations: InvocationBuilder,
    base_env: HashMap<String, String>,
}

impl std::fmt::Debug for JobExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobExecutor")
            .field("config", &self.config)
            .field("available_permits", &self.permits.available_permits())
            .field("in_flight", &self.in_flight.len())
            .finish()
    }
}

impl JobExecutor {
    /// Create an executor. The tool environment is based on the current
    /// process environment, captured once here.
    /// The toolchain and cache directory are resolved to absolute paths
    /// here, since the tool runs from its own directory.
    pub fn new(mut config: ExecutorConfig, spawner: Arc<dyn ToolSpawner>) -> Result<Self> {
        if config.max_concurrent == 0 {
            return Err(Error::configuration("max_concurrent must be at least 1"));
        }
        config.toolchain = config
            .toolchain
            .absolute()
            .map_err(|e| Error::configuration(format!("resolve toolchain paths: {e}")))?;
        config.cache_dir = std::path::absolute(&config.cache_dir).map_err(|e| {
            Error::configuration(format!(
                "resolve cache directory '{}': {e}",
                config.cache_dir.display()
            ))
        })?;

        let store = Arc::new(ArtifactStore::new(
            config.cache_dir.clone(),
            config.artifact_extension.clone(),
        ));
        let invocations = InvocationBuilder::new(
            config.toolchain.clone(),
            config.heap_limit.clone(),
            config.nested_heap_limit.clone(),
        );

        Ok(Self {
            permits: Arc::new(Semaphore::new(config.max_concurrent)),
            store,
            spawner,
            in_flight: InFlightRegistry::new(),
            invocations,
            base_env: std::env::vars().collect(),
            config,
        })
    }

    /// Replace the base environment tool runs are layered on
    pub fn with_base_env(mut self, env: HashMap<String, String>) -> Self {
        self.base_env = env;
        self
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    /// Permits not currently held by a running tool
    pub fn available_permits(&self) -> usize {
        self.permits.available_permits()
    }

    /// Fingerprint of `request` as used for the cache key
    pub async fn fingerprint(&self, request: &ProcessingRequest) -> Result<Fingerprint> {
        let owned = request.clone();
        tokio::task::spawn_blocking(move || fingerprint_request(&owned))
            .await
            .map_err(|e| {
                Error::hashing_failed(request.input(), std::io::Error::other(e.to_string()))
            })?
    }

    /// Process one request, returning the path of the delivered artifact.
    ///
    /// Dropping the returned future cancels the job and kills a running
    /// tool. The configured job timeout, if any, applies.
    pub async fn process(&self, request: &ProcessingRequest) -> Result<PathBuf> {
        self.process_with_cancel(request, CancellationToken::new())
            .await
    }

    /// Like [`JobExecutor::process`], also abandoning the job as soon as
    /// `cancel` fires. Every wait (identical job, permit, tool run) races
    /// the token.
    #[instrument(skip_all, fields(input = %request.input().display()))]
    pub async fn process_with_cancel(
        &self,
        request: &ProcessingRequest,
        cancel: CancellationToken,
    ) -> Result<PathBuf> {
        match self.config.job_timeout {
            Some(limit) => tokio::time::timeout(limit, self.run(request, &cancel))
                .await
                .map_err(|_| Error::timeout("process", limit))?,
            None => self.run(request, &cancel).await,
        }
    }

    async fn run(&self, request: &ProcessingRequest, cancel: &CancellationToken) -> Result<PathBuf> {
        let request = &request
            .absolute()
            .map_err(|_| Error::input_not_found(request.input()))?;
        ensure_input(request.input()).await?;

        let fingerprint = until_cancelled(cancel, "fingerprint", self.fingerprint(request)).await??;
        let fp = fingerprint.short();
        let start = Instant::now();

        if let Some(cached) = self.store.lookup(&fingerprint) {
            cache_event(&fp, true, "lookup");
            return self.deliver(&cached, request.destination(), &fingerprint).await;
        }
        cache_event(&fp, false, "lookup");

        let slot = until_cancelled(
            cancel,
            "wait for identical job",
            self.in_flight.acquire(fingerprint),
        )
        .await?;

        // The job ahead of us may have just published this fingerprint
        if let Some(cached) = self.store.lookup(&fingerprint) {
            cache_event(&fp, true, "after wait");
            drop(slot);
            return self.deliver(&cached, request.destination(), &fingerprint).await;
        }

        let permit = until_cancelled(
            cancel,
            "acquire permit",
            Arc::clone(&self.permits).acquire_owned(),
        )
        .await?
        .map_err(|_| Error::cancelled("acquire permit"))?;

        job_started(&fp, &request.input().display().to_string());
        let outcome = self.execute(request, &fingerprint, cancel).await;
        drop(permit);
        drop(slot);

        job_completed(&fp, start.elapsed().as_millis() as u64, outcome.is_ok());
        let artifact = outcome?;
        self.deliver(&artifact, request.destination(), &fingerprint)
            .await
    }

    /// Run the tool into a staging file and publish it. Called with a
    /// permit and the fingerprint's in-flight slot held.
    async fn execute(
        &self,
        request: &ProcessingRequest,
        fingerprint: &Fingerprint,
        cancel: &CancellationToken,
    ) -> Result<PathBuf> {
        self.store.ensure_root()?;
        tokio::fs::create_dir_all(request.destination())
            .await
            .map_err(|e| Error::storage(request.destination(), "create destination directory", e))?;

        let staging = Staging {
            store: &self.store,
            path: self.store.staging_path(fingerprint),
        };
        let invocation = self.invocations.build(
            request.input(),
            &staging.path,
            request.options(),
            &self.base_env,
        );

        self.run_tool(&invocation, cancel).await?;
        self.store.publish(fingerprint, &staging.path)
    }

    async fn run_tool(
        &self,
        invocation: &ToolInvocation,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let output =
            until_cancelled(cancel, "tool run", self.spawner.spawn(invocation)).await??;

        if output.status.success() {
            Ok(())
        } else {
            let err = failure_from_output(invocation, &output);
            warn!(error = %err, "tool failed");
            Err(err)
        }
    }

    async fn deliver(
        &self,
        artifact: &Path,
        destination_dir: &Path,
        fingerprint: &Fingerprint,
    ) -> Result<PathBuf> {
        let destination = destination_dir.join(format!(
            "{}.{}",
            fingerprint.to_hex(),
            self.config.artifact_extension
        ));

        let store = Arc::clone(&self.store);
        let from = artifact.to_path_buf();
        let to = destination.clone();
        tokio::task::spawn_blocking(move || store.deliver(&from, &to))
            .await
            .map_err(|e| {
                Error::storage(&destination, "deliver artifact", std::io::Error::other(e.to_string()))
            })??;

        debug!(destination = %destination.display(), "result ready");
        Ok(destination)
    }
}

/// Staging output of one run; whatever is left of it when the run ends,
/// however it ends, is removed
struct Staging<'a> {
    store: &'a ArtifactStore,
    path: PathBuf,
}

impl Drop for Staging<'_> {
    fn drop(&mut self) {
        self.store.discard(&self.path);
    }
}

async fn ensure_input(input: &Path) -> Result<()> {
    match tokio::fs::metadata(input).await {
        Ok(meta) if meta.is_file() => Ok(()),
        _ => Err(Error::input_not_found(input)),
    }
}

/// Race `fut` against `cancel`; the token wins ties
async fn until_cancelled<F: Future>(
    cancel: &CancellationToken,
    operation: &str,
    fut: F,
) -> Result<F::Output> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(Error::cancelled(operation)),
        out = fut => Ok(out),
    }
}
