use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

// Re-export tracing macros for convenience
pub use tracing::{debug, error, info, instrument, span, trace, warn, Level, Span};

use apkforge_core::APKFORGE_LOG_VAR;

/// Initialize the tracing system
///
/// `APKFORGE_LOG` (then `RUST_LOG`) takes precedence; otherwise the
/// verbosity count picks the level (`0` info, `1` debug, `2+` trace).
/// Output goes to stderr so stdout stays reserved for command results.
pub fn init(verbosity: u8) -> Result<(), Box<dyn std::error::Error + Send + Sync + 'static>> {
    let fallback = match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_env(APKFORGE_LOG_VAR)
        .or_else(|_| EnvFilter::try_from_default_env())
        .or_else(|_| EnvFilter::try_new(fallback))?;

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(is_tty())
        .compact()
        .with_target(verbosity > 1)
        .with_thread_ids(false)
        .with_level(true);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}

/// Check if we're running in a TTY environment
fn is_tty() -> bool {
    std::io::IsTerminal::is_terminal(&std::io::stderr())
}

/// Create a span for one processing job
pub fn job_span(fingerprint: &str) -> Span {
    span!(Level::INFO, "job", fingerprint = %fingerprint)
}

/// Emit a structured event for job start
pub fn job_started(fingerprint: &str, input: &str) {
    info!(fingerprint = %fingerprint, input = %input, "job_started");
}

/// Emit a structured event for job completion
pub fn job_completed(fingerprint: &str, duration_ms: u64, success: bool) {
    if success {
        info!(
            fingerprint = %fingerprint,
            duration_ms = %duration_ms,
            "job_completed"
        );
    } else {
        error!(
            fingerprint = %fingerprint,
            duration_ms = %duration_ms,
            "job_failed"
        );
    }
}

/// Emit a structured event for cache operations
pub fn cache_event(fingerprint: &str, hit: bool, operation: &str) {
    if hit {
        debug!(
            fingerprint = %fingerprint,
            operation = %operation,
            "cache_hit"
        );
    } else {
        debug!(
            fingerprint = %fingerprint,
            operation = %operation,
            "cache_miss"
        );
    }
}
