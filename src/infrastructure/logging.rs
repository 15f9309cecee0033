use std::{env, io};

use anyhow::Result;
use once_cell::sync::OnceCell;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::{config::LoggingConfig, infrastructure::directories::ResolvedPaths};

const LOG_FILE: &str = "focus-filter.log";

/// Dependencies that are noisy at `info`.
const QUIET_TARGETS: &[&str] = &[
    "sqlx=warn",
    "hyper=warn",
    "reqwest=warn",
    "tokio_cron_scheduler=warn",
    "html5ever=error",
];

static FILE_GUARD: OnceCell<WorkerGuard> = OnceCell::new();

/// Stdout carries native-messaging frames, so the console layer writes to
/// stderr and never emits ANSI escapes. Calling this twice is a no-op.
pub fn init_tracing(config: &LoggingConfig, paths: &ResolvedPaths) -> Result<()> {
    if FILE_GUARD.get().is_some() {
        return Ok(());
    }

    let file_appender = tracing_appender::rolling::daily(&paths.logs_dir, LOG_FILE);
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_writer(io::stderr)
        .with_target(true)
        .with_ansi(false)
        .with_timer(fmt::time::UtcTime::rfc_3339());

    let file_layer = fmt::layer()
        .with_writer(file_writer)
        .with_target(true)
        .with_thread_ids(true)
        .with_ansi(false)
        .with_timer(fmt::time::UtcTime::rfc_3339());

    let filter = build_filter(&config.level, env::var(EnvFilter::DEFAULT_ENV).ok());
    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()?;
    let _ = FILE_GUARD.set(guard);

    tracing::info!(logs = %paths.logs_dir.display(), file = LOG_FILE, "tracing initialized");
    Ok(())
}

/// `RUST_LOG` is taken verbatim; the configured level gets the quiet
/// dependency targets appended.
fn build_filter(level: &str, rust_log: Option<String>) -> EnvFilter {
    let directives = match rust_log.filter(|value| !value.trim().is_empty()) {
        Some(value) => value,
        None => std::iter::once(level)
            .chain(QUIET_TARGETS.iter().copied())
            .collect::<Vec<_>>()
            .join(","),
    };
    EnvFilter::try_new(&directives).unwrap_or_else(|err| {
        eprintln!("invalid log filter {directives:?}: {err}; falling back to info");
        EnvFilter::new("info")
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configured_level_quiets_dependencies() {
        let filter = build_filter("debug", None).to_string();
        assert!(filter.contains("debug"));
        assert!(filter.contains("sqlx=warn"));
    }

    #[test]
    fn rust_log_replaces_everything() {
        let filter = build_filter("debug", Some("host=trace".to_string())).to_string();
        assert!(filter.contains("host=trace"));
        assert!(!filter.contains("sqlx"));
    }

    #[test]
    fn garbage_falls_back_to_info() {
        let filter = build_filter("host=loud", None).to_string();
        assert_eq!(filter, "info");
    }
}
