use crate::infrastructure::error::InfraError;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

pub const LOG_FILE_NAME: &str = "velo.log";
const DEFAULT_FILTER: &str = "info,velo_core=debug";

/// Installs the global subscriber: stderr plus `logs_dir/velo.log`.
///
/// Keep the returned guard alive for as long as file logging should flush.
/// A subscriber that is already installed is left in place.
pub fn init_tracing(logs_dir: &Path) -> Result<WorkerGuard, InfraError> {
    std::fs::create_dir_all(logs_dir)?;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(DEFAULT_FILTER))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let file_appender = tracing_appender::rolling::never(logs_dir, LOG_FILE_NAME);
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_line_number(true),
        )
        .with(
            fmt::layer()
                .with_writer(file_writer)
                .with_ansi(false)
                .with_target(true),
        )
        .try_init();

    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_tracing_creates_log_directory() {
        let dir = tempfile::tempdir().expect("tempdir");
        let logs_dir = dir.path().join("logs");
        let guard = init_tracing(&logs_dir).expect("init");
        tracing::info!("logging initialised");
        drop(guard);
        assert!(logs_dir.is_dir());

        // A second call must not fail even though a subscriber is installed.
        let _second = init_tracing(&logs_dir).expect("second init");
    }
}
