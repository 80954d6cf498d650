//! Console and rolling-file tracing output.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LauncherConfig;

const LOG_FILE_PREFIX: &str = "fusion-launcher.log";
const DAY: Duration = Duration::from_secs(24 * 60 * 60);

/// Install the global subscriber. Keep the guard alive for the whole run or
/// buffered file output is lost.
pub fn init_logging(config: &LauncherConfig) -> WorkerGuard {
    let log_dir = config.data_dir.join("logs");
    if let Err(e) = fs::create_dir_all(&log_dir) {
        eprintln!("Warning: Failed to create log directory: {}", e);
    }

    let (file_writer, guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::daily(&log_dir, LOG_FILE_PREFIX));

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::try_new(&config.log_filter).unwrap_or_else(|e| {
            eprintln!("Warning: Invalid log filter {:?}: {}", config.log_filter, e);
            EnvFilter::new("info")
        })
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true).compact())
        .with(
            fmt::layer()
                .with_ansi(false)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true)
                .with_writer(file_writer),
        )
        .init();

    tracing::info!(
        "Fusion Launcher {} logging to {}",
        env!("CARGO_PKG_VERSION"),
        log_dir.display()
    );

    let cutoff = SystemTime::now() - DAY * config.log_retention_days as u32;
    for path in expired_logs(&log_dir, cutoff) {
        match fs::remove_file(&path) {
            Ok(()) => tracing::debug!("Removed old log file: {:?}", path),
            Err(e) => tracing::warn!("Failed to remove old log file {:?}: {}", path, e),
        }
    }

    guard
}

/// Rotated log files last modified before `cutoff`. The file the appender is
/// currently writing is never included.
fn expired_logs(log_dir: &Path, cutoff: SystemTime) -> Vec<PathBuf> {
    let entries = match fs::read_dir(log_dir) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!("Failed to read log directory for cleanup: {}", e);
            return Vec::new();
        }
    };

    entries
        .flatten()
        .filter(|entry| {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            name.starts_with(LOG_FILE_PREFIX) && name != LOG_FILE_PREFIX
        })
        .filter(|entry| {
            entry
                .metadata()
                .and_then(|m| m.modified())
                .map(|modified| modified < cutoff)
                .unwrap_or(false)
        })
        .map(|entry| entry.path())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_rotated_launcher_logs_expire() {
        let dir = tempfile::tempdir().unwrap();
        for name in [
            "fusion-launcher.log",
            "fusion-launcher.log.2024-01-01",
            "other.log.2024-01-01",
        ] {
            fs::write(dir.path().join(name), "x").unwrap();
        }

        let future = SystemTime::now() + DAY;
        let expired = expired_logs(dir.path(), future);

        assert_eq!(
            expired,
            vec![dir.path().join("fusion-launcher.log.2024-01-01")]
        );
    }

    #[test]
    fn recent_logs_are_kept() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("fusion-launcher.log.2024-01-01"), "x").unwrap();

        let past = SystemTime::now() - DAY;
        assert!(expired_logs(dir.path(), past).is_empty());
    }

    #[test]
    fn missing_directory_expires_nothing() {
        let dir = tempfile::tempdir().unwrap();
        assert!(expired_logs(&dir.path().join("absent"), SystemTime::now()).is_empty());
    }
}
