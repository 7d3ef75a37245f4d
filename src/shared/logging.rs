use chrono::{DateTime, Utc};
use std::path::Path;
use tracing::info;
use tracing_appender::non_blocking;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Keeps the non-blocking writers flushing; hold it for the life of the process.
pub struct LoggingGuards {
    _guards: Vec<WorkerGuard>,
}

/// Console logging always; a daily-rolling file under `log_dir` when it is writable.
pub fn init_service_logging(log_dir: &Path, service_name: &str) -> anyhow::Result<LoggingGuards> {
    // RUST_LOG wins; default to info
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if !log_dir_writable(log_dir) {
        let (stdout_writer, stdout_guard) = non_blocking(std::io::stdout());
        let console_layer = fmt::layer()
            .with_writer(stdout_writer)
            .with_ansi(true)
            .with_target(false)
            .with_thread_ids(false)
            .with_line_number(false);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(console_layer)
            .try_init()?;
        info!(
            "Logging initialized - console output only (could not write to {})",
            log_dir.display()
        );
        return Ok(LoggingGuards {
            _guards: vec![stdout_guard],
        });
    }

    if let Err(e) = rotate_logs_on_startup(log_dir, service_name) {
        eprintln!("Could not rotate previous log file: {e}");
    }

    let file_appender =
        tracing_appender::rolling::daily(log_dir, format!("{service_name}.log"));
    let (file_writer, file_guard) = non_blocking(file_appender);
    let file_layer = fmt::layer()
        .with_writer(file_writer)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true);

    let (stdout_writer, stdout_guard) = non_blocking(std::io::stdout());
    let console_layer = fmt::layer()
        .with_writer(stdout_writer)
        .with_ansi(true)
        .with_target(false)
        .with_thread_ids(false)
        .with_line_number(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(console_layer)
        .try_init()?;

    info!(
        "Logging initialized - logs will be written to {}/{}.log.<date>",
        log_dir.display(),
        service_name
    );
    Ok(LoggingGuards {
        _guards: vec![file_guard, stdout_guard],
    })
}

fn log_dir_writable(log_dir: &Path) -> bool {
    let marker = log_dir.join(".test_write");
    std::fs::create_dir_all(log_dir)
        .and_then(|_| std::fs::File::create(&marker))
        .and_then(|_| std::fs::remove_file(&marker))
        .is_ok()
}

/// Moves today's `<service>.log.YYYY-MM-DD` aside to `<service>.<timestamp>.log`
/// so each start writes a fresh daily file.
pub fn rotate_logs_on_startup(log_dir: &Path, service_name: &str) -> anyhow::Result<()> {
    rotate_logs_at(log_dir, service_name, Utc::now())
}

// The daily appender names files by UTC date.
fn rotate_logs_at(log_dir: &Path, service_name: &str, now: DateTime<Utc>) -> anyhow::Result<()> {
    let log_path = log_dir.join(format!("{service_name}.log.{}", now.format("%Y-%m-%d")));

    if log_path.exists() {
        let timestamp = now.format("%Y%m%d_%H%M%S");
        let backup_path = log_dir.join(format!("{service_name}.{timestamp}.log"));
        std::fs::rename(&log_path, &backup_path)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rotation_moves_todays_daily_file_aside() {
        let dir = tempfile::tempdir().unwrap();
        let now = chrono::TimeZone::with_ymd_and_hms(&Utc, 2026, 10, 16, 9, 5, 0).unwrap();
        std::fs::write(dir.path().join("projectmind_api.log.2026-10-16"), "old").unwrap();
        std::fs::write(dir.path().join("projectmind_api.log.2026-10-15"), "older").unwrap();

        rotate_logs_at(dir.path(), "projectmind_api", now).unwrap();

        assert!(!dir.path().join("projectmind_api.log.2026-10-16").exists());
        assert!(dir.path().join("projectmind_api.20261016_090500.log").exists());
        // Earlier days are left to the appender's own naming
        assert!(dir.path().join("projectmind_api.log.2026-10-15").exists());
    }

    #[test]
    fn rotation_without_log_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        rotate_logs_on_startup(dir.path(), "projectmind_api").unwrap();
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn init_writes_console_and_daily_file() {
        let dir = tempfile::tempdir().unwrap();
        let guards = init_service_logging(dir.path(), "projectmind_test").unwrap();
        drop(guards);

        let files: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().to_string())
            .collect();
        assert!(
            files.iter().any(|n| n.starts_with("projectmind_test.log.")),
            "{files:?}"
        );
    }

    #[test]
    fn writable_check_leaves_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let logs = dir.path().join("logs");
        assert!(log_dir_writable(&logs));
        assert_eq!(std::fs::read_dir(&logs).unwrap().count(), 0);
    }
}
