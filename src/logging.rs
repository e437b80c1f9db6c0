use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use time::UtcOffset;
use time::macros::format_description;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{self, EnvFilter, fmt, prelude::*};

use crate::wire_logger::WireLogger;

const LOG_RETENTION_DAYS: u64 = 7;

/// Get the log directory path in the user-specific OS cache directory
/// - Linux: ~/.cache/trigram-suggest/
/// - macOS: ~/Library/Caches/trigram-suggest/
/// - Windows: %LOCALAPPDATA%\trigram-suggest\
fn get_log_dir() -> io::Result<PathBuf> {
    let mut log_dir = dirs::cache_dir().ok_or_else(|| {
        io::Error::new(io::ErrorKind::NotFound, "Unable to determine user cache directory")
    })?;
    log_dir.push("trigram-suggest");

    fs::create_dir_all(&log_dir)?;
    Ok(log_dir)
}

/// Remove session and wire logs older than LOG_RETENTION_DAYS
fn cleanup_old_logs(log_dir: &Path) -> io::Result<()> {
    let now = SystemTime::now();
    let retention = Duration::from_secs(LOG_RETENTION_DAYS * 24 * 60 * 60);

    for entry in fs::read_dir(log_dir)?.flatten() {
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        if !(name.starts_with("session-") || name.starts_with("wire-")) || !name.ends_with(".log") {
            continue;
        }

        let expired = entry
            .metadata()
            .and_then(|metadata| metadata.modified())
            .ok()
            .and_then(|modified| now.duration_since(modified).ok())
            .is_some_and(|age| age > retention);

        if expired {
            if let Err(e) = fs::remove_file(entry.path()) {
                eprintln!("Failed to remove old log file {:?}: {}", entry.path(), e);
            }
        }
    }

    Ok(())
}

/// Initialize logging to stderr and, optionally, to a per-process session file.
///
/// Returns the appender guard (keep it alive for the lifetime of the process)
/// and the wire logger that connection tasks share.
///
/// # Arguments
/// * `no_color` - Disable ANSI colors in stderr output
/// * `log_level` - Override log level (otherwise uses RUST_LOG or defaults to "info")
/// * `enable_file_logging` - Write a DEBUG-level session log to the cache directory (disable for tests)
/// * `enable_wire_logging` - Record every protocol frame to `wire-<session>.log`; requires file logging
pub fn init_logger(
    no_color: bool,
    log_level: Option<&str>,
    enable_file_logging: bool,
    enable_wire_logging: bool,
) -> io::Result<(WorkerGuard, WireLogger)> {
    let timer = fmt::time::OffsetTime::new(
        UtcOffset::UTC,
        format_description!("[[[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:3]Z]"),
    );

    let stderr_filter = match log_level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_timer(timer.clone())
        .with_ansi(!no_color)
        .with_filter(stderr_filter);

    if !enable_file_logging {
        let (_, guard) = tracing_appender::non_blocking(std::io::sink());
        let result = tracing_subscriber::registry().with(stderr_layer).try_init();
        return tolerate_existing_subscriber(result).map(|()| (guard, WireLogger::disabled()));
    }

    let log_dir = get_log_dir()?;
    cleanup_old_logs(&log_dir)?;

    // Shared between the session log and the wire log
    let timestamp = time::OffsetDateTime::now_utc()
        .format(format_description!("[year][month][day]-[hour][minute][second]"))
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
    let session_id = format!("{}-{}", timestamp, std::process::id());

    let wire_logger = if enable_wire_logging {
        WireLogger::new(&log_dir, &session_id)?
    } else {
        WireLogger::disabled()
    };

    let log_path = log_dir.join(format!("session-{}.log", session_id));
    let file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)?;

    let (non_blocking, guard) = tracing_appender::non_blocking(file);
    let file_layer = fmt::layer()
        .with_writer(non_blocking)
        .with_timer(timer)
        .with_ansi(false)
        .with_filter(EnvFilter::new("debug"));

    // Each layer carries its own filter, so no global filter is needed
    let result = tracing_subscriber::registry()
        .with(stderr_layer)
        .with(file_layer)
        .try_init();
    tolerate_existing_subscriber(result)?;

    eprintln!("Logging to file: {:?}", log_path);
    Ok((guard, wire_logger))
}

// `try_init` only fails when a global tracing subscriber or `log` logger is
// already installed; events then go to that one.
fn tolerate_existing_subscriber(
    result: Result<(), tracing_subscriber::util::TryInitError>,
) -> io::Result<()> {
    if let Err(e) = result {
        eprintln!("Keeping the existing global logger: {}", e);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_logger_is_idempotent() {
        assert!(init_logger(true, Some("warn"), false, false).is_ok());
        let (_guard, wire_logger) = init_logger(true, Some("warn"), false, true).unwrap();
        // Wire logging needs a session directory
        assert!(!wire_logger.is_enabled());
    }

    #[test]
    fn test_init_logger_after_foreign_global_logger() {
        // Whichever test installs the global subscriber first, the other must still succeed
        let _ = tracing_subscriber::registry().try_init();
        assert!(init_logger(true, None, false, false).is_ok());
    }

    #[test]
    fn test_existing_subscriber_error_is_tolerated() {
        let _ = tracing_subscriber::registry().try_init();
        let second = tracing_subscriber::registry().try_init();
        assert!(second.is_err());
        assert!(tolerate_existing_subscriber(second).is_ok());
    }

    #[test]
    fn test_cleanup_keeps_fresh_and_foreign_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("session-today.log"), "fresh").unwrap();
        fs::write(dir.path().join("notes.txt"), "unrelated").unwrap();

        cleanup_old_logs(dir.path()).unwrap();

        assert!(dir.path().join("session-today.log").exists());
        assert!(dir.path().join("notes.txt").exists());
    }
}
