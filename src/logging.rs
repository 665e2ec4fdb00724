//! Session log file
//!
//! Appends one line per CLI operation to `wavesight.log` next to the
//! database, alongside the `tracing` output on stderr.

use chrono::Local;
use lazy_static::lazy_static;
use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

const LOG_FILE_NAME: &str = "wavesight.log";

lazy_static! {
    static ref SESSION_LOG: Mutex<Option<File>> = Mutex::new(None);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            LogLevel::Info => "INFO",
            LogLevel::Error => "ERROR",
        })
    }
}

/// Session log location for a database file
pub fn log_path_for(db_path: &Path) -> PathBuf {
    db_path.with_file_name(LOG_FILE_NAME)
}

/// Open (or create) the session log and write the session header
pub fn init_logger_at(log_path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)?;
    writeln!(
        file,
        "\n=== wavesight session {} (pid {}) ===",
        Local::now().format("%Y-%m-%d %H:%M:%S"),
        std::process::id()
    )?;

    if let Ok(mut slot) = SESSION_LOG.lock() {
        *slot = Some(file);
    }
    Ok(())
}

/// Append one line. A no-op until the logger is initialized.
pub fn record(level: LogLevel, message: &str) {
    let Ok(mut slot) = SESSION_LOG.lock() else {
        return;
    };
    if let Some(file) = slot.as_mut() {
        let stamp = Local::now().format("%H:%M:%S%.3f");
        let _ = writeln!(file, "{} {:<5} {}", stamp, level, message);
        let _ = file.flush();
    }
}

#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        $crate::logging::record($crate::logging::LogLevel::Info, &format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {
        $crate::logging::record($crate::logging::LogLevel::Error, &format!($($arg)*))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_sits_next_to_database() {
        let path = log_path_for(Path::new("/data/wavesight/wavesight.db"));
        assert_eq!(path, PathBuf::from("/data/wavesight/wavesight.log"));
    }

    #[test]
    fn test_record_appends_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = log_path_for(&dir.path().join("nested").join("wavesight.db"));

        init_logger_at(&path).unwrap();
        crate::log_info!("cluster {} created", "cluster_0badf00d");
        crate::log_error!("label update failed");

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("=== wavesight session"));
        assert!(content.contains("INFO  cluster cluster_0badf00d created"));
        assert!(content.contains("ERROR label update failed"));
    }
}
