use crate::config::Config;
use crate::errors::{FsError, FsErrorType, Result};
use crate::locations::get_log_dir;
use chrono::Utc;
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_bunyan_formatter::{BunyanFormattingLayer, JsonStorageLayer};
use tracing_subscriber::{layer::SubscriberExt, EnvFilter, Registry};

/// Install the global subscriber: bunyan-formatted JSON appended to a fresh
/// log file. The returned guard must live until the program exits.
pub fn init_logging(config: &Config, debug: bool) -> Result<Option<WorkerGuard>> {
    if !config.log_to_file {
        return Ok(None);
    }
    let log_file = get_log_location(config.log_retention_days)?;
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_file)?;

    let (non_blocking, guard) = tracing_appender::non_blocking(file);

    let level = if debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    let env_filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    let formatter = BunyanFormattingLayer::new("treefs".into(), non_blocking);

    let subscriber = Registry::default()
        .with(env_filter)
        .with(JsonStorageLayer)
        .with(formatter);
    tracing::subscriber::set_global_default(subscriber).map_err(|e| {
        FsError::new(
            FsErrorType::IOError,
            format!("cannot install log subscriber: {}", e),
        )
    })?;

    Ok(Some(guard))
}

fn get_log_location(retention_days: i64) -> Result<PathBuf> {
    let log_dir = get_log_dir()?;
    let timestamp = Utc::now().format("%Y-%m-%d-%H-%M-%S");
    let log_file = log_dir.join(format!("treefs-{}.log", timestamp));
    clean_logfiles(&log_dir, retention_days)?;
    Ok(log_file)
}

/// Delete log files last modified more than `retention_days` ago.
fn clean_logfiles(log_dir: &Path, retention_days: i64) -> Result<usize> {
    let mut removed = 0;
    for file in std::fs::read_dir(log_dir)? {
        let file = file?;
        let modified = file.metadata()?.modified()?;
        let modified: chrono::DateTime<Utc> = chrono::DateTime::from(modified);
        let age = Utc::now().signed_duration_since(modified);
        if age.num_days() > retention_days {
            std::fs::remove_file(file.path())?;
            removed += 1;
        }
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_logs_are_kept() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("treefs-old.log"), "{}").unwrap();
        assert_eq!(clean_logfiles(dir.path(), 30).unwrap(), 0);
        assert!(dir.path().join("treefs-old.log").exists());
    }

    #[test]
    fn negative_retention_clears_everything() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.log"), "{}").unwrap();
        std::fs::write(dir.path().join("b.log"), "{}").unwrap();
        assert_eq!(clean_logfiles(dir.path(), -1).unwrap(), 2);
    }
}
