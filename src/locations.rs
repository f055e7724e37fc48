use crate::errors::{FsError, FsErrorType, Result};
use directories::BaseDirs;
use std::path::{Path, PathBuf};

fn base_dirs() -> Result<BaseDirs> {
    BaseDirs::new().ok_or_else(|| {
        FsError::new(
            FsErrorType::IOError,
            "Unable to determine the home directory".to_string(),
        )
    })
}

/// Per-user data directory, e.g. `~/.local/share/treefs` on Linux.
pub(crate) fn get_main_dir() -> Result<PathBuf> {
    let base_dir = base_dirs()?;
    let user_data_dir: &Path = base_dir.data_dir();
    let package_root: PathBuf = user_data_dir.join("treefs");
    if !package_root.exists() {
        std::fs::create_dir_all(&package_root)?;
    }
    Ok(package_root)
}

pub(crate) fn get_config_path() -> Result<PathBuf> {
    let base_dir = base_dirs()?;
    Ok(base_dir.config_dir().join("treefs").join("config.json"))
}

pub(crate) fn get_log_dir() -> Result<PathBuf> {
    let log_dir = get_main_dir()?.join("logs");
    std::fs::create_dir_all(&log_dir)?;
    Ok(log_dir)
}
