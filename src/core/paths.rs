// src/core/paths.rs

use crate::constants::{CONFIG_DIR_NAME, CONFIG_FILENAME};
use lazy_static::lazy_static;
use std::fs;
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};
use thiserror::Error;

lazy_static! {
    static ref PSENV_CONFIG_DIR: Mutex<Option<PathBuf>> = Mutex::new(None);
}

/// Failures while locating the psenv config directory.
#[derive(Error, Debug)]
pub enum PathError {
    /// The platform reports no config directory.
    #[error("Could not find system config directory.")]
    ConfigDirNotFound,
    /// The directory exists in name only: creating it failed.
    #[error("Could not create config directory at '{path}': {source}")]
    ConfigDirCreation {
        /// The directory that could not be created.
        path: String,
        /// The underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
}

/// Returns the path to the psenv configuration directory (`~/.config/psenv`).
/// Creates it if it doesn't exist.
///
/// Memoized: the first call computes and caches the path.
pub fn get_psenv_config_dir() -> Result<PathBuf, PathError> {
    let mut cached_path_guard = PSENV_CONFIG_DIR
        .lock()
        .unwrap_or_else(PoisonError::into_inner);

    if let Some(path) = &*cached_path_guard {
        return Ok(path.clone());
    }

    let config_path = dirs::config_dir()
        .ok_or(PathError::ConfigDirNotFound)?
        .join(CONFIG_DIR_NAME);

    if !config_path.exists() {
        fs::create_dir_all(&config_path).map_err(|e| PathError::ConfigDirCreation {
            path: config_path.display().to_string(),
            source: e,
        })?;
    }

    *cached_path_guard = Some(config_path.clone());
    Ok(config_path)
}

/// Returns the path to `config.toml` inside the psenv config directory.
pub fn get_config_file_path() -> Result<PathBuf, PathError> {
    get_psenv_config_dir().map(|dir| dir.join(CONFIG_FILENAME))
}
