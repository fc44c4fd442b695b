// src/system/engine_config.rs

use std::{env, fs, path::Path, path::PathBuf};

use thiserror::Error;

use crate::{
    constants::{EXECUTABLE_ENV_VAR, PWSH_CANDIDATES},
    core::{
        paths::{self, PathError},
        pool::{PoolBounds, PoolError},
    },
    models::EngineConfig,
    system::pwsh::PwshFactory,
};

/// Failures while loading `config.toml` or locating PowerShell.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Reading or writing the config file failed.
    #[error("Filesystem Error: {0}")]
    Io(#[from] std::io::Error),
    /// The config directory could not be located or created.
    #[error(transparent)]
    Path(#[from] PathError),
    /// The file is not a valid engine config.
    #[error("Failed to parse config.toml: {0}")]
    TomlParse(#[from] toml::de::Error),
    /// The default config could not be written out.
    #[error("Failed to serialize engine config to TOML: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
    /// `shellexpand` rejected the configured executable.
    #[error("Could not expand executable path '{path}': {message}")]
    PathExpansion {
        /// The configured value.
        path: String,
        /// Why expansion failed.
        message: String,
    },
    /// No executable was configured and none of the candidates is on `PATH`.
    #[error("No PowerShell executable found in PATH (tried: {0}).")]
    ExecutableNotFound(String),
}

/// Loads `config.toml` from the psenv config directory, writing the defaults
/// there first if the file does not exist yet.
pub fn load_engine_config() -> Result<EngineConfig, ConfigError> {
    let config_path = paths::get_config_file_path()?;
    load_engine_config_from(&config_path)
}

/// Loads the config at `config_path`, generating the defaults there if it is missing.
pub fn load_engine_config_from(config_path: &Path) -> Result<EngineConfig, ConfigError> {
    if !config_path.exists() {
        let default_config = EngineConfig::default();
        let toml_string = toml::to_string_pretty(&default_config)?;
        fs::write(config_path, toml_string)?;
        log::debug!("Default engine config written to: {}", config_path.display());
        Ok(default_config)
    } else {
        let content = fs::read_to_string(config_path)?;
        Ok(toml::from_str(&content)?)
    }
}

impl EngineConfig {
    /// Validated pool bounds.
    pub fn bounds(&self) -> Result<PoolBounds, PoolError> {
        PoolBounds::new(self.min_runspaces, self.max_runspaces)
    }

    /// Resolves the executable to start: `PSENV_EXECUTABLE`, then `executable`,
    /// then the first of `pwsh`/`powershell` found on `PATH`.
    pub fn resolve_executable(&self) -> Result<PathBuf, ConfigError> {
        let configured = env::var(EXECUTABLE_ENV_VAR)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .or_else(|| self.executable.clone());

        if let Some(raw) = configured {
            let expanded = shellexpand::full(&raw).map_err(|e| ConfigError::PathExpansion {
                path: raw.clone(),
                message: e.to_string(),
            })?;
            let path = PathBuf::from(expanded.into_owned());
            // Bare names are looked up on PATH; anything with a separator is taken as given.
            if path.components().count() == 1
                && let Ok(found) = which::which(&path)
            {
                return Ok(found);
            }
            return Ok(path);
        }

        PWSH_CANDIDATES
            .iter()
            .find_map(|candidate| which::which(candidate).ok())
            .ok_or_else(|| ConfigError::ExecutableNotFound(PWSH_CANDIDATES.join(", ")))
    }

    /// Builds the host factory described by this config.
    pub fn host_factory(&self) -> Result<PwshFactory, ConfigError> {
        Ok(PwshFactory {
            program: self.resolve_executable()?,
            args: self.args.clone(),
            json_depth: self.json_depth,
        })
    }
}
