// src/error.rs

use crate::core::pool::PoolError;
use crate::system::engine::EngineError;
use crate::system::engine_config::ConfigError;
use thiserror::Error;

/// Result type of the library API.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Everything the library API can fail with.
#[derive(Error, Debug)]
pub enum Error {
    /// `Get-Command` found nothing callable under the normalized name.
    #[error("The cmdlet '{0}' is not available in the current PowerShell session.")]
    CommandNotFound(String),
    /// `Install-Module` reported errors; later modules were not attempted.
    #[error("Failed to install PowerShell module: {module}")]
    ModuleInstall {
        /// The module whose install failed.
        module: String,
        /// Error messages reported by the host.
        errors: Vec<String>,
    },
    /// `run()` was called with no cmdlet staged.
    #[error("No cmdlet has been staged; call a cmdlet before running it.")]
    NoCommandStaged,
    /// The environment (or its session) has been closed.
    #[error("The PowerShell environment has been closed.")]
    Disposed,
    /// The session's host died earlier and was discarded. Session state such as
    /// imported modules went with it, so nothing else runs on this environment.
    #[error("The PowerShell host behind this environment was lost; open a new environment.")]
    HostLost,
    /// Failure reported by the host, passed through unchanged.
    #[error(transparent)]
    Engine(#[from] EngineError),
    /// The pool could not lend a host.
    #[error(transparent)]
    Pool(#[from] PoolError),
    /// `config.toml` or the executable lookup failed.
    #[error(transparent)]
    Config(#[from] ConfigError),
}
