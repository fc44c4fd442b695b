// src/system/engine.rs

use crate::models::{Invocation, StagedCommand};
use thiserror::Error;

/// Failures reported by a host or by the exchange with it.
#[derive(Error, Debug)]
pub enum EngineError {
    /// The host process could not be started.
    #[error("Could not start PowerShell host '{program}': {source}")]
    Spawn {
        /// The executable that failed to start.
        program: String,
        /// Why it failed.
        #[source]
        source: std::io::Error,
    },
    /// Reading from or writing to the host failed.
    #[error("I/O error while talking to the PowerShell host: {0}")]
    Io(#[from] std::io::Error),
    /// The host closed its end of the pipes.
    #[error("The PowerShell host exited unexpectedly.")]
    HostExited,
    /// The host answered with something other than an envelope.
    #[error("Malformed response from the PowerShell host: {0}")]
    Protocol(String),
    /// `invoke` was called with nothing staged.
    #[error("No command staged in the pipeline.")]
    EmptyPipeline,
    /// A parameter name that cannot be rendered safely.
    #[error("'{0}' is not a valid parameter name.")]
    InvalidParameterName(String),
    /// A terminating error raised by the pipeline, with its message.
    #[error("{0}")]
    Invocation(String),
}

impl EngineError {
    /// True when the host behind the engine can no longer be used.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::HostExited | Self::Io(_) | Self::Protocol(_)
        )
    }
}

/// A single PowerShell host able to run staged pipelines.
///
/// Non-terminating errors are reported through [`Invocation::had_errors`];
/// terminating errors come back as [`EngineError::Invocation`].
pub trait Engine: Send {
    /// Runs a pipeline: each command receives the previous command's output.
    fn invoke(&mut self, pipeline: &[StagedCommand]) -> Result<Invocation, EngineError>;

    /// Shuts the host down. Called once, when the host leaves the pool.
    fn close(&mut self) -> Result<(), EngineError>;
}

/// Creates hosts on behalf of a pool.
pub trait HostFactory: Send + Sync {
    /// Starts a new host.
    fn spawn(&self) -> Result<Box<dyn Engine>, EngineError>;
}
