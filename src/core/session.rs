// src/core/session.rs

use crate::core::pool::Runspace;
use crate::error::{Error, Result};
use crate::models::{Record, StagedCommand};

/// The execution context shared by the module manager and every cmdlet proxy.
///
/// Holds one leased runspace and the staged pipeline buffer. Callers clear the buffer,
/// stage commands and invoke; the buffer is not cleared by `invoke` itself.
///
/// When the host dies mid-invocation the lease is dropped on the spot, which closes
/// the host and frees its pool slot. Every later invocation fails with
/// [`Error::HostLost`].
#[derive(Debug)]
pub struct Session {
    runspace: Option<Runspace>,
    pipeline: Vec<StagedCommand>,
    had_errors: bool,
    errors: Vec<String>,
    closed: bool,
}

impl Session {
    /// Binds a session to a leased runspace.
    pub fn new(runspace: Runspace) -> Self {
        Self {
            runspace: Some(runspace),
            pipeline: Vec::new(),
            had_errors: false,
            errors: Vec::new(),
            closed: false,
        }
    }

    /// Appends a command to the pipeline; a second command receives the first one's output.
    pub fn add_command(&mut self, name: impl Into<String>) -> &mut StagedCommand {
        let pipeline = &mut self.pipeline;
        pipeline.push(StagedCommand::new(name));
        match pipeline.last_mut() {
            Some(staged) => staged,
            None => unreachable!("a command was just pushed"),
        }
    }

    /// Empties the staged pipeline.
    pub fn clear(&mut self) {
        self.pipeline.clear();
    }

    /// Runs the staged pipeline and returns its records.
    ///
    /// Non-terminating errors only raise [`had_errors`](Self::had_errors); terminating ones
    /// come back as `Error::Engine`.
    pub fn invoke(&mut self) -> Result<Vec<Record>> {
        if self.closed {
            return Err(Error::Disposed);
        }
        let runspace = self.runspace.as_mut().ok_or(Error::HostLost)?;
        log::debug!(
            "Invoking pipeline: {}",
            self.pipeline
                .iter()
                .map(|c| c.name.as_str())
                .collect::<Vec<_>>()
                .join(" | ")
        );

        match runspace.invoke(&self.pipeline) {
            Ok(invocation) => {
                self.had_errors = invocation.had_errors;
                self.errors = invocation.errors;
                Ok(invocation.records)
            }
            Err(e) => {
                if runspace.is_broken() {
                    // Dropping the lease closes the dead host and frees its slot.
                    self.runspace = None;
                }
                self.had_errors = true;
                self.errors = vec![e.to_string()];
                Err(Error::Engine(e))
            }
        }
    }

    /// Whether the last invocation reported any error.
    pub fn had_errors(&self) -> bool {
        self.had_errors
    }

    /// Error messages reported by the last invocation.
    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    /// False once [`close`](Self::close) has run.
    pub fn is_open(&self) -> bool {
        !self.closed
    }

    /// True while a live host backs the session.
    pub fn has_host(&self) -> bool {
        self.runspace.is_some()
    }

    /// Hands the runspace back to its pool. Fails with `Disposed` if already closed.
    /// A session whose host was lost closes cleanly.
    pub fn close(&mut self) -> Result<()> {
        if self.closed {
            return Err(Error::Disposed);
        }
        self.closed = true;
        self.runspace.take();
        self.pipeline.clear();
        Ok(())
    }
}
