//! # psenv
//!
//! A fluent runner for PowerShell cmdlets. An [`Environment`](core::environment::Environment)
//! owns a lazily opened pool of `pwsh` hosts, binds one shared session to it and hands out
//! [`Cmdlet`](core::cmdlet::Cmdlet) builders and module install/import helpers over that session.

#![cfg_attr(
    test,
    allow(clippy::unwrap_used, clippy::indexing_slicing, clippy::panic)
)]

/// Command line front end: argument structs and one handler per action.
pub mod cli;
/// File names, defaults and the cmdlet names psenv stages.
pub mod constants;
/// Pool, session, cmdlet builder, module manager and the environment facade.
pub mod core;
/// The crate-level error type.
pub mod error;
/// Pipeline, record, argument and config models.
pub mod models;
pub mod system;

pub use crate::core::cmdlet::Cmdlet;
pub use crate::core::environment::Environment;
pub use crate::error::{Error, Result};
pub use crate::models::{CallArgs, EngineConfig, Record};
