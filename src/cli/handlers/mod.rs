// EN: src/cli/handlers/mod.rs

// One module per CLI action.

/// Helpers shared by the handlers.
pub mod commons;
/// `psenv exists`.
pub mod exists;
/// `psenv import`.
pub mod import;
/// `psenv install`.
pub mod install;
/// `psenv processes`, the default action.
pub mod processes;
/// `psenv run`.
pub mod run;
