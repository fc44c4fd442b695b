//! # System Interaction Layer
//!
//! The boundary between the session logic and the PowerShell process it drives.
//!
//! ## Modules
//!
//! - **`engine`**: The narrow `Engine`/`HostFactory` traits every pool host implements.
//! - **`pwsh`**: The production host. A persistent `pwsh` child that runs one script line
//!   per invocation and answers with a marked JSON envelope on stdout.
//! - **`engine_config`**: Loads (or generates) `config.toml` and resolves which
//!   PowerShell executable to start.

/// Host traits and their error type.
pub mod engine;
/// `config.toml` loading and executable lookup.
pub mod engine_config;
/// The persistent `pwsh` host and its script protocol.
pub mod pwsh;
