use clap::Parser;

/// Per-action argument structs.
pub mod args;
/// One handler per action.
pub mod handlers;

/// psenv: run PowerShell cmdlets through a pooled, long-lived host.
///
/// Usage:
///   psenv                                  List running processes (same as `psenv processes`).
///   psenv run <Cmdlet_Name> [--param K=V]  Run a cmdlet; `_` in the name becomes `-`.
///   psenv install <modules...>             Install modules for the current user.
///   psenv import <modules...>              Import modules, failing on the first one that does not load.
///   psenv exists <Cmdlet_Name>             Check whether a cmdlet is available.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(disable_help_subcommand = true)]
#[command(trailing_var_arg = true)]
pub struct Cli {
    /// The action to perform.
    pub action: Option<String>,

    /// Arguments for the action.
    #[arg(allow_hyphen_values = true)]
    pub args: Vec<String>,
}
