// src/bin/psenv.rs

//! The `psenv` command line entry point.

use anyhow::Result;
use clap::Parser;
use colored::*;
use psenv::cli::{Cli, handlers};

// --- Command Definition and Registry ---

/// A CLI action, its aliases and its handler.
struct CommandDefinition {
    name: &'static str,
    aliases: &'static [&'static str],
    handler: fn(Vec<String>) -> Result<()>,
}

/// Every action psenv understands. Add an entry here to add an action.
static COMMAND_REGISTRY: &[CommandDefinition] = &[
    CommandDefinition {
        name: "exists",
        aliases: &["has"],
        handler: handlers::exists::handle,
    },
    CommandDefinition {
        name: "import",
        aliases: &[],
        handler: handlers::import::handle,
    },
    CommandDefinition {
        name: "install",
        aliases: &["add"],
        handler: handlers::install::handle,
    },
    CommandDefinition {
        name: "processes",
        aliases: &["ps"],
        handler: handlers::processes::handle,
    },
    CommandDefinition {
        name: "run",
        aliases: &[],
        handler: handlers::run::handle,
    },
];

/// Finds a command definition in the registry by its name or alias.
fn find_command(name: &str) -> Option<&'static CommandDefinition> {
    COMMAND_REGISTRY
        .iter()
        .find(|cmd| cmd.name == name || cmd.aliases.contains(&name))
}

fn main() {
    env_logger::init();

    if let Err(e) = run_cli(Cli::parse()) {
        // clap errors (including --help) know how to print themselves.
        if let Some(clap_err) = e.downcast_ref::<clap::Error>() {
            clap_err.exit();
        }
        eprintln!("\n{}: {:#}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

/// Routes the parsed arguments to an action handler.
///
/// With no action, runs the process listing example. An unknown action that looks like a
/// cmdlet name is treated as a shortcut for `run`.
fn run_cli(cli: Cli) -> Result<()> {
    log::debug!("CLI args parsed: {:?}", cli);

    let Some(action) = cli.action else {
        return handlers::processes::handle(Vec::new());
    };

    if let Some(command) = find_command(&action) {
        (command.handler)(cli.args)
    } else {
        // `psenv Get_Date --param Format=o` -> `psenv run Get_Date --param Format=o`
        let mut run_args = vec![action];
        run_args.extend(cli.args);
        handlers::run::handle(run_args)
    }
}
