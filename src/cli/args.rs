// EN: src/cli/args.rs
use clap::Parser;

/// Arguments of `psenv run`.
#[derive(Parser, Debug, Default)]
#[command(no_binary_name = true)] // The dispatcher strips the action name before parsing.
pub struct RunArgs {
    /// The cmdlet to run, e.g. `Get_Process` or `Get-Process`.
    pub cmdlet: String,

    /// Named parameters as "Name=Value". Values that parse as JSON (numbers, true/false,
    /// arrays) are passed typed; anything else is passed as a string.
    #[arg(long = "param", short = 'p', value_name = "NAME=VALUE")]
    pub params: Vec<String>,

    /// Print only this property of each result record.
    #[arg(long, short)]
    pub field: Option<String>,

    /// Modules to import before running the cmdlet.
    #[arg(long, value_delimiter = ',')]
    pub import: Vec<String>,
}

/// Arguments of `psenv install` and `psenv import`.
#[derive(Parser, Debug, Default)]
#[command(no_binary_name = true)]
pub struct ModulesArgs {
    /// Module names, processed in the given order.
    #[arg(required = true, num_args = 1..)]
    pub modules: Vec<String>,

    /// Skip modules that `Get-Module -ListAvailable` already reports (install only).
    #[arg(long)]
    pub skip_installed: bool,
}

/// Arguments of `psenv exists`.
#[derive(Parser, Debug, Default)]
#[command(no_binary_name = true)]
pub struct ExistsArgs {
    /// The cmdlet to look up.
    pub cmdlet: String,
}

/// Arguments of `psenv processes`.
#[derive(Parser, Debug, Default)]
#[command(no_binary_name = true)]
pub struct ProcessesArgs {
    /// The property printed for each process.
    #[arg(long, short, default_value = "ProcessName")]
    pub field: String,
}
