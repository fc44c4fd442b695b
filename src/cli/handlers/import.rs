use crate::cli::{args::ModulesArgs, handlers::commons};
use anyhow::Result;
use clap::Parser;
use colored::*;

/// Imports the given modules in order. Useful to check that they load cleanly.
pub fn handle(args: Vec<String>) -> Result<()> {
    let modules_args = ModulesArgs::try_parse_from(args)?;
    let env = commons::open_environment()?;

    let result = env.import_module(&modules_args.modules);
    commons::finish(env);
    result?;

    for module in &modules_args.modules {
        println!("{} {}", "Imported".green(), module.cyan());
    }
    Ok(())
}
