use crate::cli::{args::ModulesArgs, handlers::commons};
use anyhow::Result;
use clap::Parser;
use colored::*;

/// Installs the given modules for the current user, stopping at the first failure.
pub fn handle(args: Vec<String>) -> Result<()> {
    let modules_args = ModulesArgs::try_parse_from(args)?;
    let env = commons::open_environment()?;

    let result = (|| -> Result<()> {
        let mut pending = Vec::new();
        for module in &modules_args.modules {
            if modules_args.skip_installed && env.is_module_installed(module)? {
                println!("{} {}", "Already installed:".dimmed(), module.cyan());
            } else {
                pending.push(module.as_str());
            }
        }

        env.install_module(&pending)?;
        for module in &pending {
            println!("{} {}", "Installed".green(), module.cyan());
        }
        Ok(())
    })();
    commons::finish(env);
    result
}
