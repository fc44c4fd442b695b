use crate::{
    CallArgs, Error,
    cli::{args::ExistsArgs, handlers::commons},
};
use anyhow::Result;
use clap::Parser;
use colored::*;

/// Reports whether a cmdlet is available. Exits with an error when it is not.
pub fn handle(args: Vec<String>) -> Result<()> {
    let exists_args = ExistsArgs::try_parse_from(args)?;
    let env = commons::open_environment()?;

    let outcome = env
        .cmdlet()
        .call(&exists_args.cmdlet, CallArgs::none())
        .map(|cmdlet| cmdlet.staged_command().unwrap_or_default().to_string());
    commons::finish(env);

    match outcome {
        Ok(name) => {
            println!("{} {}", name.cyan(), "is available.".green());
            Ok(())
        }
        Err(Error::CommandNotFound(name)) => {
            println!("{} {}", name.cyan(), "is not available.".yellow());
            Err(Error::CommandNotFound(name).into())
        }
        Err(e) => Err(e.into()),
    }
}
