use crate::{
    CallArgs,
    cli::{args::RunArgs, handlers::commons},
};
use anyhow::Result;
use clap::Parser;
use colored::*;

/// Main entry point for the 'run' command.
/// Stages the cmdlet with its named parameters, runs it and prints the records.
pub fn handle(args: Vec<String>) -> Result<()> {
    let run_args = RunArgs::try_parse_from(args)?;

    let params = run_args
        .params
        .iter()
        .map(|raw| commons::parse_param(raw))
        .collect::<Result<Vec<_>>>()?;

    let env = commons::open_environment()?;
    let result = (|| -> Result<()> {
        if !run_args.import.is_empty() {
            env.import_module(&run_args.import)?;
        }
        let records = env
            .cmdlet()
            .call(&run_args.cmdlet, CallArgs::named(params))?
            .run()?;

        if records.is_empty() {
            println!("{}", "No output.".dimmed());
        }
        commons::print_records(&records, run_args.field.as_deref())
    })();
    commons::finish(env);
    result
}
