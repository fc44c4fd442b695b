use crate::cli::{args::ProcessesArgs, handlers::commons};
use anyhow::Result;
use clap::Parser;

/// The example driver: runs `Get_Process` and prints one property of each process.
pub fn handle(args: Vec<String>) -> Result<()> {
    let processes_args = ProcessesArgs::try_parse_from(args)?;
    let env = commons::open_environment()?;

    let result = env.cmdlet().command("Get_Process").and_then(|c| c.run());
    commons::finish(env);

    commons::print_records(&result?, Some(&processes_args.field))
}
