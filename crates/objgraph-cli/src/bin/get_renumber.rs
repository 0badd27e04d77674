use clap::Parser;
use objgraph_cli::commands::get_renumber::{run, GetRenumberArgs};
use std::process::ExitCode;

fn main() -> ExitCode {
    let args = GetRenumberArgs::parse();
    objgraph_cli::logging::init();
    objgraph_cli::finish(run(args))
}
