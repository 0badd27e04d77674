use clap::Parser;
use objgraph_cli::commands::parsed_offset::{run, ParsedOffsetArgs};
use std::process::ExitCode;

fn main() -> ExitCode {
    let args = ParsedOffsetArgs::parse();
    objgraph_cli::logging::init();
    objgraph_cli::finish(run(args))
}
