use clap::Parser;
use objgraph_cli::commands::sig_dict_contents::{run, SigDictContentsArgs};
use std::process::ExitCode;

fn main() -> ExitCode {
    let args = SigDictContentsArgs::parse();
    objgraph_cli::logging::init();
    objgraph_cli::finish(run(args))
}
