//! Reports where every parsed value sits relative to the cross-reference index.

use super::open_document;
use crate::output::format_json;
use clap::Parser;
use objgraph_core::{collect, format_placements};
use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;

/// Print the parsed offset of every object, grouped by container
#[derive(Parser, Debug)]
#[command(name = "parsed-offset")]
pub struct ParsedOffsetArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
    /// Fail on damaged cross-reference data instead of rebuilding it
    #[arg(long)]
    pub strict: bool,
    /// Input document
    pub input: PathBuf,
}

pub fn run(args: ParsedOffsetArgs) -> Result<ExitCode, Box<dyn Error>> {
    let doc = open_document(&args.input, args.strict)?;
    let placements = collect(&doc, &doc)?;

    if args.json {
        println!("{}", format_json(&placements)?);
    } else {
        print!("{}", format_placements(&placements));
        println!("succeeded");
    }
    Ok(ExitCode::SUCCESS)
}
