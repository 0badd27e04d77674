//! Rewrites a document and checks every object against its renumbered copy.

use super::{open_document, ObjectStreamsArg};
use crate::output::{format_json, renumber_lines};
use crate::FAILURE;
use clap::Parser;
use objgraph_core::{rewrite_and_verify, RewriteVerdict};
use objgraph_model::WriteOptions;
use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;

/// Check that a rewrite preserves the object graph under renumbering
#[derive(Parser, Debug)]
#[command(name = "get-renumber")]
pub struct GetRenumberArgs {
    /// Object stream handling for the rewrite
    #[arg(long, value_enum, default_value_t = ObjectStreamsArg::Preserve)]
    pub object_streams: ObjectStreamsArg,
    /// Linearize the rewritten document
    #[arg(long)]
    pub linearize: bool,
    /// Keep objects that nothing references
    #[arg(long)]
    pub preserve_unreferenced: bool,
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
    /// Fail on damaged cross-reference data instead of rebuilding it
    #[arg(long)]
    pub strict: bool,
    /// Input document
    pub input: PathBuf,
}

impl GetRenumberArgs {
    fn write_options(&self) -> WriteOptions {
        WriteOptions {
            object_streams: self.object_streams.into(),
            linearize: self.linearize,
            preserve_unreferenced: self.preserve_unreferenced,
        }
    }
}

pub fn run(args: GetRenumberArgs) -> Result<ExitCode, Box<dyn Error>> {
    let doc = open_document(&args.input, args.strict)?;
    let report = rewrite_and_verify(&doc, args.write_options())?;

    if args.json {
        println!("{}", format_json(&report)?);
    } else {
        for record in &report.records {
            for line in renumber_lines(record) {
                println!("{}", line);
            }
        }
    }

    match report.verdict {
        RewriteVerdict::Succeeded => {
            if !args.json {
                println!("succeeded");
            }
            Ok(ExitCode::SUCCESS)
        }
        RewriteVerdict::Different {
            original,
            renumbered,
        } => {
            tracing::warn!(%original, %renumbered, "rewritten object differs");
            if !args.json {
                eprintln!("different");
            }
            Ok(ExitCode::from(FAILURE))
        }
    }
}
