//! Checks that expected bytes, usually a signature's `/Contents`, survive a
//! rewrite verbatim.

use super::{open_document, ObjectStreamsArg};
use crate::errors::CliError;
use crate::FAILURE;
use clap::Parser;
use objgraph_core::{rewrite_document, verify_contents, ContentsVerdict};
use objgraph_model::WriteOptions;
use std::error::Error;
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

/// Rewrite INPUT and look for the bytes of EXPECTED in the output
#[derive(Parser, Debug)]
#[command(name = "sig-dict-contents")]
pub struct SigDictContentsArgs {
    /// Object stream handling for the rewrite
    #[arg(long, value_enum, default_value_t = ObjectStreamsArg::Preserve)]
    pub object_streams: ObjectStreamsArg,
    /// Fail on damaged cross-reference data instead of rebuilding it
    #[arg(long)]
    pub strict: bool,
    /// Input document
    pub input: PathBuf,
    /// File holding the bytes that must appear in the output
    pub expected: PathBuf,
}

pub fn run(args: SigDictContentsArgs) -> Result<ExitCode, Box<dyn Error>> {
    let doc = open_document(&args.input, args.strict)?;
    let expected = fs::read(&args.expected).map_err(|source| CliError::ReadExpected {
        path: args.expected.clone(),
        source,
    })?;

    let options = WriteOptions {
        object_streams: args.object_streams.into(),
        ..Default::default()
    };
    let rewrite = rewrite_document(&doc, options)?;

    match verify_contents(&rewrite.bytes, &expected) {
        ContentsVerdict::Found { .. } => {
            println!("succeeded");
            Ok(ExitCode::SUCCESS)
        }
        ContentsVerdict::Missing => {
            eprintln!("failed");
            Ok(ExitCode::from(FAILURE))
        }
    }
}
