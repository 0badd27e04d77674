//! Objgraph command-line tools.
//!
//! Each binary in `src/bin` is a thin wrapper: it parses its arguments,
//! installs logging and hands off to the matching module in [`commands`].

pub mod commands;
pub mod errors;
pub mod logging;
pub mod output;

use std::error::Error;
use std::process::ExitCode;

/// Exit status for failed checks, load errors and bad arguments.
pub const FAILURE: u8 = 2;

/// Turns a command result into the process exit status, printing errors.
pub fn finish(result: Result<ExitCode, Box<dyn Error>>) -> ExitCode {
    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}", e);
            ExitCode::from(FAILURE)
        }
    }
}
