use objgraph_model::ModelError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors reading the tools' input files.
#[derive(Error, Debug)]
pub enum CliError {
    /// The input document could not be loaded.
    #[error("{}: {source}", path.display())]
    Open {
        /// Path given on the command line.
        path: PathBuf,
        /// Underlying load failure.
        source: ModelError,
    },
    /// The expected-bytes file could not be read.
    #[error("{}: {source}", path.display())]
    ReadExpected {
        /// Path given on the command line.
        path: PathBuf,
        /// Underlying I/O failure.
        source: std::io::Error,
    },
}
