//! One module per binary.

pub mod get_renumber;
pub mod parsed_offset;
pub mod sig_dict_contents;

use crate::errors::CliError;
use clap::ValueEnum;
use objgraph_model::{Document, ObjectStreamMode, ReadMode};
use std::path::Path;

/// `--object-streams` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ObjectStreamsArg {
    /// Keep the input's grouping.
    #[default]
    Preserve,
    /// Write every object directly.
    Disable,
    /// Group objects into new object streams.
    Generate,
}

impl From<ObjectStreamsArg> for ObjectStreamMode {
    fn from(arg: ObjectStreamsArg) -> Self {
        match arg {
            ObjectStreamsArg::Preserve => ObjectStreamMode::Preserve,
            ObjectStreamsArg::Disable => ObjectStreamMode::Disable,
            ObjectStreamsArg::Generate => ObjectStreamMode::Generate,
        }
    }
}

/// Damaged cross-reference data is rebuilt unless `strict` is set.
fn open_document(path: &Path, strict: bool) -> Result<Document, CliError> {
    let mode = if strict {
        ReadMode::Strict
    } else {
        ReadMode::Permissive
    };
    let doc = Document::open(path, mode).map_err(|source| CliError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::info!(path = %path.display(), objects = doc.len(), "loaded input");
    Ok(doc)
}
