use crate::object::ObjGen;
use thiserror::Error;

/// Errors that can occur while reading or writing a document.
#[derive(Error, Debug)]
pub enum ModelError {
    /// I/O error during read or write.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// Missing or malformed `%PDF-` header.
    #[error("invalid document header: {0}")]
    InvalidHeader(String),
    /// Malformed object syntax.
    #[error("syntax error at offset {offset}: {reason}")]
    Syntax {
        /// Byte offset where the offending token starts.
        offset: u64,
        /// Reason for the failure.
        reason: String,
    },
    /// Malformed cross-reference section.
    #[error("invalid xref at offset {offset}: {reason}")]
    InvalidXref {
        /// Byte offset of the cross-reference section.
        offset: u64,
        /// Reason for invalidity.
        reason: String,
    },
    /// The cross-reference `/Prev` chain points back at a section already read.
    #[error("xref loop detected at offset {offset}")]
    XrefLoop {
        /// Offset that was visited twice.
        offset: u64,
    },
    /// An in-use cross-reference entry has no loadable object body.
    #[error("object {0} could not be found")]
    MissingObject(ObjGen),
    /// A structural stream uses a filter that this reader does not decode.
    #[error("object {id} uses unsupported filter {filter}")]
    UnsupportedFilter {
        /// Identity of the structural stream.
        id: ObjGen,
        /// Filter name as written in the file.
        filter: String,
    },
    /// Input ended in the middle of a token or object.
    #[error("unexpected end of input at offset {offset}")]
    Truncated {
        /// Byte offset where input ran out.
        offset: u64,
    },
    /// The writer cannot produce output for this document.
    #[error("write error: {0}")]
    Write(String),
}
