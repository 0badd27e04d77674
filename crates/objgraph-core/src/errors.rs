use objgraph_model::{ModelError, ObjGen};
use thiserror::Error;

/// A graph and its index disagree, or a renumbered object is missing.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConsistencyError {
    /// The object has no cross-reference entry.
    #[error("{0} is not found in xref table")]
    NotInXref(ObjGen),
    /// The object's cross-reference entry is free.
    #[error("{0} xref entry is free")]
    FreeEntry(ObjGen),
    /// The cross-reference entry has a type this tool does not know.
    #[error("unknown xref entry type")]
    UnknownEntryType {
        /// Object whose entry could not be classified.
        id: ObjGen,
        /// Raw entry type.
        kind: u8,
    },
    /// The renumbering map points at an object the rewritten graph lacks.
    #[error("{original} was renumbered to {renumbered}, which does not exist")]
    MissingRenumbered {
        /// Identity in the original graph.
        original: ObjGen,
        /// Identity the renumbering map gave it.
        renumbered: ObjGen,
    },
}

/// Errors from the verification engines.
#[derive(Error, Debug)]
pub enum VerifyError {
    /// Graph and index are inconsistent.
    #[error(transparent)]
    Consistency(#[from] ConsistencyError),
    /// Loading or writing a document failed.
    #[error(transparent)]
    Model(#[from] ModelError),
}
