//! Verification engines for PDF-style object graphs.
//!
//! This crate provides:
//! - Structural equivalence of two graphs under renumbering
//! - A driver that checks a whole rewrite object by object
//! - Placement of every parsed value relative to the cross-reference index
//! - A verbatim byte check for rewritten output
//!
//! The engines are written against the traits in `objgraph_model`, so any
//! graph and index implementation can be checked.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use objgraph_core::rewrite_and_verify;
//! use objgraph_model::{Document, ReadMode, WriteOptions};
//!
//! let doc = Document::open("input.pdf", ReadMode::Strict)?;
//! let report = rewrite_and_verify(&doc, WriteOptions::default())?;
//! assert!(report.succeeded());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![deny(missing_docs)]

pub mod contents;
pub mod equivalence;
/// Error types for verification.
pub mod errors;
pub mod placement;
pub mod rewrite;

pub use contents::{verify_contents, ContentsVerdict};
pub use equivalence::{Comparison, STREAM_NOTE};
pub use errors::{ConsistencyError, VerifyError};
pub use placement::{collect, format_placements, PlacedObject, Placement};
pub use rewrite::{
    rewrite_and_verify, rewrite_document, verify_rewrite, RenumberOutcome, RenumberRecord,
    Rewrite, RewriteReport, RewriteVerdict,
};
