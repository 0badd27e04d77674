//! Object model, reader and renumbering writer for PDF-style object graphs.
//!
//! This crate provides:
//! - A closed object model with parsed byte offsets on every value
//! - A document reader with strict and permissive modes
//! - A writer that renumbers objects and reports the mapping
//! - The collaborator traits the verification engines are written against
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use objgraph_model::{
//!     Document, DocumentWriter, ObjectGraph, ReadMode, RenumberingMap, WriteOptions,
//! };
//!
//! let doc = Document::open("input.pdf", ReadMode::Strict)?;
//! let output = DocumentWriter::new(WriteOptions::default()).write(&doc)?;
//! for id in doc.object_ids() {
//!     println!("{} -> {}", id, output.renumbering.renumbered(id));
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Key Types
//!
//! - [`Document`] - Loaded document and its cross-reference index
//! - [`DocumentWriter`] - Serializes a document, producing a [`Renumbering`]
//! - [`Handle`] - Resolved view used by traversal code

#![deny(missing_docs)]

/// Document loading.
pub mod document;
/// Error types for model operations.
pub mod errors;
pub mod handle;
/// `%PDF-M.m` header.
pub mod header;
pub mod lexer;
/// Object values and identities.
pub mod object;
pub mod parser;
/// Object serialization.
pub mod serialize;
pub mod traits;
pub mod writer;
pub mod xref;

pub use document::{Document, ReadMode};
pub use errors::ModelError;
pub use handle::{Handle, ObjectRef};
pub use header::DocumentHeader;
pub use object::{Dictionary, Name, Node, ObjGen, Object, ObjectType, Stream};
pub use traits::{CrossReferenceIndex, ObjectGraph, RenumberingMap};
pub use writer::{DocumentWriter, ObjectStreamMode, Renumbering, WriteOptions, WriteOutput};
pub use xref::{XRefEntry, XRefTable};
