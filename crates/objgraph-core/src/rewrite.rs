//! Verification that a rewrite preserved the object graph.

use crate::equivalence::Comparison;
use crate::errors::VerifyError;
use objgraph_model::{
    Document, DocumentWriter, ModelError, ObjGen, ObjectGraph, ReadMode, Renumbering,
    RenumberingMap, WriteOptions,
};
use serde::Serialize;

/// What happened to one original object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RenumberOutcome {
    /// The writer dropped the object.
    Deleted,
    /// The rewritten object is equivalent to the original.
    Equivalent {
        /// Stream pairs whose payloads were not compared.
        streams_skipped: usize,
    },
    /// The rewritten object differs from the original.
    Different {
        /// Stream pairs whose payloads were not compared before the
        /// difference was found.
        streams_skipped: usize,
    },
}

/// One line of the renumbering report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RenumberRecord {
    /// Identity in the original graph.
    pub original: ObjGen,
    /// Identity in the rewritten graph, or `0/0` if dropped.
    pub renumbered: ObjGen,
    /// Comparison result.
    #[serde(flatten)]
    pub outcome: RenumberOutcome,
}

/// Overall result of a rewrite check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum RewriteVerdict {
    /// Every kept object is equivalent to its original.
    Succeeded,
    /// The first object found to differ.
    Different {
        /// Identity in the original graph.
        original: ObjGen,
        /// Identity in the rewritten graph.
        renumbered: ObjGen,
    },
}

/// Records for every object checked, in ascending original identity order.
/// Checking stops at the first difference, so on failure the last record
/// is the differing object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RewriteReport {
    /// Per-object records.
    pub records: Vec<RenumberRecord>,
    /// Overall verdict.
    #[serde(flatten)]
    pub verdict: RewriteVerdict,
}

impl RewriteReport {
    /// True when the verdict is [`RewriteVerdict::Succeeded`].
    pub fn succeeded(&self) -> bool {
        self.verdict == RewriteVerdict::Succeeded
    }
}

/// Checks every object of `original` against its renumbered counterpart in
/// `rewritten`.
///
/// # Errors
///
/// Returns [`VerifyError`] if an identity of `original` has no object (as
/// for an index entry of unknown type), or if the renumbering map names an
/// object that the rewritten graph does not contain.
pub fn verify_rewrite<O, R, M>(
    original: &O,
    rewritten: &R,
    renumbering: &M,
) -> Result<RewriteReport, VerifyError>
where
    O: ObjectGraph + ?Sized,
    R: ObjectGraph + ?Sized,
    M: RenumberingMap + ?Sized,
{
    let mut records = Vec::new();
    for id in original.object_ids() {
        if original.object(id).is_none() {
            return Err(ModelError::MissingObject(id).into());
        }
        let renumbered = renumbering.renumbered(id);
        if renumbered.is_none() {
            tracing::debug!(original = %id, "object dropped by rewrite");
            records.push(RenumberRecord {
                original: id,
                renumbered,
                outcome: RenumberOutcome::Deleted,
            });
            continue;
        }

        let mut session = Comparison::new(original, rewritten);
        let same = session.equivalent_objects(id, renumbered)?;
        let streams_skipped = session.streams_skipped();
        tracing::debug!(original = %id, renumbered = %renumbered, same, "compared object");

        if same {
            records.push(RenumberRecord {
                original: id,
                renumbered,
                outcome: RenumberOutcome::Equivalent { streams_skipped },
            });
        } else {
            records.push(RenumberRecord {
                original: id,
                renumbered,
                outcome: RenumberOutcome::Different { streams_skipped },
            });
            return Ok(RewriteReport {
                records,
                verdict: RewriteVerdict::Different {
                    original: id,
                    renumbered,
                },
            });
        }
    }

    Ok(RewriteReport {
        records,
        verdict: RewriteVerdict::Succeeded,
    })
}

/// A written document loaded back, with the map from the original.
#[derive(Debug)]
pub struct Rewrite {
    /// Bytes the writer produced.
    pub bytes: Vec<u8>,
    /// The written bytes loaded back.
    pub rewritten: Document,
    /// Renumbering reported by the writer.
    pub renumbering: Renumbering,
}

/// Writes `doc` with `options` and loads the result back.
pub fn rewrite_document(doc: &Document, options: WriteOptions) -> Result<Rewrite, VerifyError> {
    let output = DocumentWriter::new(options).write(doc)?;
    let rewritten = Document::from_bytes(&output.bytes, ReadMode::Strict)?;
    Ok(Rewrite {
        bytes: output.bytes,
        rewritten,
        renumbering: output.renumbering,
    })
}

/// Rewrites `doc` and verifies the result.
pub fn rewrite_and_verify(doc: &Document, options: WriteOptions) -> Result<RewriteReport, VerifyError> {
    let rewrite = rewrite_document(doc, options)?;
    verify_rewrite(doc, &rewrite.rewritten, &rewrite.renumbering)
}
