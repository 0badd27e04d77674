//! Structural equivalence of two object graphs.
//!
//! Two values are equivalent when they have the same type and the same
//! content, where references are followed into their own graph. Object
//! numbers themselves never take part in the comparison, which is what
//! makes the check meaningful across a renumbering rewrite.
//!
//! Cycles are cut with a visited set keyed on identities from the first
//! graph: an indirect object of graph A that was already entered counts as
//! equal on a later visit.

use crate::errors::{ConsistencyError, VerifyError};
use objgraph_model::{Handle, ModelError, ObjGen, ObjectGraph, ObjectType};
use std::collections::HashSet;

/// Note emitted for each pair of streams whose payloads are skipped.
pub const STREAM_NOTE: &str = "stream objects are not compared";

/// A comparison session between two graphs.
///
/// The visited set and the skipped-stream count belong to one top-level
/// [`equivalent`](Comparison::equivalent) call and are reset when the next
/// call starts.
pub struct Comparison<'g, A: ObjectGraph + ?Sized, B: ObjectGraph + ?Sized> {
    a: &'g A,
    b: &'g B,
    visited: HashSet<ObjGen>,
    streams_skipped: usize,
}

impl<'g, A: ObjectGraph + ?Sized, B: ObjectGraph + ?Sized> Comparison<'g, A, B> {
    /// Creates a session comparing values of `a` against values of `b`.
    pub fn new(a: &'g A, b: &'g B) -> Self {
        Self {
            a,
            b,
            visited: HashSet::new(),
            streams_skipped: 0,
        }
    }

    /// Number of stream pairs whose payloads the last call skipped.
    pub fn streams_skipped(&self) -> usize {
        self.streams_skipped
    }

    /// Compares two resolved values, `a` from the first graph and `b` from
    /// the second. Stops at the first difference.
    pub fn equivalent(&mut self, a: Handle<'g>, b: Handle<'g>) -> bool {
        self.visited.clear();
        self.streams_skipped = 0;

        let mut stack = vec![(a, b)];
        while let Some((a, b)) = stack.pop() {
            if let Some(id) = a.identity() {
                if !self.visited.insert(id) {
                    continue;
                }
            }

            let kind = a.object_type();
            if kind != b.object_type() {
                tracing::debug!(
                    original = ?a.identity(),
                    rewritten = ?b.identity(),
                    original_type = %kind,
                    rewritten_type = %b.object_type(),
                    "types differ"
                );
                return false;
            }

            let same = match kind {
                ObjectType::Null => true,
                ObjectType::Boolean => a.as_bool() == b.as_bool(),
                ObjectType::Integer => a.as_integer() == b.as_integer(),
                ObjectType::Real => a.as_real() == b.as_real(),
                ObjectType::String => a.as_string() == b.as_string(),
                ObjectType::Name => a.as_name() == b.as_name(),
                ObjectType::Array => match (a.array_items(), b.array_items()) {
                    (Some(xs), Some(ys)) if xs.len() == ys.len() => {
                        let children: Vec<_> = xs
                            .iter()
                            .zip(ys)
                            .map(|(x, y)| (self.a.resolve(x), self.b.resolve(y)))
                            .collect();
                        stack.extend(children.into_iter().rev());
                        true
                    }
                    _ => false,
                },
                ObjectType::Dictionary => {
                    let keys = a.dict_keys();
                    if keys != b.dict_keys() {
                        false
                    } else {
                        let children: Vec<_> = keys
                            .iter()
                            .filter_map(|key| Some((a.dict_get(key)?, b.dict_get(key)?)))
                            .map(|(x, y)| (self.a.resolve(x), self.b.resolve(y)))
                            .collect();
                        stack.extend(children.into_iter().rev());
                        true
                    }
                }
                ObjectType::Stream => {
                    self.streams_skipped += 1;
                    tracing::info!(
                        original = ?a.identity(),
                        rewritten = ?b.identity(),
                        "{}",
                        STREAM_NOTE
                    );
                    true
                }
            };
            if !same {
                tracing::debug!(
                    original = ?a.identity(),
                    rewritten = ?b.identity(),
                    object_type = %kind,
                    "values differ"
                );
                return false;
            }
        }
        true
    }

    /// Compares indirect object `a_id` of the first graph with `b_id` of
    /// the second.
    ///
    /// # Errors
    ///
    /// Fails if `a_id` is not in the first graph, or with
    /// [`ConsistencyError::MissingRenumbered`] if `b_id` is not in the
    /// second.
    pub fn equivalent_objects(&mut self, a_id: ObjGen, b_id: ObjGen) -> Result<bool, VerifyError> {
        let a = self
            .a
            .object(a_id)
            .ok_or(ModelError::MissingObject(a_id))?;
        let b = self
            .b
            .object(b_id)
            .ok_or(ConsistencyError::MissingRenumbered {
                original: a_id,
                renumbered: b_id,
            })?;
        Ok(self.equivalent(a, b))
    }
}
