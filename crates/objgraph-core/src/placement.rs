//! Where every object and nested value sits in the file.
//!
//! Each indirect object is assigned to a bucket by its cross-reference
//! entry: bucket 0 for objects stored directly in the file, bucket `N` for
//! members of object stream `N`. Walking an object also records the direct
//! values nested inside it, so a bucket lists everything parsed from that
//! region. Offsets inside an object stream are relative to its data.

use crate::errors::{ConsistencyError, VerifyError};
use objgraph_model::{
    CrossReferenceIndex, Handle, ModelError, ObjGen, ObjectGraph, ObjectRef, ObjectType, XRefEntry,
};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Write;

/// One parsed value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PlacedObject {
    /// Parsed byte offset.
    pub offset: u64,
    /// Identity, for indirect objects.
    pub identity: Option<ObjGen>,
    /// Value type.
    pub object_type: ObjectType,
}

/// Values found in one container, sorted by offset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Placement {
    /// `0` for the file itself, otherwise the object stream number.
    pub container: u32,
    /// Values in ascending offset order.
    pub entries: Vec<PlacedObject>,
}

/// Buckets every object of `graph` by its entry in `xref`.
///
/// # Errors
///
/// Returns [`ConsistencyError`] if an object has no entry, a free entry or
/// an entry of unknown type.
pub fn collect<G, X>(graph: &G, xref: &X) -> Result<Vec<Placement>, VerifyError>
where
    G: ObjectGraph + ?Sized,
    X: CrossReferenceIndex + ?Sized,
{
    let mut buckets: BTreeMap<u32, Vec<PlacedObject>> = BTreeMap::new();

    for id in graph.object_ids() {
        let container = match xref.xref_entry(id) {
            None => return Err(ConsistencyError::NotInXref(id).into()),
            Some(XRefEntry::Free) => return Err(ConsistencyError::FreeEntry(id).into()),
            Some(XRefEntry::Unknown(kind)) => {
                return Err(ConsistencyError::UnknownEntryType { id, kind }.into())
            }
            Some(XRefEntry::Uncompressed { .. }) => 0,
            Some(XRefEntry::Compressed { stream, .. }) => stream,
        };
        let handle = graph.object(id).ok_or(ModelError::MissingObject(id))?;
        walk(graph, handle, buckets.entry(container).or_default());
    }

    Ok(buckets
        .into_iter()
        .map(|(container, mut entries)| {
            entries.sort_by_key(|entry| entry.offset);
            tracing::debug!(container, values = entries.len(), "placed bucket");
            Placement { container, entries }
        })
        .collect())
}

/// Records `root` and every direct value under it, in pre-order.
fn walk<'g, G: ObjectGraph + ?Sized>(graph: &'g G, root: Handle<'g>, out: &mut Vec<PlacedObject>) {
    let mut stack = vec![root];
    while let Some(handle) = stack.pop() {
        out.push(PlacedObject {
            offset: handle.offset(),
            identity: handle.identity(),
            object_type: handle.object_type(),
        });
        match handle.object() {
            ObjectRef::Array(items) => stack.extend(
                items
                    .iter()
                    .rev()
                    .filter(|item| !item.is_indirect())
                    .map(|item| graph.resolve(item)),
            ),
            ObjectRef::Dictionary(dict) => stack.extend(
                dict.values()
                    .rev()
                    .filter(|value| !value.is_indirect())
                    .map(|value| graph.resolve(value)),
            ),
            ObjectRef::Stream(_) => stack.extend(handle.stream_dict()),
            _ => {}
        }
    }
}

/// Renders the placement report, one header per bucket.
pub fn format_placements(placements: &[Placement]) -> String {
    let mut out = String::new();
    for placement in placements.iter().filter(|p| !p.entries.is_empty()) {
        if placement.container == 0 {
            out.push_str("--- objects not in streams ---\n");
        } else {
            let _ = writeln!(out, "--- objects in stream {} ---", placement.container);
        }
        for entry in &placement.entries {
            let _ = write!(out, "offset = {} (0x{:x}), ", entry.offset, entry.offset);
            match entry.identity {
                Some(id) => {
                    let _ = write!(out, "indirect {}, ", id);
                }
                None => out.push_str("direct, "),
            }
            let _ = writeln!(out, "{}", entry.object_type);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn placed(offset: u64, identity: Option<ObjGen>, object_type: ObjectType) -> PlacedObject {
        PlacedObject {
            offset,
            identity,
            object_type,
        }
    }

    #[test]
    fn format_matches_report_layout() {
        let placements = vec![
            Placement {
                container: 0,
                entries: vec![
                    placed(17, Some(ObjGen::new(1, 0)), ObjectType::Dictionary),
                    placed(31, None, ObjectType::Name),
                ],
            },
            Placement {
                container: 5,
                entries: vec![placed(0, Some(ObjGen::new(2, 0)), ObjectType::Integer)],
            },
        ];
        assert_eq!(
            format_placements(&placements),
            "--- objects not in streams ---\n\
             offset = 17 (0x11), indirect 1/0, dictionary\n\
             offset = 31 (0x1f), direct, name\n\
             --- objects in stream 5 ---\n\
             offset = 0 (0x0), indirect 2/0, integer\n"
        );
    }

    #[test]
    fn empty_buckets_are_not_printed() {
        let placements = vec![Placement {
            container: 3,
            entries: Vec::new(),
        }];
        assert_eq!(format_placements(&placements), "");
    }
}
