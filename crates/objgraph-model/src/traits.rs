//! Interfaces the verification engines consume.
//!
//! [`Document`](crate::Document) and [`Renumbering`](crate::Renumbering)
//! are the reference implementations; tests may supply their own.

use crate::handle::Handle;
use crate::object::{Node, ObjGen};
use crate::xref::XRefEntry;

/// A navigable object graph.
pub trait ObjectGraph {
    /// Resolves an indirect object by identity.
    fn object(&self, id: ObjGen) -> Option<Handle<'_>>;

    /// Resolves a node. References to missing objects resolve to `null`
    /// while keeping their identity.
    fn resolve<'a>(&'a self, node: &'a Node) -> Handle<'a>;

    /// Identities of every object in the graph, ascending.
    fn object_ids(&self) -> Vec<ObjGen>;
}

/// Cross-reference lookup.
pub trait CrossReferenceIndex {
    /// Placement recorded for `id`, if any.
    fn xref_entry(&self, id: ObjGen) -> Option<XRefEntry>;
}

/// Mapping produced by a rewrite pass.
pub trait RenumberingMap {
    /// New identity of `id`, or [`ObjGen::NONE`] if it was not written.
    fn renumbered(&self, id: ObjGen) -> ObjGen;
}

impl<T: ObjectGraph + ?Sized> ObjectGraph for &T {
    fn object(&self, id: ObjGen) -> Option<Handle<'_>> {
        (**self).object(id)
    }

    fn resolve<'a>(&'a self, node: &'a Node) -> Handle<'a> {
        (**self).resolve(node)
    }

    fn object_ids(&self) -> Vec<ObjGen> {
        (**self).object_ids()
    }
}
