//! Resolved, borrowed views of objects.
//!
//! A [`Handle`] is what traversal code works with: references have already
//! been resolved against a graph, and the handle remembers whether it was
//! reached through one.

use crate::object::{Dictionary, Name, Node, ObjGen, Object, ObjectType, Stream};

/// Borrowed view of an [`Object`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ObjectRef<'a> {
    /// `null`.
    Null,
    /// Boolean.
    Boolean(bool),
    /// Integer.
    Integer(i64),
    /// Real.
    Real(f64),
    /// String bytes.
    String(&'a [u8]),
    /// Name.
    Name(&'a Name),
    /// Array elements.
    Array(&'a [Node]),
    /// Dictionary.
    Dictionary(&'a Dictionary),
    /// Stream.
    Stream(&'a Stream),
}

impl<'a> From<&'a Object> for ObjectRef<'a> {
    fn from(object: &'a Object) -> Self {
        match object {
            Object::Null => ObjectRef::Null,
            Object::Boolean(b) => ObjectRef::Boolean(*b),
            Object::Integer(n) => ObjectRef::Integer(*n),
            Object::Real(r) => ObjectRef::Real(*r),
            Object::String(s) => ObjectRef::String(s),
            Object::Name(n) => ObjectRef::Name(n),
            Object::Array(items) => ObjectRef::Array(items),
            Object::Dictionary(dict) => ObjectRef::Dictionary(dict),
            Object::Stream(stream) => ObjectRef::Stream(stream),
        }
    }
}

impl ObjectRef<'_> {
    /// Discriminant of the viewed object.
    pub fn object_type(&self) -> ObjectType {
        match self {
            ObjectRef::Null => ObjectType::Null,
            ObjectRef::Boolean(_) => ObjectType::Boolean,
            ObjectRef::Integer(_) => ObjectType::Integer,
            ObjectRef::Real(_) => ObjectType::Real,
            ObjectRef::String(_) => ObjectType::String,
            ObjectRef::Name(_) => ObjectType::Name,
            ObjectRef::Array(_) => ObjectType::Array,
            ObjectRef::Dictionary(_) => ObjectType::Dictionary,
            ObjectRef::Stream(_) => ObjectType::Stream,
        }
    }
}

/// A resolved node: identity (for indirect objects), parsed offset and value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Handle<'a> {
    identity: Option<ObjGen>,
    offset: u64,
    object: ObjectRef<'a>,
}

impl<'a> Handle<'a> {
    /// Handle for an embedded object.
    pub fn direct(offset: u64, object: ObjectRef<'a>) -> Self {
        Self {
            identity: None,
            offset,
            object,
        }
    }

    /// Handle for an indirect object.
    pub fn indirect(id: ObjGen, offset: u64, object: ObjectRef<'a>) -> Self {
        Self {
            identity: Some(id),
            offset,
            object,
        }
    }

    /// True when this handle was reached through a reference.
    pub fn is_indirect(&self) -> bool {
        self.identity.is_some()
    }

    /// Identity of an indirect object.
    pub fn identity(&self) -> Option<ObjGen> {
        self.identity
    }

    /// Parsed byte offset of the value.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Borrowed value.
    pub fn object(&self) -> ObjectRef<'a> {
        self.object
    }

    /// Discriminant.
    pub fn object_type(&self) -> ObjectType {
        self.object.object_type()
    }

    /// Lowercase type name.
    pub fn type_name(&self) -> &'static str {
        self.object_type().type_name()
    }

    /// Boolean value, if this is a boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match self.object {
            ObjectRef::Boolean(b) => Some(b),
            _ => None,
        }
    }

    /// Integer value, if this is an integer.
    pub fn as_integer(&self) -> Option<i64> {
        match self.object {
            ObjectRef::Integer(n) => Some(n),
            _ => None,
        }
    }

    /// Real value, if this is a real.
    pub fn as_real(&self) -> Option<f64> {
        match self.object {
            ObjectRef::Real(r) => Some(r),
            _ => None,
        }
    }

    /// String bytes, if this is a string.
    pub fn as_string(&self) -> Option<&'a [u8]> {
        match self.object {
            ObjectRef::String(s) => Some(s),
            _ => None,
        }
    }

    /// Name, if this is a name.
    pub fn as_name(&self) -> Option<&'a Name> {
        match self.object {
            ObjectRef::Name(n) => Some(n),
            _ => None,
        }
    }

    /// Array elements (unresolved), if this is an array.
    pub fn array_items(&self) -> Option<&'a [Node]> {
        match self.object {
            ObjectRef::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Dictionary of a dictionary or of a stream.
    pub fn as_dict(&self) -> Option<&'a Dictionary> {
        match self.object {
            ObjectRef::Dictionary(dict) => Some(dict),
            ObjectRef::Stream(stream) => Some(&stream.dict),
            _ => None,
        }
    }

    /// Sorted keys of a dictionary; empty for anything else.
    pub fn dict_keys(&self) -> Vec<&'a Name> {
        match self.object {
            ObjectRef::Dictionary(dict) => dict.keys().collect(),
            _ => Vec::new(),
        }
    }

    /// Unresolved value under `key` of a dictionary.
    pub fn dict_get(&self, key: &Name) -> Option<&'a Node> {
        match self.object {
            ObjectRef::Dictionary(dict) => dict.get(key),
            _ => None,
        }
    }

    /// The stream dictionary as a direct handle at the stream's offset.
    pub fn stream_dict(&self) -> Option<Handle<'a>> {
        match self.object {
            ObjectRef::Stream(stream) => Some(Handle::direct(
                stream.dict_offset,
                ObjectRef::Dictionary(&stream.dict),
            )),
            _ => None,
        }
    }
}
