use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Identity of an indirect object: object number plus generation.
///
/// Two identities are equal only when both components match; a reused
/// object number with a new generation is a different object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ObjGen {
    /// Object number.
    pub id: u32,
    /// Generation number.
    pub generation: u16,
}

impl ObjGen {
    /// The `0/0` identity. Renumbering maps dropped objects to it.
    pub const NONE: ObjGen = ObjGen {
        id: 0,
        generation: 0,
    };

    /// Creates an identity.
    pub const fn new(id: u32, generation: u16) -> Self {
        Self { id, generation }
    }

    /// Returns true for the `0/0` sentinel.
    pub fn is_none(&self) -> bool {
        self.id == 0
    }
}

impl fmt::Display for ObjGen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.id, self.generation)
    }
}

/// Decoded name bytes, without the leading `/`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Name(Vec<u8>);

impl Name {
    /// Creates a name from decoded bytes.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// Decoded bytes of the name.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl From<&str> for Name {
    fn from(value: &str) -> Self {
        Self(value.as_bytes().to_vec())
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("/")?;
        for &b in &self.0 {
            if needs_name_escape(b) {
                write!(f, "#{:02x}", b)?;
            } else {
                write!(f, "{}", b as char)?;
            }
        }
        Ok(())
    }
}

pub(crate) fn needs_name_escape(b: u8) -> bool {
    !(b'!'..=b'~').contains(&b) || b == b'#' || crate::lexer::is_delimiter(b)
}

/// Dictionary entries in sorted key order.
pub type Dictionary = BTreeMap<Name, Node>;

/// Stream object: a dictionary plus raw, undecoded payload bytes.
#[derive(Debug, Clone, PartialEq)]
pub struct Stream {
    /// Stream dictionary.
    pub dict: Dictionary,
    /// Parsed offset of the stream dictionary.
    pub dict_offset: u64,
    /// Payload exactly as stored (filters are not applied).
    pub data: Vec<u8>,
}

impl Stream {
    /// Returns the direct name value of `/Type`, if any.
    pub fn type_name(&self) -> Option<&Name> {
        match self.dict.get(&Name::from("Type")) {
            Some(Node::Direct {
                object: Object::Name(name),
                ..
            }) => Some(name),
            _ => None,
        }
    }

    /// True when `/Filter` is present.
    pub fn is_filtered(&self) -> bool {
        self.dict.contains_key(&Name::from("Filter"))
    }
}

/// An object value. One variant per discriminant; references are
/// expressed one level up, by [`Node::Indirect`].
#[derive(Debug, Clone, PartialEq)]
pub enum Object {
    /// `null`.
    Null,
    /// `true` or `false`.
    Boolean(bool),
    /// Integer number.
    Integer(i64),
    /// Real number, kept exactly as parsed.
    Real(f64),
    /// String bytes (literal and hex strings decode to the same thing).
    String(Vec<u8>),
    /// Name.
    Name(Name),
    /// Array of nodes.
    Array(Vec<Node>),
    /// Dictionary.
    Dictionary(Dictionary),
    /// Stream.
    Stream(Stream),
}

impl Object {
    /// Discriminant of this object.
    pub fn object_type(&self) -> ObjectType {
        match self {
            Object::Null => ObjectType::Null,
            Object::Boolean(_) => ObjectType::Boolean,
            Object::Integer(_) => ObjectType::Integer,
            Object::Real(_) => ObjectType::Real,
            Object::String(_) => ObjectType::String,
            Object::Name(_) => ObjectType::Name,
            Object::Array(_) => ObjectType::Array,
            Object::Dictionary(_) => ObjectType::Dictionary,
            Object::Stream(_) => ObjectType::Stream,
        }
    }
}

/// A value slot: either an embedded object or a reference to an indirect one.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Object embedded in place.
    Direct {
        /// Parsed offset of the object's first byte.
        offset: u64,
        /// The object.
        object: Object,
    },
    /// `id gen R` reference.
    Indirect {
        /// Parsed offset of the reference token.
        offset: u64,
        /// Referenced identity.
        id: ObjGen,
    },
}

impl Node {
    /// Direct node at offset 0, for building graphs in memory.
    pub fn direct(object: Object) -> Self {
        Node::Direct { offset: 0, object }
    }

    /// Reference node at offset 0, for building graphs in memory.
    pub fn reference(id: u32, generation: u16) -> Self {
        Node::Indirect {
            offset: 0,
            id: ObjGen::new(id, generation),
        }
    }

    /// Parsed offset of this node.
    pub fn offset(&self) -> u64 {
        match self {
            Node::Direct { offset, .. } | Node::Indirect { offset, .. } => *offset,
        }
    }

    /// True for `id gen R` references.
    pub fn is_indirect(&self) -> bool {
        matches!(self, Node::Indirect { .. })
    }

    /// The embedded object, if direct.
    pub fn as_direct(&self) -> Option<&Object> {
        match self {
            Node::Direct { object, .. } => Some(object),
            Node::Indirect { .. } => None,
        }
    }
}

/// Field-less object discriminant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectType {
    /// `null`.
    Null,
    /// Boolean.
    Boolean,
    /// Integer.
    Integer,
    /// Real.
    Real,
    /// String.
    String,
    /// Name.
    Name,
    /// Array.
    Array,
    /// Dictionary.
    Dictionary,
    /// Stream.
    Stream,
}

impl ObjectType {
    /// Lowercase type name used in reports.
    pub fn type_name(self) -> &'static str {
        match self {
            ObjectType::Null => "null",
            ObjectType::Boolean => "boolean",
            ObjectType::Integer => "integer",
            ObjectType::Real => "real",
            ObjectType::String => "string",
            ObjectType::Name => "name",
            ObjectType::Array => "array",
            ObjectType::Dictionary => "dictionary",
            ObjectType::Stream => "stream",
        }
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name())
    }
}

/// Shorthand for a direct name node, used by builders and the writer.
pub fn name_node(name: &str) -> Node {
    Node::direct(Object::Name(Name::from(name)))
}

/// Looks up a key whose value is a direct integer.
pub fn dict_integer(dict: &Dictionary, key: &str) -> Option<i64> {
    match dict.get(&Name::from(key))? {
        Node::Direct {
            object: Object::Integer(n),
            ..
        } => Some(*n),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn objgen_display_and_order() {
        let a = ObjGen::new(3, 0);
        let b = ObjGen::new(3, 1);
        assert_eq!(a.to_string(), "3/0");
        assert!(a < b);
        assert_ne!(a, b);
        assert!(ObjGen::NONE.is_none());
    }

    #[test]
    fn name_display_escapes_delimiters() {
        let name = Name::new(b"A B/C#".to_vec());
        assert_eq!(name.to_string(), "/A#20B#2fC#23");
    }

    #[test]
    fn type_names() {
        assert_eq!(Object::Real(1.5).object_type().type_name(), "real");
        assert_eq!(
            Object::Dictionary(Dictionary::new()).object_type().to_string(),
            "dictionary"
        );
    }
}
