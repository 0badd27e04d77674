use crate::errors::ModelError;
use crate::handle::{Handle, ObjectRef};
use crate::header::DocumentHeader;
use crate::lexer::Token;
use crate::object::{dict_integer, Dictionary, Name, Node, ObjGen, Object, Stream};
use crate::parser::{parse_indirect_object, Parser};
use crate::traits::{CrossReferenceIndex, ObjectGraph};
use crate::xref::{describe_filter, find_startxref, read_xref_chain, XRefEntry, XRefTable};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;

/// How many `1 0 obj 2 0 R endobj` hops are followed before giving up.
const MAX_REFERENCE_CHAIN: usize = 32;

/// Read mode for handling damaged cross-reference data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReadMode {
    /// Strict mode: a broken cross-reference section or object is an error.
    #[default]
    Strict,
    /// Permissive mode: the index is rebuilt by scanning for object headers,
    /// and unreadable objects are skipped.
    Permissive,
}

/// A loaded document: header, merged cross-reference index and every
/// in-use object body.
///
/// # Example
///
/// ```rust,no_run
/// use objgraph_model::{Document, ObjectGraph, ReadMode};
///
/// let doc = Document::open("input.pdf", ReadMode::Strict)?;
/// for id in doc.object_ids() {
///     let handle = doc.object(id).unwrap();
///     println!("{} {}", id, handle.type_name());
/// }
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone)]
pub struct Document {
    header: DocumentHeader,
    xref: XRefTable,
    objects: BTreeMap<ObjGen, Node>,
}

impl Document {
    /// Reads and parses a file.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError`] if:
    /// - File cannot be read
    /// - Header is missing
    /// - Cross-reference data is broken (in strict mode)
    /// - An in-use object cannot be parsed (in strict mode)
    pub fn open<P: AsRef<Path>>(path: P, mode: ReadMode) -> Result<Self, ModelError> {
        let bytes = std::fs::read(path)?;
        Self::from_bytes(&bytes, mode)
    }

    /// Parses a document held in memory.
    pub fn from_bytes(bytes: &[u8], mode: ReadMode) -> Result<Self, ModelError> {
        let header = DocumentHeader::find(bytes)?;
        let indexed = find_startxref(bytes)
            .and_then(|start| read_xref_chain(bytes, start, header.offset))
            .and_then(|table| {
                if table.trailer().is_empty() {
                    Err(ModelError::InvalidXref {
                        offset: 0,
                        reason: "empty trailer".to_string(),
                    })
                } else {
                    Ok(table)
                }
            });

        let xref = match (indexed, mode) {
            (Ok(table), _) => table,
            (Err(e), ReadMode::Strict) => return Err(e),
            (Err(e), ReadMode::Permissive) => {
                tracing::warn!(error = %e, "xref unusable, reconstructing from object headers");
                reconstruct_xref(bytes)?
            }
        };

        let objects = load_objects(bytes, &xref, mode)?;
        tracing::info!(
            version = %header.version(),
            objects = objects.len(),
            "loaded document"
        );
        Ok(Self {
            header,
            xref,
            objects,
        })
    }

    /// Builds a document from in-memory objects. Every object is recorded
    /// as stored directly at offset 0.
    pub fn from_objects<I>(objects: I, trailer: Dictionary) -> Self
    where
        I: IntoIterator<Item = (ObjGen, Object)>,
    {
        let mut xref = XRefTable::new();
        let objects: BTreeMap<ObjGen, Node> = objects
            .into_iter()
            .map(|(id, object)| {
                xref.insert(id, XRefEntry::Uncompressed { offset: 0 });
                (id, Node::direct(object))
            })
            .collect();
        xref.set_trailer(trailer);
        Self {
            header: DocumentHeader::default(),
            xref,
            objects,
        }
    }

    /// Parsed header.
    pub fn header(&self) -> &DocumentHeader {
        &self.header
    }

    /// Trailer dictionary.
    pub fn trailer(&self) -> &Dictionary {
        self.xref.trailer()
    }

    /// Merged cross-reference index.
    pub fn xref(&self) -> &XRefTable {
        &self.xref
    }

    /// Raw body of an object.
    pub fn get(&self, id: ObjGen) -> Option<&Node> {
        self.objects.get(&id)
    }

    /// Object bodies in ascending identity order.
    pub fn objects(&self) -> impl Iterator<Item = (ObjGen, &Node)> {
        self.objects.iter().map(|(id, node)| (*id, node))
    }

    /// Number of loaded objects.
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// True when no objects were loaded.
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// True when the trailer names an encryption dictionary.
    pub fn is_encrypted(&self) -> bool {
        self.trailer().contains_key(&Name::from("Encrypt"))
    }

    /// True for object streams and cross-reference streams: file structure
    /// rather than document content.
    pub fn is_structural(&self, id: ObjGen) -> bool {
        match self.objects.get(&id).and_then(Node::as_direct) {
            Some(Object::Stream(stream)) => matches!(
                stream.type_name().map(Name::as_bytes),
                Some(b"ObjStm" | b"XRef")
            ),
            _ => false,
        }
    }

    fn resolve_body<'a>(&'a self, id: ObjGen, body: &'a Node) -> Handle<'a> {
        let mut node = body;
        for _ in 0..MAX_REFERENCE_CHAIN {
            match node {
                Node::Direct { offset, object } => {
                    return Handle::indirect(id, *offset, ObjectRef::from(object))
                }
                Node::Indirect { id: target, .. } => match self.objects.get(target) {
                    Some(next) => node = next,
                    None => break,
                },
            }
        }
        Handle::indirect(id, body.offset(), ObjectRef::Null)
    }
}

impl ObjectGraph for Document {
    fn object(&self, id: ObjGen) -> Option<Handle<'_>> {
        self.objects.get(&id).map(|body| self.resolve_body(id, body))
    }

    fn resolve<'a>(&'a self, node: &'a Node) -> Handle<'a> {
        match node {
            Node::Direct { offset, object } => Handle::direct(*offset, ObjectRef::from(object)),
            Node::Indirect { offset, id } => self
                .object(*id)
                .unwrap_or_else(|| Handle::indirect(*id, *offset, ObjectRef::Null)),
        }
    }

    /// Loaded objects plus identities whose index entry has an unknown
    /// type. Those have no body, so consumers that check the index can
    /// report them instead of silently skipping them.
    fn object_ids(&self) -> Vec<ObjGen> {
        let unknown = self
            .xref
            .iter()
            .filter(|(_, entry)| matches!(entry, XRefEntry::Unknown(_)))
            .map(|(id, _)| id);
        let ids: BTreeSet<ObjGen> = self.objects.keys().copied().chain(unknown).collect();
        ids.into_iter().collect()
    }
}

impl CrossReferenceIndex for Document {
    fn xref_entry(&self, id: ObjGen) -> Option<XRefEntry> {
        self.xref.entry(id)
    }
}

fn load_objects(
    bytes: &[u8],
    xref: &XRefTable,
    mode: ReadMode,
) -> Result<BTreeMap<ObjGen, Node>, ModelError> {
    let resolve_length = |id: ObjGen| -> Option<i64> {
        let Some(XRefEntry::Uncompressed { offset }) = xref.entry(id) else {
            return None;
        };
        let object = parse_indirect_object(bytes, usize::try_from(offset).ok()?, &|_| None).ok()?;
        match object.node.as_direct() {
            Some(Object::Integer(n)) => Some(*n),
            _ => None,
        }
    };

    let mut objects = BTreeMap::new();
    let mut containers: HashMap<u32, Vec<(u32, Node)>> = HashMap::new();

    for (id, entry) in xref.iter() {
        let loaded = match entry {
            XRefEntry::Free => continue,
            XRefEntry::Unknown(kind) => {
                tracing::warn!(object = %id, kind, "unknown xref entry type");
                continue;
            }
            XRefEntry::Uncompressed { offset } => {
                load_uncompressed(bytes, id, offset, &resolve_length)
            }
            XRefEntry::Compressed { stream, index } => {
                if !containers.contains_key(&stream) {
                    let members = match (load_container(bytes, xref, stream, &resolve_length), mode) {
                        (Ok(members), _) => members,
                        (Err(e), ReadMode::Strict) => return Err(e),
                        (Err(e), ReadMode::Permissive) => {
                            tracing::warn!(stream, error = %e, "skipping unreadable object stream");
                            Vec::new()
                        }
                    };
                    containers.insert(stream, members);
                }
                containers
                    .get(&stream)
                    .and_then(|members| members.get(index as usize))
                    .filter(|(number, _)| *number == id.id)
                    .map(|(_, node)| node.clone())
                    .ok_or(ModelError::MissingObject(id))
            }
        };

        match (loaded, mode) {
            (Ok(node), _) => {
                objects.insert(id, node);
            }
            (Err(e), ReadMode::Strict) => return Err(e),
            (Err(e), ReadMode::Permissive) => {
                tracing::warn!(object = %id, error = %e, "skipping unreadable object");
            }
        }
    }

    Ok(objects)
}

fn load_uncompressed(
    bytes: &[u8],
    id: ObjGen,
    offset: u64,
    resolve_length: &dyn Fn(ObjGen) -> Option<i64>,
) -> Result<Node, ModelError> {
    let pos = usize::try_from(offset).map_err(|_| ModelError::MissingObject(id))?;
    if pos >= bytes.len() {
        return Err(ModelError::MissingObject(id));
    }
    let object = parse_indirect_object(bytes, pos, resolve_length)?;
    if object.id != id {
        return Err(ModelError::Syntax {
            offset,
            reason: format!("expected object {}, found {}", id, object.id),
        });
    }
    Ok(object.node)
}

fn load_container(
    bytes: &[u8],
    xref: &XRefTable,
    number: u32,
    resolve_length: &dyn Fn(ObjGen) -> Option<i64>,
) -> Result<Vec<(u32, Node)>, ModelError> {
    let id = ObjGen::new(number, 0);
    let Some(XRefEntry::Uncompressed { offset }) = xref.entry(id) else {
        return Err(ModelError::InvalidXref {
            offset: 0,
            reason: format!("object stream {} is not stored directly in the file", id),
        });
    };
    let node = load_uncompressed(bytes, id, offset, resolve_length)?;
    let Some(Object::Stream(stream)) = node.as_direct() else {
        return Err(ModelError::InvalidXref {
            offset,
            reason: format!("object stream {} is not a stream", id),
        });
    };
    object_stream_members(id, stream)
}

/// Parses the members of an object stream. Member offsets are relative to
/// the start of the stream data.
pub(crate) fn object_stream_members(
    id: ObjGen,
    stream: &Stream,
) -> Result<Vec<(u32, Node)>, ModelError> {
    let invalid = |reason: String| ModelError::InvalidXref { offset: 0, reason };
    if stream.type_name() != Some(&Name::from("ObjStm")) {
        return Err(invalid(format!("object {} is not /Type /ObjStm", id)));
    }
    if let Some(filter) = stream.dict.get(&Name::from("Filter")) {
        return Err(ModelError::UnsupportedFilter {
            id,
            filter: describe_filter(filter),
        });
    }
    let count = dict_integer(&stream.dict, "N")
        .and_then(|n| usize::try_from(n).ok())
        .ok_or_else(|| invalid(format!("object stream {} has no /N", id)))?;
    let first = dict_integer(&stream.dict, "First")
        .and_then(|n| usize::try_from(n).ok())
        .filter(|n| *n <= stream.data.len())
        .ok_or_else(|| invalid(format!("object stream {} has no valid /First", id)))?;

    let data = &stream.data;
    let mut parser = Parser::new(&data[..first], 0);
    let mut layout = Vec::with_capacity(count);
    for _ in 0..count {
        let number = parser.lexer().next_token()?;
        let relative = parser.lexer().next_token()?;
        match (number, relative) {
            (Some((_, Token::Integer(number))), Some((_, Token::Integer(relative)))) => {
                let number = u32::try_from(number)
                    .map_err(|_| invalid(format!("bad object number in stream {}", id)))?;
                let relative = usize::try_from(relative)
                    .map_err(|_| invalid(format!("bad offset in stream {}", id)))?;
                layout.push((number, first + relative));
            }
            _ => return Err(invalid(format!("truncated header in object stream {}", id))),
        }
    }

    layout
        .into_iter()
        .map(|(number, pos)| {
            if pos >= data.len() {
                return Err(invalid(format!("member {} lies outside stream {}", number, id)));
            }
            Ok((number, Parser::new(data, pos).parse_node()?))
        })
        .collect()
}

/// Rebuilds the index by scanning every line for `N G obj`.
fn reconstruct_xref(bytes: &[u8]) -> Result<XRefTable, ModelError> {
    let mut table = XRefTable::new();
    let mut trailer: Option<Dictionary> = None;

    let mut line_start = 0;
    while line_start < bytes.len() {
        let mut pos = line_start;
        while pos < bytes.len() && matches!(bytes[pos], b' ' | b'\t') {
            pos += 1;
        }
        if bytes.get(pos).is_some_and(u8::is_ascii_digit) {
            if let Ok((offset, id)) = Parser::new(bytes, pos).parse_object_header() {
                table.insert(id, XRefEntry::Uncompressed { offset });
            }
        } else if bytes[pos..].starts_with(b"trailer") {
            let mut parser = Parser::new(bytes, pos + b"trailer".len());
            if let Ok((_, dict)) = parser.parse_dictionary() {
                trailer = Some(dict);
            }
        }
        line_start = match bytes[pos..].iter().position(|b| *b == b'\n' || *b == b'\r') {
            Some(eol) => pos + eol + 1,
            None => bytes.len(),
        };
    }

    let mut catalog = None;
    let direct: Vec<(ObjGen, u64)> = table
        .iter()
        .filter_map(|(id, entry)| match entry {
            XRefEntry::Uncompressed { offset } => Some((id, offset)),
            _ => None,
        })
        .collect();
    for (id, offset) in direct {
        let Ok(object) = parse_indirect_object(bytes, offset as usize, &|_| None) else {
            continue;
        };
        match object.node.as_direct() {
            Some(Object::Stream(stream)) => match stream.type_name().map(Name::as_bytes) {
                Some(b"ObjStm") => {
                    if let Ok(members) = object_stream_members(id, stream) {
                        for (index, (number, _)) in members.iter().enumerate() {
                            table.insert_if_absent(
                                ObjGen::new(*number, 0),
                                XRefEntry::Compressed {
                                    stream: id.id,
                                    index: index as u32,
                                },
                            );
                        }
                    }
                }
                Some(b"XRef") if trailer.is_none() => trailer = Some(stream.dict.clone()),
                _ => {}
            },
            Some(Object::Dictionary(dict))
                if matches!(
                    dict.get(&Name::from("Type")).and_then(Node::as_direct),
                    Some(Object::Name(n)) if n.as_bytes() == b"Catalog"
                ) =>
            {
                catalog = Some(id);
            }
            _ => {}
        }
    }

    let trailer = match (trailer, catalog) {
        (Some(trailer), _) => trailer,
        (None, Some(root)) => {
            let mut dict = Dictionary::new();
            dict.insert(
                Name::from("Root"),
                Node::reference(root.id, root.generation),
            );
            dict
        }
        (None, None) => {
            return Err(ModelError::InvalidXref {
                offset: 0,
                reason: "no trailer or catalog found while reconstructing".to_string(),
            })
        }
    };
    table.set_trailer(trailer);
    tracing::info!(entries = table.len(), "reconstructed xref");
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn simple_pdf() -> Vec<u8> {
        let mut out = b"%PDF-1.4\n".to_vec();
        let mut offsets = Vec::new();
        for body in [
            "1 0 obj\n<< /Type /Catalog /Pages 2 0 R >>\nendobj\n",
            "2 0 obj\n<< /Type /Pages /Kids [] /Count 0 >>\nendobj\n",
        ] {
            offsets.push(out.len());
            out.extend_from_slice(body.as_bytes());
        }
        let xref_at = out.len();
        out.extend_from_slice(b"xref\n0 3\n0000000000 65535 f \n");
        for offset in offsets {
            out.extend_from_slice(format!("{:010} 00000 n \n", offset).as_bytes());
        }
        out.extend_from_slice(
            format!(
                "trailer\n<< /Size 3 /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
                xref_at
            )
            .as_bytes(),
        );
        out
    }

    #[test]
    fn loads_objects_through_xref() {
        let doc = Document::from_bytes(&simple_pdf(), ReadMode::Strict).unwrap();
        assert_eq!(doc.object_ids(), vec![ObjGen::new(1, 0), ObjGen::new(2, 0)]);
        let catalog = doc.object(ObjGen::new(1, 0)).unwrap();
        assert_eq!(catalog.type_name(), "dictionary");
        assert_eq!(catalog.offset(), 17);
        assert!(catalog.is_indirect());
    }

    #[test]
    fn strict_mode_rejects_bad_startxref() {
        let mut bytes = simple_pdf();
        let pos = bytes.windows(9).rposition(|w| w == b"startxref").unwrap();
        bytes.truncate(pos);
        bytes.extend_from_slice(b"startxref\n9\n%%EOF\n");
        assert!(Document::from_bytes(&bytes, ReadMode::Strict).is_err());
        let doc = Document::from_bytes(&bytes, ReadMode::Permissive).unwrap();
        assert_eq!(doc.len(), 2);
    }

    #[test]
    fn missing_reference_resolves_to_null_with_identity() {
        let doc = Document::from_objects(Vec::new(), Dictionary::new());
        let node = Node::reference(9, 0);
        let handle = doc.resolve(&node);
        assert_eq!(handle.identity(), Some(ObjGen::new(9, 0)));
        assert_eq!(handle.type_name(), "null");
    }

    #[test]
    fn reference_chains_are_followed() {
        let doc = Document::from_objects(
            vec![(ObjGen::new(2, 0), Object::Integer(5))],
            Dictionary::new(),
        );
        let mut objects = doc.objects.clone();
        objects.insert(ObjGen::new(1, 0), Node::reference(2, 0));
        let doc = Document { objects, ..doc };
        let handle = doc.object(ObjGen::new(1, 0)).unwrap();
        assert_eq!(handle.as_integer(), Some(5));
        assert_eq!(handle.identity(), Some(ObjGen::new(1, 0)));
    }
}
