//! Document writer with renumbering.
//!
//! Objects are renumbered breadth-first from the trailer, so the output
//! never contains unreachable objects unless asked to keep them. The
//! resulting [`Renumbering`] is what verification tools compare against.

use crate::document::Document;
use crate::errors::ModelError;
use crate::header::DocumentHeader;
use crate::object::{dict_integer, name_node, Dictionary, Name, Node, ObjGen, Object, Stream};
use crate::serialize::{write_dictionary, write_node, write_object};
use crate::traits::{CrossReferenceIndex, ObjectGraph, RenumberingMap};
use crate::xref::XRefEntry;
use std::collections::{BTreeMap, BTreeSet, VecDeque};

/// Maximum number of members per generated object stream.
pub const OBJECT_STREAM_CAPACITY: usize = 100;

/// Trailer keys that describe the old file layout and are not followed or
/// copied.
const LAYOUT_KEYS: &[&str] = &[
    "Size",
    "Prev",
    "XRefStm",
    "Index",
    "W",
    "Type",
    "Length",
    "Filter",
    "DecodeParms",
    "DL",
    "Encrypt",
];

/// Trailer keys visited before the rest, in this order.
const LEADING_TRAILER_KEYS: &[&str] = &["Root", "Info", "ID"];

/// Field widths of generated cross-reference streams.
const XREF_STREAM_WIDTHS: [usize; 3] = [1, 4, 2];

/// What to do with object streams when writing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ObjectStreamMode {
    /// Keep objects grouped the way the input grouped them.
    #[default]
    Preserve,
    /// Write every object directly, with a classic cross-reference table.
    Disable,
    /// Group every non-stream object into new object streams.
    Generate,
}

/// Options for writing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WriteOptions {
    /// Object stream handling.
    pub object_streams: ObjectStreamMode,
    /// Put first-page objects first and emit a linearization parameter
    /// dictionary. Hint streams are not produced.
    pub linearize: bool,
    /// Also write objects that are not reachable from the trailer.
    pub preserve_unreferenced: bool,
}

/// Mapping from original identities to the identities they were written
/// under.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Renumbering {
    map: BTreeMap<ObjGen, ObjGen>,
}

impl Renumbering {
    /// Creates an empty mapping.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that `original` was written as `renumbered`.
    pub fn insert(&mut self, original: ObjGen, renumbered: ObjGen) {
        self.map.insert(original, renumbered);
    }

    /// Pairs in ascending original identity order.
    pub fn iter(&self) -> impl Iterator<Item = (ObjGen, ObjGen)> + '_ {
        self.map.iter().map(|(a, b)| (*a, *b))
    }

    /// Number of recorded identities, dropped ones included.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// True when nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

impl RenumberingMap for Renumbering {
    fn renumbered(&self, id: ObjGen) -> ObjGen {
        self.map.get(&id).copied().unwrap_or(ObjGen::NONE)
    }
}

impl FromIterator<(ObjGen, ObjGen)> for Renumbering {
    fn from_iter<I: IntoIterator<Item = (ObjGen, ObjGen)>>(iter: I) -> Self {
        Self {
            map: iter.into_iter().collect(),
        }
    }
}

/// Result of a write: the file bytes and how objects were renumbered.
#[derive(Debug, Clone)]
pub struct WriteOutput {
    /// Serialized document.
    pub bytes: Vec<u8>,
    /// Original identity to written identity.
    pub renumbering: Renumbering,
}

/// Serializes a [`Document`].
///
/// # Example
///
/// ```rust,no_run
/// use objgraph_model::{Document, DocumentWriter, ReadMode, WriteOptions};
///
/// let doc = Document::open("input.pdf", ReadMode::Strict)?;
/// let output = DocumentWriter::new(WriteOptions::default()).write(&doc)?;
/// std::fs::write("output.pdf", &output.bytes)?;
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct DocumentWriter {
    options: WriteOptions,
}

/// One object ready to be placed in the output.
struct Body {
    original: ObjGen,
    number: u32,
    text: Vec<u8>,
    is_stream: bool,
}

impl DocumentWriter {
    /// Creates a writer.
    pub fn new(options: WriteOptions) -> Self {
        Self { options }
    }

    /// Options this writer was created with.
    pub fn options(&self) -> &WriteOptions {
        &self.options
    }

    /// Writes `doc` to a byte buffer.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::Write`] if the document is encrypted, has no
    /// `/Root`, or cannot be linearized because it has no pages.
    pub fn write(&self, doc: &Document) -> Result<WriteOutput, ModelError> {
        if doc.is_encrypted() {
            return Err(ModelError::Write(
                "encrypted documents are not supported".to_string(),
            ));
        }
        let trailer = doc.trailer();
        if !trailer.contains_key(&Name::from("Root")) {
            return Err(ModelError::Write("trailer has no /Root".to_string()));
        }

        let mut seen = BTreeSet::new();
        let mut order = Vec::new();

        let page_id = if self.options.linearize {
            let (id, page_node) = first_page(doc).ok_or_else(|| {
                ModelError::Write("cannot linearize a document without pages".to_string())
            })?;
            reach(doc, &[page_node], &[], true, &mut seen, &mut order);
            Some(id)
        } else {
            None
        };

        // first-page objects are walked again so their /Parent edges count
        let first_pass = order.clone();
        reach(doc, &trailer_roots(trailer), &first_pass, false, &mut seen, &mut order);

        if self.options.preserve_unreferenced {
            for id in doc.objects().map(|(id, _)| id) {
                if !doc.is_structural(id) && seen.insert(id) {
                    order.push(id);
                }
            }
        }

        let numbers: BTreeMap<ObjGen, ObjGen> = order
            .iter()
            .enumerate()
            .map(|(i, id)| (*id, ObjGen::new(i as u32 + 1, 0)))
            .collect();
        let renumbering: Renumbering = doc
            .object_ids()
            .into_iter()
            .map(|id| (id, numbers.get(&id).copied().unwrap_or(ObjGen::NONE)))
            .collect();
        let renumber = |id: ObjGen| numbers.get(&id).copied();

        let mut bodies = Vec::with_capacity(order.len());
        for (i, id) in order.iter().enumerate() {
            let Some(node) = doc.get(*id) else {
                continue;
            };
            let mut text = Vec::new();
            write_node(&mut text, node, &renumber);
            bodies.push(Body {
                original: *id,
                number: i as u32 + 1,
                text,
                is_stream: matches!(node.as_direct(), Some(Object::Stream(_))),
            });
        }

        let groups = self.group(doc, &bodies);
        let mut next_number = order.len() as u32 + 1;

        let linearization = match page_id {
            Some(page) => {
                let number = next_number;
                next_number += 1;
                Some(LinearizationParams {
                    number,
                    pages: page_count(doc),
                    first_page: renumber(page).map_or(0, |id| id.id),
                })
            }
            None => None,
        };

        let mut output_trailer: Dictionary = trailer
            .iter()
            .filter(|(key, _)| !is_layout_key(key))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        let bytes = if groups.is_empty() {
            write_classic(
                doc.header(),
                &bodies,
                linearization,
                &mut output_trailer,
                &renumber,
            )
        } else {
            write_with_object_streams(
                doc.header(),
                &bodies,
                &groups,
                linearization,
                next_number,
                &mut output_trailer,
                &renumber,
            )?
        };

        tracing::info!(
            written = bodies.len(),
            dropped = renumbering.iter().filter(|(_, new)| new.is_none()).count(),
            object_streams = groups.len(),
            bytes = bytes.len(),
            "wrote document"
        );

        Ok(WriteOutput { bytes, renumbering })
    }

    /// Indices into `bodies` per output object stream.
    fn group(&self, doc: &Document, bodies: &[Body]) -> Vec<Vec<usize>> {
        match self.options.object_streams {
            ObjectStreamMode::Disable => Vec::new(),
            ObjectStreamMode::Preserve => {
                let mut by_container: BTreeMap<u32, Vec<usize>> = BTreeMap::new();
                for (i, body) in bodies.iter().enumerate() {
                    if body.is_stream {
                        continue;
                    }
                    if let Some(XRefEntry::Compressed { stream, .. }) =
                        doc.xref_entry(body.original)
                    {
                        by_container.entry(stream).or_default().push(i);
                    }
                }
                by_container.into_values().collect()
            }
            ObjectStreamMode::Generate => {
                let members: Vec<usize> = bodies
                    .iter()
                    .enumerate()
                    .filter(|(_, body)| !body.is_stream)
                    .map(|(i, _)| i)
                    .collect();
                members
                    .chunks(OBJECT_STREAM_CAPACITY)
                    .map(<[usize]>::to_vec)
                    .collect()
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct LinearizationParams {
    number: u32,
    pages: i64,
    first_page: u32,
}

/// Position of the ten-digit `/L` placeholder inside the output.
struct LengthPlaceholder(usize);

impl LengthPlaceholder {
    fn patch(self, out: &mut [u8]) {
        let total = format!("{:010}", out.len());
        if let Some(slot) = out.get_mut(self.0..self.0 + 10) {
            slot.copy_from_slice(total.as_bytes());
        }
    }
}

fn write_linearization(out: &mut Vec<u8>, params: LinearizationParams) -> LengthPlaceholder {
    out.extend_from_slice(format!("{} 0 obj\n<< /Linearized 1 /L ", params.number).as_bytes());
    let placeholder = LengthPlaceholder(out.len());
    out.extend_from_slice(
        format!(
            "{:010} /N {} /O {} >>\nendobj\n",
            0, params.pages, params.first_page
        )
        .as_bytes(),
    );
    placeholder
}

fn write_indirect(out: &mut Vec<u8>, number: u32, text: &[u8]) {
    out.extend_from_slice(format!("{} 0 obj\n", number).as_bytes());
    out.extend_from_slice(text);
    out.extend_from_slice(b"\nendobj\n");
}

fn write_classic(
    header: &DocumentHeader,
    bodies: &[Body],
    linearization: Option<LinearizationParams>,
    trailer: &mut Dictionary,
    renumber: &dyn Fn(ObjGen) -> Option<ObjGen>,
) -> Vec<u8> {
    let mut out = DocumentHeader::new(header.major, header.minor).to_bytes();
    let mut offsets: BTreeMap<u32, usize> = BTreeMap::new();

    let placeholder = linearization.map(|params| {
        offsets.insert(params.number, out.len());
        write_linearization(&mut out, params)
    });
    for body in bodies {
        offsets.insert(body.number, out.len());
        write_indirect(&mut out, body.number, &body.text);
    }

    let size = offsets.keys().next_back().map_or(1, |n| n + 1);
    let xref_at = out.len();
    out.extend_from_slice(format!("xref\n0 {}\n0000000000 65535 f \n", size).as_bytes());
    for number in 1..size {
        match offsets.get(&number) {
            Some(offset) => out.extend_from_slice(format!("{:010} 00000 n \n", offset).as_bytes()),
            None => out.extend_from_slice(b"0000000000 00000 f \n"),
        }
    }

    trailer.insert(
        Name::from("Size"),
        Node::direct(Object::Integer(i64::from(size))),
    );
    out.extend_from_slice(b"trailer\n");
    write_dictionary(&mut out, trailer, renumber);
    out.extend_from_slice(format!("\nstartxref\n{}\n%%EOF\n", xref_at).as_bytes());

    if let Some(placeholder) = placeholder {
        placeholder.patch(&mut out);
    }
    out
}

fn write_with_object_streams(
    header: &DocumentHeader,
    bodies: &[Body],
    groups: &[Vec<usize>],
    linearization: Option<LinearizationParams>,
    first_container: u32,
    trailer: &mut Dictionary,
    renumber: &dyn Fn(ObjGen) -> Option<ObjGen>,
) -> Result<Vec<u8>, ModelError> {
    let header = DocumentHeader::new(header.major, header.minor).at_least(1, 5);
    let mut out = header.to_bytes();
    let mut locations: BTreeMap<u32, XRefEntry> = BTreeMap::new();

    let container_numbers: Vec<u32> = (0..groups.len() as u32)
        .map(|i| first_container + i)
        .collect();
    let mut grouped = BTreeSet::new();
    for (members, container) in groups.iter().zip(&container_numbers) {
        for (index, member) in members.iter().enumerate() {
            grouped.insert(*member);
            locations.insert(
                bodies[*member].number,
                XRefEntry::Compressed {
                    stream: *container,
                    index: index as u32,
                },
            );
        }
    }

    let placeholder = linearization.map(|params| {
        locations.insert(
            params.number,
            XRefEntry::Uncompressed {
                offset: out.len() as u64,
            },
        );
        write_linearization(&mut out, params)
    });

    for (i, body) in bodies.iter().enumerate() {
        if grouped.contains(&i) {
            continue;
        }
        locations.insert(
            body.number,
            XRefEntry::Uncompressed {
                offset: out.len() as u64,
            },
        );
        write_indirect(&mut out, body.number, &body.text);
    }

    for (members, container) in groups.iter().zip(&container_numbers) {
        let mut offsets = Vec::new();
        let mut data = Vec::new();
        for member in members {
            let body = &bodies[*member];
            offsets.extend_from_slice(format!("{} {} ", body.number, data.len()).as_bytes());
            data.extend_from_slice(&body.text);
            data.push(b'\n');
        }
        let mut dict = Dictionary::new();
        dict.insert(Name::from("Type"), name_node("ObjStm"));
        dict.insert(
            Name::from("N"),
            Node::direct(Object::Integer(members.len() as i64)),
        );
        dict.insert(
            Name::from("First"),
            Node::direct(Object::Integer(offsets.len() as i64)),
        );
        offsets.extend_from_slice(&data);
        let stream = Object::Stream(Stream {
            dict,
            dict_offset: 0,
            data: offsets,
        });

        locations.insert(
            *container,
            XRefEntry::Uncompressed {
                offset: out.len() as u64,
            },
        );
        let mut text = Vec::new();
        write_object(&mut text, &stream, renumber);
        write_indirect(&mut out, *container, &text);
    }

    let xref_number = first_container + groups.len() as u32;
    let xref_at = out.len();
    locations.insert(
        xref_number,
        XRefEntry::Uncompressed {
            offset: xref_at as u64,
        },
    );

    let size = xref_number + 1;
    let mut rows = Vec::with_capacity(size as usize * XREF_STREAM_WIDTHS.iter().sum::<usize>());
    for number in 0..size {
        let (kind, field2, field3) = match locations.get(&number) {
            Some(XRefEntry::Uncompressed { offset }) => (1, *offset, 0),
            Some(XRefEntry::Compressed { stream, index }) => {
                (2, u64::from(*stream), u64::from(*index))
            }
            _ => (0, 0, if number == 0 { 0xffff } else { 0 }),
        };
        push_field(&mut rows, kind, XREF_STREAM_WIDTHS[0])?;
        push_field(&mut rows, field2, XREF_STREAM_WIDTHS[1])?;
        push_field(&mut rows, field3, XREF_STREAM_WIDTHS[2])?;
    }

    trailer.insert(Name::from("Type"), name_node("XRef"));
    trailer.insert(
        Name::from("Size"),
        Node::direct(Object::Integer(i64::from(size))),
    );
    trailer.insert(
        Name::from("W"),
        Node::direct(Object::Array(
            XREF_STREAM_WIDTHS
                .iter()
                .map(|w| Node::direct(Object::Integer(*w as i64)))
                .collect(),
        )),
    );
    let xref_stream = Object::Stream(Stream {
        dict: trailer.clone(),
        dict_offset: 0,
        data: rows,
    });
    let mut text = Vec::new();
    write_object(&mut text, &xref_stream, renumber);
    write_indirect(&mut out, xref_number, &text);
    out.extend_from_slice(format!("startxref\n{}\n%%EOF\n", xref_at).as_bytes());

    if let Some(placeholder) = placeholder {
        placeholder.patch(&mut out);
    }
    Ok(out)
}

fn push_field(out: &mut Vec<u8>, value: u64, width: usize) -> Result<(), ModelError> {
    if width < 8 && value >> (width * 8) != 0 {
        return Err(ModelError::Write(format!(
            "value {} does not fit in a {}-byte xref field",
            value, width
        )));
    }
    for shift in (0..width).rev() {
        out.push((value >> (shift * 8)) as u8);
    }
    Ok(())
}

fn is_layout_key(key: &Name) -> bool {
    LAYOUT_KEYS.iter().any(|k| key.as_bytes() == k.as_bytes())
}

/// Trailer values in visiting order: `/Root`, `/Info`, `/ID`, then the
/// remaining keys sorted.
fn trailer_roots(trailer: &Dictionary) -> Vec<&Node> {
    let leading = LEADING_TRAILER_KEYS
        .iter()
        .filter_map(|key| trailer.get(&Name::from(*key)));
    let rest = trailer
        .iter()
        .filter(|(key, _)| {
            !is_layout_key(key)
                && !LEADING_TRAILER_KEYS
                    .iter()
                    .any(|k| key.as_bytes() == k.as_bytes())
        })
        .map(|(_, value)| value);
    leading.chain(rest).collect()
}

/// Breadth-first walk over indirect objects reachable from `roots`, adding
/// newly seen identities to `order`. Bodies of `rescan` are walked even
/// though they were already seen.
fn reach(
    doc: &Document,
    roots: &[&Node],
    rescan: &[ObjGen],
    skip_parent: bool,
    seen: &mut BTreeSet<ObjGen>,
    order: &mut Vec<ObjGen>,
) {
    let mut queue = VecDeque::new();
    let mut visit = |id: ObjGen, queue: &mut VecDeque<ObjGen>| {
        if doc.get(id).is_some() && !doc.is_structural(id) && seen.insert(id) {
            order.push(id);
            queue.push_back(id);
        }
    };

    for root in roots {
        for id in references(root, skip_parent) {
            visit(id, &mut queue);
        }
    }
    queue.extend(rescan);
    while let Some(id) = queue.pop_front() {
        let Some(body) = doc.get(id) else {
            continue;
        };
        for child in references(body, skip_parent) {
            visit(child, &mut queue);
        }
    }
}

/// References contained in `node`, in pre-order. A stream's `/Length` is
/// not followed since the writer always replaces it.
fn references(node: &Node, skip_parent: bool) -> Vec<ObjGen> {
    let mut found = Vec::new();
    let mut stack = vec![node];
    while let Some(node) = stack.pop() {
        let object = match node {
            Node::Indirect { id, .. } => {
                found.push(*id);
                continue;
            }
            Node::Direct { object, .. } => object,
        };
        match object {
            Object::Array(items) => stack.extend(items.iter().rev()),
            Object::Dictionary(dict) => stack.extend(
                dict.iter()
                    .rev()
                    .filter(|(key, _)| !(skip_parent && key.as_bytes() == b"Parent"))
                    .map(|(_, value)| value),
            ),
            Object::Stream(stream) => stack.extend(
                stream
                    .dict
                    .iter()
                    .rev()
                    .filter(|(key, _)| {
                        key.as_bytes() != b"Length"
                            && !(skip_parent && key.as_bytes() == b"Parent")
                    })
                    .map(|(_, value)| value),
            ),
            _ => {}
        }
    }
    found
}

/// Finds the first page: `/Root /Pages /Kids [0]`, descending through
/// intermediate page tree nodes.
fn first_page(doc: &Document) -> Option<(ObjGen, &Node)> {
    let root = doc.resolve(doc.trailer().get(&Name::from("Root"))?);
    let mut node = root.dict_get(&Name::from("Pages"))?;
    for _ in 0..crate::parser::MAX_NESTING {
        let handle = doc.resolve(node);
        match handle.dict_get(&Name::from("Kids")) {
            Some(kids) => {
                node = doc.resolve(kids).array_items()?.first()?;
            }
            None => {
                return match node {
                    Node::Indirect { id, .. } if doc.get(*id).is_some() => Some((*id, node)),
                    _ => None,
                };
            }
        }
    }
    None
}

fn page_count(doc: &Document) -> i64 {
    doc.trailer()
        .get(&Name::from("Root"))
        .map(|root| doc.resolve(root))
        .and_then(|root| root.dict_get(&Name::from("Pages")))
        .map(|pages| doc.resolve(pages))
        .and_then(|pages| pages.as_dict())
        .and_then(|dict| dict_integer(dict, "Count"))
        .unwrap_or(1)
}
