//! Cross-reference index: classic tables, cross-reference streams and
//! `/Prev` chains.

use crate::errors::ModelError;
use crate::lexer::{Lexer, Token};
use crate::object::{dict_integer, Dictionary, Name, Node, ObjGen, Object};
use crate::parser::{parse_indirect_object, rfind_bytes, Parser};
use std::collections::{BTreeMap, BTreeSet};

/// Placement of one object as recorded by the cross-reference index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XRefEntry {
    /// No object (type 0).
    Free,
    /// Stored directly in the file at a byte offset (type 1).
    Uncompressed {
        /// Absolute byte offset of the `N G obj` header.
        offset: u64,
    },
    /// Stored inside an object stream (type 2).
    Compressed {
        /// Object number of the containing object stream.
        stream: u32,
        /// Index of the object within the stream.
        index: u32,
    },
    /// Entry type not defined by the format.
    Unknown(u8),
}

impl XRefEntry {
    /// Builds an entry from cross-reference stream fields; returns the
    /// entry and the generation it applies to, or `None` if the offset
    /// does not fit once `base` is added.
    pub fn from_fields(kind: u64, field2: u64, field3: u64, base: u64) -> Option<(Self, u16)> {
        let entry = match kind {
            0 => (XRefEntry::Free, field3 as u16),
            1 => (
                XRefEntry::Uncompressed {
                    offset: field2.checked_add(base)?,
                },
                field3 as u16,
            ),
            2 => (
                XRefEntry::Compressed {
                    stream: field2 as u32,
                    index: field3 as u32,
                },
                0,
            ),
            other => (XRefEntry::Unknown(other.min(255) as u8), 0),
        };
        Some(entry)
    }
}

/// Merged cross-reference index of a document.
///
/// Keyed by object number; each number has one generation and one entry.
#[derive(Debug, Clone, Default)]
pub struct XRefTable {
    entries: BTreeMap<u32, (u16, XRefEntry)>,
    trailer: Dictionary,
}

impl XRefTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts an entry unless the object number is already present.
    /// Newer sections are read first, so older ones never override them.
    pub fn insert_if_absent(&mut self, id: ObjGen, entry: XRefEntry) -> bool {
        if self.entries.contains_key(&id.id) {
            return false;
        }
        self.entries.insert(id.id, (id.generation, entry));
        true
    }

    /// Inserts or replaces an entry.
    pub fn insert(&mut self, id: ObjGen, entry: XRefEntry) {
        self.entries.insert(id.id, (id.generation, entry));
    }

    /// Entry for `id`; the generation must match.
    pub fn entry(&self, id: ObjGen) -> Option<XRefEntry> {
        match self.entries.get(&id.id) {
            Some((generation, entry)) if *generation == id.generation => Some(*entry),
            _ => None,
        }
    }

    /// All entries in ascending object number order.
    pub fn iter(&self) -> impl Iterator<Item = (ObjGen, XRefEntry)> + '_ {
        self.entries
            .iter()
            .map(|(id, (generation, entry))| (ObjGen::new(*id, *generation), *entry))
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when there are no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Trailer dictionary of the newest section.
    pub fn trailer(&self) -> &Dictionary {
        &self.trailer
    }

    /// Replaces the trailer dictionary.
    pub fn set_trailer(&mut self, trailer: Dictionary) {
        self.trailer = trailer;
    }
}

/// One cross-reference section as read from the file.
#[derive(Debug, Clone)]
pub(crate) struct XRefSection {
    pub entries: Vec<(ObjGen, XRefEntry)>,
    pub trailer: Dictionary,
    pub prev: Option<u64>,
    pub xref_stm: Option<u64>,
}

/// Reads the `startxref` value near the end of the file.
pub fn find_startxref(data: &[u8]) -> Result<u64, ModelError> {
    let Some(pos) = rfind_bytes(data, b"startxref") else {
        return Err(ModelError::InvalidXref {
            offset: data.len() as u64,
            reason: "no startxref keyword".to_string(),
        });
    };
    let mut lexer = Lexer::new(data, pos + b"startxref".len());
    match lexer.next_token()? {
        Some((_, Token::Integer(n))) if n >= 0 => Ok(n as u64),
        _ => Err(ModelError::InvalidXref {
            offset: pos as u64,
            reason: "startxref is not followed by an offset".to_string(),
        }),
    }
}

/// Reads the section at `start` and every section reachable through
/// `/Prev` and `/XRefStm`. Offsets are relative to `base`.
pub fn read_xref_chain(data: &[u8], start: u64, base: u64) -> Result<XRefTable, ModelError> {
    let mut table = XRefTable::new();
    let mut visited = BTreeSet::new();
    let mut next = Some(start);
    let mut newest = true;

    while let Some(offset) = next {
        if !visited.insert(offset) {
            return Err(ModelError::XrefLoop { offset });
        }
        let section = parse_section(data, rebase(offset, base)?, base)?;
        tracing::debug!(
            offset,
            entries = section.entries.len(),
            "read xref section"
        );
        for (id, entry) in &section.entries {
            table.insert_if_absent(*id, *entry);
        }
        if let Some(stm) = section.xref_stm {
            if visited.insert(stm) {
                let hybrid = parse_section(data, rebase(stm, base)?, base)?;
                for (id, entry) in hybrid.entries {
                    table.insert_if_absent(id, entry);
                }
            }
        }
        if newest {
            table.set_trailer(section.trailer);
            newest = false;
        }
        next = section.prev;
    }

    Ok(table)
}

fn rebase(offset: u64, base: u64) -> Result<u64, ModelError> {
    offset.checked_add(base).ok_or(ModelError::InvalidXref {
        offset,
        reason: "offset out of range".to_string(),
    })
}

pub(crate) fn parse_section(data: &[u8], pos: u64, base: u64) -> Result<XRefSection, ModelError> {
    let invalid = |reason: &str| ModelError::InvalidXref {
        offset: pos,
        reason: reason.to_string(),
    };
    let start = usize::try_from(pos).map_err(|_| invalid("offset out of range"))?;
    if start >= data.len() {
        return Err(invalid("offset beyond end of file"));
    }

    let mut lexer = Lexer::new(data, start);
    match lexer.peek_token()? {
        Some((_, token)) if token.is_keyword(b"xref") => parse_table(data, start, base),
        Some((_, Token::Integer(_))) => parse_stream(data, start, base),
        _ => Err(invalid("expected 'xref' or a cross-reference stream")),
    }
}

fn parse_table(data: &[u8], start: usize, base: u64) -> Result<XRefSection, ModelError> {
    let mut parser = Parser::new(data, start);
    parser.lexer().expect_keyword(b"xref")?;
    let mut entries = Vec::new();

    loop {
        let (offset, token) = parser.lexer().next_token()?.ok_or(ModelError::Truncated {
            offset: data.len() as u64,
        })?;
        let first = match token {
            Token::Integer(n) if n >= 0 => n as u64,
            token if token.is_keyword(b"trailer") => break,
            other => {
                return Err(ModelError::InvalidXref {
                    offset,
                    reason: format!("expected subsection header, found {:?}", other),
                })
            }
        };
        let count = match parser.lexer().next_token()? {
            Some((_, Token::Integer(n))) if n >= 0 => n as u64,
            _ => {
                return Err(ModelError::InvalidXref {
                    offset,
                    reason: "subsection without entry count".to_string(),
                })
            }
        };
        for i in 0..count {
            let fields = (
                parser.lexer().next_token()?,
                parser.lexer().next_token()?,
                parser.lexer().next_token()?,
            );
            let (field_offset, stored, generation, in_use) = match fields {
                (
                    Some((o, Token::Integer(stored))),
                    Some((_, Token::Integer(generation))),
                    Some((_, Token::Keyword(kind))),
                ) if kind == b"n" || kind == b"f" => (o, stored, generation, kind == b"n"),
                _ => {
                    return Err(ModelError::InvalidXref {
                        offset,
                        reason: format!("malformed entry {} of subsection {}", i, first),
                    })
                }
            };
            let id = u32::try_from(first + i).map_err(|_| ModelError::InvalidXref {
                offset: field_offset,
                reason: "object number out of range".to_string(),
            })?;
            if id == 0 {
                continue;
            }
            let entry = if in_use {
                XRefEntry::Uncompressed {
                    offset: stored.max(0) as u64 + base,
                }
            } else {
                XRefEntry::Free
            };
            entries.push((ObjGen::new(id, generation.clamp(0, 65535) as u16), entry));
        }
    }

    let (_, trailer) = parser.parse_dictionary()?;
    Ok(XRefSection {
        entries,
        prev: dict_offset(&trailer, "Prev"),
        xref_stm: dict_offset(&trailer, "XRefStm"),
        trailer,
    })
}

fn parse_stream(data: &[u8], start: usize, base: u64) -> Result<XRefSection, ModelError> {
    let object = parse_indirect_object(data, start, &|_| None)?;
    let invalid = |reason: String| ModelError::InvalidXref {
        offset: start as u64,
        reason,
    };
    let Some(Object::Stream(stream)) = object.node.as_direct() else {
        return Err(invalid(format!("object {} is not a stream", object.id)));
    };
    if stream.type_name() != Some(&Name::from("XRef")) {
        return Err(invalid(format!("object {} is not /Type /XRef", object.id)));
    }
    if let Some(filter) = stream.dict.get(&Name::from("Filter")) {
        return Err(ModelError::UnsupportedFilter {
            id: object.id,
            filter: describe_filter(filter),
        });
    }

    let widths = integer_array(&stream.dict, "W")
        .filter(|w| w.len() == 3 && w.iter().all(|n| (0..=8).contains(n)))
        .ok_or_else(|| invalid("missing or invalid /W".to_string()))?;
    let widths: Vec<usize> = widths.iter().map(|n| *n as usize).collect();
    let size = dict_integer(&stream.dict, "Size")
        .filter(|n| *n >= 0)
        .ok_or_else(|| invalid("missing /Size".to_string()))?;
    let index = integer_array(&stream.dict, "Index").unwrap_or_else(|| vec![0, size]);
    if index.len() % 2 != 0 || index.iter().any(|n| *n < 0) {
        return Err(invalid("invalid /Index".to_string()));
    }

    let row_len: usize = widths.iter().sum();
    let mut rows = stream.data.chunks_exact(row_len.max(1));
    let mut entries = Vec::new();
    for pair in index.chunks(2) {
        for i in 0..pair[1] {
            let row = rows
                .next()
                .ok_or_else(|| invalid("stream data shorter than /Index".to_string()))?;
            let (f1, rest) = row.split_at(widths[0]);
            let (f2, f3) = rest.split_at(widths[1]);
            let kind = if widths[0] == 0 { 1 } else { be_value(f1) };
            let (entry, generation) = XRefEntry::from_fields(kind, be_value(f2), be_value(f3), base)
                .ok_or_else(|| invalid("entry offset out of range".to_string()))?;
            let id = u32::try_from(pair[0] + i)
                .map_err(|_| invalid("object number out of range".to_string()))?;
            if id == 0 {
                continue;
            }
            entries.push((ObjGen::new(id, generation), entry));
        }
    }

    Ok(XRefSection {
        entries,
        prev: dict_offset(&stream.dict, "Prev"),
        xref_stm: None,
        trailer: stream.dict.clone(),
    })
}

fn be_value(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0u64, |acc, b| acc << 8 | u64::from(*b))
}

fn dict_offset(dict: &Dictionary, key: &str) -> Option<u64> {
    dict_integer(dict, key).and_then(|n| u64::try_from(n).ok())
}

fn integer_array(dict: &Dictionary, key: &str) -> Option<Vec<i64>> {
    let Some(Object::Array(items)) = dict.get(&Name::from(key))?.as_direct() else {
        return None;
    };
    items
        .iter()
        .map(|item| match item.as_direct() {
            Some(Object::Integer(n)) => Some(*n),
            _ => None,
        })
        .collect()
}

pub(crate) fn describe_filter(node: &Node) -> String {
    match node.as_direct() {
        Some(Object::Name(name)) => name.to_string(),
        Some(Object::Array(items)) => items
            .iter()
            .map(describe_filter)
            .collect::<Vec<_>>()
            .join(" "),
        _ => "(indirect)".to_string(),
    }
}
