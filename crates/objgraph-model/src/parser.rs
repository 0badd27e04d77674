//! Object parser: values, `N G obj ... endobj` bodies and stream payloads.

use crate::errors::ModelError;
use crate::lexer::{is_whitespace, Lexer, Token};
use crate::object::{Dictionary, Name, Node, ObjGen, Object, Stream};

/// Nesting limit for arrays and dictionaries.
pub const MAX_NESTING: usize = 256;

/// A parsed `N G obj` body.
#[derive(Debug, Clone, PartialEq)]
pub struct IndirectObject {
    /// Identity from the object header.
    pub id: ObjGen,
    /// Object body (a stream body is a direct stream node).
    pub node: Node,
    /// Position just past the object.
    pub end: usize,
}

/// Value parser over a byte buffer.
pub struct Parser<'a> {
    lexer: Lexer<'a>,
}

impl<'a> Parser<'a> {
    /// Creates a parser positioned at `pos`.
    pub fn new(data: &'a [u8], pos: usize) -> Self {
        Self {
            lexer: Lexer::new(data, pos),
        }
    }

    /// Access to the underlying lexer.
    pub fn lexer(&mut self) -> &mut Lexer<'a> {
        &mut self.lexer
    }

    /// Parses one value, recognizing `id gen R` references.
    pub fn parse_node(&mut self) -> Result<Node, ModelError> {
        let (offset, token) = self.next_required()?;
        self.node_from(offset, token, 0)
    }

    /// Parses a dictionary (the next token must be `<<`).
    pub fn parse_dictionary(&mut self) -> Result<(u64, Dictionary), ModelError> {
        let (offset, token) = self.next_required()?;
        if token != Token::DictStart {
            return Err(ModelError::Syntax {
                offset,
                reason: format!("expected dictionary, found {:?}", token),
            });
        }
        Ok((offset, self.dictionary_body(0)?))
    }

    fn next_required(&mut self) -> Result<(u64, Token), ModelError> {
        self.lexer.next_token()?.ok_or(ModelError::Truncated {
            offset: self.lexer.position() as u64,
        })
    }

    fn node_from(&mut self, offset: u64, token: Token, depth: usize) -> Result<Node, ModelError> {
        if depth > MAX_NESTING {
            return Err(ModelError::Syntax {
                offset,
                reason: format!("nesting deeper than {}", MAX_NESTING),
            });
        }
        let object = match token {
            Token::Integer(n) => {
                if let Some(id) = self.try_reference(n)? {
                    return Ok(Node::Indirect { offset, id });
                }
                Object::Integer(n)
            }
            Token::Real(r) => Object::Real(r),
            Token::String(s) => Object::String(s),
            Token::Name(n) => Object::Name(n),
            Token::ArrayStart => {
                let mut items = Vec::new();
                loop {
                    let (item_offset, item) = self.next_required()?;
                    if item == Token::ArrayEnd {
                        break;
                    }
                    items.push(self.node_from(item_offset, item, depth + 1)?);
                }
                Object::Array(items)
            }
            Token::DictStart => Object::Dictionary(self.dictionary_body(depth)?),
            Token::Keyword(ref kw) => match kw.as_slice() {
                b"true" => Object::Boolean(true),
                b"false" => Object::Boolean(false),
                b"null" => Object::Null,
                _ => {
                    return Err(ModelError::Syntax {
                        offset,
                        reason: format!("unexpected keyword '{}'", String::from_utf8_lossy(kw)),
                    })
                }
            },
            other => {
                return Err(ModelError::Syntax {
                    offset,
                    reason: format!("unexpected token {:?}", other),
                })
            }
        };
        Ok(Node::Direct { offset, object })
    }

    fn dictionary_body(&mut self, depth: usize) -> Result<Dictionary, ModelError> {
        let mut dict = Dictionary::new();
        loop {
            let (key_offset, key) = self.next_required()?;
            let key = match key {
                Token::DictEnd => break,
                Token::Name(name) => name,
                other => {
                    return Err(ModelError::Syntax {
                        offset: key_offset,
                        reason: format!("dictionary key must be a name, found {:?}", other),
                    })
                }
            };
            let (value_offset, value) = self.next_required()?;
            let value = self.node_from(value_offset, value, depth + 1)?;
            dict.insert(key, value);
        }
        Ok(dict)
    }

    /// After an integer, checks for `gen R` and consumes it if present.
    fn try_reference(&mut self, id: i64) -> Result<Option<ObjGen>, ModelError> {
        let Ok(id) = u32::try_from(id) else {
            return Ok(None);
        };
        let saved = self.lexer.position();
        if let Some((_, Token::Integer(generation))) = self.lexer.next_token()? {
            if let Ok(generation) = u16::try_from(generation) {
                if let Some((_, token)) = self.lexer.next_token()? {
                    if token.is_keyword(b"R") {
                        return Ok(Some(ObjGen::new(id, generation)));
                    }
                }
            }
        }
        self.lexer.seek(saved);
        Ok(None)
    }

    /// Parses an `N G obj` header and returns its identity.
    pub fn parse_object_header(&mut self) -> Result<(u64, ObjGen), ModelError> {
        let (offset, id) = self.next_required()?;
        let (_, generation) = self.next_required()?;
        let id = match (id, generation) {
            (Token::Integer(id), Token::Integer(generation)) => {
                match (u32::try_from(id), u16::try_from(generation)) {
                    (Ok(id), Ok(generation)) => ObjGen::new(id, generation),
                    _ => {
                        return Err(ModelError::Syntax {
                            offset,
                            reason: "object number out of range".to_string(),
                        })
                    }
                }
            }
            _ => {
                return Err(ModelError::Syntax {
                    offset,
                    reason: "expected object header".to_string(),
                })
            }
        };
        self.lexer.expect_keyword(b"obj")?;
        Ok((offset, id))
    }
}

/// Parses the indirect object whose header starts at `pos`.
///
/// `resolve_length` is asked for the value of an indirect `/Length`.
pub fn parse_indirect_object(
    data: &[u8],
    pos: usize,
    resolve_length: &dyn Fn(ObjGen) -> Option<i64>,
) -> Result<IndirectObject, ModelError> {
    let mut parser = Parser::new(data, pos);
    let (_, id) = parser.parse_object_header()?;
    let node = parser.parse_node()?;

    let next = parser.lexer().peek_token().ok().flatten();
    let node = match (node, next) {
        (
            Node::Direct {
                offset,
                object: Object::Dictionary(dict),
            },
            Some((_, token)),
        ) if token.is_keyword(b"stream") => {
            parser.lexer().next_token()?;
            let after_keyword = parser.lexer().position();
            let (payload, end) = read_stream_data(data, after_keyword, &dict, resolve_length)?;
            parser.lexer().seek(end);
            Node::Direct {
                offset,
                object: Object::Stream(Stream {
                    dict,
                    dict_offset: offset,
                    data: payload,
                }),
            }
        }
        (node, _) => node,
    };

    if let Ok(Some((_, token))) = parser.lexer().peek_token() {
        if token.is_keyword(b"endobj") {
            parser.lexer().next_token()?;
        }
    }

    Ok(IndirectObject {
        id,
        node,
        end: parser.lexer().position(),
    })
}

/// Reads stream bytes following the `stream` keyword. Returns the payload
/// and the position just past `endstream`.
fn read_stream_data(
    data: &[u8],
    after_keyword: usize,
    dict: &Dictionary,
    resolve_length: &dyn Fn(ObjGen) -> Option<i64>,
) -> Result<(Vec<u8>, usize), ModelError> {
    let start = match (data.get(after_keyword), data.get(after_keyword + 1)) {
        (Some(b'\r'), Some(b'\n')) => after_keyword + 2,
        (Some(b'\r' | b'\n'), _) => after_keyword + 1,
        _ => after_keyword,
    };

    let declared = match dict.get(&Name::from("Length")) {
        Some(Node::Direct {
            object: Object::Integer(n),
            ..
        }) => Some(*n),
        Some(Node::Indirect { id, .. }) => resolve_length(*id),
        _ => None,
    };

    if let Some(len) = declared.and_then(|n| usize::try_from(n).ok()) {
        if let Some(end) = start.checked_add(len).filter(|end| *end <= data.len()) {
            let mut after = end;
            while data.get(after).is_some_and(|b| is_whitespace(*b)) {
                after += 1;
            }
            if data[after..].starts_with(b"endstream") {
                return Ok((data[start..end].to_vec(), after + b"endstream".len()));
            }
        }
    }

    tracing::debug!(offset = start, "stream /Length unusable, scanning for endstream");
    let Some(idx) = find_bytes(data, b"endstream", start) else {
        return Err(ModelError::Truncated {
            offset: start as u64,
        });
    };
    let mut end = idx;
    if end > start && data[end - 1] == b'\n' {
        end -= 1;
    }
    if end > start && data[end - 1] == b'\r' {
        end -= 1;
    }
    Ok((data[start..end].to_vec(), idx + b"endstream".len()))
}

/// Finds `needle` in `haystack` at or after `from`.
pub fn find_bytes(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if needle.is_empty() {
        return Some(from.min(haystack.len()));
    }
    haystack
        .get(from..)?
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|i| i + from)
}

/// Finds the last occurrence of `needle` in `haystack`.
pub(crate) fn rfind_bytes(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || needle.len() > haystack.len() {
        return None;
    }
    haystack.windows(needle.len()).rposition(|w| w == needle)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_lengths(_: ObjGen) -> Option<i64> {
        None
    }

    #[test]
    fn parses_reference_versus_integers() {
        let mut parser = Parser::new(b"[1 0 R 1 0 2]", 0);
        let node = parser.parse_node().unwrap();
        let Node::Direct {
            object: Object::Array(items),
            ..
        } = node
        else {
            panic!("expected array");
        };
        assert_eq!(items.len(), 4);
        assert!(items[0].is_indirect());
        assert_eq!(items[1].as_direct(), Some(&Object::Integer(1)));
        assert_eq!(items[3].as_direct(), Some(&Object::Integer(2)));
    }

    #[test]
    fn records_offsets_of_nested_values() {
        let mut parser = Parser::new(b"<< /A [ 7 ] >>", 0);
        let node = parser.parse_node().unwrap();
        let Node::Direct {
            offset,
            object: Object::Dictionary(dict),
        } = node
        else {
            panic!("expected dictionary");
        };
        assert_eq!(offset, 0);
        let array = dict.get(&Name::from("A")).unwrap();
        assert_eq!(array.offset(), 6);
        let Some(Object::Array(items)) = array.as_direct() else {
            panic!("expected array");
        };
        assert_eq!(items[0].offset(), 8);
    }

    #[test]
    fn rejects_non_name_keys() {
        let mut parser = Parser::new(b"<< 1 2 >>", 0);
        assert!(matches!(
            parser.parse_node(),
            Err(ModelError::Syntax { offset: 3, .. })
        ));
    }

    #[test]
    fn rejects_excessive_nesting() {
        let input = "[".repeat(MAX_NESTING + 2);
        let mut parser = Parser::new(input.as_bytes(), 0);
        assert!(parser.parse_node().is_err());
    }

    #[test]
    fn parses_stream_with_direct_length() {
        let input = b"4 0 obj\n<< /Length 5 >>\nstream\r\nhello\nendstream\nendobj\n";
        let obj = parse_indirect_object(input, 0, &no_lengths).unwrap();
        assert_eq!(obj.id, ObjGen::new(4, 0));
        let Some(Object::Stream(stream)) = obj.node.as_direct() else {
            panic!("expected stream");
        };
        assert_eq!(stream.data, b"hello");
        assert_eq!(stream.dict_offset, 8);
        assert_eq!(obj.end, input.len() - 1);
    }

    #[test]
    fn stream_with_bad_length_falls_back_to_scan() {
        let input = b"4 0 obj << /Length 99 >> stream\nabc\nendstream endobj";
        let obj = parse_indirect_object(input, 0, &no_lengths).unwrap();
        let Some(Object::Stream(stream)) = obj.node.as_direct() else {
            panic!("expected stream");
        };
        assert_eq!(stream.data, b"abc");
    }

    #[test]
    fn stream_with_indirect_length() {
        let input = b"4 0 obj << /Length 9 0 R >> stream\nabcdef\nendstream endobj";
        let lengths = |id: ObjGen| (id == ObjGen::new(9, 0)).then_some(3i64);
        let obj = parse_indirect_object(input, 0, &lengths).unwrap();
        let Some(Object::Stream(stream)) = obj.node.as_direct() else {
            panic!("expected stream");
        };
        // Length 3 does not land on endstream, so the scan result wins.
        assert_eq!(stream.data, b"abcdef");
    }

    #[test]
    fn find_helpers() {
        assert_eq!(find_bytes(b"abcabc", b"bc", 2), Some(4));
        assert_eq!(rfind_bytes(b"abcabc", b"ab"), Some(3));
        assert_eq!(find_bytes(b"abc", b"zz", 0), None);
    }
}
