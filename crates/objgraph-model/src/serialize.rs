use crate::object::{Dictionary, Name, Node, ObjGen, Object, Stream};

/// Appends the textual form of `node`. References are rewritten through
/// `renumber`; a reference that maps to nothing is written as `null`.
pub fn write_node(out: &mut Vec<u8>, node: &Node, renumber: &dyn Fn(ObjGen) -> Option<ObjGen>) {
    match node {
        Node::Direct { object, .. } => write_object(out, object, renumber),
        Node::Indirect { id, .. } => match renumber(*id) {
            Some(new_id) if !new_id.is_none() => {
                out.extend_from_slice(format!("{} {} R", new_id.id, new_id.generation).as_bytes())
            }
            _ => out.extend_from_slice(b"null"),
        },
    }
}

/// Appends the textual form of `object`.
pub fn write_object(
    out: &mut Vec<u8>,
    object: &Object,
    renumber: &dyn Fn(ObjGen) -> Option<ObjGen>,
) {
    match object {
        Object::Null => out.extend_from_slice(b"null"),
        Object::Boolean(true) => out.extend_from_slice(b"true"),
        Object::Boolean(false) => out.extend_from_slice(b"false"),
        Object::Integer(n) => out.extend_from_slice(n.to_string().as_bytes()),
        Object::Real(r) => out.extend_from_slice(format_real(*r).as_bytes()),
        Object::String(s) => write_string(out, s),
        Object::Name(name) => out.extend_from_slice(name.to_string().as_bytes()),
        Object::Array(items) => {
            out.push(b'[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(b' ');
                }
                write_node(out, item, renumber);
            }
            out.push(b']');
        }
        Object::Dictionary(dict) => write_dictionary(out, dict, renumber),
        Object::Stream(stream) => write_stream(out, stream, renumber),
    }
}

/// Appends `<< /Key value ... >>`.
pub fn write_dictionary(
    out: &mut Vec<u8>,
    dict: &Dictionary,
    renumber: &dyn Fn(ObjGen) -> Option<ObjGen>,
) {
    out.extend_from_slice(b"<<");
    for (key, value) in dict {
        out.push(b' ');
        out.extend_from_slice(key.to_string().as_bytes());
        out.push(b' ');
        write_node(out, value, renumber);
    }
    out.extend_from_slice(b" >>");
}

/// Appends a stream. `/Length` is replaced by the actual payload length.
fn write_stream(out: &mut Vec<u8>, stream: &Stream, renumber: &dyn Fn(ObjGen) -> Option<ObjGen>) {
    let mut dict = stream.dict.clone();
    dict.insert(
        Name::from("Length"),
        Node::direct(Object::Integer(stream.data.len() as i64)),
    );
    write_dictionary(out, &dict, renumber);
    out.extend_from_slice(b"\nstream\n");
    out.extend_from_slice(&stream.data);
    out.extend_from_slice(b"\nendstream");
}

/// Formats a real so that it reads back as a real, never as an integer.
pub fn format_real(r: f64) -> String {
    if !r.is_finite() {
        return "0.0".to_string();
    }
    let text = format!("{}", r);
    if text.contains('.') || text.contains('e') {
        text
    } else {
        format!("{}.0", text)
    }
}

/// Strings with non-printable bytes are written in hex, the rest as
/// escaped literals.
fn write_string(out: &mut Vec<u8>, bytes: &[u8]) {
    let printable = bytes
        .iter()
        .all(|b| (0x20..0x7f).contains(b) || matches!(b, b'\n' | b'\r' | b'\t'));
    if !printable {
        out.push(b'<');
        for b in bytes {
            out.extend_from_slice(format!("{:02x}", b).as_bytes());
        }
        out.push(b'>');
        return;
    }
    out.push(b'(');
    for &b in bytes {
        match b {
            b'(' | b')' | b'\\' => {
                out.push(b'\\');
                out.push(b);
            }
            b'\n' => out.extend_from_slice(b"\\n"),
            b'\r' => out.extend_from_slice(b"\\r"),
            b'\t' => out.extend_from_slice(b"\\t"),
            _ => out.push(b),
        }
    }
    out.push(b')');
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;

    fn keep(id: ObjGen) -> Option<ObjGen> {
        Some(id)
    }

    fn text(object: &Object) -> String {
        let mut out = Vec::new();
        write_object(&mut out, object, &keep);
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn scalars() {
        assert_eq!(text(&Object::Null), "null");
        assert_eq!(text(&Object::Boolean(true)), "true");
        assert_eq!(text(&Object::Integer(-42)), "-42");
        assert_eq!(text(&Object::Real(3.0)), "3.0");
        assert_eq!(text(&Object::Real(0.25)), "0.25");
        assert_eq!(text(&Object::Name(Name::from("A B"))), "/A#20B");
    }

    #[test]
    fn strings_pick_literal_or_hex() {
        assert_eq!(text(&Object::String(b"a(b)\\".to_vec())), "(a\\(b\\)\\\\)");
        assert_eq!(text(&Object::String(vec![0, 0xff])), "<00ff>");
    }

    #[test]
    fn references_are_renumbered_or_nulled() {
        let array = Object::Array(vec![Node::reference(4, 0), Node::reference(5, 0)]);
        let mut out = Vec::new();
        write_object(&mut out, &array, &|id| {
            (id.id == 4).then_some(ObjGen::new(1, 0))
        });
        assert_eq!(out, b"[1 0 R null]");
    }

    #[test]
    fn stream_length_is_rewritten() {
        let stream = Object::Stream(Stream {
            dict: [(Name::from("Length"), Node::reference(9, 0))]
                .into_iter()
                .collect(),
            dict_offset: 0,
            data: b"abc".to_vec(),
        });
        assert_eq!(
            text(&stream),
            "<< /Length 3 >>\nstream\nabc\nendstream"
        );
    }

    #[test]
    fn written_values_parse_back() {
        let dict = Object::Dictionary(
            [
                (Name::from("R"), Node::direct(Object::Real(-1.5))),
                (Name::from("S"), Node::direct(Object::String(vec![1, 2, 3]))),
                (
                    Name::from("A"),
                    Node::direct(Object::Array(vec![Node::direct(Object::Null)])),
                ),
            ]
            .into_iter()
            .collect(),
        );
        let mut out = Vec::new();
        write_object(&mut out, &dict, &keep);
        let parsed = Parser::new(&out, 0).parse_node().unwrap();
        assert_eq!(parsed.as_direct().map(Object::object_type), Some(dict.object_type()));
        let Some(Object::Dictionary(parsed)) = parsed.as_direct() else {
            panic!("expected dictionary");
        };
        assert_eq!(
            parsed.get(&Name::from("S")).and_then(Node::as_direct),
            Some(&Object::String(vec![1, 2, 3]))
        );
        assert_eq!(
            parsed.get(&Name::from("R")).and_then(Node::as_direct),
            Some(&Object::Real(-1.5))
        );
    }
}
