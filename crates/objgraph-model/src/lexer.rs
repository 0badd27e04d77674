//! Tokenizer for PDF object syntax.

use crate::errors::ModelError;
use crate::object::Name;

/// PDF whitespace characters.
pub(crate) fn is_whitespace(b: u8) -> bool {
    matches!(b, 0 | b'\t' | b'\n' | 0x0c | b'\r' | b' ')
}

/// PDF delimiter characters.
pub(crate) fn is_delimiter(b: u8) -> bool {
    matches!(
        b,
        b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}' | b'/' | b'%'
    )
}

fn is_regular(b: u8) -> bool {
    !is_whitespace(b) && !is_delimiter(b)
}

fn hex_value(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

/// A single lexical token.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Integer literal.
    Integer(i64),
    /// Real literal.
    Real(f64),
    /// Literal or hex string, decoded.
    String(Vec<u8>),
    /// Name, decoded.
    Name(Name),
    /// `[`
    ArrayStart,
    /// `]`
    ArrayEnd,
    /// `<<`
    DictStart,
    /// `>>`
    DictEnd,
    /// Any other run of regular characters (`obj`, `R`, `true`, ...).
    Keyword(Vec<u8>),
}

impl Token {
    /// True if this is the keyword `kw`.
    pub fn is_keyword(&self, kw: &[u8]) -> bool {
        matches!(self, Token::Keyword(k) if k.as_slice() == kw)
    }
}

/// Byte-level tokenizer with an explicit, seekable position.
pub struct Lexer<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Lexer<'a> {
    /// Creates a lexer positioned at `pos`.
    pub fn new(data: &'a [u8], pos: usize) -> Self {
        Self { data, pos }
    }

    /// Underlying buffer.
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// Current position.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Moves to `pos`.
    pub fn seek(&mut self, pos: usize) {
        self.pos = pos;
    }

    /// Skips whitespace and comments.
    pub fn skip_whitespace(&mut self) {
        while let Some(&b) = self.data.get(self.pos) {
            if is_whitespace(b) {
                self.pos += 1;
            } else if b == b'%' {
                while let Some(&c) = self.data.get(self.pos) {
                    if c == b'\r' || c == b'\n' {
                        break;
                    }
                    self.pos += 1;
                }
            } else {
                break;
            }
        }
    }

    /// Returns the next token and its starting offset, or `None` at end of input.
    pub fn next_token(&mut self) -> Result<Option<(u64, Token)>, ModelError> {
        self.skip_whitespace();
        let start = self.pos;
        let Some(&b) = self.data.get(start) else {
            return Ok(None);
        };

        let token = match b {
            b'[' => {
                self.pos += 1;
                Token::ArrayStart
            }
            b']' => {
                self.pos += 1;
                Token::ArrayEnd
            }
            b'{' | b'}' => {
                self.pos += 1;
                Token::Keyword(vec![b])
            }
            b'<' if self.data.get(start + 1) == Some(&b'<') => {
                self.pos += 2;
                Token::DictStart
            }
            b'<' => Token::String(self.hex_string()?),
            b'>' if self.data.get(start + 1) == Some(&b'>') => {
                self.pos += 2;
                Token::DictEnd
            }
            b'(' => Token::String(self.literal_string()?),
            b'/' => Token::Name(self.name()),
            b'>' | b')' => {
                return Err(ModelError::Syntax {
                    offset: start as u64,
                    reason: format!("unexpected '{}'", b as char),
                })
            }
            _ => self.regular(),
        };

        Ok(Some((start as u64, token)))
    }

    /// Returns the next token without consuming it.
    pub fn peek_token(&mut self) -> Result<Option<(u64, Token)>, ModelError> {
        let saved = self.pos;
        let token = self.next_token();
        self.pos = saved;
        token
    }

    /// Consumes the keyword `kw` or fails.
    pub fn expect_keyword(&mut self, kw: &[u8]) -> Result<u64, ModelError> {
        match self.next_token()? {
            Some((offset, token)) if token.is_keyword(kw) => Ok(offset),
            Some((offset, token)) => Err(ModelError::Syntax {
                offset,
                reason: format!(
                    "expected '{}', found {:?}",
                    String::from_utf8_lossy(kw),
                    token
                ),
            }),
            None => Err(ModelError::Truncated {
                offset: self.pos as u64,
            }),
        }
    }

    fn regular(&mut self) -> Token {
        let start = self.pos;
        while self.data.get(self.pos).is_some_and(|&c| is_regular(c)) {
            self.pos += 1;
        }
        let text = &self.data[start..self.pos];
        classify_number(text).unwrap_or_else(|| Token::Keyword(text.to_vec()))
    }

    fn name(&mut self) -> Name {
        self.pos += 1;
        let mut bytes = Vec::new();
        while let Some(&c) = self.data.get(self.pos) {
            if !is_regular(c) {
                break;
            }
            if c == b'#' {
                let hi = self.data.get(self.pos + 1).copied().and_then(hex_value);
                let lo = self.data.get(self.pos + 2).copied().and_then(hex_value);
                if let (Some(hi), Some(lo)) = (hi, lo) {
                    bytes.push(hi << 4 | lo);
                    self.pos += 3;
                    continue;
                }
            }
            bytes.push(c);
            self.pos += 1;
        }
        Name::new(bytes)
    }

    fn hex_string(&mut self) -> Result<Vec<u8>, ModelError> {
        self.pos += 1;
        let mut digits = Vec::new();
        loop {
            let Some(&c) = self.data.get(self.pos) else {
                return Err(ModelError::Truncated {
                    offset: self.pos as u64,
                });
            };
            self.pos += 1;
            if c == b'>' {
                break;
            }
            if is_whitespace(c) {
                continue;
            }
            match hex_value(c) {
                Some(v) => digits.push(v),
                None => {
                    return Err(ModelError::Syntax {
                        offset: (self.pos - 1) as u64,
                        reason: format!("invalid hex digit '{}'", c as char),
                    })
                }
            }
        }
        if digits.len() % 2 == 1 {
            digits.push(0);
        }
        Ok(digits.chunks(2).map(|pair| pair[0] << 4 | pair[1]).collect())
    }

    fn literal_string(&mut self) -> Result<Vec<u8>, ModelError> {
        self.pos += 1;
        let mut out = Vec::new();
        let mut depth = 1usize;
        loop {
            let Some(&c) = self.data.get(self.pos) else {
                return Err(ModelError::Truncated {
                    offset: self.pos as u64,
                });
            };
            self.pos += 1;
            match c {
                b'\\' => self.escape(&mut out)?,
                b'(' => {
                    depth += 1;
                    out.push(c);
                }
                b')' => {
                    depth -= 1;
                    if depth == 0 {
                        break;
                    }
                    out.push(c);
                }
                b'\r' => {
                    if self.data.get(self.pos) == Some(&b'\n') {
                        self.pos += 1;
                    }
                    out.push(b'\n');
                }
                _ => out.push(c),
            }
        }
        Ok(out)
    }

    fn escape(&mut self, out: &mut Vec<u8>) -> Result<(), ModelError> {
        let Some(&c) = self.data.get(self.pos) else {
            return Err(ModelError::Truncated {
                offset: self.pos as u64,
            });
        };
        self.pos += 1;
        match c {
            b'n' => out.push(b'\n'),
            b'r' => out.push(b'\r'),
            b't' => out.push(b'\t'),
            b'b' => out.push(0x08),
            b'f' => out.push(0x0c),
            b'0'..=b'7' => {
                let mut value = u32::from(c - b'0');
                for _ in 0..2 {
                    match self.data.get(self.pos) {
                        Some(&d @ b'0'..=b'7') => {
                            value = value * 8 + u32::from(d - b'0');
                            self.pos += 1;
                        }
                        _ => break,
                    }
                }
                out.push((value & 0xff) as u8);
            }
            // Line continuation.
            b'\r' => {
                if self.data.get(self.pos) == Some(&b'\n') {
                    self.pos += 1;
                }
            }
            b'\n' => {}
            other => out.push(other),
        }
        Ok(())
    }
}

fn classify_number(text: &[u8]) -> Option<Token> {
    let digits = text.strip_prefix(b"+").or_else(|| text.strip_prefix(b"-")).unwrap_or(text);
    if digits.is_empty() || !digits.iter().all(|c| c.is_ascii_digit() || *c == b'.') {
        return None;
    }
    let dots = digits.iter().filter(|c| **c == b'.').count();
    if dots > 1 || !digits.iter().any(u8::is_ascii_digit) {
        return None;
    }
    let s = std::str::from_utf8(text).ok()?;
    if dots == 0 {
        if let Ok(n) = s.parse::<i64>() {
            return Some(Token::Integer(n));
        }
    }
    s.parse::<f64>().ok().map(Token::Real)
}
