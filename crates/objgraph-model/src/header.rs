use crate::errors::ModelError;
use crate::parser::find_bytes;

/// Header magic: `b"%PDF-"`.
pub const MAGIC: &[u8; 5] = b"%PDF-";

/// How far into the file the header may start.
pub const HEADER_SEARCH_WINDOW: usize = 1024;

/// Binary marker comment written after the version line.
pub const BINARY_MARKER: &[u8; 6] = b"%\xbf\xf7\xa2\xfe\n";

/// Document header (`%PDF-M.m`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DocumentHeader {
    /// Major version.
    pub major: u8,
    /// Minor version.
    pub minor: u8,
    /// Position of `%PDF-` in the file. Cross-reference offsets are relative to it.
    pub offset: u64,
}

impl DocumentHeader {
    /// Creates a header at offset 0.
    pub fn new(major: u8, minor: u8) -> Self {
        Self {
            major,
            minor,
            offset: 0,
        }
    }

    /// Returns a header whose version is at least `major.minor`.
    pub fn at_least(self, major: u8, minor: u8) -> Self {
        if (self.major, self.minor) >= (major, minor) {
            self
        } else {
            Self {
                major,
                minor,
                offset: self.offset,
            }
        }
    }

    /// Version string, e.g. `1.5`.
    pub fn version(&self) -> String {
        format!("{}.{}", self.major, self.minor)
    }

    /// Serializes the header line plus the binary marker comment.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(16);
        bytes.extend_from_slice(MAGIC);
        bytes.extend_from_slice(self.version().as_bytes());
        bytes.push(b'\n');
        bytes.extend_from_slice(BINARY_MARKER);
        bytes
    }

    /// Locates and parses the header within the first
    /// [`HEADER_SEARCH_WINDOW`] bytes.
    pub fn find(bytes: &[u8]) -> Result<Self, ModelError> {
        let window = &bytes[..bytes.len().min(HEADER_SEARCH_WINDOW)];
        let Some(offset) = find_bytes(window, MAGIC, 0) else {
            return Err(ModelError::InvalidHeader(format!(
                "no {:?} marker in the first {} bytes",
                String::from_utf8_lossy(MAGIC),
                HEADER_SEARCH_WINDOW
            )));
        };

        let rest = &bytes[offset + MAGIC.len()..];
        let digits = |s: &[u8]| s.iter().take_while(|b| b.is_ascii_digit()).count();
        let major_len = digits(rest);
        if major_len == 0 || rest.get(major_len) != Some(&b'.') {
            return Err(ModelError::InvalidHeader(
                "malformed version number".to_string(),
            ));
        }
        let minor_rest = &rest[major_len + 1..];
        let minor_len = digits(minor_rest);
        if minor_len == 0 {
            return Err(ModelError::InvalidHeader(
                "malformed version number".to_string(),
            ));
        }

        let parse = |s: &[u8]| {
            std::str::from_utf8(s)
                .ok()
                .and_then(|s| s.parse::<u8>().ok())
                .ok_or_else(|| ModelError::InvalidHeader("version out of range".to_string()))
        };

        Ok(Self {
            major: parse(&rest[..major_len])?,
            minor: parse(&minor_rest[..minor_len])?,
            offset: offset as u64,
        })
    }
}

impl Default for DocumentHeader {
    fn default() -> Self {
        Self::new(1, 3)
    }
}
