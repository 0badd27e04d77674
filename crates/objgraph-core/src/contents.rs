//! Checks that a byte sequence survives a rewrite verbatim.
//!
//! Signature dictionaries are the motivating case: their `/Contents`
//! strings cover a byte range of the file and must be written exactly as
//! they were read.

use objgraph_model::parser::find_bytes;

/// Outcome of a contents check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentsVerdict {
    /// The expected bytes occur in the output.
    Found {
        /// Offset of the first occurrence.
        offset: usize,
    },
    /// The expected bytes do not occur in the output.
    Missing,
}

/// Looks for `expected` in `written`. Empty `expected` is always found.
pub fn verify_contents(written: &[u8], expected: &[u8]) -> ContentsVerdict {
    match find_bytes(written, expected, 0) {
        Some(offset) => {
            tracing::debug!(offset, len = expected.len(), "expected bytes found");
            ContentsVerdict::Found { offset }
        }
        None => ContentsVerdict::Missing,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_substrings_verbatim() {
        let written = b"<< /Contents <0a0b0c> /Type /Sig >>";
        assert!(matches!(
            verify_contents(written, b"<0a0b0c>"),
            ContentsVerdict::Found { offset: 13 }
        ));
        assert_eq!(verify_contents(written, b"<0A0B0C>"), ContentsVerdict::Missing);
        assert_eq!(
            verify_contents(written, b"/Type"),
            ContentsVerdict::Found { offset: 22 }
        );
    }

    #[test]
    fn empty_needle_is_always_found() {
        assert_eq!(verify_contents(b"", b""), ContentsVerdict::Found { offset: 0 });
        assert_eq!(verify_contents(b"abc", b""), ContentsVerdict::Found { offset: 0 });
    }

    #[test]
    fn longer_needle_is_missing() {
        assert_eq!(verify_contents(b"ab", b"abc"), ContentsVerdict::Missing);
    }
}
