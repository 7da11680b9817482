//! Byte scanning over a window of UTF-8 input using memchr
//!
//! The reader hands the scanner one markup construct (or the currently
//! buffered window) at a time; positions are relative to that slice.

use memchr::{memchr, memmem};

/// Cursor over one window of markup bytes
pub struct Scanner<'a> {
    input: &'a [u8],
    pos: usize,
}

impl<'a> Scanner<'a> {
    #[inline]
    pub fn new(input: &'a [u8]) -> Self {
        Scanner { input, pos: 0 }
    }

    /// Offset from the start of the window
    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    #[inline]
    pub fn is_eof(&self) -> bool {
        self.pos >= self.input.len()
    }

    /// Bytes not consumed yet
    #[inline]
    pub fn remaining(&self) -> &'a [u8] {
        &self.input[self.pos..]
    }

    #[inline]
    pub fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    /// Advance by `n` bytes, stopping at the end of the window
    #[inline]
    pub fn advance(&mut self, n: usize) {
        self.pos = (self.pos + n).min(self.input.len());
    }

    /// Skip whitespace, returning how many bytes were skipped
    #[inline]
    pub fn skip_whitespace(&mut self) -> usize {
        let start = self.pos;
        while self.pos < self.input.len() && is_whitespace(self.input[self.pos]) {
            self.pos += 1;
        }
        self.pos - start
    }

    #[inline]
    pub fn starts_with(&self, needle: &[u8]) -> bool {
        self.input[self.pos..].starts_with(needle)
    }

    /// Read an XML name, advancing past it
    pub fn read_name(&mut self) -> Option<&'a [u8]> {
        let start = self.pos;
        let first = *self.input.get(start)?;
        if !is_name_start_char(first) {
            return None;
        }
        self.pos += 1;
        while self.pos < self.input.len() && is_name_char(self.input[self.pos]) {
            self.pos += 1;
        }
        Some(&self.input[start..self.pos])
    }
}

/// Find the '>' closing a tag, ignoring any inside quoted attribute values
pub fn find_tag_end_quoted(input: &[u8]) -> Option<usize> {
    let mut in_single_quote = false;
    let mut in_double_quote = false;

    for (pos, &b) in input.iter().enumerate() {
        match b {
            b'"' if !in_single_quote => in_double_quote = !in_double_quote,
            b'\'' if !in_double_quote => in_single_quote = !in_single_quote,
            b'>' if !in_single_quote && !in_double_quote => return Some(pos),
            _ => {}
        }
    }
    None
}

/// Find the '>' closing a DOCTYPE declaration, skipping any internal subset
pub fn find_doctype_end(input: &[u8]) -> Option<usize> {
    let mut quote: Option<u8> = None;
    let mut subset_depth = 0usize;

    for (pos, &b) in input.iter().enumerate() {
        match (quote, b) {
            (Some(q), _) if b == q => quote = None,
            (Some(_), _) => {}
            (None, b'"' | b'\'') => quote = Some(b),
            (None, b'[') => subset_depth += 1,
            (None, b']') => subset_depth = subset_depth.saturating_sub(1),
            (None, b'>') if subset_depth == 0 => return Some(pos),
            _ => {}
        }
    }
    None
}

/// Find a multi-byte terminator such as `-->` or `]]>`
#[inline]
pub fn find_sequence(input: &[u8], needle: &[u8]) -> Option<usize> {
    memmem::find(input, needle)
}

/// Find the next '<' (start of markup)
#[inline]
pub fn find_tag_start(input: &[u8]) -> Option<usize> {
    memchr(b'<', input)
}

/// Count line feeds in a consumed slice
#[inline]
pub fn count_lines(input: &[u8]) -> usize {
    memchr::memchr_iter(b'\n', input).count()
}

/// Check if byte is XML whitespace
#[inline]
pub fn is_whitespace(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\n' | b'\r')
}

/// Check if every byte is XML whitespace
#[inline]
pub fn is_all_whitespace(input: &[u8]) -> bool {
    input.iter().all(|&b| is_whitespace(b))
}

/// First byte of a name: ASCII letter, `_`, `:`, or any byte of a multi-byte UTF-8 sequence
#[inline]
pub fn is_name_start_char(b: u8) -> bool {
    matches!(b, b'A'..=b'Z' | b'a'..=b'z' | b'_' | b':') || b >= 0x80
}

/// Later bytes of a name also allow digits, `-` and `.`
#[inline]
pub fn is_name_char(b: u8) -> bool {
    matches!(b, b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'_' | b'-' | b'.' | b':') || b >= 0x80
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_tag_end_quoted() {
        assert_eq!(find_tag_end_quoted(b"<a attr=\">test\">content"), Some(15));
        assert_eq!(find_tag_end_quoted(b"<a attr='>"), None);
    }

    #[test]
    fn test_find_doctype_end_with_subset() {
        let input = b"<!DOCTYPE r [<!ENTITY e \"x>\">]>rest";
        assert_eq!(find_doctype_end(input), Some(30));
    }

    #[test]
    fn test_read_name() {
        let mut scanner = Scanner::new(b"element-name>");
        assert_eq!(scanner.read_name(), Some(b"element-name" as &[u8]));
        assert_eq!(scanner.position(), 12);
        assert_eq!(scanner.peek(), Some(b'>'));
    }

    #[test]
    fn test_read_name_rejects_digit_start() {
        let mut scanner = Scanner::new(b"1abc");
        assert_eq!(scanner.read_name(), None);
        assert_eq!(scanner.position(), 0);
    }

    #[test]
    fn test_skip_whitespace() {
        let mut scanner = Scanner::new(b"  \t\n hello");
        assert_eq!(scanner.skip_whitespace(), 5);
        assert!(scanner.starts_with(b"hello"));
    }

    #[test]
    fn test_count_lines() {
        assert_eq!(count_lines(b"a\nb\n\nc"), 3);
        assert_eq!(count_lines(b""), 0);
    }
}
