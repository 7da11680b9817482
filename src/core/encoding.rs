//! XML Encoding Detection
//!
//! Decides which encoding a source is written in, from its first bytes and
//! an optional caller hint. Conversion to UTF-8 happens incrementally in
//! `reader::buffered` through `encoding_rs`.
//!
//! Resolution order, first match wins:
//! 1. Byte order mark (UTF-8, UTF-16LE, UTF-16BE)
//! 2. UTF-16 byte pattern of `<?` without a BOM
//! 3. `encoding` pseudo-attribute of the XML declaration
//! 4. The caller's override
//! 5. UTF-8

use encoding_rs::{Encoding, UTF_16BE, UTF_16LE, UTF_8};
use memchr::memmem;

/// How many leading bytes are inspected for a BOM and XML declaration
pub const SNIFF_LEN: usize = 1024;

/// Where the resolved encoding came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodingSource {
    ByteOrderMark,
    BytePattern,
    Declaration,
    Override,
    Default,
}

/// An encoding label `encoding_rs` does not know
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsupportedEncoding(pub String);

/// Result of sniffing the start of a document
#[derive(Debug, Clone, Copy)]
pub struct DetectedEncoding {
    pub encoding: &'static Encoding,
    pub source: EncodingSource,
    /// Length of the byte order mark to strip before decoding
    pub bom_len: usize,
}

/// Detect the encoding of a source from its first bytes
///
/// `prefix` should hold up to [`SNIFF_LEN`] bytes of the document (less only
/// if the document is shorter).
pub fn detect(prefix: &[u8], hint: Option<&str>) -> Result<DetectedEncoding, UnsupportedEncoding> {
    if let Some((encoding, bom_len)) = Encoding::for_bom(prefix) {
        return Ok(DetectedEncoding { encoding, source: EncodingSource::ByteOrderMark, bom_len });
    }

    match prefix {
        [0x00, b'<', 0x00, b'?', ..] => {
            return Ok(DetectedEncoding { encoding: UTF_16BE, source: EncodingSource::BytePattern, bom_len: 0 });
        }
        [b'<', 0x00, b'?', 0x00, ..] => {
            return Ok(DetectedEncoding { encoding: UTF_16LE, source: EncodingSource::BytePattern, bom_len: 0 });
        }
        _ => {}
    }

    if let Some(label) = declared_encoding(prefix) {
        let encoding = lookup(label)?;
        // The declaration was readable as ASCII, so the content is not UTF-16
        let encoding = if encoding == UTF_16LE || encoding == UTF_16BE { UTF_8 } else { encoding };
        return Ok(DetectedEncoding { encoding, source: EncodingSource::Declaration, bom_len: 0 });
    }

    if let Some(label) = hint {
        let encoding = lookup(label.as_bytes())?;
        return Ok(DetectedEncoding { encoding, source: EncodingSource::Override, bom_len: 0 });
    }

    Ok(DetectedEncoding { encoding: UTF_8, source: EncodingSource::Default, bom_len: 0 })
}

fn lookup(label: &[u8]) -> Result<&'static Encoding, UnsupportedEncoding> {
    Encoding::for_label(label)
        .ok_or_else(|| UnsupportedEncoding(String::from_utf8_lossy(label).into_owned()))
}

/// Extract the `encoding` value from an XML declaration at the start of `prefix`
pub fn declared_encoding(prefix: &[u8]) -> Option<&[u8]> {
    if !prefix.starts_with(b"<?xml") || !prefix.get(5).map_or(false, |&b| b.is_ascii_whitespace()) {
        return None;
    }
    let end = memmem::find(prefix, b"?>")?;
    let decl = &prefix[5..end];

    let at = memmem::find(decl, b"encoding")?;
    let rest = trim_start(&decl[at + b"encoding".len()..]);
    let rest = trim_start(rest.strip_prefix(b"=")?);
    let quote = *rest.first()?;
    if quote != b'"' && quote != b'\'' {
        return None;
    }
    let rest = &rest[1..];
    let close = memchr::memchr(quote, rest)?;
    Some(&rest[..close])
}

fn trim_start(input: &[u8]) -> &[u8] {
    let skip = input.iter().take_while(|b| b.is_ascii_whitespace()).count();
    &input[skip..]
}

#[cfg(test)]
mod tests {
    use super::*;
    use encoding_rs::WINDOWS_1252;

    #[test]
    fn test_detect_utf8_default() {
        let detected = detect(b"<root/>", None).unwrap();
        assert_eq!(detected.encoding, UTF_8);
        assert_eq!(detected.source, EncodingSource::Default);
    }

    #[test]
    fn test_detect_utf8_bom() {
        let detected = detect(&[0xEF, 0xBB, 0xBF, b'<'], Some("ISO-8859-1")).unwrap();
        assert_eq!(detected.encoding, UTF_8);
        assert_eq!(detected.bom_len, 3);
    }

    #[test]
    fn test_detect_utf16_bom() {
        assert_eq!(detect(&[0xFF, 0xFE, b'<', 0x00], None).unwrap().encoding, UTF_16LE);
        assert_eq!(detect(&[0xFE, 0xFF, 0x00, b'<'], None).unwrap().encoding, UTF_16BE);
    }

    #[test]
    fn test_detect_utf16_without_bom() {
        let detected = detect(&[b'<', 0x00, b'?', 0x00, b'x', 0x00], None).unwrap();
        assert_eq!(detected.encoding, UTF_16LE);
        assert_eq!(detected.source, EncodingSource::BytePattern);
    }

    #[test]
    fn test_declaration_wins_over_override() {
        let doc = b"<?xml version=\"1.0\" encoding=\"ISO-8859-1\"?><r/>";
        let detected = detect(doc, Some("UTF-8")).unwrap();
        assert_eq!(detected.encoding, WINDOWS_1252);
        assert_eq!(detected.source, EncodingSource::Declaration);
    }

    #[test]
    fn test_override_without_declaration() {
        let detected = detect(b"<?xml version='1.0'?><r/>", Some("ISO-8859-1")).unwrap();
        assert_eq!(detected.encoding, WINDOWS_1252);
        assert_eq!(detected.source, EncodingSource::Override);
    }

    #[test]
    fn test_unknown_labels() {
        assert_eq!(detect(b"<r/>", Some("klingon")).unwrap_err().0, "klingon");
        let doc = b"<?xml version='1.0' encoding='bogus'?><r/>";
        assert_eq!(detect(doc, None).unwrap_err().0, "bogus");
    }

    #[test]
    fn test_declared_utf16_on_ascii_bytes() {
        let doc = b"<?xml version=\"1.0\" encoding=\"UTF-16\"?><r/>";
        assert_eq!(detect(doc, None).unwrap().encoding, UTF_8);
    }

    #[test]
    fn test_declared_encoding_parsing() {
        assert_eq!(declared_encoding(b"<?xml version='1.0' encoding = 'latin1' ?>"), Some(&b"latin1"[..]));
        assert_eq!(declared_encoding(b"<?xml version='1.0'?>"), None);
        assert_eq!(declared_encoding(b"<?xml-stylesheet href='a'?>"), None);
        assert_eq!(declared_encoding(b"<root/>"), None);
    }
}
