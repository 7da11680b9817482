//! XML Entity Decoding
//!
//! Handles decoding of XML entities:
//! - Built-in entities: &lt; &gt; &amp; &quot; &apos;
//! - Numeric character references: &#123; &#x7B;
//!
//! Decoding is strict: a malformed or undeclared reference is an error, never
//! passed through. Uses Cow for zero-copy when no entities are present.

use super::scanner::{is_name_char, is_name_start_char};
use memchr::memchr;
use std::borrow::Cow;

/// Decode text content, handling entity references
///
/// Returns Borrowed if no entities present (zero-copy),
/// returns Owned if entities were decoded.
#[inline]
pub fn decode_text(input: &str) -> Result<Cow<'_, str>, String> {
    // Fast path: check if there are any entities using SIMD
    if memchr(b'&', input.as_bytes()).is_none() {
        return Ok(Cow::Borrowed(input));
    }
    decode_entities(input).map(Cow::Owned)
}

/// Decode all entity references in the input
fn decode_entities(input: &str) -> Result<String, String> {
    let bytes = input.as_bytes();
    let mut result = String::with_capacity(input.len());
    let mut pos = 0;

    while let Some(amp_offset) = memchr(b'&', &bytes[pos..]) {
        // Copy everything before the entity ('&' is ASCII, so this is a char boundary)
        result.push_str(&input[pos..pos + amp_offset]);
        pos += amp_offset + 1;

        let consumed = decode_reference(&bytes[pos..], &mut result)?;
        pos += consumed;
    }

    result.push_str(&input[pos..]);
    Ok(result)
}

/// Decode one reference starting just after '&', returning bytes consumed
/// including the terminating ';'
fn decode_reference(input: &[u8], out: &mut String) -> Result<usize, String> {
    match input.first() {
        Some(b'#') => {
            let semi = memchr(b';', input).ok_or_else(|| "CharRef: invalid value".to_string())?;
            let c = decode_char_ref(&input[1..semi])?;
            out.push(c);
            Ok(semi + 1)
        }
        Some(&b) if is_name_start_char(b) => {
            let mut end = 1;
            while end < input.len() && is_name_char(input[end]) {
                end += 1;
            }
            if input.get(end) != Some(&b';') {
                return Err("EntityRef: expecting ';'".to_string());
            }
            let name = &input[..end];
            out.push_str(predefined_entity(name).ok_or_else(|| {
                format!("Entity '{}' not defined", String::from_utf8_lossy(name))
            })?);
            Ok(end + 1)
        }
        _ => Err("xmlParseEntityRef: no name".to_string()),
    }
}

/// Decode a numeric character reference body (after '#', before ';')
fn decode_char_ref(body: &[u8]) -> Result<char, String> {
    let codepoint = match body.first() {
        Some(b'x') => {
            let digits = &body[1..];
            if digits.is_empty() || !digits.iter().all(u8::is_ascii_hexdigit) {
                return Err("xmlParseCharRef: invalid hexadecimal value".to_string());
            }
            std::str::from_utf8(digits)
                .ok()
                .and_then(|hex| u32::from_str_radix(hex, 16).ok())
        }
        _ => {
            if body.is_empty() || !body.iter().all(u8::is_ascii_digit) {
                return Err("xmlParseCharRef: invalid decimal value".to_string());
            }
            std::str::from_utf8(body).ok().and_then(|dec| dec.parse::<u32>().ok())
        }
    };

    match codepoint {
        Some(cp) if is_valid_xml_char(cp) => {
            char::from_u32(cp).ok_or_else(|| format!("xmlParseCharRef: invalid xmlChar value {}", cp))
        }
        Some(cp) => Err(format!("xmlParseCharRef: invalid xmlChar value {}", cp)),
        None => Err("CharRef: invalid value".to_string()),
    }
}

/// Replacement text of the five predefined entities
fn predefined_entity(name: &[u8]) -> Option<&'static str> {
    match name {
        b"lt" => Some("<"),
        b"gt" => Some(">"),
        b"amp" => Some("&"),
        b"quot" => Some("\""),
        b"apos" => Some("'"),
        _ => None,
    }
}

/// Check if a code point is a valid XML 1.0 Char
/// Char ::= #x9 | #xA | #xD | [#x20-#xD7FF] | [#xE000-#xFFFD] | [#x10000-#x10FFFF]
#[inline]
pub fn is_valid_xml_char(codepoint: u32) -> bool {
    matches!(codepoint,
        0x9 | 0xA | 0xD |
        0x20..=0xD7FF |
        0xE000..=0xFFFD |
        0x10000..=0x10FFFF
    )
}

/// Encode text for XML output (escape special characters)
pub fn encode_text(input: &str) -> Cow<'_, str> {
    escape(input, false)
}

/// Encode text for use in double-quoted XML attributes
pub fn encode_attribute(input: &str) -> Cow<'_, str> {
    escape(input, true)
}

fn escape(input: &str, attribute: bool) -> Cow<'_, str> {
    let needs_escape = |b: u8| match b {
        b'<' | b'>' | b'&' => true,
        b'"' | b'\t' | b'\n' | b'\r' => attribute,
        _ => false,
    };

    // Fast path: check if any escaping needed
    if !input.bytes().any(needs_escape) {
        return Cow::Borrowed(input);
    }

    let mut result = String::with_capacity(input.len() + 16);
    for c in input.chars() {
        match c {
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '&' => result.push_str("&amp;"),
            '"' if attribute => result.push_str("&quot;"),
            '\t' if attribute => result.push_str("&#9;"),
            '\n' if attribute => result.push_str("&#10;"),
            '\r' if attribute => result.push_str("&#13;"),
            _ => result.push(c),
        }
    }
    Cow::Owned(result)
}
