//! XML Attribute Parsing
//!
//! Parses XML attributes from tag content, strictly: every attribute needs a
//! quoted value, names must be unique within a tag, and values are entity
//! decoded and whitespace normalized.

use super::entities::decode_text;
use super::scanner::{is_whitespace, Scanner};
use crate::dom::Attribute;

/// Parse attributes from raw tag content (after the element name)
///
/// Input should be the content between element name and '>' or '/>'
pub fn parse_attributes(input: &str) -> Result<Vec<Attribute>, String> {
    let mut attrs: Vec<Attribute> = Vec::new();
    let mut scanner = Scanner::new(input.as_bytes());

    loop {
        let separated = scanner.skip_whitespace() > 0;
        if scanner.is_eof() {
            break;
        }

        if !separated {
            return Err("attributes construct error".to_string());
        }

        let name_start = scanner.position();
        let name = match scanner.read_name() {
            Some(name) => name,
            None => return Err("attributes construct error".to_string()),
        };
        let name = &input[name_start..name_start + name.len()];

        scanner.skip_whitespace();
        if scanner.peek() != Some(b'=') {
            return Err(format!("Specification mandates value for attribute {}", name));
        }
        scanner.advance(1);
        scanner.skip_whitespace();

        let quote = match scanner.peek() {
            Some(q @ (b'"' | b'\'')) => q,
            _ => return Err("AttValue: \" or ' expected".to_string()),
        };
        scanner.advance(1);

        let value_start = scanner.position();
        let value_len = match memchr::memchr(quote, scanner.remaining()) {
            Some(len) => len,
            None => return Err("AttValue: ' expected".to_string()),
        };
        let raw = &input[value_start..value_start + value_len];
        scanner.advance(value_len + 1);

        if raw.contains('<') {
            return Err("Unescaped '<' not allowed in attributes values".to_string());
        }

        if attrs.iter().any(|a| a.name() == name) {
            return Err(format!("Attribute {} redefined", name));
        }

        // Literal whitespace is normalized; character references survive
        let normalized = normalize_whitespace(raw);
        let value = decode_text(&normalized)?.into_owned();
        attrs.push(Attribute::new(name, value));
    }

    Ok(attrs)
}

/// Replace literal tab, CR and LF in an attribute value with spaces
fn normalize_whitespace(value: &str) -> String {
    if !value.bytes().any(|b| is_whitespace(b) && b != b' ') {
        return value.to_string();
    }
    value
        .chars()
        .map(|c| if matches!(c, '\t' | '\n' | '\r') { ' ' } else { c })
        .collect()
}
