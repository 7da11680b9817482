//! XML serialization of owned elements

use super::node::{Element, Node};
use crate::core::entities::{encode_attribute, encode_text};
use std::fmt;

/// Serialize an element to an XML string
/// Uses iterative approach with explicit stack to avoid stack overflow on deep XML
pub fn serialize_element(element: &Element) -> String {
    let mut buf = String::with_capacity(256);
    write_element(element, &mut buf);
    buf
}

fn write_element(root: &Element, buf: &mut String) {
    // Stack entries: Either entering a node or need to write closing tag
    enum StackEntry<'a> {
        Enter(&'a Node),
        Close(&'a Element),
    }

    open_tag(root, buf);
    if root.is_empty() {
        return;
    }

    let mut stack: Vec<StackEntry<'_>> = Vec::with_capacity(64);
    stack.push(StackEntry::Close(root));
    stack.extend(root.children().iter().rev().map(StackEntry::Enter));

    while let Some(entry) = stack.pop() {
        match entry {
            StackEntry::Close(element) => {
                buf.push_str("</");
                buf.push_str(element.name());
                buf.push('>');
            }
            StackEntry::Enter(Node::Element(element)) => {
                open_tag(element, buf);
                if !element.is_empty() {
                    // Push closing tag first (processed after children)
                    stack.push(StackEntry::Close(element));
                    stack.extend(element.children().iter().rev().map(StackEntry::Enter));
                }
            }
            StackEntry::Enter(Node::Text(text)) => buf.push_str(&encode_text(text)),
            StackEntry::Enter(Node::CData(text)) => {
                buf.push_str("<![CDATA[");
                buf.push_str(text);
                buf.push_str("]]>");
            }
            StackEntry::Enter(Node::Comment(text)) => {
                buf.push_str("<!--");
                buf.push_str(text);
                buf.push_str("-->");
            }
            StackEntry::Enter(Node::ProcessingInstruction { target, data }) => {
                buf.push_str("<?");
                buf.push_str(target);
                if !data.is_empty() {
                    buf.push(' ');
                    buf.push_str(data);
                }
                buf.push_str("?>");
            }
        }
    }
}

/// Write `<name attrs>`, or `<name attrs/>` for an element without children
fn open_tag(element: &Element, buf: &mut String) {
    buf.push('<');
    buf.push_str(element.name());
    for attr in element.attributes() {
        buf.push(' ');
        buf.push_str(attr.name());
        buf.push_str("=\"");
        buf.push_str(&encode_attribute(attr.value()));
        buf.push('"');
    }
    buf.push_str(if element.is_empty() { "/>" } else { ">" });
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&serialize_element(self))
    }
}
