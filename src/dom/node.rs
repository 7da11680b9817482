//! Owned XML tree nodes
//!
//! A matched subtree is handed to the caller by value, so nodes own their
//! strings and children outright; there is no arena or document to keep
//! alive alongside them.

/// An attribute of an element, in document order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    name: String,
    value: String,
}

impl Attribute {
    /// Create a new attribute from a qualified name and a decoded value
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Attribute {
            name: name.into(),
            value: value.into(),
        }
    }

    /// Qualified name, prefix included
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Local name (after colon)
    pub fn local_name(&self) -> &str {
        split_name(&self.name).1
    }

    /// Namespace prefix (before colon), if any
    pub fn prefix(&self) -> Option<&str> {
        split_name(&self.name).0
    }

    /// Value with entities decoded
    pub fn value(&self) -> &str {
        &self.value
    }
}

/// A child of an element
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    /// Character data, whitespace-only runs included
    Text(String),
    CData(String),
    Comment(String),
    ProcessingInstruction { target: String, data: String },
}

impl Node {
    /// Get as element if applicable
    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Node::Element(e) => Some(e),
            _ => None,
        }
    }

    /// Get character data if applicable
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Node::Text(t) | Node::CData(t) => Some(t),
            _ => None,
        }
    }
}

/// An element and everything inside it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    name: String,
    attributes: Vec<Attribute>,
    children: Vec<Node>,
}

impl Element {
    /// Create an element with no children
    pub fn new(name: impl Into<String>, attributes: Vec<Attribute>) -> Self {
        Element {
            name: name.into(),
            attributes,
            children: Vec::new(),
        }
    }

    /// Append a child node
    pub fn push(&mut self, child: Node) {
        self.children.push(child);
    }

    /// Qualified name, prefix included
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Local name (after colon)
    pub fn local_name(&self) -> &str {
        split_name(&self.name).1
    }

    /// Namespace prefix (before colon), if any
    pub fn prefix(&self) -> Option<&str> {
        split_name(&self.name).0
    }

    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    /// Get an attribute value by qualified name
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }

    pub fn children(&self) -> &[Node] {
        &self.children
    }

    /// Child elements, skipping text and other node kinds
    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(Node::as_element)
    }

    /// First child element with the given qualified name
    pub fn child(&self, name: &str) -> Option<&Element> {
        self.child_elements().find(|e| e.name == name)
    }

    /// Check if this element has no children at all
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Concatenated character data of all descendants, in document order
    pub fn text(&self) -> String {
        let mut out = String::new();
        // Explicit stack keeps deep trees off the call stack
        let mut stack: Vec<std::slice::Iter<'_, Node>> = vec![self.children.iter()];
        while let Some(top) = stack.last_mut() {
            match top.next() {
                Some(Node::Element(e)) => stack.push(e.children.iter()),
                Some(Node::Text(t)) | Some(Node::CData(t)) => out.push_str(t),
                Some(_) => {}
                None => {
                    stack.pop();
                }
            }
        }
        out
    }

    /// Serialize this element back to XML
    pub fn to_xml(&self) -> String {
        super::serialize::serialize_element(self)
    }
}

/// Split a name into prefix and local name at the colon
fn split_name(name: &str) -> (Option<&str>, &str) {
    match name.split_once(':') {
        Some((prefix, local)) => (Some(prefix), local),
        None => (None, name),
    }
}
