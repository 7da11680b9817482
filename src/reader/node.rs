//! Node kinds and the per-step cursor state

/// Kind of node the cursor is positioned on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// Before the first read, or after the end of the document
    None,
    /// Start tag, or an empty-element tag such as `<br/>`
    Element,
    /// End tag of a non-empty element
    EndElement,
    /// Character data
    Text,
    /// Whitespace-only character data inside the root element
    Whitespace,
    /// CDATA section
    CData,
    Comment,
    ProcessingInstruction,
    DocumentType,
}

impl NodeKind {
    /// Lowercase name used in diagnostics
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::None => "none",
            NodeKind::Element => "element",
            NodeKind::EndElement => "end element",
            NodeKind::Text => "text",
            NodeKind::Whitespace => "whitespace",
            NodeKind::CData => "cdata",
            NodeKind::Comment => "comment",
            NodeKind::ProcessingInstruction => "processing instruction",
            NodeKind::DocumentType => "document type",
        }
    }
}

/// What the cursor reports about its current node
///
/// Borrowed from the cursor and only valid until it advances.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CursorState<'a> {
    pub kind: NodeKind,
    /// Qualified name; empty for kinds without a name
    pub name: &'a str,
    /// Distance from the root element, root = 0
    pub depth: usize,
}

impl<'a> CursorState<'a> {
    pub fn new(kind: NodeKind, name: &'a str, depth: usize) -> Self {
        CursorState { kind, name, depth }
    }

    /// Check if this is a start (or empty) element
    #[inline]
    pub fn is_element(&self) -> bool {
        self.kind == NodeKind::Element
    }
}
