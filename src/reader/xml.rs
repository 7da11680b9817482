//! Streaming pull reader (the shipped cursor)
//!
//! Walks a document one node at a time over a [`BufferedReader`], holding
//! only the construct under the cursor plus the names of the open elements.
//! Well-formedness is checked as it goes, including inside skipped subtrees.

use super::buffered::{BufferedReader, FillError};
use super::node::{CursorState, NodeKind};
use super::Cursor;
use crate::core::attributes::parse_attributes;
use crate::core::encoding::{self, SNIFF_LEN};
use crate::core::entities::decode_text;
use crate::core::scanner::{
    count_lines, find_doctype_end, find_sequence, find_tag_end_quoted, find_tag_start,
    is_all_whitespace, Scanner,
};
use crate::dom::{Attribute, Element, Node};
use crate::error::ReaderError;
use encoding_rs::Encoding;
use std::fs::File;
use std::io::{self, Read};
use std::mem;
use std::path::Path;

type Source<R> = io::Chain<io::Cursor<Vec<u8>>, R>;

const EXTRA_CONTENT: &str = "Extra content at the end of the document";
const START_TAG_EXPECTED: &str = "Start tag expected, '<' not found";

/// Where the cursor is relative to the root element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// Before the root start tag
    Prolog,
    /// Inside the root element
    Content,
    /// After the root end tag
    Epilog,
    /// End of document reached, or a failure happened
    Done,
}

/// An element whose end tag has not been seen yet
#[derive(Debug)]
struct OpenElement {
    name: String,
    line: usize,
}

/// The node under the cursor
#[derive(Debug, Default)]
struct CurrentNode {
    kind: Option<NodeKind>,
    name: String,
    value: String,
    attributes: Vec<Attribute>,
    depth: usize,
    is_empty: bool,
}

impl CurrentNode {
    fn begin(&mut self, kind: NodeKind, depth: usize) {
        self.kind = Some(kind);
        self.name.clear();
        self.value.clear();
        self.attributes.clear();
        self.depth = depth;
        self.is_empty = false;
    }

    fn reset(&mut self) {
        self.begin(NodeKind::None, 0);
    }

    fn kind(&self) -> NodeKind {
        self.kind.unwrap_or(NodeKind::None)
    }
}

/// Forward-only XML reader
pub struct XmlReader<R: Read> {
    /// `None` once closed
    input: Option<BufferedReader<Source<R>>>,
    locator: String,
    encoding: &'static Encoding,
    /// Line of the next unconsumed byte
    line: usize,
    /// Nothing consumed yet; an XML declaration is still allowed
    at_start: bool,
    phase: Phase,
    seen_doctype: bool,
    open: Vec<OpenElement>,
    node: CurrentNode,
}

impl XmlReader<File> {
    /// Open a file, decoding it per its BOM, its XML declaration, or `encoding`
    pub fn open(path: impl AsRef<Path>, encoding: Option<&str>) -> Result<Self, ReaderError> {
        let path = path.as_ref();
        let locator = path.display().to_string();
        let file = File::open(path).map_err(|source| ReaderError::Open {
            locator: locator.clone(),
            source,
        })?;
        Self::from_reader(file, locator, encoding)
    }
}

impl<R: Read> XmlReader<R> {
    /// Wrap any byte source; `locator` names it in diagnostics
    pub fn from_reader(
        mut reader: R,
        locator: impl Into<String>,
        encoding: Option<&str>,
    ) -> Result<Self, ReaderError> {
        let locator = locator.into();

        let mut prefix = Vec::with_capacity(SNIFF_LEN);
        reader
            .by_ref()
            .take(SNIFF_LEN as u64)
            .read_to_end(&mut prefix)
            .map_err(|source| ReaderError::Io {
                locator: locator.clone(),
                source,
            })?;

        let detected = encoding::detect(&prefix, encoding).map_err(|unsupported| {
            ReaderError::UnsupportedEncoding {
                locator: locator.clone(),
                label: unsupported.0,
            }
        })?;
        prefix.drain(..detected.bom_len);

        tracing::debug!(
            locator = %locator,
            encoding = detected.encoding.name(),
            source = ?detected.source,
            "opened XML source"
        );

        let source = io::Cursor::new(prefix).chain(reader);
        Ok(XmlReader {
            input: Some(BufferedReader::new(source, detected.encoding)),
            locator,
            encoding: detected.encoding,
            line: 1,
            at_start: true,
            phase: Phase::Prolog,
            seen_doctype: false,
            open: Vec::new(),
            node: CurrentNode::default(),
        })
    }

    // ------------------------------------------------------------------
    // Node accessors
    // ------------------------------------------------------------------

    pub fn node_kind(&self) -> NodeKind {
        self.node.kind()
    }

    /// Qualified name of the current node; empty for unnamed kinds
    pub fn name(&self) -> &str {
        &self.node.name
    }

    /// Local name (after colon)
    pub fn local_name(&self) -> &str {
        self.node.name.split_once(':').map_or(self.node.name.as_str(), |(_, local)| local)
    }

    /// Namespace prefix (before colon), if any
    pub fn prefix(&self) -> Option<&str> {
        self.node.name.split_once(':').map(|(prefix, _)| prefix)
    }

    /// Text of text, CDATA and comment nodes; data of processing instructions
    pub fn value(&self) -> &str {
        &self.node.value
    }

    pub fn depth(&self) -> usize {
        self.node.depth
    }

    /// Check if the current element was written as `<name/>`
    pub fn is_empty_element(&self) -> bool {
        self.node.is_empty
    }

    pub fn attributes(&self) -> &[Attribute] {
        &self.node.attributes
    }

    /// Get an attribute value of the current element by qualified name
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.node
            .attributes
            .iter()
            .find(|a| a.name() == name)
            .map(Attribute::value)
    }

    /// Line of the next unread byte
    pub fn line(&self) -> usize {
        self.line
    }

    /// The encoding the source is being decoded from
    pub fn encoding(&self) -> &'static Encoding {
        self.encoding
    }

    pub fn locator(&self) -> &str {
        &self.locator
    }

    pub fn is_closed(&self) -> bool {
        self.input.is_none()
    }

    pub fn state(&self) -> CursorState<'_> {
        CursorState::new(self.node.kind(), &self.node.name, self.node.depth)
    }

    // ------------------------------------------------------------------
    // Cursor movement
    // ------------------------------------------------------------------

    /// Move to the next node in document order
    ///
    /// Returns `Ok(false)` at the clean end of the document.
    pub fn read(&mut self) -> Result<bool, ReaderError> {
        if self.input.is_none() {
            return Err(ReaderError::Closed);
        }
        if self.phase == Phase::Done {
            self.node.reset();
            return Ok(false);
        }

        match self.read_node() {
            Ok(true) => Ok(true),
            Ok(false) => {
                self.phase = Phase::Done;
                self.node.reset();
                Ok(false)
            }
            Err(e) => {
                self.phase = Phase::Done;
                self.node.reset();
                Err(e)
            }
        }
    }

    /// Move past the current node and, for a start tag, all of its content
    pub fn skip(&mut self) -> Result<bool, ReaderError> {
        if self.node.kind() == NodeKind::Element && !self.node.is_empty {
            let depth = self.node.depth;
            loop {
                if !self.read()? {
                    return Ok(false);
                }
                if self.node.kind() == NodeKind::EndElement && self.node.depth == depth {
                    break;
                }
            }
        }
        self.read()
    }

    /// Materialize the current element and its content
    ///
    /// Leaves the cursor on the element's end tag (or on the element itself
    /// when it is empty), so the next `read` or `skip` moves past it.
    pub fn expand(&mut self) -> Result<Element, ReaderError> {
        if self.input.is_none() {
            return Err(ReaderError::Closed);
        }
        if self.node.kind() != NodeKind::Element {
            return Err(ReaderError::NotAnElement {
                kind: self.node.kind().as_str(),
            });
        }

        let mut root = Element::new(self.node.name.clone(), self.node.attributes.clone());
        if self.node.is_empty {
            return Ok(root);
        }

        let depth = self.node.depth;
        let mut stack: Vec<Element> = Vec::new();
        loop {
            if !self.read()? {
                return Err(self.parse_error(EXTRA_CONTENT));
            }

            let child = match self.node.kind() {
                NodeKind::Element => {
                    let element = Element::new(
                        mem::take(&mut self.node.name),
                        mem::take(&mut self.node.attributes),
                    );
                    if !self.node.is_empty {
                        stack.push(element);
                        continue;
                    }
                    Node::Element(element)
                }
                NodeKind::EndElement => match stack.pop() {
                    Some(done) => Node::Element(done),
                    None => {
                        debug_assert_eq!(self.node.depth, depth);
                        return Ok(root);
                    }
                },
                NodeKind::Text | NodeKind::Whitespace => Node::Text(mem::take(&mut self.node.value)),
                NodeKind::CData => Node::CData(mem::take(&mut self.node.value)),
                NodeKind::Comment => Node::Comment(mem::take(&mut self.node.value)),
                NodeKind::ProcessingInstruction => Node::ProcessingInstruction {
                    target: mem::take(&mut self.node.name),
                    data: mem::take(&mut self.node.value),
                },
                NodeKind::DocumentType | NodeKind::None => continue,
            };
            stack.last_mut().unwrap_or(&mut root).push(child);
        }
    }

    /// Release the source; further movement fails with [`ReaderError::Closed`]
    pub fn close(&mut self) -> Result<(), ReaderError> {
        if self.input.take().is_some() {
            tracing::trace!(locator = %self.locator, line = self.line, "closed XML source");
        }
        self.phase = Phase::Done;
        self.open.clear();
        self.node.reset();
        Ok(())
    }

    // ------------------------------------------------------------------
    // Tokenizing
    // ------------------------------------------------------------------

    fn read_node(&mut self) -> Result<bool, ReaderError> {
        loop {
            if !self.ensure(1)? {
                return self.end_of_input();
            }

            if self.buffered()[0] != b'<' {
                if self.read_text()? {
                    return Ok(true);
                }
                continue;
            }

            if !self.ensure(2)? {
                return Err(self.parse_error(self.phase_error()));
            }
            match self.buffered()[1] {
                b'?' => {
                    if self.read_processing_instruction()? {
                        return Ok(true);
                    }
                }
                b'!' => return self.read_markup_declaration(),
                b'/' => return self.read_end_tag(),
                _ => return self.read_start_tag(),
            }
        }
    }

    fn end_of_input(&mut self) -> Result<bool, ReaderError> {
        match self.phase {
            Phase::Epilog | Phase::Done => Ok(false),
            Phase::Prolog | Phase::Content => Err(self.parse_error(EXTRA_CONTENT)),
        }
    }

    /// Message for content that cannot appear outside the root element
    fn phase_error(&self) -> &'static str {
        match self.phase {
            Phase::Prolog => START_TAG_EXPECTED,
            _ => EXTRA_CONTENT,
        }
    }

    /// Character data up to the next '<'
    ///
    /// Returns false when whitespace outside the root element was skipped.
    fn read_text(&mut self) -> Result<bool, ReaderError> {
        let end = self.fill_until_from(1, |buf| find_tag_start(buf))?;

        if self.phase != Phase::Content {
            let len = end.unwrap_or_else(|| self.buffered().len());
            if !is_all_whitespace(&self.buffered()[..len]) {
                return Err(self.parse_error(self.phase_error()));
            }
            self.consume(len);
            return Ok(false);
        }

        let end = match end {
            Some(end) => end,
            None => return Err(self.parse_error(EXTRA_CONTENT)),
        };

        let decoded = {
            let raw = &self.buffered()[..end];
            if find_sequence(raw, b"]]>").is_some() {
                Err("Sequence ']]>' not allowed in content".to_string())
            } else {
                utf8(raw).and_then(|text| decode_text(text).map(|t| (t.into_owned(), is_all_whitespace(raw))))
            }
        };
        let (value, whitespace) = decoded.map_err(|msg| self.parse_error(msg))?;

        let kind = if whitespace { NodeKind::Whitespace } else { NodeKind::Text };
        self.node.begin(kind, self.open.len());
        self.node.value = value;
        self.consume(end);
        Ok(true)
    }

    /// `<?target data?>`; returns false for the XML declaration, which is consumed silently
    fn read_processing_instruction(&mut self) -> Result<bool, ReaderError> {
        let end = self
            .fill_until_from(2, |buf| find_sequence(buf, b"?>"))?
            .ok_or_else(|| self.parse_error("ParsePI: PI never end ..."))?;

        let parsed = {
            let body = &self.buffered()[2..end];
            let mut scanner = Scanner::new(body);
            match scanner.read_name() {
                None => Err("xmlParsePI : no target name".to_string()),
                Some(target) => {
                    let separated = scanner.skip_whitespace() > 0;
                    if !separated && !scanner.is_eof() {
                        Err("ParsePI: PI space expected".to_string())
                    } else {
                        utf8(target).and_then(|t| {
                            utf8(scanner.remaining()).map(|d| (t.to_string(), d.to_string()))
                        })
                    }
                }
            }
        };
        let (target, data) = parsed.map_err(|msg| self.parse_error(msg))?;

        if target.eq_ignore_ascii_case("xml") {
            if self.at_start && target == "xml" {
                self.consume(end + 2);
                return Ok(false);
            }
            return Err(self.parse_error("XML declaration allowed only at the start of the document"));
        }

        self.node.begin(NodeKind::ProcessingInstruction, self.open.len());
        self.node.name = target;
        self.node.value = data;
        self.consume(end + 2);
        Ok(true)
    }

    /// `<!--`, `<![CDATA[` or `<!DOCTYPE`
    fn read_markup_declaration(&mut self) -> Result<bool, ReaderError> {
        self.ensure(9)?;
        let head = self.buffered();

        if head.starts_with(b"<!--") {
            return self.read_comment();
        }
        if head.starts_with(b"<![CDATA[") {
            if self.phase != Phase::Content {
                return Err(self.parse_error(self.phase_error()));
            }
            return self.read_cdata();
        }
        if head.starts_with(b"<!DOCTYPE") {
            if self.phase != Phase::Prolog || self.seen_doctype {
                return Err(self.parse_error("Misplaced DOCTYPE declaration"));
            }
            return self.read_doctype();
        }
        Err(self.parse_error(match self.phase {
            Phase::Content => "StartTag: invalid element name",
            _ => self.phase_error(),
        }))
    }

    fn read_comment(&mut self) -> Result<bool, ReaderError> {
        let end = self
            .fill_until_from(4, |buf| find_sequence(buf, b"-->"))?
            .ok_or_else(|| self.parse_error("Comment not terminated"))?;

        let parsed = {
            let body = &self.buffered()[4..end];
            if find_sequence(body, b"--").is_some() || body.ends_with(b"-") {
                Err("Double hyphen within comment".to_string())
            } else {
                utf8(body).map(str::to_string)
            }
        };
        let value = parsed.map_err(|msg| self.parse_error(msg))?;

        self.node.begin(NodeKind::Comment, self.open.len());
        self.node.value = value;
        self.consume(end + 3);
        Ok(true)
    }

    fn read_cdata(&mut self) -> Result<bool, ReaderError> {
        let end = self
            .fill_until_from(9, |buf| find_sequence(buf, b"]]>"))?
            .ok_or_else(|| self.parse_error("CData section not finished"))?;

        let value = utf8(&self.buffered()[9..end])
            .map(str::to_string)
            .map_err(|msg| self.parse_error(msg))?;

        self.node.begin(NodeKind::CData, self.open.len());
        self.node.value = value;
        self.consume(end + 3);
        Ok(true)
    }

    fn read_doctype(&mut self) -> Result<bool, ReaderError> {
        let end = self
            .fill_until(find_doctype_end)?
            .ok_or_else(|| self.parse_error("DOCTYPE improperly terminated"))?;

        let parsed = {
            let body = &self.buffered()[b"<!DOCTYPE".len()..end];
            let mut scanner = Scanner::new(body);
            let separated = scanner.skip_whitespace() > 0;
            match scanner.read_name() {
                Some(name) if separated => {
                    scanner.skip_whitespace();
                    utf8(name).and_then(|n| {
                        utf8(scanner.remaining()).map(|rest| (n.to_string(), rest.trim_end().to_string()))
                    })
                }
                _ => Err("xmlParseDocTypeDecl : no DOCTYPE name !".to_string()),
            }
        };
        let (name, rest) = parsed.map_err(|msg| self.parse_error(msg))?;

        self.seen_doctype = true;
        self.node.begin(NodeKind::DocumentType, 0);
        self.node.name = name;
        self.node.value = rest;
        self.consume(end + 1);
        Ok(true)
    }

    fn read_start_tag(&mut self) -> Result<bool, ReaderError> {
        if self.phase == Phase::Epilog {
            return Err(self.parse_error(EXTRA_CONTENT));
        }

        let end = self
            .fill_until(find_tag_end_quoted)?
            .ok_or_else(|| self.parse_error("Couldn't find end of Start Tag"))?;

        let parsed = {
            let body = &self.buffered()[1..end];
            let (inner, is_empty) = match body.strip_suffix(b"/") {
                Some(inner) => (inner, true),
                None => (body, false),
            };
            let mut scanner = Scanner::new(inner);
            match scanner.read_name() {
                None => Err("StartTag: invalid element name".to_string()),
                Some(name) => utf8(name).and_then(|name| {
                    let rest = utf8(scanner.remaining())?;
                    let attributes = parse_attributes(rest)?;
                    Ok((name.to_string(), attributes, is_empty))
                }),
            }
        };
        let (name, attributes, is_empty) = parsed.map_err(|msg| self.parse_error(msg))?;

        self.node.begin(NodeKind::Element, self.open.len());
        self.node.is_empty = is_empty;
        self.node.attributes = attributes;
        if !is_empty {
            self.open.push(OpenElement {
                name: name.clone(),
                line: self.line,
            });
        }
        self.node.name = name;

        self.phase = if self.open.is_empty() { Phase::Epilog } else { Phase::Content };
        self.consume(end + 1);
        Ok(true)
    }

    fn read_end_tag(&mut self) -> Result<bool, ReaderError> {
        if self.open.is_empty() {
            return Err(self.parse_error(match self.phase {
                Phase::Prolog => "StartTag: invalid element name",
                _ => EXTRA_CONTENT,
            }));
        }

        let end = self
            .fill_until_from(2, |buf| memchr::memchr(b'>', buf))?
            .ok_or_else(|| self.parse_error("expected '>'"))?;

        let parsed = {
            let body = &self.buffered()[2..end];
            let mut scanner = Scanner::new(body);
            let name = scanner.read_name();
            scanner.skip_whitespace();
            match name {
                Some(name) if scanner.is_eof() => utf8(name).map(str::to_string),
                _ => Err("expected '>'".to_string()),
            }
        };
        let name = parsed.map_err(|msg| self.parse_error(msg))?;

        if let Some(open) = self.open.last() {
            if open.name != name {
                let msg = format!(
                    "Opening and ending tag mismatch: {} line {} and {}",
                    open.name, open.line, name
                );
                return Err(self.parse_error(msg));
            }
        }
        self.open.pop();

        self.node.begin(NodeKind::EndElement, self.open.len());
        self.node.name = name;
        if self.open.is_empty() {
            self.phase = Phase::Epilog;
        }
        self.consume(end + 1);
        Ok(true)
    }

    // ------------------------------------------------------------------
    // Input plumbing
    // ------------------------------------------------------------------

    fn buffered(&self) -> &[u8] {
        match self.input.as_ref() {
            Some(input) => input.buffered(),
            None => &[],
        }
    }

    fn consume(&mut self, n: usize) {
        if let Some(input) = self.input.as_mut() {
            let n = n.min(input.buffered().len());
            self.line += count_lines(&input.buffered()[..n]);
            input.consume(n);
        }
        self.at_start = false;
    }

    fn ensure(&mut self, n: usize) -> Result<bool, ReaderError> {
        let result = match self.input.as_mut() {
            Some(input) => input.ensure(n),
            None => return Err(ReaderError::Closed),
        };
        result.map_err(|e| self.fill_error(e))
    }

    fn fill_until<F>(&mut self, find: F) -> Result<Option<usize>, ReaderError>
    where
        F: FnMut(&[u8]) -> Option<usize>,
    {
        let result = match self.input.as_mut() {
            Some(input) => input.fill_until(find),
            None => return Err(ReaderError::Closed),
        };
        result.map_err(|e| self.fill_error(e))
    }

    /// Like `fill_until`, searching only bytes not yet searched
    ///
    /// `find` must look for a fixed delimiter; the search starts `skip`
    /// bytes in and each refill re-examines a few trailing bytes so a
    /// delimiter split across chunks is still found.
    fn fill_until_from<F>(&mut self, skip: usize, mut find: F) -> Result<Option<usize>, ReaderError>
    where
        F: FnMut(&[u8]) -> Option<usize>,
    {
        const OVERLAP: usize = 2;
        let mut searched = skip;
        self.fill_until(move |buf| {
            let from = searched.min(buf.len());
            let found = find(&buf[from..]).map(|i| from + i);
            searched = buf.len().saturating_sub(OVERLAP).max(skip);
            found
        })
    }

    fn fill_error(&self, err: FillError) -> ReaderError {
        match err {
            FillError::Io(source) => ReaderError::Io {
                locator: self.locator.clone(),
                source,
            },
            FillError::Malformed(bytes) => ReaderError::Encoding {
                locator: self.locator.clone(),
                line: self.line,
                encoding: self.encoding.name(),
                bytes: bytes
                    .iter()
                    .map(|b| format!("0x{:02X}", b))
                    .collect::<Vec<_>>()
                    .join(" "),
            },
        }
    }

    fn parse_error(&self, message: impl Into<String>) -> ReaderError {
        ReaderError::Parse {
            locator: self.locator.clone(),
            line: self.line,
            message: message.into(),
        }
    }
}

/// Decoded input is valid UTF-8 and constructs are split at ASCII delimiters
fn utf8(bytes: &[u8]) -> Result<&str, String> {
    std::str::from_utf8(bytes).map_err(|_| "Input is not proper UTF-8".to_string())
}

impl<R: Read> Cursor for XmlReader<R> {
    type Tree = Element;

    fn state(&self) -> CursorState<'_> {
        XmlReader::state(self)
    }

    fn read(&mut self) -> Result<bool, ReaderError> {
        XmlReader::read(self)
    }

    fn skip(&mut self) -> Result<bool, ReaderError> {
        XmlReader::skip(self)
    }

    fn expand(&mut self) -> Result<Element, ReaderError> {
        XmlReader::expand(self)
    }

    fn close(&mut self) -> Result<(), ReaderError> {
        XmlReader::close(self)
    }
}
