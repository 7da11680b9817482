//! XML Reader Module
//!
//! Forward-only cursors over XML documents:
//! - [`Cursor`]: the capability set the streamer drives
//! - [`XmlReader`]: streaming pull reader over any `io::Read`
//! - [`BufferedReader`]: chunked input, decoded to UTF-8 as it is read

pub mod buffered;
pub mod node;
pub mod xml;

pub use buffered::BufferedReader;
pub use node::{CursorState, NodeKind};
pub use xml::XmlReader;

use crate::error::ReaderError;

/// A forward-only cursor over the nodes of one document
///
/// Movement is one-way: once a node is passed it cannot be revisited. A
/// cursor reports failures as [`ReaderError`]s and never panics on
/// malformed input.
pub trait Cursor {
    /// Owned tree produced by [`Cursor::expand`]
    type Tree;

    /// Kind, name and depth of the current node
    fn state(&self) -> CursorState<'_>;

    /// Advance to the next node in document order; `Ok(false)` at the end
    fn read(&mut self) -> Result<bool, ReaderError>;

    /// Advance past the current node and its whole subtree; `Ok(false)` at the end
    fn skip(&mut self) -> Result<bool, ReaderError>;

    /// Materialize the current element with its subtree
    ///
    /// Afterwards [`Cursor::skip`] must move past the expanded element.
    fn expand(&mut self) -> Result<Self::Tree, ReaderError>;

    /// Release the underlying source; calling it again is harmless
    fn close(&mut self) -> Result<(), ReaderError>;
}

impl<C: Cursor + ?Sized> Cursor for Box<C> {
    type Tree = C::Tree;

    fn state(&self) -> CursorState<'_> {
        (**self).state()
    }

    fn read(&mut self) -> Result<bool, ReaderError> {
        (**self).read()
    }

    fn skip(&mut self) -> Result<bool, ReaderError> {
        (**self).skip()
    }

    fn expand(&mut self) -> Result<Self::Tree, ReaderError> {
        (**self).expand()
    }

    fn close(&mut self) -> Result<(), ReaderError> {
        (**self).close()
    }
}
