//! XmlStreamer - Extract subtrees from XML documents of any size
//!
//! Walks a document with a forward-only cursor and materializes only the
//! elements found at a fixed path of element names, one at a time, skipping
//! every branch that cannot contain a match.
//!
//! Layers:
//! - `core`: byte scanning, entities, attributes, encoding detection
//! - `reader`: the [`Cursor`] abstraction and the streaming [`XmlReader`]
//! - `dom`: owned [`Element`] trees handed to the consumer
//! - `streamer`: path matching and the traversal engine ([`XmlStreamer`], [`Stream`])
//!
//! ```no_run
//! use xmlstreamer::XmlStreamer;
//!
//! let streamer = XmlStreamer::new(["catalog", "books", "book"])?.with_max_elements(10)?;
//! let count = streamer.stream_with("catalog.xml", |book| {
//!     println!("{}", book.attribute("isbn").unwrap_or("?"));
//! })?;
//! println!("{} books", count);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod core;
pub mod dom;
pub mod error;
pub mod reader;
pub mod streamer;

pub use dom::{Attribute, Element, Node};
pub use error::{ConfigError, ReaderError, StreamError};
pub use reader::{Cursor, CursorState, NodeKind, XmlReader};
pub use streamer::{Stream, TargetPath, XmlStreamer};
