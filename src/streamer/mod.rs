//! Subtree streaming
//!
//! [`XmlStreamer`] holds the configuration (target path, match limit,
//! encoding override) and opens [`Stream`]s over documents. A streamer can
//! be reused for any number of documents, from any number of threads.

pub mod matcher;
pub mod stream;

pub use matcher::{decide, Action, TargetPath};
pub use stream::Stream;

use crate::dom::Element;
use crate::error::{ConfigError, ReaderError, StreamError};
use crate::reader::{Cursor, XmlReader};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Extracts the subtrees found at a fixed element-name path
///
/// ```no_run
/// use xmlstreamer::XmlStreamer;
///
/// let streamer = XmlStreamer::new(["root", "products", "product"])?;
/// for product in streamer.stream("products.xml")? {
///     let product = product?;
///     println!("{}", product.child("name").map(|n| n.text()).unwrap_or_default());
/// }
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone)]
pub struct XmlStreamer {
    path: TargetPath,
    max_elements: Option<usize>,
    encoding: Option<String>,
}

impl XmlStreamer {
    /// Create a streamer for the elements at `names`, root element first
    pub fn new<I, S>(names: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        let path = TargetPath::new(names).ok_or(ConfigError::MissingElementNames)?;
        Ok(XmlStreamer {
            path,
            max_elements: None,
            encoding: None,
        })
    }

    /// Stop after `max` subtrees have been emitted
    pub fn set_max_elements(&mut self, max: usize) -> Result<&mut Self, ConfigError> {
        if max < 1 {
            return Err(ConfigError::InvalidMaxElements(max));
        }
        self.max_elements = Some(max);
        Ok(self)
    }

    pub fn with_max_elements(mut self, max: usize) -> Result<Self, ConfigError> {
        self.set_max_elements(max)?;
        Ok(self)
    }

    /// Encoding to assume for documents that neither start with a byte order
    /// mark nor declare one; `None` means UTF-8
    pub fn set_encoding(&mut self, encoding: Option<&str>) -> &mut Self {
        self.encoding = encoding.map(str::to_string);
        self
    }

    pub fn with_encoding(mut self, encoding: impl Into<String>) -> Self {
        self.encoding = Some(encoding.into());
        self
    }

    pub fn element_names(&self) -> &[String] {
        self.path.names()
    }

    pub fn path(&self) -> &TargetPath {
        &self.path
    }

    /// Depth of the extracted elements, root = 0
    pub fn depth(&self) -> usize {
        self.path.target_depth()
    }

    pub fn max_elements(&self) -> Option<usize> {
        self.max_elements
    }

    pub fn encoding(&self) -> Option<&str> {
        self.encoding.as_deref()
    }

    /// Stream the matching subtrees of a file
    ///
    /// Failing to open the file is reported here; every later failure is
    /// an item of the returned stream.
    pub fn stream(&self, path: impl AsRef<Path>) -> Result<Stream<XmlReader<File>>, StreamError> {
        let path = path.as_ref();
        tracing::debug!(source = %path.display(), encoding = ?self.encoding, "opening document");
        let reader = XmlReader::open(path, self.encoding())?;
        Ok(Stream::new(reader, self.path.clone(), self.max_elements))
    }

    /// Stream the matching subtrees of any byte source
    ///
    /// `locator` names the source in diagnostics.
    pub fn stream_reader<R: Read>(
        &self,
        reader: R,
        locator: impl Into<String>,
    ) -> Result<Stream<XmlReader<R>>, StreamError> {
        let locator = locator.into();
        tracing::debug!(source = %locator, encoding = ?self.encoding, "opening document");
        let reader = XmlReader::from_reader(reader, locator, self.encoding())?;
        Ok(Stream::new(reader, self.path.clone(), self.max_elements))
    }

    /// Stream through a caller-supplied cursor
    ///
    /// `open` receives the configured encoding override.
    pub fn stream_cursor<C, F>(&self, open: F) -> Result<Stream<C>, StreamError>
    where
        C: Cursor,
        F: FnOnce(Option<&str>) -> Result<C, ReaderError>,
    {
        let cursor = open(self.encoding())?;
        Ok(Stream::new(cursor, self.path.clone(), self.max_elements))
    }

    /// Hand every matching subtree of a file to `callback`
    ///
    /// Returns how many subtrees were handed out, or the first failure.
    pub fn stream_with<F>(&self, path: impl AsRef<Path>, mut callback: F) -> Result<usize, StreamError>
    where
        F: FnMut(Element),
    {
        let mut stream = self.stream(path)?;
        for element in &mut stream {
            callback(element?);
        }
        stream.finish()
    }
}
