//! Error types
//!
//! Three kinds, split by when they can happen:
//! - [`ConfigError`] is raised synchronously while configuring a streamer.
//! - [`ReaderError`] is what a cursor reports from open/read/skip/expand/close.
//! - [`StreamError`] is the single kind a stream hands to its consumer; every
//!   `ReaderError` is translated into one, keeping the cursor's text verbatim.

use std::io;
use thiserror::Error;

/// Invalid streamer configuration
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Missing element names.")]
    MissingElementNames,

    #[error("Max elements cannot be less than 1.")]
    InvalidMaxElements(usize),
}

/// Failure reported by a cursor
#[derive(Debug, Error)]
pub enum ReaderError {
    #[error("Unable to open source data {locator}: {source}")]
    Open {
        locator: String,
        #[source]
        source: io::Error,
    },

    #[error("{locator}: I/O error : {source}")]
    Io {
        locator: String,
        #[source]
        source: io::Error,
    },

    #[error("{locator}:{line}: parser error : {message}")]
    Parse {
        locator: String,
        line: usize,
        message: String,
    },

    #[error("{locator}:{line}: parser error : Input is not proper {encoding}, indicate encoding !\nBytes: {bytes}")]
    Encoding {
        locator: String,
        line: usize,
        encoding: &'static str,
        bytes: String,
    },

    #[error("{locator}: Unsupported encoding {label}")]
    UnsupportedEncoding { locator: String, label: String },

    #[error("cannot expand a {kind} node, only elements")]
    NotAnElement { kind: &'static str },

    #[error("reader is closed")]
    Closed,

    /// Free-form failure from a cursor implemented outside this crate
    #[error("{0}")]
    Custom(String),
}

impl ReaderError {
    /// Line of the document the failure was detected on, when known
    pub fn line(&self) -> Option<usize> {
        match self {
            ReaderError::Parse { line, .. } | ReaderError::Encoding { line, .. } => Some(*line),
            _ => None,
        }
    }
}

/// Failure while streaming a document
///
/// The message is the cursor's diagnostic, unchanged. The originating
/// [`ReaderError`] is available through [`std::error::Error::source`].
#[derive(Debug, Error)]
#[error("{message}")]
pub struct StreamError {
    message: String,
    #[source]
    source: Option<ReaderError>,
}

impl StreamError {
    /// Create a stream error that did not originate in a cursor
    pub fn new(message: impl Into<String>) -> Self {
        StreamError {
            message: message.into(),
            source: None,
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// The cursor failure this error was translated from
    pub fn reader_error(&self) -> Option<&ReaderError> {
        self.source.as_ref()
    }

    /// Consume the error, returning the cursor failure if there was one
    pub fn into_reader_error(self) -> Option<ReaderError> {
        self.source
    }
}

impl From<ReaderError> for StreamError {
    fn from(err: ReaderError) -> Self {
        StreamError {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_translation_keeps_message_verbatim() {
        let err = ReaderError::Parse {
            locator: "doc.xml".into(),
            line: 4,
            message: "Opening and ending tag mismatch: product line 2 and products".into(),
        };
        let text = err.to_string();
        let stream_err = StreamError::from(err);

        assert_eq!(stream_err.message(), text);
        assert_eq!(stream_err.to_string(), text);
        assert_eq!(stream_err.reader_error().and_then(ReaderError::line), Some(4));
        assert!(stream_err.source().is_some());
    }

    #[test]
    fn test_open_error_text() {
        let err = ReaderError::Open {
            locator: "missing.xml".into(),
            source: io::Error::new(io::ErrorKind::NotFound, "No such file or directory"),
        };
        assert!(err.to_string().starts_with("Unable to open source data missing.xml"));
    }

    #[test]
    fn test_config_messages() {
        assert_eq!(ConfigError::MissingElementNames.to_string(), "Missing element names.");
        assert_eq!(ConfigError::InvalidMaxElements(0).to_string(), "Max elements cannot be less than 1.");
    }

    #[test]
    fn test_stream_error_without_cursor_source() {
        let err = StreamError::new("boom");
        assert_eq!(err.to_string(), "boom");
        assert!(err.source().is_none());
    }
}
