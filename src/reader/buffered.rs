//! Buffered, transcoding input for the pull reader
//!
//! Reads from any source implementing Read, converts it to UTF-8 chunk by
//! chunk, and keeps only the not-yet-consumed tail in memory.

use encoding_rs::{Decoder, DecoderResult, Encoding};
use std::io::{self, Read};

/// Buffer size for reading chunks
const DEFAULT_BUFFER_SIZE: usize = 8192;

/// Failure while filling the buffer
#[derive(Debug)]
pub enum FillError {
    Io(io::Error),
    /// Bytes that are not valid in the source encoding
    Malformed(Vec<u8>),
}

/// Buffered UTF-8 view over a source in any supported encoding
pub struct BufferedReader<R: Read> {
    reader: R,
    decoder: Decoder,
    encoding: &'static Encoding,
    /// Raw bytes read from the source, not yet decoded
    chunk: Box<[u8]>,
    /// Decoded UTF-8 bytes; `buffer[pos..]` is unconsumed
    buffer: Vec<u8>,
    pos: usize,
    eof: bool,
    /// Decoding failure found past data still waiting in the buffer
    pending_error: Option<FillError>,
}

impl<R: Read> BufferedReader<R> {
    /// Create a new buffered reader decoding `reader` as `encoding`
    ///
    /// Any byte order mark must already be stripped from `reader`.
    pub fn new(reader: R, encoding: &'static Encoding) -> Self {
        Self::with_capacity(reader, encoding, DEFAULT_BUFFER_SIZE)
    }

    /// Create a new buffered reader with specified chunk capacity
    pub fn with_capacity(reader: R, encoding: &'static Encoding, capacity: usize) -> Self {
        BufferedReader {
            reader,
            decoder: encoding.new_decoder_without_bom_handling(),
            encoding,
            chunk: vec![0u8; capacity.max(16)].into_boxed_slice(),
            buffer: Vec::with_capacity(capacity),
            pos: 0,
            eof: false,
            pending_error: None,
        }
    }

    /// The encoding the source is decoded from
    pub fn encoding(&self) -> &'static Encoding {
        self.encoding
    }

    /// Fill the buffer from the reader
    ///
    /// Returns `Ok(false)` once the source is exhausted and nothing was added.
    pub fn fill_buffer(&mut self) -> Result<bool, FillError> {
        if let Some(err) = self.pending_error.take() {
            self.eof = true;
            return Err(err);
        }
        if self.eof {
            return Ok(false);
        }

        // Compact: drop consumed data
        if self.pos > 0 {
            self.buffer.drain(..self.pos);
            self.pos = 0;
        }

        loop {
            let read = loop {
                match self.reader.read(&mut self.chunk) {
                    Ok(n) => break n,
                    Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                    Err(e) => return Err(FillError::Io(e)),
                }
            };
            let last = read == 0;
            let src = &self.chunk[..read];

            let start = self.buffer.len();
            let max = self
                .decoder
                .max_utf8_buffer_length_without_replacement(read)
                .unwrap_or(read.saturating_mul(3) + 16);
            self.buffer.resize(start + max, 0);

            let (result, consumed, written) =
                self.decoder
                    .decode_to_utf8_without_replacement(src, &mut self.buffer[start..], last);
            self.buffer.truncate(start + written);

            if let DecoderResult::Malformed(bad_len, after) = result {
                let bad_start = consumed.saturating_sub(after as usize + bad_len as usize);
                let bad_end = (bad_start + 4).min(read);
                let err = FillError::Malformed(src[bad_start..bad_end].to_vec());
                if written == 0 {
                    self.eof = true;
                    return Err(err);
                }
                // Hand out what decoded cleanly first
                self.pending_error = Some(err);
                return Ok(true);
            }

            if last {
                self.eof = true;
                return Ok(written > 0);
            }
            if written > 0 {
                return Ok(true);
            }
            // A partial multi-byte sequence produced no output yet; read more
        }
    }

    /// Get current buffered data as a slice
    #[inline]
    pub fn buffered(&self) -> &[u8] {
        &self.buffer[self.pos..]
    }

    /// Check if we've reached end of input
    #[inline]
    pub fn is_eof(&self) -> bool {
        self.eof && self.pos >= self.buffer.len()
    }

    /// Consume n bytes from the buffer
    #[inline]
    pub fn consume(&mut self, n: usize) {
        self.pos += n.min(self.buffer.len() - self.pos);
    }

    /// Make at least `n` bytes available, returning false if the source ends first
    pub fn ensure(&mut self, n: usize) -> Result<bool, FillError> {
        while self.buffered().len() < n {
            if !self.fill_buffer()? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Fill until `find` locates something in the buffered data
    ///
    /// `find` is re-run over the whole buffered window after each fill, so it
    /// sees constructs that straddle chunk boundaries. Returns `None` when the
    /// source ends first.
    pub fn fill_until<F>(&mut self, mut find: F) -> Result<Option<usize>, FillError>
    where
        F: FnMut(&[u8]) -> Option<usize>,
    {
        loop {
            if let Some(found) = find(self.buffered()) {
                return Ok(Some(found));
            }
            if !self.fill_buffer()? {
                return Ok(None);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use encoding_rs::{UTF_8, WINDOWS_1252};
    use std::io::Cursor;

    fn drain<R: Read>(reader: &mut BufferedReader<R>) -> Result<Vec<u8>, FillError> {
        let mut out = Vec::new();
        while reader.fill_buffer()? {
            out.extend_from_slice(reader.buffered());
            let n = reader.buffered().len();
            reader.consume(n);
        }
        Ok(out)
    }

    #[test]
    fn test_buffered_reader() {
        let data = b"<root>content</root>";
        let mut reader = BufferedReader::new(Cursor::new(data.to_vec()), UTF_8);

        assert!(reader.fill_buffer().unwrap());
        assert_eq!(reader.buffered(), data);
        reader.consume(6);
        assert_eq!(reader.buffered(), b"content</root>");
    }

    #[test]
    fn test_latin1_is_transcoded() {
        let data = vec![b'<', b'a', b'>', 0xE4, 0xEB, b'<', b'/', b'a', b'>'];
        let mut reader = BufferedReader::new(Cursor::new(data), WINDOWS_1252);
        assert_eq!(drain(&mut reader).unwrap(), "<a>äë</a>".as_bytes());
    }

    #[test]
    fn test_multibyte_split_across_chunks() {
        let data = "ééééééééé".as_bytes().to_vec();
        let mut reader = BufferedReader::with_capacity(Cursor::new(data.clone()), UTF_8, 16);
        // Chunk boundaries fall inside two-byte sequences
        assert_eq!(drain(&mut reader).unwrap(), data);
    }

    #[test]
    fn test_invalid_utf8_is_reported_after_valid_prefix() {
        let data = vec![b'<', b'a', b'>', 0xE4, 0xEB, b'<'];
        let mut reader = BufferedReader::new(Cursor::new(data), UTF_8);

        assert!(reader.fill_buffer().unwrap());
        assert_eq!(reader.buffered(), b"<a>");
        match reader.fill_buffer() {
            Err(FillError::Malformed(bytes)) => assert_eq!(bytes[0], 0xE4),
            other => panic!("expected malformed input, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_fill_until_across_chunks() {
        let data = b"<!-- a long comment that spans chunks -->".to_vec();
        let mut reader = BufferedReader::with_capacity(Cursor::new(data), UTF_8, 16);
        let found = reader.fill_until(|buf| memchr::memmem::find(buf, b"-->")).unwrap();
        assert_eq!(found, Some(38));
    }

    #[test]
    fn test_ensure_at_eof() {
        let mut reader = BufferedReader::new(Cursor::new(b"ab".to_vec()), UTF_8);
        assert!(reader.ensure(2).unwrap());
        assert!(!reader.ensure(3).unwrap());
    }
}
