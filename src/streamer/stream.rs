//! Traversal engine
//!
//! Drives a [`Cursor`] through the document, asks the matcher what to do at
//! each element, and hands materialized targets to the consumer one at a time.

use super::matcher::{decide, Action, TargetPath};
use crate::error::{ReaderError, StreamError};
use crate::reader::Cursor;
use std::iter::FusedIterator;

/// Lazy sequence of the subtrees matching a target path
///
/// Yields `Ok(tree)` per match in document order. A failure is yielded once,
/// after the last successful match, and ends the sequence. The source is
/// closed when the sequence ends, when the match limit is reached, or when
/// the stream is dropped, whichever comes first.
pub struct Stream<C: Cursor> {
    /// `None` once the source was closed
    cursor: Option<C>,
    path: TargetPath,
    max_elements: Option<usize>,
    emitted: usize,
    /// The last yielded element still has to be skipped
    skip_pending: bool,
    /// Close failure after the limit was reached, reported on the next call
    deferred: Option<StreamError>,
}

impl<C: Cursor> Stream<C> {
    pub(crate) fn new(cursor: C, path: TargetPath, max_elements: Option<usize>) -> Self {
        tracing::debug!(path = %path, max_elements = ?max_elements, "stream opened");
        Stream {
            cursor: Some(cursor),
            path,
            max_elements,
            emitted: 0,
            skip_pending: false,
            deferred: None,
        }
    }

    /// Number of subtrees yielded so far
    pub fn emitted(&self) -> usize {
        self.emitted
    }

    pub fn path(&self) -> &TargetPath {
        &self.path
    }

    /// Check if the source has been released
    pub fn is_closed(&self) -> bool {
        self.cursor.is_none()
    }

    /// Stop streaming and release the source
    ///
    /// Returns the number of subtrees yielded, or the close failure. A close
    /// failure still waiting to be yielded is returned here instead.
    pub fn finish(mut self) -> Result<usize, StreamError> {
        if let Some(err) = self.deferred.take() {
            return Err(err);
        }
        self.close("finished")?;
        Ok(self.emitted)
    }

    /// Move to the next target and materialize it
    ///
    /// Returns the tree and whether it was the last one allowed.
    fn advance(&mut self) -> Result<Option<(C::Tree, bool)>, ReaderError> {
        let cursor = match self.cursor.as_mut() {
            Some(cursor) => cursor,
            None => return Ok(None),
        };

        if self.skip_pending {
            self.skip_pending = false;
            if !cursor.skip()? {
                return Ok(None);
            }
        }

        loop {
            let action = decide(&cursor.state(), &self.path, self.emitted, self.max_elements);
            match action {
                Action::SkipSubtree => {
                    if !cursor.skip()? {
                        return Ok(None);
                    }
                }
                Action::Emit | Action::EmitAndStop => {
                    let tree = cursor.expand()?;
                    self.emitted += 1;
                    tracing::trace!(depth = self.path.target_depth(), count = self.emitted, "emitted subtree");
                    return Ok(Some((tree, action == Action::EmitAndStop)));
                }
                Action::Descend | Action::ContinueWithoutAction => {
                    if !cursor.read()? {
                        return Ok(None);
                    }
                }
            }
        }
    }

    fn close(&mut self, reason: &str) -> Result<(), ReaderError> {
        match self.cursor.take() {
            Some(mut cursor) => {
                tracing::debug!(emitted = self.emitted, reason, "stream closed");
                cursor.close()
            }
            None => Ok(()),
        }
    }

    /// Close after a failure; the first failure is the one reported
    fn close_after_failure(&mut self) {
        if let Err(e) = self.close("failed") {
            tracing::warn!(error = %e, "failed to close source after an earlier failure");
        }
    }
}

impl<C: Cursor> Iterator for Stream<C> {
    type Item = Result<C::Tree, StreamError>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(err) = self.deferred.take() {
            return Some(Err(err));
        }
        self.cursor.as_ref()?;

        match self.advance() {
            Ok(Some((tree, true))) => {
                if let Err(e) = self.close("limit reached") {
                    self.deferred = Some(e.into());
                }
                Some(Ok(tree))
            }
            Ok(Some((tree, false))) => {
                self.skip_pending = true;
                Some(Ok(tree))
            }
            Ok(None) => match self.close("end of document") {
                Ok(()) => None,
                Err(e) => Some(Err(e.into())),
            },
            Err(e) => {
                self.close_after_failure();
                Some(Err(e.into()))
            }
        }
    }
}

impl<C: Cursor> FusedIterator for Stream<C> {}

impl<C: Cursor> Drop for Stream<C> {
    fn drop(&mut self) {
        if let Err(e) = self.close("dropped") {
            tracing::warn!(error = %e, "failed to close source of a dropped stream");
        }
    }
}
