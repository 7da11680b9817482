//! Path matching
//!
//! Stateless: every decision is a pure function of the cursor state, the
//! target path, and how many subtrees were emitted so far.

use crate::reader::CursorState;
use std::fmt;
use std::sync::Arc;

/// Ordered element names from the root element down to the targets
///
/// Name `i` must match the element at depth `i`. Never empty.
#[derive(Clone, PartialEq, Eq)]
pub struct TargetPath(Arc<[String]>);

impl TargetPath {
    /// Returns `None` for an empty sequence
    pub fn new(names: Vec<String>) -> Option<Self> {
        if names.is_empty() {
            None
        } else {
            Some(TargetPath(names.into()))
        }
    }

    pub fn names(&self) -> &[String] {
        &self.0
    }

    /// Depth of the target elements
    #[inline]
    pub fn target_depth(&self) -> usize {
        self.0.len() - 1
    }

    /// Name expected at `depth`, if the path reaches that deep
    #[inline]
    pub fn name_at(&self, depth: usize) -> Option<&str> {
        self.0.get(depth).map(String::as_str)
    }
}

impl fmt::Debug for TargetPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.0.iter()).finish()
    }
}

impl fmt::Display for TargetPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, name) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("/")?;
            }
            f.write_str(name)?;
        }
        Ok(())
    }
}

/// What the traversal engine does at the current node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Ancestor of the targets; look at its content
    Descend,
    /// Branch that cannot contain a target
    SkipSubtree,
    /// Target element; materialize it
    Emit,
    /// Target element that reaches the limit; materialize it, then stop
    EmitAndStop,
    /// Not an element; move on
    ContinueWithoutAction,
}

/// Decide what to do at the current cursor position
pub fn decide(
    state: &CursorState<'_>,
    path: &TargetPath,
    emitted: usize,
    max_elements: Option<usize>,
) -> Action {
    if !state.is_element() {
        return Action::ContinueWithoutAction;
    }

    let expected = match path.name_at(state.depth) {
        Some(name) => name,
        None => return Action::ContinueWithoutAction,
    };
    if state.name != expected {
        return Action::SkipSubtree;
    }
    if state.depth < path.target_depth() {
        return Action::Descend;
    }

    match max_elements {
        Some(max) if emitted + 1 >= max => Action::EmitAndStop,
        _ => Action::Emit,
    }
}
