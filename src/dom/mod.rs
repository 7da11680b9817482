//! DOM Module - owned trees for matched subtrees
//!
//! Every match is materialized into an [`Element`] that owns its names,
//! attributes and children, so it can outlive the reader that produced it.

pub mod node;
pub mod serialize;

pub use node::{Attribute, Element, Node};
