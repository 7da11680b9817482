//! Core XML parsing primitives
//!
//! This module contains the fundamental building blocks for XML parsing:
//! - Scanner: delimiter detection using memchr
//! - Entities: strict entity decoding with Cow (zero-copy when possible)
//! - Attributes: attribute parsing and well-formedness checks
//! - Encoding: BOM, declaration and override based encoding detection

pub mod attributes;
pub mod encoding;
pub mod entities;
pub mod scanner;
