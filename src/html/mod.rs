//! Text-level HTML rewriting.
//!
//! There is no DOM here. Tags are found with one regex per tag kind, their
//! attributes are read with a small scanner, and every edit is a splice into
//! the document string.
//!
//! - `rewrite` - match/callback replacement and anchor insertion
//! - `tag` - attribute lookup and editing inside a single matched tag
//! - `extract` - stylesheet, script and image descriptors

pub mod extract;
pub mod rewrite;
pub mod tag;

pub use extract::{ResourceDescriptor, ResourceKind};
pub use rewrite::{Anchor, Rewrite};
