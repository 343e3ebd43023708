//! LogCompilation tag parsing.
//!
//! Turns the line stream of a HotSpot `-XX:+LogCompilation` file into a
//! sequence of top-level [`Tag`] trees. Compile `task` units carry their own
//! [`ParseDictionary`] so nested `method`/`klass`/`type` ids can be resolved
//! after the unit has been handed off.

pub mod dictionary;
pub mod names;
pub mod processor;
pub mod tag;

pub use dictionary::ParseDictionary;
pub use processor::{parse_attributes, CompletedUnits, TagProcessor};
pub use tag::{unescape, Tag, TagKind};
