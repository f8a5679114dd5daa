//! Parser, data model and serializer for the nested-section configuration
//! grammar used by the display server.
//!
//! The format is line-oriented: each line is a keyword followed by typed
//! values (quoted strings, bare tokens, integers), grouped into named
//! `Section … EndSection` blocks that nest via `SubSection`. `Option`
//! directives are kept apart from plain entries so flag-style settings can
//! be addressed by name.

pub mod document;
pub mod entry;
pub mod error;
pub mod section;
pub mod value;

pub use document::Document;
pub use entry::Entry;
pub use error::ParseError;
pub use section::{Options, Section};
pub use value::Value;
