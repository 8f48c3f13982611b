//! Binary object-graph encoding.
//!
//! A stream is a sequence of object records sharing three append-only
//! tables: interned strings, per-class field schemas and object ids. See
//! [`crate::constants`] for the tag values and sentinels.

mod decoder;
mod encoder;
pub mod refs;
pub mod schema;
pub mod strings;

pub use decoder::GraphReader;
pub use encoder::GraphWriter;
