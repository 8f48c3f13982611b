//! Error types for graph encoding and decoding.

use graph_pack_buffers::BufferError;
use thiserror::Error;

/// Error type for graph stream encoding and decoding operations.
///
/// Every variant is fatal for the stream being processed; there is no
/// partial recovery.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("corrupt stream: {0}")]
    CorruptStream(#[from] Corruption),
    #[error("unknown type tag {tag} at offset {offset}")]
    UnknownTypeTag { tag: u8, offset: usize },
    #[error("unknown class `{0}`")]
    UnknownClass(String),
    #[error("invalid list terminator {0}")]
    InvalidListTerminator(u8),
    #[error("dangling reference to object {id}")]
    DanglingReference { id: i32 },
    #[error("unexpected end of stream")]
    UnexpectedEof,
    #[error("invalid UTF-8 in string entry")]
    InvalidUtf8,
    #[error("object nesting exceeds depth limit {0}")]
    DepthLimitExceeded(usize),
    #[error("object at `{0}` is mutably borrowed")]
    ObjectBorrowed(String),
    #[error("homogeneous array of `{expected}` contains `{found}`")]
    HeterogeneousArray { expected: String, found: String },
    #[error("{0} too large for the wire format")]
    LengthOverflow(&'static str),
}

/// The specific way a stream failed structural validation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Corruption {
    #[error("string index {index} out of bounds ({len} strings known)")]
    StringIndex { index: i32, len: usize },
    #[error("schema index {index} out of bounds for class `{class_id}` ({len} entries known)")]
    SchemaIndex {
        class_id: String,
        index: i32,
        len: usize,
    },
    #[error("negative length {0}")]
    NegativeLength(i32),
    #[error("object id {0} defined twice")]
    DuplicateObjectId(i32),
    #[error("class id is null")]
    NullClassId,
    #[error("field name is null")]
    NullFieldName,
    #[error("expected root list marker, found byte {0}")]
    MissingListMarker(u8),
    #[error("tag {0} is not valid for an object element")]
    UnexpectedObjectTag(u8),
}

impl From<BufferError> for GraphError {
    fn from(err: BufferError) -> Self {
        match err {
            BufferError::EndOfBuffer => GraphError::UnexpectedEof,
            BufferError::InvalidUtf8 => GraphError::InvalidUtf8,
        }
    }
}
