//! Per-stream string interning.
//!
//! Every string in a stream (class ids, field names, string values) goes
//! through one `i32` control word:
//!
//! - `-1` → null
//! - `n >= 0` → the `n`-th string seen so far
//! - `n <= -2` → a new string of `-n - 2` UTF-8 bytes follows and is appended

use std::collections::HashMap;

use graph_pack_buffers::{Reader, Writer};

use crate::constants::{STRING_NEW_OFFSET, STRING_NULL};
use crate::error::{Corruption, GraphError};

/// Reader-side table of strings seen so far.
#[derive(Debug, Default)]
pub struct StringTable {
    strings: Vec<String>,
}

impl StringTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }

    /// Reads one string reference, appending new strings to the table.
    pub fn read(&mut self, reader: &mut Reader<'_>) -> Result<Option<String>, GraphError> {
        let id = reader.i32()?;
        if id == STRING_NULL {
            return Ok(None);
        }
        if id >= 0 {
            return self
                .strings
                .get(id as usize)
                .cloned()
                .map(Some)
                .ok_or(GraphError::CorruptStream(Corruption::StringIndex {
                    index: id,
                    len: self.strings.len(),
                }));
        }
        let size = -(id as i64) - STRING_NEW_OFFSET as i64;
        let value = reader.utf8(size as usize)?.to_owned();
        self.strings.push(value.clone());
        Ok(Some(value))
    }
}

/// Writer-side mirror of [`StringTable`].
#[derive(Debug, Default)]
pub struct StringInterner {
    index: HashMap<String, i32>,
}

impl StringInterner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Writes a string reference, emitting the bytes only on first use.
    pub fn write(&mut self, writer: &mut Writer, value: Option<&str>) -> Result<(), GraphError> {
        let Some(value) = value else {
            writer.i32(STRING_NULL);
            return Ok(());
        };
        if let Some(&id) = self.index.get(value) {
            writer.i32(id);
            return Ok(());
        }
        let size = i32::try_from(value.len())
            .ok()
            .and_then(|len| len.checked_add(STRING_NEW_OFFSET))
            .ok_or(GraphError::LengthOverflow("string"))?;
        let id = i32::try_from(self.index.len()).map_err(|_| GraphError::LengthOverflow("string table"))?;
        writer.i32(-size);
        writer.utf8(value);
        self.index.insert(value.to_owned(), id);
        Ok(())
    }
}
