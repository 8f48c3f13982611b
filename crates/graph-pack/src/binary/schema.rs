//! Per-class field schema caches.
//!
//! Each class keeps its own ordered list of `(field name, type tag)` pairs.
//! After the first instance of a class, its fields cost one `i32` each
//! instead of a name and a tag.

use std::collections::HashMap;

use graph_pack_buffers::{Reader, Writer};

use super::strings::{StringInterner, StringTable};
use crate::constants::{TypeTag, SCHEMA_NEW};
use crate::error::{Corruption, GraphError};

/// One cached field layout entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSchema {
    pub name: String,
    pub tag: TypeTag,
}

/// Result of reading a schema reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaRef {
    Field(FieldSchema),
    /// The object's field loop is over.
    End,
}

/// Reader-side schema lists, keyed by class id.
#[derive(Debug, Default)]
pub struct SchemaCache {
    classes: HashMap<String, Vec<FieldSchema>>,
}

impl SchemaCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of entries across all classes.
    pub fn len(&self) -> usize {
        self.classes.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn class_len(&self, class_id: &str) -> usize {
        self.classes.get(class_id).map_or(0, Vec::len)
    }

    /// Reads one schema reference for an object of `class_id`.
    pub fn read(
        &mut self,
        class_id: &str,
        reader: &mut Reader<'_>,
        strings: &mut StringTable,
    ) -> Result<SchemaRef, GraphError> {
        let index = reader.i32()?;
        if index < SCHEMA_NEW {
            return Ok(SchemaRef::End);
        }
        if index >= 0 {
            let entries = self.classes.get(class_id);
            return entries
                .and_then(|entries| entries.get(index as usize))
                .cloned()
                .map(SchemaRef::Field)
                .ok_or_else(|| {
                    Corruption::SchemaIndex {
                        class_id: class_id.to_owned(),
                        index,
                        len: entries.map_or(0, Vec::len),
                    }
                    .into()
                });
        }
        let name = strings
            .read(reader)?
            .ok_or(GraphError::CorruptStream(Corruption::NullFieldName))?;
        let offset = reader.x;
        let byte = reader.u8()?;
        let tag = TypeTag::from_u8(byte).ok_or(GraphError::UnknownTypeTag { tag: byte, offset })?;
        let entry = FieldSchema { name, tag };
        self.classes
            .entry(class_id.to_owned())
            .or_default()
            .push(entry.clone());
        Ok(SchemaRef::Field(entry))
    }
}

/// Writer-side mirror of [`SchemaCache`].
#[derive(Debug, Default)]
pub struct SchemaIndex {
    classes: HashMap<String, HashMap<(String, TypeTag), i32>>,
}

impl SchemaIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of entries across all classes.
    pub fn len(&self) -> usize {
        self.classes.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Writes the schema reference for `name`/`tag` on `class_id`, defining
    /// it on first use.
    pub fn write(
        &mut self,
        writer: &mut Writer,
        strings: &mut StringInterner,
        class_id: &str,
        name: &str,
        tag: TypeTag,
    ) -> Result<(), GraphError> {
        let entries = self.classes.entry(class_id.to_owned()).or_default();
        if let Some(&index) = entries.get(&(name.to_owned(), tag)) {
            writer.i32(index);
            return Ok(());
        }
        let index =
            i32::try_from(entries.len()).map_err(|_| GraphError::LengthOverflow("field schema"))?;
        writer.i32(SCHEMA_NEW);
        strings.write(writer, Some(name))?;
        writer.u8(tag.as_u8());
        entries.insert((name.to_owned(), tag), index);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::END_OF_OBJECT;

    #[test]
    fn indices_are_local_to_each_class() {
        let mut writer = Writer::new();
        let mut strings = StringInterner::new();
        let mut index = SchemaIndex::new();
        index.write(&mut writer, &mut strings, "A", "x", TypeTag::Int).unwrap();
        index.write(&mut writer, &mut strings, "B", "y", TypeTag::Float).unwrap();
        index.write(&mut writer, &mut strings, "A", "x", TypeTag::Int).unwrap();
        index.write(&mut writer, &mut strings, "B", "y", TypeTag::Float).unwrap();
        writer.i32(END_OF_OBJECT);
        let bytes = writer.flush();

        let mut reader = Reader::new(&bytes);
        let mut table = StringTable::new();
        let mut cache = SchemaCache::new();
        let x = SchemaRef::Field(FieldSchema { name: "x".into(), tag: TypeTag::Int });
        let y = SchemaRef::Field(FieldSchema { name: "y".into(), tag: TypeTag::Float });
        assert_eq!(cache.read("A", &mut reader, &mut table).unwrap(), x);
        assert_eq!(cache.read("B", &mut reader, &mut table).unwrap(), y);
        assert_eq!(&bytes[bytes.len() - 12..bytes.len() - 4], &[0, 0, 0, 0, 0, 0, 0, 0]);
        assert_eq!(cache.read("A", &mut reader, &mut table).unwrap(), x);
        assert_eq!(cache.read("B", &mut reader, &mut table).unwrap(), y);
        assert_eq!(cache.read("A", &mut reader, &mut table).unwrap(), SchemaRef::End);
        assert_eq!(cache.class_len("A"), 1);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn same_name_with_another_tag_is_a_new_entry() {
        let mut writer = Writer::new();
        let mut strings = StringInterner::new();
        let mut index = SchemaIndex::new();
        index.write(&mut writer, &mut strings, "A", "child", TypeTag::ObjectImpl).unwrap();
        index.write(&mut writer, &mut strings, "A", "child", TypeTag::ObjectPtr).unwrap();
        assert_eq!(index.len(), 2);
        assert_eq!(strings.len(), 1);
    }

    #[test]
    fn unknown_index_is_corruption() {
        let bytes = 0i32.to_be_bytes();
        let mut reader = Reader::new(&bytes);
        let err = SchemaCache::new()
            .read("A", &mut reader, &mut StringTable::new())
            .unwrap_err();
        assert_eq!(
            err,
            GraphError::CorruptStream(Corruption::SchemaIndex {
                class_id: "A".into(),
                index: 0,
                len: 0,
            })
        );
    }

    #[test]
    fn unknown_tag_in_definition() {
        let mut writer = Writer::new();
        writer.i32(SCHEMA_NEW);
        StringInterner::new().write(&mut writer, Some("f")).unwrap();
        writer.u8(0xee);
        let bytes = writer.flush();
        let mut reader = Reader::new(&bytes);
        let err = SchemaCache::new()
            .read("A", &mut reader, &mut StringTable::new())
            .unwrap_err();
        assert_eq!(err, GraphError::UnknownTypeTag { tag: 0xee, offset: 9 });
    }
}
