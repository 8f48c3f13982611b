//! Binary graph encoder.

use std::collections::HashMap;

use graph_pack_buffers::Writer;

use super::schema::SchemaIndex;
use super::strings::StringInterner;
use crate::constants::{TypeTag, END_OF_OBJECT, LIST_CONTINUE, LIST_END};
use crate::error::GraphError;
use crate::saveable::collect_fields;
use crate::{FieldValue, ObjectRef, WriterOptions};

/// Serializes an object graph into one stream.
///
/// Objects are assigned ids in the order they are first written; every later
/// occurrence becomes a pointer, so shared objects and cycles are written
/// exactly once.
pub struct GraphWriter {
    writer: Writer,
    options: WriterOptions,
    strings: StringInterner,
    schemas: SchemaIndex,
    ids: HashMap<*const (), i32>,
    /// Holds every written object so no address is reused mid-stream.
    keep_alive: Vec<ObjectRef>,
    depth: usize,
}

impl Default for GraphWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphWriter {
    pub fn new() -> Self {
        Self::with_options(WriterOptions::default())
    }

    pub fn with_options(options: WriterOptions) -> Self {
        Self {
            writer: Writer::new(),
            options,
            strings: StringInterner::new(),
            schemas: SchemaIndex::new(),
            ids: HashMap::new(),
            keep_alive: Vec::new(),
            depth: 0,
        }
    }

    /// Writes a single-root stream.
    pub fn write_object(mut self, root: &ObjectRef) -> Result<Vec<u8>, GraphError> {
        self.write_record(root, "root", true)?;
        Ok(self.finish())
    }

    /// Writes a root-list stream. A root that also appears earlier in the
    /// list, or inside an earlier root, is written as a pointer.
    pub fn write_all_in_list(mut self, roots: &[ObjectRef]) -> Result<Vec<u8>, GraphError> {
        self.writer.u8(TypeTag::ObjectList.as_u8());
        for root in roots {
            self.writer.u8(LIST_CONTINUE);
            if let Some(id) = self.id_of(root) {
                self.writer.u8(TypeTag::ObjectPtr.as_u8());
                self.writer.i32(id);
            } else {
                self.writer.u8(TypeTag::ObjectImpl.as_u8());
                self.write_record(root, "root", true)?;
            }
        }
        self.writer.u8(LIST_END);
        Ok(self.finish())
    }

    fn finish(mut self) -> Vec<u8> {
        let bytes = self.writer.flush();
        log::debug!(
            "wrote {} objects, {} strings, {} schema entries in {} bytes",
            self.keep_alive.len(),
            self.strings.len(),
            self.schemas.len(),
            bytes.len()
        );
        bytes
    }

    fn id_of(&self, obj: &ObjectRef) -> Option<i32> {
        self.ids.get(&obj.addr()).copied()
    }

    fn assign_id(&mut self, obj: &ObjectRef) -> Result<i32, GraphError> {
        let id = i32::try_from(self.ids.len()).map_err(|_| GraphError::LengthOverflow("object table"))?;
        self.ids.insert(obj.addr(), id);
        self.keep_alive.push(obj.clone());
        Ok(id)
    }

    /// Writes `obj` inline: optional class string, id, fields, end marker.
    fn write_record(&mut self, obj: &ObjectRef, at: &str, with_class: bool) -> Result<(), GraphError> {
        if self.depth >= self.options.max_depth {
            return Err(GraphError::DepthLimitExceeded(self.options.max_depth));
        }
        let (class_id, fields) = {
            let guard = obj
                .try_borrow()
                .map_err(|_| GraphError::ObjectBorrowed(at.to_owned()))?;
            (guard.class_id().to_owned(), collect_fields(&*guard))
        };
        self.depth += 1;
        let id = self.assign_id(obj)?;
        if with_class {
            self.strings.write(&mut self.writer, Some(&class_id))?;
        }
        self.writer.i32(id);
        for (name, value) in fields {
            self.write_field(&class_id, &name, value)?;
        }
        self.writer.i32(END_OF_OBJECT);
        self.depth -= 1;
        Ok(())
    }

    fn write_field(&mut self, class_id: &str, name: &str, value: FieldValue) -> Result<(), GraphError> {
        let tag = match &value {
            FieldValue::Object(Some(obj)) if self.id_of(obj).is_some() => TypeTag::ObjectPtr,
            other => other.tag(),
        };
        self.schemas
            .write(&mut self.writer, &mut self.strings, class_id, name, tag)?;
        self.write_value(name, value)
    }

    /// Only object-bearing values recurse. Every other value is written out
    /// of line in [`write_plain`](Self::write_plain), keeping this frame small.
    fn write_value(&mut self, name: &str, value: FieldValue) -> Result<(), GraphError> {
        match value {
            FieldValue::Object(None) => {}
            FieldValue::Object(Some(obj)) => match self.id_of(&obj) {
                Some(id) => self.writer.i32(id),
                None => self.write_record(&obj, name, true)?,
            },
            FieldValue::ObjectArray(items) => {
                self.try_array(&items, |w, item| w.element(item, name, None))?
            }
            FieldValue::ObjectArray2D(rows) => self.try_array(&rows, |w, row| {
                w.try_array(row, |w, item| w.element(item, name, None))
            })?,
            FieldValue::HomogeneousObjectArray { class_id, items } => {
                self.strings.write(&mut self.writer, Some(&class_id))?;
                self.try_array(&items, |w, item| w.element(item, name, Some(class_id.as_str())))?
            }
            other => self.write_plain(name, other)?,
        }
        Ok(())
    }

    #[inline(never)]
    fn write_plain(&mut self, name: &str, value: FieldValue) -> Result<(), GraphError> {
        match value {
            FieldValue::Bool(v) => self.writer.u8(v as u8),
            FieldValue::BoolArray(v) => self.array(&v, |w, v| w.writer.u8(*v as u8))?,
            FieldValue::BoolArray2D(v) => {
                self.try_array(&v, |w, row| w.array(row, |w, v| w.writer.u8(*v as u8)))?
            }
            FieldValue::Byte(v) => self.writer.i8(v),
            FieldValue::ByteArray(v) => self.array(&v, |w, v| w.writer.i8(*v))?,
            FieldValue::ByteArray2D(v) => {
                self.try_array(&v, |w, row| w.array(row, |w, v| w.writer.i8(*v)))?
            }
            FieldValue::Short(v) => self.writer.i16(v),
            FieldValue::ShortArray(v) => self.array(&v, |w, v| w.writer.i16(*v))?,
            FieldValue::ShortArray2D(v) => {
                self.try_array(&v, |w, row| w.array(row, |w, v| w.writer.i16(*v)))?
            }
            FieldValue::Int(v) => self.writer.i32(v),
            FieldValue::IntArray(v) => self.array(&v, |w, v| w.writer.i32(*v))?,
            FieldValue::IntArray2D(v) => {
                self.try_array(&v, |w, row| w.array(row, |w, v| w.writer.i32(*v)))?
            }
            FieldValue::Long(v) => self.writer.i64(v),
            FieldValue::LongArray(v) => self.array(&v, |w, v| w.writer.i64(*v))?,
            FieldValue::LongArray2D(v) => {
                self.try_array(&v, |w, row| w.array(row, |w, v| w.writer.i64(*v)))?
            }
            FieldValue::Float(v) => self.writer.f32(v),
            FieldValue::FloatArray(v) => self.array(&v, |w, v| w.writer.f32(*v))?,
            FieldValue::FloatArray2D(v) => {
                self.try_array(&v, |w, row| w.array(row, |w, v| w.writer.f32(*v)))?
            }
            FieldValue::Double(v) => self.writer.f64(v),
            FieldValue::DoubleArray(v) => self.array(&v, |w, v| w.writer.f64(*v))?,
            FieldValue::DoubleArray2D(v) => {
                self.try_array(&v, |w, row| w.array(row, |w, v| w.writer.f64(*v)))?
            }
            FieldValue::String(v) => self.string(&v)?,
            FieldValue::StringArray(v) => self.try_array(&v, Self::string)?,
            FieldValue::StringArray2D(v) => self.try_array(&v, |w, row| w.try_array(row, Self::string))?,

            FieldValue::Vector2F(v) => self.floats(&v),
            FieldValue::Vector3F(v) => self.floats(&v),
            FieldValue::Vector4F(v) => self.floats(&v),
            FieldValue::Vector2D(v) => self.doubles(&v),
            FieldValue::Vector3D(v) => self.doubles(&v),
            FieldValue::Vector4D(v) => self.doubles(&v),
            FieldValue::Vector2FArray(v) => self.array(&v, |w, v| w.floats(v))?,
            FieldValue::Vector3FArray(v) => self.array(&v, |w, v| w.floats(v))?,
            FieldValue::Vector4FArray(v) => self.array(&v, |w, v| w.floats(v))?,
            FieldValue::Vector2DArray(v) => self.array(&v, |w, v| w.doubles(v))?,
            FieldValue::Vector3DArray(v) => self.array(&v, |w, v| w.doubles(v))?,
            FieldValue::Vector4DArray(v) => self.array(&v, |w, v| w.doubles(v))?,

            FieldValue::Matrix3x3F(v) => self.floats(&v),
            FieldValue::Matrix4x3F(v) => self.floats(&v),
            FieldValue::Matrix4x4F(v) => self.floats(&v),

            object @ (FieldValue::Object(_)
            | FieldValue::ObjectArray(_)
            | FieldValue::ObjectArray2D(_)
            | FieldValue::HomogeneousObjectArray { .. }) => self.write_value(name, object)?,
        }
        Ok(())
    }

    fn array<T>(&mut self, items: &[T], mut element: impl FnMut(&mut Self, &T)) -> Result<(), GraphError> {
        self.try_array(items, |w, item| {
            element(w, item);
            Ok(())
        })
    }

    fn try_array<T>(
        &mut self,
        items: &[T],
        mut element: impl FnMut(&mut Self, &T) -> Result<(), GraphError>,
    ) -> Result<(), GraphError> {
        let len = i32::try_from(items.len()).map_err(|_| GraphError::LengthOverflow("array"))?;
        self.writer.i32(len);
        for item in items {
            element(&mut *self, item)?;
        }
        Ok(())
    }

    fn string(&mut self, value: &Option<String>) -> Result<(), GraphError> {
        self.strings.write(&mut self.writer, value.as_deref())
    }

    fn floats(&mut self, values: &[f32]) {
        for v in values {
            self.writer.f32(*v);
        }
    }

    fn doubles(&mut self, values: &[f64]) {
        for v in values {
            self.writer.f64(*v);
        }
    }

    /// One tagged element of an object array. When `class_id` is set the
    /// array is homogeneous and inline elements omit their class string.
    fn element(
        &mut self,
        item: &Option<ObjectRef>,
        at: &str,
        class_id: Option<&str>,
    ) -> Result<(), GraphError> {
        let Some(obj) = item else {
            self.writer.u8(TypeTag::ObjectNull.as_u8());
            return Ok(());
        };
        if let Some(expected) = class_id {
            let found = obj
                .try_borrow()
                .map_err(|_| GraphError::ObjectBorrowed(at.to_owned()))?
                .class_id()
                .to_owned();
            if found != expected {
                return Err(GraphError::HeterogeneousArray {
                    expected: expected.to_owned(),
                    found,
                });
            }
        }
        match self.id_of(obj) {
            Some(id) => {
                self.writer.u8(TypeTag::ObjectPtr.as_u8());
                self.writer.i32(id);
            }
            None => {
                self.writer.u8(TypeTag::ObjectImpl.as_u8());
                self.write_record(obj, at, class_id.is_none())?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DynamicObject;

    #[test]
    fn single_empty_record_layout() {
        let root = ObjectRef::new(DynamicObject::new("N"));
        let bytes = GraphWriter::new().write_object(&root).unwrap();
        assert_eq!(
            bytes,
            vec![0xff, 0xff, 0xff, 0xfd, b'N', 0, 0, 0, 0, 0xff, 0xff, 0xff, 0xfe]
        );
    }

    #[test]
    fn repeated_root_in_list_is_a_pointer() {
        let root = ObjectRef::new(DynamicObject::new("N"));
        let bytes = GraphWriter::new()
            .write_all_in_list(&[root.clone(), root])
            .unwrap();
        let tail = &bytes[bytes.len() - 7..];
        assert_eq!(tail, &[LIST_CONTINUE, TypeTag::ObjectPtr.as_u8(), 0, 0, 0, 0, LIST_END]);
    }

    #[test]
    fn mutably_borrowed_object_is_reported() {
        let root = ObjectRef::new(DynamicObject::new("N"));
        let _guard = root.borrow_mut();
        let err = GraphWriter::new().write_object(&root).unwrap_err();
        assert_eq!(err, GraphError::ObjectBorrowed("root".into()));
    }

    #[test]
    fn homogeneous_array_rejects_other_classes() {
        let mut holder = DynamicObject::new("Holder");
        holder.insert(
            "items",
            FieldValue::HomogeneousObjectArray {
                class_id: "A".into(),
                items: vec![
                    Some(ObjectRef::new(DynamicObject::new("A"))),
                    Some(ObjectRef::new(DynamicObject::new("B"))),
                ],
            },
        );
        let err = GraphWriter::new()
            .write_object(&ObjectRef::new(holder))
            .unwrap_err();
        assert_eq!(
            err,
            GraphError::HeterogeneousArray {
                expected: "A".into(),
                found: "B".into(),
            }
        );
    }
}
