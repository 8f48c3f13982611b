//! Binary graph decoder.

use graph_pack_buffers::Reader;

use super::refs::{PendingValue, PointerTable, Slot};
use super::schema::{SchemaCache, SchemaRef};
use super::strings::StringTable;
use crate::constants::{TypeTag, LIST_CONTINUE, LIST_END};
use crate::error::{Corruption, GraphError};
use crate::{DynamicObject, FieldValue, ObjectRef, ReaderOptions, TypeRegistry, UnknownClassPolicy};

/// A field payload straight off the wire.
enum Decoded {
    Value(FieldValue),
    /// Object-bearing payload that goes through the pointer table.
    Refs(PendingValue),
}

/// Rebuilds an object graph from one stream.
///
/// The reader is consumed by [`read_object`](Self::read_object) or
/// [`read_all_in_list`](Self::read_all_in_list); each stream carries its own
/// string, schema and pointer tables.
///
/// # Example
///
/// ```
/// use graph_pack::{DynamicObject, GraphReader, GraphWriter, ObjectRef, TypeRegistry};
///
/// let mut note = DynamicObject::new("Note");
/// note.insert("text", "hello");
/// let bytes = GraphWriter::new().write_object(&ObjectRef::new(note)).unwrap();
///
/// let mut registry = TypeRegistry::new();
/// registry.register("Note", || ObjectRef::new(DynamicObject::new("Note")));
/// let root = GraphReader::new(&bytes, &registry).read_object().unwrap();
/// assert_eq!(root.class_id(), "Note");
/// ```
pub struct GraphReader<'a> {
    reader: Reader<'a>,
    registry: &'a TypeRegistry,
    options: ReaderOptions,
    strings: StringTable,
    schemas: SchemaCache,
    table: PointerTable,
    depth: usize,
}

impl<'a> GraphReader<'a> {
    pub fn new(bytes: &'a [u8], registry: &'a TypeRegistry) -> Self {
        Self::with_options(bytes, registry, ReaderOptions::default())
    }

    pub fn with_options(bytes: &'a [u8], registry: &'a TypeRegistry, options: ReaderOptions) -> Self {
        Self {
            reader: Reader::new(bytes),
            registry,
            options,
            strings: StringTable::new(),
            schemas: SchemaCache::new(),
            table: PointerTable::new(),
            depth: 0,
        }
    }

    /// Reads a stream holding a single root record.
    pub fn read_object(mut self) -> Result<ObjectRef, GraphError> {
        let root = self.read_record()?;
        self.end()?;
        Ok(root)
    }

    /// Reads a stream holding a root list.
    pub fn read_all_in_list(mut self) -> Result<Vec<ObjectRef>, GraphError> {
        let marker = self.reader.u8()?;
        if marker != TypeTag::ObjectList.as_u8() {
            return Err(Corruption::MissingListMarker(marker).into());
        }
        let mut roots = Vec::new();
        loop {
            match self.reader.u8()? {
                LIST_END => break,
                LIST_CONTINUE => {}
                other => return Err(GraphError::InvalidListTerminator(other)),
            }
            let tag = self.reader.u8()?;
            let slot = match TypeTag::from_u8(tag) {
                Some(TypeTag::ObjectImpl) => Slot::Ready(Some(self.read_record()?)),
                Some(TypeTag::ObjectPtr) => {
                    let id = self.reader.i32()?;
                    self.table.slot(id)
                }
                _ => return Err(Corruption::UnexpectedObjectTag(tag).into()),
            };
            roots.push(slot);
        }
        self.table.check_complete()?;
        let roots = roots
            .into_iter()
            .map(|slot| self.table.resolve_root(slot))
            .collect::<Result<Vec<_>, _>>()?;
        self.end()?;
        Ok(roots)
    }

    fn end(&mut self) -> Result<(), GraphError> {
        self.table.check_complete()?;
        log::debug!(
            "read {} objects, {} strings, {} schema entries from {} bytes",
            self.table.len(),
            self.strings.len(),
            self.schemas.len(),
            self.reader.x
        );
        for obj in self.table.objects() {
            obj.borrow_mut().on_reading_ended();
        }
        Ok(())
    }

    fn instantiate(&self, class_id: &str) -> Result<ObjectRef, GraphError> {
        if let Some(obj) = self.registry.create(class_id) {
            return Ok(obj);
        }
        match self.options.unknown_classes {
            UnknownClassPolicy::Reject => Err(GraphError::UnknownClass(class_id.to_owned())),
            UnknownClassPolicy::Dynamic => {
                log::warn!("class `{class_id}` is not registered, reading it as a dynamic object");
                Ok(ObjectRef::new(DynamicObject::new(class_id)))
            }
        }
    }

    /// Class string, then the rest of the record.
    fn read_record(&mut self) -> Result<ObjectRef, GraphError> {
        let class_id = self
            .strings
            .read(&mut self.reader)?
            .ok_or(GraphError::CorruptStream(Corruption::NullClassId))?;
        self.read_record_body(class_id)
    }

    /// Object id, fields, end marker.
    fn read_record_body(&mut self, class_id: String) -> Result<ObjectRef, GraphError> {
        if self.depth >= self.options.max_depth {
            return Err(GraphError::DepthLimitExceeded(self.options.max_depth));
        }
        self.depth += 1;
        let instance = self.instantiate(&class_id)?;
        let id = self.reader.i32()?;
        self.table.reserve(id, instance.clone())?;
        loop {
            let field = match self.schemas.read(&class_id, &mut self.reader, &mut self.strings)? {
                SchemaRef::End => break,
                SchemaRef::Field(field) => field,
            };
            match self.read_value(field.tag)? {
                Decoded::Value(value) => instance.borrow_mut().apply_field(&field.name, value),
                Decoded::Refs(value) => self.table.apply_or_defer(&instance, field.name, value)?,
            }
        }
        self.table.finish(id)?;
        self.depth -= 1;
        Ok(instance)
    }

    /// Only object-bearing tags recurse. Every other tag is decoded out of
    /// line in [`read_plain`](Self::read_plain), keeping this frame small.
    fn read_value(&mut self, tag: TypeTag) -> Result<Decoded, GraphError> {
        use TypeTag as T;
        let pending = match tag {
            T::ObjectImpl => PendingValue::Object(Slot::Ready(Some(self.read_record()?))),
            T::ObjectPtr => {
                let id = self.reader.i32()?;
                PendingValue::Object(self.table.slot(id))
            }
            T::ObjectArray => PendingValue::Array(self.object_array()?),
            T::ObjectArray2D => PendingValue::Array2D(self.array(4, Self::object_array)?),
            T::ObjectsHomogeneousArray => {
                let class_id = self
                    .string()?
                    .ok_or(GraphError::CorruptStream(Corruption::NullClassId))?;
                let items = self.array(1, |r| r.element(Some(&class_id)))?;
                PendingValue::Homogeneous { class_id, items }
            }
            other => return self.read_plain(other).map(Decoded::Value),
        };
        Ok(Decoded::Refs(pending))
    }

    #[inline(never)]
    fn read_plain(&mut self, tag: TypeTag) -> Result<FieldValue, GraphError> {
        use TypeTag as T;
        let value = match tag {
            T::Bool => FieldValue::Bool(self.bool()?),
            T::BoolArray => FieldValue::BoolArray(self.array(1, Self::bool)?),
            T::BoolArray2D => FieldValue::BoolArray2D(self.array(4, |r| r.array(1, Self::bool))?),
            T::Byte => FieldValue::Byte(self.reader.i8()?),
            T::ByteArray => FieldValue::ByteArray(self.array(1, |r| Ok(r.reader.i8()?))?),
            T::ByteArray2D => {
                FieldValue::ByteArray2D(self.array(4, |r| r.array(1, |r| Ok(r.reader.i8()?)))?)
            }
            T::Short => FieldValue::Short(self.reader.i16()?),
            T::ShortArray => FieldValue::ShortArray(self.array(2, |r| Ok(r.reader.i16()?))?),
            T::ShortArray2D => {
                FieldValue::ShortArray2D(self.array(4, |r| r.array(2, |r| Ok(r.reader.i16()?)))?)
            }
            T::Int => FieldValue::Int(self.reader.i32()?),
            T::IntArray => FieldValue::IntArray(self.array(4, |r| Ok(r.reader.i32()?))?),
            T::IntArray2D => {
                FieldValue::IntArray2D(self.array(4, |r| r.array(4, |r| Ok(r.reader.i32()?)))?)
            }
            T::Long => FieldValue::Long(self.reader.i64()?),
            T::LongArray => FieldValue::LongArray(self.array(8, |r| Ok(r.reader.i64()?))?),
            T::LongArray2D => {
                FieldValue::LongArray2D(self.array(4, |r| r.array(8, |r| Ok(r.reader.i64()?)))?)
            }
            T::Float => FieldValue::Float(self.reader.f32()?),
            T::FloatArray => FieldValue::FloatArray(self.array(4, |r| Ok(r.reader.f32()?))?),
            T::FloatArray2D => {
                FieldValue::FloatArray2D(self.array(4, |r| r.array(4, |r| Ok(r.reader.f32()?)))?)
            }
            T::Double => FieldValue::Double(self.reader.f64()?),
            T::DoubleArray => FieldValue::DoubleArray(self.array(8, |r| Ok(r.reader.f64()?))?),
            T::DoubleArray2D => {
                FieldValue::DoubleArray2D(self.array(4, |r| r.array(8, |r| Ok(r.reader.f64()?)))?)
            }
            T::String => FieldValue::String(self.string()?),
            T::StringArray => FieldValue::StringArray(self.array(4, Self::string)?),
            T::StringArray2D => {
                FieldValue::StringArray2D(self.array(4, |r| r.array(4, Self::string))?)
            }

            T::Vector2F => FieldValue::Vector2F(self.floats()?),
            T::Vector3F => FieldValue::Vector3F(self.floats()?),
            T::Vector4F => FieldValue::Vector4F(self.floats()?),
            T::Vector2D => FieldValue::Vector2D(self.doubles()?),
            T::Vector3D => FieldValue::Vector3D(self.doubles()?),
            T::Vector4D => FieldValue::Vector4D(self.doubles()?),
            T::Vector2FArray => FieldValue::Vector2FArray(self.array(8, Self::floats)?),
            T::Vector3FArray => FieldValue::Vector3FArray(self.array(12, Self::floats)?),
            T::Vector4FArray => FieldValue::Vector4FArray(self.array(16, Self::floats)?),
            T::Vector2DArray => FieldValue::Vector2DArray(self.array(16, Self::doubles)?),
            T::Vector3DArray => FieldValue::Vector3DArray(self.array(24, Self::doubles)?),
            T::Vector4DArray => FieldValue::Vector4DArray(self.array(32, Self::doubles)?),

            T::Matrix3x3F => FieldValue::Matrix3x3F(self.floats()?),
            T::Matrix4x3F => FieldValue::Matrix4x3F(self.floats()?),
            T::Matrix4x4F => FieldValue::Matrix4x4F(self.floats()?),

            T::ObjectNull => FieldValue::Object(None),
            T::ObjectImpl
            | T::ObjectPtr
            | T::ObjectArray
            | T::ObjectArray2D
            | T::ObjectsHomogeneousArray
            | T::ObjectList => {
                return Err(GraphError::UnknownTypeTag {
                    tag: tag.as_u8(),
                    offset: self.reader.x,
                })
            }
        };
        Ok(value)
    }

    /// Reads an `i32` length prefix and `len` elements. Capacity is capped by
    /// what the remaining bytes could hold at `min_size` bytes per element.
    fn array<T>(
        &mut self,
        min_size: usize,
        mut element: impl FnMut(&mut Self) -> Result<T, GraphError>,
    ) -> Result<Vec<T>, GraphError> {
        let len = self.reader.i32()?;
        if len < 0 {
            return Err(Corruption::NegativeLength(len).into());
        }
        let len = len as usize;
        let mut out = Vec::with_capacity(len.min(self.reader.size() / min_size.max(1)));
        for _ in 0..len {
            out.push(element(&mut *self)?);
        }
        Ok(out)
    }

    fn bool(&mut self) -> Result<bool, GraphError> {
        Ok(self.reader.u8()? != 0)
    }

    fn string(&mut self) -> Result<Option<String>, GraphError> {
        self.strings.read(&mut self.reader)
    }

    fn floats<const N: usize>(&mut self) -> Result<[f32; N], GraphError> {
        let mut out = [0.0; N];
        for v in &mut out {
            *v = self.reader.f32()?;
        }
        Ok(out)
    }

    fn doubles<const N: usize>(&mut self) -> Result<[f64; N], GraphError> {
        let mut out = [0.0; N];
        for v in &mut out {
            *v = self.reader.f64()?;
        }
        Ok(out)
    }

    fn object_array(&mut self) -> Result<Vec<Slot>, GraphError> {
        self.array(1, |r| r.element(None))
    }

    /// One tagged element of an object array. Inline elements of a
    /// homogeneous array carry no class string.
    fn element(&mut self, class_id: Option<&str>) -> Result<Slot, GraphError> {
        let tag = self.reader.u8()?;
        match TypeTag::from_u8(tag) {
            Some(TypeTag::ObjectNull) => Ok(Slot::Ready(None)),
            Some(TypeTag::ObjectPtr) => {
                let id = self.reader.i32()?;
                Ok(self.table.slot(id))
            }
            Some(TypeTag::ObjectImpl) => {
                let obj = match class_id {
                    Some(class_id) => self.read_record_body(class_id.to_owned())?,
                    None => self.read_record()?,
                };
                Ok(Slot::Ready(Some(obj)))
            }
            _ => Err(Corruption::UnexpectedObjectTag(tag).into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{END_OF_OBJECT, SCHEMA_NEW};
    use graph_pack_buffers::Writer;

    fn registry() -> TypeRegistry {
        let mut registry = TypeRegistry::new();
        registry.register("N", || ObjectRef::new(DynamicObject::new("N")));
        registry
    }

    /// `N` record header: new class string "N", then `id`.
    fn header(writer: &mut Writer, first: bool, id: i32) {
        if first {
            writer.i32(-3);
            writer.utf8("N");
        } else {
            writer.i32(0);
        }
        writer.i32(id);
    }

    #[test]
    fn empty_record() {
        let mut writer = Writer::new();
        header(&mut writer, true, 0);
        writer.i32(END_OF_OBJECT);
        let bytes = writer.flush();
        let registry = registry();
        let root = GraphReader::new(&bytes, &registry).read_object().unwrap();
        assert_eq!(root.downcast_ref::<DynamicObject>().unwrap().len(), 0);
    }

    #[test]
    fn forward_pointer_is_patched() {
        // N#0 { next: ptr 1, child: impl N#1 {} }
        let mut writer = Writer::new();
        header(&mut writer, true, 0);
        writer.i32(SCHEMA_NEW);
        writer.i32(-6);
        writer.utf8("next");
        writer.u8(TypeTag::ObjectPtr.as_u8());
        writer.i32(1);
        writer.i32(SCHEMA_NEW);
        writer.i32(-7);
        writer.utf8("child");
        writer.u8(TypeTag::ObjectImpl.as_u8());
        header(&mut writer, false, 1);
        writer.i32(END_OF_OBJECT);
        writer.i32(END_OF_OBJECT);
        let bytes = writer.flush();

        let registry = registry();
        let root = GraphReader::new(&bytes, &registry).read_object().unwrap();
        let root = root.downcast_ref::<DynamicObject>().unwrap();
        let next = root.get("next").cloned().unwrap().into_object().unwrap();
        let child = root.get("child").cloned().unwrap().into_object().unwrap();
        assert!(next.ptr_eq(&child));
    }

    #[test]
    fn negative_length_is_rejected() {
        let mut writer = Writer::new();
        header(&mut writer, true, 0);
        writer.i32(SCHEMA_NEW);
        writer.i32(-3);
        writer.utf8("v");
        writer.u8(TypeTag::IntArray.as_u8());
        writer.i32(-5);
        let bytes = writer.flush();
        let registry = registry();
        let err = GraphReader::new(&bytes, &registry).read_object().unwrap_err();
        assert_eq!(err, GraphError::CorruptStream(Corruption::NegativeLength(-5)));
    }

    #[test]
    fn forged_length_does_not_preallocate() {
        let mut writer = Writer::new();
        header(&mut writer, true, 0);
        writer.i32(SCHEMA_NEW);
        writer.i32(-3);
        writer.utf8("v");
        writer.u8(TypeTag::LongArray.as_u8());
        writer.i32(i32::MAX);
        writer.i64(1);
        let bytes = writer.flush();
        let registry = registry();
        let err = GraphReader::new(&bytes, &registry).read_object().unwrap_err();
        assert_eq!(err, GraphError::UnexpectedEof);
    }

    #[test]
    fn null_class_id() {
        let bytes = (-1i32).to_be_bytes();
        let registry = registry();
        let err = GraphReader::new(&bytes, &registry).read_object().unwrap_err();
        assert_eq!(err, GraphError::CorruptStream(Corruption::NullClassId));
    }

    #[test]
    fn list_needs_marker() {
        let bytes = [LIST_END];
        let registry = registry();
        let err = GraphReader::new(&bytes, &registry).read_all_in_list().unwrap_err();
        assert_eq!(err, GraphError::CorruptStream(Corruption::MissingListMarker(LIST_END)));
    }

    #[test]
    fn empty_list() {
        let bytes = [TypeTag::ObjectList.as_u8(), LIST_END];
        let registry = registry();
        let roots = GraphReader::new(&bytes, &registry).read_all_in_list().unwrap();
        assert!(roots.is_empty());
    }
}
