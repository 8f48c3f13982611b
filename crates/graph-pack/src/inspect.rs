//! JSON rendering of object graphs for diagnostics.
//!
//! Each object is rendered once as `{"$class": .., "$id": .., <fields>}`;
//! later occurrences become `{"$ref": id}`. Ids are assigned in traversal
//! order, which matches the order the binary writer would use.

use std::collections::HashMap;

use serde_json::{Map, Value};

use crate::saveable::collect_fields;
use crate::{FieldValue, ObjectRef};

/// Renders a forest as a JSON array, one entry per root.
pub fn graph_to_json(roots: &[ObjectRef]) -> Value {
    let mut ctx = Renderer::default();
    Value::Array(roots.iter().map(|root| ctx.object(root)).collect())
}

#[derive(Default)]
struct Renderer {
    ids: HashMap<*const (), usize>,
    /// Keeps rendered objects alive so their addresses stay unique.
    seen: Vec<ObjectRef>,
}

impl Renderer {
    fn object(&mut self, obj: &ObjectRef) -> Value {
        if let Some(id) = self.ids.get(&obj.addr()) {
            return ref_value(*id);
        }
        let Ok(guard) = obj.try_borrow() else {
            let mut map = Map::new();
            map.insert("$borrowed".into(), Value::Bool(true));
            return Value::Object(map);
        };
        let class_id = guard.class_id().to_owned();
        let fields = collect_fields(&*guard);
        drop(guard);

        let id = self.seen.len();
        self.ids.insert(obj.addr(), id);
        self.seen.push(obj.clone());

        let mut map = Map::new();
        map.insert("$class".into(), Value::String(class_id));
        map.insert("$id".into(), Value::from(id));
        for (name, value) in fields {
            let value = self.value(value);
            map.insert(name, value);
        }
        Value::Object(map)
    }

    fn slot(&mut self, item: Option<ObjectRef>) -> Value {
        match item {
            Some(obj) => self.object(&obj),
            None => Value::Null,
        }
    }

    fn slots(&mut self, items: Vec<Option<ObjectRef>>) -> Value {
        items.into_iter().map(|item| self.slot(item)).collect()
    }

    fn value(&mut self, value: FieldValue) -> Value {
        match value {
            FieldValue::Bool(v) => v.into(),
            FieldValue::BoolArray(v) => v.into(),
            FieldValue::BoolArray2D(v) => v.into(),
            FieldValue::Byte(v) => v.into(),
            FieldValue::ByteArray(v) => v.into(),
            FieldValue::ByteArray2D(v) => v.into(),
            FieldValue::Short(v) => v.into(),
            FieldValue::ShortArray(v) => v.into(),
            FieldValue::ShortArray2D(v) => v.into(),
            FieldValue::Int(v) => v.into(),
            FieldValue::IntArray(v) => v.into(),
            FieldValue::IntArray2D(v) => v.into(),
            FieldValue::Long(v) => v.into(),
            FieldValue::LongArray(v) => v.into(),
            FieldValue::LongArray2D(v) => v.into(),
            FieldValue::Float(v) => v.into(),
            FieldValue::FloatArray(v) => v.into(),
            FieldValue::FloatArray2D(v) => v.into(),
            FieldValue::Double(v) => v.into(),
            FieldValue::DoubleArray(v) => v.into(),
            FieldValue::DoubleArray2D(v) => v.into(),
            FieldValue::String(v) => v.into(),
            FieldValue::StringArray(v) => v.into(),
            FieldValue::StringArray2D(v) => v.into(),
            FieldValue::Vector2F(v) => floats(&v),
            FieldValue::Vector3F(v) => floats(&v),
            FieldValue::Vector4F(v) => floats(&v),
            FieldValue::Vector2D(v) => doubles(&v),
            FieldValue::Vector3D(v) => doubles(&v),
            FieldValue::Vector4D(v) => doubles(&v),
            FieldValue::Vector2FArray(v) => v.iter().map(|v| floats(v)).collect(),
            FieldValue::Vector3FArray(v) => v.iter().map(|v| floats(v)).collect(),
            FieldValue::Vector4FArray(v) => v.iter().map(|v| floats(v)).collect(),
            FieldValue::Vector2DArray(v) => v.iter().map(|v| doubles(v)).collect(),
            FieldValue::Vector3DArray(v) => v.iter().map(|v| doubles(v)).collect(),
            FieldValue::Vector4DArray(v) => v.iter().map(|v| doubles(v)).collect(),
            FieldValue::Matrix3x3F(v) => floats(&v),
            FieldValue::Matrix4x3F(v) => floats(&v),
            FieldValue::Matrix4x4F(v) => floats(&v),
            FieldValue::Object(item) => self.slot(item),
            FieldValue::ObjectArray(items) => self.slots(items),
            FieldValue::ObjectArray2D(rows) => rows.into_iter().map(|row| self.slots(row)).collect(),
            FieldValue::HomogeneousObjectArray { items, .. } => self.slots(items),
        }
    }
}

fn ref_value(id: usize) -> Value {
    let mut map = Map::new();
    map.insert("$ref".into(), Value::from(id));
    Value::Object(map)
}

fn floats(values: &[f32]) -> Value {
    values.iter().copied().map(Value::from).collect()
}

fn doubles(values: &[f64]) -> Value {
    values.iter().copied().map(Value::from).collect()
}
