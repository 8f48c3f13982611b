//! Schema-less stand-in for any class.

use indexmap::IndexMap;

use crate::{FieldValue, FieldWriter, Saveable};

/// An object that keeps every field it is given, in arrival order.
///
/// Writing a `DynamicObject` reproduces the fields it received, so a stream
/// can be read and re-written without knowing its classes.
#[derive(Debug, Clone, PartialEq)]
pub struct DynamicObject {
    class_id: String,
    fields: IndexMap<String, FieldValue>,
}

impl DynamicObject {
    pub fn new(class_id: impl Into<String>) -> Self {
        Self {
            class_id: class_id.into(),
            fields: IndexMap::new(),
        }
    }

    /// Sets a field, replacing an earlier value of the same name in place.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<FieldValue>) {
        self.fields.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<FieldValue> {
        self.fields.shift_remove(name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }
}

impl Saveable for DynamicObject {
    fn class_id(&self) -> &str {
        &self.class_id
    }

    fn approx_size(&self) -> usize {
        self.fields.len().max(1)
    }

    fn save(&self, out: &mut FieldWriter) {
        for (name, value) in &self.fields {
            out.write(name.as_str(), value.clone());
        }
    }

    fn apply_field(&mut self, name: &str, value: FieldValue) {
        self.fields.insert(name.to_owned(), value);
    }
}
