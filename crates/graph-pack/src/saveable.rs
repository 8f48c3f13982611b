//! The capability every persisted entity implements.

use std::any::Any;

use crate::FieldValue;

/// Upcast helper so `dyn Saveable` can be downcast to its concrete type.
///
/// Blanket-implemented for every `'static` type; implementors of
/// [`Saveable`] never write this by hand.
pub trait AsAny: Any {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// An object that can be written to and rebuilt from a graph stream.
///
/// Implementors emit their state in [`save`](Saveable::save) and receive it
/// back, field by field, in [`apply_field`](Saveable::apply_field). A blank
/// instance is produced by the factory registered for its class id in the
/// [`TypeRegistry`](crate::TypeRegistry).
///
/// ```
/// use graph_pack::{FieldValue, FieldWriter, Saveable};
///
/// #[derive(Default)]
/// struct Marker {
///     time: f64,
/// }
///
/// impl Saveable for Marker {
///     fn class_id(&self) -> &str {
///         "Marker"
///     }
///
///     fn save(&self, out: &mut FieldWriter) {
///         out.write("time", self.time);
///     }
///
///     fn apply_field(&mut self, name: &str, value: FieldValue) {
///         match (name, value) {
///             ("time", FieldValue::Double(v)) => self.time = v,
///             _ => {}
///         }
///     }
/// }
/// ```
pub trait Saveable: AsAny {
    /// Stable type identifier, independent of the Rust type name.
    fn class_id(&self) -> &str;

    /// Coarse cost/weight hint for callers. Not used by the codec.
    fn approx_size(&self) -> usize {
        1
    }

    /// Emits this object's fields.
    fn save(&self, out: &mut FieldWriter);

    /// Applies one decoded field. Names the type does not know are ignored.
    fn apply_field(&mut self, name: &str, value: FieldValue) {
        let _ = (name, value);
    }

    /// Called once the whole stream has been read and every reference,
    /// including forward ones, has been applied.
    fn on_reading_ended(&mut self) {}
}

/// Collects the `(name, value)` pairs an object emits in [`Saveable::save`].
#[derive(Debug, Default)]
pub struct FieldWriter {
    fields: Vec<(String, FieldValue)>,
}

impl FieldWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Emits a field unconditionally.
    pub fn write(&mut self, name: impl Into<String>, value: impl Into<FieldValue>) {
        self.fields.push((name.into(), value.into()));
    }

    /// Emits a field unless it holds its default value and `force` is off.
    ///
    /// Readers leave skipped fields at whatever the blank instance holds, so
    /// this is only correct when the blank instance uses the same defaults.
    pub fn write_maybe(&mut self, name: impl Into<String>, value: impl Into<FieldValue>, force: bool) {
        let value = value.into();
        if force || !value.is_default() {
            self.fields.push((name.into(), value));
        }
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn into_fields(self) -> Vec<(String, FieldValue)> {
        self.fields
    }
}

/// Runs `save` on `obj` and returns what it emitted.
pub(crate) fn collect_fields(obj: &dyn Saveable) -> Vec<(String, FieldValue)> {
    let mut out = FieldWriter::new();
    obj.save(&mut out);
    out.into_fields()
}
