//! Field values exchanged between objects and the codec.

use crate::constants::TypeTag;
use crate::ObjectRef;

/// A decoded (or to-be-encoded) field payload, one variant per wire tag
/// family.
///
/// Object-bearing variants carry shared handles; `None` is a null reference.
/// Whether an object is written inline or as a pointer is decided by the
/// writer, not by the value.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Bool(bool),
    BoolArray(Vec<bool>),
    BoolArray2D(Vec<Vec<bool>>),
    Byte(i8),
    ByteArray(Vec<i8>),
    ByteArray2D(Vec<Vec<i8>>),
    Short(i16),
    ShortArray(Vec<i16>),
    ShortArray2D(Vec<Vec<i16>>),
    Int(i32),
    IntArray(Vec<i32>),
    IntArray2D(Vec<Vec<i32>>),
    Long(i64),
    LongArray(Vec<i64>),
    LongArray2D(Vec<Vec<i64>>),
    Float(f32),
    FloatArray(Vec<f32>),
    FloatArray2D(Vec<Vec<f32>>),
    Double(f64),
    DoubleArray(Vec<f64>),
    DoubleArray2D(Vec<Vec<f64>>),
    String(Option<String>),
    StringArray(Vec<Option<String>>),
    StringArray2D(Vec<Vec<Option<String>>>),

    Vector2F([f32; 2]),
    Vector3F([f32; 3]),
    Vector4F([f32; 4]),
    Vector2D([f64; 2]),
    Vector3D([f64; 3]),
    Vector4D([f64; 4]),
    Vector2FArray(Vec<[f32; 2]>),
    Vector3FArray(Vec<[f32; 3]>),
    Vector4FArray(Vec<[f32; 4]>),
    Vector2DArray(Vec<[f64; 2]>),
    Vector3DArray(Vec<[f64; 3]>),
    Vector4DArray(Vec<[f64; 4]>),

    /// Column-major 3x3 matrix.
    Matrix3x3F([f32; 9]),
    /// Column-major 4x3 affine matrix (four columns of three rows).
    Matrix4x3F([f32; 12]),
    /// Column-major 4x4 matrix.
    Matrix4x4F([f32; 16]),

    Object(Option<ObjectRef>),
    ObjectArray(Vec<Option<ObjectRef>>),
    ObjectArray2D(Vec<Vec<Option<ObjectRef>>>),
    /// An object array whose elements all share `class_id`; the class id is
    /// written once for the whole array.
    HomogeneousObjectArray {
        class_id: String,
        items: Vec<Option<ObjectRef>>,
    },
}

impl FieldValue {
    /// The wire tag for this value. Present objects report
    /// [`TypeTag::ObjectImpl`]; the writer switches to
    /// [`TypeTag::ObjectPtr`] for objects it has already emitted.
    pub fn tag(&self) -> TypeTag {
        match self {
            FieldValue::Bool(_) => TypeTag::Bool,
            FieldValue::BoolArray(_) => TypeTag::BoolArray,
            FieldValue::BoolArray2D(_) => TypeTag::BoolArray2D,
            FieldValue::Byte(_) => TypeTag::Byte,
            FieldValue::ByteArray(_) => TypeTag::ByteArray,
            FieldValue::ByteArray2D(_) => TypeTag::ByteArray2D,
            FieldValue::Short(_) => TypeTag::Short,
            FieldValue::ShortArray(_) => TypeTag::ShortArray,
            FieldValue::ShortArray2D(_) => TypeTag::ShortArray2D,
            FieldValue::Int(_) => TypeTag::Int,
            FieldValue::IntArray(_) => TypeTag::IntArray,
            FieldValue::IntArray2D(_) => TypeTag::IntArray2D,
            FieldValue::Long(_) => TypeTag::Long,
            FieldValue::LongArray(_) => TypeTag::LongArray,
            FieldValue::LongArray2D(_) => TypeTag::LongArray2D,
            FieldValue::Float(_) => TypeTag::Float,
            FieldValue::FloatArray(_) => TypeTag::FloatArray,
            FieldValue::FloatArray2D(_) => TypeTag::FloatArray2D,
            FieldValue::Double(_) => TypeTag::Double,
            FieldValue::DoubleArray(_) => TypeTag::DoubleArray,
            FieldValue::DoubleArray2D(_) => TypeTag::DoubleArray2D,
            FieldValue::String(_) => TypeTag::String,
            FieldValue::StringArray(_) => TypeTag::StringArray,
            FieldValue::StringArray2D(_) => TypeTag::StringArray2D,
            FieldValue::Vector2F(_) => TypeTag::Vector2F,
            FieldValue::Vector3F(_) => TypeTag::Vector3F,
            FieldValue::Vector4F(_) => TypeTag::Vector4F,
            FieldValue::Vector2D(_) => TypeTag::Vector2D,
            FieldValue::Vector3D(_) => TypeTag::Vector3D,
            FieldValue::Vector4D(_) => TypeTag::Vector4D,
            FieldValue::Vector2FArray(_) => TypeTag::Vector2FArray,
            FieldValue::Vector3FArray(_) => TypeTag::Vector3FArray,
            FieldValue::Vector4FArray(_) => TypeTag::Vector4FArray,
            FieldValue::Vector2DArray(_) => TypeTag::Vector2DArray,
            FieldValue::Vector3DArray(_) => TypeTag::Vector3DArray,
            FieldValue::Vector4DArray(_) => TypeTag::Vector4DArray,
            FieldValue::Matrix3x3F(_) => TypeTag::Matrix3x3F,
            FieldValue::Matrix4x3F(_) => TypeTag::Matrix4x3F,
            FieldValue::Matrix4x4F(_) => TypeTag::Matrix4x4F,
            FieldValue::Object(None) => TypeTag::ObjectNull,
            FieldValue::Object(Some(_)) => TypeTag::ObjectImpl,
            FieldValue::ObjectArray(_) => TypeTag::ObjectArray,
            FieldValue::ObjectArray2D(_) => TypeTag::ObjectArray2D,
            FieldValue::HomogeneousObjectArray { .. } => TypeTag::ObjectsHomogeneousArray,
        }
    }

    /// `true` for zero, `false`, empty and null values. Matrices are never
    /// considered default.
    pub fn is_default(&self) -> bool {
        match self {
            FieldValue::Bool(v) => !*v,
            FieldValue::Byte(v) => *v == 0,
            FieldValue::Short(v) => *v == 0,
            FieldValue::Int(v) => *v == 0,
            FieldValue::Long(v) => *v == 0,
            FieldValue::Float(v) => *v == 0.0,
            FieldValue::Double(v) => *v == 0.0,
            FieldValue::String(v) => v.as_deref().map_or(true, str::is_empty),
            FieldValue::Vector2F(v) => v.iter().all(|c| *c == 0.0),
            FieldValue::Vector3F(v) => v.iter().all(|c| *c == 0.0),
            FieldValue::Vector4F(v) => v.iter().all(|c| *c == 0.0),
            FieldValue::Vector2D(v) => v.iter().all(|c| *c == 0.0),
            FieldValue::Vector3D(v) => v.iter().all(|c| *c == 0.0),
            FieldValue::Vector4D(v) => v.iter().all(|c| *c == 0.0),
            FieldValue::Matrix3x3F(_) | FieldValue::Matrix4x3F(_) | FieldValue::Matrix4x4F(_) => {
                false
            }
            FieldValue::Object(v) => v.is_none(),
            FieldValue::BoolArray(v) => v.is_empty(),
            FieldValue::BoolArray2D(v) => v.is_empty(),
            FieldValue::ByteArray(v) => v.is_empty(),
            FieldValue::ByteArray2D(v) => v.is_empty(),
            FieldValue::ShortArray(v) => v.is_empty(),
            FieldValue::ShortArray2D(v) => v.is_empty(),
            FieldValue::IntArray(v) => v.is_empty(),
            FieldValue::IntArray2D(v) => v.is_empty(),
            FieldValue::LongArray(v) => v.is_empty(),
            FieldValue::LongArray2D(v) => v.is_empty(),
            FieldValue::FloatArray(v) => v.is_empty(),
            FieldValue::FloatArray2D(v) => v.is_empty(),
            FieldValue::DoubleArray(v) => v.is_empty(),
            FieldValue::DoubleArray2D(v) => v.is_empty(),
            FieldValue::StringArray(v) => v.is_empty(),
            FieldValue::StringArray2D(v) => v.is_empty(),
            FieldValue::Vector2FArray(v) => v.is_empty(),
            FieldValue::Vector3FArray(v) => v.is_empty(),
            FieldValue::Vector4FArray(v) => v.is_empty(),
            FieldValue::Vector2DArray(v) => v.is_empty(),
            FieldValue::Vector3DArray(v) => v.is_empty(),
            FieldValue::Vector4DArray(v) => v.is_empty(),
            FieldValue::ObjectArray(v) => v.is_empty(),
            FieldValue::ObjectArray2D(v) => v.is_empty(),
            FieldValue::HomogeneousObjectArray { items, .. } => items.is_empty(),
        }
    }

    /// Returns the referenced object of an `Object` value.
    pub fn into_object(self) -> Option<ObjectRef> {
        match self {
            FieldValue::Object(obj) => obj,
            _ => None,
        }
    }

    /// Returns the elements of any one-dimensional object array.
    pub fn into_objects(self) -> Option<Vec<Option<ObjectRef>>> {
        match self {
            FieldValue::ObjectArray(items) => Some(items),
            FieldValue::HomogeneousObjectArray { items, .. } => Some(items),
            _ => None,
        }
    }

    pub fn into_string(self) -> Option<String> {
        match self {
            FieldValue::String(s) => s,
            _ => None,
        }
    }
}

macro_rules! impl_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for FieldValue {
                fn from(value: $ty) -> Self {
                    FieldValue::$variant(value)
                }
            }
        )*
    };
}

impl_from! {
    bool => Bool,
    Vec<bool> => BoolArray,
    Vec<Vec<bool>> => BoolArray2D,
    i8 => Byte,
    Vec<i8> => ByteArray,
    Vec<Vec<i8>> => ByteArray2D,
    i16 => Short,
    Vec<i16> => ShortArray,
    Vec<Vec<i16>> => ShortArray2D,
    i32 => Int,
    Vec<i32> => IntArray,
    Vec<Vec<i32>> => IntArray2D,
    i64 => Long,
    Vec<i64> => LongArray,
    Vec<Vec<i64>> => LongArray2D,
    f32 => Float,
    Vec<f32> => FloatArray,
    Vec<Vec<f32>> => FloatArray2D,
    f64 => Double,
    Vec<f64> => DoubleArray,
    Vec<Vec<f64>> => DoubleArray2D,
    Option<String> => String,
    Vec<Option<String>> => StringArray,
    Vec<Vec<Option<String>>> => StringArray2D,
    [f32; 2] => Vector2F,
    [f32; 3] => Vector3F,
    [f32; 4] => Vector4F,
    [f64; 2] => Vector2D,
    [f64; 3] => Vector3D,
    [f64; 4] => Vector4D,
    Vec<[f32; 2]> => Vector2FArray,
    Vec<[f32; 3]> => Vector3FArray,
    Vec<[f32; 4]> => Vector4FArray,
    Vec<[f64; 2]> => Vector2DArray,
    Vec<[f64; 3]> => Vector3DArray,
    Vec<[f64; 4]> => Vector4DArray,
    [f32; 9] => Matrix3x3F,
    [f32; 12] => Matrix4x3F,
    [f32; 16] => Matrix4x4F,
    Option<ObjectRef> => Object,
    Vec<Option<ObjectRef>> => ObjectArray,
    Vec<Vec<Option<ObjectRef>>> => ObjectArray2D,
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::String(Some(value))
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::String(Some(value.to_owned()))
    }
}

impl From<Vec<String>> for FieldValue {
    fn from(value: Vec<String>) -> Self {
        FieldValue::StringArray(value.into_iter().map(Some).collect())
    }
}

impl From<ObjectRef> for FieldValue {
    fn from(value: ObjectRef) -> Self {
        FieldValue::Object(Some(value))
    }
}

impl From<&ObjectRef> for FieldValue {
    fn from(value: &ObjectRef) -> Self {
        FieldValue::Object(Some(value.clone()))
    }
}

impl From<Vec<ObjectRef>> for FieldValue {
    fn from(value: Vec<ObjectRef>) -> Self {
        FieldValue::ObjectArray(value.into_iter().map(Some).collect())
    }
}
