//! Wire-format constants for the binary graph encoding.
//!
//! All multi-byte values are big-endian. Lengths, object ids, string
//! references and schema references are `i32`.

/// One byte identifying the payload layout of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TypeTag {
    Bool = 1,
    BoolArray = 2,
    BoolArray2D = 3,
    Byte = 4,
    ByteArray = 5,
    ByteArray2D = 6,
    Short = 7,
    ShortArray = 8,
    ShortArray2D = 9,
    Int = 10,
    IntArray = 11,
    IntArray2D = 12,
    Long = 13,
    LongArray = 14,
    LongArray2D = 15,
    Float = 16,
    FloatArray = 17,
    FloatArray2D = 18,
    Double = 19,
    DoubleArray = 20,
    DoubleArray2D = 21,
    String = 22,
    StringArray = 23,
    StringArray2D = 24,

    ObjectImpl = 30,
    ObjectPtr = 31,
    ObjectNull = 32,
    ObjectArray = 33,
    ObjectArray2D = 34,
    ObjectsHomogeneousArray = 35,

    Vector2F = 40,
    Vector3F = 41,
    Vector4F = 42,
    Vector2D = 43,
    Vector3D = 44,
    Vector4D = 45,
    Vector2FArray = 50,
    Vector3FArray = 51,
    Vector4FArray = 52,
    Vector2DArray = 53,
    Vector3DArray = 54,
    Vector4DArray = 55,

    Matrix3x3F = 60,
    Matrix4x3F = 61,
    Matrix4x4F = 62,

    /// Marks the start of a root list. It is written as this single byte at
    /// the head of the stream, not as a schema entry with an empty field
    /// name. It never appears as a field tag.
    ObjectList = 70,
}

impl TypeTag {
    /// Maps a raw byte back to its tag, or `None` for unassigned values.
    pub fn from_u8(byte: u8) -> Option<Self> {
        use TypeTag::*;
        let tag = match byte {
            1 => Bool,
            2 => BoolArray,
            3 => BoolArray2D,
            4 => Byte,
            5 => ByteArray,
            6 => ByteArray2D,
            7 => Short,
            8 => ShortArray,
            9 => ShortArray2D,
            10 => Int,
            11 => IntArray,
            12 => IntArray2D,
            13 => Long,
            14 => LongArray,
            15 => LongArray2D,
            16 => Float,
            17 => FloatArray,
            18 => FloatArray2D,
            19 => Double,
            20 => DoubleArray,
            21 => DoubleArray2D,
            22 => String,
            23 => StringArray,
            24 => StringArray2D,
            30 => ObjectImpl,
            31 => ObjectPtr,
            32 => ObjectNull,
            33 => ObjectArray,
            34 => ObjectArray2D,
            35 => ObjectsHomogeneousArray,
            40 => Vector2F,
            41 => Vector3F,
            42 => Vector4F,
            43 => Vector2D,
            44 => Vector3D,
            45 => Vector4D,
            50 => Vector2FArray,
            51 => Vector3FArray,
            52 => Vector4FArray,
            53 => Vector2DArray,
            54 => Vector3DArray,
            55 => Vector4DArray,
            60 => Matrix3x3F,
            61 => Matrix4x3F,
            62 => Matrix4x4F,
            70 => ObjectList,
            _ => return None,
        };
        Some(tag)
    }

    #[inline]
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

// String references
pub const STRING_NULL: i32 = -1;
/// A new string of byte length `n` is announced as `-(n) - 2`.
pub const STRING_NEW_OFFSET: i32 = 2;

// Field schema references
pub const SCHEMA_NEW: i32 = -1;
/// Any schema reference below [`SCHEMA_NEW`] ends an object's field loop;
/// writers emit exactly this value.
pub const END_OF_OBJECT: i32 = -2;

// Root list element markers
pub const LIST_CONTINUE: u8 = 17;
pub const LIST_END: u8 = 37;

/// Default limit for inline object nesting, on both read and write.
pub const DEFAULT_MAX_DEPTH: usize = 256;
