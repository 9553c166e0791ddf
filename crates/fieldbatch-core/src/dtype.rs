use std::fmt;

// DType — element precision of an Array
//
// Batched fields are always floating point, so only two precisions exist:
//
//   F32  — 32-bit float, the default for model inputs
//   F64  — 64-bit float, for high-precision work
//
// Values are held as f64 regardless of the tag. An F32 array keeps its
// values rounded to single precision so that what a consumer reads back
// matches what a 32-bit buffer would hold.

/// Enum of the supported element data types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DType {
    #[default]
    F32,
    F64,
}

impl DType {
    /// Size of one element in bytes.
    pub fn size_in_bytes(&self) -> usize {
        match self {
            DType::F32 => 4,
            DType::F64 => 8,
        }
    }

    /// Round a value to this precision.
    pub fn cast(&self, v: f64) -> f64 {
        match self {
            DType::F32 => v as f32 as f64,
            DType::F64 => v,
        }
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DType::F32 => "f32",
            DType::F64 => "f64",
        };
        write!(f, "{}", s)
    }
}
