use crate::shape::Shape;

/// All errors that can occur within fieldbatch.
///
/// Array construction, stacking, and batch assembly all report through this
/// one enum. Errors raised while combining a group of records carry the field
/// name and, where known, the offending record's position inside the group.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Batch size must be at least one.
    #[error("invalid batch size {batch_size}: must be at least 1")]
    InvalidBatchSize { batch_size: usize },

    /// Identifier value without a parseable `<prefix>_<integer>` suffix.
    #[error("field '{field}' (record {position} in batch): cannot parse identifier {value:?}, expected <prefix>_<integer>")]
    IdentifierFormat {
        field: String,
        value: String,
        position: usize,
    },

    /// Per-record arrays of one field differ in shape and cannot be stacked.
    #[error("field '{field}' (record {position} in batch): shape mismatch, expected {expected}, got {got}")]
    ShapeMismatch {
        field: String,
        expected: Shape,
        got: Shape,
        position: usize,
    },

    /// A record lacks a field present on the first record of its batch, or
    /// carries one the first record does not have.
    #[error("field '{field}' (record {position} in batch): field set differs from first record")]
    MissingField { field: String, position: usize },

    /// A text value appeared in a field that must be numeric.
    #[error("field '{field}' (record {position} in batch): text value cannot be converted to an array")]
    NonNumericField { field: String, position: usize },

    /// Arrays passed to `Array::stack` differ in shape.
    #[error("stack: array {index} has shape {got} but expected {expected}")]
    StackMismatch {
        index: usize,
        expected: Shape,
        got: Shape,
    },

    /// Stacking needs at least one array.
    #[error("cannot stack an empty list of arrays")]
    EmptyStack,

    /// Dimension index out of range for the array's rank.
    #[error("dimension out of range: dim {dim} for array with {rank} dimensions")]
    DimOutOfRange { dim: usize, rank: usize },

    /// Multi-index or row index outside the array bounds.
    #[error("index {index:?} out of bounds for shape {shape}")]
    IndexOutOfBounds { index: Vec<usize>, shape: Shape },

    /// Element count mismatch when creating from a vec.
    #[error("element count mismatch: shape {shape} requires {expected} elements, got {got}")]
    ElementCountMismatch {
        shape: Shape,
        expected: usize,
        got: usize,
    },

    /// Generic message for cases not covered above.
    #[error("{0}")]
    Msg(String),
}

impl Error {
    /// Create an error from any string message.
    pub fn msg(s: impl Into<String>) -> Self {
        Error::Msg(s.into())
    }

    /// Name of the field this error concerns, if any.
    pub fn field(&self) -> Option<&str> {
        match self {
            Error::IdentifierFormat { field, .. }
            | Error::ShapeMismatch { field, .. }
            | Error::MissingField { field, .. }
            | Error::NonNumericField { field, .. } => Some(field.as_str()),
            _ => None,
        }
    }

    /// Position of the offending record within its batch, if known.
    pub fn position(&self) -> Option<usize> {
        match self {
            Error::IdentifierFormat { position, .. }
            | Error::ShapeMismatch { position, .. }
            | Error::MissingField { position, .. }
            | Error::NonNumericField { position, .. } => Some(*position),
            _ => None,
        }
    }
}

/// Convenience Result type used throughout fieldbatch.
pub type Result<T> = std::result::Result<T, Error>;

/// Macro for early return with a formatted error message.
/// Usage: `bail!("something went wrong: {}", detail)`
#[macro_export]
macro_rules! bail {
    ($($arg:tt)*) => {
        return Err($crate::Error::Msg(format!($($arg)*)))
    };
}
