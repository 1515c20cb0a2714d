use crate::layout::FieldDatatype;

/// Coarse classification of a [`BufferError`]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The schema of a buffer does not permit the requested operation (missing or duplicate field,
    /// mismatching element type, malformed layout)
    Schema,
    /// A point, cell or element index lies outside of the buffer
    Bounds,
}

/// Errors raised by schema construction and field access on a
/// [`StructuredBuffer`](crate::containers::StructuredBuffer)
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum BufferError {
    #[error("Field `{0}` is already part of the schema")]
    DuplicateField(String),
    #[error("Field `{0}` is not part of the schema")]
    FieldNotFound(String),
    #[error("Field `{name}` stores {stored} values, but {requested} values were requested")]
    TypeMismatch {
        name: String,
        stored: FieldDatatype,
        requested: FieldDatatype,
    },
    #[error("Schema can't change while the buffer holds {points} points, reset the schema first")]
    SchemaLocked { points: usize },
    #[error("Invalid buffer layout: {0}")]
    InvalidLayout(String),
    #[error("Point index {index} is out of range for a buffer with {len} points")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("Element {element} is out of range for field `{name}` with {count} elements")]
    ElementOutOfRange {
        name: String,
        element: usize,
        count: usize,
    },
    #[error("Cell ({row}, {col}) lies outside of the {height}x{width} grid")]
    CellOutOfRange {
        row: usize,
        col: usize,
        height: u32,
        width: u32,
    },
    #[error("Field `{name}` requires {expected} values, got {actual}")]
    LengthMismatch {
        name: String,
        expected: usize,
        actual: usize,
    },
}

impl BufferError {
    /// Returns whether this error stems from the schema or from an out-of-range access
    pub fn kind(&self) -> ErrorKind {
        match self {
            BufferError::DuplicateField(_)
            | BufferError::FieldNotFound(_)
            | BufferError::TypeMismatch { .. }
            | BufferError::SchemaLocked { .. }
            | BufferError::InvalidLayout(_) => ErrorKind::Schema,
            BufferError::IndexOutOfRange { .. }
            | BufferError::ElementOutOfRange { .. }
            | BufferError::CellOutOfRange { .. }
            | BufferError::LengthMismatch { .. } => ErrorKind::Bounds,
        }
    }
}

pub type Result<T> = std::result::Result<T, BufferError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(
            ErrorKind::Schema,
            BufferError::DuplicateField("x".into()).kind()
        );
        assert_eq!(
            ErrorKind::Schema,
            BufferError::TypeMismatch {
                name: "x".into(),
                stored: FieldDatatype::Float32,
                requested: FieldDatatype::Float64,
            }
            .kind()
        );
        assert_eq!(
            ErrorKind::Bounds,
            BufferError::IndexOutOfRange { index: 4, len: 4 }.kind()
        );
    }

    #[test]
    fn test_error_messages() {
        let err = BufferError::TypeMismatch {
            name: "intensity".into(),
            stored: FieldDatatype::Uint16,
            requested: FieldDatatype::Float32,
        };
        assert_eq!(
            "Field `intensity` stores uint16 values, but float32 values were requested",
            err.to_string()
        );
    }
}
