//! Point buffers and typed access to their fields.
//!
//! A [`StructuredBuffer`] stores interleaved point records as raw bytes, together with a [`FieldLayout`](crate::layout::FieldLayout)
//! describing the fields of a record. Since the schema is only known at runtime, all typed accesses are checked
//! against the layout: reading a field that does not exist fails with `FieldNotFound`, reading it as the wrong
//! type fails with `TypeMismatch`, and accessing a point outside of the buffer fails with `IndexOutOfRange`.
//!
//! Typed reads go through a [`FieldView`], which validates the field once and then decodes values directly from
//! the buffer memory, honouring the byte order flag of the buffer.
use crate::{layout::FieldDescriptor, meta::Header};

mod field_view;
pub use self::field_view::{FieldIter, FieldView};

mod structured_buffer;
pub use self::structured_buffer::*;

/// The wire representation of a [`StructuredBuffer`], as exchanged with the transport layer
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BufferParts {
    pub header: Header,
    pub fields: Vec<FieldDescriptor>,
    /// Number of rows
    pub height: u32,
    /// Number of points per row
    pub width: u32,
    /// Bytes per point record
    pub point_step: u32,
    /// Bytes per row, at least `width * point_step`
    pub row_step: u32,
    pub is_bigendian: bool,
    pub is_dense: bool,
    /// `height * row_step` bytes of point records
    pub data: Vec<u8>,
}
