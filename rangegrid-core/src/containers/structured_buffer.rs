use std::{convert::TryFrom, time::Instant};

use log::debug;

use super::{
    field_view::{encode, FieldIter, FieldView},
    BufferParts,
};
use crate::{
    error::Result,
    layout::{FieldDatatype, FieldDescriptor, FieldLayout, FieldType},
    meta::Header,
    BufferError,
};

/// A self-describing 2D grid of point records, stored as a flat byte array.
///
/// The schema of a record is a [`FieldLayout`]. Records are `point_step` bytes long and rows of records are
/// `row_step` bytes long, so point `i` starts at byte `(i / width) * row_step + (i % width) * point_step`.
/// For buffers sized through [`resize`](Self::resize) there is no row padding and this is simply
/// `i * point_step`.
///
/// The usual lifecycle is: create an empty buffer, declare its fields, size it, then read and write fields
/// point-wise. Once the buffer holds points, its schema is locked until [`reset_schema`](Self::reset_schema)
/// is called.
/// ```
/// # use rangegrid_core::containers::StructuredBuffer;
/// let mut buffer = StructuredBuffer::new();
/// buffer.append_position_fields().unwrap();
/// buffer.resize(2, 3).unwrap();
/// buffer.fill_field("z", 1.5f32).unwrap();
///
/// assert_eq!(6, buffer.num_points());
/// assert_eq!(12, buffer.point_step());
/// assert_eq!(72, buffer.data().len());
/// assert!(buffer.read_field::<f32>("z").unwrap().all(|z| z == 1.5));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(try_from = "BufferParts", into = "BufferParts")
)]
pub struct StructuredBuffer {
    header: Header,
    layout: FieldLayout,
    height: u32,
    width: u32,
    row_step: u32,
    is_bigendian: bool,
    is_dense: bool,
    data: Vec<u8>,
}

impl Default for StructuredBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl TryFrom<BufferParts> for StructuredBuffer {
    type Error = BufferError;

    fn try_from(parts: BufferParts) -> Result<Self> {
        Self::from_parts(parts)
    }
}

impl From<StructuredBuffer> for BufferParts {
    fn from(buffer: StructuredBuffer) -> Self {
        buffer.into_parts()
    }
}

impl StructuredBuffer {
    /// Creates a new empty buffer without fields, using the byte order of the host
    pub fn new() -> Self {
        Self::with_layout(FieldLayout::new())
    }

    /// Creates a new empty buffer with the given schema
    pub fn with_layout(layout: FieldLayout) -> Self {
        Self {
            header: Header::default(),
            layout,
            height: 0,
            width: 0,
            row_step: 0,
            is_bigendian: cfg!(target_endian = "big"),
            is_dense: false,
            data: vec![],
        }
    }

    /// Creates a buffer from its wire representation. Fails if field names are not unique, a field does not
    /// fit into a record, rows are shorter than `width * point_step`, or the length of `data` does not equal
    /// `height * row_step`.
    pub fn from_parts(parts: BufferParts) -> Result<Self> {
        let layout = FieldLayout::from_descriptors(parts.fields, parts.point_step)?;
        let min_row_step = parts.width as u64 * parts.point_step as u64;
        if (parts.row_step as u64) < min_row_step {
            return Err(BufferError::InvalidLayout(format!(
                "Row step {} is smaller than width * point step ({})",
                parts.row_step, min_row_step
            )));
        }
        let expected_len = parts.height as u64 * parts.row_step as u64;
        if parts.data.len() as u64 != expected_len {
            return Err(BufferError::InvalidLayout(format!(
                "Buffer holds {} bytes, but height * row step is {}",
                parts.data.len(),
                expected_len
            )));
        }
        Ok(Self {
            header: parts.header,
            layout,
            height: parts.height,
            width: parts.width,
            row_step: parts.row_step,
            is_bigendian: parts.is_bigendian,
            is_dense: parts.is_dense,
            data: parts.data,
        })
    }

    /// Decomposes this buffer into its wire representation
    pub fn into_parts(self) -> BufferParts {
        let (fields, point_step) = self.layout.into_descriptors();
        BufferParts {
            header: self.header,
            fields,
            height: self.height,
            width: self.width,
            point_step,
            row_step: self.row_step,
            is_bigendian: self.is_bigendian,
            is_dense: self.is_dense,
            data: self.data,
        }
    }

    pub fn layout(&self) -> &FieldLayout {
        &self.layout
    }

    /// Returns an iterator over all fields in declaration order
    pub fn fields(&self) -> impl Iterator<Item = &FieldDescriptor> + '_ {
        self.layout.fields()
    }

    pub fn find_field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.layout.find_field(name)
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.layout.has_field(name)
    }

    /// Clears all fields and the point step. Since the existing records are meaningless without their
    /// schema, this also discards all point data and resets the extent to zero.
    pub fn reset_schema(&mut self) {
        self.layout.reset();
        self.height = 0;
        self.width = 0;
        self.row_step = 0;
        self.data.clear();
    }

    /// Appends a field to the schema at offset `point_step` and advances the point step by the size of the
    /// field. Call [`resize`](Self::resize) afterwards to allocate storage for the new schema.
    ///
    /// Fails with `DuplicateField` if a field with this name exists, and with `SchemaLocked` if the buffer
    /// already holds points.
    pub fn append_field<S: Into<String>>(
        &mut self,
        name: S,
        datatype: FieldDatatype,
        count: u32,
    ) -> Result<&FieldDescriptor> {
        self.ensure_schema_unlocked()?;
        self.layout.append_field(name, datatype, count)
    }

    /// Appends `x`, `y`, `z` as `float32` fields
    pub fn append_position_fields(&mut self) -> Result<()> {
        self.ensure_schema_unlocked()?;
        self.layout.append_position_fields()
    }

    /// Appends `nx`, `ny`, `nz` as `float32` fields
    pub fn append_normal_fields(&mut self) -> Result<()> {
        self.ensure_schema_unlocked()?;
        self.layout.append_normal_fields()
    }

    pub fn append_occupancy_fields(&mut self) -> Result<()> {
        self.ensure_schema_unlocked()?;
        self.layout.append_occupancy_fields()
    }

    pub fn append_traversability_fields(&mut self) -> Result<()> {
        self.ensure_schema_unlocked()?;
        self.layout.append_traversability_fields()
    }

    pub fn append_planning_fields(&mut self) -> Result<()> {
        self.ensure_schema_unlocked()?;
        self.layout.append_planning_fields()
    }

    fn ensure_schema_unlocked(&self) -> Result<()> {
        if self.num_points() > 0 || !self.data.is_empty() {
            return Err(BufferError::SchemaLocked {
                points: self.num_points(),
            });
        }
        Ok(())
    }

    /// Sets the extent of this buffer to `height` rows of `width` points, with `row_step = width * point_step`,
    /// and reallocates the point data with all bytes set to zero
    pub fn resize(&mut self, height: u32, width: u32) -> Result<()> {
        let row_step = width
            .checked_mul(self.point_step())
            .ok_or_else(|| BufferError::InvalidLayout(format!("Row step overflows for width {}", width)))?;
        let len = (height as usize)
            .checked_mul(row_step as usize)
            .ok_or_else(|| {
                BufferError::InvalidLayout(format!("Buffer size overflows for height {}", height))
            })?;
        self.height = height;
        self.width = width;
        self.row_step = row_step;
        self.data.clear();
        self.data.resize(len, 0);
        Ok(())
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    /// Total number of points, i.e. `height * width`
    pub fn num_points(&self) -> usize {
        self.height as usize * self.width as usize
    }

    pub fn is_empty(&self) -> bool {
        self.num_points() == 0
    }

    /// Size in bytes of a single point record
    pub fn point_step(&self) -> u32 {
        self.layout.point_step()
    }

    /// Size in bytes of a row of point records
    pub fn row_step(&self) -> u32 {
        self.row_step
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn header_mut(&mut self) -> &mut Header {
        &mut self.header
    }

    pub fn set_header(&mut self, header: Header) {
        self.header = header;
    }

    pub fn is_bigendian(&self) -> bool {
        self.is_bigendian
    }

    /// Sets the byte order in which multi-byte field values are stored. Existing data is not converted.
    pub fn set_bigendian(&mut self, is_bigendian: bool) {
        self.is_bigendian = is_bigendian;
    }

    /// Whether the producer guarantees that the buffer contains no invalid points
    pub fn is_dense(&self) -> bool {
        self.is_dense
    }

    pub fn set_dense(&mut self, is_dense: bool) {
        self.is_dense = is_dense;
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Returns the index of the point in `row` and `col`
    /// ```
    /// # use rangegrid_core::containers::StructuredBuffer;
    /// let mut buffer = StructuredBuffer::new();
    /// buffer.append_position_fields().unwrap();
    /// buffer.resize(4, 16).unwrap();
    /// assert_eq!(35, buffer.point_index(2, 3).unwrap());
    /// assert!(buffer.point_index(4, 0).is_err());
    /// ```
    pub fn point_index(&self, row: usize, col: usize) -> Result<usize> {
        if row >= self.height as usize || col >= self.width as usize {
            return Err(BufferError::CellOutOfRange {
                row,
                col,
                height: self.height,
                width: self.width,
            });
        }
        Ok(row * self.width as usize + col)
    }

    /// Returns the `(row, col)` cell of the point with the given index
    pub fn cell_of(&self, index: usize) -> Result<(usize, usize)> {
        self.check_index(index)?;
        let width = self.width as usize;
        Ok((index / width, index % width))
    }

    /// Returns the raw bytes of the record of the point with the given index
    pub fn record(&self, index: usize) -> Result<&[u8]> {
        self.check_index(index)?;
        Ok(self.record_unchecked(index))
    }

    pub fn record_mut(&mut self, index: usize) -> Result<&mut [u8]> {
        self.check_index(index)?;
        let start = self.record_offset(index);
        let end = start + self.point_step() as usize;
        Ok(&mut self.data[start..end])
    }

    fn check_index(&self, index: usize) -> Result<()> {
        if index >= self.num_points() {
            return Err(BufferError::IndexOutOfRange {
                index,
                len: self.num_points(),
            });
        }
        Ok(())
    }

    /// Byte offset of the record of point `index`. `index` must be smaller than `num_points()`
    pub(crate) fn record_offset(&self, index: usize) -> usize {
        let width = self.width as usize;
        (index / width) * self.row_step as usize + (index % width) * self.point_step() as usize
    }

    fn record_unchecked(&self, index: usize) -> &[u8] {
        let start = self.record_offset(index);
        &self.data[start..start + self.point_step() as usize]
    }

    /// Returns a typed, reusable view onto the field with the given name. Fails with `FieldNotFound` if
    /// the field is not part of the schema, and with `TypeMismatch` if its elements are not of type `T`.
    pub fn field_view<T: FieldType>(&self, name: &str) -> Result<FieldView<'_, T>> {
        FieldView::new(self, name)
    }

    /// Returns an iterator over all elements of the field with the given name, point by point. For fields with
    /// more than one element, the elements of each point are yielded consecutively.
    pub fn read_field<T: FieldType>(&self, name: &str) -> Result<FieldIter<'_, T>> {
        Ok(self.field_view::<T>(name)?.iter())
    }

    /// Reads the first element of the field with the given name for the point with the given index
    pub fn field_at<T: FieldType>(&self, name: &str, index: usize) -> Result<T> {
        self.field_view::<T>(name)?.at(index)
    }

    /// Writes the first element of the field with the given name for the point with the given index
    pub fn set_field_at<T: FieldType>(&mut self, name: &str, index: usize, value: T) -> Result<()> {
        self.set_element_at(name, index, 0, value)
    }

    /// Writes element `element` of the field with the given name for the point with the given index
    pub fn set_element_at<T: FieldType>(
        &mut self,
        name: &str,
        index: usize,
        element: usize,
        value: T,
    ) -> Result<()> {
        let (offset, count) = self.typed_field_range::<T>(name)?;
        self.check_index(index)?;
        if element >= count {
            return Err(BufferError::ElementOutOfRange {
                name: name.to_owned(),
                element,
                count,
            });
        }
        let start = self.record_offset(index) + offset + element * T::DATATYPE.size() as usize;
        encode(value, &mut self.data[start..], self.is_bigendian);
        Ok(())
    }

    /// Writes all elements of the field with the given name. `values` holds the elements of all points
    /// consecutively, so its length must be `num_points() * count`.
    /// ```
    /// # use rangegrid_core::{containers::StructuredBuffer, layout::FieldDatatype};
    /// let mut buffer = StructuredBuffer::new();
    /// buffer.append_field("ring", FieldDatatype::Uint16, 1).unwrap();
    /// buffer.resize(1, 3).unwrap();
    /// buffer.write_field("ring", &[3u16, 1, 2]).unwrap();
    /// assert_eq!(vec![3, 1, 2], buffer.read_field::<u16>("ring").unwrap().collect::<Vec<_>>());
    /// assert!(buffer.write_field("ring", &[1u16]).is_err());
    /// ```
    pub fn write_field<T: FieldType>(&mut self, name: &str, values: &[T]) -> Result<()> {
        let (offset, count) = self.typed_field_range::<T>(name)?;
        let expected = self.num_points() * count;
        if values.len() != expected {
            return Err(BufferError::LengthMismatch {
                name: name.to_owned(),
                expected,
                actual: values.len(),
            });
        }
        if count == 0 {
            return Ok(());
        }
        let element_size = T::DATATYPE.size() as usize;
        for (index, point_values) in values.chunks(count).enumerate() {
            let field_start = self.record_offset(index) + offset;
            for (element, value) in point_values.iter().enumerate() {
                let start = field_start + element * element_size;
                encode(*value, &mut self.data[start..], self.is_bigendian);
            }
        }
        Ok(())
    }

    /// Sets every element of the field with the given name to `value`
    pub fn fill_field<T: FieldType>(&mut self, name: &str, value: T) -> Result<()> {
        let (offset, count) = self.typed_field_range::<T>(name)?;
        let element_size = T::DATATYPE.size() as usize;
        for index in 0..self.num_points() {
            let field_start = self.record_offset(index) + offset;
            for element in 0..count {
                let start = field_start + element * element_size;
                encode(value, &mut self.data[start..], self.is_bigendian);
            }
        }
        Ok(())
    }

    fn typed_field_range<T: FieldType>(&self, name: &str) -> Result<(usize, usize)> {
        let field = self.layout.typed_field::<T>(name)?;
        Ok((field.offset() as usize, field.count() as usize))
    }

    /// Copies header, schema, byte order and density flag into `into`. The point data of `into` is discarded,
    /// so `into` ends up as an empty buffer with the same schema, ready to be sized.
    pub fn copy_metadata(&self, into: &mut StructuredBuffer) {
        into.header = self.header.clone();
        into.layout = self.layout.clone();
        into.is_bigendian = self.is_bigendian;
        into.is_dense = self.is_dense;
        into.height = 0;
        into.width = 0;
        into.row_step = 0;
        into.data.clear();
    }

    /// Builds `out` as a single-row buffer with the same schema as this buffer, containing a verbatim copy of
    /// the records of the points with the given indices, in the order of `indices`. Fails with
    /// `IndexOutOfRange` if any index is not smaller than `num_points()`, in which case `out` is left
    /// untouched.
    /// ```
    /// # use rangegrid_core::containers::StructuredBuffer;
    /// let mut buffer = StructuredBuffer::new();
    /// buffer.append_position_fields().unwrap();
    /// buffer.resize(2, 2).unwrap();
    /// buffer.write_field("x", &[0.0f32, 1.0, 2.0, 3.0]).unwrap();
    ///
    /// let mut selected = StructuredBuffer::new();
    /// buffer.select(&[3, 0], &mut selected).unwrap();
    /// assert_eq!((1, 2), (selected.height(), selected.width()));
    /// assert_eq!(vec![3.0, 0.0], selected.read_field::<f32>("x").unwrap().collect::<Vec<_>>());
    /// ```
    pub fn select(&self, indices: &[usize], out: &mut StructuredBuffer) -> Result<()> {
        let timer = Instant::now();
        let len = self.num_points();
        if let Some(&index) = indices.iter().find(|&&index| index >= len) {
            return Err(BufferError::IndexOutOfRange { index, len });
        }
        let width = u32::try_from(indices.len()).map_err(|_| {
            BufferError::InvalidLayout(format!("Can't select {} points into one row", indices.len()))
        })?;
        let row_step = width.checked_mul(self.point_step()).ok_or_else(|| {
            BufferError::InvalidLayout(format!("Row step overflows for width {}", width))
        })?;

        let mut data = Vec::with_capacity(row_step as usize);
        for &index in indices {
            data.extend_from_slice(self.record_unchecked(index));
        }

        self.copy_metadata(out);
        out.height = 1;
        out.width = width;
        out.row_step = row_step;
        out.data = data;

        debug!(
            "{} / {} points selected ({:.6} s).",
            indices.len(),
            len,
            timer.elapsed().as_secs_f64()
        );
        Ok(())
    }

    /// Like [`select`](Self::select), but returns the selection as a new buffer
    pub fn selected(&self, indices: &[usize]) -> Result<StructuredBuffer> {
        let mut out = StructuredBuffer::new();
        self.select(indices, &mut out)?;
        Ok(out)
    }
}
