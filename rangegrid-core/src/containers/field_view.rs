use std::{iter::FusedIterator, marker::PhantomData};

use byteorder::{BigEndian, LittleEndian};

use super::StructuredBuffer;
use crate::{
    error::Result,
    layout::{FieldDescriptor, FieldType},
    BufferError,
};

pub(crate) fn decode<T: FieldType>(bytes: &[u8], big_endian: bool) -> T {
    if big_endian {
        T::read::<BigEndian>(bytes)
    } else {
        T::read::<LittleEndian>(bytes)
    }
}

pub(crate) fn encode<T: FieldType>(value: T, bytes: &mut [u8], big_endian: bool) {
    if big_endian {
        value.write::<BigEndian>(bytes)
    } else {
        value.write::<LittleEndian>(bytes)
    }
}

/// Typed read access to a single field of a [`StructuredBuffer`]. The field name and element type are checked
/// once on creation, afterwards values are decoded straight from the buffer memory.
#[derive(Debug)]
pub struct FieldView<'a, T: FieldType> {
    buffer: &'a StructuredBuffer,
    field: &'a FieldDescriptor,
    _phantom: PhantomData<T>,
}

impl<'a, T: FieldType> Clone for FieldView<'a, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<'a, T: FieldType> Copy for FieldView<'a, T> {}

impl<'a, T: FieldType> FieldView<'a, T> {
    pub(crate) fn new(buffer: &'a StructuredBuffer, name: &str) -> Result<Self> {
        let field = buffer.layout().typed_field::<T>(name)?;
        Ok(Self {
            buffer,
            field,
            _phantom: PhantomData,
        })
    }

    pub fn field(&self) -> &'a FieldDescriptor {
        self.field
    }

    /// Number of points in the viewed buffer
    pub fn len(&self) -> usize {
        self.buffer.num_points()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of elements per point
    pub fn count(&self) -> usize {
        self.field.count() as usize
    }

    /// Returns the first element of the point with the given index, or `None` if the index is out of range
    /// or the field has no elements
    pub fn get(&self, index: usize) -> Option<T> {
        self.get_element(index, 0)
    }

    pub fn get_element(&self, index: usize, element: usize) -> Option<T> {
        if index >= self.len() || element >= self.count() {
            return None;
        }
        Some(self.decode_unchecked(index, element))
    }

    /// Returns the first element of the point with the given index
    pub fn at(&self, index: usize) -> Result<T> {
        self.element_at(index, 0)
    }

    pub fn element_at(&self, index: usize, element: usize) -> Result<T> {
        if index >= self.len() {
            return Err(BufferError::IndexOutOfRange {
                index,
                len: self.len(),
            });
        }
        if element >= self.count() {
            return Err(BufferError::ElementOutOfRange {
                name: self.field.name().to_owned(),
                element,
                count: self.count(),
            });
        }
        Ok(self.decode_unchecked(index, element))
    }

    /// Returns an iterator over all elements of all points
    pub fn iter(&self) -> FieldIter<'a, T> {
        FieldIter {
            view: *self,
            current: 0,
            end: self.len() * self.count(),
        }
    }

    fn decode_unchecked(&self, index: usize, element: usize) -> T {
        let start = self.buffer.record_offset(index)
            + self.field.offset() as usize
            + element * T::DATATYPE.size() as usize;
        decode(&self.buffer.data()[start..], self.buffer.is_bigendian())
    }
}

impl<'a, T: FieldType> IntoIterator for FieldView<'a, T> {
    type Item = T;
    type IntoIter = FieldIter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over the elements of a single field, point by point
#[derive(Debug, Clone)]
pub struct FieldIter<'a, T: FieldType> {
    view: FieldView<'a, T>,
    current: usize,
    end: usize,
}

impl<'a, T: FieldType> Iterator for FieldIter<'a, T> {
    type Item = T;

    fn next(&mut self) -> Option<Self::Item> {
        if self.current == self.end {
            return None;
        }
        let count = self.view.count();
        let value = self
            .view
            .decode_unchecked(self.current / count, self.current % count);
        self.current += 1;
        Some(value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.end - self.current;
        (remaining, Some(remaining))
    }
}

impl<'a, T: FieldType> ExactSizeIterator for FieldIter<'a, T> {}

impl<'a, T: FieldType> FusedIterator for FieldIter<'a, T> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::FieldDatatype;

    #[test]
    fn test_view_over_multi_element_field() {
        let mut buffer = StructuredBuffer::new();
        buffer.append_field("rgb", FieldDatatype::Uint8, 3).unwrap();
        buffer.append_field("t", FieldDatatype::Float64, 1).unwrap();
        buffer.resize(1, 2).unwrap();
        buffer.write_field("rgb", &[1u8, 2, 3, 4, 5, 6]).unwrap();

        let rgb = buffer.field_view::<u8>("rgb").unwrap();
        assert_eq!(2, rgb.len());
        assert_eq!(3, rgb.count());
        assert_eq!(Some(4), rgb.get(1));
        assert_eq!(Some(6), rgb.get_element(1, 2));
        assert_eq!(None, rgb.get_element(1, 3));
        assert_eq!(None, rgb.get(2));
        assert_eq!(vec![1, 2, 3, 4, 5, 6], rgb.into_iter().collect::<Vec<_>>());

        let mut iter = buffer.read_field::<f64>("t").unwrap();
        assert_eq!(2, iter.len());
        assert_eq!(Some(0.0), iter.next());
        assert_eq!(1, iter.len());
    }

    #[test]
    fn test_view_of_empty_buffer() {
        let mut buffer = StructuredBuffer::new();
        buffer.append_position_fields().unwrap();
        let view = buffer.field_view::<f32>("x").unwrap();
        assert!(view.is_empty());
        assert_eq!(0, view.iter().count());
        assert!(view.at(0).is_err());
    }
}
