use nalgebra::Vector3;
use rangegrid_core::{
    containers::{FieldView, StructuredBuffer},
    layout::{fields, FieldDatatype},
    BufferError,
};

/// Read access to the `x`, `y` and `z` fields of a buffer, stored either as `float32` or as `float64`.
/// Positions are widened to `f64` on access.
#[derive(Debug, Clone, Copy)]
pub enum Positions<'a> {
    F32([FieldView<'a, f32>; 3]),
    F64([FieldView<'a, f64>; 3]),
}

impl<'a> Positions<'a> {
    /// Creates a position view over `buffer`. All three fields must exist and share one floating point
    /// datatype, which is determined by the `x` field.
    pub fn new(buffer: &'a StructuredBuffer) -> Result<Self, BufferError> {
        let x = buffer
            .find_field(fields::X)
            .ok_or_else(|| BufferError::FieldNotFound(fields::X.to_owned()))?;
        match x.datatype() {
            FieldDatatype::Float64 => Ok(Positions::F64([
                buffer.field_view(fields::X)?,
                buffer.field_view(fields::Y)?,
                buffer.field_view(fields::Z)?,
            ])),
            // Anything but float64 goes through the float32 view, which reports the type mismatch
            _ => Ok(Positions::F32([
                buffer.field_view(fields::X)?,
                buffer.field_view(fields::Y)?,
                buffer.field_view(fields::Z)?,
            ])),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Positions::F32(views) => views[0].len(),
            Positions::F64(views) => views[0].len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Position of the point with the given index, or `None` if the index is out of range
    pub fn get(&self, index: usize) -> Option<Vector3<f64>> {
        match self {
            Positions::F32([x, y, z]) => Some(Vector3::new(
                x.get(index)? as f64,
                y.get(index)? as f64,
                z.get(index)? as f64,
            )),
            Positions::F64([x, y, z]) => {
                Some(Vector3::new(x.get(index)?, y.get(index)?, z.get(index)?))
            }
        }
    }

    /// Position of the point with the given index, if the index is in range and all coordinates are finite
    pub fn valid(&self, index: usize) -> Option<Vector3<f64>> {
        self.get(index).filter(is_valid)
    }

    /// Indices of all points with finite coordinates, in storage order
    pub fn valid_indices(&self) -> Vec<usize> {
        (0..self.len())
            .filter(|&index| self.valid(index).is_some())
            .collect()
    }

    /// Iterates over all positions in storage order
    pub fn iter(&self) -> impl Iterator<Item = Vector3<f64>> + '_ {
        (0..self.len()).filter_map(move |index| self.get(index))
    }
}

/// A position is valid if none of its coordinates is NaN or infinite
pub fn is_valid(position: &Vector3<f64>) -> bool {
    position.iter().all(|coordinate| coordinate.is_finite())
}
