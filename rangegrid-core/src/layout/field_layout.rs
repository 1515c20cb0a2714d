use std::{collections::HashSet, fmt, ops::Range};

use super::{FieldDatatype, FieldType};
use crate::{error::Result, BufferError};

/// Names of the conventional point fields
pub mod fields {
    pub const X: &str = "x";
    pub const Y: &str = "y";
    pub const Z: &str = "z";

    pub const NORMAL_X: &str = "nx";
    pub const NORMAL_Y: &str = "ny";
    pub const NORMAL_Z: &str = "nz";

    pub const SEEN_THRU: &str = "seen_thru";
    pub const HIT: &str = "hit";

    pub const NORMAL_POINTS: &str = "normal_pts";
    pub const OBSTACLE_POINTS: &str = "obs_pts";
    pub const GROUND_DIFF_STD: &str = "gnd_diff_std";
    pub const GROUND_DIFF_MIN: &str = "gnd_diff_min";
    pub const GROUND_DIFF_MAX: &str = "gnd_diff_max";
    pub const GROUND_ABS_DIFF_MEAN: &str = "gnd_abs_diff_mean";
    pub const NORMAL_LABEL: &str = "nz_lbl";
    pub const FINAL_LABEL: &str = "final_lbl";

    pub const PATH_COST: &str = "path_cost";
    pub const UTILITY: &str = "utility";
    pub const FINAL_COST: &str = "final_cost";
}

/// Describes a single named field within a point record: its byte offset from the start of the record,
/// the datatype of its elements and the number of elements
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FieldDescriptor {
    name: String,
    offset: u32,
    datatype: FieldDatatype,
    count: u32,
}

impl FieldDescriptor {
    /// Creates a new `FieldDescriptor`. Offsets are usually assigned by [`FieldLayout::append_field`], use this
    /// only for describing records that were received from elsewhere
    pub fn new<S: Into<String>>(name: S, offset: u32, datatype: FieldDatatype, count: u32) -> Self {
        Self {
            name: name.into(),
            offset,
            datatype,
            count,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Offset in bytes from the start of a point record
    pub fn offset(&self) -> u32 {
        self.offset
    }

    pub fn datatype(&self) -> FieldDatatype {
        self.datatype
    }

    /// Number of elements per point
    pub fn count(&self) -> u32 {
        self.count
    }

    /// Size in bytes of this field within a single record
    /// ```
    /// # use rangegrid_core::layout::*;
    /// let field = FieldDescriptor::new("rgb", 0, FieldDatatype::Uint16, 3);
    /// assert_eq!(6, field.size());
    /// ```
    pub fn size(&self) -> u32 {
        self.count * self.datatype.size()
    }

    /// Byte range of this field within a single record
    pub fn byte_range(&self) -> Range<usize> {
        let start = self.offset as usize;
        start..start + self.size() as usize
    }

    /// Returns an error if elements of this field can't be accessed as values of type `T`
    pub fn check_type<T: FieldType>(&self) -> Result<()> {
        if T::DATATYPE != self.datatype {
            return Err(BufferError::TypeMismatch {
                name: self.name.clone(),
                stored: self.datatype,
                requested: T::DATATYPE,
            });
        }
        Ok(())
    }
}

impl fmt::Display for FieldDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{};{} @ offset {}, {} x {}]",
            self.name,
            self.datatype,
            self.offset,
            self.count,
            self.datatype.size()
        )
    }
}

/// Ordered, tightly packed set of fields that describes a single point record. The offset of each field
/// equals the summed size of all previously appended fields, and the point step equals the summed size of
/// all fields.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FieldLayout {
    fields: Vec<FieldDescriptor>,
    point_step: u32,
}

impl FieldLayout {
    /// Creates a new empty `FieldLayout`
    /// ```
    /// # use rangegrid_core::layout::*;
    /// let layout = FieldLayout::new();
    /// # assert_eq!(0, layout.fields().count());
    /// # assert_eq!(0, layout.point_step());
    /// ```
    pub fn new() -> Self {
        Default::default()
    }

    /// Creates a new `FieldLayout` by appending all `(name, datatype, count)` entries in order
    /// ```
    /// # use rangegrid_core::layout::*;
    /// let layout = FieldLayout::from_fields(&[
    ///     ("x", FieldDatatype::Float32, 1),
    ///     ("ring", FieldDatatype::Uint16, 1),
    /// ]).unwrap();
    /// assert_eq!(6, layout.point_step());
    /// ```
    pub fn from_fields(fields: &[(&str, FieldDatatype, u32)]) -> Result<Self> {
        let mut layout = Self::new();
        for (name, datatype, count) in fields {
            layout.append_field(*name, *datatype, *count)?;
        }
        Ok(layout)
    }

    /// Creates a `FieldLayout` from field descriptors as they arrive over the wire. Unlike layouts built
    /// through [`append_field`](Self::append_field), received records may contain padding, so only
    /// uniqueness of the names and containment of each field within `point_step` bytes are checked.
    pub fn from_descriptors(fields: Vec<FieldDescriptor>, point_step: u32) -> Result<Self> {
        let mut names = HashSet::with_capacity(fields.len());
        for field in &fields {
            if !names.insert(field.name()) {
                return Err(BufferError::DuplicateField(field.name().to_owned()));
            }
            let end = field.offset() as u64 + field.size() as u64;
            if end > point_step as u64 {
                return Err(BufferError::InvalidLayout(format!(
                    "Field {} ends at byte {}, but the point step is {}",
                    field, end, point_step
                )));
            }
        }
        Ok(Self { fields, point_step })
    }

    /// Removes all fields and resets the point step to zero
    pub fn reset(&mut self) {
        self.fields.clear();
        self.point_step = 0;
    }

    /// Appends a new field with `count` elements of type `datatype` at the end of the record. Fails if a
    /// field with the same name already exists.
    /// ```
    /// # use rangegrid_core::layout::*;
    /// let mut layout = FieldLayout::new();
    /// layout.append_field("intensity", FieldDatatype::Float32, 1).unwrap();
    /// let ring = layout.append_field("ring", FieldDatatype::Uint16, 1).unwrap();
    /// assert_eq!(4, ring.offset());
    /// assert!(layout.append_field("ring", FieldDatatype::Uint8, 1).is_err());
    /// ```
    pub fn append_field<S: Into<String>>(
        &mut self,
        name: S,
        datatype: FieldDatatype,
        count: u32,
    ) -> Result<&FieldDescriptor> {
        let name = name.into();
        if self.has_field(&name) {
            return Err(BufferError::DuplicateField(name));
        }
        let size = count
            .checked_mul(datatype.size())
            .and_then(|size| size.checked_add(self.point_step))
            .ok_or_else(|| {
                BufferError::InvalidLayout(format!("Point step overflows when appending {}", name))
            })?;
        self.fields
            .push(FieldDescriptor::new(name, self.point_step, datatype, count));
        self.point_step = size;
        Ok(self.fields.last().expect("field was just pushed"))
    }

    /// Appends the `x`, `y` and `z` fields as single `float32` values
    pub fn append_position_fields(&mut self) -> Result<()> {
        self.append_position_fields_as(FieldDatatype::Float32)
    }

    /// Appends the `x`, `y` and `z` fields as single values of the given datatype
    pub fn append_position_fields_as(&mut self, datatype: FieldDatatype) -> Result<()> {
        self.staged(|layout| layout.append_group(&[fields::X, fields::Y, fields::Z], datatype))
    }

    /// Appends the `nx`, `ny` and `nz` fields as single `float32` values
    pub fn append_normal_fields(&mut self) -> Result<()> {
        self.append_normal_fields_as(FieldDatatype::Float32)
    }

    pub fn append_normal_fields_as(&mut self, datatype: FieldDatatype) -> Result<()> {
        self.staged(|layout| {
            layout.append_group(
                &[fields::NORMAL_X, fields::NORMAL_Y, fields::NORMAL_Z],
                datatype,
            )
        })
    }

    /// Appends the 8-bit occupancy counters
    pub fn append_occupancy_fields(&mut self) -> Result<()> {
        self.staged(|layout| {
            layout.append_group(&[fields::SEEN_THRU, fields::HIT], FieldDatatype::Uint8)
        })
    }

    /// Appends the 8-bit traversability statistics (8 bytes in total)
    pub fn append_traversability_fields(&mut self) -> Result<()> {
        self.staged(|layout| {
            layout.append_group(
                &[
                    fields::NORMAL_POINTS,
                    fields::OBSTACLE_POINTS,
                    fields::GROUND_DIFF_STD,
                ],
                FieldDatatype::Uint8,
            )?;
            layout.append_group(
                &[fields::GROUND_DIFF_MIN, fields::GROUND_DIFF_MAX],
                FieldDatatype::Int8,
            )?;
            layout.append_group(
                &[
                    fields::GROUND_ABS_DIFF_MEAN,
                    fields::NORMAL_LABEL,
                    fields::FINAL_LABEL,
                ],
                FieldDatatype::Uint8,
            )
        })
    }

    /// Appends the `float32` planning cost fields
    pub fn append_planning_fields(&mut self) -> Result<()> {
        self.staged(|layout| {
            layout.append_group(
                &[fields::PATH_COST, fields::UTILITY, fields::FINAL_COST],
                FieldDatatype::Float32,
            )
        })
    }

    /// Applies `modify` to a copy of this layout and keeps the copy only if `modify` succeeds
    fn staged<F: FnOnce(&mut Self) -> Result<()>>(&mut self, modify: F) -> Result<()> {
        let mut staged = self.clone();
        modify(&mut staged)?;
        *self = staged;
        Ok(())
    }

    fn append_group(&mut self, names: &[&str], datatype: FieldDatatype) -> Result<()> {
        for name in names {
            self.append_field(*name, datatype, 1)?;
        }
        Ok(())
    }

    /// Returns true if a field with the given name is part of this layout
    pub fn has_field(&self, name: &str) -> bool {
        self.fields.iter().any(|field| field.name() == name)
    }

    /// Returns the field with the given name, or `None` if no such field exists
    pub fn find_field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|field| field.name() == name)
    }

    /// Like [`find_field`](Self::find_field), but fails with `FieldNotFound`
    pub fn field(&self, name: &str) -> Result<&FieldDescriptor> {
        self.find_field(name)
            .ok_or_else(|| BufferError::FieldNotFound(name.to_owned()))
    }

    /// Returns the field with the given name after checking that its elements are of type `T`
    pub fn typed_field<T: FieldType>(&self, name: &str) -> Result<&FieldDescriptor> {
        let field = self.field(name)?;
        field.check_type::<T>()?;
        Ok(field)
    }

    /// Returns an iterator over all fields in declaration order
    pub fn fields(&self) -> impl Iterator<Item = &FieldDescriptor> + '_ {
        self.fields.iter()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Size in bytes of a single point record
    pub fn point_step(&self) -> u32 {
        self.point_step
    }

    pub(crate) fn into_descriptors(self) -> (Vec<FieldDescriptor>, u32) {
        (self.fields, self.point_step)
    }
}

impl fmt::Display for FieldLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "FieldLayout {{")?;
        for field in self.fields() {
            writeln!(f, "\t{}", field)?;
        }
        write!(f, "}} ({} bytes per point)", self.point_step)
    }
}
