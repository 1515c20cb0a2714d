use std::{convert::TryFrom, fmt};

use byteorder::ByteOrder;
use static_assertions::const_assert_eq;

use crate::BufferError;

/// Possible element types of a point field. The discriminants are the datatype codes of the conventional
/// point field wire format, so `datatype as u8` is what goes over the wire.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum FieldDatatype {
    Int8 = 1,
    Uint8 = 2,
    Int16 = 3,
    Uint16 = 4,
    Int32 = 5,
    Uint32 = 6,
    Float32 = 7,
    Float64 = 8,
}

impl FieldDatatype {
    /// All supported datatypes, in wire code order
    pub const ALL: [FieldDatatype; 8] = [
        FieldDatatype::Int8,
        FieldDatatype::Uint8,
        FieldDatatype::Int16,
        FieldDatatype::Uint16,
        FieldDatatype::Int32,
        FieldDatatype::Uint32,
        FieldDatatype::Float32,
        FieldDatatype::Float64,
    ];

    /// Returns the size in bytes of a single element of this datatype
    /// ```
    /// # use rangegrid_core::layout::FieldDatatype;
    /// assert_eq!(4, FieldDatatype::Float32.size());
    /// assert_eq!(1, FieldDatatype::Int8.size());
    /// ```
    pub const fn size(self) -> u32 {
        match self {
            FieldDatatype::Int8 | FieldDatatype::Uint8 => 1,
            FieldDatatype::Int16 | FieldDatatype::Uint16 => 2,
            FieldDatatype::Int32 | FieldDatatype::Uint32 | FieldDatatype::Float32 => 4,
            FieldDatatype::Float64 => 8,
        }
    }

    /// Returns the wire code of this datatype
    pub const fn code(self) -> u8 {
        self as u8
    }

    pub fn is_float(self) -> bool {
        matches!(self, FieldDatatype::Float32 | FieldDatatype::Float64)
    }

    pub fn name(self) -> &'static str {
        match self {
            FieldDatatype::Int8 => "int8",
            FieldDatatype::Uint8 => "uint8",
            FieldDatatype::Int16 => "int16",
            FieldDatatype::Uint16 => "uint16",
            FieldDatatype::Int32 => "int32",
            FieldDatatype::Uint32 => "uint32",
            FieldDatatype::Float32 => "float32",
            FieldDatatype::Float64 => "float64",
        }
    }
}

const_assert_eq!(FieldDatatype::Int8.size() as usize, std::mem::size_of::<i8>());
const_assert_eq!(FieldDatatype::Uint8.size() as usize, std::mem::size_of::<u8>());
const_assert_eq!(FieldDatatype::Int16.size() as usize, std::mem::size_of::<i16>());
const_assert_eq!(FieldDatatype::Uint16.size() as usize, std::mem::size_of::<u16>());
const_assert_eq!(FieldDatatype::Int32.size() as usize, std::mem::size_of::<i32>());
const_assert_eq!(FieldDatatype::Uint32.size() as usize, std::mem::size_of::<u32>());
const_assert_eq!(FieldDatatype::Float32.size() as usize, std::mem::size_of::<f32>());
const_assert_eq!(FieldDatatype::Float64.size() as usize, std::mem::size_of::<f64>());

impl TryFrom<u8> for FieldDatatype {
    type Error = BufferError;

    /// Decodes a wire datatype code
    /// ```
    /// # use std::convert::TryFrom;
    /// # use rangegrid_core::layout::FieldDatatype;
    /// assert_eq!(FieldDatatype::Float32, FieldDatatype::try_from(7).unwrap());
    /// assert!(FieldDatatype::try_from(9).is_err());
    /// ```
    fn try_from(code: u8) -> Result<Self, Self::Error> {
        FieldDatatype::ALL
            .iter()
            .copied()
            .find(|datatype| datatype.code() == code)
            .ok_or_else(|| BufferError::InvalidLayout(format!("Unknown datatype code {}", code)))
    }
}

impl fmt::Display for FieldDatatype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Rust types that can be stored in a point field. Every type maps to exactly one [`FieldDatatype`], which
/// is used to check typed accesses against the schema of a buffer at runtime.
pub trait FieldType: Copy + PartialEq + fmt::Debug + 'static {
    const DATATYPE: FieldDatatype;

    /// Decodes a value from the first `DATATYPE.size()` bytes of `bytes`
    fn read<B: ByteOrder>(bytes: &[u8]) -> Self;
    /// Encodes this value into the first `DATATYPE.size()` bytes of `bytes`
    fn write<B: ByteOrder>(self, bytes: &mut [u8]);
}

impl FieldType for u8 {
    const DATATYPE: FieldDatatype = FieldDatatype::Uint8;

    fn read<B: ByteOrder>(bytes: &[u8]) -> Self {
        bytes[0]
    }

    fn write<B: ByteOrder>(self, bytes: &mut [u8]) {
        bytes[0] = self;
    }
}

impl FieldType for i8 {
    const DATATYPE: FieldDatatype = FieldDatatype::Int8;

    fn read<B: ByteOrder>(bytes: &[u8]) -> Self {
        bytes[0] as i8
    }

    fn write<B: ByteOrder>(self, bytes: &mut [u8]) {
        bytes[0] = self as u8;
    }
}

macro_rules! impl_field_type {
    ($type:ty, $datatype:ident, $read:ident, $write:ident) => {
        impl FieldType for $type {
            const DATATYPE: FieldDatatype = FieldDatatype::$datatype;

            fn read<B: ByteOrder>(bytes: &[u8]) -> Self {
                B::$read(bytes)
            }

            fn write<B: ByteOrder>(self, bytes: &mut [u8]) {
                B::$write(bytes, self)
            }
        }
    };
}

impl_field_type!(i16, Int16, read_i16, write_i16);
impl_field_type!(u16, Uint16, read_u16, write_u16);
impl_field_type!(i32, Int32, read_i32, write_i32);
impl_field_type!(u32, Uint32, read_u32, write_u32);
impl_field_type!(f32, Float32, read_f32, write_f32);
impl_field_type!(f64, Float64, read_f64, write_f64);

#[cfg(test)]
mod tests {
    use byteorder::{BigEndian, LittleEndian};

    use super::*;

    #[test]
    fn test_wire_codes() {
        for (expected_code, datatype) in (1u8..).zip(FieldDatatype::ALL.iter()) {
            assert_eq!(expected_code, datatype.code());
            assert_eq!(*datatype, FieldDatatype::try_from(expected_code).unwrap());
        }
        assert!(FieldDatatype::try_from(0).is_err());
    }

    #[test]
    fn test_byte_order() {
        let mut bytes = [0u8; 4];
        0x0102_0304u32.write::<BigEndian>(&mut bytes);
        assert_eq!([1, 2, 3, 4], bytes);
        assert_eq!(0x0403_0201, u32::read::<LittleEndian>(&bytes));

        let mut bytes = [0u8; 8];
        (-2.5f64).write::<LittleEndian>(&mut bytes);
        assert_eq!(-2.5, f64::read::<LittleEndian>(&bytes));

        let mut byte = [0u8; 1];
        (-3i8).write::<BigEndian>(&mut byte);
        assert_eq!(-3, i8::read::<LittleEndian>(&byte));
    }
}
