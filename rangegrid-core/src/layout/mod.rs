//! Runtime schema of point records: element datatypes, field descriptors and the packed field layout
mod datatype;
pub use self::datatype::*;

mod field_layout;
pub use self::field_layout::*;
