mod header;
pub use self::header::*;
