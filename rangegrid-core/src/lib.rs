#![warn(clippy::all)]

//! Core data structures for working with range sensor point data
//!
//! rangegrid stores the samples of a range sensor as a self-describing 2D grid of point records. The schema of a
//! record is data, not a compile-time type: producers and consumers negotiate it at runtime as a list of named,
//! typed fields. Start with the [`StructuredBuffer`](crate::containers::StructuredBuffer) type and the
//! [`layout`](crate::layout) module.

/// Point buffers and typed field access
pub mod containers;
/// Defines the schema of point records
pub mod layout;
/// Useful mathematical tools when working with range sensor data
pub mod math;
/// Metadata carried by point buffers
pub mod meta;

mod error;
pub use self::error::{BufferError, ErrorKind, Result};
