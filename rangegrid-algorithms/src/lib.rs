#![warn(clippy::all)]
//! Algorithms that operate on rangegrid buffers.
//!
//! The central type is the [`SphericalProjection`](projection::SphericalProjection), a sensor model that relates the
//! rows and columns of a [`StructuredBuffer`](rangegrid_core::containers::StructuredBuffer) to directions in 3D, and
//! that can be calibrated from the buffer itself.

// Calibration of spherical projection models: fast and robust fits, and the consistency check.
pub mod calibration;
// Events emitted during calibration and the observers that receive them.
pub mod observer;
// Access to the `x`, `y` and `z` fields of a buffer.
pub mod positions;
// The spherical projection model: forward and inverse projection.
pub mod projection;
// Angle samples for inspecting models and clouds.
pub mod summary;
// Synthetic sensor sweeps.
pub mod synthetic;

pub use nalgebra;

pub use self::calibration::{Axis, CheckReport, FitError, RobustFitOptions};
pub use self::observer::{FitEvent, FitMethod, FitObserver, LogObserver, NullObserver};
pub use self::projection::SphericalProjection;
