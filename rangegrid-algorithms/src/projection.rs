use std::fmt;

use nalgebra::Vector3;
use rangegrid_core::{
    containers::StructuredBuffer,
    math::spherical::{cartesian_to_spherical, spherical_to_cartesian},
    BufferError,
};

use crate::{positions::Positions, summary::AngleSamples};

/// Maps between directions in 3D and the rows and columns of a sensor image, for sensors that sample azimuth
/// and elevation at regular angular steps (spinning lidars, panoramic depth cameras).
///
/// Column `c` looks at azimuth `azimuth_start + c * azimuth_step`, row `r` looks at elevation
/// `elevation_start + r * elevation_step`. Azimuth is the angle within the xy-plane measured from the x-axis
/// towards the y-axis, elevation is the angle from the xy-plane towards positive z. All angles are in radians.
///
/// A model is either created from known parameters with [`new`](Self::new), or calibrated from a sensor
/// sweep with one of the fit methods (see the `calibration` module). A default model is uncalibrated: its
/// parameters are NaN and projecting with it yields NaN.
/// ```
/// # use rangegrid_algorithms::projection::SphericalProjection;
/// let model = SphericalProjection::new(-1.0, 0.5, 0.2, 0.1, 4, 4);
/// let direction = model.unproject(2.0, 3.0);
/// let (row, col) = model.project(direction.x, direction.y, direction.z);
/// assert!((row - 2.0).abs() < 1e-4 && (col - 3.0).abs() < 1e-4);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SphericalProjection {
    pub(crate) azimuth_start: f32,
    pub(crate) azimuth_step: f32,
    pub(crate) elevation_start: f32,
    pub(crate) elevation_step: f32,
    pub(crate) height: u32,
    pub(crate) width: u32,
}

impl Default for SphericalProjection {
    fn default() -> Self {
        Self::uncalibrated()
    }
}

impl SphericalProjection {
    pub fn new(
        azimuth_start: f32,
        azimuth_step: f32,
        elevation_start: f32,
        elevation_step: f32,
        height: u32,
        width: u32,
    ) -> Self {
        Self {
            azimuth_start,
            azimuth_step,
            elevation_start,
            elevation_step,
            height,
            width,
        }
    }

    /// A model without parameters
    pub fn uncalibrated() -> Self {
        Self::new(f32::NAN, f32::NAN, f32::NAN, f32::NAN, 0, 0)
    }

    /// True if all four angular parameters are finite and both steps are non-zero
    pub fn is_calibrated(&self) -> bool {
        [
            self.azimuth_start,
            self.azimuth_step,
            self.elevation_start,
            self.elevation_step,
        ]
        .iter()
        .all(|v| v.is_finite())
            && self.azimuth_step != 0.0
            && self.elevation_step != 0.0
    }

    pub fn azimuth_start(&self) -> f32 {
        self.azimuth_start
    }

    pub fn azimuth_step(&self) -> f32 {
        self.azimuth_step
    }

    pub fn elevation_start(&self) -> f32 {
        self.elevation_start
    }

    pub fn elevation_step(&self) -> f32 {
        self.elevation_step
    }

    /// Number of rows of the sensor image
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Number of columns of the sensor image
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Azimuth of the (possibly fractional) column `col`
    pub fn azimuth_at(&self, col: f32) -> f32 {
        self.azimuth_start + col * self.azimuth_step
    }

    /// Elevation of the (possibly fractional) row `row`
    pub fn elevation_at(&self, row: f32) -> f32 {
        self.elevation_start + row * self.elevation_step
    }

    /// Projects the direction `(x, y, z)` onto fractional `(row, col)` image coordinates. The result is not
    /// rounded or clamped to the image extent, and it is NaN for NaN input or an uncalibrated model.
    pub fn project(&self, x: f32, y: f32, z: f32) -> (f32, f32) {
        let (azimuth, elevation, _) = cartesian_to_spherical(x, y, z);
        (
            (elevation - self.elevation_start) / self.elevation_step,
            (azimuth - self.azimuth_start) / self.azimuth_step,
        )
    }

    /// Unit direction of the (possibly fractional) image coordinates `(row, col)`
    pub fn unproject(&self, row: f32, col: f32) -> Vector3<f32> {
        let (x, y, z) = spherical_to_cartesian(self.azimuth_at(col), self.elevation_at(row), 1.0);
        Vector3::new(x, y, z)
    }

    /// Projects `(x, y, z)` and rounds the result to the nearest cell. Returns `None` if the cell lies
    /// outside of the image or the projection is not finite.
    pub fn project_cell(&self, x: f32, y: f32, z: f32) -> Option<(usize, usize)> {
        let (row, col) = self.project(x, y, z);
        let (row, col) = (row.round(), col.round());
        if !(row >= 0.0 && col >= 0.0 && row < self.height as f32 && col < self.width as f32) {
            return None;
        }
        Some((row as usize, col as usize))
    }

    /// Projects every point of `cloud`, in storage order. Invalid points project to `(NaN, NaN)`.
    pub fn project_points(&self, cloud: &StructuredBuffer) -> Result<Vec<(f32, f32)>, BufferError> {
        let positions = Positions::new(cloud)?;
        Ok(positions
            .iter()
            .map(|p| self.project(p.x as f32, p.y as f32, p.z as f32))
            .collect())
    }

    /// Samples the model's azimuth and elevation on a sub-grid of roughly 8 x 8 cells
    pub fn model_summary(&self) -> AngleSamples {
        AngleSamples::sample(self.height as usize, self.width as usize, |row, col| {
            let direction = self.unproject(row as f32, col as f32);
            let (azimuth, elevation, _) = cartesian_to_spherical(direction.x, direction.y, direction.z);
            (azimuth, elevation)
        })
    }
}

impl fmt::Display for SphericalProjection {
    /// Prints the angular range of the model in degrees
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let last_col = self.width.saturating_sub(1) as f32;
        let last_row = self.height.saturating_sub(1) as f32;
        write!(
            f,
            "{} x {} cells, azimuth [{:.1}, {:.1}] step {:.3} deg, elevation [{:.1}, {:.1}] step {:.3} deg",
            self.height,
            self.width,
            self.azimuth_start.to_degrees(),
            self.azimuth_at(last_col).to_degrees(),
            self.azimuth_step.to_degrees(),
            self.elevation_start.to_degrees(),
            self.elevation_at(last_row).to_degrees(),
            self.elevation_step.to_degrees(),
        )
    }
}
