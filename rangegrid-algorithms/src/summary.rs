use std::fmt;

use rangegrid_core::{containers::StructuredBuffer, math::spherical::cartesian_to_spherical, BufferError};

use crate::positions::Positions;

/// Number of samples per axis that summaries aim for
const SAMPLES_PER_AXIS: usize = 8;

/// Azimuth and elevation values in degrees, sampled on a regular sub-grid of a sensor image. Meant for
/// eyeballing a calibration, e.g. by comparing the summary of a model with the summary of the cloud it was
/// fitted to.
#[derive(Debug, Clone, PartialEq)]
pub struct AngleSamples {
    rows: Vec<usize>,
    cols: Vec<usize>,
    azimuth: Vec<f32>,
    elevation: Vec<f32>,
}

impl AngleSamples {
    /// Samples every `max(height / 8, 1)`-th row and every `max(width / 8, 1)`-th column. `angles` returns
    /// `(azimuth, elevation)` in radians for a cell.
    pub(crate) fn sample<F: Fn(usize, usize) -> (f32, f32)>(
        height: usize,
        width: usize,
        angles: F,
    ) -> Self {
        let rows = sample_axis(height);
        let cols = sample_axis(width);
        let mut azimuth = Vec::with_capacity(rows.len() * cols.len());
        let mut elevation = Vec::with_capacity(rows.len() * cols.len());
        for &row in &rows {
            for &col in &cols {
                let (a, e) = angles(row, col);
                azimuth.push(a.to_degrees());
                elevation.push(e.to_degrees());
            }
        }
        Self {
            rows,
            cols,
            azimuth,
            elevation,
        }
    }

    /// Sampled row indices
    pub fn rows(&self) -> &[usize] {
        &self.rows
    }

    /// Sampled column indices
    pub fn cols(&self) -> &[usize] {
        &self.cols
    }

    /// Azimuth in degrees at the `i`-th sampled row and `j`-th sampled column
    pub fn azimuth(&self, i: usize, j: usize) -> Option<f32> {
        self.flat_index(i, j).map(|k| self.azimuth[k])
    }

    /// Elevation in degrees at the `i`-th sampled row and `j`-th sampled column
    pub fn elevation(&self, i: usize, j: usize) -> Option<f32> {
        self.flat_index(i, j).map(|k| self.elevation[k])
    }

    fn flat_index(&self, i: usize, j: usize) -> Option<usize> {
        if i < self.rows.len() && j < self.cols.len() {
            Some(i * self.cols.len() + j)
        } else {
            None
        }
    }

    fn write_grid(&self, f: &mut fmt::Formatter<'_>, values: &[f32]) -> fmt::Result {
        if self.cols.is_empty() {
            return Ok(());
        }
        for row in values.chunks(self.cols.len()) {
            let line = row
                .iter()
                .map(|v| format!("{:.1}", v))
                .collect::<Vec<_>>()
                .join(" ");
            writeln!(f, "{}", line)?;
        }
        Ok(())
    }
}

impl fmt::Display for AngleSamples {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Azimuth sample [deg]:")?;
        self.write_grid(f, &self.azimuth)?;
        writeln!(f, "Elevation sample [deg]:")?;
        self.write_grid(f, &self.elevation)
    }
}

fn sample_axis(len: usize) -> Vec<usize> {
    let stride = (len / SAMPLES_PER_AXIS).max(1);
    (0..len).step_by(stride).collect()
}

/// Samples the measured azimuth and elevation of the points of `cloud` on a sub-grid of roughly 8 x 8
/// cells. Invalid points show up as NaN.
pub fn cloud_summary(cloud: &StructuredBuffer) -> Result<AngleSamples, BufferError> {
    let positions = Positions::new(cloud)?;
    let width = cloud.width() as usize;
    Ok(AngleSamples::sample(
        cloud.height() as usize,
        width,
        |row, col| match positions.get(row * width + col) {
            Some(p) => {
                let (azimuth, elevation, _) = cartesian_to_spherical(p.x, p.y, p.z);
                (azimuth as f32, elevation as f32)
            }
            None => (f32::NAN, f32::NAN),
        },
    ))
}

#[cfg(test)]
mod tests {
    use assert_approx_eq::assert_approx_eq;

    use super::*;
    use crate::projection::SphericalProjection;

    #[test]
    fn test_sample_axis() {
        assert_eq!(vec![0, 1, 2], sample_axis(3));
        assert_eq!(vec![0, 2, 4, 6, 8, 10, 12, 14, 16], sample_axis(17));
        assert!(sample_axis(0).is_empty());
    }

    #[test]
    fn test_model_summary() {
        let model = SphericalProjection::new(-1.0, 0.5, 0.2, 0.1, 4, 4);
        let summary = model.model_summary();
        assert_eq!(&[0, 1, 2, 3], summary.rows());
        assert_eq!(&[0, 1, 2, 3], summary.cols());
        assert_approx_eq!((-1.0f32).to_degrees(), summary.azimuth(0, 0).unwrap(), 1e-3);
        assert_approx_eq!(0.5f32.to_degrees(), summary.azimuth(2, 3).unwrap(), 1e-3);
        assert_approx_eq!(0.4f32.to_degrees(), summary.elevation(2, 3).unwrap(), 1e-3);
        assert_eq!(None, summary.azimuth(4, 0));

        let text = summary.to_string();
        assert_eq!(10, text.lines().count());
        assert!(text.starts_with("Azimuth sample [deg]:\n-57.3 -28.6 0.0 28.6\n"), "{}", text);
    }

    #[test]
    fn test_cloud_summary() {
        let model = SphericalProjection::new(0.0, 0.1, -0.1, 0.05, 2, 3);
        let mut cloud = StructuredBuffer::new();
        cloud.append_position_fields().unwrap();
        cloud.resize(2, 3).unwrap();
        for index in 0..6 {
            let direction = model.unproject((index / 3) as f32, (index % 3) as f32) * 5.0;
            cloud.set_field_at("x", index, direction.x).unwrap();
            cloud.set_field_at("y", index, direction.y).unwrap();
            cloud.set_field_at("z", index, direction.z).unwrap();
        }
        cloud.set_field_at("x", 4, f32::NAN).unwrap();

        let summary = cloud_summary(&cloud).unwrap();
        assert_approx_eq!(0.2f32.to_degrees(), summary.azimuth(0, 2).unwrap(), 1e-3);
        assert_approx_eq!(-0.05f32.to_degrees(), summary.elevation(1, 0).unwrap(), 1e-3);
        assert!(summary.azimuth(1, 1).unwrap().is_nan());
        assert_eq!(model.model_summary().rows(), summary.rows());
    }
}
