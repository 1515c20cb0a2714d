//! Synthetic sensor sweeps, for testing and benchmarking calibration.
use std::f32::consts::{FRAC_PI_2, PI};

use rand::{seq::index::sample, Rng};
use rangegrid_core::{containers::StructuredBuffer, layout::fields, BufferError};

use crate::projection::SphericalProjection;

/// Creates a buffer with `float32` position fields and the extent of `model`, in which every cell holds the
/// point at distance `range` in the model direction of that cell.
pub fn sweep(model: &SphericalProjection, range: f32) -> Result<StructuredBuffer, BufferError> {
    let mut cloud = StructuredBuffer::new();
    cloud.append_position_fields()?;
    cloud.resize(model.height(), model.width())?;

    let width = model.width() as usize;
    let mut xs = Vec::with_capacity(cloud.num_points());
    let mut ys = Vec::with_capacity(cloud.num_points());
    let mut zs = Vec::with_capacity(cloud.num_points());
    for index in 0..cloud.num_points() {
        let point = model.unproject((index / width) as f32, (index % width) as f32) * range;
        xs.push(point.x);
        ys.push(point.y);
        zs.push(point.z);
    }
    cloud.write_field(fields::X, &xs)?;
    cloud.write_field(fields::Y, &ys)?;
    cloud.write_field(fields::Z, &zs)?;
    Ok(cloud)
}

/// Picks `ratio * num_points` distinct random points, at most all of them
fn pick<R: Rng + ?Sized>(cloud: &StructuredBuffer, ratio: f64, rng: &mut R) -> Vec<usize> {
    let len = cloud.num_points();
    let amount = ((len as f64 * ratio.max(0.0)).round() as usize).min(len);
    let mut picked = sample(rng, len, amount).into_vec();
    picked.sort_unstable();
    picked
}

/// Turns a random `ratio` of the points into missed returns by setting their coordinates to NaN. Returns the
/// indices of the dropped points in ascending order.
pub fn drop_points<R: Rng + ?Sized>(
    cloud: &mut StructuredBuffer,
    ratio: f64,
    rng: &mut R,
) -> Result<Vec<usize>, BufferError> {
    let dropped = pick(cloud, ratio, rng);
    for &index in &dropped {
        for name in &[fields::X, fields::Y, fields::Z] {
            cloud.set_field_at(name, index, f32::NAN)?;
        }
    }
    Ok(dropped)
}

/// Moves a random `ratio` of the points to random directions at distance `range`, as if they were returned by
/// a misbehaving sensor. Returns the indices of the corrupted points in ascending order.
pub fn corrupt_points<R: Rng + ?Sized>(
    cloud: &mut StructuredBuffer,
    ratio: f64,
    range: f32,
    rng: &mut R,
) -> Result<Vec<usize>, BufferError> {
    let corrupted = pick(cloud, ratio, rng);
    for &index in &corrupted {
        let model = SphericalProjection::new(
            rng.gen_range(-PI..PI),
            0.0,
            rng.gen_range(-FRAC_PI_2..FRAC_PI_2),
            0.0,
            1,
            1,
        );
        let point = model.unproject(0.0, 0.0) * range;
        cloud.set_field_at(fields::X, index, point.x)?;
        cloud.set_field_at(fields::Y, index, point.y)?;
        cloud.set_field_at(fields::Z, index, point.z)?;
    }
    Ok(corrupted)
}

#[cfg(test)]
mod tests {
    use assert_approx_eq::assert_approx_eq;
    use rand::{rngs::StdRng, SeedableRng};

    use super::*;
    use crate::positions::Positions;

    #[test]
    fn test_sweep() {
        let model = SphericalProjection::new(0.0, 0.1, 0.0, 0.2, 2, 3);
        let cloud = sweep(&model, 4.0).unwrap();
        assert_eq!((2, 3), (cloud.height(), cloud.width()));
        let positions = Positions::new(&cloud).unwrap();
        for index in 0..6 {
            assert_approx_eq!(4.0, positions.get(index).unwrap().norm(), 1e-5);
        }
        assert_approx_eq!(4.0, cloud.field_at::<f32>("x", 0).unwrap());
    }

    #[test]
    fn test_drop_and_corrupt() {
        let model = SphericalProjection::new(0.0, 0.1, 0.0, 0.1, 10, 10);
        let mut cloud = sweep(&model, 4.0).unwrap();
        let mut rng = StdRng::seed_from_u64(3);

        let dropped = drop_points(&mut cloud, 0.25, &mut rng).unwrap();
        assert_eq!(25, dropped.len());
        let positions = Positions::new(&cloud).unwrap();
        assert_eq!(75, positions.valid_indices().len());
        assert!(dropped.iter().all(|&index| positions.valid(index).is_none()));

        let corrupted = corrupt_points(&mut cloud, 2.0, 4.0, &mut rng).unwrap();
        assert_eq!(100, corrupted.len());
        let positions = Positions::new(&cloud).unwrap();
        assert_eq!(100, positions.valid_indices().len());

        assert!(drop_points(&mut cloud, 0.0, &mut rng).unwrap().is_empty());
    }
}
