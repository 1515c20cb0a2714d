//! Azimuth is the angle within the xy-plane, measured from the x-axis towards the y-axis. Elevation is the angle
//! from the xy-plane to the point, positive towards z. All functions propagate NaN inputs.
use num_traits::Float;

/// Azimuth of the direction `(x, y, *)` in radians, within `[-pi, pi]`
pub fn azimuth<T: Float>(x: T, y: T) -> T {
    y.atan2(x)
}

/// Elevation of the direction `(x, y, z)` in radians, within `[-pi/2, pi/2]`
pub fn elevation<T: Float>(x: T, y: T, z: T) -> T {
    z.atan2(x.hypot(y))
}

/// Converts cartesian coordinates to `(azimuth, elevation, radius)`
/// ```
/// # use rangegrid_core::math::spherical::cartesian_to_spherical;
/// let (azimuth, elevation, radius) = cartesian_to_spherical(0.0f64, 2.0, 0.0);
/// assert!((azimuth - std::f64::consts::FRAC_PI_2).abs() < 1e-12);
/// assert_eq!(0.0, elevation);
/// assert_eq!(2.0, radius);
/// ```
pub fn cartesian_to_spherical<T: Float>(x: T, y: T, z: T) -> (T, T, T) {
    let radius = (x * x + y * y + z * z).sqrt();
    (azimuth(x, y), elevation(x, y, z), radius)
}

/// Converts `(azimuth, elevation, radius)` to cartesian coordinates
pub fn spherical_to_cartesian<T: Float>(azimuth: T, elevation: T, radius: T) -> (T, T, T) {
    let (sin_azimuth, cos_azimuth) = azimuth.sin_cos();
    let (sin_elevation, cos_elevation) = elevation.sin_cos();
    (
        radius * cos_elevation * cos_azimuth,
        radius * cos_elevation * sin_azimuth,
        radius * sin_elevation,
    )
}

#[cfg(test)]
mod tests {
    use assert_approx_eq::assert_approx_eq;

    use super::*;

    #[test]
    fn test_round_trip() {
        for &(azimuth, elevation, radius) in &[
            (0.3f64, 0.1f64, 1.0f64),
            (-2.5, -0.7, 12.0),
            (3.0, 1.2, 0.5),
        ] {
            let (x, y, z) = spherical_to_cartesian(azimuth, elevation, radius);
            let (a, e, r) = cartesian_to_spherical(x, y, z);
            assert_approx_eq!(azimuth, a, 1e-12);
            assert_approx_eq!(elevation, e, 1e-12);
            assert_approx_eq!(radius, r, 1e-12);
        }
    }

    #[test]
    fn test_axes() {
        let (x, y, z) = spherical_to_cartesian(0.0f32, std::f32::consts::FRAC_PI_2, 3.0);
        assert_approx_eq!(0.0, x);
        assert_approx_eq!(0.0, y);
        assert_approx_eq!(3.0, z);
        assert_approx_eq!(std::f32::consts::FRAC_PI_2, elevation(0.0f32, 0.0, 1.0));
        assert_approx_eq!(std::f32::consts::PI, azimuth(-1.0f32, 0.0));
    }

    #[test]
    fn test_nan_propagates() {
        let (azimuth, elevation, radius) = cartesian_to_spherical(f32::NAN, 1.0, 0.0);
        assert!(azimuth.is_nan() && elevation.is_nan() && radius.is_nan());
        let (x, y, z) = spherical_to_cartesian(0.5f32, f32::NAN, 1.0);
        assert!(x.is_nan() && y.is_nan() && z.is_nan());
    }
}
