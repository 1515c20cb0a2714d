use assert_approx_eq::assert_approx_eq;
use rand::{rngs::StdRng, SeedableRng};
use rangegrid_algorithms::{
    synthetic::{corrupt_points, drop_points, sweep},
    FitError, NullObserver, RobustFitOptions, SphericalProjection,
};
use rangegrid_core::{containers::StructuredBuffer, math::spherical::spherical_to_cartesian};

/// 4 x 4 buffer in which row `r`, column `c` holds the unit direction with azimuth `-1.0 + c * 0.5` and elevation
/// `0.2 + r * 0.1`
fn four_by_four() -> StructuredBuffer {
    let mut cloud = StructuredBuffer::new();
    cloud.append_position_fields().unwrap();
    cloud.resize(4, 4).unwrap();
    for row in 0..4 {
        for col in 0..4 {
            let (x, y, z) =
                spherical_to_cartesian(-1.0 + col as f32 * 0.5, 0.2 + row as f32 * 0.1, 1.0);
            let index = cloud.point_index(row, col).unwrap();
            cloud.set_field_at("x", index, x).unwrap();
            cloud.set_field_at("y", index, y).unwrap();
            cloud.set_field_at("z", index, z).unwrap();
        }
    }
    cloud
}

fn fit_robust_seeded(model: &mut SphericalProjection, cloud: &StructuredBuffer, seed: u64) -> Result<(), FitError> {
    model.fit_robust_with(
        cloud,
        &mut StdRng::seed_from_u64(seed),
        &RobustFitOptions::default(),
        &NullObserver,
    )
}

/// Starts are solved at a column or row that can be far from the sampled points, so they get a looser tolerance
fn assert_parameters(expected: &SphericalProjection, actual: &SphericalProjection, step_eps: f32) {
    let start_eps = step_eps * 20.0;
    assert_approx_eq!(expected.azimuth_start(), actual.azimuth_start(), start_eps);
    assert_approx_eq!(expected.azimuth_step(), actual.azimuth_step(), step_eps);
    assert_approx_eq!(expected.elevation_start(), actual.elevation_start(), start_eps);
    assert_approx_eq!(expected.elevation_step(), actual.elevation_step(), step_eps);
}

fn assert_all_within(expected: &SphericalProjection, actual: &SphericalProjection, eps: f32) {
    assert_approx_eq!(expected.azimuth_start(), actual.azimuth_start(), eps);
    assert_approx_eq!(expected.azimuth_step(), actual.azimuth_step(), eps);
    assert_approx_eq!(expected.elevation_start(), actual.elevation_start(), eps);
    assert_approx_eq!(expected.elevation_step(), actual.elevation_step(), eps);
}

#[test]
fn test_four_by_four_both_fits() {
    let cloud = four_by_four();
    let expected = SphericalProjection::new(-1.0, 0.5, 0.2, 0.1, 4, 4);

    let mut fast = SphericalProjection::default();
    assert!(fast.fit_fast(&cloud).is_ok());
    assert_all_within(&expected, &fast, 1e-3);
    assert_eq!((4, 4), (fast.height(), fast.width()));

    let mut robust = SphericalProjection::default();
    assert!(robust.fit_robust(&cloud).is_ok());
    assert_all_within(&expected, &robust, 1e-3);

    let mut model = SphericalProjection::default();
    assert!(model.fit(&cloud).is_ok());
    assert_all_within(&expected, &model, 1e-3);
}

#[test]
fn test_all_nan_cloud() {
    let mut cloud = four_by_four();
    for name in &["x", "y", "z"] {
        cloud.fill_field(name, f32::NAN).unwrap();
    }

    let mut model = SphericalProjection::default();
    assert_eq!(Err(FitError::NoValidPoints), model.fit_fast(&cloud));
    assert_eq!(Err(FitError::NoValidPoints), model.fit_robust(&cloud));
    assert!(!model.is_calibrated());

    // Buffer operations don't care about NaN content
    let selected = cloud.selected(&[5, 2]).unwrap();
    assert_eq!(2, selected.num_points());
    assert!(selected.read_field::<f32>("y").unwrap().all(f32::is_nan));
}

#[test]
fn test_robust_fit_recovers_exact_parameters() {
    let truth = SphericalProjection::new(-2.0, 0.0123, -0.35, 0.0157, 48, 300);
    let cloud = sweep(&truth, 25.0).unwrap();
    for seed in 0..4 {
        let mut model = SphericalProjection::default();
        fit_robust_seeded(&mut model, &cloud, seed).unwrap();
        assert_parameters(&truth, &model, 1e-5);
        assert_eq!((48, 300), (model.height(), model.width()));
    }
}

#[test]
fn test_robust_fit_tolerates_outliers() {
    let truth = SphericalProjection::new(-1.5, 0.01, -0.3, 0.02, 32, 256);
    let mut cloud = sweep(&truth, 12.0).unwrap();
    let mut rng = StdRng::seed_from_u64(42);
    drop_points(&mut cloud, 0.2, &mut rng).unwrap();
    corrupt_points(&mut cloud, 0.05, 12.0, &mut rng).unwrap();

    let mut model = SphericalProjection::default();
    fit_robust_seeded(&mut model, &cloud, 42).unwrap();
    assert_approx_eq!(truth.azimuth_step(), model.azimuth_step(), 1e-4);
    assert_approx_eq!(truth.elevation_step(), model.elevation_step(), 1e-4);
    assert_approx_eq!(truth.azimuth_start(), model.azimuth_start(), 1e-3);
    assert_approx_eq!(truth.elevation_start(), model.elevation_start(), 1e-3);

    let report = model.check_observed(&cloud, &NullObserver).unwrap();
    assert!(report.mismatched_points < report.valid_points / 10);
}

#[test]
fn test_fast_fit_thrown_off_by_extremal_outlier() {
    let truth = SphericalProjection::new(-0.5, 0.02, -0.2, 0.04, 8, 32);
    let mut cloud = sweep(&truth, 5.0).unwrap();
    // The first point is both the first of the minimum row and of the minimum column
    let (x, y, z) = spherical_to_cartesian(2.5f32, 1.0, 5.0);
    cloud.set_field_at("x", 0, x).unwrap();
    cloud.set_field_at("y", 0, y).unwrap();
    cloud.set_field_at("z", 0, z).unwrap();

    let mut fast = SphericalProjection::default();
    fast.fit_fast(&cloud).unwrap();
    assert!((fast.azimuth_step() - truth.azimuth_step()).abs() > 0.01);

    let mut robust = SphericalProjection::default();
    fit_robust_seeded(&mut robust, &cloud, 0).unwrap();
    assert_approx_eq!(truth.azimuth_step(), robust.azimuth_step(), 1e-4);
    assert_approx_eq!(truth.elevation_step(), robust.elevation_step(), 1e-4);
}

#[test]
fn test_project_inverts_unproject_after_fit() {
    let cloud = four_by_four();
    let mut model = SphericalProjection::default();
    model.fit(&cloud).unwrap();
    for row in 0..4 {
        for col in 0..4 {
            let direction = model.unproject(row as f32, col as f32);
            let (r, c) = model.project(direction.x, direction.y, direction.z);
            assert_approx_eq!(row as f32, r, 1e-3);
            assert_approx_eq!(col as f32, c, 1e-3);
        }
    }

    let report = model.check(&cloud).unwrap();
    assert_eq!(16, report.valid_points);
    assert_eq!(0, report.mismatched_points);
}

#[test]
fn test_refit_replaces_parameters() {
    let first = SphericalProjection::new(0.0, 0.01, 0.0, 0.01, 10, 10);
    let second = SphericalProjection::new(0.5, -0.02, -0.1, 0.03, 6, 12);
    let mut model = SphericalProjection::default();
    fit_robust_seeded(&mut model, &sweep(&first, 3.0).unwrap(), 1).unwrap();
    assert_parameters(&first, &model, 1e-5);
    fit_robust_seeded(&mut model, &sweep(&second, 3.0).unwrap(), 1).unwrap();
    assert_parameters(&second, &model, 1e-5);
    assert_eq!((6, 12), (model.height(), model.width()));
}
