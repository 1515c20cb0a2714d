//! Calibration of a [`SphericalProjection`] from a sensor sweep.
//!
//! The sweep is a [`StructuredBuffer`] whose `x`, `y` and `z` fields hold the measured points, stored at the row
//! and column of the sensor image they were sampled at. Points with non-finite coordinates are missed returns
//! and are skipped. Two strategies are available:
//!
//! - [`fit_fast`](SphericalProjection::fit_fast) solves the model from the first extremal rows and columns
//!   found in storage order. It is cheap, but a single corrupted point can throw it off.
//! - [`fit_robust`](SphericalProjection::fit_robust) estimates each axis from many randomly paired points and
//!   takes the candidate with the median step, so a minority of corrupted points does not affect the result.
//!   This is what [`fit`](SphericalProjection::fit) uses.
//!
//! A failed fit leaves the model untouched.
use std::{fmt, time::Instant};

use float_ord::FloatOrd;
use itertools::Itertools;
use nalgebra::Vector3;
use rand::{seq::SliceRandom, thread_rng, Rng};
use rangegrid_core::{
    containers::StructuredBuffer,
    math::spherical::{azimuth, elevation},
    BufferError,
};

use crate::{
    observer::{FitEvent, FitMethod, FitObserver, LogObserver},
    positions::Positions,
    projection::SphericalProjection,
};

/// Angular axis of a [`SphericalProjection`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    /// Varies along the columns
    Azimuth,
    /// Varies along the rows
    Elevation,
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Axis::Azimuth => write!(f, "azimuth"),
            Axis::Elevation => write!(f, "elevation"),
        }
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum FitError {
    #[error("The cloud contains no valid points")]
    NoValidPoints,
    #[error("No pair of valid points spans more than one cell along the {axis} axis")]
    NoCandidates { axis: Axis },
    #[error(transparent)]
    Buffer(#[from] BufferError),
}

/// Options of the robust fit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RobustFitOptions {
    /// Pairing stops once both axes have at least this many candidates, or the valid points are exhausted
    pub min_candidates: usize,
}

impl Default for RobustFitOptions {
    fn default() -> Self {
        Self { min_candidates: 25 }
    }
}

/// Outcome of [`SphericalProjection::check`]
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CheckReport {
    /// Number of points with finite coordinates
    pub valid_points: usize,
    /// Number of valid points that don't project onto the cell they are stored at
    pub mismatched_points: usize,
    /// Mean angle in radians between the measured direction of a mismatched point and the model direction of its
    /// cell. NaN if there are no mismatched points.
    pub mean_residual: f64,
}

impl CheckReport {
    /// True if the mean residual is larger than `tolerance`. A NaN residual never exceeds.
    pub fn exceeds(&self, tolerance: f32) -> bool {
        self.mean_residual > tolerance as f64
    }
}

/// One solution of the affine relation `angle = start + index * step` along one axis
#[derive(Debug, Clone, Copy, PartialEq)]
struct Candidate {
    start: f64,
    step: f64,
}

impl Candidate {
    /// Solves the affine relation from two samples `(index, angle)` with distinct indices
    fn from_samples((i0, a0): (usize, f64), (i1, a1): (usize, f64)) -> Self {
        let step = (a1 - a0) / (i1 as f64 - i0 as f64);
        Self {
            start: a0 - i0 as f64 * step,
            step,
        }
    }
}

#[derive(Debug)]
struct Fit {
    azimuth: Candidate,
    elevation: Candidate,
    azimuth_candidates: usize,
    elevation_candidates: usize,
}

impl SphericalProjection {
    /// Calibrates the model from `cloud` using the robust strategy, see [`fit_robust`](Self::fit_robust)
    pub fn fit(&mut self, cloud: &StructuredBuffer) -> Result<(), FitError> {
        self.fit_robust(cloud)
    }

    /// Calibrates the model from the first points of the extremal rows and columns of `cloud`. Diagnostics are
    /// written to the `log` facade.
    pub fn fit_fast(&mut self, cloud: &StructuredBuffer) -> Result<(), FitError> {
        self.fit_fast_observed(cloud, &LogObserver)
    }

    /// Like [`fit_fast`](Self::fit_fast), reporting to `observer`
    pub fn fit_fast_observed<O: FitObserver + ?Sized>(
        &mut self,
        cloud: &StructuredBuffer,
        observer: &O,
    ) -> Result<(), FitError> {
        let timer = Instant::now();
        let fit = fast_fit(cloud);
        self.finish(FitMethod::Fast, cloud, fit, timer, observer)
    }

    /// Calibrates the model from randomly paired points of `cloud`, with a fresh random generator and the
    /// default [`RobustFitOptions`]. Diagnostics are written to the `log` facade.
    pub fn fit_robust(&mut self, cloud: &StructuredBuffer) -> Result<(), FitError> {
        self.fit_robust_with(
            cloud,
            &mut thread_rng(),
            &RobustFitOptions::default(),
            &LogObserver,
        )
    }

    /// Calibrates the model from randomly paired points of `cloud`.
    ///
    /// The valid points are shuffled with `rng` and consecutive points are paired. Each pair whose points lie in
    /// different columns yields an azimuth candidate, each pair whose points lie in different rows an elevation
    /// candidate. Once both axes have `options.min_candidates` candidates, or all pairs are used up, the
    /// candidate with the median step is chosen for each axis. Fails if an axis has no candidates at all.
    pub fn fit_robust_with<R: Rng + ?Sized, O: FitObserver + ?Sized>(
        &mut self,
        cloud: &StructuredBuffer,
        rng: &mut R,
        options: &RobustFitOptions,
        observer: &O,
    ) -> Result<(), FitError> {
        let timer = Instant::now();
        let fit = robust_fit(cloud, rng, options);
        self.finish(FitMethod::Robust, cloud, fit, timer, observer)
    }

    fn finish<O: FitObserver + ?Sized>(
        &mut self,
        method: FitMethod,
        cloud: &StructuredBuffer,
        fit: Result<Fit, FitError>,
        timer: Instant,
        observer: &O,
    ) -> Result<(), FitError> {
        match fit {
            Ok(fit) => {
                *self = SphericalProjection::new(
                    fit.azimuth.start as f32,
                    fit.azimuth.step as f32,
                    fit.elevation.start as f32,
                    fit.elevation.step as f32,
                    cloud.height(),
                    cloud.width(),
                );
                observer.notify(&FitEvent::Fitted {
                    method,
                    model: *self,
                    azimuth_candidates: fit.azimuth_candidates,
                    elevation_candidates: fit.elevation_candidates,
                    elapsed: timer.elapsed(),
                });
                Ok(())
            }
            Err(error) => {
                observer.notify(&FitEvent::FitFailed {
                    method,
                    error: error.clone(),
                });
                Err(error)
            }
        }
    }

    /// Compares the model against `cloud`, see [`check_observed`](Self::check_observed). Diagnostics are
    /// written to the `log` facade.
    pub fn check(&self, cloud: &StructuredBuffer) -> Result<CheckReport, BufferError> {
        self.check_observed(cloud, &LogObserver)
    }

    /// Projects every valid point of `cloud` and compares the rounded projection with the cell the point is
    /// stored at. For points where they differ, the angle between the measured direction and the model
    /// direction of the cell is accumulated into the mean residual of the returned report. The model itself is
    /// never changed, and the residual is advisory: a large residual is reported to `observer`, not returned as
    /// an error. Only a cloud without usable position fields fails.
    pub fn check_observed<O: FitObserver + ?Sized>(
        &self,
        cloud: &StructuredBuffer,
        observer: &O,
    ) -> Result<CheckReport, BufferError> {
        if (cloud.height(), cloud.width()) != (self.height, self.width) {
            observer.notify(&FitEvent::ExtentMismatch {
                cloud: (cloud.height(), cloud.width()),
                model: (self.height, self.width),
            });
        }
        let positions = Positions::new(cloud)?;
        let width = cloud.width() as usize;

        let mut valid_points = 0;
        let mut mismatched_points = 0;
        let mut residual_sum = 0.0;
        let mut residual_count = 0;
        for index in 0..positions.len() {
            let position = match positions.valid(index) {
                Some(position) => position,
                None => continue,
            };
            valid_points += 1;
            let (row, col) = (index / width, index % width);
            let (projected_row, projected_col) =
                self.project(position.x as f32, position.y as f32, position.z as f32);
            if projected_row.round() == row as f32 && projected_col.round() == col as f32 {
                continue;
            }
            mismatched_points += 1;
            let residual = angle_between(&position, &self.unproject(row as f32, col as f32).cast());
            if residual.is_finite() {
                residual_sum += residual;
                residual_count += 1;
            }
        }

        let report = CheckReport {
            valid_points,
            mismatched_points,
            mean_residual: if residual_count > 0 {
                residual_sum / residual_count as f64
            } else {
                f64::NAN
            },
        };
        observer.notify(&FitEvent::Residual {
            report,
            tolerance: self.azimuth_step.abs().min(self.elevation_step.abs()) / 2.0,
        });
        Ok(report)
    }
}

fn angle_between(a: &Vector3<f64>, b: &Vector3<f64>) -> f64 {
    a.normalize().dot(&b.normalize()).clamp(-1.0, 1.0).acos()
}

fn azimuth_of(position: &Vector3<f64>) -> f64 {
    azimuth(position.x, position.y)
}

fn elevation_of(position: &Vector3<f64>) -> f64 {
    elevation(position.x, position.y, position.z)
}

fn fast_fit(cloud: &StructuredBuffer) -> Result<Fit, FitError> {
    let positions = Positions::new(cloud)?;
    let width = cloud.width() as usize;
    let row = |index: usize| index / width;
    let col = |index: usize| index % width;

    // Indices of the first points of the minimum row, maximum row, minimum column and maximum column
    let mut extrema: Option<[usize; 4]> = None;
    for index in 0..positions.len() {
        if positions.valid(index).is_none() {
            continue;
        }
        let [min_row, max_row, min_col, max_col] = extrema.get_or_insert([index; 4]);
        if row(index) < row(*min_row) {
            *min_row = index;
        }
        if row(index) > row(*max_row) {
            *max_row = index;
        }
        if col(index) < col(*min_col) {
            *min_col = index;
        }
        if col(index) > col(*max_col) {
            *max_col = index;
        }
        if row(*min_row) < row(*max_row) && col(*min_col) < col(*max_col) {
            break;
        }
    }
    let [min_row, max_row, min_col, max_col] = extrema.ok_or(FitError::NoValidPoints)?;
    if row(min_row) == row(max_row) {
        return Err(FitError::NoCandidates {
            axis: Axis::Elevation,
        });
    }
    if col(min_col) == col(max_col) {
        return Err(FitError::NoCandidates {
            axis: Axis::Azimuth,
        });
    }

    let sample = |index: usize, axis_index: usize, angle: fn(&Vector3<f64>) -> f64| {
        positions
            .valid(index)
            .map(|position| (axis_index, angle(&position)))
            .ok_or(FitError::NoValidPoints)
    };
    let elevation = Candidate::from_samples(
        sample(min_row, row(min_row), elevation_of)?,
        sample(max_row, row(max_row), elevation_of)?,
    );
    let azimuth = Candidate::from_samples(
        sample(min_col, col(min_col), azimuth_of)?,
        sample(max_col, col(max_col), azimuth_of)?,
    );
    Ok(Fit {
        azimuth,
        elevation,
        azimuth_candidates: 1,
        elevation_candidates: 1,
    })
}

fn robust_fit<R: Rng + ?Sized>(
    cloud: &StructuredBuffer,
    rng: &mut R,
    options: &RobustFitOptions,
) -> Result<Fit, FitError> {
    let positions = Positions::new(cloud)?;
    let width = cloud.width() as usize;
    let min_candidates = options.min_candidates.max(1);

    let mut valid = (0..positions.len())
        .filter_map(|index| positions.valid(index).map(|position| (index, position)))
        .collect::<Vec<_>>();
    if valid.is_empty() {
        return Err(FitError::NoValidPoints);
    }
    valid.shuffle(rng);

    let capacity = min_candidates.min(valid.len());
    let mut azimuth_candidates = Vec::with_capacity(capacity);
    let mut elevation_candidates = Vec::with_capacity(capacity);
    for ((i0, p0), (i1, p1)) in valid.iter().tuple_windows() {
        let (r0, c0) = (i0 / width, i0 % width);
        let (r1, c1) = (i1 / width, i1 % width);
        if c0 != c1 {
            azimuth_candidates.push(Candidate::from_samples(
                (c0, azimuth_of(p0)),
                (c1, azimuth_of(p1)),
            ));
        }
        if r0 != r1 {
            elevation_candidates.push(Candidate::from_samples(
                (r0, elevation_of(p0)),
                (r1, elevation_of(p1)),
            ));
        }
        if azimuth_candidates.len() >= min_candidates && elevation_candidates.len() >= min_candidates {
            break;
        }
    }

    let azimuth = median_by_step(&mut azimuth_candidates).ok_or(FitError::NoCandidates {
        axis: Axis::Azimuth,
    })?;
    let elevation = median_by_step(&mut elevation_candidates).ok_or(FitError::NoCandidates {
        axis: Axis::Elevation,
    })?;
    Ok(Fit {
        azimuth,
        elevation,
        azimuth_candidates: azimuth_candidates.len(),
        elevation_candidates: elevation_candidates.len(),
    })
}

/// Candidate at the middle position after sorting by step. For an even number of candidates this is the upper
/// of the two middle ones.
fn median_by_step(candidates: &mut [Candidate]) -> Option<Candidate> {
    if candidates.is_empty() {
        return None;
    }
    candidates.sort_by_key(|candidate| FloatOrd(candidate.step));
    Some(candidates[candidates.len() / 2])
}
