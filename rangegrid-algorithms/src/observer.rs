//! Diagnostics emitted by the calibration routines.
//!
//! Fitting and checking a [`SphericalProjection`] report what they did as [`FitEvent`]s to a [`FitObserver`]
//! instead of writing to a logger themselves. [`LogObserver`] forwards events to the `log` facade and is what
//! the convenience entry points use, [`NullObserver`] drops them, and any `Fn(&FitEvent)` closure can be used
//! to collect them.
use std::{fmt, time::Duration};

use log::{debug, info, warn};

use crate::{
    calibration::{CheckReport, FitError},
    projection::SphericalProjection,
};

/// The calibration strategy that produced an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FitMethod {
    Fast,
    Robust,
}

impl fmt::Display for FitMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FitMethod::Fast => write!(f, "Fast fit"),
            FitMethod::Robust => write!(f, "Robust fit"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FitEvent {
    /// A fit succeeded. The candidate counts are the number of point pairs each axis was estimated from.
    Fitted {
        method: FitMethod,
        model: SphericalProjection,
        azimuth_candidates: usize,
        elevation_candidates: usize,
        elapsed: Duration,
    },
    /// A fit failed, the model was left as it was
    FitFailed { method: FitMethod, error: FitError },
    /// A cloud was checked against a model of a different extent
    ExtentMismatch {
        cloud: (u32, u32),
        model: (u32, u32),
    },
    /// Outcome of a check. `tolerance` is half of the smaller angular step of the model.
    Residual { report: CheckReport, tolerance: f32 },
}

pub trait FitObserver {
    fn notify(&self, event: &FitEvent);
}

impl<F: Fn(&FitEvent)> FitObserver for F {
    fn notify(&self, event: &FitEvent) {
        self(event)
    }
}

/// Discards all events
#[derive(Debug, Clone, Copy, Default)]
pub struct NullObserver;

impl FitObserver for NullObserver {
    fn notify(&self, _event: &FitEvent) {}
}

/// Writes events to the `log` facade. Fast fits are logged at info level, robust fits and acceptable
/// residuals at debug level, failures, extent mismatches and large residuals at warn level.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogObserver;

impl FitObserver for LogObserver {
    fn notify(&self, event: &FitEvent) {
        match event {
            FitEvent::Fitted {
                method,
                model,
                azimuth_candidates,
                elevation_candidates,
                elapsed,
            } => {
                let message = format!(
                    "{}: {} (from {} azimuth and {} elevation candidates, {:.6} s).",
                    method,
                    model,
                    azimuth_candidates,
                    elevation_candidates,
                    elapsed.as_secs_f64()
                );
                match method {
                    FitMethod::Fast => info!("{}", message),
                    FitMethod::Robust => debug!("{}", message),
                }
            }
            FitEvent::FitFailed { method, error } => warn!("{} failed: {}", method, error),
            FitEvent::ExtentMismatch { cloud, model } => warn!(
                "Cloud size ({}, {}) inconsistent with model size ({}, {}).",
                cloud.0, cloud.1, model.0, model.1
            ),
            FitEvent::Residual { report, tolerance } => {
                if report.exceeds(*tolerance) {
                    warn!(
                        "Mean angular error: {:.3} deg over {} / {} points.",
                        report.mean_residual.to_degrees(),
                        report.mismatched_points,
                        report.valid_points
                    );
                } else {
                    debug!(
                        "Mean angular error: {:.3} deg over {} / {} points.",
                        report.mean_residual.to_degrees(),
                        report.mismatched_points,
                        report.valid_points
                    );
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;

    #[test]
    fn test_closure_observer() {
        let events = RefCell::new(Vec::new());
        let observer = |event: &FitEvent| events.borrow_mut().push(event.clone());
        observer.notify(&FitEvent::FitFailed {
            method: FitMethod::Robust,
            error: FitError::NoValidPoints,
        });
        NullObserver.notify(&FitEvent::ExtentMismatch {
            cloud: (1, 2),
            model: (3, 4),
        });
        assert_eq!(
            vec![FitEvent::FitFailed {
                method: FitMethod::Robust,
                error: FitError::NoValidPoints
            }],
            events.into_inner()
        );
    }

    #[test]
    fn test_log_observer_accepts_all_events() {
        let model = SphericalProjection::new(0.0, 0.1, 0.0, 0.1, 2, 2);
        let events = [
            FitEvent::Fitted {
                method: FitMethod::Fast,
                model,
                azimuth_candidates: 1,
                elevation_candidates: 1,
                elapsed: Duration::from_millis(1),
            },
            FitEvent::FitFailed {
                method: FitMethod::Fast,
                error: FitError::NoValidPoints,
            },
            FitEvent::Residual {
                report: CheckReport {
                    valid_points: 4,
                    mismatched_points: 0,
                    mean_residual: f64::NAN,
                },
                tolerance: 0.05,
            },
        ];
        for event in &events {
            LogObserver.notify(event);
        }
        assert_eq!("Robust fit", FitMethod::Robust.to_string());
    }
}
