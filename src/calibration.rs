//! Calibration statistics accumulation.
//!
//! Baseline shots feed one-pass Welford accumulators (numerically stable
//! mean/variance over peak acceleration and duration) and a running-average
//! reference trajectory held at the canonical 50-point length.

use crate::config::SleeveConfig;
use crate::error::SleeveError;
use crate::trajectory::resample;
use crate::types::{CalibrationBaseline, Shot, Vector3, REFERENCE_TRAJECTORY_POINTS};
use log::info;

/// Welford one-pass mean/variance accumulator.
#[derive(Clone, Debug, Default)]
struct Welford {
    count: u32,
    mean: f64,
    m2: f64,
}

impl Welford {
    fn push(&mut self, value: f64) {
        self.count += 1;
        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        let delta2 = value - self.mean;
        self.m2 += delta * delta2;
    }

    fn mean(&self) -> f32 {
        self.mean as f32
    }

    fn stddev(&self) -> f32 {
        if self.count == 0 {
            return 0.0;
        }
        ((self.m2 / self.count as f64).max(0.0)).sqrt() as f32
    }

    fn reset(&mut self) {
        *self = Welford::default();
    }
}

pub struct CalibrationEngine {
    required_samples: u32,
    max_peak_stddev: f32,
    max_duration_stddev_ms: f32,

    peak: Welford,
    duration: Welford,
    reference: Vec<Vector3>,
}

impl CalibrationEngine {
    pub fn new(config: &SleeveConfig) -> Self {
        CalibrationEngine {
            required_samples: config.calibration_samples,
            max_peak_stddev: config.max_peak_stddev,
            max_duration_stddev_ms: config.max_duration_stddev_ms,
            peak: Welford::default(),
            duration: Welford::default(),
            reference: Vec::new(),
        }
    }

    /// Reset all accumulators for a fresh calibration run.
    pub fn begin(&mut self) {
        self.peak.reset();
        self.duration.reset();
        self.reference.clear();
        info!("calibration started ({} shots required)", self.required_samples);
    }

    pub fn sample_count(&self) -> u32 {
        self.peak.count
    }

    /// Incorporate one baseline shot.
    pub fn add_shot(&mut self, shot: &Shot) {
        self.peak.push(shot.peak_accel as f64);
        self.duration.push(shot.duration_ms as f64);

        // Both the incoming trajectory and the running reference live at the
        // canonical length, so the running average is always well-defined.
        let points = resample(&shot.trajectory, REFERENCE_TRAJECTORY_POINTS);
        if self.reference.is_empty() {
            self.reference = points;
        } else if !points.is_empty() {
            let n = self.peak.count as f32;
            for (avg, point) in self.reference.iter_mut().zip(points.iter()) {
                *avg += (*point - *avg) * (1.0 / n);
            }
        }

        info!(
            "calibration shot {}/{}: peak {:.0}, duration {} ms",
            self.peak.count, self.required_samples, shot.peak_accel, shot.duration_ms
        );
    }

    /// Finalize the accumulated statistics into a baseline.
    ///
    /// The baseline is valid only when enough shots were observed and the
    /// variance stayed within the sanity ceilings; otherwise calibration
    /// must be repeated.
    pub fn finish(&self) -> Result<CalibrationBaseline, SleeveError> {
        let samples = self.peak.count;
        let accel_stddev = self.peak.stddev();
        let duration_stddev = self.duration.stddev();

        let sufficient = samples >= self.required_samples
            && accel_stddev <= self.max_peak_stddev
            && duration_stddev <= self.max_duration_stddev_ms;
        if !sufficient {
            return Err(SleeveError::CalibrationInsufficient {
                samples,
                required: self.required_samples,
                accel_stddev,
                duration_stddev,
            });
        }

        Ok(CalibrationBaseline {
            mean_peak_accel: self.peak.mean(),
            stddev_peak_accel: accel_stddev,
            mean_duration_ms: self.duration.mean(),
            stddev_duration_ms: duration_stddev,
            reference_trajectory: self.reference.clone(),
            sample_count: samples,
            is_valid: true,
        })
    }

    /// Re-check a baseline (e.g. one loaded from storage) before trusting it.
    pub fn validate(&self, baseline: &CalibrationBaseline) -> Result<(), SleeveError> {
        if !baseline.is_valid {
            return Err(SleeveError::CorruptCalibration(
                "validity flag not set".into(),
            ));
        }
        if baseline.sample_count < self.required_samples {
            return Err(SleeveError::CorruptCalibration(format!(
                "only {} of {} samples",
                baseline.sample_count, self.required_samples
            )));
        }
        let stats = [
            baseline.mean_peak_accel,
            baseline.stddev_peak_accel,
            baseline.mean_duration_ms,
            baseline.stddev_duration_ms,
        ];
        if stats.iter().any(|v| !v.is_finite() || *v < 0.0) {
            return Err(SleeveError::CorruptCalibration(
                "non-finite or negative statistics".into(),
            ));
        }
        if baseline.stddev_peak_accel > self.max_peak_stddev
            || baseline.stddev_duration_ms > self.max_duration_stddev_ms
        {
            return Err(SleeveError::CorruptCalibration(
                "variance exceeds sanity ceiling".into(),
            ));
        }
        if baseline.reference_trajectory.is_empty()
            || baseline.reference_trajectory.len() > REFERENCE_TRAJECTORY_POINTS
        {
            return Err(SleeveError::CorruptCalibration(format!(
                "reference trajectory has {} points",
                baseline.reference_trajectory.len()
            )));
        }
        Ok(())
    }
}
