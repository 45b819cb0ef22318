//! Form scoring against the calibration baseline.
//!
//! Trajectory similarity (resampled, point-wise) gates the score; the
//! timing/intensity z-score term modulates it. Without a valid baseline the
//! scorer degrades to a fixed raw-threshold score and marks the shot
//! "uncalibrated".

use crate::config::SleeveConfig;
use crate::trajectory::mean_pointwise_distance;
use crate::types::{CalibrationBaseline, Shot};

// Floors keep z-scores finite when a near-perfect calibration yields
// stddev ≈ 0.
const PEAK_STDDEV_FLOOR: f32 = 1.0;
const DURATION_STDDEV_FLOOR_MS: f32 = 1.0;

const UNCALIBRATED_IN_BOUNDS_SCORE: f32 = 50.0;
const UNCALIBRATED_OUT_OF_BOUNDS_SCORE: f32 = 25.0;

/// Scoring outcome for one closed shot; drives the feedback dispatcher.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ShotAssessment {
    /// Form score in [0, 100].
    pub score: f32,
    /// Duration above baseline mean + one stddev.
    pub too_slow: bool,
    /// Duration below baseline mean - one stddev.
    pub too_fast: bool,
    /// Mean trajectory distance beyond the configured limit.
    pub off_trajectory: bool,
    /// False when the degraded raw-threshold path was used.
    pub calibrated: bool,
}

pub struct FormScorer {
    trajectory_weight: f32,
    timing_weight: f32,
    trajectory_scale: f32,
    off_trajectory_distance: f32,
    min_peak_accel: f32,
    max_duration_bound_ms: u64,
}

impl FormScorer {
    pub fn new(config: &SleeveConfig) -> Self {
        FormScorer {
            trajectory_weight: config.trajectory_weight,
            timing_weight: config.timing_weight,
            trajectory_scale: config.trajectory_scale,
            off_trajectory_distance: config.off_trajectory_distance,
            min_peak_accel: config.min_peak_accel,
            max_duration_bound_ms: config.max_duration_bound_ms,
        }
    }

    /// Score a closed shot, writing `form_score` (and notes on the degraded
    /// path) back onto it.
    pub fn score(&self, shot: &mut Shot, baseline: Option<&CalibrationBaseline>) -> ShotAssessment {
        let assessment = match baseline.filter(|b| b.is_valid) {
            Some(baseline) => self.score_calibrated(shot, baseline),
            None => {
                shot.add_note("uncalibrated");
                self.score_uncalibrated(shot)
            }
        };
        shot.form_score = Some(assessment.score);
        assessment
    }

    fn score_calibrated(&self, shot: &Shot, baseline: &CalibrationBaseline) -> ShotAssessment {
        let distance = mean_pointwise_distance(&shot.trajectory, &baseline.reference_trajectory);
        // Normalized inverse distance: 1.0 at zero distance, 0.5 at the
        // configured scale.
        let trajectory_term = if distance.is_finite() {
            1.0 / (1.0 + distance / self.trajectory_scale)
        } else {
            0.0
        };

        let peak_stddev = baseline.stddev_peak_accel.max(PEAK_STDDEV_FLOOR);
        let duration_stddev = baseline.stddev_duration_ms.max(DURATION_STDDEV_FLOOR_MS);
        let z_peak = (shot.peak_accel - baseline.mean_peak_accel).abs() / peak_stddev;
        let z_duration =
            (shot.duration_ms as f32 - baseline.mean_duration_ms).abs() / duration_stddev;
        let z_combined = (z_peak * z_peak + z_duration * z_duration).sqrt();
        let timing_term = 1.0 / (1.0 + z_combined);

        // The trajectory term gates the whole score: a shot on a completely
        // wrong path cannot ride a perfect timing term to a passing grade.
        let score = 100.0
            * trajectory_term
            * (self.trajectory_weight + self.timing_weight * timing_term);

        let duration_delta = shot.duration_ms as f32 - baseline.mean_duration_ms;
        ShotAssessment {
            score: score.clamp(0.0, 100.0),
            too_slow: duration_delta > duration_stddev,
            too_fast: duration_delta < -duration_stddev,
            off_trajectory: distance > self.off_trajectory_distance,
            calibrated: true,
        }
    }

    /// Raw-threshold fallback: fixed partial credit from generous absolute
    /// bounds on peak and duration only.
    fn score_uncalibrated(&self, shot: &Shot) -> ShotAssessment {
        let in_bounds = shot.peak_accel >= self.min_peak_accel
            && shot.duration_ms > 0
            && shot.duration_ms <= self.max_duration_bound_ms;
        let score = if in_bounds {
            UNCALIBRATED_IN_BOUNDS_SCORE
        } else {
            UNCALIBRATED_OUT_OF_BOUNDS_SCORE
        };
        ShotAssessment {
            score,
            too_slow: false,
            too_fast: false,
            off_trajectory: false,
            calibrated: false,
        }
    }
}
