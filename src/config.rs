use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Tunable parameters for the analysis pipeline.
///
/// Defaults match the original sleeve firmware constants. All thresholds are
/// in raw accelerometer units (16384 ≈ 1 g) unless noted.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SleeveConfig {
    /// Target sampling rate for the control loop.
    pub sample_rate_hz: u32,

    /// Exponential smoothing factor (0-1, higher = less smoothing).
    pub filter_alpha: f32,
    /// Use the Kalman estimator instead of the exponential blend.
    pub use_kalman: bool,
    /// Smoothing factor for the slow gravity estimate.
    pub gravity_alpha: f32,
    /// Consecutive failed reads before the sensor counts as disconnected.
    pub max_sensor_failures: u32,

    /// Magnitude that opens a shot.
    pub shot_threshold: f32,
    /// Magnitude below which the shot is considered settling.
    pub motion_threshold: f32,
    /// Continuous time below the motion threshold that closes a shot.
    pub motion_timeout_ms: u64,
    /// Dead-time after close before detection re-arms.
    pub cooldown_ms: u64,
    /// Force-close bound for shots that never settle.
    pub max_shot_ms: u64,

    /// Baseline shots required for a valid calibration.
    pub calibration_samples: u32,
    /// Sanity ceiling on peak-acceleration stddev.
    pub max_peak_stddev: f32,
    /// Sanity ceiling on duration stddev (ms).
    pub max_duration_stddev_ms: f32,

    /// Weight of the trajectory-similarity term.
    pub trajectory_weight: f32,
    /// Weight of the timing/intensity term.
    pub timing_weight: f32,
    /// Mean point-wise distance at which the trajectory term halves.
    pub trajectory_scale: f32,
    /// Mean point-wise distance beyond which the shot is off-trajectory.
    pub off_trajectory_distance: f32,

    /// Generous absolute bounds for the uncalibrated fallback score.
    pub min_peak_accel: f32,
    pub max_duration_bound_ms: u64,
}

impl Default for SleeveConfig {
    fn default() -> Self {
        SleeveConfig {
            sample_rate_hz: 100,
            filter_alpha: 0.3,
            use_kalman: false,
            gravity_alpha: 0.02,
            max_sensor_failures: 10,
            shot_threshold: 15000.0,
            motion_threshold: 5000.0,
            motion_timeout_ms: 1000,
            cooldown_ms: 500,
            max_shot_ms: 5000,
            calibration_samples: 10,
            max_peak_stddev: 4000.0,
            max_duration_stddev_ms: 600.0,
            trajectory_weight: 0.6,
            timing_weight: 0.4,
            trajectory_scale: 20.0,
            off_trajectory_distance: 60.0,
            min_peak_accel: 8000.0,
            max_duration_bound_ms: 3000,
        }
    }
}

impl SleeveConfig {
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: SleeveConfig =
            serde_json::from_str(&text).with_context(|| "parsing sleeve config")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(
            (self.trajectory_weight + self.timing_weight - 1.0).abs() < 1e-3,
            "scoring weights must sum to 1.0"
        );
        anyhow::ensure!(
            self.shot_threshold > self.motion_threshold,
            "shot threshold must exceed motion threshold"
        );
        anyhow::ensure!(self.sample_rate_hz > 0, "sample rate must be positive");
        anyhow::ensure!(
            (0.0..=1.0).contains(&self.filter_alpha),
            "filter alpha must be in [0, 1]"
        );
        Ok(())
    }

    /// Sample period in milliseconds.
    pub fn sample_period_ms(&self) -> u64 {
        (1000 / self.sample_rate_hz.max(1)) as u64
    }
}
