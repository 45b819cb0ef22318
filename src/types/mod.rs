pub mod vector;

pub use vector::Vector3;

use serde::{Deserialize, Serialize};

/// Upper bound on trajectory points stored per shot. Points past this are
/// dropped, not downsampled (known fidelity loss for very long shots).
pub const MAX_TRAJECTORY_POINTS: usize = 100;

/// Canonical length of the calibration reference trajectory.
pub const REFERENCE_TRAJECTORY_POINTS: usize = 50;

/// One raw bus read from the motion sensor.
///
/// Acceleration is in raw sensor LSB (16384 ≈ 1 g), gyro in deg/s.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct RawImu {
    pub accel: Vector3,
    pub gyro: Vector3,
}

/// Filtered motion sample, produced once per sampling tick.
///
/// Exactly one "latest" sample exists at any time; it is superseded every
/// tick and never persisted.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MotionSample {
    pub accel: Vector3,
    pub gyro: Vector3,
    /// Magnitude of the filtered (gravity-removed) acceleration.
    pub magnitude: f32,
    pub timestamp_ms: u64,
}

/// One discrete training shot, bounded by the detector's open/close
/// transitions.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Shot {
    /// Time the detector opened the shot.
    pub timestamp_ms: u64,
    /// Peak filtered acceleration magnitude observed while open.
    pub peak_accel: f32,
    /// Fixed once the shot closes.
    pub duration_ms: u64,
    /// Set by the form scorer after close; None while open or calibrating.
    pub form_score: Option<f32>,
    pub start_position: Vector3,
    pub end_position: Vector3,
    pub trajectory: Vec<Vector3>,
    pub notes: String,
}

impl Shot {
    pub fn open(timestamp_ms: u64, start_position: Vector3) -> Self {
        Shot {
            timestamp_ms,
            peak_accel: 0.0,
            duration_ms: 0,
            form_score: None,
            start_position,
            end_position: start_position,
            trajectory: Vec::with_capacity(MAX_TRAJECTORY_POINTS),
            notes: String::new(),
        }
    }

    /// Append a trajectory point, retaining only the first
    /// [`MAX_TRAJECTORY_POINTS`].
    pub fn push_point(&mut self, point: Vector3) {
        if self.trajectory.len() < MAX_TRAJECTORY_POINTS {
            self.trajectory.push(point);
        }
    }

    pub fn add_note(&mut self, note: &str) {
        if !self.notes.is_empty() {
            self.notes.push_str("; ");
        }
        self.notes.push_str(note);
    }
}

/// Statistically derived reference learned from a fixed count of baseline
/// shots. Only trusted while `is_valid` holds; persists across sessions via
/// the storage collaborator.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CalibrationBaseline {
    pub mean_peak_accel: f32,
    pub stddev_peak_accel: f32,
    pub mean_duration_ms: f32,
    pub stddev_duration_ms: f32,
    pub reference_trajectory: Vec<Vector3>,
    pub sample_count: u32,
    pub is_valid: bool,
}
