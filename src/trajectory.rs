//! Trajectory capture and resampling.
//!
//! Position comes from double integration of the filtered acceleration,
//! reset at every shot open. Integration drift grows quadratically and is
//! not corrected, so consumers compare trajectory *shape* (resampled,
//! point-wise), never absolute position.

use crate::types::{MotionSample, Vector3};

/// Integrates filtered acceleration into a position estimate while a shot
/// is open.
pub struct TrajectoryRecorder {
    velocity: Vector3,
    position: Vector3,
    last_timestamp_ms: Option<u64>,
}

impl TrajectoryRecorder {
    pub fn new() -> Self {
        TrajectoryRecorder {
            velocity: Vector3::zero(),
            position: Vector3::zero(),
            last_timestamp_ms: None,
        }
    }

    /// Zero velocity and position at shot start.
    pub fn reset(&mut self, start_ms: u64) {
        self.velocity = Vector3::zero();
        self.position = Vector3::zero();
        self.last_timestamp_ms = Some(start_ms);
    }

    /// Advance the estimate by one sample and return the new position.
    pub fn integrate(&mut self, sample: &MotionSample) -> Vector3 {
        let dt = match self.last_timestamp_ms {
            Some(last) => (sample.timestamp_ms.saturating_sub(last)) as f32 / 1000.0,
            None => 0.0,
        };
        self.last_timestamp_ms = Some(sample.timestamp_ms);

        self.velocity += sample.accel * dt;
        self.position += self.velocity * dt;
        self.position
    }

    pub fn position(&self) -> Vector3 {
        self.position
    }
}

impl Default for TrajectoryRecorder {
    fn default() -> Self {
        Self::new()
    }
}

/// Resample a point sequence to `target_len` points by linear interpolation
/// along the sequence index.
pub fn resample(points: &[Vector3], target_len: usize) -> Vec<Vector3> {
    if points.is_empty() || target_len == 0 {
        return Vec::new();
    }
    if points.len() == 1 {
        return vec![points[0]; target_len];
    }
    if target_len == 1 {
        return vec![points[0]];
    }

    let mut out = Vec::with_capacity(target_len);
    let scale = (points.len() - 1) as f32 / (target_len - 1) as f32;
    for i in 0..target_len {
        let pos = i as f32 * scale;
        let idx = pos.floor() as usize;
        let frac = pos - idx as f32;
        let point = if idx + 1 < points.len() {
            points[idx] + (points[idx + 1] - points[idx]) * frac
        } else {
            points[points.len() - 1]
        };
        out.push(point);
    }
    out
}

/// Mean point-wise distance between two trajectories after resampling both
/// to a common length, so the result is invariant to the original capture
/// lengths.
pub fn mean_pointwise_distance(a: &[Vector3], b: &[Vector3]) -> f32 {
    if a.is_empty() || b.is_empty() {
        return f32::INFINITY;
    }
    let common = a.len().max(b.len());
    let ra = resample(a, common);
    let rb = resample(b, common);

    let total: f32 = ra
        .iter()
        .zip(rb.iter())
        .map(|(p, q)| p.distance(q))
        .sum();
    total / common as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn line(n: usize, step: f32) -> Vec<Vector3> {
        (0..n)
            .map(|i| Vector3::new(i as f32 * step, 0.0, 0.0))
            .collect()
    }

    #[test]
    fn test_integration_constant_accel() {
        let mut recorder = TrajectoryRecorder::new();
        recorder.reset(0);
        // 1 unit/s² for 1 s at 100 Hz: position approaches 0.5 (discrete sum
        // overshoots slightly).
        let mut position = Vector3::zero();
        for i in 1..=100 {
            let sample = MotionSample {
                accel: Vector3::new(1.0, 0.0, 0.0),
                gyro: Vector3::zero(),
                magnitude: 1.0,
                timestamp_ms: i * 10,
            };
            position = recorder.integrate(&sample);
        }
        assert_relative_eq!(position.x, 0.5, epsilon = 0.02);
        assert_eq!(position.y, 0.0);
    }

    #[test]
    fn test_reset_zeroes_state() {
        let mut recorder = TrajectoryRecorder::new();
        recorder.reset(0);
        let sample = MotionSample {
            accel: Vector3::new(10.0, 0.0, 0.0),
            gyro: Vector3::zero(),
            magnitude: 10.0,
            timestamp_ms: 100,
        };
        recorder.integrate(&sample);
        recorder.reset(200);
        assert_eq!(recorder.position(), Vector3::zero());
    }

    #[test]
    fn test_resample_endpoints_preserved() {
        let points = line(40, 1.0);
        let resampled = resample(&points, 100);
        assert_eq!(resampled.len(), 100);
        assert_relative_eq!(resampled[0].x, 0.0);
        assert_relative_eq!(resampled[99].x, 39.0, epsilon = 1e-3);
    }

    #[test]
    fn test_resample_downsamples() {
        let points = line(100, 1.0);
        let resampled = resample(&points, 10);
        assert_eq!(resampled.len(), 10);
        assert_relative_eq!(resampled[9].x, 99.0, epsilon = 1e-3);
    }

    #[test]
    fn test_resample_single_point() {
        let resampled = resample(&[Vector3::new(2.0, 0.0, 0.0)], 5);
        assert_eq!(resampled.len(), 5);
        assert!(resampled.iter().all(|p| p.x == 2.0));
    }

    #[test]
    fn test_similarity_invariant_to_length() {
        // Same geometric shape (straight line 0..39) captured at 40 and 100
        // points must compare as identical.
        let short = line(40, 1.0);
        let long = resample(&short, 100);
        let distance = mean_pointwise_distance(&short, &long);
        assert!(distance < 1e-3, "distance {distance} not length-invariant");
    }

    #[test]
    fn test_constant_offset_distance() {
        let a = line(50, 1.0);
        let b: Vec<Vector3> = a
            .iter()
            .map(|p| *p + Vector3::new(0.0, 30.0, 0.0))
            .collect();
        assert_relative_eq!(mean_pointwise_distance(&a, &b), 30.0, epsilon = 1e-3);
    }

    #[test]
    fn test_empty_trajectory_is_infinitely_far() {
        assert!(mean_pointwise_distance(&[], &line(5, 1.0)).is_infinite());
    }
}
