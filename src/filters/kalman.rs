//! Optional Kalman estimator for accel/gyro smoothing.
//!
//! Identity measurement model over a 3-component signal: the estimate tracks
//! the measured vector directly, with the process/measurement noise ratio
//! setting how aggressively it smooths. One instance per sensor channel.

use crate::types::Vector3;
use nalgebra::{Matrix3, Vector3 as NaVector3};

pub struct KalmanFilter3 {
    state: NaVector3<f32>,
    covariance: Matrix3<f32>,
    process_noise: Matrix3<f32>,
    measurement_noise: Matrix3<f32>,
    initialized: bool,
}

impl KalmanFilter3 {
    /// `process_std` controls how fast the estimate is allowed to move,
    /// `measurement_std` how noisy individual readings are assumed to be.
    pub fn new(process_std: f32, measurement_std: f32) -> Self {
        KalmanFilter3 {
            state: NaVector3::zeros(),
            covariance: Matrix3::identity() * 1.0,
            process_noise: Matrix3::identity() * (process_std * process_std),
            measurement_noise: Matrix3::identity() * (measurement_std * measurement_std),
            initialized: false,
        }
    }

    /// Run one predict/update cycle and return the filtered vector.
    pub fn update(&mut self, measurement: Vector3) -> Vector3 {
        let z = NaVector3::new(measurement.x, measurement.y, measurement.z);

        if !self.initialized {
            self.state = z;
            self.initialized = true;
            return measurement;
        }

        // Predict: constant-signal model, covariance grows by process noise.
        self.covariance += self.process_noise;

        // Update with H = I: K = P (P + R)^-1.
        let innovation_cov = self.covariance + self.measurement_noise;
        let gain = match innovation_cov.try_inverse() {
            Some(inv) => self.covariance * inv,
            // Singular innovation covariance cannot occur with positive R,
            // but fall through to the raw measurement rather than panic.
            None => {
                self.state = z;
                return measurement;
            }
        };

        self.state += gain * (z - self.state);
        self.covariance = (Matrix3::identity() - gain) * self.covariance;

        Vector3::new(self.state.x, self.state.y, self.state.z)
    }

    pub fn reset(&mut self) {
        self.state = NaVector3::zeros();
        self.covariance = Matrix3::identity();
        self.initialized = false;
    }
}
