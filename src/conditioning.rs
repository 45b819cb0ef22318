//! Signal conditioning: turns raw sensor reads into filtered motion samples.
//!
//! Gravity removal first (slow low-pass gravity estimate subtracted from the
//! raw acceleration), then smoothing via either an exponential blend or the
//! optional Kalman estimator. Runs once per sampling tick.

use crate::config::SleeveConfig;
use crate::error::SleeveError;
use crate::filters::KalmanFilter3;
use crate::types::{MotionSample, RawImu, Vector3};
use log::warn;

/// 1 g in raw accelerometer LSB.
const GRAVITY_LSB: f32 = 16384.0;
/// Readings within this band of 1 g update the gravity estimate.
const GRAVITY_GATE_LSB: f32 = 4000.0;

pub struct SignalConditioner {
    alpha: f32,
    gravity_alpha: f32,
    max_failures: u32,

    // Gravity estimate in raw units, seeded at 1 g on the z axis.
    gravity: Vector3,
    filtered_accel: Vector3,
    filtered_gyro: Vector3,
    kalman: Option<(KalmanFilter3, KalmanFilter3)>,

    latest: Option<MotionSample>,
    consecutive_failures: u32,
}

impl SignalConditioner {
    pub fn new(config: &SleeveConfig) -> Self {
        let kalman = if config.use_kalman {
            // Accel channel sees far larger excursions than gyro; scale the
            // noise densities accordingly.
            Some((
                KalmanFilter3::new(800.0, 2000.0),
                KalmanFilter3::new(5.0, 15.0),
            ))
        } else {
            None
        };

        SignalConditioner {
            alpha: config.filter_alpha,
            gravity_alpha: config.gravity_alpha,
            max_failures: config.max_sensor_failures,
            gravity: Vector3::new(0.0, 0.0, GRAVITY_LSB),
            filtered_accel: Vector3::zero(),
            filtered_gyro: Vector3::zero(),
            kalman,
            latest: None,
            consecutive_failures: 0,
        }
    }

    /// Condition one raw read into a [`MotionSample`].
    ///
    /// `None` means the bus read failed: the previous sample is reused (with
    /// its original timestamp, so shot timing never advances on stale data)
    /// until the failure run exceeds the bound, after which every call
    /// returns `SensorDisconnected` until a good read arrives.
    pub fn condition(
        &mut self,
        reading: Option<RawImu>,
        now_ms: u64,
    ) -> Result<MotionSample, SleeveError> {
        let raw = match reading {
            Some(raw) => raw,
            None => {
                self.consecutive_failures += 1;
                if self.consecutive_failures >= self.max_failures {
                    if self.consecutive_failures == self.max_failures {
                        warn!(
                            "sensor disconnected after {} consecutive failed reads",
                            self.consecutive_failures
                        );
                    }
                    return Err(SleeveError::SensorDisconnected);
                }
                return match self.latest {
                    Some(stale) => Ok(stale),
                    None => Err(SleeveError::SensorRead {
                        consecutive: self.consecutive_failures,
                    }),
                };
            }
        };

        if self.consecutive_failures >= self.max_failures {
            warn!("sensor read recovered, resuming detection");
        }
        self.consecutive_failures = 0;

        // Track gravity slowly, and only while the sensor reads near 1 g;
        // updating during a swing would fold the swing into the estimate.
        let raw_magnitude = raw.accel.magnitude();
        if (raw_magnitude - GRAVITY_LSB).abs() < GRAVITY_GATE_LSB {
            self.gravity =
                raw.accel * self.gravity_alpha + self.gravity * (1.0 - self.gravity_alpha);
        }
        let linear_accel = raw.accel - self.gravity;

        let (accel, gyro) = match &mut self.kalman {
            Some((accel_kf, gyro_kf)) => (accel_kf.update(linear_accel), gyro_kf.update(raw.gyro)),
            None => {
                self.filtered_accel =
                    linear_accel * self.alpha + self.filtered_accel * (1.0 - self.alpha);
                self.filtered_gyro = raw.gyro * self.alpha + self.filtered_gyro * (1.0 - self.alpha);
                (self.filtered_accel, self.filtered_gyro)
            }
        };

        let sample = MotionSample {
            accel,
            gyro,
            magnitude: accel.magnitude(),
            timestamp_ms: now_ms,
        };
        self.latest = Some(sample);
        Ok(sample)
    }

    /// The single most recent conditioned sample.
    pub fn latest(&self) -> Option<&MotionSample> {
        self.latest.as_ref()
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    pub fn is_disconnected(&self) -> bool {
        self.consecutive_failures >= self.max_failures
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conditioner() -> SignalConditioner {
        SignalConditioner::new(&SleeveConfig::default())
    }

    fn resting_read() -> RawImu {
        RawImu {
            accel: Vector3::new(0.0, 0.0, 16384.0),
            gyro: Vector3::zero(),
        }
    }

    #[test]
    fn test_gravity_removed_at_rest() {
        let mut cond = conditioner();
        let mut sample = None;
        for i in 0..300 {
            sample = Some(cond.condition(Some(resting_read()), i * 10).unwrap());
        }
        // At rest the filtered magnitude settles near zero.
        assert!(sample.unwrap().magnitude < 100.0);
    }

    #[test]
    fn test_swing_passes_through() {
        let mut cond = conditioner();
        for i in 0..100 {
            cond.condition(Some(resting_read()), i * 10).unwrap();
        }
        let mut magnitude = 0.0;
        for i in 100..130 {
            let read = RawImu {
                accel: Vector3::new(20000.0, 0.0, 16384.0),
                gyro: Vector3::zero(),
            };
            magnitude = cond.condition(Some(read), i * 10).unwrap().magnitude;
        }
        assert!(magnitude > 15000.0, "swing attenuated to {magnitude}");
    }

    #[test]
    fn test_failed_read_reuses_stale_sample() {
        let mut cond = conditioner();
        let good = cond.condition(Some(resting_read()), 0).unwrap();
        let stale = cond.condition(None, 10).unwrap();
        assert_eq!(stale.timestamp_ms, good.timestamp_ms);
        assert_eq!(cond.consecutive_failures(), 1);
    }

    #[test]
    fn test_disconnect_after_bounded_failures() {
        let mut cond = conditioner();
        cond.condition(Some(resting_read()), 0).unwrap();
        for i in 1..10 {
            assert!(cond.condition(None, i * 10).is_ok());
        }
        // Tenth consecutive failure escalates.
        assert_eq!(
            cond.condition(None, 100),
            Err(SleeveError::SensorDisconnected)
        );
        assert!(cond.is_disconnected());
    }

    #[test]
    fn test_recovery_after_disconnect() {
        let mut cond = conditioner();
        for i in 0..15 {
            let _ = cond.condition(None, i * 10);
        }
        assert!(cond.is_disconnected());
        assert!(cond.condition(Some(resting_read()), 200).is_ok());
        assert!(!cond.is_disconnected());
    }

    #[test]
    fn test_failure_with_no_prior_sample() {
        let mut cond = conditioner();
        assert_eq!(
            cond.condition(None, 0),
            Err(SleeveError::SensorRead { consecutive: 1 })
        );
    }

    #[test]
    fn test_kalman_path_produces_samples() {
        let config = SleeveConfig {
            use_kalman: true,
            ..Default::default()
        };
        let mut cond = SignalConditioner::new(&config);
        let mut sample = None;
        for i in 0..300 {
            sample = Some(cond.condition(Some(resting_read()), i * 10).unwrap());
        }
        assert!(sample.unwrap().magnitude < 200.0);
    }
}
