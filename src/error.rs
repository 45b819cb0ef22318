use thiserror::Error;

/// Sleeve core error types.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SleeveError {
    /// Transient bus failure. The previous sample is reused; retried next tick.
    #[error("sensor read failed ({consecutive} consecutive)")]
    SensorRead { consecutive: u32 },

    /// Bounded run of read failures exceeded; detection is suspended until a
    /// successful read resumes.
    #[error("sensor disconnected")]
    SensorDisconnected,

    /// Shot exceeded the maximum duration without closing and was force-closed.
    #[error("shot force-closed after {duration_ms} ms")]
    MalformedShot { duration_ms: u64 },

    /// Not enough valid samples, or excessive variance; the baseline stays
    /// invalid and scoring degrades to raw-threshold mode.
    #[error("calibration insufficient: {samples}/{required} samples, accel stddev {accel_stddev:.1}, duration stddev {duration_stddev:.1}")]
    CalibrationInsufficient {
        samples: u32,
        required: u32,
        accel_stddev: f32,
        duration_stddev: f32,
    },

    /// Loaded baseline failed validation and was rejected.
    #[error("corrupt calibration: {0}")]
    CorruptCalibration(String),

    /// Safety-fatal. All haptic output halts until explicit re-enable.
    #[error("motor overheat fault")]
    Overheat,

    #[error("storage error: {0}")]
    Storage(String),
}
