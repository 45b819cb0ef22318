//! Real-time analysis core for a haptic form-training arm sleeve.
//!
//! Converts raw inertial samples into scored training shots and corrective
//! vibration feedback: signal conditioning, shot-boundary detection,
//! trajectory capture, calibration statistics, trajectory-similarity form
//! scoring, and a non-blocking three-motor haptic pattern engine.
//!
//! Everything runs inside one cooperative control loop: the caller invokes
//! [`pipeline::SleeveController::tick`] once per sample period (100 Hz) and
//! no step blocks. Hardware, persistence, and configuration stay behind the
//! [`pipeline::MotionSensor`], [`haptics::HapticDriver`], and
//! [`pipeline::ShotStore`] collaborator traits.

pub mod calibration;
pub mod conditioning;
pub mod config;
pub mod error;
pub mod feedback;
pub mod filters;
pub mod haptics;
pub mod pipeline;
pub mod scoring;
pub mod shot_detector;
pub mod trajectory;
pub mod types;

pub use config::SleeveConfig;
pub use error::SleeveError;
pub use pipeline::{MemoryStore, MotionSensor, OperatingMode, ShotStore, SleeveController};
pub use types::{CalibrationBaseline, MotionSample, RawImu, Shot, Vector3};
