//! The cooperative control loop.
//!
//! One `SleeveController` owns every pipeline component plus the shared
//! state the original firmware kept in globals (the three motors, the active
//! baseline, the latest sample). Each `tick` performs, in order: sensor read
//! → condition → shot detection → (on close) calibration feed or score +
//! dispatch + persist → haptic update. No step blocks; the caller drives the
//! 100 Hz cadence.

use crate::calibration::CalibrationEngine;
use crate::conditioning::SignalConditioner;
use crate::config::SleeveConfig;
use crate::error::SleeveError;
use crate::feedback::{self, FeedbackKind};
use crate::haptics::{HapticDriver, HapticEngine};
use crate::scoring::{FormScorer, ShotAssessment};
use crate::shot_detector::ShotDetector;
use crate::types::{CalibrationBaseline, MotionSample, RawImu, Shot};
use anyhow::Result;
use log::{info, warn};

/// Motion sensor collaborator. `None` signals a failed bus read.
pub trait MotionSensor {
    fn read_raw(&mut self) -> Option<RawImu>;
}

/// Persistence collaborator. Failures are never fatal to the pipeline; the
/// in-memory state stays authoritative for the session.
pub trait ShotStore {
    fn persist_shot(&mut self, shot: &Shot) -> Result<()>;
    fn persist_calibration(&mut self, baseline: &CalibrationBaseline) -> Result<()>;
    fn load_calibration(&mut self) -> Result<Option<CalibrationBaseline>>;
}

/// In-memory store for tests and the demo binary.
#[derive(Default)]
pub struct MemoryStore {
    pub shots: Vec<Shot>,
    pub baseline: Option<CalibrationBaseline>,
}

impl ShotStore for MemoryStore {
    fn persist_shot(&mut self, shot: &Shot) -> Result<()> {
        self.shots.push(shot.clone());
        Ok(())
    }

    fn persist_calibration(&mut self, baseline: &CalibrationBaseline) -> Result<()> {
        self.baseline = Some(baseline.clone());
        Ok(())
    }

    fn load_calibration(&mut self) -> Result<Option<CalibrationBaseline>> {
        Ok(self.baseline.clone())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OperatingMode {
    /// Closed shots are scored and fed back.
    Normal,
    /// Closed shots feed the calibration engine instead.
    Calibrating,
}

/// What one tick produced.
#[derive(Debug, Default)]
pub struct TickReport {
    pub sample: Option<MotionSample>,
    pub shot: Option<Shot>,
    pub assessment: Option<ShotAssessment>,
    pub feedback: Option<FeedbackKind>,
    pub sensor_disconnected: bool,
    /// First fault observed this tick: `MalformedShot` for a force-closed
    /// shot, `Overheat` while the watchdog trips.
    pub fault: Option<SleeveError>,
}

pub struct SleeveController<S, H, P> {
    config: SleeveConfig,
    conditioner: SignalConditioner,
    detector: ShotDetector,
    calibration: CalibrationEngine,
    scorer: FormScorer,
    haptics: HapticEngine,
    baseline: Option<CalibrationBaseline>,
    mode: OperatingMode,

    sensor: S,
    driver: H,
    store: P,
}

impl<S: MotionSensor, H: HapticDriver, P: ShotStore> SleeveController<S, H, P> {
    pub fn new(config: SleeveConfig, sensor: S, driver: H, store: P) -> Self {
        SleeveController {
            conditioner: SignalConditioner::new(&config),
            detector: ShotDetector::new(&config),
            calibration: CalibrationEngine::new(&config),
            scorer: FormScorer::new(&config),
            haptics: HapticEngine::new(),
            baseline: None,
            mode: OperatingMode::Normal,
            config,
            sensor,
            driver,
            store,
        }
    }

    pub fn config(&self) -> &SleeveConfig {
        &self.config
    }

    pub fn mode(&self) -> OperatingMode {
        self.mode
    }

    pub fn baseline(&self) -> Option<&CalibrationBaseline> {
        self.baseline.as_ref()
    }

    pub fn haptics(&self) -> &HapticEngine {
        &self.haptics
    }

    pub fn store(&self) -> &P {
        &self.store
    }

    /// Run one control-loop tick at `now_ms`.
    pub fn tick(&mut self, now_ms: u64) -> TickReport {
        let mut report = TickReport::default();

        let reading = self.sensor.read_raw();
        let closed = match self.conditioner.condition(reading, now_ms) {
            Ok(sample) => {
                report.sample = Some(sample);
                self.detector.update(&sample)
            }
            Err(SleeveError::SensorDisconnected) => {
                report.sensor_disconnected = true;
                self.detector.suspend();
                None
            }
            // Transient failure with nothing to reuse yet; detection simply
            // skips this tick.
            Err(_) => None,
        };

        if let Some(shot) = closed {
            report = self.consume_shot(shot, now_ms, report);
        }

        // Haptic update runs every tick regardless of sensor state; the
        // engine checks the overheat watchdog before rendering anything.
        if let Err(fault) = self.haptics.update(now_ms, &mut self.driver) {
            report.fault.get_or_insert(fault);
        }

        report
    }

    fn consume_shot(&mut self, mut shot: Shot, now_ms: u64, mut report: TickReport) -> TickReport {
        if shot.duration_ms >= self.config.max_shot_ms {
            report.fault = Some(SleeveError::MalformedShot {
                duration_ms: shot.duration_ms,
            });
        }
        match self.mode {
            OperatingMode::Calibrating => {
                self.calibration.add_shot(&shot);
            }
            OperatingMode::Normal => {
                let assessment = self.scorer.score(&mut shot, self.baseline.as_ref());
                report.feedback = Some(feedback::dispatch(&assessment, &mut self.haptics, now_ms));
                report.assessment = Some(assessment);
                if let Err(err) = self.store.persist_shot(&shot) {
                    warn!("failed to persist shot: {err:#}");
                }
            }
        }
        report.shot = Some(shot);
        report
    }

    /// Enter calibration mode, resetting all accumulators.
    pub fn begin_calibration(&mut self) {
        self.calibration.begin();
        self.mode = OperatingMode::Calibrating;
    }

    pub fn calibration_sample_count(&self) -> u32 {
        self.calibration.sample_count()
    }

    /// Leave calibration mode, finalizing the baseline. On
    /// `CalibrationInsufficient` the previous baseline (if any) stays in
    /// effect and calibration must be repeated.
    pub fn finish_calibration(&mut self) -> Result<CalibrationBaseline, SleeveError> {
        self.mode = OperatingMode::Normal;
        let baseline = self.calibration.finish()?;
        if let Err(err) = self.store.persist_calibration(&baseline) {
            warn!("failed to persist calibration: {err:#}");
        }
        info!(
            "calibration complete: peak {:.0} ± {:.0}, duration {:.0} ± {:.0} ms",
            baseline.mean_peak_accel,
            baseline.stddev_peak_accel,
            baseline.mean_duration_ms,
            baseline.stddev_duration_ms
        );
        self.baseline = Some(baseline.clone());
        Ok(baseline)
    }

    /// Load and validate a stored baseline. A baseline that fails validation
    /// is rejected and scoring stays in uncalibrated mode.
    pub fn load_calibration(&mut self) -> Result<bool, SleeveError> {
        let loaded = self
            .store
            .load_calibration()
            .map_err(|err| SleeveError::Storage(err.to_string()))?;
        match loaded {
            Some(baseline) => {
                self.calibration.validate(&baseline)?;
                info!("loaded calibration baseline ({} shots)", baseline.sample_count);
                self.baseline = Some(baseline);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Immediate safety stop; haptic triggers stay rejected until
    /// [`SleeveController::re_enable_haptics`].
    pub fn emergency_stop(&mut self) {
        self.haptics.emergency_stop(&mut self.driver);
    }

    pub fn re_enable_haptics(&mut self) {
        self.haptics.re_enable();
    }
}
