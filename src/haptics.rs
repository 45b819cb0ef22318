//! Haptic pattern engine.
//!
//! Three motors (upper arm, lower arm, wrist) animate independently within
//! the sampling tick: all timing derives from elapsed-time arithmetic, never
//! delays, so `update` can run every tick without blocking the control loop.
//! A new trigger replaces any in-progress pattern on the targeted motor;
//! patterns never queue.

use crate::error::SleeveError;
use serde::{Deserialize, Serialize};
use log::{error, warn};

/// Physical motor location on the sleeve.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Zone {
    UpperArm,
    LowerArm,
    Wrist,
}

impl Zone {
    /// Wave/alternating order: upper arm first, wrist last.
    pub const ALL: [Zone; 3] = [Zone::UpperArm, Zone::LowerArm, Zone::Wrist];

    pub fn index(self) -> usize {
        match self {
            Zone::UpperArm => 0,
            Zone::LowerArm => 1,
            Zone::Wrist => 2,
        }
    }
}

/// Trigger target: one zone or all three.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FeedbackZone {
    All,
    One(Zone),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeedbackIntensity {
    Light,
    Medium,
    Strong,
}

impl FeedbackIntensity {
    pub fn level(self) -> u8 {
        match self {
            FeedbackIntensity::Light => 64,
            FeedbackIntensity::Medium => 128,
            FeedbackIntensity::Strong => 255,
        }
    }
}

/// Time-varying intensity waveform rendered on one or more motors.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum HapticPattern {
    SinglePulse,
    DoublePulse,
    TriplePulse,
    Continuous,
    Increasing,
    Decreasing,
    Alternating,
    Wave,
}

/// Instantaneous intensity for a motor at `elapsed` ms into a pattern.
/// `motor_index` matters only for the multi-zone patterns.
type PatternRenderer = fn(motor_index: usize, elapsed: u64, duration: u64, target: u8) -> u8;

impl HapticPattern {
    pub fn duration_ms(self) -> u64 {
        match self {
            HapticPattern::SinglePulse => 300,
            HapticPattern::DoublePulse => 600,
            HapticPattern::TriplePulse => 900,
            HapticPattern::Continuous => 1000,
            HapticPattern::Increasing => 1000,
            HapticPattern::Decreasing => 1000,
            HapticPattern::Alternating => 1200,
            HapticPattern::Wave => 900,
        }
    }

    fn renderer(self) -> PatternRenderer {
        match self {
            HapticPattern::SinglePulse => render_single_pulse,
            HapticPattern::DoublePulse => render_double_pulse,
            HapticPattern::TriplePulse => render_triple_pulse,
            HapticPattern::Continuous => render_continuous,
            HapticPattern::Increasing => render_increasing,
            HapticPattern::Decreasing => render_decreasing,
            HapticPattern::Alternating => render_alternating,
            HapticPattern::Wave => render_wave,
        }
    }
}

/// `count` equal-width on/off bursts across the total duration.
fn render_pulses(count: u64, elapsed: u64, duration: u64, target: u8) -> u8 {
    let slot = (duration / (count * 2)).max(1);
    if (elapsed / slot) % 2 == 0 {
        target
    } else {
        0
    }
}

fn render_single_pulse(_i: usize, elapsed: u64, duration: u64, target: u8) -> u8 {
    render_pulses(1, elapsed, duration, target)
}

fn render_double_pulse(_i: usize, elapsed: u64, duration: u64, target: u8) -> u8 {
    render_pulses(2, elapsed, duration, target)
}

fn render_triple_pulse(_i: usize, elapsed: u64, duration: u64, target: u8) -> u8 {
    render_pulses(3, elapsed, duration, target)
}

fn render_continuous(_i: usize, _elapsed: u64, _duration: u64, target: u8) -> u8 {
    target
}

fn render_increasing(_i: usize, elapsed: u64, duration: u64, target: u8) -> u8 {
    (target as u64 * elapsed / duration.max(1)) as u8
}

fn render_decreasing(_i: usize, elapsed: u64, duration: u64, target: u8) -> u8 {
    (target as u64 * (duration.saturating_sub(elapsed)) / duration.max(1)) as u8
}

/// One zone at a time, equal slices, cycling in zone order.
fn render_alternating(motor_index: usize, elapsed: u64, duration: u64, target: u8) -> u8 {
    let slice = (duration / 3).max(1);
    let active = ((elapsed / slice) % 3) as usize;
    if motor_index == active {
        target
    } else {
        0
    }
}

/// Overlapping triangular ramps sweeping upper → lower → wrist.
fn render_wave(motor_index: usize, elapsed: u64, duration: u64, target: u8) -> u8 {
    let offset = motor_index as u64 * duration / 4;
    let width = (duration / 2).max(1);
    if elapsed < offset || elapsed >= offset + width {
        return 0;
    }
    let phase = (elapsed - offset) as f32 / width as f32;
    let envelope = 1.0 - (2.0 * phase - 1.0).abs();
    (target as f32 * envelope) as u8
}

/// Intensity-controllable actuator collaborator, plus the overheat probe the
/// safety watchdog observes each tick.
pub trait HapticDriver {
    fn set_intensity(&mut self, zone: Zone, value: u8);
    fn is_overheating(&self) -> bool;
}

/// One physical motor. Never destroyed, only reset to inactive.
#[derive(Clone, Copy, Debug)]
pub struct Motor {
    pub zone: Zone,
    pub intensity: u8,
    pub active: bool,
    pub pattern: HapticPattern,
    pub target_intensity: u8,
    pub start_ms: u64,
    pub duration_ms: u64,
}

impl Motor {
    fn idle(zone: Zone) -> Self {
        Motor {
            zone,
            intensity: 0,
            active: false,
            pattern: HapticPattern::SinglePulse,
            target_intensity: 0,
            start_ms: 0,
            duration_ms: 0,
        }
    }
}

pub struct HapticEngine {
    motors: [Motor; 3],
    enabled: bool,
}

impl HapticEngine {
    pub fn new() -> Self {
        HapticEngine {
            motors: [
                Motor::idle(Zone::UpperArm),
                Motor::idle(Zone::LowerArm),
                Motor::idle(Zone::Wrist),
            ],
            enabled: true,
        }
    }

    pub fn motors(&self) -> &[Motor; 3] {
        &self.motors
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn any_active(&self) -> bool {
        self.motors.iter().any(|m| m.active)
    }

    /// Start a pattern on the targeted motor(s), unconditionally replacing
    /// whatever was in progress there. Rejected while the engine is disabled
    /// (after an emergency stop); returns whether the trigger was honored.
    pub fn trigger(
        &mut self,
        target: FeedbackZone,
        pattern: HapticPattern,
        intensity: FeedbackIntensity,
        now_ms: u64,
    ) -> bool {
        if !self.enabled {
            warn!("haptic trigger rejected: engine disabled pending re-enable");
            return false;
        }

        let duration = pattern.duration_ms();
        for motor in self.motors.iter_mut() {
            let targeted = match target {
                FeedbackZone::All => true,
                FeedbackZone::One(zone) => motor.zone == zone,
            };
            if !targeted {
                continue;
            }
            motor.active = true;
            motor.pattern = pattern;
            motor.target_intensity = intensity.level();
            motor.start_ms = now_ms;
            motor.duration_ms = duration;
            // Intensity at elapsed = 0, so the first tick renders the
            // pattern's opening value immediately.
            motor.intensity = pattern.renderer()(motor.zone.index(), 0, duration, intensity.level());
        }
        true
    }

    /// Advance every active motor by elapsed-time arithmetic. The overheat
    /// watchdog is observed first, ahead of any pattern rendering, so an
    /// emergency stop takes effect within the same tick. Idle motors are
    /// untouched.
    ///
    /// Returns `Overheat` on every tick the fault persists; the stop itself
    /// (and its log line) fires only on the tick that latches the engine.
    pub fn update(&mut self, now_ms: u64, driver: &mut dyn HapticDriver) -> Result<(), SleeveError> {
        if driver.is_overheating() {
            if self.enabled {
                error!("overheat fault: stopping all haptic output");
                self.emergency_stop(driver);
            }
            return Err(SleeveError::Overheat);
        }

        for motor in self.motors.iter_mut() {
            if !motor.active {
                continue;
            }
            let elapsed = now_ms.saturating_sub(motor.start_ms);
            if elapsed >= motor.duration_ms {
                motor.active = false;
                motor.intensity = 0;
            } else {
                motor.intensity = motor.pattern.renderer()(
                    motor.zone.index(),
                    elapsed,
                    motor.duration_ms,
                    motor.target_intensity,
                );
            }
            driver.set_intensity(motor.zone, motor.intensity);
        }
        Ok(())
    }

    /// Halt all output immediately and latch the engine disabled. Subsequent
    /// triggers are rejected until [`HapticEngine::re_enable`].
    pub fn emergency_stop(&mut self, driver: &mut dyn HapticDriver) {
        for motor in self.motors.iter_mut() {
            motor.active = false;
            motor.intensity = 0;
            driver.set_intensity(motor.zone, 0);
        }
        self.enabled = false;
    }

    /// Explicit operator re-enable after an emergency stop.
    pub fn re_enable(&mut self) {
        self.enabled = true;
    }
}

impl Default for HapticEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Records every intensity write per zone.
    struct RecordingDriver {
        writes: Vec<(Zone, u8)>,
        overheating: bool,
    }

    impl RecordingDriver {
        fn new() -> Self {
            RecordingDriver {
                writes: Vec::new(),
                overheating: false,
            }
        }
    }

    impl HapticDriver for RecordingDriver {
        fn set_intensity(&mut self, zone: Zone, value: u8) {
            self.writes.push((zone, value));
        }

        fn is_overheating(&self) -> bool {
            self.overheating
        }
    }

    #[test]
    fn test_single_pulse_lifecycle() {
        let mut engine = HapticEngine::new();
        let mut driver = RecordingDriver::new();

        assert!(engine.trigger(
            FeedbackZone::One(Zone::UpperArm),
            HapticPattern::SinglePulse,
            FeedbackIntensity::Medium,
            0,
        ));
        let motor = engine.motors()[0];
        assert!(motor.active);
        assert_eq!(motor.intensity, 128);

        engine.update(10, &mut driver).unwrap();
        assert_eq!(engine.motors()[0].intensity, 128);

        // Past the pulse duration the motor returns to idle.
        engine.update(HapticPattern::SinglePulse.duration_ms(), &mut driver).unwrap();
        assert!(!engine.motors()[0].active);
        assert_eq!(engine.motors()[0].intensity, 0);
        assert_eq!(driver.writes.last(), Some(&(Zone::UpperArm, 0)));
    }

    #[test]
    fn test_update_on_idle_motor_is_noop() {
        let mut engine = HapticEngine::new();
        let mut driver = RecordingDriver::new();
        engine.update(100, &mut driver).unwrap();
        assert!(driver.writes.is_empty());
        assert!(!engine.any_active());
    }

    #[test]
    fn test_trigger_replaces_in_progress_pattern() {
        let mut engine = HapticEngine::new();
        engine.trigger(
            FeedbackZone::One(Zone::Wrist),
            HapticPattern::Continuous,
            FeedbackIntensity::Strong,
            0,
        );
        engine.trigger(
            FeedbackZone::One(Zone::Wrist),
            HapticPattern::Increasing,
            FeedbackIntensity::Light,
            500,
        );
        let motor = engine.motors()[2];
        assert_eq!(motor.pattern, HapticPattern::Increasing);
        assert_eq!(motor.target_intensity, 64);
        assert_eq!(motor.start_ms, 500);
    }

    #[test]
    fn test_all_zones_trigger() {
        let mut engine = HapticEngine::new();
        engine.trigger(
            FeedbackZone::All,
            HapticPattern::Continuous,
            FeedbackIntensity::Strong,
            0,
        );
        assert!(engine.motors().iter().all(|m| m.active));
        assert!(engine.motors().iter().all(|m| m.intensity == 255));
    }

    #[test]
    fn test_double_pulse_gap() {
        let mut engine = HapticEngine::new();
        let mut driver = RecordingDriver::new();
        engine.trigger(
            FeedbackZone::One(Zone::LowerArm),
            HapticPattern::DoublePulse,
            FeedbackIntensity::Medium,
            0,
        );
        // 600 ms / 4 slots of 150 ms: on, off, on, off.
        engine.update(50, &mut driver).unwrap();
        assert_eq!(engine.motors()[1].intensity, 128);
        engine.update(200, &mut driver).unwrap();
        assert_eq!(engine.motors()[1].intensity, 0);
        engine.update(350, &mut driver).unwrap();
        assert_eq!(engine.motors()[1].intensity, 128);
        engine.update(550, &mut driver).unwrap();
        assert_eq!(engine.motors()[1].intensity, 0);
    }

    #[test]
    fn test_increasing_ramp() {
        let mut engine = HapticEngine::new();
        let mut driver = RecordingDriver::new();
        engine.trigger(
            FeedbackZone::One(Zone::Wrist),
            HapticPattern::Increasing,
            FeedbackIntensity::Strong,
            0,
        );
        engine.update(0, &mut driver).unwrap();
        let at_start = engine.motors()[2].intensity;
        engine.update(500, &mut driver).unwrap();
        let at_half = engine.motors()[2].intensity;
        engine.update(990, &mut driver).unwrap();
        let near_end = engine.motors()[2].intensity;

        assert_eq!(at_start, 0);
        assert!((126..=129).contains(&at_half), "half-way {at_half}");
        assert!(near_end > 240);
    }

    #[test]
    fn test_decreasing_ramp() {
        let mut engine = HapticEngine::new();
        let mut driver = RecordingDriver::new();
        engine.trigger(
            FeedbackZone::One(Zone::Wrist),
            HapticPattern::Decreasing,
            FeedbackIntensity::Strong,
            0,
        );
        assert_eq!(engine.motors()[2].intensity, 255);
        engine.update(900, &mut driver).unwrap();
        assert!(engine.motors()[2].intensity < 30);
    }

    #[test]
    fn test_alternating_cycles_zones() {
        let mut engine = HapticEngine::new();
        let mut driver = RecordingDriver::new();
        engine.trigger(
            FeedbackZone::All,
            HapticPattern::Alternating,
            FeedbackIntensity::Medium,
            0,
        );

        // 1200 ms / 3 slices: upper, lower, wrist.
        engine.update(100, &mut driver).unwrap();
        let active: Vec<bool> = engine.motors().iter().map(|m| m.intensity > 0).collect();
        assert_eq!(active, vec![true, false, false]);

        engine.update(500, &mut driver).unwrap();
        let active: Vec<bool> = engine.motors().iter().map(|m| m.intensity > 0).collect();
        assert_eq!(active, vec![false, true, false]);

        engine.update(900, &mut driver).unwrap();
        let active: Vec<bool> = engine.motors().iter().map(|m| m.intensity > 0).collect();
        assert_eq!(active, vec![false, false, true]);
    }

    #[test]
    fn test_wave_sweeps_with_overlap() {
        let mut engine = HapticEngine::new();
        let mut driver = RecordingDriver::new();
        engine.trigger(
            FeedbackZone::All,
            HapticPattern::Wave,
            FeedbackIntensity::Strong,
            0,
        );

        // Wave duration 900: upper ramps over 0-450, lower 225-675,
        // wrist 450-900. At 300 ms upper and lower overlap.
        engine.update(300, &mut driver).unwrap();
        let motors = engine.motors();
        assert!(motors[0].intensity > 0);
        assert!(motors[1].intensity > 0);
        assert_eq!(motors[2].intensity, 0);

        // Near the end only the wrist is still ramping.
        engine.update(800, &mut driver).unwrap();
        let motors = engine.motors();
        assert_eq!(motors[0].intensity, 0);
        assert_eq!(motors[1].intensity, 0);
        assert!(motors[2].intensity > 0);
    }

    #[test]
    fn test_emergency_stop_halts_and_latches() {
        let mut engine = HapticEngine::new();
        let mut driver = RecordingDriver::new();
        engine.trigger(
            FeedbackZone::All,
            HapticPattern::Continuous,
            FeedbackIntensity::Strong,
            0,
        );

        engine.emergency_stop(&mut driver);
        assert!(engine.motors().iter().all(|m| !m.active && m.intensity == 0));
        assert!(!engine.is_enabled());

        // Triggers are rejected until explicit re-enable.
        assert!(!engine.trigger(
            FeedbackZone::All,
            HapticPattern::SinglePulse,
            FeedbackIntensity::Light,
            100,
        ));
        assert!(!engine.any_active());

        engine.re_enable();
        assert!(engine.trigger(
            FeedbackZone::All,
            HapticPattern::SinglePulse,
            FeedbackIntensity::Light,
            200,
        ));
    }

    #[test]
    fn test_overheat_forces_stop_within_tick() {
        let mut engine = HapticEngine::new();
        let mut driver = RecordingDriver::new();
        engine.trigger(
            FeedbackZone::All,
            HapticPattern::Continuous,
            FeedbackIntensity::Strong,
            0,
        );

        driver.overheating = true;
        assert_eq!(engine.update(10, &mut driver), Err(SleeveError::Overheat));

        assert!(!engine.any_active());
        assert!(!engine.is_enabled());
        // The stop wrote zeros; no pattern rendering happened this tick.
        assert!(driver.writes.iter().rev().take(3).all(|(_, v)| *v == 0));
    }

    #[test]
    fn test_latched_overheat_stops_only_once() {
        let mut engine = HapticEngine::new();
        let mut driver = RecordingDriver::new();
        engine.trigger(
            FeedbackZone::All,
            HapticPattern::Continuous,
            FeedbackIntensity::Strong,
            0,
        );

        driver.overheating = true;
        assert!(engine.update(10, &mut driver).is_err());
        let writes_after_stop = driver.writes.len();

        // While latched, later ticks keep reporting the fault but write
        // nothing further to the hardware.
        assert!(engine.update(20, &mut driver).is_err());
        assert!(engine.update(30, &mut driver).is_err());
        assert_eq!(driver.writes.len(), writes_after_stop);
    }
}
