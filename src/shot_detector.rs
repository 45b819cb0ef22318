//! Shot boundary detection.
//!
//! A state machine over filtered samples: `Idle` arms on the shot threshold,
//! `InShot` records trajectory until the magnitude settles below the motion
//! threshold for the timeout interval, and `Cooldown` holds a short dead-time
//! so settling vibration cannot immediately re-trigger.

use crate::config::SleeveConfig;
use crate::trajectory::TrajectoryRecorder;
use crate::types::{MotionSample, Shot};
use log::{debug, warn};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DetectorState {
    Idle,
    InShot,
    Cooldown { until_ms: u64 },
}

pub struct ShotDetector {
    shot_threshold: f32,
    motion_threshold: f32,
    motion_timeout_ms: u64,
    cooldown_ms: u64,
    max_shot_ms: u64,

    state: DetectorState,
    open_shot: Option<Shot>,
    below_since: Option<u64>,
    recorder: TrajectoryRecorder,
}

impl ShotDetector {
    pub fn new(config: &SleeveConfig) -> Self {
        ShotDetector {
            shot_threshold: config.shot_threshold,
            motion_threshold: config.motion_threshold,
            motion_timeout_ms: config.motion_timeout_ms,
            cooldown_ms: config.cooldown_ms,
            max_shot_ms: config.max_shot_ms,
            state: DetectorState::Idle,
            open_shot: None,
            below_since: None,
            recorder: TrajectoryRecorder::new(),
        }
    }

    pub fn state(&self) -> DetectorState {
        self.state
    }

    /// True while a shot is open.
    pub fn in_shot(&self) -> bool {
        self.state == DetectorState::InShot
    }

    /// Feed one filtered sample; returns the finished shot when one closes.
    pub fn update(&mut self, sample: &MotionSample) -> Option<Shot> {
        let now = sample.timestamp_ms;
        match self.state {
            DetectorState::Idle => {
                if sample.magnitude > self.shot_threshold {
                    self.recorder.reset(now);
                    let mut shot = Shot::open(now, self.recorder.position());
                    shot.peak_accel = sample.magnitude;
                    shot.push_point(self.recorder.position());
                    self.open_shot = Some(shot);
                    self.below_since = None;
                    self.state = DetectorState::InShot;
                    debug!("shot opened at {now} ms (magnitude {:.0})", sample.magnitude);
                }
                None
            }
            DetectorState::InShot => {
                let position = self.recorder.integrate(sample);
                let Some(shot) = self.open_shot.as_mut() else {
                    self.state = DetectorState::Idle;
                    return None;
                };
                shot.push_point(position);
                if sample.magnitude > shot.peak_accel {
                    shot.peak_accel = sample.magnitude;
                }

                if sample.magnitude < self.motion_threshold {
                    let since = *self.below_since.get_or_insert(now);
                    if now.saturating_sub(since) >= self.motion_timeout_ms {
                        return self.close(now, false);
                    }
                } else {
                    self.below_since = None;
                }

                // Never-settling shots are force-closed rather than growing
                // unbounded; the note marks them as low-confidence.
                if now.saturating_sub(shot.timestamp_ms) >= self.max_shot_ms {
                    warn!("shot exceeded {} ms without settling, force-closing", self.max_shot_ms);
                    return self.close(now, true);
                }
                None
            }
            DetectorState::Cooldown { until_ms } => {
                if now >= until_ms {
                    self.state = DetectorState::Idle;
                }
                None
            }
        }
    }

    /// Drop any open shot and disarm; called when the sensor disconnects.
    pub fn suspend(&mut self) {
        if self.open_shot.take().is_some() {
            warn!("open shot discarded: detection suspended");
        }
        self.below_since = None;
        self.state = DetectorState::Idle;
    }

    fn close(&mut self, now: u64, truncated: bool) -> Option<Shot> {
        let mut shot = self.open_shot.take()?;
        shot.duration_ms = now.saturating_sub(shot.timestamp_ms);
        shot.end_position = self.recorder.position();
        if truncated {
            shot.add_note("truncated");
        }
        self.below_since = None;
        self.state = DetectorState::Cooldown {
            until_ms: now + self.cooldown_ms,
        };
        debug!(
            "shot closed: duration {} ms, peak {:.0}, {} points",
            shot.duration_ms,
            shot.peak_accel,
            shot.trajectory.len()
        );
        Some(shot)
    }
}
