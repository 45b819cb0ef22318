use anyhow::Result;
use chrono::Local;
use clap::Parser;
use log::{info, warn};
use std::path::PathBuf;
use std::time::Instant;
use tokio::time::{interval, Duration};

use sleeve_trainer_rs::haptics::{HapticDriver, Zone};
use sleeve_trainer_rs::{
    MemoryStore, MotionSensor, RawImu, SleeveConfig, SleeveController, Vector3,
};

#[derive(Parser, Debug)]
#[command(name = "sleeve_trainer")]
#[command(about = "Arm sleeve form trainer - synthetic sensor demo", long_about = None)]
struct Args {
    /// Duration in seconds (0 = continuous)
    #[arg(value_name = "SECONDS", default_value = "30")]
    duration: u64,

    /// Collect this many baseline shots before scoring
    #[arg(long, default_value = "0")]
    calibrate: u32,

    /// Use the Kalman estimator instead of the low-pass blend
    #[arg(long)]
    kalman: bool,

    /// Optional JSON config file
    #[arg(long)]
    config: Option<PathBuf>,
}

/// Synthetic sensor: a half-sine swing burst every few seconds, resting at
/// 1 g otherwise.
struct MockSensor {
    tick: u64,
}

impl MockSensor {
    const SWING_PERIOD_TICKS: u64 = 400; // one swing every 4 s at 100 Hz
    const SWING_WIDTH_TICKS: u64 = 40;

    fn new() -> Self {
        MockSensor { tick: 0 }
    }
}

impl MotionSensor for MockSensor {
    fn read_raw(&mut self) -> Option<RawImu> {
        let phase = self.tick % Self::SWING_PERIOD_TICKS;
        self.tick += 1;

        let swing = if phase < Self::SWING_WIDTH_TICKS {
            let t = phase as f32 / Self::SWING_WIDTH_TICKS as f32;
            (t * std::f32::consts::PI).sin() * 45000.0
        } else {
            0.0
        };

        Some(RawImu {
            accel: Vector3::new(swing, swing * 0.3, 16384.0),
            gyro: Vector3::new(0.0, 0.0, swing * 0.01),
        })
    }
}

/// Logs intensity transitions instead of driving PWM pins.
struct LogHapticDriver {
    last: [u8; 3],
}

impl LogHapticDriver {
    fn new() -> Self {
        LogHapticDriver { last: [0; 3] }
    }
}

impl HapticDriver for LogHapticDriver {
    fn set_intensity(&mut self, zone: Zone, value: u8) {
        let slot = &mut self.last[zone.index()];
        if *slot != value {
            info!("motor {:?} -> {}", zone, value);
            *slot = value;
        }
    }

    fn is_overheating(&self) -> bool {
        false
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => SleeveConfig::from_json_file(path)?,
        None => SleeveConfig::default(),
    };
    config.use_kalman |= args.kalman;
    config.validate()?;

    info!(
        "sleeve trainer starting at {}: {} Hz, kalman={}, duration={}s",
        Local::now().format("%Y-%m-%d %H:%M:%S"),
        config.sample_rate_hz,
        config.use_kalman,
        args.duration
    );

    let period = Duration::from_millis(config.sample_period_ms());
    let mut controller = SleeveController::new(
        config,
        MockSensor::new(),
        LogHapticDriver::new(),
        MemoryStore::default(),
    );

    if args.calibrate > 0 {
        info!("calibration mode: collecting {} baseline shots", args.calibrate);
        controller.begin_calibration();
    }

    let started = Instant::now();
    let mut ticker = interval(period);
    let mut calibrating = args.calibrate > 0;

    loop {
        ticker.tick().await;
        let now_ms = started.elapsed().as_millis() as u64;

        let report = controller.tick(now_ms);
        if let Some(fault) = &report.fault {
            warn!("{fault}");
        }
        if let Some(shot) = &report.shot {
            match (report.assessment, report.feedback) {
                (Some(assessment), Some(kind)) => info!(
                    "shot: duration {} ms, peak {:.0}, score {:.1} ({:?})",
                    shot.duration_ms, shot.peak_accel, assessment.score, kind,
                ),
                _ => info!(
                    "calibration shot {}: duration {} ms, peak {:.0}",
                    controller.calibration_sample_count(),
                    shot.duration_ms,
                    shot.peak_accel
                ),
            }
        }

        if calibrating && controller.calibration_sample_count() >= args.calibrate {
            match controller.finish_calibration() {
                Ok(baseline) => info!(
                    "baseline ready: peak {:.0} ± {:.0}, duration {:.0} ± {:.0} ms",
                    baseline.mean_peak_accel,
                    baseline.stddev_peak_accel,
                    baseline.mean_duration_ms,
                    baseline.stddev_duration_ms
                ),
                Err(err) => info!("calibration failed: {err}"),
            }
            calibrating = false;
        }

        if args.duration > 0 && started.elapsed().as_secs() >= args.duration {
            break;
        }
    }

    let store = controller.store();
    let scored: Vec<f32> = store
        .shots
        .iter()
        .filter_map(|shot| shot.form_score)
        .collect();
    let mean_score = if scored.is_empty() {
        0.0
    } else {
        scored.iter().sum::<f32>() / scored.len() as f32
    };
    info!(
        "session complete: {} shots, mean score {:.1}",
        store.shots.len(),
        mean_score
    );

    Ok(())
}
