//! Maps a scoring outcome to exactly one haptic pattern trigger.

use crate::haptics::{FeedbackIntensity, FeedbackZone, HapticEngine, HapticPattern, Zone};
use crate::scoring::ShotAssessment;
use log::debug;

/// Feedback categories, one per closed shot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FeedbackKind {
    OffTrajectory,
    TooSlow,
    TooFast,
    PoorForm,
    ModerateForm,
    GoodForm,
    CorrectForm,
}

const GOOD_FORM_SCORE: f32 = 70.0;
const MODERATE_FORM_SCORE: f32 = 40.0;
const CORRECT_FORM_SCORE: f32 = 90.0;

/// Classify an assessment. Corrective flags outrank the score bands: an
/// off-trajectory shot gets the trajectory cue even when the score is decent.
pub fn classify(assessment: &ShotAssessment) -> FeedbackKind {
    if assessment.off_trajectory {
        FeedbackKind::OffTrajectory
    } else if assessment.too_slow {
        FeedbackKind::TooSlow
    } else if assessment.too_fast {
        FeedbackKind::TooFast
    } else if assessment.score >= CORRECT_FORM_SCORE {
        FeedbackKind::CorrectForm
    } else if assessment.score >= GOOD_FORM_SCORE {
        FeedbackKind::GoodForm
    } else if assessment.score >= MODERATE_FORM_SCORE {
        FeedbackKind::ModerateForm
    } else {
        FeedbackKind::PoorForm
    }
}

/// Fixed zone/pattern/intensity mapping per category.
pub fn pattern_for(kind: FeedbackKind) -> (FeedbackZone, HapticPattern, FeedbackIntensity) {
    match kind {
        // Alternating cycles the three zones in sequence, so it must target
        // all of them; on a single motor the cycling cue degenerates to one
        // short buzz.
        FeedbackKind::OffTrajectory => (
            FeedbackZone::All,
            HapticPattern::Alternating,
            FeedbackIntensity::Strong,
        ),
        FeedbackKind::TooSlow => (
            FeedbackZone::One(Zone::Wrist),
            HapticPattern::Increasing,
            FeedbackIntensity::Medium,
        ),
        FeedbackKind::TooFast => (
            FeedbackZone::One(Zone::Wrist),
            HapticPattern::Decreasing,
            FeedbackIntensity::Medium,
        ),
        FeedbackKind::PoorForm => (
            FeedbackZone::All,
            HapticPattern::TriplePulse,
            FeedbackIntensity::Strong,
        ),
        FeedbackKind::ModerateForm => (
            FeedbackZone::One(Zone::LowerArm),
            HapticPattern::DoublePulse,
            FeedbackIntensity::Medium,
        ),
        FeedbackKind::GoodForm => (
            FeedbackZone::One(Zone::UpperArm),
            HapticPattern::SinglePulse,
            FeedbackIntensity::Light,
        ),
        FeedbackKind::CorrectForm => (
            FeedbackZone::All,
            HapticPattern::Wave,
            FeedbackIntensity::Light,
        ),
    }
}

/// Dispatch one feedback event for a finished shot.
pub fn dispatch(assessment: &ShotAssessment, engine: &mut HapticEngine, now_ms: u64) -> FeedbackKind {
    let kind = classify(assessment);
    let (zone, pattern, intensity) = pattern_for(kind);
    debug!(
        "feedback {:?} for score {:.1} (slow={} fast={} off={})",
        kind, assessment.score, assessment.too_slow, assessment.too_fast, assessment.off_trajectory
    );
    engine.trigger(zone, pattern, intensity, now_ms);
    kind
}
