//! Range-of-motion extraction and crediting.
//!
//! A joint's ROM is the peak-to-peak excursion of its angle series. Small
//! excursions are pose-estimation jitter and are discarded; larger ones earn
//! full credit only when the joint actually reciprocates (repetitions), and
//! partial credit for a single one-way excursion.

use motionlab_core::{calculate_angle, Frame, JointId, MotionTypeHint, TimedFrame};
use serde::{Deserialize, Serialize};

/// ROM crediting configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RomConfig {
    /// Excursions below this are treated as a non-moving joint (degrees)
    pub noise_floor_deg: f64,
    /// Per-frame change a step must exceed to set the direction (degrees)
    pub reversal_hysteresis_deg: f64,
    /// Reversals needed to call the motion reciprocating
    pub min_reversals: u32,
    /// Credit for a single excursion that never reciprocates
    pub single_excursion_credit: f64,
}

impl Default for RomConfig {
    fn default() -> Self {
        Self {
            noise_floor_deg: 15.0,
            reversal_hysteresis_deg: 2.0,
            min_reversals: 2,
            single_excursion_credit: 0.5,
        }
    }
}

/// Joint angle at one timestamp (radians)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AngleSample {
    pub timestamp_ms: i64,
    pub angle: f64,
}

/// ROM verdict for one joint
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RomAssessment {
    /// Peak-to-peak excursion (degrees)
    pub raw_rom_deg: f64,
    pub reversals: u32,
    pub reciprocating: bool,
    /// ROM after noise floor and reciprocation credit (degrees)
    pub credited_rom_deg: f64,
}

/// Interior joint angle in radians, if all three landmarks are visible
pub fn joint_angle(frame: &Frame, joint: JointId, min_visibility: f64) -> Option<f64> {
    let (a, b, c) = joint.landmarks();
    Some(calculate_angle(
        &frame.visible(a, min_visibility)?,
        &frame.visible(b, min_visibility)?,
        &frame.visible(c, min_visibility)?,
    ))
}

/// Angle time series over the frames where the joint is visible
pub fn angle_series(
    frames: &[TimedFrame],
    joint: JointId,
    min_visibility: f64,
) -> Vec<AngleSample> {
    frames
        .iter()
        .filter_map(|f| {
            joint_angle(&f.landmarks, joint, min_visibility).map(|angle| AngleSample {
                timestamp_ms: f.timestamp_ms,
                angle,
            })
        })
        .collect()
}

pub fn peak_to_peak(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
    max - min
}

/// Count direction reversals between steps that move more than `hysteresis`.
///
/// Steps at or below the threshold are jitter: they neither set nor flip the
/// direction.
pub fn count_reversals(values: &[f64], hysteresis: f64) -> u32 {
    let mut reversals = 0u32;
    let mut direction = 0i8;

    for pair in values.windows(2) {
        let step = pair[1] - pair[0];
        if step.abs() <= hysteresis {
            continue;
        }
        let step_direction = if step > 0.0 { 1 } else { -1 };
        if direction != 0 && step_direction != direction {
            reversals += 1;
        }
        direction = step_direction;
    }

    reversals
}

/// Apply the noise floor and reciprocation credit to a series in degrees
pub fn assess_rom(series_deg: &[f64], config: &RomConfig, hint: MotionTypeHint) -> RomAssessment {
    let raw_rom_deg = peak_to_peak(series_deg);
    let reversals = count_reversals(series_deg, config.reversal_hysteresis_deg);
    let reciprocating = reversals >= config.min_reversals;

    let credited_rom_deg = if raw_rom_deg < config.noise_floor_deg {
        0.0
    } else if reciprocating || hint == MotionTypeHint::Isometric {
        // Holds never reciprocate; the excursion into the hold is the work
        raw_rom_deg
    } else {
        raw_rom_deg * config.single_excursion_credit
    };

    RomAssessment {
        raw_rom_deg,
        reversals,
        reciprocating,
        credited_rom_deg,
    }
}
