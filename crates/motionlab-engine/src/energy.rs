//! Energy-leak attribution.
//!
//! Splits a gross joint-motion signal into force reaching the prime movers
//! ("effective") and force absorbed by compensating muscles and joints
//! ("leaked"). Stability faults lower the efficiency of the transfer; specific
//! faults route their leak into specific compensators:
//!
//! - shoulder elevation → trapezius
//! - rounded shoulders → biceps/triceps, and dampened lats/pecs
//! - knee valgus → adductors and both knees
//! - hip-dominant hinging → quadriceps taking over from glutes

use motionlab_core::{JointId, MotionPattern, MovementState, Muscle, StabilityMetrics, TargetArea};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::stability::stability_penalty;

use Muscle::*;

type Weights = &'static [(Muscle, f64)];

const VERTICAL_PUSH: Weights = &[
    (Deltoids, 2.5),
    (Triceps, 1.5),
    (Pectorals, 0.4),
    (Trapezius, 0.6),
];
const HORIZONTAL_PUSH: Weights = &[(Pectorals, 2.5), (Triceps, 1.2), (Deltoids, 0.8)];
const VERTICAL_PULL: Weights = &[
    (Latissimus, 2.5),
    (Biceps, 1.0),
    (Trapezius, 0.8),
    (Rhomboids, 0.7),
];
const HORIZONTAL_PULL: Weights = &[
    (Rhomboids, 2.0),
    (Latissimus, 1.5),
    (Trapezius, 1.0),
    (Biceps, 1.0),
];
const KNEE_DOMINANT: Weights = &[(Quadriceps, 1.2), (Glutes, 0.8), (Hamstrings, 0.3)];
const HIP_DOMINANT: Weights = &[(Hamstrings, 1.2), (Glutes, 1.2), (Quadriceps, 0.2)];

const UPPER_DEFAULT: Weights = &[
    (Deltoids, 1.0),
    (Pectorals, 1.0),
    (Latissimus, 1.0),
    (Trapezius, 0.5),
];
const LOWER_DEFAULT: Weights = &[(Quadriceps, 1.0), (Glutes, 1.0), (Hamstrings, 0.8)];
const FULL_DEFAULT: Weights = &[
    (Deltoids, 1.0),
    (Pectorals, 1.0),
    (Latissimus, 1.0),
    (Trapezius, 0.5),
    (Quadriceps, 1.0),
    (Glutes, 1.0),
    (Hamstrings, 0.8),
];

/// Prime-mover weights for patterns that identify one
pub fn pattern_weights(pattern: MotionPattern) -> Option<Weights> {
    match pattern {
        MotionPattern::VerticalPush => Some(VERTICAL_PUSH),
        MotionPattern::HorizontalPush => Some(HORIZONTAL_PUSH),
        MotionPattern::VerticalPull => Some(VERTICAL_PULL),
        MotionPattern::HorizontalPull => Some(HORIZONTAL_PULL),
        MotionPattern::KneeDominant => Some(KNEE_DOMINANT),
        MotionPattern::HipDominant => Some(HIP_DOMINANT),
        MotionPattern::Stabilizing | MotionPattern::Vertical | MotionPattern::Horizontal => None,
    }
}

/// Fallback weights when the pattern names no prime movers in the target area
pub fn region_default_weights(target_area: TargetArea) -> Weights {
    match target_area {
        TargetArea::Upper => UPPER_DEFAULT,
        TargetArea::Lower => LOWER_DEFAULT,
        TargetArea::Full => FULL_DEFAULT,
    }
}

/// Weights actually applied for a pattern within a target area
pub fn weights_for(pattern: MotionPattern, target_area: TargetArea) -> Weights {
    match (pattern_weights(pattern), pattern.region()) {
        (Some(weights), Some(region)) if target_area.includes(region) => weights,
        _ => region_default_weights(target_area),
    }
}

/// Effective/compensation split for one session
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnergyLeakResult {
    pub effective_muscle_scores: BTreeMap<Muscle, f64>,
    pub compensation_muscle_scores: BTreeMap<Muscle, f64>,
    pub joint_stress_scores: BTreeMap<JointId, f64>,
    /// Fraction of the input force reaching the prime movers [0, 1]
    pub efficiency: f64,
    pub stability_penalty: f64,
    pub effective_force: f64,
    pub leaked_energy: f64,
}

impl EnergyLeakResult {
    pub fn effective(&self, muscle: Muscle) -> f64 {
        self.effective_muscle_scores.get(&muscle).copied().unwrap_or(0.0)
    }

    pub fn compensation(&self, muscle: Muscle) -> f64 {
        self.compensation_muscle_scores.get(&muscle).copied().unwrap_or(0.0)
    }

    pub fn joint_stress(&self, joint: JointId) -> f64 {
        self.joint_stress_scores.get(&joint).copied().unwrap_or(0.0)
    }
}

/// Stateless effective-vs-leaked force distributor
#[derive(Debug, Clone, Copy, Default)]
pub struct EnergyLeakEngine;

impl EnergyLeakEngine {
    pub fn new() -> Self {
        Self
    }

    /// Per-pattern penalty on top of the stability penalty.
    ///
    /// Always 0 for now: STABILIZING never reaches this stage and no other
    /// pattern is penalized yet.
    pub fn pattern_penalty(&self, _pattern: MotionPattern, _state: MovementState) -> f64 {
        0.0
    }

    pub fn calculate(
        &self,
        total_force: f64,
        metrics: &StabilityMetrics,
        pattern: MotionPattern,
        state: MovementState,
        target_area: TargetArea,
        is_side_view: bool,
    ) -> EnergyLeakResult {
        let total_force = if total_force.is_finite() {
            total_force.max(0.0)
        } else {
            0.0
        };

        let stability_penalty = stability_penalty(metrics);
        let pattern_penalty = self.pattern_penalty(pattern, state);
        let efficiency = (1.0 - stability_penalty - pattern_penalty).clamp(0.0, 1.0);

        let effective_force = total_force * efficiency;
        let leaked_energy = total_force * (1.0 - efficiency);

        let mut result = EnergyLeakResult {
            efficiency,
            stability_penalty,
            effective_force,
            leaked_energy,
            ..Default::default()
        };

        let weights = weights_for(pattern, target_area);
        let weight_sum: f64 = weights.iter().map(|(_, w)| w).sum();
        if weight_sum > 0.0 {
            for (muscle, weight) in weights {
                *result.effective_muscle_scores.entry(*muscle).or_insert(0.0) +=
                    effective_force * weight / weight_sum;
            }
        }

        if target_area.includes_upper() {
            Self::apply_upper_leaks(&mut result, total_force, metrics);
        }
        if target_area.includes_lower() {
            Self::apply_lower_leaks(&mut result, total_force, metrics, pattern, is_side_view);
        }

        for score in result
            .effective_muscle_scores
            .values_mut()
            .chain(result.compensation_muscle_scores.values_mut())
            .chain(result.joint_stress_scores.values_mut())
        {
            *score = score.max(0.0);
        }

        result
    }

    fn apply_upper_leaks(
        result: &mut EnergyLeakResult,
        total_force: f64,
        metrics: &StabilityMetrics,
    ) {
        // Independent pool: a shrug recruits the trapezius on top of the lift
        let trapezius_leak = total_force * metrics.elevation_factor * 1.5;
        if trapezius_leak > 0.0 {
            add(&mut result.compensation_muscle_scores, Trapezius, trapezius_leak);
        }

        if metrics.retraction_factor < 0.0 {
            let diverted = total_force * 0.4;
            add(&mut result.compensation_muscle_scores, Biceps, diverted * 0.3);
            add(&mut result.compensation_muscle_scores, Triceps, diverted * 0.2);

            for muscle in [Latissimus, Pectorals] {
                if let Some(score) = result.effective_muscle_scores.get_mut(&muscle) {
                    *score *= 0.6;
                }
            }
        }
    }

    fn apply_lower_leaks(
        result: &mut EnergyLeakResult,
        total_force: f64,
        metrics: &StabilityMetrics,
        pattern: MotionPattern,
        is_side_view: bool,
    ) {
        // Knee width is unmeasurable edge-on
        if !is_side_view && metrics.valgus_factor > 0.0 {
            let valgus_leak = total_force * metrics.valgus_factor * 2.0;
            add(&mut result.joint_stress_scores, JointId::LeftKnee, valgus_leak * 0.5);
            add(&mut result.joint_stress_scores, JointId::RightKnee, valgus_leak * 0.5);

            let glutes = subtract_floored(
                &mut result.effective_muscle_scores,
                Glutes,
                valgus_leak * 0.5,
            );
            let adductor_ratio = if glutes < 0.3 { 1.5 } else { 1.0 };
            add(&mut result.compensation_muscle_scores, Adductors, valgus_leak * adductor_ratio);
        }

        if pattern == MotionPattern::HipDominant {
            let diverted = result.leaked_energy * 0.3;
            add(&mut result.compensation_muscle_scores, Quadriceps, diverted);
            subtract_floored(&mut result.effective_muscle_scores, Glutes, diverted);
        }
    }
}

fn add<K: Ord>(scores: &mut BTreeMap<K, f64>, key: K, amount: f64) {
    *scores.entry(key).or_insert(0.0) += amount;
}

/// Subtract from an existing score, flooring at 0; returns the new score
fn subtract_floored(scores: &mut BTreeMap<Muscle, f64>, muscle: Muscle, amount: f64) -> f64 {
    match scores.get_mut(&muscle) {
        Some(score) => {
            *score = (*score - amount).max(0.0);
            *score
        }
        None => 0.0,
    }
}
