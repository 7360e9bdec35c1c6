//! Session-level orchestration.
//!
//! [`BiomechEngine::analyze`] walks a session in temporal order, classifies
//! every frame, scores posture, credits each joint's range of motion, and
//! hands the aggregate to the energy-leak model and the joint controllers.

use motionlab_core::{
    normalize_landmarks, JointId, MotionPattern, MotionTypeHint, MovementState, Result, Session,
    StabilityMetrics, TargetArea,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};

use crate::config::EngineConfig;
use crate::energy::{EnergyLeakEngine, EnergyLeakResult};
use crate::joint::JointController;
use crate::motion::MotionAnalyzer;
use crate::rom::{angle_series, assess_rom, AngleSample, RomAssessment};
use crate::stability::{stability_penalty, StabilityCalculator};

const HIGH_INSTABILITY: f64 = 0.3;
const MODERATE_INSTABILITY: f64 = 0.1;

const ELEVATION_FAULT: f64 = 0.3;
const VALGUS_FAULT: f64 = 0.1;
const PELVIC_TILT_FAULT: f64 = 0.05;
const ROUNDED_SHOULDER_FAULT: f64 = -0.02;

const INSUFFICIENT_DATA: &str = "Insufficient pose data";

const MOVEMENT_STATES: [MovementState; 3] = [
    MovementState::Eccentric,
    MovementState::Concentric,
    MovementState::Isometric,
];

/// Final report handed to persistence and scoring
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionReport {
    /// Dominant motion pattern tag
    pub biomech_pattern: String,
    /// Muscle engagement, percent of the session total
    pub detailed_muscle_usage: BTreeMap<String, f64>,
    /// Credited range of motion per joint (degrees)
    pub rom_data: BTreeMap<String, f64>,
    pub stability_warning: String,
}

/// Report plus the intermediate results it was built from
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionAnalysis {
    pub report: SessionReport,
    pub energy: EnergyLeakResult,
    /// Peak controller stress per joint over the session
    pub joint_stress: BTreeMap<JointId, f64>,
    pub rom: BTreeMap<JointId, RomAssessment>,
    pub pattern: MotionPattern,
    pub movement_state: MovementState,
    /// Median-penalty frame's metrics
    pub stability: StabilityMetrics,
    pub is_side_view: bool,
    pub total_frames: usize,
    /// Frames with all four core landmarks visible
    pub valid_frames: usize,
    /// Frames that produced a classification
    pub classified_frames: usize,
}

/// Biomechanical analysis engine
///
/// Holds validated configuration and one [`JointController`] per tracked
/// joint. All per-session state lives inside [`BiomechEngine::analyze`], so a
/// single engine may serve any number of sessions, including concurrently.
#[derive(Debug, Clone)]
pub struct BiomechEngine {
    config: EngineConfig,
    controllers: BTreeMap<JointId, JointController>,
    energy: EnergyLeakEngine,
}

impl BiomechEngine {
    /// Validate `config` and build the joint controllers
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;

        let controllers = JointId::ALL
            .iter()
            .map(|&joint| Ok((joint, JointController::new(joint, config.joint(joint))?)))
            .collect::<Result<BTreeMap<_, _>>>()?;

        Ok(Self {
            config,
            controllers,
            energy: EnergyLeakEngine::new(),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn controller(&self, joint: JointId) -> Option<&JointController> {
        self.controllers.get(&joint)
    }

    /// Analyze one session
    pub fn analyze(
        &self,
        session: &Session,
        target_area: TargetArea,
        hint: MotionTypeHint,
    ) -> SessionAnalysis {
        let visibility = self.config.motion.visibility_threshold;
        info!(
            frames = session.len(),
            ?target_area,
            ?hint,
            "Starting session analysis"
        );

        let mut motion = MotionAnalyzer::new(self.config.motion.clone());
        let mut patterns = Vec::new();
        let mut states = Vec::new();
        let mut posture = Vec::new();

        for timed in session.frames() {
            let frame = normalize_landmarks(&timed.landmarks);

            if frame.has_core(visibility) {
                posture.push((
                    StabilityCalculator::calculate(&frame),
                    StabilityCalculator::is_side_view(&frame),
                ));
            }

            let classification = motion.analyze(frame);
            if !classification.is_stabilizing() {
                patterns.push(classification.pattern);
                states.push(classification.state);
            }
        }

        let pattern =
            dominant(&MotionPattern::ALL, &patterns).unwrap_or(MotionPattern::Stabilizing);
        let movement_state =
            dominant(&MOVEMENT_STATES, &states).unwrap_or(MovementState::Isometric);
        debug!(
            pattern = %pattern,
            state = %movement_state,
            classified = patterns.len(),
            "Dominant motion resolved"
        );

        if posture.is_empty() {
            info!(frames = session.len(), "No frame carried the core landmarks");
            return SessionAnalysis {
                report: SessionReport {
                    biomech_pattern: pattern.as_str().to_string(),
                    detailed_muscle_usage: BTreeMap::new(),
                    rom_data: BTreeMap::new(),
                    stability_warning: INSUFFICIENT_DATA.to_string(),
                },
                energy: EnergyLeakResult::default(),
                joint_stress: BTreeMap::new(),
                rom: BTreeMap::new(),
                pattern,
                movement_state,
                stability: StabilityMetrics::default(),
                is_side_view: false,
                total_frames: session.len(),
                valid_frames: 0,
                classified_frames: patterns.len(),
            };
        }

        let side_votes = posture.iter().filter(|(_, side)| *side).count();
        let is_side_view = side_votes * 2 > posture.len();
        let metrics: Vec<StabilityMetrics> = posture.iter().map(|(m, _)| *m).collect();
        let stability = representative_metrics(&metrics);

        // Angles are scale-invariant, so the raw frames serve directly
        let mut series: BTreeMap<JointId, Vec<AngleSample>> = BTreeMap::new();
        let mut rom = BTreeMap::new();
        for joint in JointId::ALL {
            if !target_area.includes(joint.region()) {
                continue;
            }
            let samples = angle_series(session.frames(), joint, visibility);
            if samples.is_empty() {
                continue;
            }
            let degrees: Vec<f64> = samples.iter().map(|s| s.angle.to_degrees()).collect();
            let assessment = assess_rom(&degrees, &self.config.rom, hint);
            debug!(
                joint = %joint,
                raw = assessment.raw_rom_deg,
                reversals = assessment.reversals,
                credited = assessment.credited_rom_deg,
                "Joint ROM credited"
            );
            rom.insert(joint, assessment);
            series.insert(joint, samples);
        }

        let total_force: f64 = rom.values().map(|r| r.credited_rom_deg).sum();
        let energy = self.energy.calculate(
            total_force,
            &stability,
            pattern,
            movement_state,
            target_area,
            is_side_view,
        );

        let joint_stress = self.joint_stress(&series, &rom, total_force, energy.effective_force);

        let report = SessionReport {
            biomech_pattern: pattern.as_str().to_string(),
            detailed_muscle_usage: muscle_usage(&energy),
            rom_data: rom
                .iter()
                .map(|(joint, r)| (joint.as_str().to_string(), r.credited_rom_deg))
                .collect(),
            stability_warning: stability_warning(&stability, is_side_view),
        };

        info!(
            frames = session.len(),
            valid = posture.len(),
            classified = patterns.len(),
            pattern = %pattern,
            efficiency = energy.efficiency,
            "Session analysis complete"
        );

        SessionAnalysis {
            report,
            energy,
            joint_stress,
            rom,
            pattern,
            movement_state,
            stability,
            is_side_view,
            total_frames: session.len(),
            valid_frames: posture.len(),
            classified_frames: patterns.len(),
        }
    }

    /// Peak controller stress per joint across consecutive angle samples
    fn joint_stress(
        &self,
        series: &BTreeMap<JointId, Vec<AngleSample>>,
        rom: &BTreeMap<JointId, RomAssessment>,
        total_force: f64,
        effective_force: f64,
    ) -> BTreeMap<JointId, f64> {
        let force_share = |joint: JointId| -> Option<f64> {
            let credited = rom.get(&joint)?.credited_rom_deg;
            Some(if total_force > 0.0 {
                effective_force * credited / total_force
            } else {
                0.0
            })
        };

        let mut stress = BTreeMap::new();
        for (&joint, samples) in series {
            let Some(controller) = self.controllers.get(&joint) else {
                continue;
            };
            let muscle_force = force_share(joint).unwrap_or(0.0);
            let big_muscle_force = joint.proximal().and_then(force_share);

            let peak = samples
                .windows(2)
                .map(|pair| {
                    let elapsed_ms = pair[1].timestamp_ms.saturating_sub(pair[0].timestamp_ms);
                    let dt = elapsed_ms as f64 / 1000.0;
                    controller.calculate_joint_stress(
                        pair[1].angle,
                        pair[0].angle,
                        dt,
                        muscle_force,
                        big_muscle_force,
                    )
                })
                .fold(0.0, f64::max);
            stress.insert(joint, peak);
        }
        stress
    }
}

/// Most frequent observation; ties go to the earlier candidate
fn dominant<T: Copy + PartialEq>(candidates: &[T], observed: &[T]) -> Option<T> {
    let mut best: Option<(T, usize)> = None;
    for &candidate in candidates {
        let count = observed.iter().filter(|&&o| o == candidate).count();
        if count > 0 && best.map_or(true, |(_, c)| count > c) {
            best = Some((candidate, count));
        }
    }
    best.map(|(candidate, _)| candidate)
}

/// Metrics of the frame with the median stability penalty
fn representative_metrics(metrics: &[StabilityMetrics]) -> StabilityMetrics {
    let mut ranked: Vec<(f64, StabilityMetrics)> =
        metrics.iter().map(|m| (stability_penalty(m), *m)).collect();
    ranked.sort_by(|a, b| a.0.total_cmp(&b.0));
    ranked
        .get(ranked.len() / 2)
        .map(|(_, m)| *m)
        .unwrap_or_default()
}

/// Effective plus compensation engagement, as percent of the total
fn muscle_usage(energy: &EnergyLeakResult) -> BTreeMap<String, f64> {
    let mut engagement = energy.effective_muscle_scores.clone();
    for (&muscle, &score) in &energy.compensation_muscle_scores {
        *engagement.entry(muscle).or_insert(0.0) += score;
    }

    let total: f64 = engagement.values().sum();
    if total <= 0.0 || !total.is_finite() {
        return BTreeMap::new();
    }

    engagement
        .into_iter()
        .map(|(muscle, score)| (muscle.as_str().to_string(), score / total * 100.0))
        .collect()
}

fn stability_warning(metrics: &StabilityMetrics, is_side_view: bool) -> String {
    let penalty = stability_penalty(metrics);
    let severity = if penalty >= HIGH_INSTABILITY {
        "High instability"
    } else if penalty >= MODERATE_INSTABILITY {
        "Moderate instability"
    } else {
        "Stable posture"
    };

    let mut faults = Vec::new();
    if metrics.elevation_factor > ELEVATION_FAULT {
        faults.push("shoulder elevation");
    }
    if !is_side_view && metrics.valgus_factor > VALGUS_FAULT {
        faults.push("knee valgus");
    }
    if metrics.pelvic_tilt_factor > PELVIC_TILT_FAULT {
        faults.push("pelvic tilt");
    }
    if metrics.retraction_factor < ROUNDED_SHOULDER_FAULT {
        faults.push("rounded shoulders");
    }

    if faults.is_empty() {
        severity.to_string()
    } else {
        format!("{severity}: {}", faults.join(", "))
    }
}
