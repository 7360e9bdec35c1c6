//! Per-joint physical stress model.
//!
//! Each evaluation sums three torques acting on the joint and squashes the
//! result into a stress score:
//!
//! ```text
//! τ_muscle   = F · r(θ)
//! τ_friction = -(μ_k + c·|ω|) · sign(ω)        (0 when |ω| < 1e-6)
//! τ_limit    = k · overshoot, toward the range  (0 inside [θ_min, θ_max])
//! τ_total    = clamp(τ_muscle + τ_friction + τ_limit, ±τ_max)
//! stress     = |τ_total| / (|τ_total| + 60)
//! ```
//!
//! The damping `c` stiffens when a proximal big-muscle group is heavily
//! loaded. Moment arm `r(θ)` comes from a measured table when one is
//! configured, otherwise from a `sin` curve peaking mid-range.

use motionlab_core::{Error, JointId, Result};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Torque mapped to a stress of 0.5; fixed for score compatibility
pub const REFERENCE_TORQUE: f64 = 60.0;

/// Substitute frame interval (30fps) for implausible `dt`
pub const FALLBACK_DT: f64 = 0.033;

/// Frame intervals above this are treated as dropped frames
pub const MAX_DT: f64 = 0.1;

const VELOCITY_EPSILON: f64 = 1e-6;

/// Sorted (angle, moment arm) samples with linear interpolation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<(f64, f64)>", into = "Vec<(f64, f64)>")]
pub struct MomentArmTable {
    points: Vec<(f64, f64)>,
}

impl MomentArmTable {
    /// Build from samples; angles must be finite and strictly ascending
    pub fn new(points: Vec<(f64, f64)>) -> Result<Self> {
        if points.is_empty() {
            return Err(Error::InvalidMomentArmTable(
                "must have at least one sample".to_string(),
            ));
        }
        if points.iter().any(|(a, v)| !a.is_finite() || !v.is_finite()) {
            return Err(Error::InvalidMomentArmTable(
                "samples must be finite".to_string(),
            ));
        }
        if points.windows(2).any(|w| w[1].0 <= w[0].0) {
            return Err(Error::InvalidMomentArmTable(
                "angles must be strictly ascending".to_string(),
            ));
        }
        Ok(Self { points })
    }

    pub fn points(&self) -> &[(f64, f64)] {
        &self.points
    }

    /// Moment arm at `angle`, clamped to the end samples outside the table
    pub fn interpolate(&self, angle: f64) -> f64 {
        let first = self.points[0];
        let last = self.points[self.points.len() - 1];

        if !angle.is_finite() || angle <= first.0 {
            return first.1;
        }
        if angle >= last.0 {
            return last.1;
        }

        // first.0 < angle < last.0, so 1 <= idx < len
        let idx = self.points.partition_point(|(a, _)| *a <= angle);
        let (a0, v0) = self.points[idx - 1];
        let (a1, v1) = self.points[idx];
        let t = (angle - a0) / (a1 - a0);
        v0 + t * (v1 - v0)
    }
}

impl TryFrom<Vec<(f64, f64)>> for MomentArmTable {
    type Error = Error;

    fn try_from(points: Vec<(f64, f64)>) -> Result<Self> {
        Self::new(points)
    }
}

impl From<MomentArmTable> for Vec<(f64, f64)> {
    fn from(table: MomentArmTable) -> Self {
        table.points
    }
}

/// Immutable physical parameters of one joint (angles in radians)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JointControllerConfig {
    pub angle_min: f64,
    pub angle_max: f64,
    /// Soft-limit spring constant (torque per radian of overshoot)
    pub stiffness: f64,
    /// Viscous damping coefficient
    pub damping_coefficient: f64,
    /// Breakaway friction; kinetic friction may not exceed it
    pub static_friction: f64,
    pub kinetic_friction: f64,
    #[serde(default)]
    pub moment_arm: Option<MomentArmTable>,
    /// Proximal force above which protective damping engages
    pub big_muscle_threshold: f64,
    /// Damping per unit of proximal overload
    pub safety_damping: f64,
    /// Hard ceiling on total torque magnitude
    pub max_torque_limit: f64,
}

impl JointControllerConfig {
    /// Anatomical defaults for a tracked joint (interior-angle convention)
    pub fn for_joint(joint: JointId) -> Self {
        match joint {
            JointId::LeftShoulder | JointId::RightShoulder => Self {
                angle_min: 0.0,
                angle_max: 3.05,
                stiffness: 60.0,
                damping_coefficient: 1.2,
                static_friction: 0.8,
                kinetic_friction: 0.5,
                moment_arm: None,
                big_muscle_threshold: 60.0,
                safety_damping: 3.0,
                max_torque_limit: 200.0,
            },
            JointId::LeftElbow | JointId::RightElbow => Self {
                angle_min: 0.52,
                angle_max: PI,
                stiffness: 40.0,
                damping_coefficient: 0.8,
                static_friction: 0.5,
                kinetic_friction: 0.3,
                moment_arm: None,
                big_muscle_threshold: 40.0,
                safety_damping: 2.5,
                max_torque_limit: 120.0,
            },
            JointId::LeftHip | JointId::RightHip => Self {
                angle_min: 0.87,
                angle_max: PI,
                stiffness: 120.0,
                damping_coefficient: 2.0,
                static_friction: 1.0,
                kinetic_friction: 0.8,
                moment_arm: None,
                big_muscle_threshold: 100.0,
                safety_damping: 4.0,
                max_torque_limit: 300.0,
            },
            JointId::LeftKnee | JointId::RightKnee => Self {
                angle_min: 0.52,
                angle_max: PI,
                stiffness: 100.0,
                damping_coefficient: 1.5,
                static_friction: 0.8,
                kinetic_friction: 0.6,
                moment_arm: Some(MomentArmTable {
                    points: vec![
                        (0.52, 0.60),
                        (1.05, 0.85),
                        (1.57, 1.00),
                        (2.36, 0.90),
                        (3.14, 0.70),
                    ],
                }),
                big_muscle_threshold: 80.0,
                safety_damping: 3.5,
                max_torque_limit: 250.0,
            },
        }
    }

    /// Reject physically meaningless parameters
    pub fn validate(&self, joint: &str) -> Result<()> {
        let scalars = [
            ("angle_min", self.angle_min),
            ("angle_max", self.angle_max),
            ("stiffness", self.stiffness),
            ("damping_coefficient", self.damping_coefficient),
            ("static_friction", self.static_friction),
            ("kinetic_friction", self.kinetic_friction),
            ("big_muscle_threshold", self.big_muscle_threshold),
            ("safety_damping", self.safety_damping),
            ("max_torque_limit", self.max_torque_limit),
        ];

        for (name, value) in scalars {
            if !value.is_finite() {
                return Err(Error::joint_config(joint, format!("{name} must be finite")));
            }
            if name != "angle_min" && name != "angle_max" && value < 0.0 {
                return Err(Error::joint_config(joint, format!("{name} must be non-negative")));
            }
        }

        if self.angle_min >= self.angle_max {
            return Err(Error::joint_config(
                joint,
                format!(
                    "angle_min ({}) must be below angle_max ({})",
                    self.angle_min, self.angle_max
                ),
            ));
        }
        if self.kinetic_friction > self.static_friction {
            return Err(Error::joint_config(
                joint,
                "kinetic_friction exceeds static_friction",
            ));
        }
        if self.big_muscle_threshold <= 0.0 {
            return Err(Error::joint_config(joint, "big_muscle_threshold must be positive"));
        }
        if self.max_torque_limit <= 0.0 {
            return Err(Error::joint_config(joint, "max_torque_limit must be positive"));
        }

        Ok(())
    }
}

/// Intermediate terms of one torque evaluation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TorqueBreakdown {
    pub effective_damping: f64,
    pub angular_velocity: f64,
    pub moment_arm: f64,
    pub muscle_torque: f64,
    pub friction_torque: f64,
    pub limit_torque: f64,
    /// After the safety clamp
    pub total_torque: f64,
    /// True when the safety ceiling engaged
    pub clamped: bool,
}

/// Stateless stress model for one joint
#[derive(Debug, Clone)]
pub struct JointController {
    joint: JointId,
    config: JointControllerConfig,
}

impl JointController {
    /// Validate `config` and build the controller
    pub fn new(joint: JointId, config: JointControllerConfig) -> Result<Self> {
        config.validate(joint.as_str())?;
        Ok(Self { joint, config })
    }

    pub fn joint(&self) -> JointId {
        self.joint
    }

    pub fn config(&self) -> &JointControllerConfig {
        &self.config
    }

    /// Moment arm at `angle`: table lookup or `sin(normalized · π)`
    pub fn moment_arm(&self, angle: f64) -> f64 {
        match &self.config.moment_arm {
            Some(table) => table.interpolate(angle),
            None => {
                let range = self.config.angle_max - self.config.angle_min;
                let normalized = ((angle - self.config.angle_min) / range).clamp(0.0, 1.0);
                (normalized * PI).sin()
            }
        }
    }

    /// Full torque evaluation between two consecutive angle samples
    pub fn compute_torque(
        &self,
        current_angle: f64,
        prev_angle: f64,
        dt: f64,
        muscle_force: f64,
        big_muscle_force: Option<f64>,
    ) -> TorqueBreakdown {
        let cfg = &self.config;

        let effective_damping = match big_muscle_force.map(f64::abs) {
            Some(big) if big > cfg.big_muscle_threshold && big.is_finite() => cfg
                .damping_coefficient
                .max(cfg.safety_damping * big / cfg.big_muscle_threshold),
            _ => cfg.damping_coefficient,
        };

        let safe_dt = if dt <= 0.0 || dt > MAX_DT || !dt.is_finite() {
            FALLBACK_DT
        } else {
            dt
        };

        let angular_velocity = finite_or_zero((current_angle - prev_angle) / safe_dt);
        let moment_arm = self.moment_arm(current_angle);
        let muscle_torque = finite_or_zero(muscle_force * moment_arm);

        let friction_torque = if angular_velocity.abs() < VELOCITY_EPSILON {
            0.0
        } else {
            -(cfg.kinetic_friction + effective_damping * angular_velocity.abs())
                * angular_velocity.signum()
        };

        let limit_torque = if current_angle < cfg.angle_min {
            cfg.stiffness * (cfg.angle_min - current_angle)
        } else if current_angle > cfg.angle_max {
            -cfg.stiffness * (current_angle - cfg.angle_max)
        } else {
            0.0
        };

        let raw = finite_or_zero(muscle_torque + friction_torque + limit_torque);
        let total_torque = raw.clamp(-cfg.max_torque_limit, cfg.max_torque_limit);
        let clamped = total_torque != raw;

        if clamped {
            tracing::warn!(
                joint = %self.joint,
                torque = raw,
                limit = cfg.max_torque_limit,
                "Joint torque exceeded safety limit, clamping"
            );
        }

        TorqueBreakdown {
            effective_damping,
            angular_velocity,
            moment_arm,
            muscle_torque,
            friction_torque,
            limit_torque,
            total_torque,
            clamped,
        }
    }

    /// Saturating stress score in [0, 1)
    pub fn calculate_joint_stress(
        &self,
        current_angle: f64,
        prev_angle: f64,
        dt: f64,
        muscle_force: f64,
        big_muscle_force: Option<f64>,
    ) -> f64 {
        let torque = self
            .compute_torque(current_angle, prev_angle, dt, muscle_force, big_muscle_force)
            .total_torque
            .abs();
        torque / (torque + REFERENCE_TORQUE)
    }
}

/// Collapse NaN to 0; infinities are left for the clamp
fn finite_or_zero(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value
    }
}
