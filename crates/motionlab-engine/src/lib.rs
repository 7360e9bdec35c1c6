//! # MotionLab-Engine
//!
//! Biomechanical analysis over sessions of pose-estimation landmarks.
//!
//! ## Pipeline
//!
//! 1. **Stability**: per-frame posture faults (shoulder shrug, knee valgus,
//!    pelvic tilt, rounded shoulders)
//! 2. **Motion**: per-frame movement pattern and contraction phase, after a
//!    short warm-up
//! 3. **ROM**: per-joint angle series, noise floor and repetition crediting
//! 4. **Energy leak**: credited motion split into prime-mover work and
//!    compensation
//! 5. **Joint stress**: torque-based stress per joint from a spring/friction
//!    joint model
//!
//! [`BiomechEngine`] runs all five over a [`motionlab_core::Session`] and
//! assembles a [`SessionReport`].

pub mod analyzer;
pub mod config;
pub mod energy;
pub mod joint;
pub mod motion;
pub mod rom;
pub mod stability;

pub use analyzer::*;
pub use config::*;
pub use energy::*;
pub use joint::*;
pub use motion::*;
pub use rom::*;
pub use stability::*;
