//! # MotionLab-Core
//!
//! Core types and geometry for the MotionLab biomechanical analysis system.
//!
//! A session is an ordered list of landmark frames produced by an external
//! pose estimator. This crate defines that data model, the landmark point and
//! its vector operations, scale normalization, and the error taxonomy shared
//! by the analysis engine.

pub mod error;
pub mod geometry;
pub mod types;

pub use error::{Error, Result};
pub use geometry::*;
pub use types::*;
