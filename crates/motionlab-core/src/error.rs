//! Error types for the MotionLab analysis core.
//!
//! Only construction-time operations (configuration loading, joint controller
//! setup, session parsing) are fallible. Per-frame analysis degrades to
//! zero/default values instead of returning errors.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid joint configuration for {joint}: {reason}")]
    InvalidJointConfig { joint: String, reason: String },

    #[error("Invalid moment-arm table: {0}")]
    InvalidMomentArmTable(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<config::ConfigError> for Error {
    fn from(e: config::ConfigError) -> Self {
        Error::Config(e.to_string())
    }
}

impl Error {
    pub fn joint_config(joint: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::InvalidJointConfig {
            joint: joint.into(),
            reason: reason.into(),
        }
    }
}
