//! Engine configuration.
//!
//! Every field has a default, so a file or the environment only needs to name
//! what it overrides. Environment variables use the `MOTIONLAB` prefix with
//! `__` separating nested keys, e.g. `MOTIONLAB_ROM__NOISE_FLOOR_DEG=10`.

use motionlab_core::{Error, JointId, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::joint::JointControllerConfig;
use crate::motion::MotionAnalyzerConfig;
use crate::rom::RomConfig;

const ENV_PREFIX: &str = "MOTIONLAB";

/// Complete engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Per-frame motion classification
    pub motion: MotionAnalyzerConfig,

    /// ROM noise floor and crediting
    pub rom: RomConfig,

    /// Joint controller overrides; joints not listed use their defaults
    pub joints: BTreeMap<JointId, JointControllerConfig>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            motion: MotionAnalyzerConfig::default(),
            rom: RomConfig::default(),
            joints: JointId::ALL
                .iter()
                .map(|&joint| (joint, JointControllerConfig::for_joint(joint)))
                .collect(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from file, with environment overrides on top
    pub fn from_file(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(Self::environment())
            .build()?;

        let config: Self = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Load from environment variables
    pub fn from_env() -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(Self::environment())
            .build()?;

        let config: Self = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    fn environment() -> config::Environment {
        config::Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true)
    }

    /// Controller parameters for `joint`, falling back to its defaults
    pub fn joint(&self, joint: JointId) -> JointControllerConfig {
        self.joints
            .get(&joint)
            .cloned()
            .unwrap_or_else(|| JointControllerConfig::for_joint(joint))
    }

    pub fn validate(&self) -> Result<()> {
        let motion = &self.motion;
        if !(0.0..=1.0).contains(&motion.visibility_threshold) {
            return Err(Error::Config(format!(
                "motion.visibility_threshold must be within [0, 1], got {}",
                motion.visibility_threshold
            )));
        }
        for (name, value) in [
            ("motion.isometric_threshold", motion.isometric_threshold),
            ("motion.hip_displacement_threshold", motion.hip_displacement_threshold),
            ("rom.noise_floor_deg", self.rom.noise_floor_deg),
            ("rom.reversal_hysteresis_deg", self.rom.reversal_hysteresis_deg),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(Error::Config(format!(
                    "{name} must be finite and non-negative, got {value}"
                )));
            }
        }
        if !(0.0..=1.0).contains(&self.rom.single_excursion_credit) {
            return Err(Error::Config(format!(
                "rom.single_excursion_credit must be within [0, 1], got {}",
                self.rom.single_excursion_credit
            )));
        }

        for (joint, config) in &self.joints {
            config.validate(joint.as_str())?;
        }

        Ok(())
    }
}
