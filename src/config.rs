//! Conversion settings.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ConvertError, Result};
use crate::phase::DEFAULT_RADIAN_TOLERANCE;

/// Proton gyromagnetic ratio in Hz/T
pub const GYROMAGNETIC_RATIO_HZ_PER_T: f64 = 42.58e6;

/// Settings for one conversion; every field has a default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConvertConfig {
    /// How close the phase range must be to `[-π, π]` to skip conversion
    #[serde(default = "default_phase_tolerance")]
    pub phase_tolerance: f64,

    /// Used to derive field strength or centre frequency when one is missing
    #[serde(default = "default_gyromagnetic_ratio")]
    pub gyromagnetic_ratio: f64,

    /// Replaces the B0 direction computed from the magnitude affine
    #[serde(default)]
    pub b0_direction: Option<[f64; 3]>,
}

fn default_phase_tolerance() -> f64 {
    DEFAULT_RADIAN_TOLERANCE
}

fn default_gyromagnetic_ratio() -> f64 {
    GYROMAGNETIC_RATIO_HZ_PER_T
}

impl Default for ConvertConfig {
    fn default() -> Self {
        Self {
            phase_tolerance: default_phase_tolerance(),
            gyromagnetic_ratio: default_gyromagnetic_ratio(),
            b0_direction: None,
        }
    }
}

impl ConvertConfig {
    /// Load configuration from a YAML file.
    pub fn from_yaml<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        serde_yaml::from_str(&content).map_err(|source| ConvertError::Config {
            path: path.to_path_buf(),
            source,
        })
    }
}
