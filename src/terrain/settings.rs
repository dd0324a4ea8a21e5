//! Planet-wide terrain parameters.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::{ensure_finite, ensure_non_negative, ensure_positive, ConfigError};

/// Errors raised while loading terrain settings from disk.
#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid settings JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid settings: {0}")]
    Invalid(#[from] ConfigError),
}

/// Noise seed, fed to the kernel's fourth (w) coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Seed(pub f64);

impl Seed {
    pub fn value(self) -> f64 {
        self.0
    }
}

impl From<u64> for Seed {
    /// Hashes the integer and keeps 20 bits in 1/16 steps, so every integer
    /// seed lands on a moderate w offset in `[0, 65536)`.
    fn from(seed: u64) -> Self {
        let mixed = (seed ^ (seed >> 29)).wrapping_mul(0x9E37_79B9_7F4A_7C15);
        Seed((mixed >> 44) as f64 / 16.0)
    }
}

/// Sharpness and shaping constants behind the layers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TerrainTuning {
    /// Sharpness of the continent floor-rescale (soft coastlines).
    pub continent_floor_sharpness: f64,
    /// Sharpness of the mountain and bump floor-rescale.
    pub floor_sharpness: f64,
    /// Sharpness of the smooth absolute value that folds ridges.
    pub ridge_sharpness: f64,
    /// Strength of the mountain slope damping (0 disables it).
    pub mountain_erosion: f64,
    /// tanh sharpness of the continent mask that gates mountains.
    pub continent_sharpness: f64,
    /// Frequency of the continent domain warp on the unit sphere.
    pub warp_frequency: f64,
    /// Displacement of the continent domain warp on the unit sphere.
    pub warp_strength: f64,
}

impl Default for TerrainTuning {
    fn default() -> Self {
        Self {
            continent_floor_sharpness: 15.0,
            floor_sharpness: 100.0,
            ridge_sharpness: 8.0,
            mountain_erosion: 1.0,
            continent_sharpness: 32.0,
            warp_frequency: 2.0,
            warp_strength: 0.2,
        }
    }
}

impl TerrainTuning {
    pub fn validate(&self) -> Result<(), ConfigError> {
        ensure_positive("continent floor sharpness", self.continent_floor_sharpness)?;
        ensure_positive("floor sharpness", self.floor_sharpness)?;
        ensure_positive("ridge sharpness", self.ridge_sharpness)?;
        ensure_non_negative("mountain erosion", self.mountain_erosion)?;
        ensure_positive("continent sharpness", self.continent_sharpness)?;
        ensure_positive("warp frequency", self.warp_frequency)?;
        ensure_finite("warp strength", self.warp_strength)
    }
}

/// Terrain parameters for one planet.
///
/// Frequencies are in cycles per unit of the unit sphere; heights are in the
/// same length unit as the chunk requests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TerrainSettings {
    pub continents_frequency: f64,
    /// In (0, 1]: higher values break land into more, smaller pieces.
    pub continents_fragmentation: f64,
    pub bumps_frequency: f64,
    pub mountains_frequency: f64,
    /// Ridge values below this are flattened away.
    pub mountains_min_value: f64,
    pub continent_base_height: f64,
    pub max_mountain_height: f64,
    pub max_bump_height: f64,
    pub tuning: TerrainTuning,
}

impl Default for TerrainSettings {
    fn default() -> Self {
        Self::earth_like()
    }
}

impl TerrainSettings {
    /// Broad continents, tall ranges and fine bumps.
    pub fn earth_like() -> Self {
        Self {
            continents_frequency: 1.0,
            continents_fragmentation: 0.47,
            bumps_frequency: 180.0,
            mountains_frequency: 60.0,
            mountains_min_value: 0.5,
            continent_base_height: 5e3,
            max_mountain_height: 20e3,
            max_bump_height: 1.5e3,
            tuning: TerrainTuning::default(),
        }
    }

    /// Low, heavily fragmented relief suited to airless bodies with craters.
    pub fn moon_like() -> Self {
        Self {
            continents_frequency: 2.0,
            continents_fragmentation: 0.8,
            bumps_frequency: 120.0,
            mountains_frequency: 30.0,
            mountains_min_value: 0.7,
            continent_base_height: 1e3,
            max_mountain_height: 4e3,
            max_bump_height: 800.0,
            tuning: TerrainTuning {
                mountain_erosion: 0.5,
                warp_strength: 0.1,
                ..TerrainTuning::default()
            },
        }
    }

    /// Sum of the three height scales.
    pub fn total_relief(&self) -> f64 {
        self.continent_base_height + self.max_mountain_height + self.max_bump_height
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        ensure_positive("continents frequency", self.continents_frequency)?;
        ensure_positive("bumps frequency", self.bumps_frequency)?;
        ensure_positive("mountains frequency", self.mountains_frequency)?;
        let fragmentation = self.continents_fragmentation;
        if !(fragmentation > 0.0 && fragmentation <= 1.0) {
            return Err(ConfigError::Fragmentation(fragmentation));
        }
        ensure_finite("mountains min value", self.mountains_min_value)?;
        if self.mountains_min_value == 1.0 {
            return Err(ConfigError::UnitMinValue(self.mountains_min_value));
        }
        ensure_non_negative("continent base height", self.continent_base_height)?;
        ensure_non_negative("max mountain height", self.max_mountain_height)?;
        ensure_non_negative("max bump height", self.max_bump_height)?;
        self.tuning.validate()
    }

    /// Parses and validates settings; missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, SettingsError> {
        let settings: TerrainSettings = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let json = fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }
}
