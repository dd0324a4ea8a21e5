//! Ridged layer with a slope-damping erosion heuristic.

use glam::DVec3;

use super::{ridge, Layer, LayerConfig};
use crate::error::{ensure_non_negative, ensure_positive, ConfigError};
use crate::gradient::Sample;
use crate::noise::simplex11;

/// Ridged octaves where each contribution is divided by
/// `1 + erosion * |G|^2`, `G` being the slope accumulated so far.
///
/// `G` is measured in lattice units of the first octave so the damping does
/// not depend on the base frequency. The divisor is treated as a constant when
/// differentiating, so the returned gradient is approximate.
#[derive(Debug, Clone)]
pub struct MountainLayer {
    config: LayerConfig,
    ridge_sharpness: f64,
    floor_sharpness: f64,
    erosion: f64,
    budget: f64,
}

impl MountainLayer {
    pub fn new(
        config: LayerConfig,
        ridge_sharpness: f64,
        floor_sharpness: f64,
        erosion: f64,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        ensure_positive("ridge sharpness", ridge_sharpness)?;
        ensure_positive("floor sharpness", floor_sharpness)?;
        ensure_non_negative("erosion", erosion)?;
        Ok(Self {
            budget: config.amplitude_budget(),
            config,
            ridge_sharpness,
            floor_sharpness,
            erosion,
        })
    }

    pub fn config(&self) -> &LayerConfig {
        &self.config
    }
}

impl Layer for MountainLayer {
    fn evaluate(&self, point: DVec3, seed: f64) -> Sample {
        let slope_unit = self.config.frequency.recip();
        let mut sum = Sample::ZERO;
        for (frequency, amplitude) in self.config.octave_iter() {
            let (value, gradient) = simplex11(point * frequency, seed);
            let crest = ridge(Sample::new(value, gradient * frequency), self.ridge_sharpness) * amplitude;
            let slope = sum.gradient * slope_unit;
            let damping = 1.0 + self.erosion * slope.length_squared();
            sum = sum + crest * damping.recip();
        }
        self.config.shape(sum, self.budget, self.floor_sharpness)
    }
}
