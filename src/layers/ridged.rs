//! Ridged multi-octave layer: each signed octave is folded into a crest.

use glam::DVec3;

use super::{ridge, Layer, LayerConfig};
use crate::error::{ensure_positive, ConfigError};
use crate::gradient::Sample;
use crate::noise::simplex11;

/// Octaves of `1 - |simplex11|`, normalized and floor-rescaled.
#[derive(Debug, Clone)]
pub struct RidgedLayer {
    config: LayerConfig,
    ridge_sharpness: f64,
    floor_sharpness: f64,
    budget: f64,
}

impl RidgedLayer {
    pub fn new(
        config: LayerConfig,
        ridge_sharpness: f64,
        floor_sharpness: f64,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        ensure_positive("ridge sharpness", ridge_sharpness)?;
        ensure_positive("floor sharpness", floor_sharpness)?;
        Ok(Self {
            budget: config.amplitude_budget(),
            config,
            ridge_sharpness,
            floor_sharpness,
        })
    }

    pub fn config(&self) -> &LayerConfig {
        &self.config
    }
}

impl Layer for RidgedLayer {
    fn evaluate(&self, point: DVec3, seed: f64) -> Sample {
        let sum = self
            .config
            .octave_iter()
            .fold(Sample::ZERO, |sum, (frequency, amplitude)| {
                let (value, gradient) = simplex11(point * frequency, seed);
                sum + ridge(Sample::new(value, gradient * frequency), self.ridge_sharpness) * amplitude
            });
        self.config.shape(sum, self.budget, self.floor_sharpness)
    }
}
