//! Plain fractal (fBm) layer over [`simplex01`].

use glam::DVec3;

use super::{Layer, LayerConfig};
use crate::error::{ensure_positive, ConfigError};
use crate::gradient::Sample;
use crate::noise::simplex01;

/// Sum of `[0, 1]` simplex octaves, normalized back into `[0, 1]`.
#[derive(Debug, Clone)]
pub struct FractalLayer {
    config: LayerConfig,
    floor_sharpness: f64,
    budget: f64,
}

impl FractalLayer {
    /// Builds the layer, failing on parameters that leave it undefined.
    pub fn new(config: LayerConfig, floor_sharpness: f64) -> Result<Self, ConfigError> {
        config.validate()?;
        ensure_positive("floor sharpness", floor_sharpness)?;
        Ok(Self {
            budget: config.amplitude_budget(),
            config,
            floor_sharpness,
        })
    }

    pub fn config(&self) -> &LayerConfig {
        &self.config
    }
}

impl Layer for FractalLayer {
    fn evaluate(&self, point: DVec3, seed: f64) -> Sample {
        let sum = self
            .config
            .octave_iter()
            .fold(Sample::ZERO, |sum, (frequency, amplitude)| {
                let (value, gradient) = simplex01(point * frequency, seed);
                sum + Sample::new(value, gradient * frequency) * amplitude
            });
        self.config.shape(sum, self.budget, self.floor_sharpness)
    }
}
