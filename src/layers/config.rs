//! Shared octave parameters for the fractal-style layers.

use serde::{Deserialize, Serialize};

use crate::error::{ensure_finite, ensure_positive, ConfigError};
use crate::gradient::Sample;

/// Octave parameters common to every layer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerConfig {
    /// Frequency of the first octave, in cycles per unit of sample space.
    pub frequency: f64,
    /// Number of octaves summed.
    pub octaves: u32,
    /// Amplitude divisor between successive octaves (octave `i` weighs `decay^-i`).
    pub decay: f64,
    /// Frequency multiplier between successive octaves.
    pub lacunarity: f64,
    /// Normalized values below this fold smoothly to zero.
    pub min_value: f64,
    /// Exponent applied to the floor-rescaled result.
    pub power: f64,
}

impl Default for LayerConfig {
    fn default() -> Self {
        Self {
            frequency: 1.0,
            octaves: 6,
            decay: 2.0,
            lacunarity: 2.0,
            min_value: 0.0,
            power: 1.0,
        }
    }
}

impl LayerConfig {
    pub fn new(frequency: f64, octaves: u32, decay: f64, lacunarity: f64, power: f64, min_value: f64) -> Self {
        Self {
            frequency,
            octaves,
            decay,
            lacunarity,
            min_value,
            power,
        }
    }

    /// Rejects parameters for which the layer is undefined.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.octaves == 0 {
            return Err(ConfigError::NoOctaves);
        }
        ensure_positive("frequency", self.frequency)?;
        ensure_positive("decay", self.decay)?;
        ensure_positive("lacunarity", self.lacunarity)?;
        ensure_positive("power", self.power)?;
        ensure_finite("min value", self.min_value)?;
        if self.decay == 1.0 {
            return Err(ConfigError::UnitDecay(self.decay));
        }
        if self.min_value == 1.0 {
            return Err(ConfigError::UnitMinValue(self.min_value));
        }
        Ok(())
    }

    /// Total amplitude `Σ decay^-i` over all octaves, in closed form.
    ///
    /// The geometric series closes as `(1 - r^n) / (1 - r)` with `r = 1/decay`,
    /// which is why `decay == 1` is rejected.
    pub fn amplitude_budget(&self) -> f64 {
        let ratio = self.decay.recip();
        (1.0 - ratio.powi(self.octaves as i32)) / (1.0 - ratio)
    }

    /// `(frequency, amplitude)` for each octave, lowest frequency first.
    pub fn octave_iter(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        (0..self.octaves as i32).map(move |i| {
            (
                self.frequency * self.lacunarity.powi(i),
                self.decay.powi(-i),
            )
        })
    }

    /// Normalizes an accumulated sum, floor-rescales it and applies `power`.
    pub(crate) fn shape(&self, sum: Sample, budget: f64, floor_sharpness: f64) -> Sample {
        sum.scale(budget.recip())
            .floor_rescale(self.min_value, floor_sharpness)
            .powf(self.power)
    }
}
