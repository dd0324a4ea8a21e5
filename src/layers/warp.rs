//! Domain warping for any [`Layer`].

use glam::DVec3;

use super::Layer;
use crate::error::{ensure_finite, ensure_positive, ConfigError};
use crate::gradient::Sample;
use crate::noise::simplex11;

/// Seed channel offsets for the two warp evaluations.
const WARP_CHANNELS: [f64; 2] = [17.0, 43.0];

/// Evaluates the inner layer at `p + strength * (a, b, (a + b) / 2)`, where `a`
/// and `b` are two independent simplex fields sampled at `p * frequency`.
///
/// The returned gradient goes through the warp Jacobian:
/// `∇f(p) = g + strength * (g.x ∇a + g.y ∇b + g.z (∇a + ∇b) / 2)`.
#[derive(Debug, Clone)]
pub struct Warped<L> {
    inner: L,
    frequency: f64,
    strength: f64,
}

impl<L: Layer> Warped<L> {
    pub fn new(inner: L, frequency: f64, strength: f64) -> Result<Self, ConfigError> {
        ensure_positive("warp frequency", frequency)?;
        ensure_finite("warp strength", strength)?;
        Ok(Self {
            inner,
            frequency,
            strength,
        })
    }

    pub fn inner(&self) -> &L {
        &self.inner
    }
}

impl<L: Layer> Layer for Warped<L> {
    fn evaluate(&self, point: DVec3, seed: f64) -> Sample {
        let q = point * self.frequency;
        let (a, grad_a) = simplex11(q, seed + WARP_CHANNELS[0]);
        let (b, grad_b) = simplex11(q, seed + WARP_CHANNELS[1]);
        let (grad_a, grad_b) = (grad_a * self.frequency, grad_b * self.frequency);

        let offset = DVec3::new(a, b, 0.5 * (a + b)) * self.strength;
        let inner = self.inner.evaluate(point + offset, seed);
        let g = inner.gradient;
        let through_warp = grad_a * g.x + grad_b * g.y + (grad_a + grad_b) * (0.5 * g.z);
        Sample::new(inner.value, g + through_warp * self.strength)
    }
}
