//! Bowl-shaped craters carved into the unit sphere.

use glam::DVec3;
use serde::{Deserialize, Serialize};

use crate::error::{ensure_non_negative, ensure_positive, ConfigError};
use crate::gradient::Sample;

/// One crater as sent with a chunk request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Crater {
    /// Radius measured on the unit sphere (chord length).
    pub radius: f64,
    /// Centre direction; normalized before use.
    pub position: DVec3,
    pub max_depth: f64,
    /// Exponent of the bowl profile: higher values give flatter floors and
    /// steeper walls.
    pub steepness: f64,
}

/// Planet-wide multipliers applied to every crater.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CraterModifiers {
    pub radius_modifier: f64,
    pub steepness_modifier: f64,
    pub max_depth_modifier: f64,
    /// Converts crater depths into elevation units.
    pub scale_factor: f64,
}

impl Default for CraterModifiers {
    fn default() -> Self {
        Self {
            radius_modifier: 1.0,
            steepness_modifier: 1.0,
            max_depth_modifier: 1.0,
            scale_factor: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct ScaledCrater {
    center: DVec3,
    radius: f64,
    steepness: f64,
    depth: f64,
}

/// Craters with modifiers folded in, ready to evaluate.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CraterField {
    craters: Vec<ScaledCrater>,
}

impl CraterField {
    pub fn new(craters: &[Crater], modifiers: &CraterModifiers) -> Result<Self, ConfigError> {
        ensure_positive("radius modifier", modifiers.radius_modifier)?;
        ensure_positive("steepness modifier", modifiers.steepness_modifier)?;
        ensure_non_negative("max depth modifier", modifiers.max_depth_modifier)?;
        ensure_non_negative("crater scale factor", modifiers.scale_factor)?;

        let craters = craters
            .iter()
            .map(|crater| {
                ensure_positive("crater radius", crater.radius)?;
                ensure_positive("crater steepness", crater.steepness)?;
                ensure_non_negative("crater depth", crater.max_depth)?;
                let center = crater.position.try_normalize().ok_or(ConfigError::NonPositive {
                    name: "crater position length",
                    value: crater.position.length(),
                })?;
                Ok(ScaledCrater {
                    center,
                    radius: crater.radius * modifiers.radius_modifier,
                    steepness: crater.steepness * modifiers.steepness_modifier,
                    depth: crater.max_depth * modifiers.max_depth_modifier * modifiers.scale_factor,
                })
            })
            .collect::<Result<Vec<_>, ConfigError>>()?;
        Ok(Self { craters })
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.craters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.craters.is_empty()
    }

    /// Deepest possible combined depression (all craters overlapping).
    pub fn max_depth(&self) -> f64 {
        self.craters.iter().map(|c| c.depth).sum()
    }

    /// Summed crater elevation at `unit` (≤ 0), with its gradient.
    ///
    /// Inside radius `r` a crater contributes `depth * ((d / r)^steepness - 1)`
    /// where `d` is the distance to its centre.
    pub fn evaluate(&self, unit: DVec3) -> Sample {
        let mut total = Sample::ZERO;
        for crater in &self.craters {
            let offset = unit - crater.center;
            let distance = offset.length();
            if distance >= crater.radius {
                continue;
            }
            let t = distance / crater.radius;
            let profile = t.powf(crater.steepness);
            let gradient = if distance > 0.0 {
                let slope = crater.depth * crater.steepness * profile / distance;
                offset * (slope / distance)
            } else {
                DVec3::ZERO
            };
            total = total + Sample::new(crater.depth * (profile - 1.0), gradient);
        }
        total
    }
}
