//! The terrain function: continents, mountains, bumps and craters merged into
//! one radial displacement.

use glam::DVec3;
use tracing::debug;

use super::crater::CraterField;
use super::settings::{Seed, TerrainSettings};
use crate::error::ConfigError;
use crate::gradient::Sample;
use crate::layers::{FractalLayer, Layer, LayerConfig, MountainLayer, Warped};

/// A sample point pushed out along its radial direction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Displacement {
    /// Displaced position.
    pub position: DVec3,
    /// Distance moved along the radial direction.
    pub elevation: f64,
    /// Elevation gradient on the unit sphere, per unit of total relief.
    pub gradient: DVec3,
}

/// Immutable, thread-safe elevation field for one planet.
#[derive(Debug, Clone)]
pub struct TerrainFunction {
    settings: TerrainSettings,
    seed: Seed,
    continents: Warped<FractalLayer>,
    mountains: MountainLayer,
    bumps: FractalLayer,
}

impl TerrainFunction {
    pub fn new(settings: TerrainSettings, seed: Seed) -> Result<Self, ConfigError> {
        settings.validate()?;
        let tuning = settings.tuning;

        let continents = Warped::new(
            FractalLayer::new(
                LayerConfig::new(
                    settings.continents_frequency,
                    6,
                    1.8,
                    2.1,
                    0.5,
                    1.0 - settings.continents_fragmentation,
                ),
                tuning.continent_floor_sharpness,
            )?,
            tuning.warp_frequency,
            tuning.warp_strength,
        )?;
        let mountains = MountainLayer::new(
            LayerConfig::new(
                settings.mountains_frequency,
                6,
                1.9,
                2.0,
                2.5,
                settings.mountains_min_value,
            ),
            tuning.ridge_sharpness,
            tuning.floor_sharpness,
            tuning.mountain_erosion,
        )?;
        let bumps = FractalLayer::new(
            LayerConfig::new(settings.bumps_frequency, 3, 2.0, 2.0, 1.0, 0.2),
            tuning.floor_sharpness,
        )?;

        debug!(
            seed = seed.value(),
            relief = settings.total_relief(),
            "terrain function ready"
        );
        Ok(Self {
            settings,
            seed,
            continents,
            mountains,
            bumps,
        })
    }

    pub fn settings(&self) -> &TerrainSettings {
        &self.settings
    }

    pub fn seed(&self) -> Seed {
        self.seed
    }

    /// Upper bound of the elevation above the base sphere, craters excluded.
    pub fn max_relief(&self) -> f64 {
        self.settings.total_relief()
    }

    /// Elevation at a unit direction, in height units, with its gradient on
    /// the unit sphere.
    pub fn elevation(&self, unit: DVec3, craters: &CraterField) -> Sample {
        let settings = &self.settings;
        let w = self.seed.value();

        let continent_mask = self.continents.evaluate(unit, w);
        let mountain_gate = continent_mask.tanh_sharpen(settings.tuning.continent_sharpness);
        let mountains = self.mountains.evaluate(unit, w) * mountain_gate;
        let bumps = self.bumps.evaluate(unit, w);

        let mut elevation = continent_mask * settings.continent_base_height
            + mountains * settings.max_mountain_height
            + bumps * settings.max_bump_height;
        if !craters.is_empty() {
            elevation = elevation + craters.evaluate(unit);
        }
        elevation
    }

    /// Displaces `point` radially by the elevation at its direction.
    ///
    /// The origin has no direction and is returned unmoved with zero elevation.
    pub fn displace(&self, point: DVec3, craters: &CraterField) -> Displacement {
        let Some(unit) = point.try_normalize() else {
            return Displacement {
                position: point,
                elevation: 0.0,
                gradient: DVec3::ZERO,
            };
        };
        let elevation = self.elevation(unit, craters);
        let relief = self.max_relief();
        let gradient = if relief > 0.0 {
            elevation.gradient / relief
        } else {
            DVec3::ZERO
        };
        Displacement {
            position: point + unit * elevation.value,
            elevation: elevation.value,
            gradient,
        }
    }

    /// Distance from the planet centre to the surface along `direction`, for
    /// a base sphere of `radius`. `None` for a zero direction.
    pub fn sample_height(&self, direction: DVec3, radius: f64, craters: &CraterField) -> Option<f64> {
        let unit = direction.try_normalize()?;
        Some(radius + self.elevation(unit, craters).value)
    }
}
