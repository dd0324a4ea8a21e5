//! Per-face elevation grids for previews and image export.

use glam::DVec3;
use rayon::prelude::*;

use super::{CraterField, TerrainFunction};
use crate::geometry::FaceDirection;

/// Elevations sampled over one whole cube face.
#[derive(Debug, Clone, PartialEq)]
pub struct FaceHeightmap {
    pub direction: FaceDirection,
    /// Width and height in pixels.
    pub resolution: u32,
    /// Elevations above the base sphere, row-major.
    pub heights: Vec<f32>,
}

impl FaceHeightmap {
    pub fn get(&self, x: u32, y: u32) -> f32 {
        self.heights[(y * self.resolution + x) as usize]
    }

    /// Minimum and maximum height, or `None` for an empty map.
    pub fn height_range(&self) -> Option<(f32, f32)> {
        self.heights.iter().fold(None, |range, &h| match range {
            None => Some((h, h)),
            Some((min, max)) => Some((min.min(h), max.max(h))),
        })
    }
}

/// Unit direction through the centre of pixel `(x, y)` of `direction`'s face.
fn pixel_direction(direction: FaceDirection, resolution: u32, x: u32, y: u32) -> DVec3 {
    let u = (x as f64 + 0.5) / resolution as f64 * 2.0 - 1.0;
    let v = (y as f64 + 0.5) / resolution as f64 * 2.0 - 1.0;
    (direction.rotation() * DVec3::new(u, v, 1.0)).normalize()
}

/// Samples one face at `resolution`², pixels in parallel.
///
/// # Arguments
/// * `terrain` - Elevation field to sample
/// * `craters` - Craters added on top of the terrain
/// * `direction` - Cube face to cover
/// * `resolution` - Pixels per side
///
/// # Returns
/// Row-major elevations above the base sphere, one per pixel centre
pub fn generate_face_heightmap(
    terrain: &TerrainFunction,
    craters: &CraterField,
    direction: FaceDirection,
    resolution: u32,
) -> FaceHeightmap {
    let mut heights = vec![0.0f32; (resolution as usize) * (resolution as usize)];
    heights.par_iter_mut().enumerate().for_each(|(i, height)| {
        let x = (i as u32) % resolution;
        let y = (i as u32) / resolution;
        let unit = pixel_direction(direction, resolution, x, y);
        *height = terrain.elevation(unit, craters).value as f32;
    });
    FaceHeightmap {
        direction,
        resolution,
        heights,
    }
}

/// Samples all six faces in parallel, in [`FaceDirection::all`] order.
///
/// # Arguments
/// * `terrain` - Elevation field to sample
/// * `craters` - Craters added on top of the terrain
/// * `resolution` - Pixels per side of each face
pub fn generate_planet_heightmaps(
    terrain: &TerrainFunction,
    craters: &CraterField,
    resolution: u32,
) -> Vec<FaceHeightmap> {
    FaceDirection::all()
        .par_iter()
        .map(|&direction| generate_face_heightmap(terrain, craters, direction, resolution))
        .collect()
}
