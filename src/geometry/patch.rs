//! Flat chunk patches and their projection onto the sphere.

use glam::{DQuat, DVec3};

use super::FaceDirection;

/// Placement of one chunk on the cube-sphere.
///
/// The patch is a `patch_size` square in the local XY plane, translated by the
/// chunk origin and rotated onto its face. A depth-0 patch spans a whole face.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChunkPatch {
    pub direction: FaceDirection,
    /// Chunk origin in the unrotated (+Z face) frame.
    pub origin: DVec3,
    pub subdivisions: u32,
    patch_size: f64,
    planet_radius: f64,
    rotation: DQuat,
}

impl ChunkPatch {
    /// `chunk_length` is the edge length of a depth-0 chunk, i.e. the cube's
    /// edge, so the base sphere radius is half of it.
    pub fn new(
        chunk_length: f64,
        depth: u32,
        subdivisions: u32,
        direction: FaceDirection,
        origin: DVec3,
    ) -> Self {
        Self {
            direction,
            origin,
            subdivisions,
            patch_size: chunk_length / 2f64.powi(depth as i32),
            planet_radius: chunk_length / 2.0,
            rotation: direction.rotation(),
        }
    }

    pub fn patch_size(&self) -> f64 {
        self.patch_size
    }

    pub fn planet_radius(&self) -> f64 {
        self.planet_radius
    }

    /// Grid points per side.
    pub fn vertices_per_side(&self) -> u32 {
        self.subdivisions + 1
    }

    /// Flat position of grid point `(x, y)`, centred on the chunk origin.
    pub fn local_point(&self, x: u32, y: u32) -> DVec3 {
        let subs = self.subdivisions as f64;
        let half = subs / 2.0;
        DVec3::new(
            (x as f64 - half) / subs * self.patch_size,
            (y as f64 - half) / subs * self.patch_size,
            0.0,
        )
    }

    /// Grid point `(x, y)` on the cube face, before projection.
    pub fn cube_point(&self, x: u32, y: u32) -> DVec3 {
        self.rotation * (self.local_point(x, y) + self.origin)
    }

    /// Grid point `(x, y)` projected onto the base sphere.
    ///
    /// Returns `None` when the cube point is the centre of the sphere, which
    /// only a malformed origin can produce.
    pub fn sphere_point(&self, x: u32, y: u32) -> Option<DVec3> {
        self.cube_point(x, y)
            .try_normalize()
            .map(|unit| unit * self.planet_radius)
    }
}
