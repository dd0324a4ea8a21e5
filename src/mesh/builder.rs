//! Chunk mesh construction.

use std::time::Instant;

use glam::DVec3;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, trace};

use super::buffers::{ChunkResult, IndexBuffer};
use super::normals::{accumulate_face_normals, analytic_normal};
use crate::error::ConfigError;
use crate::geometry::ChunkPatch;
use crate::terrain::{CraterField, TerrainFunction};

/// Largest subdivision count a single chunk accepts.
pub const MAX_SUBDIVISIONS: u32 = 4096;

/// Errors that stop a chunk build before any buffer is produced.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MeshError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("grid point ({x}, {y}) projects through the planet centre")]
    CentreProjection { x: u32, y: u32 },
}

/// Steps of a chunk build, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildStage {
    Configure,
    GenerateVertices,
    Triangulate,
    ComputeNormals,
    Emit,
}

/// How vertex normals are derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum NormalMode {
    /// Average of the adjacent face normals.
    #[default]
    FaceAccumulation,
    /// Tilt of the radial direction by the terrain gradient.
    Analytic,
}

/// Rejects subdivision counts no chunk can be built with.
pub fn validate_subdivisions(subdivisions: u32) -> Result<(), ConfigError> {
    if subdivisions == 0 {
        return Err(ConfigError::ZeroSubdivisions);
    }
    if subdivisions > MAX_SUBDIVISIONS {
        return Err(ConfigError::TooManySubdivisions {
            subdivisions,
            max: MAX_SUBDIVISIONS,
        });
    }
    Ok(())
}

struct Vertices {
    positions: Vec<DVec3>,
    radial: Vec<DVec3>,
    slopes: Vec<DVec3>,
    elevation_sum: f64,
}

/// Builds the displaced, triangulated mesh of one chunk.
///
/// Vertex `(x, y)` of the `(subdivisions + 1)²` grid is stored at index
/// `x * (subdivisions + 1) + y`. Triangles wind counter-clockwise seen from
/// outside the planet.
///
/// # Arguments
/// * `terrain` - Elevation field used to displace each vertex
/// * `patch` - Face, origin, depth and grid size of the chunk
/// * `craters` - Craters added on top of the terrain
/// * `normal_mode` - How per-vertex normals are derived
///
/// # Returns
/// The packed vertex, index and normal buffers, or an error if the patch has
/// no subdivisions, too many, or a grid point projects through the centre
pub fn build_chunk(
    terrain: &TerrainFunction,
    patch: &ChunkPatch,
    craters: &CraterField,
    normal_mode: NormalMode,
) -> Result<ChunkResult, MeshError> {
    let started = Instant::now();
    trace!(stage = ?BuildStage::Configure, direction = %patch.direction, "chunk build");
    validate_subdivisions(patch.subdivisions)?;

    trace!(stage = ?BuildStage::GenerateVertices);
    let vertices = generate_vertices(terrain, patch, craters)?;

    trace!(stage = ?BuildStage::Triangulate);
    let triangles = triangulate(patch.subdivisions);

    trace!(stage = ?BuildStage::ComputeNormals, mode = ?normal_mode);
    let normals = match normal_mode {
        NormalMode::FaceAccumulation => {
            accumulate_face_normals(&vertices.positions, &triangles, &vertices.radial)
        }
        NormalMode::Analytic => vertices
            .radial
            .iter()
            .zip(&vertices.slopes)
            .map(|(&unit, &slope)| analytic_normal(unit, slope))
            .collect(),
    };

    trace!(stage = ?BuildStage::Emit);
    let vertex_count = vertices.positions.len();
    let mut indices = IndexBuffer::with_capacity(vertex_count, triangles.len() * 3);
    for index in triangles.iter().flatten() {
        indices.push(*index);
    }
    let result = ChunkResult {
        positions: flatten(&vertices.positions),
        indices,
        normals: flatten(&normals),
        average_elevation: vertices.elevation_sum / vertex_count as f64,
    };

    debug!(
        direction = %patch.direction,
        vertices = vertex_count,
        triangles = triangles.len(),
        elapsed_us = started.elapsed().as_micros() as u64,
        "chunk built"
    );
    Ok(result)
}

fn generate_vertices(
    terrain: &TerrainFunction,
    patch: &ChunkPatch,
    craters: &CraterField,
) -> Result<Vertices, MeshError> {
    let side = patch.vertices_per_side();
    let count = (side as usize) * (side as usize);
    let relief = terrain.max_relief();
    let mut vertices = Vertices {
        positions: Vec::with_capacity(count),
        radial: Vec::with_capacity(count),
        slopes: Vec::with_capacity(count),
        elevation_sum: 0.0,
    };

    for x in 0..side {
        for y in 0..side {
            let on_sphere = patch
                .sphere_point(x, y)
                .ok_or(MeshError::CentreProjection { x, y })?;
            let unit = on_sphere / patch.planet_radius();
            let displaced = terrain.displace(on_sphere, craters);

            let surface_radius = patch.planet_radius() + displaced.elevation;
            let slope = if surface_radius > 0.0 {
                displaced.gradient * (relief / surface_radius)
            } else {
                DVec3::ZERO
            };

            vertices.positions.push(displaced.position);
            vertices.radial.push(unit);
            vertices.slopes.push(slope);
            vertices.elevation_sum += displaced.elevation;
        }
    }
    Ok(vertices)
}

/// Two triangles per grid cell.
fn triangulate(subdivisions: u32) -> Vec<[u32; 3]> {
    let side = subdivisions + 1;
    let mut triangles = Vec::with_capacity(2 * (subdivisions as usize).pow(2));
    for x in 0..subdivisions {
        for y in 0..subdivisions {
            let a = x * side + y;
            let b = a + 1;
            let c = (x + 1) * side + y + 1;
            let d = (x + 1) * side + y;
            triangles.push([a, c, b]);
            triangles.push([a, d, c]);
        }
    }
    triangles
}

fn flatten(vectors: &[DVec3]) -> Vec<f32> {
    vectors
        .iter()
        .flat_map(|v| v.as_vec3().to_array())
        .collect()
}
