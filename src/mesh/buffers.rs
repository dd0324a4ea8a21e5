//! Flat output buffers of a chunk build.

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Vertex counts up to this size are indexed with `u16`.
pub const U16_VERTEX_LIMIT: usize = 1 << 16;

/// Triangle indices, narrowed to `u16` whenever every vertex fits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IndexBuffer {
    U16(Vec<u16>),
    U32(Vec<u32>),
}

impl IndexBuffer {
    /// Empty buffer of the narrowest width able to address `vertex_count` vertices.
    pub fn with_capacity(vertex_count: usize, capacity: usize) -> Self {
        if vertex_count <= U16_VERTEX_LIMIT {
            IndexBuffer::U16(Vec::with_capacity(capacity))
        } else {
            IndexBuffer::U32(Vec::with_capacity(capacity))
        }
    }

    /// Appends an index. It must address a vertex below the count the buffer
    /// was created for.
    pub fn push(&mut self, index: u32) {
        match self {
            IndexBuffer::U16(indices) => {
                debug_assert!(index <= u16::MAX as u32);
                indices.push(index as u16);
            }
            IndexBuffer::U32(indices) => indices.push(index),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            IndexBuffer::U16(indices) => indices.len(),
            IndexBuffer::U32(indices) => indices.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, i: usize) -> Option<u32> {
        match self {
            IndexBuffer::U16(indices) => indices.get(i).map(|&index| index as u32),
            IndexBuffer::U32(indices) => indices.get(i).copied(),
        }
    }

    /// Indices widened to `u32`.
    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        (0..self.len()).filter_map(move |i| self.get(i))
    }

    /// Raw little-endian bytes, ready for a GPU upload.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            IndexBuffer::U16(indices) => bytemuck::cast_slice(indices),
            IndexBuffer::U32(indices) => bytemuck::cast_slice(indices),
        }
    }
}

/// Mesh data of one chunk. Positions and normals are flat `xyz` triples.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkResult {
    pub positions: Vec<f32>,
    pub indices: IndexBuffer,
    pub normals: Vec<f32>,
    /// Mean elevation of the vertices above the base sphere.
    pub average_elevation: f64,
}

impl ChunkResult {
    pub fn vertex_count(&self) -> usize {
        self.positions.len() / 3
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn position(&self, i: usize) -> Vec3 {
        Vec3::from_slice(&self.positions[3 * i..3 * i + 3])
    }

    pub fn normal(&self, i: usize) -> Vec3 {
        Vec3::from_slice(&self.normals[3 * i..3 * i + 3])
    }

    /// Triangles as vertex index triples.
    pub fn triangles(&self) -> impl Iterator<Item = [u32; 3]> + '_ {
        (0..self.triangle_count()).filter_map(move |t| {
            Some([
                self.indices.get(3 * t)?,
                self.indices.get(3 * t + 1)?,
                self.indices.get(3 * t + 2)?,
            ])
        })
    }

    pub fn positions_as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.positions)
    }

    pub fn normals_as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.normals)
    }
}
