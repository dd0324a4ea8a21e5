//! Chunk mesh builder: patch vertices, triangles and normals.

mod buffers;
mod builder;
mod normals;

pub use buffers::{ChunkResult, IndexBuffer, U16_VERTEX_LIMIT};
pub use builder::{build_chunk, validate_subdivisions, BuildStage, MeshError, NormalMode, MAX_SUBDIVISIONS};
pub use normals::{accumulate_face_normals, analytic_normal};
