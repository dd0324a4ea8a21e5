//! Cube-sphere geometry: face orientation and chunk patch layout.

mod direction;
mod patch;

pub use direction::FaceDirection;
pub use patch::ChunkPatch;
