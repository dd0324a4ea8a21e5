//! Chunked cube-sphere planet generator.
//!
//! Terrain is an elevation field built from analytic-derivative simplex
//! noise, so every sample carries its gradient. Chunk meshes are cut from a
//! cube-sphere quadtree and built on a pool of worker threads.

pub mod error;
pub mod export;
pub mod forge;
pub mod geometry;
pub mod gradient;
pub mod layers;
pub mod mesh;
pub mod noise;
pub mod terrain;

pub use error::{ConfigError, ProtocolError};
pub use forge::{ChunkForge, ChunkRequest, ForgeConfig, ForgeError, ForgeMessage, Task, TaskId};
pub use geometry::{ChunkPatch, FaceDirection};
pub use gradient::Sample;
pub use layers::{FractalLayer, Layer, LayerConfig, MountainLayer, RidgedLayer, Warped};
pub use mesh::{build_chunk, ChunkResult, NormalMode};
pub use terrain::{CraterField, Seed, TerrainFunction, TerrainSettings};
