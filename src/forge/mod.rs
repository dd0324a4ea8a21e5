//! Chunk dispatch: a fixed pool of worker threads turning [`Task`]s into
//! meshes and height samples.
//!
//! Workers share one read-only [`TerrainFunction`](crate::terrain::TerrainFunction)
//! and nothing else. Queued tasks are dispatched shallowest depth first, ties
//! in submission order; results come back in completion order. Cancelling a
//! queued task removes it, cancelling a running one discards its result.

mod message;
mod pool;

pub use message::{
    ChunkRequest, Completed, ForgeMessage, HeightRequest, HeightResult, Task, TaskId, TaskOutput,
    MAX_DEPTH,
};
pub use pool::{execute, ChunkForge, ForgeConfig};

use thiserror::Error;

use crate::error::{ConfigError, ProtocolError};
use crate::mesh::MeshError;

/// Errors reported by the forge or by a task it ran.
#[derive(Error, Debug)]
pub enum ForgeError {
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Mesh(#[from] MeshError),
    #[error("task queue is full")]
    QueueFull,
    #[error("chunk forge workers have shut down")]
    Disconnected,
    #[error("worker panicked while running the task: {0}")]
    Panicked(String),
    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[from] std::io::Error),
}
