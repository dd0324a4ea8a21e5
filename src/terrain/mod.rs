//! Terrain composition.
//!
//! [`TerrainSettings`] describe a planet; [`TerrainFunction`] turns them into
//! an elevation field that chunk builds and heightmap previews sample.

mod composition;
mod crater;
mod heightmap;
mod settings;

pub use composition::{Displacement, TerrainFunction};
pub use crater::{Crater, CraterField, CraterModifiers};
pub use heightmap::{generate_face_heightmap, generate_planet_heightmaps, FaceHeightmap};
pub use settings::{Seed, SettingsError, TerrainSettings, TerrainTuning};
