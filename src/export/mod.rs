//! Export of chunk meshes (OBJ) and face heightmaps (16-bit PNG).

mod obj;
mod png;

pub use obj::{export_chunks_obj, write_chunks_obj, ObjExportError};
pub use png::{export_face_heightmap_png, export_planet_heightmaps, PngExportError, PngExportOptions};
