//! Wavefront OBJ export of chunk meshes.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use thiserror::Error;

use crate::mesh::ChunkResult;

/// Errors that can occur during OBJ export.
#[derive(Error, Debug)]
pub enum ObjExportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("chunk {index} has mismatched position and normal buffers")]
    MalformedChunk { index: usize },
}

/// Writes the chunks as one OBJ object per chunk, sharing a single index
/// space as the format requires.
pub fn write_chunks_obj<W: Write>(chunks: &[ChunkResult], writer: W) -> Result<(), ObjExportError> {
    let mut out = BufWriter::new(writer);
    writeln!(out, "# planetforge chunks: {}", chunks.len())?;

    let mut base = 1u64;
    for (index, chunk) in chunks.iter().enumerate() {
        if chunk.positions.len() % 3 != 0 || chunk.normals.len() != chunk.positions.len() {
            return Err(ObjExportError::MalformedChunk { index });
        }
        writeln!(out, "o chunk_{index}")?;
        for p in chunk.positions.chunks_exact(3) {
            writeln!(out, "v {} {} {}", p[0], p[1], p[2])?;
        }
        for n in chunk.normals.chunks_exact(3) {
            writeln!(out, "vn {} {} {}", n[0], n[1], n[2])?;
        }
        for [a, b, c] in chunk.triangles() {
            let (a, b, c) = (base + a as u64, base + b as u64, base + c as u64);
            writeln!(out, "f {a}//{a} {b}//{b} {c}//{c}")?;
        }
        base += chunk.vertex_count() as u64;
    }
    out.flush()?;
    Ok(())
}

/// [`write_chunks_obj`] into a file, creating parent directories.
pub fn export_chunks_obj(chunks: &[ChunkResult], path: &Path) -> Result<(), ObjExportError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    write_chunks_obj(chunks, File::create(path)?)
}
