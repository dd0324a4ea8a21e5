//! 16-bit PNG export of face heightmaps.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{ImageBuffer, ImageEncoder, Luma};
use rayon::prelude::*;
use thiserror::Error;

use crate::terrain::FaceHeightmap;

/// Errors that can occur during PNG export.
#[derive(Error, Debug)]
pub enum PngExportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Image encoding error: {0}")]
    Image(#[from] image::ImageError),
    #[error("Invalid height range: min ({0}) >= max ({1})")]
    InvalidHeightRange(f32, f32),
    #[error("heightmap has {actual} samples, expected {expected}")]
    SizeMismatch { actual: usize, expected: usize },
}

/// Options for PNG export.
#[derive(Debug, Clone)]
pub struct PngExportOptions {
    /// Height mapped to black.
    pub min_height: f32,
    /// Height mapped to white.
    pub max_height: f32,
    pub compression: CompressionType,
    pub filter: FilterType,
}

impl Default for PngExportOptions {
    fn default() -> Self {
        Self {
            min_height: 0.0,
            max_height: 1.0,
            compression: CompressionType::Default,
            filter: FilterType::Adaptive,
        }
    }
}

impl PngExportOptions {
    /// Range spanning every map, so all faces share one grey scale.
    ///
    /// A perfectly flat set of maps gets a unit-wide range above its height.
    pub fn auto_range(maps: &[FaceHeightmap]) -> Self {
        let (min, max) = maps
            .iter()
            .filter_map(FaceHeightmap::height_range)
            .fold((f32::MAX, f32::MIN), |(lo, hi), (min, max)| (lo.min(min), hi.max(max)));
        let (min, max) = if min < max {
            (min, max)
        } else if min == max {
            (min, min + 1.0)
        } else {
            (0.0, 1.0)
        };
        Self {
            min_height: min,
            max_height: max,
            ..Default::default()
        }
    }
}

/// Writes one face as a 16-bit grayscale PNG.
///
/// # Arguments
/// * `map` - The face heightmap to export
/// * `path` - Output file path
/// * `options` - Height range mapped onto black..white, and encoder settings
///
/// # Returns
/// `Ok(())` on success, or an error if the range is empty, the map is the
/// wrong size, or encoding fails
pub fn export_face_heightmap_png(
    map: &FaceHeightmap,
    path: &Path,
    options: &PngExportOptions,
) -> Result<(), PngExportError> {
    let min = options.min_height;
    let max = options.max_height;
    if min >= max {
        return Err(PngExportError::InvalidHeightRange(min, max));
    }
    let resolution = map.resolution;
    let expected = (resolution as usize) * (resolution as usize);
    if map.heights.len() != expected {
        return Err(PngExportError::SizeMismatch {
            actual: map.heights.len(),
            expected,
        });
    }

    let range = max - min;
    let img: ImageBuffer<Luma<u16>, Vec<u16>> = ImageBuffer::from_fn(resolution, resolution, |x, y| {
        let normalized = ((map.get(x, y) - min) / range).clamp(0.0, 1.0);
        Luma([(normalized * 65535.0) as u16])
    });

    let writer = BufWriter::new(File::create(path)?);
    let encoder = PngEncoder::new_with_quality(writer, options.compression, options.filter);
    let bytes: &[u8] = bytemuck::cast_slice(img.as_raw());
    encoder.write_image(bytes, resolution, resolution, image::ExtendedColorType::L16)?;
    Ok(())
}

/// Writes every map as `{base_name}_{face}.png` in `output_dir`, in parallel.
///
/// # Returns
/// `Ok(())` on success, or the first error encountered
pub fn export_planet_heightmaps(
    maps: &[FaceHeightmap],
    output_dir: &Path,
    base_name: &str,
    options: &PngExportOptions,
) -> Result<(), PngExportError> {
    std::fs::create_dir_all(output_dir)?;
    maps.par_iter().try_for_each(|map| {
        let path = output_dir.join(format!("{}_{}.png", base_name, map.direction.short_name()));
        export_face_heightmap_png(map, &path, options)
    })
}
