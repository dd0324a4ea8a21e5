//! Per-vertex normals.

use glam::DVec3;

/// Accumulates unit face normals into the vertices of each triangle and
/// renormalizes.
///
/// Zero-area triangles contribute nothing. A vertex whose accumulated normal
/// vanishes takes its entry in `fallback` instead.
pub fn accumulate_face_normals(positions: &[DVec3], triangles: &[[u32; 3]], fallback: &[DVec3]) -> Vec<DVec3> {
    let mut normals = vec![DVec3::ZERO; positions.len()];
    for &[a, b, c] in triangles {
        let (a, b, c) = (a as usize, b as usize, c as usize);
        let face = (positions[b] - positions[a]).cross(positions[c] - positions[a]);
        let Some(face) = face.try_normalize() else {
            continue;
        };
        normals[a] += face;
        normals[b] += face;
        normals[c] += face;
    }
    normals
        .iter()
        .zip(fallback)
        .map(|(n, &radial)| n.try_normalize().unwrap_or(radial))
        .collect()
}

/// Surface normal from the terrain gradient: the radial direction tilted
/// against the tangential part of the slope.
///
/// `slope` is the elevation gradient in world units (height per unit length
/// along the surface).
pub fn analytic_normal(unit: DVec3, slope: DVec3) -> DVec3 {
    let tangential = slope - unit * slope.dot(unit);
    (unit - tangential).try_normalize().unwrap_or(unit)
}
