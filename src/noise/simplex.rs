//! Simplex noise with analytic derivatives in 2D, 3D and 4D.
//!
//! Each corner of the active simplex contributes `t^4 * dot(g, d)` with
//! `t = r² - |d|²` clamped at zero, where `d` is the offset from the corner
//! and `g` its hashed gradient. Differentiating that expression directly
//! gives `-8 t^3 dot(g, d) d + t^4 g`, summed over the corners. Value and
//! derivative share one scale factor, so the gradient is exact.

use glam::{DVec2, DVec3};

use super::tables::{GRAD2, GRAD3, GRAD4, PERM};

/// 2D skew factor `(sqrt(3) - 1) / 2`.
const F2: f64 = 0.366_025_403_784_438_6;
/// 2D unskew factor `(3 - sqrt(3)) / 6`.
const G2: f64 = 0.211_324_865_405_187_1;
const F3: f64 = 1.0 / 3.0;
const G3: f64 = 1.0 / 6.0;
/// 4D skew factor `(sqrt(5) - 1) / 4`.
const F4: f64 = 0.309_016_994_374_947_4;
/// 4D unskew factor `(5 - sqrt(5)) / 20`.
const G4: f64 = 0.138_196_601_125_010_5;

const SCALE2: f64 = 40.0;
const SCALE3: f64 = 28.0;
const SCALE4: f64 = 27.0;

/// Squared influence radius of a corner (0.5 in 2D, 0.6 above).
const RADIUS2_2D: f64 = 0.5;
const RADIUS2: f64 = 0.6;

#[inline]
fn perm(index: usize) -> usize {
    PERM[index] as usize
}

/// Lattice coordinate wrapped to the permutation period.
#[inline]
fn wrap(cell: f64) -> usize {
    (cell as i64 & 255) as usize
}

#[inline]
fn dot<const N: usize>(a: &[f64; N], b: &[f64; N]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Contribution of one corner and its derivative with respect to the sample
/// position. Corners outside the influence radius contribute nothing.
#[inline]
fn corner<const N: usize>(radius2: f64, offset: [f64; N], gradient: &[f64; N]) -> (f64, [f64; N]) {
    let t = radius2 - dot(&offset, &offset);
    if t < 0.0 {
        return (0.0, [0.0; N]);
    }
    let t2 = t * t;
    let t4 = t2 * t2;
    let projection = dot(gradient, &offset);
    let falloff = -8.0 * t2 * t * projection;

    let mut derivative = [0.0; N];
    for (d, (o, g)) in derivative.iter_mut().zip(offset.iter().zip(gradient)) {
        *d = falloff * o + t4 * g;
    }
    (t4 * projection, derivative)
}

fn accumulate<const N: usize>(corners: &[(f64, [f64; N])]) -> (f64, [f64; N]) {
    let mut value = 0.0;
    let mut derivative = [0.0; N];
    for (v, d) in corners {
        value += v;
        for (acc, x) in derivative.iter_mut().zip(d) {
            *acc += x;
        }
    }
    (value, derivative)
}

/// 2D simplex noise in [-1, 1] and its gradient.
pub fn noise2(x: f64, y: f64) -> (f64, DVec2) {
    let s = (x + y) * F2;
    let i = (x + s).floor();
    let j = (y + s).floor();
    let t = (i + j) * G2;
    let x0 = x - (i - t);
    let y0 = y - (j - t);

    // Lower or upper triangle of the skewed cell.
    let (i1, j1) = if x0 > y0 { (1, 0) } else { (0, 1) };

    let offsets = [
        [x0, y0],
        [x0 - i1 as f64 + G2, y0 - j1 as f64 + G2],
        [x0 - 1.0 + 2.0 * G2, y0 - 1.0 + 2.0 * G2],
    ];

    let ii = wrap(i);
    let jj = wrap(j);
    let hashes = [
        perm(ii + perm(jj)),
        perm(ii + i1 + perm(jj + j1)),
        perm(ii + 1 + perm(jj + 1)),
    ];

    let corners: [(f64, [f64; 2]); 3] =
        std::array::from_fn(|c| corner(RADIUS2_2D, offsets[c], &GRAD2[hashes[c] & 7]));
    let (value, d) = accumulate(&corners);

    (SCALE2 * value, DVec2::new(d[0], d[1]) * SCALE2)
}

/// 3D simplex noise in [-1, 1] and its gradient.
pub fn noise3(x: f64, y: f64, z: f64) -> (f64, DVec3) {
    let s = (x + y + z) * F3;
    let i = (x + s).floor();
    let j = (y + s).floor();
    let k = (z + s).floor();
    let t = (i + j + k) * G3;
    let x0 = x - (i - t);
    let y0 = y - (j - t);
    let z0 = z - (k - t);

    // Second and third corners follow the magnitude order of the offsets.
    let (second, third): ([usize; 3], [usize; 3]) = if x0 >= y0 {
        if y0 >= z0 {
            ([1, 0, 0], [1, 1, 0])
        } else if x0 >= z0 {
            ([1, 0, 0], [1, 0, 1])
        } else {
            ([0, 0, 1], [1, 0, 1])
        }
    } else if y0 < z0 {
        ([0, 0, 1], [0, 1, 1])
    } else if x0 < z0 {
        ([0, 1, 0], [0, 1, 1])
    } else {
        ([0, 1, 0], [1, 1, 0])
    };

    let base = [x0, y0, z0];
    let shifted = |step: [usize; 3], unskew: f64| -> [f64; 3] {
        std::array::from_fn(|a| base[a] - step[a] as f64 + unskew)
    };
    let offsets = [
        base,
        shifted(second, G3),
        shifted(third, 2.0 * G3),
        shifted([1, 1, 1], 3.0 * G3),
    ];

    let (ii, jj, kk) = (wrap(i), wrap(j), wrap(k));
    let hash = |step: [usize; 3]| perm(ii + step[0] + perm(jj + step[1] + perm(kk + step[2])));
    let hashes = [hash([0, 0, 0]), hash(second), hash(third), hash([1, 1, 1])];

    let corners: [(f64, [f64; 3]); 4] =
        std::array::from_fn(|c| corner(RADIUS2, offsets[c], &GRAD3[hashes[c] & 15]));
    let (value, d) = accumulate(&corners);

    (SCALE3 * value, DVec3::from_array(d) * SCALE3)
}

/// 4D simplex noise in [-1, 1] and its gradient with respect to x, y and z.
///
/// The fourth coordinate is treated as a seed channel, so its partial
/// derivative is not returned. Identical inputs always produce
/// bit-identical outputs.
pub fn noise4(x: f64, y: f64, z: f64, w: f64) -> (f64, DVec3) {
    let s = (x + y + z + w) * F4;
    let i = (x + s).floor();
    let j = (y + s).floor();
    let k = (z + s).floor();
    let l = (w + s).floor();
    let t = (i + j + k + l) * G4;
    let base = [x - (i - t), y - (j - t), z - (k - t), w - (l - t)];

    // Rank each axis by offset magnitude; the simplex is walked from the
    // largest offset down, one axis per corner.
    let mut rank = [0usize; 4];
    for a in 0..4 {
        for b in (a + 1)..4 {
            if base[a] > base[b] {
                rank[a] += 1;
            } else {
                rank[b] += 1;
            }
        }
    }
    let step = |threshold: usize| -> [usize; 4] {
        std::array::from_fn(|a| usize::from(rank[a] >= threshold))
    };
    let steps = [[0; 4], step(3), step(2), step(1), [1; 4]];

    let (ii, jj, kk, ll) = (wrap(i), wrap(j), wrap(k), wrap(l));
    let corners: [(f64, [f64; 4]); 5] = std::array::from_fn(|c| {
        let offset: [f64; 4] =
            std::array::from_fn(|a| base[a] - steps[c][a] as f64 + c as f64 * G4);
        let hash = perm(
            ii + steps[c][0]
                + perm(jj + steps[c][1] + perm(kk + steps[c][2] + perm(ll + steps[c][3]))),
        );
        corner(RADIUS2, offset, &GRAD4[hash & 31])
    });
    let (value, d) = accumulate(&corners);

    (SCALE4 * value, DVec3::new(d[0], d[1], d[2]) * SCALE4)
}

/// 4D noise at `point`, with `seed` as the fourth coordinate. Range [-1, 1].
pub fn simplex11(point: DVec3, seed: f64) -> (f64, DVec3) {
    noise4(point.x, point.y, point.z, seed)
}

/// [`simplex11`] remapped onto [0, 1]; the gradient is halved accordingly.
pub fn simplex01(point: DVec3, seed: f64) -> (f64, DVec3) {
    let (value, gradient) = simplex11(point, seed);
    ((value + 1.0) * 0.5, gradient * 0.5)
}
