//! The six cube faces a chunk can belong to.

use std::f64::consts::{FRAC_PI_2, PI};
use std::fmt;
use std::str::FromStr;

use glam::{DQuat, DVec3};
use serde::{Deserialize, Serialize};

use crate::error::ProtocolError;

/// Cube face of a chunk, named by where its outward normal points.
///
/// Chunks are laid out on the `Forward` (+Z) face and rotated into place, so
/// every face shares one patch parameterization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum FaceDirection {
    /// +Y
    Up = 0,
    /// -Y
    Down = 1,
    /// -X
    Left = 2,
    /// +X
    Right = 3,
    /// +Z
    Forward = 4,
    /// -Z
    Backward = 5,
}

impl FaceDirection {
    /// All six faces in index order.
    pub const fn all() -> [FaceDirection; 6] {
        [
            FaceDirection::Up,
            FaceDirection::Down,
            FaceDirection::Left,
            FaceDirection::Right,
            FaceDirection::Forward,
            FaceDirection::Backward,
        ]
    }

    pub const fn index(self) -> usize {
        self as usize
    }

    pub const fn from_index(index: usize) -> Option<FaceDirection> {
        match index {
            0 => Some(FaceDirection::Up),
            1 => Some(FaceDirection::Down),
            2 => Some(FaceDirection::Left),
            3 => Some(FaceDirection::Right),
            4 => Some(FaceDirection::Forward),
            5 => Some(FaceDirection::Backward),
            _ => None,
        }
    }

    /// Lowercase name used in file names and on the command line.
    pub const fn short_name(self) -> &'static str {
        match self {
            FaceDirection::Up => "up",
            FaceDirection::Down => "down",
            FaceDirection::Left => "left",
            FaceDirection::Right => "right",
            FaceDirection::Forward => "forward",
            FaceDirection::Backward => "backward",
        }
    }

    /// Rotation taking the +Z face onto this face.
    pub fn rotation(self) -> DQuat {
        match self {
            FaceDirection::Up => DQuat::from_rotation_x(-FRAC_PI_2),
            FaceDirection::Down => DQuat::from_rotation_x(FRAC_PI_2),
            FaceDirection::Left => DQuat::from_rotation_y(-FRAC_PI_2),
            FaceDirection::Right => DQuat::from_rotation_y(FRAC_PI_2),
            FaceDirection::Forward => DQuat::IDENTITY,
            FaceDirection::Backward => DQuat::from_rotation_y(PI),
        }
    }

    /// Outward unit normal of the face.
    pub fn normal(self) -> DVec3 {
        match self {
            FaceDirection::Up => DVec3::Y,
            FaceDirection::Down => DVec3::NEG_Y,
            FaceDirection::Left => DVec3::NEG_X,
            FaceDirection::Right => DVec3::X,
            FaceDirection::Forward => DVec3::Z,
            FaceDirection::Backward => DVec3::NEG_Z,
        }
    }
}

impl fmt::Display for FaceDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_name())
    }
}

impl FromStr for FaceDirection {
    type Err = ProtocolError;

    /// Accepts the wire names (`Forward`) and the short names (`forward`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FaceDirection::all()
            .into_iter()
            .find(|face| face.short_name().eq_ignore_ascii_case(s))
            .ok_or_else(|| ProtocolError::UnknownFace(s.to_string()))
    }
}
