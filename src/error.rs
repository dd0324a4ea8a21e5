//! Error types shared by the terrain and mesh modules.

use thiserror::Error;

/// Parameters that make a computation mathematically undefined.
///
/// These are reported before any generation work starts, so no partial
/// buffers are ever produced from a bad configuration.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("decay must be != 1 (got {0})")]
    UnitDecay(f64),
    #[error("min value must be != 1 (got {0})")]
    UnitMinValue(f64),
    #[error("layer needs at least one octave")]
    NoOctaves,
    #[error("{name} must be finite and > 0 (got {value})")]
    NonPositive { name: &'static str, value: f64 },
    #[error("{name} must be finite and >= 0 (got {value})")]
    Negative { name: &'static str, value: f64 },
    #[error("{name} must be finite (got {value})")]
    NonFinite { name: &'static str, value: f64 },
    #[error("continents fragmentation must be in (0, 1] (got {0})")]
    Fragmentation(f64),
    #[error("subdivisions must be > 0")]
    ZeroSubdivisions,
    #[error("{subdivisions} subdivisions exceed the {max} supported per chunk")]
    TooManySubdivisions { subdivisions: u32, max: u32 },
}

/// A request that could not be understood or is out of range.
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("malformed request: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("unknown face direction {0:?}")]
    UnknownFace(String),
    #[error("chunk length must be finite and > 0 (got {0})")]
    InvalidChunkLength(f64),
    #[error("chunk position must be finite (got {0:?})")]
    InvalidPosition([f64; 3]),
    #[error("depth {0} is too deep for a chunk")]
    InvalidDepth(u32),
    #[error("radius must be finite and > 0 (got {0})")]
    InvalidRadius(f64),
    #[error("direction must be finite and non-zero (got {0:?})")]
    InvalidDirection([f64; 3]),
}

/// Checks that a value is finite and strictly positive.
pub(crate) fn ensure_positive(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::NonPositive { name, value })
    }
}

/// Checks that a value is finite and not negative.
pub(crate) fn ensure_non_negative(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Negative { name, value })
    }
}

/// Checks that a value is finite.
pub(crate) fn ensure_finite(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::NonFinite { name, value })
    }
}
