//! Layer combinators: fractal, ridged, mountain and domain-warped noise.
//!
//! Every layer is an immutable value that can be evaluated from any number of
//! threads at once. Scratch state lives on the stack of `evaluate`.

mod config;
mod fractal;
mod mountain;
mod ridged;
mod warp;

pub use config::LayerConfig;
pub use fractal::FractalLayer;
pub use mountain::MountainLayer;
pub use ridged::RidgedLayer;
pub use warp::Warped;

use glam::DVec3;

use crate::gradient::Sample;

/// A scalar elevation field with an analytic gradient.
pub trait Layer: Send + Sync {
    /// Evaluates the layer at `point`, using `seed` as the noise w channel.
    fn evaluate(&self, point: DVec3, seed: f64) -> Sample;
}

impl<L: Layer + ?Sized> Layer for Box<L> {
    fn evaluate(&self, point: DVec3, seed: f64) -> Sample {
        (**self).evaluate(point, seed)
    }
}

/// Folds a signed octave into a crest: `1 - |s|`, smoothed with sharpness `k`.
fn ridge(octave: Sample, k: f64) -> Sample {
    octave.s_abs(k).scale(-1.0).offset(1.0)
}
