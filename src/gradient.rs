//! Value-and-gradient arithmetic.
//!
//! Every operator returns the transformed value together with the gradient
//! rescaled by the chain rule, so elevation slopes never need finite
//! differences. Soft selections are written in the `max + ln_1p(exp(..))`
//! form, which stays finite for any sharpness.

use std::ops::{Add, Mul};

use glam::DVec3;

use crate::error::ConfigError;

/// A scalar field value with its spatial gradient.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Sample {
    /// Field value.
    pub value: f64,
    /// Partial derivatives with respect to x, y and z.
    pub gradient: DVec3,
}

impl From<(f64, DVec3)> for Sample {
    fn from((value, gradient): (f64, DVec3)) -> Self {
        Self { value, gradient }
    }
}

impl Sample {
    /// Zero value, zero gradient.
    pub const ZERO: Sample = Sample::constant(0.0);

    pub const fn new(value: f64, gradient: DVec3) -> Self {
        Self { value, gradient }
    }

    /// A value that does not vary in space.
    pub const fn constant(value: f64) -> Self {
        Self {
            value,
            gradient: DVec3::ZERO,
        }
    }

    /// Multiplies value and gradient by a constant.
    pub fn scale(self, factor: f64) -> Self {
        Self::new(self.value * factor, self.gradient * factor)
    }

    /// Adds a constant; the gradient is unchanged.
    pub fn offset(self, amount: f64) -> Self {
        Self::new(self.value + amount, self.gradient)
    }

    /// Raises the value to `exponent`, scaling the gradient by
    /// `exponent * y^(exponent - 1)`.
    ///
    /// Non-positive inputs clamp to zero unless the exponent is 1.
    pub fn powf(self, exponent: f64) -> Self {
        if exponent == 1.0 {
            return self;
        }
        if self.value <= 0.0 {
            return Self::ZERO;
        }
        let powered = self.value.powf(exponent);
        Self::new(
            powered,
            self.gradient * (exponent * powered / self.value),
        )
    }

    /// Smooth absolute value `ln(e^kx + e^-kx) / k`, gradient scaled by `tanh(kx)`.
    pub fn s_abs(self, k: f64) -> Self {
        let magnitude = self.value.abs();
        let value = magnitude + (-2.0 * k * magnitude).exp().ln_1p() / k;
        Self::new(value, self.gradient * (k * self.value).tanh())
    }

    /// Smooth lower clamp: soft maximum of the value and `floor`.
    pub fn s_floor(self, floor: f64, k: f64) -> Self {
        smooth_max(self, Sample::constant(floor), k)
    }

    /// Smooth upper clamp: soft minimum of the value and `ceil`.
    pub fn s_ceil(self, ceil: f64, k: f64) -> Self {
        smooth_min(self, Sample::constant(ceil), k)
    }

    /// S-curve remap of [0, 1] onto [0, 1] with sharpness `s` (> 0).
    pub fn tanh_sharpen(self, s: f64) -> Self {
        debug_assert!(s > 0.0, "tanh sharpness must be positive");
        let tanh_x = (s * (self.value - 0.5)).tanh();
        let tanh_half_s = (0.5 * s).tanh();
        let slope = 0.5 * s * (1.0 - tanh_x * tanh_x) / tanh_half_s;
        Self::new(0.5 * (1.0 + tanh_x / tanh_half_s), self.gradient * slope)
    }

    /// Hermite smoothstep between `edge0` and `edge1`; flat outside the edges.
    pub fn smoothstep(self, edge0: f64, edge1: f64) -> Self {
        if self.value <= edge0 {
            return Self::ZERO;
        }
        if self.value >= edge1 {
            return Self::constant(1.0);
        }
        let width = edge1 - edge0;
        let t = (self.value - edge0) / width;
        Self::new(
            t * t * (3.0 - 2.0 * t),
            self.gradient * (6.0 * t * (1.0 - t) / width),
        )
    }

    /// Floor-rescale: values below `min_value` fold smoothly to zero and the
    /// remaining range `[min_value, 1]` is stretched back onto `[0, 1]`.
    pub fn minimum_value(self, min_value: f64, k: f64) -> Result<Self, ConfigError> {
        if min_value == 1.0 {
            return Err(ConfigError::UnitMinValue(min_value));
        }
        Ok(self.floor_rescale(min_value, k))
    }

    /// [`Sample::minimum_value`] for a `min_value` already known to differ from 1.
    pub(crate) fn floor_rescale(self, min_value: f64, k: f64) -> Self {
        self.offset(-min_value)
            .s_floor(0.0, k)
            .scale(1.0 / (1.0 - min_value))
    }
}

impl Add for Sample {
    type Output = Sample;

    fn add(self, rhs: Sample) -> Sample {
        Sample::new(self.value + rhs.value, self.gradient + rhs.gradient)
    }
}

/// Product of two fields (product rule).
impl Mul for Sample {
    type Output = Sample;

    fn mul(self, rhs: Sample) -> Sample {
        Sample::new(
            self.value * rhs.value,
            self.gradient * rhs.value + rhs.gradient * self.value,
        )
    }
}

impl Mul<f64> for Sample {
    type Output = Sample;

    fn mul(self, rhs: f64) -> Sample {
        self.scale(rhs)
    }
}

/// Logistic function, evaluated without overflow for large |x|.
fn logistic(x: f64) -> f64 {
    if x >= 0.0 {
        1.0 / (1.0 + (-x).exp())
    } else {
        let e = x.exp();
        e / (1.0 + e)
    }
}

/// Smooth maximum `ln(e^ka + e^kb) / k` of two plain values.
pub fn smax(a: f64, b: f64, k: f64) -> f64 {
    a.max(b) + (-k * (a - b).abs()).exp().ln_1p() / k
}

/// Smooth minimum `-ln(e^-ka + e^-kb) / k` of two plain values.
pub fn smin(a: f64, b: f64, k: f64) -> f64 {
    -smax(-a, -b, k)
}

/// Smooth maximum of two fields; the gradient is the softmax-weighted blend.
pub fn smooth_max(a: Sample, b: Sample, k: f64) -> Sample {
    let weight_a = logistic(k * (a.value - b.value));
    Sample::new(
        smax(a.value, b.value, k),
        a.gradient * weight_a + b.gradient * (1.0 - weight_a),
    )
}

/// Smooth minimum of two fields; the gradient is the softmin-weighted blend.
pub fn smooth_min(a: Sample, b: Sample, k: f64) -> Sample {
    let weight_a = logistic(k * (b.value - a.value));
    Sample::new(
        smin(a.value, b.value, k),
        a.gradient * weight_a + b.gradient * (1.0 - weight_a),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-6;

    /// A linear field along x: f(p) = value + slope * (p.x - x0).
    fn linear(value: f64, slope: f64) -> Sample {
        Sample::new(value, DVec3::new(slope, 0.0, 0.0))
    }

    /// Central difference of an operator applied to `linear(x, 1)` at `x`.
    fn numeric_slope(op: impl Fn(Sample) -> Sample, x: f64) -> f64 {
        let h = 1e-6;
        (op(linear(x + h, 1.0)).value - op(linear(x - h, 1.0)).value) / (2.0 * h)
    }

    fn check_chain_rule(op: impl Fn(Sample) -> Sample, xs: &[f64]) {
        for &x in xs {
            let analytic = op(linear(x, 1.0)).gradient.x;
            let numeric = numeric_slope(&op, x);
            assert!(
                (analytic - numeric).abs() < 1e-5 * (1.0 + numeric.abs()),
                "x = {x}: analytic {analytic} vs numeric {numeric}"
            );
        }
    }

    #[test]
    fn test_smax_smin_approach_hard_selection() {
        assert!((smax(0.2, 0.8, 200.0) - 0.8).abs() < 1e-3);
        assert!((smin(0.2, 0.8, 200.0) - 0.2).abs() < 1e-3);
        // Large sharpness must not overflow.
        assert_eq!(smax(10.0, -10.0, 1e6), 10.0);
        assert!(smin(10.0, 9.0, 1e4).is_finite());
    }

    #[test]
    fn test_smooth_max_gradient_blend() {
        let a = Sample::new(0.5, DVec3::X);
        let b = Sample::new(0.5, DVec3::Y);
        let m = smooth_max(a, b, 10.0);
        assert!((m.gradient - DVec3::new(0.5, 0.5, 0.0)).length() < EPS);

        let far = smooth_max(Sample::new(5.0, DVec3::X), b, 50.0);
        assert!((far.gradient - DVec3::X).length() < EPS);
    }

    #[test]
    fn test_smooth_min_gradient_blend() {
        let a = Sample::new(-3.0, DVec3::X);
        let b = Sample::new(4.0, DVec3::Z);
        let m = smooth_min(a, b, 20.0);
        assert!((m.value + 3.0).abs() < 1e-6);
        assert!((m.gradient - DVec3::X).length() < EPS);
    }

    #[test]
    fn test_operators_follow_chain_rule() {
        let xs = [-0.7, -0.1, 0.05, 0.3, 0.5, 0.9];
        check_chain_rule(|s| s.s_abs(8.0), &xs);
        check_chain_rule(|s| s.s_floor(0.2, 15.0), &xs);
        check_chain_rule(|s| s.s_ceil(0.2, 15.0), &xs);
        check_chain_rule(|s| s.tanh_sharpen(32.0), &xs);
        check_chain_rule(|s| s.smoothstep(-0.5, 0.8), &xs);
        check_chain_rule(|s| s.scale(3.0).offset(1.0), &xs);
        check_chain_rule(|s| s * s.scale(2.0), &xs);
        check_chain_rule(|s| s.powf(2.5), &[0.05, 0.3, 0.5, 0.9]);
        check_chain_rule(|s| s.minimum_value(0.4, 100.0).unwrap(), &xs);
    }

    #[test]
    fn test_s_abs_is_symmetric_and_above_abs() {
        for x in [-2.0, -0.3, 0.0, 0.3, 2.0] {
            let v = linear(x, 1.0).s_abs(8.0).value;
            assert!(v >= f64::abs(x));
            assert!((v - linear(-x, 1.0).s_abs(8.0).value).abs() < 1e-12);
        }
    }

    #[test]
    fn test_tanh_sharpen_fixes_endpoints() {
        assert!(Sample::constant(0.0).tanh_sharpen(32.0).value.abs() < 1e-12);
        assert!((Sample::constant(1.0).tanh_sharpen(32.0).value - 1.0).abs() < 1e-12);
        assert!((Sample::constant(0.5).tanh_sharpen(32.0).value - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_powf_edge_cases() {
        assert_eq!(linear(0.0, 1.0).powf(2.0), Sample::ZERO);
        assert_eq!(linear(-0.5, 1.0).powf(1.0), linear(-0.5, 1.0));
        let p = linear(0.5, 1.0).powf(2.0);
        assert!((p.value - 0.25).abs() < EPS);
        assert!((p.gradient.x - 1.0).abs() < EPS);
    }

    #[test]
    fn test_minimum_value_rejects_unit_min() {
        assert_eq!(
            linear(0.5, 1.0).minimum_value(1.0, 100.0),
            Err(ConfigError::UnitMinValue(1.0))
        );
    }

    #[test]
    fn test_minimum_value_rescales_to_unit_interval() {
        let low = linear(0.1, 1.0).minimum_value(0.5, 100.0).unwrap();
        assert!(low.value >= 0.0 && low.value < 0.01);
        assert!(low.gradient.x.abs() < 1e-6);

        let high = linear(1.0, 1.0).minimum_value(0.5, 100.0).unwrap();
        assert!((high.value - 1.0).abs() < 1e-9);
        assert!((high.gradient.x - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_field_product_follows_product_rule() {
        let a = Sample::new(3.0, DVec3::X);
        let b = Sample::new(2.0, DVec3::new(0.0, 4.0, 0.0));
        let p = a * b;
        assert_eq!(p.value, 6.0);
        assert_eq!(p.gradient, DVec3::new(2.0, 12.0, 0.0));
        assert_eq!(a * b, b * a);
        assert_eq!(a * Sample::constant(2.0), a * 2.0);
    }

    #[test]
    fn test_add_and_scale_operators() {
        let a = Sample::new(1.0, DVec3::X);
        let b = Sample::new(2.0, DVec3::Y);
        let s = a + b * 2.0;
        assert_eq!(s.value, 5.0);
        assert_eq!(s.gradient, DVec3::new(1.0, 2.0, 0.0));
    }
}
