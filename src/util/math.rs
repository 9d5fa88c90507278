//! Math helpers shared by the motion and operator primitives

use std::f64::consts::PI;

/// Degrees to radians
pub fn deg_to_rad(deg: f64) -> f64 {
    deg * PI / 180.0
}

/// Radians to degrees
pub fn rad_to_deg(rad: f64) -> f64 {
    rad * 180.0 / PI
}

/// Clamp value to range
pub fn clamp(
    value: f64,
    min: f64,
    max: f64,
) -> f64 {
    value.max(min).min(max)
}

/// Wrap `n` into the inclusive integer range `[min, max]`.
pub fn wrap_clamp(
    n: f64,
    min: f64,
    max: f64,
) -> f64 {
    let range = (max - min) + 1.0;
    n - ((n - min) / range).floor() * range
}

/// Tangent of an angle in degrees.
///
/// Exact at the poles and rounded to 10 decimals elsewhere, so `tan(180)` is `0`
/// instead of a tiny negative number.
pub fn tan(angle: f64) -> f64 {
    let angle = angle % 360.0;
    if angle == 90.0 || angle == -270.0 {
        return f64::INFINITY;
    }
    if angle == -90.0 || angle == 270.0 {
        return f64::NEG_INFINITY;
    }
    round_to((PI * angle / 180.0).tan(), 10)
}

/// Round to a fixed number of decimals
pub fn round_to(
    value: f64,
    decimals: i32,
) -> f64 {
    let scale = 10f64.powi(decimals);
    (value * scale).round() / scale
}
