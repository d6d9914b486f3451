//! Phasor to stationary (alpha/beta) and rotating (d/q) frame conversions.

use num_complex::Complex64;

/// Instantaneous alpha/beta components of phasor `v` at grid angle `theta`.
///
/// `v_alpha = Re(v e^{j theta})`, `v_beta = Re(v e^{-j pi/2} e^{j theta})`.
#[inline]
pub fn alpha_beta(v: Complex64, theta: f64) -> (f64, f64) {
    let inst = v * Complex64::cis(theta);
    (inst.re, inst.im)
}

/// Park transform onto a frame at angle `wte`.
#[inline]
pub fn park(v_alpha: f64, v_beta: f64, wte: f64) -> (f64, f64) {
    let (sin, cos) = wte.sin_cos();
    (v_alpha * cos + v_beta * sin, -v_alpha * sin + v_beta * cos)
}
