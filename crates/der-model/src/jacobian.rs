//! Exact Jacobian of the state equations.
//!
//! Built from the same [`DerivedQuantities`] and [`WindupDecisions`] as
//! [`crate::dynamics::derivatives`], so frozen integrator rows are zero
//! exactly when the corresponding rate is.

use crate::derived::DerivedQuantities;
use crate::params::DerParameters;
use crate::state::{N_STATES, StateVar};
use crate::windup::{Axis, WindupDecisions};
use nalgebra::DMatrix;
use std::ops::{Index, IndexMut};

use crate::state::StateVar::*;

/// Square matrix indexed by `(derivative, state)`.
#[derive(Clone, Debug, PartialEq)]
pub struct Partials(DMatrix<f64>);

impl Partials {
    pub fn zeros() -> Self {
        Self(DMatrix::zeros(N_STATES, N_STATES))
    }

    pub fn as_matrix(&self) -> &DMatrix<f64> {
        &self.0
    }

    pub fn into_matrix(self) -> DMatrix<f64> {
        self.0
    }
}

impl Index<(StateVar, StateVar)> for Partials {
    type Output = f64;

    fn index(&self, (row, col): (StateVar, StateVar)) -> &f64 {
        &self.0[(row.index(), col.index())]
    }
}

impl IndexMut<(StateVar, StateVar)> for Partials {
    fn index_mut(&mut self, (row, col): (StateVar, StateVar)) -> &mut f64 {
        &mut self.0[(row.index(), col.index())]
    }
}

pub fn jacobian(
    params: &DerParameters,
    d: &DerivedQuantities,
    decisions: &WindupDecisions,
) -> Partials {
    let mut j = Partials::zeros();

    let s = &d.state;
    let gains = &params.gains;
    let c = d.gate();
    let lf = params.lf;
    let wb = params.bases.wbase;
    let (ia, ma, vta, inj, va) = (s.ia, d.ma, d.vta, d.inj, d.va);

    // d(vd)/d(ia)
    let dvd_re = (d.dva_dia_re * d.rotation).re;
    let dvd_im = (d.dva_dia_im * d.rotation).re;
    // d(Im S_pcc)/d(ia)
    let dq_re = 0.5 * (d.dva_dia_re * inj.conj()).im + 0.5 * c * va.im;
    let dq_im = 0.5 * (d.dva_dia_im * inj.conj()).im - 0.5 * c * va.re;

    // Filter current
    j[(IaRe, IaRe)] = (-params.rf - d.dva_dia_re.re) / lf + gains.kp_pll * dvd_re / wb * ia.im;
    j[(IaRe, IaIm)] = -d.dva_dia_im.re / lf + gains.kp_pll * dvd_im / wb * ia.im + d.we / wb;
    j[(IaRe, XaRe)] = s.vdc / (2.0 * lf);
    j[(IaRe, UaRe)] = gains.kp_gcc * s.vdc / (2.0 * lf);
    j[(IaRe, Vdc)] = ma.re / (2.0 * lf);
    j[(IaRe, Xpll)] = ia.im / wb;
    j[(IaRe, Wte)] = gains.kp_pll * d.vq * ia.im / wb;

    j[(IaIm, IaRe)] = -d.dva_dia_re.im / lf - gains.kp_pll * dvd_re / wb * ia.re - d.we / wb;
    j[(IaIm, IaIm)] = (-params.rf - d.dva_dia_im.im) / lf - gains.kp_pll * dvd_im / wb * ia.re;
    j[(IaIm, XaIm)] = s.vdc / (2.0 * lf);
    j[(IaIm, UaIm)] = gains.kp_gcc * s.vdc / (2.0 * lf);
    j[(IaIm, Vdc)] = ma.im / (2.0 * lf);
    j[(IaIm, Xpll)] = -ia.re / wb;
    j[(IaIm, Wte)] = -gains.kp_pll * d.vq * ia.re / wb;

    // Current controller
    if decisions.is_free(Axis::XaRe) {
        j[(XaRe, UaRe)] = gains.ki_gcc;
    }
    if decisions.is_free(Axis::XaIm) {
        j[(XaIm, UaIm)] = gains.ki_gcc;
    }
    if decisions.is_free(Axis::UaRe) {
        j[(UaRe, IaRe)] = -gains.wp;
        j[(UaRe, UaRe)] = -gains.wp;
        j[(UaRe, Vdc)] = -gains.wp * c * gains.kp_dc;
        j[(UaRe, Xdc)] = gains.wp * c;
    }
    if decisions.is_free(Axis::UaIm) {
        j[(UaIm, IaRe)] = gains.wp * c * gains.kp_q * dq_re;
        j[(UaIm, IaIm)] = -gains.wp + gains.wp * c * gains.kp_q * dq_im;
        j[(UaIm, UaIm)] = -gains.wp;
        j[(UaIm, Xq)] = gains.wp * c;
    }

    // DC link
    let k = 1.0 / (s.vdc * params.c_dc);
    j[(Vdc, IaRe)] = -k * 0.5 * vta.re;
    j[(Vdc, IaIm)] = -k * 0.5 * vta.im;
    j[(Vdc, XaRe)] = -k * s.vdc / 4.0 * ia.re;
    j[(Vdc, XaIm)] = -k * s.vdc / 4.0 * ia.im;
    j[(Vdc, UaRe)] = -k * gains.kp_gcc * s.vdc / 4.0 * ia.re;
    j[(Vdc, UaIm)] = -k * gains.kp_gcc * s.vdc / 4.0 * ia.im;
    j[(Vdc, Vdc)] = (d.dppv_dvdc - d.ppv / s.vdc) * k;

    // Outer loops
    if decisions.is_free(Axis::Dc) {
        j[(Xdc, Vdc)] = -gains.ki_dc;
    }
    if decisions.is_free(Axis::Q) {
        j[(Xq, IaRe)] = gains.ki_q * dq_re;
        j[(Xq, IaIm)] = gains.ki_q * dq_im;
    }

    // PLL
    j[(Xpll, IaRe)] = gains.ki_pll * dvd_re;
    j[(Xpll, IaIm)] = gains.ki_pll * dvd_im;
    j[(Xpll, Wte)] = gains.ki_pll * d.vq;

    j[(Wte, Xpll)] = 1.0;
    j[(Wte, IaRe)] = gains.kp_pll * dvd_re;
    j[(Wte, IaIm)] = gains.kp_pll * dvd_im;
    j[(Wte, Wte)] = gains.kp_pll * d.vq;

    j
}
