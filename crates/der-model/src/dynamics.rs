//! Nonlinear state equations.

use crate::derived::DerivedQuantities;
use crate::params::DerParameters;
use crate::state::{N_STATES, StateVar};
use crate::windup::{Axis, ControllerRates, WindupDecisions};

/// Time derivatives in [`StateVar`] order.
pub fn derivatives(
    params: &DerParameters,
    d: &DerivedQuantities,
    rates: &ControllerRates,
    decisions: &WindupDecisions,
) -> [f64; N_STATES] {
    let s = &d.state;
    let g = d.gate();
    let coupling = d.we / params.bases.wbase;

    let mut dx = [0.0; N_STATES];
    let mut set = |var: StateVar, v: f64| dx[var.index()] = v;

    // Filter, in the frame rotating at the PLL frequency
    set(
        StateVar::IaRe,
        (-params.rf * s.ia.re - g * d.va.re + d.vta.re) / params.lf + coupling * s.ia.im,
    );
    set(
        StateVar::IaIm,
        (-params.rf * s.ia.im - g * d.va.im + d.vta.im) / params.lf - coupling * s.ia.re,
    );

    set(StateVar::XaRe, decisions.gate(Axis::XaRe, rates.xa.re));
    set(StateVar::XaIm, decisions.gate(Axis::XaIm, rates.xa.im));
    set(StateVar::UaRe, decisions.gate(Axis::UaRe, rates.ua.re));
    set(StateVar::UaIm, decisions.gate(Axis::UaIm, rates.ua.im));

    // DC-link power balance
    set(StateVar::Vdc, (d.ppv - d.s.re) / (s.vdc * params.c_dc));

    set(StateVar::Xdc, decisions.gate(Axis::Dc, rates.xdc));
    set(StateVar::Xq, decisions.gate(Axis::Q, rates.xq));

    set(StateVar::Xpll, params.gains.ki_pll * d.vd);
    set(StateVar::Wte, d.we);

    dx
}
