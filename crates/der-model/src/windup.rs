//! Anti-windup decisions shared by the state equations and the Jacobian.
//!
//! An integrator axis freezes when its saturation test holds and the
//! proposed rate pushes further in the direction the state already has.

use crate::derived::DerivedQuantities;
use crate::params::DerParameters;
use der_core::sign;
use num_complex::Complex64;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Axis {
    XaRe,
    XaIm,
    UaRe,
    UaIm,
    Dc,
    Q,
}

impl Axis {
    pub const ALL: [Axis; 6] = [
        Axis::XaRe,
        Axis::XaIm,
        Axis::UaRe,
        Axis::UaIm,
        Axis::Dc,
        Axis::Q,
    ];

    fn slot(self) -> usize {
        self as usize
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClampOutcome {
    Saturated { axis: Axis },
    /// Outer-loop integrator held while the ride-through gate is open.
    Held { axis: Axis },
    Free { axis: Axis },
}

impl ClampOutcome {
    pub fn axis(self) -> Axis {
        match self {
            ClampOutcome::Saturated { axis }
            | ClampOutcome::Held { axis }
            | ClampOutcome::Free { axis } => axis,
        }
    }

    pub fn is_free(self) -> bool {
        matches!(self, ClampOutcome::Free { .. })
    }
}

/// Decide one axis.
pub fn clamp(axis: Axis, saturated: bool, rate: f64, state: f64) -> ClampOutcome {
    if saturated && sign(rate) == sign(state) {
        ClampOutcome::Saturated { axis }
    } else {
        ClampOutcome::Free { axis }
    }
}

/// Outer loops keep their pre-trip command while the gate is open.
fn hold(d: &DerivedQuantities, outcome: ClampOutcome) -> ClampOutcome {
    if d.connected {
        outcome
    } else {
        ClampOutcome::Held {
            axis: outcome.axis(),
        }
    }
}

/// Unclamped integrator rates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ControllerRates {
    pub xa: Complex64,
    pub ua: Complex64,
    pub xdc: f64,
    pub xq: f64,
}

impl ControllerRates {
    pub fn new(params: &DerParameters, d: &DerivedQuantities) -> Self {
        let g = &params.gains;
        let s = &d.state;
        Self {
            xa: g.ki_gcc * s.ua,
            ua: g.wp * (-s.ua + d.ia_ref - s.ia),
            xdc: g.ki_dc * (d.vdc_ref - s.vdc),
            xq: -g.ki_q * (d.q_ref - d.s_pcc.im),
        }
    }
}

/// Outcome for every clamped axis at one evaluation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WindupDecisions {
    outcomes: [ClampOutcome; 6],
}

impl WindupDecisions {
    pub fn decide(params: &DerParameters, d: &DerivedQuantities, rates: &ControllerRates) -> Self {
        let s = &d.state;
        let duty_saturated = d.ma.norm() > params.duty_limit;
        let reference_saturated = d.i_cmd.norm() > params.iref_limit;
        Self {
            outcomes: [
                clamp(Axis::XaRe, duty_saturated, rates.xa.re, s.xa.re),
                clamp(Axis::XaIm, duty_saturated, rates.xa.im, s.xa.im),
                clamp(Axis::UaRe, duty_saturated, rates.ua.re, s.ua.re),
                clamp(Axis::UaIm, duty_saturated, rates.ua.im, s.ua.im),
                hold(d, clamp(Axis::Dc, reference_saturated, rates.xdc, s.xdc)),
                hold(d, clamp(Axis::Q, reference_saturated, rates.xq, s.xq)),
            ],
        }
    }

    pub fn outcome(&self, axis: Axis) -> ClampOutcome {
        self.outcomes[axis.slot()]
    }

    pub fn is_free(&self, axis: Axis) -> bool {
        self.outcome(axis).is_free()
    }

    /// `rate` when the axis integrates, zero when frozen.
    pub fn gate(&self, axis: Axis, rate: f64) -> f64 {
        if self.is_free(axis) { rate } else { 0.0 }
    }

    pub fn iter(&self) -> impl Iterator<Item = ClampOutcome> + '_ {
        self.outcomes.iter().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn free_when_not_saturated() {
        assert!(clamp(Axis::Dc, false, 1.0, 1.0).is_free());
    }

    #[test]
    fn frozen_only_when_pushing_outward() {
        assert_eq!(
            clamp(Axis::XaRe, true, 2.0, 0.5),
            ClampOutcome::Saturated { axis: Axis::XaRe }
        );
        assert!(clamp(Axis::XaRe, true, -2.0, 0.5).is_free());
        // sign(0) == sign(0)
        assert!(!clamp(Axis::Q, true, 0.0, 0.0).is_free());
        assert!(clamp(Axis::Q, true, 0.0, 1.0).is_free());
    }

    #[test]
    fn open_gate_holds_outer_loops() {
        let mut d = DerivedQuantities::default();
        let free = ClampOutcome::Free { axis: Axis::Dc };
        d.connected = true;
        assert_eq!(hold(&d, free), free);
        d.connected = false;
        let held = hold(&d, free);
        assert_eq!(held, ClampOutcome::Held { axis: Axis::Dc });
        assert!(!held.is_free());
        assert_eq!(held.axis(), Axis::Dc);
    }
}
