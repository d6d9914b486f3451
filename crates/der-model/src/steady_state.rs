//! Equilibrium initialization.
//!
//! Solves the state equations for a locked PLL (`vd = 0`, `xPLL` fixed at
//! `w_grid - w_nominal`) with Newton on the analytic Jacobian. The angle
//! equation `dwte = we` has no equilibrium and is dropped; `wte` is solved
//! from the `xPLL` row instead.

use crate::error::{ModelError, ModelResult};
use crate::model::DerModel;
use crate::providers::GridSource;
use crate::state::{N_STATES, StateVar, StateVector};
use der_solver::{NewtonConfig, NonlinearSystem, SolverResult, newton_solve};
use nalgebra::{DMatrix, DVector};
use num_complex::Complex64;
use std::f64::consts::FRAC_PI_2;
use tracing::debug;

use crate::state::StateVar::*;

const UNKNOWNS: [StateVar; N_STATES - 1] = [IaRe, IaIm, XaRe, XaIm, UaRe, UaIm, Vdc, Xdc, Xq, Wte];
const EQUATIONS: [StateVar; N_STATES - 1] =
    [IaRe, IaIm, XaRe, XaIm, UaRe, UaIm, Vdc, Xdc, Xq, Xpll];

struct Equilibrium<'a> {
    model: &'a mut DerModel,
    t: f64,
    base: StateVector,
}

impl Equilibrium<'_> {
    fn state(&self, x: &DVector<f64>) -> StateVector {
        let mut v = self.base.to_vector();
        for (k, var) in UNKNOWNS.iter().enumerate() {
            v[var.index()] = x[k];
        }
        StateVector::from_array(v)
    }

    fn unknowns(state: &StateVector) -> DVector<f64> {
        DVector::from_iterator(UNKNOWNS.len(), UNKNOWNS.iter().map(|v| state.get(*v)))
    }
}

impl NonlinearSystem for Equilibrium<'_> {
    fn residual(&mut self, x: &DVector<f64>) -> SolverResult<DVector<f64>> {
        let state = self.state(x);
        let dx = self.model.derivatives_of(&state, self.t);
        Ok(DVector::from_iterator(
            EQUATIONS.len(),
            EQUATIONS.iter().map(|v| dx[v.index()]),
        ))
    }

    fn jacobian(&mut self, x: &DVector<f64>) -> SolverResult<DMatrix<f64>> {
        let state = self.state(x);
        let j = self.model.jacobian_of(&state, self.t);
        Ok(DMatrix::from_fn(EQUATIONS.len(), UNKNOWNS.len(), |r, c| {
            j[(EQUATIONS[r], UNKNOWNS[c])]
        }))
    }

    fn admissible(&self, x: &DVector<f64>) -> bool {
        let state = self.state(x);
        state.vdc > 0.0 && state.is_finite()
    }
}

impl DerModel {
    /// Operating point at time `t` with every controller settled.
    pub fn steady_state(&mut self, t: f64) -> ModelResult<StateVector> {
        let vdc_ref = self.providers().setpoints.vdc_ref(t);
        let inputs = self.providers().sample(t, vdc_ref);
        let params = self.params();

        let va = match inputs.source {
            GridSource::StandAlone { vag, .. } => vag / params.a,
            GridSource::Measured { va } => va,
        };
        if va.norm() == 0.0 || vdc_ref <= 0.0 {
            return Err(ModelError::InvalidParameter {
                what: "steady state needs a non-zero grid voltage and DC reference",
            });
        }

        let s = Complex64::new(inputs.panel.power, inputs.q_ref);
        let ia = (2.0 * s / va).conj();
        let guess = StateVector {
            ia,
            xa: 2.0 * va / vdc_ref,
            ua: Complex64::default(),
            vdc: vdc_ref,
            xdc: ia.re,
            xq: ia.im,
            xpll: inputs.w_grid - params.w_nominal,
            wte: inputs.w_grid * t + va.arg() + FRAC_PI_2,
        };

        let mut system = Equilibrium {
            model: self,
            t,
            base: guess,
        };
        let x0 = Equilibrium::unknowns(&guess);
        let result = newton_solve(&mut system, x0, &NewtonConfig::default())?;
        let state = system.state(&result.x);

        debug!(
            model = %self.name(),
            iterations = result.iterations,
            residual = result.residual_norm,
            "steady state found"
        );
        Ok(state)
    }
}
