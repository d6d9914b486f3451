//! Single adaptive step attempts.
//!
//! Each method proposes a step of size `h` from `(t, y)` together with a
//! local error estimate; the driver decides acceptance and the next `h`.

use crate::error::{SimError, SimResult};
use crate::model::OdeSystem;
use der_solver::{SolverError, finite_difference_jacobian};
use nalgebra::{DMatrix, DVector};

/// Integration method; the code is what the driver reports per interval.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Method {
    NonStiff,
    Stiff,
}

impl Method {
    pub fn code(self) -> u8 {
        match self {
            Method::NonStiff => 1,
            Method::Stiff => 2,
        }
    }
}

/// Counts evaluations and picks analytic or differenced Jacobians.
pub struct Evaluator<'a, S: OdeSystem + ?Sized> {
    system: &'a mut S,
    use_jacobian: bool,
    pub nfev: usize,
    pub njev: usize,
}

impl<'a, S: OdeSystem + ?Sized> Evaluator<'a, S> {
    pub fn new(system: &'a mut S, use_jacobian: bool) -> Self {
        Self {
            system,
            use_jacobian,
            nfev: 0,
            njev: 0,
        }
    }

    pub fn f(&mut self, t: f64, y: &DVector<f64>) -> SimResult<DVector<f64>> {
        self.nfev += 1;
        self.system.rhs(t, y)
    }

    /// `df/dy` at (t, y). `fy` is f(t, y) when the caller already has it.
    pub fn jacobian(
        &mut self,
        t: f64,
        y: &DVector<f64>,
        fy: Option<&DVector<f64>>,
    ) -> SimResult<DMatrix<f64>> {
        self.njev += 1;
        if self.use_jacobian {
            if let Some(j) = self.system.rhs_jacobian(t, y)? {
                return Ok(j);
            }
        }

        let system = &mut *self.system;
        let mut calls = 0;
        let j = finite_difference_jacobian(
            y,
            fy,
            |x| {
                calls += 1;
                system.rhs(t, x).map_err(|e| SolverError::Evaluation {
                    message: e.to_string(),
                })
            },
            f64::EPSILON.sqrt(),
        )
        .map_err(SimError::from)?;
        self.nfev += calls;
        Ok(j)
    }
}

/// Max absolute row sum.
pub fn inf_norm(m: &DMatrix<f64>) -> f64 {
    m.row_iter()
        .map(|r| r.iter().map(|v| v.abs()).sum::<f64>())
        .fold(0.0, f64::max)
}

/// Proposed step.
#[derive(Clone, Debug)]
pub struct TrialStep {
    pub y: DVector<f64>,
    /// f(t + h, y)
    pub f: DVector<f64>,
    pub error: DVector<f64>,
    /// `h * ||J||_inf`, used for method switching.
    pub stiffness: f64,
}

pub trait AdaptiveStep {
    const METHOD: Method;

    /// Returns `None` when the step cannot be formed at this `h`
    /// (singular iteration matrix).
    fn attempt<S: OdeSystem + ?Sized>(
        &self,
        ev: &mut Evaluator<'_, S>,
        t: f64,
        y: &DVector<f64>,
        f0: &DVector<f64>,
        h: f64,
    ) -> SimResult<Option<TrialStep>>;
}

/// Explicit Bogacki-Shampine 3(2), first-same-as-last.
#[derive(Clone, Debug)]
pub struct BogackiShampine;

impl AdaptiveStep for BogackiShampine {
    const METHOD: Method = Method::NonStiff;

    fn attempt<S: OdeSystem + ?Sized>(
        &self,
        ev: &mut Evaluator<'_, S>,
        t: f64,
        y: &DVector<f64>,
        f0: &DVector<f64>,
        h: f64,
    ) -> SimResult<Option<TrialStep>> {
        let k1 = f0;
        let k2 = ev.f(t + 0.5 * h, &(y + k1 * (0.5 * h)))?;
        let k3 = ev.f(t + 0.75 * h, &(y + &k2 * (0.75 * h)))?;
        let y_new = y + (k1 * (2.0 / 9.0) + &k2 * (1.0 / 3.0) + &k3 * (4.0 / 9.0)) * h;
        let k4 = ev.f(t + h, &y_new)?;

        let error = (k1 * (-5.0 / 72.0) + &k2 * (1.0 / 12.0) + &k3 * (1.0 / 9.0)
            - &k4 * (1.0 / 8.0))
            * h;

        let jac = ev.jacobian(t + h, &y_new, Some(&k4))?;

        Ok(Some(TrialStep {
            y: y_new,
            f: k4,
            error,
            stiffness: h * inf_norm(&jac),
        }))
    }
}

/// Linearly implicit Rosenbrock 2(3) (Shampine & Reichelt), L-stable.
#[derive(Clone, Debug)]
pub struct Rosenbrock23;

impl AdaptiveStep for Rosenbrock23 {
    const METHOD: Method = Method::Stiff;

    fn attempt<S: OdeSystem + ?Sized>(
        &self,
        ev: &mut Evaluator<'_, S>,
        t: f64,
        y: &DVector<f64>,
        f0: &DVector<f64>,
        h: f64,
    ) -> SimResult<Option<TrialStep>> {
        let d = 1.0 / (2.0 + std::f64::consts::SQRT_2);
        let e32 = 6.0 + std::f64::consts::SQRT_2;
        let n = y.len();

        let jac = ev.jacobian(t, y, Some(f0))?;

        // df/dt
        let dt = f64::EPSILON.sqrt() * t.abs().max(h);
        let f_dt = ev.f(t + dt, y)?;
        let dfdt = (f_dt - f0) / dt;

        let w = DMatrix::<f64>::identity(n, n) - &jac * (h * d);
        let lu = w.lu();

        let Some(k1) = lu.solve(&(f0 + &dfdt * (h * d))) else {
            return Ok(None);
        };
        let f1 = ev.f(t + 0.5 * h, &(y + &k1 * (0.5 * h)))?;
        let Some(r2) = lu.solve(&(&f1 - &k1)) else {
            return Ok(None);
        };
        let k2 = r2 + &k1;
        let y_new = y + &k2 * h;
        let f2 = ev.f(t + h, &y_new)?;
        let rhs3 = &f2 - (&k2 - &f1) * e32 - (&k1 - f0) * 2.0 + &dfdt * (h * d);
        let Some(k3) = lu.solve(&rhs3) else {
            return Ok(None);
        };

        let error = (&k1 - &k2 * 2.0 + k3) * (h / 6.0);

        Ok(Some(TrialStep {
            y: y_new,
            f: f2,
            error,
            stiffness: h * inf_norm(&jac),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Decay(f64);

    impl OdeSystem for Decay {
        fn dimension(&self) -> usize {
            1
        }

        fn rhs(&mut self, _t: f64, y: &DVector<f64>) -> SimResult<DVector<f64>> {
            Ok(y * -self.0)
        }

        fn rhs_jacobian(&mut self, _t: f64, _y: &DVector<f64>) -> SimResult<Option<DMatrix<f64>>> {
            Ok(Some(DMatrix::from_element(1, 1, -self.0)))
        }
    }

    fn one_step<M: AdaptiveStep>(method: M, lambda: f64, h: f64, use_jacobian: bool) -> TrialStep {
        let mut sys = Decay(lambda);
        let mut ev = Evaluator::new(&mut sys, use_jacobian);
        let y = DVector::from_element(1, 1.0);
        let f0 = ev.f(0.0, &y).unwrap();
        method.attempt(&mut ev, 0.0, &y, &f0, h).unwrap().unwrap()
    }

    #[test]
    fn bogacki_shampine_is_third_order() {
        let step = one_step(BogackiShampine, 1.0, 0.01, true);
        assert!((step.y[0] - (-0.01f64).exp()).abs() < 1e-8);
        assert!(step.error[0].abs() < 1e-6);
        assert!((step.stiffness - 0.01).abs() < 1e-12);
    }

    #[test]
    fn rosenbrock_is_stable_on_stiff_decay() {
        // h * lambda = 100: explicit methods blow up, Rosenbrock decays.
        let step = one_step(Rosenbrock23, 1e4, 0.01, true);
        assert!(step.y[0].abs() < 1.0);
        assert!((step.stiffness - 100.0).abs() < 1e-9);
    }

    #[test]
    fn differenced_jacobian_matches_analytic() {
        let analytic = one_step(Rosenbrock23, 3.0, 0.05, true);
        let differenced = one_step(Rosenbrock23, 3.0, 0.05, false);
        assert!((analytic.y[0] - differenced.y[0]).abs() < 1e-6);
    }

    #[test]
    fn method_codes() {
        assert_eq!(BogackiShampine::METHOD.code(), 1);
        assert_eq!(Rosenbrock23::METHOD.code(), 2);
    }
}
