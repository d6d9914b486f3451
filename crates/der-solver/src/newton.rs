//! Damped Newton solver with an admissibility constraint.

use crate::error::{SolverError, SolverResult};
use nalgebra::{DMatrix, DVector};
use tracing::debug;

/// A square nonlinear system F(x) = 0 with an analytic Jacobian.
pub trait NonlinearSystem {
    fn residual(&mut self, x: &DVector<f64>) -> SolverResult<DVector<f64>>;

    fn jacobian(&mut self, x: &DVector<f64>) -> SolverResult<DMatrix<f64>>;

    /// Reject iterates outside the physical domain (line search backtracks).
    fn admissible(&self, _x: &DVector<f64>) -> bool {
        true
    }
}

/// Newton solver configuration.
#[derive(Clone, Debug)]
pub struct NewtonConfig {
    /// Maximum iterations
    pub max_iterations: usize,
    /// Absolute tolerance for residual norm
    pub abs_tol: f64,
    /// Relative tolerance for residual norm
    pub rel_tol: f64,
    /// Line search backtracking factor
    pub line_search_beta: f64,
    /// Maximum line search iterations
    pub max_line_search_iters: usize,
}

impl Default for NewtonConfig {
    fn default() -> Self {
        Self {
            max_iterations: 50,
            abs_tol: 1e-10,
            rel_tol: 1e-12,
            line_search_beta: 0.5,
            max_line_search_iters: 20,
        }
    }
}

/// Newton iteration result.
#[derive(Clone, Debug)]
pub struct NewtonResult {
    pub x: DVector<f64>,
    pub residual_norm: f64,
    pub iterations: usize,
    pub converged: bool,
}

/// Newton solver with backtracking line search.
pub fn newton_solve<S: NonlinearSystem>(
    system: &mut S,
    x0: DVector<f64>,
    config: &NewtonConfig,
) -> SolverResult<NewtonResult> {
    if !system.admissible(&x0) {
        return Err(SolverError::ProblemSetup {
            what: "initial guess is not admissible".to_string(),
        });
    }

    let mut x = x0;
    let mut r = system.residual(&x)?;
    let mut r_norm = r.norm();
    let r0_norm = r_norm;

    for iter in 0..config.max_iterations {
        debug!(iter, residual = r_norm, "newton iteration");
        if r_norm < config.abs_tol || r_norm < config.rel_tol * r0_norm {
            return Ok(NewtonResult {
                x,
                residual_norm: r_norm,
                iterations: iter,
                converged: true,
            });
        }

        let jac = system.jacobian(&x)?;

        // Solve J * dx = -r
        let dx = jac.lu().solve(&(-&r)).ok_or_else(|| SolverError::Numeric {
            what: "Jacobian solve failed".to_string(),
        })?;

        let mut alpha = 1.0;
        let mut x_new = &x + alpha * &dx;
        let mut r_new = system.residual(&x_new)?;
        let mut r_new_norm = r_new.norm();

        for _ in 0..config.max_line_search_iters {
            if system.admissible(&x_new) && r_new_norm < r_norm {
                break;
            }

            alpha *= config.line_search_beta;
            x_new = &x + alpha * &dx;
            r_new = system.residual(&x_new)?;
            r_new_norm = r_new.norm();
        }

        if !system.admissible(&x_new) || !r_new_norm.is_finite() {
            return Err(SolverError::ConvergenceFailed {
                what: format!("No admissible step at iteration {}", iter),
            });
        }

        x = x_new;
        r = r_new;
        r_norm = r_new_norm;

        if alpha < 1e-10 {
            return Err(SolverError::ConvergenceFailed {
                what: format!("Line search stagnated at iteration {}", iter),
            });
        }
    }

    Err(SolverError::ConvergenceFailed {
        what: format!(
            "Maximum iterations {} reached, residual = {}",
            config.max_iterations, r_norm
        ),
    })
}
