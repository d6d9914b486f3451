//! Adaptive integration over a grid of output times.

use crate::error::{SimError, SimResult};
use crate::integrator::{AdaptiveStep, BogackiShampine, Evaluator, Method, Rosenbrock23};
use crate::model::OdeSystem;
use nalgebra::DVector;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Method code of an interval the integrator could not complete.
pub const FAILED_CODE: u8 = 0;

const SAFETY: f64 = 0.9;
const MIN_SHRINK: f64 = 0.2;
const MAX_GROWTH: f64 = 5.0;
/// Consecutive accepted steps with `h * ||J|| > STIFF_ENTER` before switching to the stiff method.
const STIFF_ENTER: f64 = 2.5;
const STIFF_ENTER_STEPS: usize = 5;
/// Consecutive accepted steps with `h * ||J|| < STIFF_EXIT` before switching back.
const STIFF_EXIT: f64 = 1.0;
const STIFF_EXIT_STEPS: usize = 20;

/// Options for integration runs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverOptions {
    /// Largest internal step (seconds)
    pub h_max: f64,
    /// Accepted internal steps allowed per output interval
    pub max_steps: usize,
    pub atol: f64,
    pub rtol: f64,
    /// Use the system's analytic Jacobian when it has one
    pub use_jacobian: bool,
    /// Report per-interval method codes and step sizes
    pub verbose: bool,
}

impl Default for SolverOptions {
    fn default() -> Self {
        Self {
            h_max: 1.0 / 120.0,
            max_steps: 1000,
            atol: 1e-4,
            rtol: 1e-4,
            use_jacobian: true,
            verbose: false,
        }
    }
}

impl SolverOptions {
    pub fn validate(&self) -> SimResult<()> {
        if !(self.h_max > 0.0 && self.h_max.is_finite()) {
            return Err(SimError::InvalidArg {
                what: "h_max must be positive",
            });
        }
        if self.max_steps == 0 {
            return Err(SimError::InvalidArg {
                what: "max_steps must be positive",
            });
        }
        if !(self.atol > 0.0 && self.rtol > 0.0) {
            return Err(SimError::InvalidArg {
                what: "tolerances must be positive",
            });
        }
        Ok(())
    }
}

/// Why an interval was abandoned.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IntervalFailure {
    StepBudget,
    StepSizeUnderflow,
}

/// Per-interval solver statistics, reported in verbose mode.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SolverDiagnostics {
    pub method_codes: Vec<u8>,
    /// Last accepted step size of each completed interval.
    pub step_sizes: Vec<f64>,
    pub nfev: usize,
    pub njev: usize,
    pub rejected: usize,
}

/// Raw integrator output.
#[derive(Clone, Debug)]
pub struct Integration {
    /// One state per completed grid point, starting with the initial state.
    pub trajectory: Vec<DVector<f64>>,
    /// Method code per interval; `FAILED_CODE` from the first abandoned one on.
    pub method_codes: Vec<u8>,
    pub step_sizes: Vec<f64>,
    /// Where integration stopped.
    pub stop_time: f64,
    pub stop_state: DVector<f64>,
    pub failure: Option<IntervalFailure>,
    pub nfev: usize,
    pub njev: usize,
    pub rejected: usize,
}

impl Integration {
    pub fn diagnostics(&self) -> SolverDiagnostics {
        SolverDiagnostics {
            method_codes: self.method_codes.clone(),
            step_sizes: self.step_sizes.clone(),
            nfev: self.nfev,
            njev: self.njev,
            rejected: self.rejected,
        }
    }
}

/// Index of the first interval whose method code marks a failure.
pub fn check_simulation(method_codes: &[u8]) -> Option<usize> {
    method_codes
        .iter()
        .position(|&code| code == FAILED_CODE || code > Method::Stiff.code())
}

fn error_norm(err: &DVector<f64>, y0: &DVector<f64>, y1: &DVector<f64>, atol: f64, rtol: f64) -> f64 {
    let sum: f64 = err
        .iter()
        .zip(y0.iter().zip(y1.iter()))
        .map(|(e, (a, b))| {
            let scale = atol + rtol * a.abs().max(b.abs());
            (e / scale).powi(2)
        })
        .sum();
    (sum / err.len() as f64).sqrt()
}

fn initial_step(y: &DVector<f64>, f0: &DVector<f64>, opts: &SolverOptions) -> f64 {
    let d0 = error_norm(y, y, y, opts.atol, opts.rtol);
    let d1 = error_norm(f0, y, y, opts.atol, opts.rtol);
    let h = if d0 < 1e-5 || d1 < 1e-5 {
        1e-6
    } else {
        0.01 * d0 / d1
    };
    h.min(opts.h_max)
}

fn validate_grid(grid: &[f64]) -> SimResult<()> {
    if grid.len() < 2 {
        return Err(SimError::InvalidArg {
            what: "time grid needs at least two points",
        });
    }
    if grid.iter().any(|t| !t.is_finite()) {
        return Err(SimError::InvalidArg {
            what: "time grid must be finite",
        });
    }
    if grid.windows(2).any(|w| w[1] <= w[0]) {
        return Err(SimError::InvalidArg {
            what: "time grid must be strictly increasing",
        });
    }
    Ok(())
}

/// Integrate `system` from `y0` at `grid[0]` through every grid point.
///
/// Solver trouble is not an error here: it shows up as `FAILED_CODE`
/// entries in `method_codes` (see [`check_simulation`]).
pub fn integrate<S: OdeSystem + ?Sized>(
    system: &mut S,
    y0: &DVector<f64>,
    grid: &[f64],
    opts: &SolverOptions,
) -> SimResult<Integration> {
    validate_grid(grid)?;
    opts.validate()?;
    if y0.len() != system.dimension() {
        return Err(SimError::InvalidArg {
            what: "initial state does not match system dimension",
        });
    }

    let mut ev = Evaluator::new(system, opts.use_jacobian);
    let mut t = grid[0];
    let mut y = y0.clone();
    let mut f0 = ev.f(t, &y)?;
    let mut h = initial_step(&y, &f0, opts);

    let mut method = Method::NonStiff;
    let mut switch_count = 0usize;
    let mut rejected = 0usize;

    let mut trajectory = Vec::with_capacity(grid.len());
    trajectory.push(y.clone());
    let mut method_codes = Vec::with_capacity(grid.len() - 1);
    let mut step_sizes = Vec::with_capacity(grid.len() - 1);
    let mut failure = None;

    for (k, &tout) in grid.iter().enumerate().skip(1) {
        let mut steps = 0usize;
        let mut last_h = 0.0;

        while t < tout {
            if steps >= opts.max_steps {
                failure = Some(IntervalFailure::StepBudget);
                break;
            }

            let remaining = tout - t;
            let landing = remaining <= h * (1.0 + 1e-8);
            let hh = if landing { remaining } else { h };
            if hh <= 16.0 * f64::EPSILON * t.abs().max(1.0) {
                failure = Some(IntervalFailure::StepSizeUnderflow);
                break;
            }

            let trial = match method {
                Method::NonStiff => BogackiShampine.attempt(&mut ev, t, &y, &f0, hh)?,
                Method::Stiff => Rosenbrock23.attempt(&mut ev, t, &y, &f0, hh)?,
            };
            let Some(trial) = trial else {
                h = 0.25 * hh;
                rejected += 1;
                continue;
            };

            let en = error_norm(&trial.error, &y, &trial.y, opts.atol, opts.rtol);
            if !en.is_finite() || trial.y.iter().any(|v| !v.is_finite()) {
                h = 0.25 * hh;
                rejected += 1;
                continue;
            }

            if en > 1.0 {
                h = hh * (SAFETY * en.powf(-1.0 / 3.0)).max(MIN_SHRINK);
                rejected += 1;
                continue;
            }

            t = if landing { tout } else { t + hh };
            y = trial.y;
            f0 = trial.f;
            steps += 1;
            last_h = hh;

            let fac = if en == 0.0 {
                MAX_GROWTH
            } else {
                (SAFETY * en.powf(-1.0 / 3.0)).clamp(MIN_SHRINK, MAX_GROWTH)
            };
            // A step shortened to land on tout says nothing about h itself.
            h = if hh < 0.999 * h && fac >= 1.0 {
                h.max((hh * fac).min(opts.h_max))
            } else {
                (hh * fac).min(opts.h_max)
            };

            match method {
                Method::NonStiff => {
                    switch_count = if trial.stiffness > STIFF_ENTER {
                        switch_count + 1
                    } else {
                        0
                    };
                    if switch_count >= STIFF_ENTER_STEPS {
                        debug!(t, h, "switching to stiff method");
                        method = Method::Stiff;
                        switch_count = 0;
                    }
                }
                Method::Stiff => {
                    switch_count = if trial.stiffness < STIFF_EXIT {
                        switch_count + 1
                    } else {
                        0
                    };
                    if switch_count >= STIFF_EXIT_STEPS {
                        debug!(t, h, "switching to non-stiff method");
                        method = Method::NonStiff;
                        switch_count = 0;
                    }
                }
            }
        }

        if let Some(reason) = failure {
            warn!(
                t,
                interval = k - 1,
                ?reason,
                steps,
                "integration abandoned"
            );
            method_codes.resize(grid.len() - 1, FAILED_CODE);
            break;
        }

        if opts.verbose {
            debug!(
                tout,
                code = method.code(),
                steps,
                last_h,
                "interval complete"
            );
        }
        method_codes.push(method.code());
        step_sizes.push(last_h);
        trajectory.push(y.clone());
    }

    Ok(Integration {
        trajectory,
        method_codes,
        step_sizes,
        stop_time: t,
        stop_state: y,
        failure,
        nfev: ev.nfev,
        njev: ev.njev,
        rejected,
    })
}
