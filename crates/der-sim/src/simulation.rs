//! A named simulation of one DER, with failure reporting.

use crate::driver::{SolverDiagnostics, SolverOptions, check_simulation, integrate};
use crate::error::{SimError, SimResult};
use crate::session::{FailureRecord, SimulationSession};
use der_model::{DerModel, DerivedQuantities, StateVector};
use nalgebra::DVector;
use tracing::{info, warn};

/// Result of a successful run.
#[derive(Clone, Debug)]
pub struct Trajectory {
    pub times: Vec<f64>,
    /// One state per grid point, starting with the initial state.
    pub states: Vec<StateVector>,
    pub converged: bool,
    /// Present in verbose mode.
    pub diagnostics: Option<SolverDiagnostics>,
}

impl Trajectory {
    pub fn final_state(&self) -> Option<&StateVector> {
        self.states.last()
    }

    pub fn iter(&self) -> impl Iterator<Item = (f64, &StateVector)> {
        self.times.iter().copied().zip(self.states.iter())
    }
}

pub struct Simulation {
    name: String,
    model: DerModel,
    options: SolverOptions,
}

impl Simulation {
    /// Takes the next `sim_N` name from `session`.
    pub fn new(session: &mut SimulationSession, model: DerModel, options: SolverOptions) -> Self {
        Self {
            name: session.next_simulation_name(),
            model,
            options,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn model(&self) -> &DerModel {
        &self.model
    }

    pub fn model_mut(&mut self) -> &mut DerModel {
        &mut self.model
    }

    pub fn into_model(self) -> DerModel {
        self.model
    }

    pub fn options(&self) -> &SolverOptions {
        &self.options
    }

    /// Integrate from `y0` at `grid[0]` through every grid point.
    ///
    /// On solver failure one record is appended to the session log and
    /// `SimError::SolverFailure` carries the state dump.
    pub fn run(
        &mut self,
        session: &mut SimulationSession,
        y0: &StateVector,
        grid: &[f64],
    ) -> SimResult<Trajectory> {
        let y = DVector::from_column_slice(&y0.to_vector());
        let out = integrate(&mut self.model, &y, grid, &self.options)?;

        if let Some(idx) = check_simulation(&out.method_codes) {
            let code = out.method_codes[idx];
            let stop = StateVector::from_vector(out.stop_state.as_slice())?;
            let derived = self.model.observe(&stop, out.stop_time);
            let message = self.failure_message(grid[idx], code, &derived);
            let record = FailureRecord {
                model: self.model.name().to_string(),
                simulation: self.name.clone(),
                failure_time: grid[idx],
                failure_code: code,
                s: derived.s * self.model.params().bases.sbase,
            };
            warn!(
                simulation = %self.name,
                model = %record.model,
                t = record.failure_time,
                code,
                reason = ?out.failure,
                "solver failure"
            );
            session.record_failure(record.clone());
            return Err(SimError::SolverFailure {
                message,
                record: Box::new(record),
            });
        }

        info!(
            simulation = %self.name,
            model = %self.model.name(),
            t_end = out.stop_time,
            nfev = out.nfev,
            njev = out.njev,
            rejected = out.rejected,
            "simulation complete"
        );

        let states = out
            .trajectory
            .iter()
            .map(|y| StateVector::from_vector(y.as_slice()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Trajectory {
            times: grid.to_vec(),
            states,
            converged: true,
            diagnostics: self.options.verbose.then(|| out.diagnostics()),
        })
    }

    fn failure_message(&self, t: f64, code: u8, d: &DerivedQuantities) -> String {
        let b = &self.model.params().bases;
        format!(
            "{sim}:ODE solver failed at {t:.6} s for {model} with failure code:{code}!\n\
             ___States at failure___\n\
             Vdc:{vdc:.4},Vta:{vta:.4},Vpcca:{va:.4}\n\
             ia:{ia:.4}\n\
             Ppv:{ppv:.4},S:{s:.4},\n\
             ma:{ma:.4},xDC:{xdc:.4},xQ:{xq:.4}",
            sim = self.name,
            model = self.model.name(),
            vdc = d.state.vdc * b.vdcbase,
            vta = d.vta * b.vbase,
            va = d.va * b.vbase,
            ia = d.state.ia * b.ibase,
            ppv = d.ppv * b.sbase,
            s = d.s * b.sbase,
            ma = d.ma.norm(),
            xdc = d.state.xdc,
            xq = d.state.xq,
        )
    }
}
