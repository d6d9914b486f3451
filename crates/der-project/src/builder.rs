//! Turns a validated scenario into a model, time grid and initial state.

use crate::ProjectResult;
use crate::schema::{GridSourceDef, InitialDef, PanelDef, RideThroughDef, Scenario, SimulationDef};
use der_core::units::{angular, hertz};
use der_model::{
    ConstantPower, ConstantSetpoints, DerModel, DerParameters, GridInputs, MeasuredGrid,
    NoRideThrough, PanelPower, Providers, RideThroughPolicy, SingleDiodeArray, StateVector,
    StiffGrid,
};
use tracing::debug;

pub fn build_model(scenario: &Scenario, name: impl Into<String>) -> ProjectResult<DerModel> {
    let params = DerParameters::from_config(&scenario.der)?;

    let panel: Box<dyn PanelPower> = match &scenario.panel {
        PanelDef::Constant { power_pu } => Box::new(ConstantPower { power: *power_pu }),
        PanelDef::SingleDiode(cfg) => Box::new(SingleDiodeArray::new(cfg, &params.bases)),
    };

    let w_grid = scenario
        .grid
        .frequency_hz
        .map_or(params.w_nominal, |f| angular(hertz(f)));
    let grid: Box<dyn GridInputs> = match &scenario.grid.source {
        GridSourceDef::StandAlone {
            vag,
            z_grid,
            z_load,
            events,
        } => {
            let mut grid = StiffGrid::new((*vag).into(), (*z_grid).into(), w_grid)
                .with_events(events.clone());
            if let Some(z) = z_load {
                grid = grid.with_load((*z).into());
            }
            Box::new(grid)
        }
        GridSourceDef::Measured { va } => Box::new(MeasuredGrid {
            va: (*va).into(),
            w_grid,
        }),
    };

    let vdc_ref = scenario
        .setpoints
        .vdc_ref_v
        .map_or(params.vdc_rated, |v| v / params.bases.vdcbase);
    let setpoints = ConstantSetpoints {
        q_ref: scenario.setpoints.q_ref_pu,
        vdc_ref,
    };

    let ride_through: Box<dyn RideThroughPolicy> = match &scenario.ride_through {
        RideThroughDef::None => Box::new(NoRideThrough),
        RideThroughDef::Threshold(policy) => Box::new(policy.clone()),
    };

    let name = name.into();
    debug!(model = %name, scenario = %scenario.name, "model built");
    Ok(DerModel::new(
        name,
        params,
        Providers {
            panel,
            grid,
            setpoints: Box::new(setpoints),
            ride_through,
        },
    ))
}

/// Output times from `t_start` to `t_end` every `dt_out`; the last point is
/// `t_end` even when the span is not a whole number of steps.
pub fn time_grid(sim: &SimulationDef) -> Vec<f64> {
    let span = sim.t_end - sim.t_start;
    let n = (span / sim.dt_out - 1e-9).ceil().max(1.0) as usize;
    let mut grid: Vec<f64> = (0..n)
        .map(|k| sim.t_start + k as f64 * sim.dt_out)
        .collect();
    grid.push(sim.t_end);
    grid
}

pub fn initial_state(scenario: &Scenario, model: &mut DerModel) -> ProjectResult<StateVector> {
    let t0 = scenario.simulation.t_start;
    let state = match &scenario.initial {
        InitialDef::Rest => model.rest_state(t0),
        InitialDef::SteadyState => model.steady_state(t0)?,
        InitialDef::Explicit { state } => StateVector::from_vector(state)?,
    };
    Ok(state)
}
