#![allow(dead_code)]

use der_model::{
    ConstantPower, ConstantSetpoints, DerConfig, DerModel, DerParameters, GridEvent,
    NoRideThrough, Providers, RideThroughPolicy, StiffGrid, ThresholdRideThrough,
};
use der_sim::SimulationSession;
use num_complex::Complex64;

pub const DT_OUT: f64 = 1.0 / 120.0;

pub fn grid(t_end: f64) -> Vec<f64> {
    let n = (t_end / DT_OUT).round() as usize;
    (0..=n).map(|k| k as f64 * DT_OUT).collect()
}

fn stiff_grid(p: &DerParameters) -> StiffGrid {
    StiffGrid::new(
        Complex64::new(1.0, 0.0),
        Complex64::new(0.01, 0.05),
        p.w_nominal,
    )
    .with_load(Complex64::new(10.0, 0.0))
}

fn build(
    session: &mut SimulationSession,
    grid: StiffGrid,
    ride_through: Box<dyn RideThroughPolicy>,
) -> DerModel {
    let p = DerParameters::from_config(&DerConfig::default()).unwrap();
    let vdc_ref = p.vdc_rated;
    let providers = Providers {
        panel: Box::new(ConstantPower { power: 0.5 }),
        grid: Box::new(grid),
        setpoints: Box::new(ConstantSetpoints {
            q_ref: 0.1,
            vdc_ref,
        }),
        ride_through,
    };
    DerModel::new(session.next_der_name(), p, providers)
}

/// 0.5 pu from the panel, 0.1 pu reactive setpoint, stiff 1 pu source.
pub fn stand_alone(session: &mut SimulationSession) -> DerModel {
    let p = DerParameters::from_config(&DerConfig::default()).unwrap();
    build(session, stiff_grid(&p), Box::new(NoRideThrough))
}

fn voltage_step(time: f64, voltage_scale: f64) -> GridEvent {
    GridEvent {
        time,
        voltage_scale,
        frequency_scale: 1.0,
    }
}

fn with_threshold_ride_through(
    session: &mut SimulationSession,
    events: Vec<GridEvent>,
) -> DerModel {
    let p = DerParameters::from_config(&DerConfig::default()).unwrap();
    let grid = stiff_grid(&p).with_events(events);
    build(session, grid, Box::new(ThresholdRideThrough::default()))
}

/// Same as `stand_alone`, with the source dropping to 0.3 pu at `t_sag`.
pub fn sagging(session: &mut SimulationSession, t_sag: f64) -> DerModel {
    with_threshold_ride_through(session, vec![voltage_step(t_sag, 0.3)])
}

/// 0.3 pu sag from `t_sag`, nominal source again from `t_recover`.
pub fn sag_and_recovery(session: &mut SimulationSession, t_sag: f64, t_recover: f64) -> DerModel {
    with_threshold_ride_through(
        session,
        vec![voltage_step(t_sag, 0.3), voltage_step(t_recover, 1.0)],
    )
}
