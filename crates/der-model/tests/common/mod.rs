#![allow(dead_code)]

use der_model::{
    ConstantPower, ConstantSetpoints, DerConfig, DerModel, DerParameters, FixedFlags,
    GridInputs, MeasuredGrid, PanelPower, Providers, RideThroughFlags, SingleDiodeArray,
    SingleDiodeConfig, StiffGrid,
};
use num_complex::Complex64;

pub const T_EVAL: f64 = 0.013;

pub const NOMINAL: [f64; 11] = [0.9, -0.2, 0.95, 0.05, 0.01, -0.02, 2.05, 0.9, 0.1, 1.0, 2.3];
pub const DUTY_SATURATED: [f64; 11] = [0.2, -0.2, 9.8, 1.0, 1.0, 0.5, 2.05, 3.0, 2.0, 1.0, 2.3];
pub const REFERENCE_SATURATED: [f64; 11] =
    [0.9, 0.0, 0.95, 0.05, 0.01, -0.02, 2.0, -4.0, -1.0, 1.0, 2.3];
pub const DC_AXIS_SATURATED: [f64; 11] =
    [0.9, -0.2, 0.95, 0.05, 0.01, -0.02, 2.0, -4.0, -1.0, 1.0, 2.3];
pub const UA_RE_RELEASED: [f64; 11] = [0.2, -0.2, 9.8, 1.0, 1.0, 0.5, 2.05, 0.9, 2.0, 1.0, 2.3];

pub fn params() -> DerParameters {
    DerParameters::from_config(&DerConfig::default()).unwrap()
}

pub fn stiff_grid(p: &DerParameters) -> StiffGrid {
    StiffGrid::new(
        Complex64::new(1.0, 0.0),
        Complex64::new(0.01, 0.05),
        p.w_nominal,
    )
    .with_load(Complex64::new(10.0, 0.0))
}

pub fn build(
    grid: impl FnOnce(&DerParameters) -> Box<dyn GridInputs>,
    panel: impl FnOnce(&DerParameters) -> Box<dyn PanelPower>,
    flags: RideThroughFlags,
) -> DerModel {
    let p = params();
    let vdc_ref = p.vdc_rated;
    let providers = Providers {
        panel: panel(&p),
        grid: grid(&p),
        setpoints: Box::new(ConstantSetpoints {
            q_ref: 0.1,
            vdc_ref,
        }),
        ride_through: Box::new(FixedFlags(flags)),
    };
    DerModel::new("DER_test", p, providers)
}

pub fn constant_panel(_: &DerParameters) -> Box<dyn PanelPower> {
    Box::new(ConstantPower { power: 0.5 })
}

pub fn diode_panel(p: &DerParameters) -> Box<dyn PanelPower> {
    Box::new(SingleDiodeArray::new(&SingleDiodeConfig::default(), &p.bases))
}

pub fn stand_alone_model() -> DerModel {
    build(|p| Box::new(stiff_grid(p)), constant_panel, RideThroughFlags::default())
}

pub fn no_load_model() -> DerModel {
    build(
        |p| {
            Box::new(StiffGrid::new(
                Complex64::new(1.0, 0.0),
                Complex64::new(0.01, 0.05),
                p.w_nominal,
            ))
        },
        constant_panel,
        RideThroughFlags::default(),
    )
}

pub fn diode_model() -> DerModel {
    build(|p| Box::new(stiff_grid(p)), diode_panel, RideThroughFlags::default())
}

pub fn measured_model(va: Complex64) -> DerModel {
    build(
        move |p| {
            Box::new(MeasuredGrid {
                va,
                w_grid: p.w_nominal,
            })
        },
        constant_panel,
        RideThroughFlags::default(),
    )
}

pub fn tripped_model() -> DerModel {
    build(
        |p| Box::new(stiff_grid(p)),
        constant_panel,
        RideThroughFlags {
            voltage_trip: true,
            ..RideThroughFlags::default()
        },
    )
}
