//! Single-phase inverter-coupled DER dynamics.
//!
//! The model owns an 11-element state (filter current, current-controller
//! states, DC link, outer-loop integrators and PLL), recomputes the derived
//! electrical quantities on every call and exposes:
//! - `derivatives`: the nonlinear state equations with anti-windup gating
//! - `jacobian`: their exact linearization, branch-consistent with `derivatives`
//! - `steady_state`: an equilibrium solve used for initialization
//!
//! External collaborators (PV panel, grid, setpoints, ride-through policy)
//! are injected as trait objects via [`Providers`].

pub mod derived;
pub mod dynamics;
pub mod error;
pub mod frame;
pub mod jacobian;
pub mod model;
pub mod params;
pub mod providers;
pub mod ride_through;
pub mod state;
pub mod steady_state;
pub mod windup;

pub use derived::{DerivedQuantities, StandAloneQuantities};
pub use error::{ModelError, ModelResult};
pub use jacobian::Partials;
pub use model::DerModel;
pub use params::{Bases, ControllerGains, ControllerLimits, DerConfig, DerParameters};
pub use providers::{
    ConstantPower, ConstantSetpoints, GridEvent, GridInputs, GridSource, InputSample,
    MeasuredGrid, PanelOutput, PanelPower, Providers, Setpoints, SingleDiodeArray,
    SingleDiodeConfig, StiffGrid,
};
pub use ride_through::{
    Band, FixedFlags, NoRideThrough, RideThroughFlags, RideThroughPolicy, ThresholdRideThrough,
};
pub use state::{N_STATES, StateVar, StateVector};
pub use windup::{Axis, ClampOutcome, WindupDecisions};
