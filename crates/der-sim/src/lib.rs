//! Time integration of DER dynamics.
//!
//! Provides:
//! - `OdeSystem`, the seam between models and integrators
//! - adaptive Bogacki-Shampine 3(2) and Rosenbrock 2(3) steps with automatic
//!   stiffness switching
//! - a driver with a per-interval step budget and per-interval method codes
//! - `SimulationSession` (failure log, instance naming) and `Simulation`,
//!   which turns solver failure into a diagnostic error

pub mod driver;
pub mod error;
pub mod integrator;
pub mod model;
pub mod session;
pub mod simulation;

pub use driver::{
    FAILED_CODE, Integration, IntervalFailure, SolverDiagnostics, SolverOptions, check_simulation,
    integrate,
};
pub use error::{SimError, SimResult};
pub use integrator::{AdaptiveStep, BogackiShampine, Method, Rosenbrock23, TrialStep};
pub use model::OdeSystem;
pub use session::{FailureRecord, SimulationSession};
pub use simulation::{Simulation, Trajectory};
