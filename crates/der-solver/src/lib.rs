//! Dense numerical building blocks shared by the DER model and simulator.
//!
//! Provides finite-difference Jacobians (used as a fallback when no analytic
//! Jacobian is available and to verify analytic ones) and a damped Newton
//! solver for square nonlinear systems.

pub mod error;
pub mod jacobian;
pub mod newton;

pub use error::{SolverError, SolverResult};
pub use jacobian::{central_difference_jacobian, finite_difference_jacobian};
pub use newton::{NewtonConfig, NewtonResult, NonlinearSystem, newton_solve};
