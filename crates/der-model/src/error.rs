//! Error types for model construction and evaluation.

use der_core::CoreError;
use der_solver::SolverError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Malformed state vector: expected {expected} values, found {found}")]
    MalformedState { expected: usize, found: usize },

    #[error("Invalid parameter: {what}")]
    InvalidParameter { what: &'static str },

    #[error("Steady-state initialization failed: {0}")]
    SteadyState(#[from] SolverError),

    #[error(transparent)]
    Core(#[from] CoreError),
}

pub type ModelResult<T> = Result<T, ModelError>;
