//! Error types for simulation operations.

use crate::session::FailureRecord;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SimError {
    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    /// The integrator gave up; `message` is the full diagnostic dump.
    #[error("{message}")]
    SolverFailure {
        message: String,
        record: Box<FailureRecord>,
    },

    #[error("Model error: {0}")]
    Model(#[from] der_model::ModelError),

    #[error("Backend error: {message}")]
    Backend { message: String },
}

pub type SimResult<T> = Result<T, SimError>;

impl From<der_solver::SolverError> for SimError {
    fn from(e: der_solver::SolverError) -> Self {
        SimError::Backend {
            message: e.to_string(),
        }
    }
}
