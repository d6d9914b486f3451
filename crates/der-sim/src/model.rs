//! OdeSystem trait for pluggable dynamic systems.

use crate::error::SimResult;
use der_model::{DerModel, N_STATES};
use nalgebra::{DMatrix, DVector};

/// A system `dy/dt = f(t, y)` the driver can integrate.
///
/// Takes `&mut self` so implementations may cache per-call intermediates.
pub trait OdeSystem {
    fn dimension(&self) -> usize;

    fn rhs(&mut self, t: f64, y: &DVector<f64>) -> SimResult<DVector<f64>>;

    /// Analytic `df/dy`, or `None` to let the driver difference `rhs`.
    fn rhs_jacobian(&mut self, _t: f64, _y: &DVector<f64>) -> SimResult<Option<DMatrix<f64>>> {
        Ok(None)
    }
}

impl OdeSystem for DerModel {
    fn dimension(&self) -> usize {
        N_STATES
    }

    fn rhs(&mut self, t: f64, y: &DVector<f64>) -> SimResult<DVector<f64>> {
        let dx = self.derivatives(y.as_slice(), t)?;
        Ok(DVector::from_column_slice(&dx))
    }

    fn rhs_jacobian(&mut self, t: f64, y: &DVector<f64>) -> SimResult<Option<DMatrix<f64>>> {
        Ok(Some(self.jacobian(y.as_slice(), t)?.into_matrix()))
    }
}
