//! Finite difference Jacobian computation.

use crate::error::SolverResult;
use der_core::CoreError;
use nalgebra::{DMatrix, DVector};

fn check_step(epsilon: f64) -> SolverResult<()> {
    if !(epsilon > 0.0 && epsilon.is_finite()) {
        return Err(CoreError::InvalidArg {
            what: "finite difference step must be positive",
        }
        .into());
    }
    Ok(())
}

fn check_len(v: &DVector<f64>, expected: usize) -> SolverResult<()> {
    if v.len() != expected {
        return Err(CoreError::LengthMismatch {
            what: "residual",
            expected,
            found: v.len(),
        }
        .into());
    }
    Ok(())
}

/// Compute Jacobian using forward finite differences.
///
/// For each column j, perturbs x[j] by epsilon*max(|x[j]|, 1) and computes
/// (f(x+e) - f(x))/dx. `f_x` may carry an already-evaluated f(x) to save a call.
pub fn finite_difference_jacobian<F>(
    x: &DVector<f64>,
    f_x: Option<&DVector<f64>>,
    mut f: F,
    epsilon: f64,
) -> SolverResult<DMatrix<f64>>
where
    F: FnMut(&DVector<f64>) -> SolverResult<DVector<f64>>,
{
    check_step(epsilon)?;
    let n = x.len();
    let f_x = match f_x {
        Some(v) => v.clone(),
        None => f(x)?,
    };
    let m = f_x.len();

    let mut jac = DMatrix::zeros(m, n);
    let mut x_perturbed = x.clone();

    for j in 0..n {
        let dx = epsilon * x[j].abs().max(1.0);
        x_perturbed[j] = x[j] + dx;

        let f_perturbed = f(&x_perturbed)?;
        check_len(&f_perturbed, m)?;
        jac.set_column(j, &((f_perturbed - &f_x) / dx));

        x_perturbed[j] = x[j];
    }

    Ok(jac)
}

/// Compute Jacobian using central finite differences (more accurate but 2x cost).
pub fn central_difference_jacobian<F>(
    x: &DVector<f64>,
    mut f: F,
    epsilon: f64,
) -> SolverResult<DMatrix<f64>>
where
    F: FnMut(&DVector<f64>) -> SolverResult<DVector<f64>>,
{
    check_step(epsilon)?;
    let n = x.len();
    let m = f(x)?.len();

    let mut jac = DMatrix::zeros(m, n);

    for j in 0..n {
        let dx = epsilon * x[j].abs().max(1.0);

        let mut x_plus = x.clone();
        x_plus[j] += dx;
        let f_plus = f(&x_plus)?;

        let mut x_minus = x.clone();
        x_minus[j] -= dx;
        let f_minus = f(&x_minus)?;
        check_len(&f_plus, m)?;
        check_len(&f_minus, m)?;

        jac.set_column(j, &((f_plus - f_minus) / (2.0 * dx)));
    }

    Ok(jac)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jacobian_linear() {
        // f(x) = 2*x, J = 2
        let f = |x: &DVector<f64>| -> SolverResult<DVector<f64>> {
            Ok(DVector::from_element(1, 2.0 * x[0]))
        };

        let x = DVector::from_element(1, 3.0);
        let jac = finite_difference_jacobian(&x, None, f, 1e-7).unwrap();

        assert!((jac[(0, 0)] - 2.0).abs() < 1e-5);
    }

    #[test]
    fn jacobian_reuses_supplied_value() {
        let mut calls = 0;
        let f = |x: &DVector<f64>| -> SolverResult<DVector<f64>> {
            calls += 1;
            Ok(DVector::from_vec(vec![x[0] * x[1], x[0] + x[1]]))
        };

        let x = DVector::from_vec(vec![2.0, 5.0]);
        let fx = DVector::from_vec(vec![10.0, 7.0]);
        let jac = finite_difference_jacobian(&x, Some(&fx), f, 1e-7).unwrap();

        assert_eq!(calls, 2);
        assert!((jac[(0, 0)] - 5.0).abs() < 1e-5);
        assert!((jac[(0, 1)] - 2.0).abs() < 1e-5);
        assert!((jac[(1, 0)] - 1.0).abs() < 1e-5);
    }

    #[test]
    fn central_jacobian_sine() {
        // f(x) = sin(x), J = cos(x)
        let f = |x: &DVector<f64>| -> SolverResult<DVector<f64>> {
            Ok(DVector::from_element(1, x[0].sin()))
        };

        let x = DVector::from_element(1, 0.7);
        let jac = central_difference_jacobian(&x, f, 1e-6).unwrap();

        assert!((jac[(0, 0)] - 0.7_f64.cos()).abs() < 1e-9);
    }

    #[test]
    fn residual_length_change_is_an_error() {
        let f = |x: &DVector<f64>| -> SolverResult<DVector<f64>> {
            Ok(DVector::from_element(if x[0] > 1.0 { 2 } else { 1 }, x[0]))
        };
        let x = DVector::from_element(1, 1.0);
        let err = finite_difference_jacobian(&x, None, f, 1e-3).unwrap_err();
        assert!(matches!(
            err,
            crate::SolverError::Core(CoreError::LengthMismatch { .. })
        ));
        assert!(finite_difference_jacobian(&x, None, f, 0.0).is_err());
    }
}
