//! The 11-element DER state and its flat-vector form.

use crate::error::{ModelError, ModelResult};
use num_complex::Complex64;

pub const N_STATES: usize = 11;

/// Named position of each state in the flat vector.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StateVar {
    IaRe,
    IaIm,
    XaRe,
    XaIm,
    UaRe,
    UaIm,
    Vdc,
    Xdc,
    Xq,
    Xpll,
    Wte,
}

impl StateVar {
    pub const ALL: [StateVar; N_STATES] = [
        StateVar::IaRe,
        StateVar::IaIm,
        StateVar::XaRe,
        StateVar::XaIm,
        StateVar::UaRe,
        StateVar::UaIm,
        StateVar::Vdc,
        StateVar::Xdc,
        StateVar::Xq,
        StateVar::Xpll,
        StateVar::Wte,
    ];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            StateVar::IaRe => "iaR",
            StateVar::IaIm => "iaI",
            StateVar::XaRe => "xaR",
            StateVar::XaIm => "xaI",
            StateVar::UaRe => "uaR",
            StateVar::UaIm => "uaI",
            StateVar::Vdc => "Vdc",
            StateVar::Xdc => "xDC",
            StateVar::Xq => "xQ",
            StateVar::Xpll => "xPLL",
            StateVar::Wte => "wte",
        }
    }
}

/// Instantaneous DER state, all quantities per-unit except `xpll` (rad/s)
/// and `wte` (rad).
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct StateVector {
    /// Inverter filter current.
    pub ia: Complex64,
    /// Current-controller integrator.
    pub xa: Complex64,
    /// Current-controller filter state.
    pub ua: Complex64,
    /// DC-link voltage.
    pub vdc: f64,
    /// DC-link voltage controller integrator.
    pub xdc: f64,
    /// Reactive power controller integrator.
    pub xq: f64,
    /// PLL frequency correction.
    pub xpll: f64,
    /// PLL angle, unbounded.
    pub wte: f64,
}

impl StateVector {
    pub fn to_vector(&self) -> [f64; N_STATES] {
        [
            self.ia.re,
            self.ia.im,
            self.xa.re,
            self.xa.im,
            self.ua.re,
            self.ua.im,
            self.vdc,
            self.xdc,
            self.xq,
            self.xpll,
            self.wte,
        ]
    }

    pub fn from_vector(values: &[f64]) -> ModelResult<Self> {
        let v: [f64; N_STATES] = values
            .try_into()
            .map_err(|_| ModelError::MalformedState {
                expected: N_STATES,
                found: values.len(),
            })?;
        Ok(Self::from_array(v))
    }

    pub fn from_array(v: [f64; N_STATES]) -> Self {
        Self {
            ia: Complex64::new(v[0], v[1]),
            xa: Complex64::new(v[2], v[3]),
            ua: Complex64::new(v[4], v[5]),
            vdc: v[6],
            xdc: v[7],
            xq: v[8],
            xpll: v[9],
            wte: v[10],
        }
    }

    pub fn get(&self, var: StateVar) -> f64 {
        self.to_vector()[var.index()]
    }

    pub fn is_finite(&self) -> bool {
        self.to_vector().iter().all(|v| v.is_finite())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_order_matches_state_var() {
        let values: Vec<f64> = (0..N_STATES).map(|i| i as f64 + 0.5).collect();
        let state = StateVector::from_vector(&values).unwrap();
        for var in StateVar::ALL {
            assert_eq!(state.get(var), values[var.index()], "{}", var.name());
        }
        assert_eq!(state.to_vector().to_vec(), values);
    }

    #[test]
    fn wrong_arity_is_rejected() {
        let err = StateVector::from_vector(&[1.0; 10]).unwrap_err();
        assert!(matches!(
            err,
            ModelError::MalformedState {
                expected: 11,
                found: 10
            }
        ));
        assert!(StateVector::from_vector(&[0.0; 12]).is_err());
    }
}
