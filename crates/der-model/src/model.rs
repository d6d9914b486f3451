//! The DER model: parameters, injected collaborators and the per-call
//! derived-quantity cache.

use crate::derived::DerivedQuantities;
use crate::dynamics;
use crate::error::ModelResult;
use crate::jacobian::{self, Partials};
use crate::params::DerParameters;
use crate::providers::Providers;
use crate::state::{N_STATES, StateVector};
use crate::windup::{ControllerRates, WindupDecisions};
use std::f64::consts::TAU;
use tracing::debug;

/// Single-phase DER.
///
/// Evaluation methods take `&mut self`: the derived-quantity cache is
/// overwritten on every call and is not reentrant.
pub struct DerModel {
    name: String,
    params: DerParameters,
    providers: Providers,
    derived: DerivedQuantities,
    connected: bool,
    disconnect_count: u64,
}

impl DerModel {
    pub fn new(name: impl Into<String>, params: DerParameters, providers: Providers) -> Self {
        Self {
            name: name.into(),
            params,
            providers,
            derived: DerivedQuantities::default(),
            connected: true,
            disconnect_count: 0,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn params(&self) -> &DerParameters {
        &self.params
    }

    pub fn providers(&self) -> &Providers {
        &self.providers
    }

    /// Derived quantities of the most recent evaluation.
    pub fn derived(&self) -> &DerivedQuantities {
        &self.derived
    }

    /// Connection state seen by the most recent evaluation.
    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Number of `disconnect` calls over the model's lifetime.
    pub fn disconnect_count(&self) -> u64 {
        self.disconnect_count
    }

    /// Open the ride-through gate for the current evaluation.
    ///
    /// Injected current, terminal voltage, panel power and the current
    /// reference are zero until the next evaluation re-closes the gate.
    pub fn disconnect(&mut self) {
        self.connected = false;
        self.disconnect_count += 1;
    }

    /// Refresh the cache for (state, t), applying the ride-through gate.
    fn evaluate(&mut self, state: &StateVector, t: f64) -> (ControllerRates, WindupDecisions) {
        let inputs = self.providers.sample(t, state.vdc);

        let was_connected = self.connected;
        self.connected = true;
        self.derived
            .refresh(&self.params, &inputs, state, t, self.connected);

        let flags = self.providers.ride_through.trip_flags(
            t,
            self.derived.voltage_pu(&self.params),
            self.derived.w_grid / self.params.w_nominal,
        );
        if flags.disconnect_required() {
            if was_connected {
                debug!(model = %self.name, t, ?flags, "ride-through gate opened");
            }
            self.disconnect();
            self.derived
                .refresh(&self.params, &inputs, state, t, self.connected);
        } else if !was_connected {
            debug!(model = %self.name, t, "ride-through gate closed");
        }
        self.derived.flags = flags;

        let rates = ControllerRates::new(&self.params, &self.derived);
        let decisions = WindupDecisions::decide(&self.params, &self.derived, &rates);
        (rates, decisions)
    }

    pub fn derivatives(&mut self, y: &[f64], t: f64) -> ModelResult<[f64; N_STATES]> {
        let state = StateVector::from_vector(y)?;
        Ok(self.derivatives_of(&state, t))
    }

    pub fn derivatives_of(&mut self, state: &StateVector, t: f64) -> [f64; N_STATES] {
        let (rates, decisions) = self.evaluate(state, t);
        dynamics::derivatives(&self.params, &self.derived, &rates, &decisions)
    }

    pub fn jacobian(&mut self, y: &[f64], t: f64) -> ModelResult<Partials> {
        let state = StateVector::from_vector(y)?;
        Ok(self.jacobian_of(&state, t))
    }

    pub fn jacobian_of(&mut self, state: &StateVector, t: f64) -> Partials {
        let (_, decisions) = self.evaluate(state, t);
        jacobian::jacobian(&self.params, &self.derived, &decisions)
    }

    /// Anti-windup outcome the state equations would use at (state, t).
    pub fn windup_decisions(&mut self, state: &StateVector, t: f64) -> WindupDecisions {
        self.evaluate(state, t).1
    }

    /// Derived quantities at (state, t), for reporting.
    pub fn observe(&mut self, state: &StateVector, t: f64) -> DerivedQuantities {
        self.evaluate(state, t);
        self.derived.clone()
    }

    /// Controllers at rest, DC link at its reference and zero current.
    pub fn rest_state(&self, t: f64) -> StateVector {
        StateVector {
            vdc: self.providers.setpoints.vdc_ref(t),
            wte: TAU,
            ..StateVector::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::DerConfig;
    use crate::providers::{ConstantPower, ConstantSetpoints, StiffGrid};
    use crate::ride_through::{FixedFlags, RideThroughFlags};
    use num_complex::Complex64;

    fn model(flags: RideThroughFlags) -> DerModel {
        let params = DerParameters::from_config(&DerConfig::default()).unwrap();
        let w0 = params.w_nominal;
        let vdc_ref = params.vdc_rated;
        DerModel::new(
            "DER_1",
            params,
            Providers {
                panel: Box::new(ConstantPower { power: 0.5 }),
                grid: Box::new(StiffGrid::new(
                    Complex64::new(1.0, 0.0),
                    Complex64::new(0.01, 0.05),
                    w0,
                )),
                setpoints: Box::new(ConstantSetpoints { q_ref: 0.1, vdc_ref }),
                ride_through: Box::new(FixedFlags(flags)),
            },
        )
    }

    #[test]
    fn malformed_state_is_rejected() {
        let mut m = model(RideThroughFlags::default());
        assert!(m.derivatives(&[0.0; 3], 0.0).is_err());
        assert!(m.jacobian(&[0.0; 12], 0.0).is_err());
    }

    #[test]
    fn gate_is_level_triggered() {
        let tripped = RideThroughFlags {
            frequency_trip: true,
            ..RideThroughFlags::default()
        };
        let mut m = model(tripped);
        let y = m.rest_state(0.0);
        m.derivatives_of(&y, 0.0);
        m.derivatives_of(&y, 0.0);
        assert_eq!(m.disconnect_count(), 2);
        assert!(!m.is_connected());

        let mut healthy = model(RideThroughFlags::default());
        healthy.derivatives_of(&y, 0.0);
        assert_eq!(healthy.disconnect_count(), 0);
        assert!(healthy.is_connected());
    }

    #[test]
    fn rest_state_sits_at_dc_reference() {
        let m = model(RideThroughFlags::default());
        let y = m.rest_state(0.0);
        assert_eq!(y.vdc, m.params().vdc_rated);
        assert_eq!(y.ia, Complex64::default());
        assert_eq!(y.wte, TAU);
    }
}
