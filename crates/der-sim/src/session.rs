//! Run-scoped bookkeeping: instance naming and the solver failure log.

use der_core::{DerId, Id, SimId};
use num_complex::Complex64;
use serde::{Deserialize, Serialize};

/// One integrator failure, as appended to the session log.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FailureRecord {
    pub model: String,
    pub simulation: String,
    /// Output time at which the failing interval starts (seconds).
    pub failure_time: f64,
    pub failure_code: u8,
    /// Inverter terminal power at the stop point (VA).
    pub s: Complex64,
}

/// Owns everything that outlives a single simulation.
#[derive(Debug, Default)]
pub struct SimulationSession {
    failures: Vec<FailureRecord>,
    der_count: u32,
    sim_count: u32,
}

impl SimulationSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_der_id(&mut self) -> DerId {
        let id = Id::from_index(self.der_count);
        self.der_count += 1;
        id
    }

    pub fn next_simulation_id(&mut self) -> SimId {
        let id = Id::from_index(self.sim_count);
        self.sim_count += 1;
        id
    }

    /// `DER_1`, `DER_2`, ...
    pub fn next_der_name(&mut self) -> String {
        format!("DER_{}", self.next_der_id().ordinal())
    }

    /// `sim_1`, `sim_2`, ...
    pub fn next_simulation_name(&mut self) -> String {
        format!("sim_{}", self.next_simulation_id().ordinal())
    }

    pub fn record_failure(&mut self, record: FailureRecord) {
        self.failures.push(record);
    }

    pub fn failures(&self) -> &[FailureRecord] {
        &self.failures
    }

    pub fn der_count(&self) -> u32 {
        self.der_count
    }

    pub fn simulation_count(&self) -> u32 {
        self.sim_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_count_from_one() {
        let mut session = SimulationSession::new();
        assert_eq!(session.next_der_name(), "DER_1");
        assert_eq!(session.next_der_name(), "DER_2");
        assert_eq!(session.next_simulation_name(), "sim_1");
        assert_eq!(session.der_count(), 2);
        assert_eq!(session.simulation_count(), 1);
    }

    #[test]
    fn failure_log_appends() {
        let mut session = SimulationSession::new();
        assert!(session.failures().is_empty());
        session.record_failure(FailureRecord {
            model: "DER_1".into(),
            simulation: "sim_1".into(),
            failure_time: 0.5,
            failure_code: 0,
            s: Complex64::new(5000.0, 0.0),
        });
        assert_eq!(session.failures().len(), 1);
        assert_eq!(session.failures()[0].failure_time, 0.5);
    }
}
