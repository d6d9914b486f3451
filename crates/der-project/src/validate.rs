//! Scenario validation logic.

use crate::schema::{
    GridSourceDef, InitialDef, PanelDef, PhasorDef, RideThroughDef, Scenario, SimulationDef,
};
use der_model::{Band, DerParameters, N_STATES, ThresholdRideThrough};

#[derive(thiserror::Error, Debug)]
pub enum ValidationError {
    #[error("Invalid value: {field} = {value} ({reason})")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Unsupported version: {version}")]
    UnsupportedVersion { version: u32 },

    #[error("Invalid DER configuration: {0}")]
    Der(#[from] der_model::ModelError),
}

fn invalid(field: &str, value: impl ToString, reason: &str) -> ValidationError {
    ValidationError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

pub fn validate_scenario(scenario: &Scenario) -> Result<(), ValidationError> {
    if scenario.version == 0 || scenario.version > crate::schema::LATEST_VERSION {
        return Err(ValidationError::UnsupportedVersion {
            version: scenario.version,
        });
    }
    if scenario.name.trim().is_empty() {
        return Err(invalid("name", "\"\"", "must not be empty"));
    }

    DerParameters::from_config(&scenario.der)?;

    validate_panel(&scenario.panel)?;
    validate_grid(scenario)?;

    let q_ref = scenario.setpoints.q_ref_pu;
    if !q_ref.is_finite() {
        return Err(invalid("setpoints.q_ref_pu", q_ref, "must be finite"));
    }
    if let Some(v) = scenario.setpoints.vdc_ref_v {
        if !(v.is_finite() && v > 0.0) {
            return Err(invalid("setpoints.vdc_ref_v", v, "must be positive"));
        }
    }

    if let RideThroughDef::Threshold(policy) = &scenario.ride_through {
        validate_thresholds(policy)?;
    }

    if let InitialDef::Explicit { state } = &scenario.initial {
        if state.len() != N_STATES {
            return Err(invalid(
                "initial.state",
                format!("{} values", state.len()),
                "expected one value per state variable",
            ));
        }
        if let Some(v) = state.iter().find(|v| !v.is_finite()) {
            return Err(invalid("initial.state", v, "must be finite"));
        }
    }

    validate_simulation(&scenario.simulation)
}

fn validate_panel(panel: &PanelDef) -> Result<(), ValidationError> {
    match panel {
        PanelDef::Constant { power_pu } => {
            if !(power_pu.is_finite() && *power_pu >= 0.0) {
                return Err(invalid("panel.power_pu", power_pu, "must be non-negative"));
            }
        }
        PanelDef::SingleDiode(cfg) => {
            if cfg.photo_current.value < 0.0 {
                return Err(invalid(
                    "panel.photo_current",
                    cfg.photo_current.value,
                    "must be non-negative",
                ));
            }
            if cfg.saturation_current.value <= 0.0 {
                return Err(invalid(
                    "panel.saturation_current",
                    cfg.saturation_current.value,
                    "must be positive",
                ));
            }
            if !(cfg.ideality > 0.0) {
                return Err(invalid("panel.ideality", cfg.ideality, "must be positive"));
            }
            if cfg.cells_in_series == 0 || cfg.strings == 0 {
                return Err(invalid(
                    "panel.cells_in_series/strings",
                    format!("{}/{}", cfg.cells_in_series, cfg.strings),
                    "must be at least one",
                ));
            }
            if !(cfg.temperature_k > 0.0) {
                return Err(invalid(
                    "panel.temperature_k",
                    cfg.temperature_k,
                    "must be positive",
                ));
            }
        }
    }
    Ok(())
}

fn check_phasor(field: &str, p: &PhasorDef) -> Result<(), ValidationError> {
    if !p.is_finite() {
        return Err(invalid(field, format!("{}{:+}j", p.re, p.im), "must be finite"));
    }
    Ok(())
}

fn check_impedance(field: &str, p: &PhasorDef) -> Result<(), ValidationError> {
    check_phasor(field, p)?;
    if p.re < 0.0 || (p.re == 0.0 && p.im == 0.0) {
        return Err(invalid(
            field,
            format!("{}{:+}j", p.re, p.im),
            "must be non-zero with non-negative resistance",
        ));
    }
    Ok(())
}

fn validate_grid(scenario: &Scenario) -> Result<(), ValidationError> {
    if let Some(f) = scenario.grid.frequency_hz {
        if !(f.is_finite() && f > 0.0) {
            return Err(invalid("grid.frequency_hz", f, "must be positive"));
        }
    }
    match &scenario.grid.source {
        GridSourceDef::StandAlone {
            vag,
            z_grid,
            z_load,
            events,
        } => {
            check_phasor("grid.vag", vag)?;
            check_impedance("grid.z_grid", z_grid)?;
            if let Some(z) = z_load {
                check_impedance("grid.z_load", z)?;
            }
            for event in events {
                if !(event.time.is_finite() && event.time >= 0.0) {
                    return Err(invalid("grid.events.time", event.time, "must be non-negative"));
                }
                if !(event.voltage_scale.is_finite() && event.voltage_scale >= 0.0) {
                    return Err(invalid(
                        "grid.events.voltage_scale",
                        event.voltage_scale,
                        "must be non-negative",
                    ));
                }
                if !(event.frequency_scale.is_finite() && event.frequency_scale > 0.0) {
                    return Err(invalid(
                        "grid.events.frequency_scale",
                        event.frequency_scale,
                        "must be positive",
                    ));
                }
            }
        }
        GridSourceDef::Measured { va } => check_phasor("grid.va", va)?,
    }
    Ok(())
}

fn check_band(field: &str, band: &Band) -> Result<(), ValidationError> {
    if !(band.low.is_finite() && band.high.is_finite() && band.low <= band.high) {
        return Err(invalid(
            field,
            format!("[{}, {}]", band.low, band.high),
            "low must not exceed high",
        ));
    }
    Ok(())
}

fn validate_thresholds(policy: &ThresholdRideThrough) -> Result<(), ValidationError> {
    if !(policy.t_stable.is_finite() && policy.t_stable >= 0.0) {
        return Err(invalid(
            "ride_through.t_stable",
            policy.t_stable,
            "must be non-negative",
        ));
    }
    check_band("ride_through.voltage_trip", &policy.voltage_trip)?;
    check_band("ride_through.voltage_reconnect", &policy.voltage_reconnect)?;
    check_band("ride_through.frequency_trip", &policy.frequency_trip)?;
    check_band("ride_through.frequency_reconnect", &policy.frequency_reconnect)
}

fn validate_simulation(sim: &SimulationDef) -> Result<(), ValidationError> {
    if !(sim.t_start.is_finite() && sim.t_end.is_finite() && sim.t_end > sim.t_start) {
        return Err(invalid(
            "simulation.t_end",
            sim.t_end,
            "must be after t_start",
        ));
    }
    if !(sim.dt_out > 0.0 && sim.dt_out <= sim.t_end - sim.t_start) {
        return Err(invalid(
            "simulation.dt_out",
            sim.dt_out,
            "must be positive and no longer than the run",
        ));
    }
    let solver = &sim.solver;
    if !(solver.h_max > 0.0 && solver.h_max.is_finite()) {
        return Err(invalid("simulation.solver.h_max", solver.h_max, "must be positive"));
    }
    if solver.max_steps == 0 {
        return Err(invalid("simulation.solver.max_steps", 0, "must be positive"));
    }
    if !(solver.atol > 0.0) {
        return Err(invalid("simulation.solver.atol", solver.atol, "must be positive"));
    }
    if !(solver.rtol > 0.0) {
        return Err(invalid("simulation.solver.rtol", solver.rtol, "must be positive"));
    }
    Ok(())
}
