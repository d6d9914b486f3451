//! DER ratings, circuit values and controller settings.
//!
//! [`DerConfig`] is the serializable SI description; [`DerParameters`] is
//! the validated per-unit form the model evaluates against.

use crate::error::{ModelError, ModelResult};
use der_core::ensure_finite;
use der_core::units::{
    Capacitance, Frequency, Inductance, Power, Resistance, Voltage, angular, farads, henries,
    hertz, ohms, volts, watts,
};
use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use std::f64::consts::SQRT_2;
use uom::si::capacitance::farad;
use uom::si::electric_potential::volt;
use uom::si::electrical_resistance::ohm;
use uom::si::inductance::henry;
use uom::si::power::watt;

/// PI gains of the current, DC-link, reactive power and PLL loops.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerGains {
    pub kp_gcc: f64,
    pub ki_gcc: f64,
    /// Bandwidth of the current-controller filter state (rad/s).
    pub wp: f64,
    pub kp_dc: f64,
    pub ki_dc: f64,
    pub kp_q: f64,
    pub ki_q: f64,
    pub kp_pll: f64,
    pub ki_pll: f64,
}

impl Default for ControllerGains {
    fn default() -> Self {
        Self {
            kp_gcc: 0.5,
            ki_gcc: 30.0,
            wp: 20e4,
            kp_dc: -107.0,
            ki_dc: -537.0,
            kp_q: 0.5,
            ki_q: 20.0,
            kp_pll: 180.0,
            ki_pll: 320.0,
        }
    }
}

impl ControllerGains {
    fn all_finite(&self) -> bool {
        [
            self.kp_gcc,
            self.ki_gcc,
            self.wp,
            self.kp_dc,
            self.ki_dc,
            self.kp_q,
            self.ki_q,
            self.kp_pll,
            self.ki_pll,
        ]
        .iter()
        .all(|v| v.is_finite())
    }
}

/// Saturation thresholds used by the anti-windup logic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerLimits {
    /// Duty cycle limit.
    pub m_limit: f64,
    /// Multiple of `m_limit` above which the current-loop integrators freeze.
    pub duty_saturation_factor: f64,
    /// Overload rating as a multiple of rated peak current.
    pub overload: f64,
}

impl Default for ControllerLimits {
    fn default() -> Self {
        Self {
            m_limit: 1.0,
            duty_saturation_factor: 10.0,
            overload: 1.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DerConfig {
    pub rated_power: Power,
    pub rated_vrms: Voltage,
    pub rated_vdc: Voltage,
    pub nominal_frequency: Frequency,
    pub filter_resistance: Resistance,
    pub filter_inductance: Inductance,
    pub dc_capacitance: Capacitance,
    pub transformer_resistance: Resistance,
    pub transformer_reactance: Resistance,
    pub turns_ratio: f64,
    pub gains: ControllerGains,
    pub limits: ControllerLimits,
}

impl Default for DerConfig {
    fn default() -> Self {
        Self {
            rated_power: watts(10e3),
            rated_vrms: volts(240.0),
            rated_vdc: volts(700.0),
            nominal_frequency: hertz(60.0),
            filter_resistance: ohms(0.002),
            filter_inductance: henries(25e-6),
            dc_capacitance: farads(300e-6),
            transformer_resistance: ohms(0.0019),
            transformer_reactance: ohms(0.0561),
            turns_ratio: 1.0,
            gains: ControllerGains::default(),
            limits: ControllerLimits::default(),
        }
    }
}

/// Per-unit bases. Voltage and current bases are peak values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bases {
    pub sbase: f64,
    pub vbase: f64,
    pub ibase: f64,
    pub zbase: f64,
    pub wbase: f64,
    pub lbase: f64,
    pub cbase: f64,
    pub vdcbase: f64,
}

impl Bases {
    pub fn new(rated_power_w: f64, rated_vrms_v: f64, wbase: f64) -> Self {
        let vbase = rated_vrms_v * SQRT_2;
        let ibase = rated_power_w / vbase;
        let zbase = vbase / ibase;
        Self {
            sbase: rated_power_w,
            vbase,
            ibase,
            zbase,
            wbase,
            lbase: zbase / wbase,
            cbase: 1.0 / (wbase * zbase),
            vdcbase: vbase,
        }
    }
}

/// Validated per-unit parameter set.
#[derive(Debug, Clone, PartialEq)]
pub struct DerParameters {
    pub bases: Bases,
    pub rf: f64,
    pub lf: f64,
    pub c_dc: f64,
    pub z1: Complex64,
    pub a: f64,
    pub gains: ControllerGains,
    /// |ma| above which the current-loop integrators may freeze.
    pub duty_limit: f64,
    /// |i_cmd| above which the outer-loop integrators may freeze.
    pub iref_limit: f64,
    /// Nominal angular frequency (rad/s).
    pub w_nominal: f64,
    /// Rated DC-link voltage (pu).
    pub vdc_rated: f64,
    /// Rated RMS voltage (V).
    pub vrms_rated: f64,
}

fn require(ok: bool, what: &'static str) -> ModelResult<()> {
    if ok {
        Ok(())
    } else {
        Err(ModelError::InvalidParameter { what })
    }
}

impl DerParameters {
    pub fn from_config(cfg: &DerConfig) -> ModelResult<Self> {
        let s_rated = ensure_finite(cfg.rated_power.get::<watt>(), "rated power")?;
        let vrms = ensure_finite(cfg.rated_vrms.get::<volt>(), "rated RMS voltage")?;
        let vdc = ensure_finite(cfg.rated_vdc.get::<volt>(), "rated DC voltage")?;
        let wbase = ensure_finite(angular(cfg.nominal_frequency), "nominal frequency")?;
        let rf = ensure_finite(cfg.filter_resistance.get::<ohm>(), "filter resistance")?;
        let lf = ensure_finite(cfg.filter_inductance.get::<henry>(), "filter inductance")?;
        let c = ensure_finite(cfg.dc_capacitance.get::<farad>(), "DC-link capacitance")?;
        let r1 = ensure_finite(
            cfg.transformer_resistance.get::<ohm>(),
            "transformer resistance",
        )?;
        let x1 = ensure_finite(cfg.transformer_reactance.get::<ohm>(), "transformer reactance")?;

        require(s_rated > 0.0, "rated power must be positive")?;
        require(vrms > 0.0, "rated RMS voltage must be positive")?;
        require(vdc > 0.0, "rated DC voltage must be positive")?;
        require(wbase > 0.0, "nominal frequency must be positive")?;
        require(rf >= 0.0, "filter resistance must be non-negative")?;
        require(lf > 0.0, "filter inductance must be positive")?;
        require(c > 0.0, "DC-link capacitance must be positive")?;
        require(r1 >= 0.0, "transformer resistance must be non-negative")?;
        require(cfg.turns_ratio > 0.0, "turns ratio must be positive")?;
        require(cfg.gains.all_finite(), "controller gains must be finite")?;
        require(cfg.limits.m_limit > 0.0, "m_limit must be positive")?;
        require(
            cfg.limits.duty_saturation_factor > 0.0,
            "duty saturation factor must be positive",
        )?;
        require(cfg.limits.overload > 0.0, "overload rating must be positive")?;

        let bases = Bases::new(s_rated, vrms, wbase);
        require(
            2.0 * bases.vbase / vdc <= 1.0,
            "rated DC voltage is too low for the rated AC voltage",
        )?;

        // Rated peak current in per-unit.
        let i_rated = (SQRT_2 * s_rated / vrms) / bases.ibase;

        Ok(Self {
            bases,
            rf: rf / bases.zbase,
            lf: lf / bases.lbase,
            c_dc: c / bases.cbase,
            z1: Complex64::new(r1, x1) / bases.zbase,
            a: cfg.turns_ratio,
            gains: cfg.gains.clone(),
            duty_limit: cfg.limits.m_limit * cfg.limits.duty_saturation_factor,
            iref_limit: cfg.limits.overload * i_rated,
            w_nominal: wbase,
            vdc_rated: vdc / bases.vdcbase,
            vrms_rated: vrms,
        })
    }
}
