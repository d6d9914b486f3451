//! Capability traits for the model's external collaborators.
//!
//! All values exchanged here are per-unit on the DER bases, angular
//! frequencies are in rad/s and time is in seconds.

use crate::params::Bases;
use crate::ride_through::RideThroughPolicy;
use der_core::units::{Current, amperes, constants};
use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use uom::si::electric_current::ampere;

/// Available DC power and its slope with respect to the DC-link voltage.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PanelOutput {
    pub power: f64,
    pub dpower_dvdc: f64,
}

pub trait PanelPower {
    fn power(&self, t: f64, vdc: f64) -> PanelOutput;
}

/// How the PCC voltage is obtained.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum GridSource {
    /// The DER drives a Thevenin source `vag` behind `z_grid` (HV side).
    StandAlone { vag: Complex64, z_grid: Complex64 },
    /// The PCC voltage is supplied by an external network solution.
    Measured { va: Complex64 },
}

pub trait GridInputs {
    fn source(&self, t: f64) -> GridSource;

    /// Grid angular frequency (rad/s).
    fn frequency(&self, t: f64) -> f64;

    /// Local load on the LV side, if any.
    fn load_impedance(&self, t: f64) -> Option<Complex64>;
}

pub trait Setpoints {
    fn q_ref(&self, t: f64) -> f64;
    fn vdc_ref(&self, t: f64) -> f64;
}

/// Everything the derived-quantity pipeline reads from collaborators at one
/// evaluation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct InputSample {
    pub panel: PanelOutput,
    pub source: GridSource,
    pub w_grid: f64,
    pub z_load: Option<Complex64>,
    pub q_ref: f64,
    pub vdc_ref: f64,
}

/// The model's injected collaborators.
pub struct Providers {
    pub panel: Box<dyn PanelPower>,
    pub grid: Box<dyn GridInputs>,
    pub setpoints: Box<dyn Setpoints>,
    pub ride_through: Box<dyn RideThroughPolicy>,
}

impl Providers {
    pub fn sample(&self, t: f64, vdc: f64) -> InputSample {
        InputSample {
            panel: self.panel.power(t, vdc),
            source: self.grid.source(t),
            w_grid: self.grid.frequency(t),
            z_load: self.grid.load_impedance(t),
            q_ref: self.setpoints.q_ref(t),
            vdc_ref: self.setpoints.vdc_ref(t),
        }
    }
}

/// Fixed available power, independent of the DC-link voltage.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConstantPower {
    pub power: f64,
}

impl PanelPower for ConstantPower {
    fn power(&self, _t: f64, _vdc: f64) -> PanelOutput {
        PanelOutput {
            power: self.power,
            dpower_dvdc: 0.0,
        }
    }
}

/// Single-diode model of a PV array.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SingleDiodeConfig {
    /// Photo-generated current of one string.
    pub photo_current: Current,
    /// Diode reverse saturation current of one string.
    pub saturation_current: Current,
    pub ideality: f64,
    pub cells_in_series: u32,
    pub strings: u32,
    /// Cell temperature (K).
    pub temperature_k: f64,
}

impl Default for SingleDiodeConfig {
    fn default() -> Self {
        Self {
            photo_current: amperes(8.0),
            saturation_current: amperes(1e-10),
            ideality: 1.3,
            cells_in_series: 1000,
            strings: 1,
            temperature_k: 298.15,
        }
    }
}

/// `Ipv = Np * (Iph - Irs * (exp(V / (Ns * A * Vt)) - 1))`, `Ppv = V * Ipv`.
#[derive(Clone, Debug, PartialEq)]
pub struct SingleDiodeArray {
    iph: f64,
    irs: f64,
    string_vt: f64,
    strings: f64,
    vdcbase: f64,
    sbase: f64,
}

impl SingleDiodeArray {
    pub fn new(cfg: &SingleDiodeConfig, bases: &Bases) -> Self {
        let vt = constants::BOLTZMANN * cfg.temperature_k / constants::ELECTRON_CHARGE;
        Self {
            iph: cfg.photo_current.get::<ampere>(),
            irs: cfg.saturation_current.get::<ampere>(),
            string_vt: f64::from(cfg.cells_in_series) * cfg.ideality * vt,
            strings: f64::from(cfg.strings),
            vdcbase: bases.vdcbase,
            sbase: bases.sbase,
        }
    }

    /// Array current (A) at a DC voltage in volts.
    pub fn current(&self, v: f64) -> f64 {
        self.strings * (self.iph - self.irs * ((v / self.string_vt).exp() - 1.0))
    }
}

impl PanelPower for SingleDiodeArray {
    fn power(&self, _t: f64, vdc: f64) -> PanelOutput {
        let v = vdc * self.vdcbase;
        let e = (v / self.string_vt).exp();
        let i = self.strings * (self.iph - self.irs * (e - 1.0));
        let di_dv = -self.strings * self.irs * e / self.string_vt;
        PanelOutput {
            power: v * i / self.sbase,
            dpower_dvdc: (i + v * di_dv) * self.vdcbase / self.sbase,
        }
    }
}

/// Step change applied to a [`StiffGrid`] from `time` onwards.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GridEvent {
    pub time: f64,
    /// Multiplier on the nominal source voltage.
    #[serde(default = "one")]
    pub voltage_scale: f64,
    /// Multiplier on the nominal grid frequency.
    #[serde(default = "one")]
    pub frequency_scale: f64,
}

fn one() -> f64 {
    1.0
}

/// Stand-alone grid: Thevenin source, optional local load and a schedule of
/// voltage/frequency steps.
#[derive(Clone, Debug, PartialEq)]
pub struct StiffGrid {
    pub vag: Complex64,
    pub z_grid: Complex64,
    pub w_grid: f64,
    pub z_load: Option<Complex64>,
    events: Vec<GridEvent>,
}

impl StiffGrid {
    pub fn new(vag: Complex64, z_grid: Complex64, w_grid: f64) -> Self {
        Self {
            vag,
            z_grid,
            w_grid,
            z_load: None,
            events: Vec::new(),
        }
    }

    pub fn with_load(mut self, z_load: Complex64) -> Self {
        self.z_load = Some(z_load);
        self
    }

    pub fn with_events(mut self, mut events: Vec<GridEvent>) -> Self {
        events.sort_by(|a, b| a.time.total_cmp(&b.time));
        self.events = events;
        self
    }

    fn active_event(&self, t: f64) -> Option<&GridEvent> {
        self.events.iter().rev().find(|e| e.time <= t)
    }
}

impl GridInputs for StiffGrid {
    fn source(&self, t: f64) -> GridSource {
        let scale = self.active_event(t).map_or(1.0, |e| e.voltage_scale);
        GridSource::StandAlone {
            vag: self.vag * scale,
            z_grid: self.z_grid,
        }
    }

    fn frequency(&self, t: f64) -> f64 {
        self.w_grid * self.active_event(t).map_or(1.0, |e| e.frequency_scale)
    }

    fn load_impedance(&self, _t: f64) -> Option<Complex64> {
        self.z_load
    }
}

/// PCC voltage and frequency imposed by an external network solution.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MeasuredGrid {
    pub va: Complex64,
    pub w_grid: f64,
}

impl GridInputs for MeasuredGrid {
    fn source(&self, _t: f64) -> GridSource {
        GridSource::Measured { va: self.va }
    }

    fn frequency(&self, _t: f64) -> f64 {
        self.w_grid
    }

    fn load_impedance(&self, _t: f64) -> Option<Complex64> {
        None
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConstantSetpoints {
    pub q_ref: f64,
    pub vdc_ref: f64,
}

impl Setpoints for ConstantSetpoints {
    fn q_ref(&self, _t: f64) -> f64 {
        self.q_ref
    }

    fn vdc_ref(&self, _t: f64) -> f64 {
        self.vdc_ref
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::{DerConfig, DerParameters};

    fn array() -> SingleDiodeArray {
        let p = DerParameters::from_config(&DerConfig::default()).unwrap();
        SingleDiodeArray::new(&SingleDiodeConfig::default(), &p.bases)
    }

    #[test]
    fn diode_array_near_half_rating_at_rated_dc() {
        let p = DerParameters::from_config(&DerConfig::default()).unwrap();
        let out = array().power(0.0, p.vdc_rated);
        assert!(out.power > 0.5 && out.power < 0.6, "P = {}", out.power);
    }

    #[test]
    fn diode_slope_matches_difference() {
        let pv = array();
        for vdc in [1.5, 2.06, 2.3] {
            let h = 1e-6;
            let fd = (pv.power(0.0, vdc + h).power - pv.power(0.0, vdc - h).power) / (2.0 * h);
            let an = pv.power(0.0, vdc).dpower_dvdc;
            assert!((fd - an).abs() < 1e-6 * an.abs().max(1.0), "{vdc}: {fd} vs {an}");
        }
    }

    #[test]
    fn grid_events_apply_from_their_time() {
        let grid = StiffGrid::new(Complex64::new(1.0, 0.0), Complex64::new(0.01, 0.05), 377.0)
            .with_events(vec![
                GridEvent {
                    time: 2.0,
                    voltage_scale: 1.0,
                    frequency_scale: 1.0,
                },
                GridEvent {
                    time: 1.0,
                    voltage_scale: 0.5,
                    frequency_scale: 0.98,
                },
            ]);

        let vag = |t| match grid.source(t) {
            GridSource::StandAlone { vag, .. } => vag.re,
            GridSource::Measured { .. } => f64::NAN,
        };
        assert_eq!(vag(0.5), 1.0);
        assert_eq!(vag(1.0), 0.5);
        assert!((grid.frequency(1.5) - 377.0 * 0.98).abs() < 1e-12);
        assert_eq!(vag(2.5), 1.0);
    }
}
