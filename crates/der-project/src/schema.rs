//! Scenario file definitions.
//!
//! SI quantities inside `der` and `panel` are plain numbers in base units
//! (W, V, ohm, H, F, A). Phasors and setpoints are per-unit on the DER bases.

use der_model::{DerConfig, GridEvent, SingleDiodeConfig, ThresholdRideThrough};
use der_sim::SolverOptions;
use num_complex::Complex64;
use serde::{Deserialize, Serialize};

pub const LATEST_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Scenario {
    pub version: u32,
    pub name: String,
    #[serde(default)]
    pub der: DerConfig,
    #[serde(default)]
    pub panel: PanelDef,
    pub grid: GridDef,
    #[serde(default)]
    pub setpoints: SetpointsDef,
    #[serde(default)]
    pub ride_through: RideThroughDef,
    #[serde(default)]
    pub initial: InitialDef,
    pub simulation: SimulationDef,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct PhasorDef {
    pub re: f64,
    #[serde(default)]
    pub im: f64,
}

impl PhasorDef {
    pub fn new(re: f64, im: f64) -> Self {
        Self { re, im }
    }

    pub fn is_finite(&self) -> bool {
        self.re.is_finite() && self.im.is_finite()
    }
}

impl From<PhasorDef> for Complex64 {
    fn from(p: PhasorDef) -> Self {
        Complex64::new(p.re, p.im)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PanelDef {
    Constant { power_pu: f64 },
    SingleDiode(SingleDiodeConfig),
}

impl Default for PanelDef {
    fn default() -> Self {
        PanelDef::SingleDiode(SingleDiodeConfig::default())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GridDef {
    /// Defaults to the DER nominal frequency.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency_hz: Option<f64>,
    #[serde(flatten)]
    pub source: GridSourceDef,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GridSourceDef {
    /// Thevenin source behind the DER transformer.
    StandAlone {
        #[serde(default = "unit_phasor")]
        vag: PhasorDef,
        #[serde(default = "default_z_grid")]
        z_grid: PhasorDef,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        z_load: Option<PhasorDef>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        events: Vec<GridEvent>,
    },
    /// PCC voltage fixed by an external network solution.
    Measured { va: PhasorDef },
}

fn unit_phasor() -> PhasorDef {
    PhasorDef::new(1.0, 0.0)
}

fn default_z_grid() -> PhasorDef {
    PhasorDef::new(0.01, 0.05)
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SetpointsDef {
    pub q_ref_pu: f64,
    /// DC-link reference in volts; rated DC voltage when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vdc_ref_v: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RideThroughDef {
    #[default]
    None,
    Threshold(ThresholdRideThrough),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum InitialDef {
    /// Controllers at rest, DC link at its reference.
    #[default]
    Rest,
    /// Equilibrium at the start time.
    SteadyState,
    /// Per-unit state in model order.
    Explicit { state: Vec<f64> },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SimulationDef {
    #[serde(default)]
    pub t_start: f64,
    pub t_end: f64,
    #[serde(default = "default_dt_out")]
    pub dt_out: f64,
    #[serde(default)]
    pub solver: SolverOptions,
}

fn default_dt_out() -> f64 {
    1.0 / 120.0
}
