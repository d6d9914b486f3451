//! Derived electrical quantities recomputed at every evaluation.

use crate::frame::{alpha_beta, park};
use crate::params::DerParameters;
use crate::providers::{GridSource, InputSample};
use crate::ride_through::RideThroughFlags;
use crate::state::StateVector;
use der_core::rms;
use num_complex::Complex64;

/// Quantities that only exist when the DER drives its own grid source.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct StandAloneQuantities {
    pub vag: Complex64,
    /// HV-side transformer voltage.
    pub vhv: Complex64,
    /// LV-side transformer current.
    pub it: Complex64,
    pub s_load: Option<Complex64>,
    /// Power delivered by the grid source.
    pub s_grid: Complex64,
    pub vag_rms: f64,
    pub vhv_rms: f64,
}

/// Snapshot of everything derived from one (state, t, inputs) triple.
///
/// Per-unit on the DER bases. `dva_dia_re` / `dva_dia_im` hold the
/// sensitivity of the PCC voltage to the filter current, used by the
/// Jacobian.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DerivedQuantities {
    pub t: f64,
    pub state: StateVector,
    pub connected: bool,
    pub flags: RideThroughFlags,
    /// Duty cycle `Kp_GCC * ua + xa`.
    pub ma: Complex64,
    /// Inverter terminal voltage. Stays live while disconnected so the
    /// current loop can drive `ia` to zero.
    pub vta: Complex64,
    /// Current injected at the PCC.
    pub inj: Complex64,
    pub va: Complex64,
    pub dva_dia_re: Complex64,
    pub dva_dia_im: Complex64,
    pub vta_rms: f64,
    pub va_rms: f64,
    pub ia_rms: f64,
    /// Power at the inverter terminal, `0.5 * vta * conj(ia)`.
    pub s: Complex64,
    pub s_pcc: Complex64,
    pub stand_alone: Option<StandAloneQuantities>,
    pub ppv: f64,
    pub dppv_dvdc: f64,
    pub q_ref: f64,
    pub vdc_ref: f64,
    /// Outer-loop current command before gating.
    pub i_cmd: Complex64,
    pub ia_ref: Complex64,
    pub w_grid: f64,
    pub v_alpha: f64,
    pub v_beta: f64,
    pub vd: f64,
    pub vq: f64,
    /// `e^{j(w_grid t - wte)}`; `vd + j vq = va * rotation`.
    pub rotation: Complex64,
    /// PLL frequency estimate (rad/s).
    pub we: f64,
}

impl DerivedQuantities {
    /// 1 when connected, 0 when the ride-through gate has opened.
    #[inline]
    pub fn gate(&self) -> f64 {
        if self.connected { 1.0 } else { 0.0 }
    }

    /// Overwrite every derived field from `state` at time `t`.
    pub fn refresh(
        &mut self,
        params: &DerParameters,
        inputs: &InputSample,
        state: &StateVector,
        t: f64,
        connected: bool,
    ) {
        self.t = t;
        self.state = *state;
        self.connected = connected;
        let gate = self.gate();

        // Inverter terminal
        self.ma = params.gains.kp_gcc * state.ua + state.xa;
        self.vta = self.ma * state.vdc / 2.0;
        self.inj = gate * state.ia;

        // PCC
        match inputs.source {
            GridSource::StandAlone { vag, z_grid } => {
                let a = params.a;
                let zt = params.z1 + z_grid / (a * a);
                let (k0, k1) = match inputs.z_load {
                    Some(zl) => ((vag / a) * zl / (zl + zt), zt * zl / (zl + zt)),
                    None => (vag / a, zt),
                };
                self.va = k0 + k1 * self.inj;
                self.dva_dia_re = gate * k1;
                self.dva_dia_im = gate * Complex64::i() * k1;

                let i_load = inputs.z_load.map(|zl| self.va / zl);
                let it = self.inj - i_load.unwrap_or_default();
                let vhv = a * (self.va - it * params.z1);
                self.stand_alone = Some(StandAloneQuantities {
                    vag,
                    vhv,
                    it,
                    s_load: i_load.map(|il| 0.5 * self.va * il.conj()),
                    s_grid: 0.5 * vag * (-it / a).conj(),
                    vag_rms: rms(vag.norm()),
                    vhv_rms: rms(vhv.norm()),
                });
            }
            GridSource::Measured { va } => {
                self.va = va;
                self.dva_dia_re = Complex64::default();
                self.dva_dia_im = Complex64::default();
                self.stand_alone = None;
            }
        }

        // RMS
        self.vta_rms = rms(self.vta.norm());
        self.va_rms = rms(self.va.norm());
        self.ia_rms = rms(state.ia.norm());

        // Powers
        self.s = 0.5 * self.vta * state.ia.conj();
        self.s_pcc = 0.5 * self.va * self.inj.conj();
        self.ppv = gate * inputs.panel.power;
        self.dppv_dvdc = gate * inputs.panel.dpower_dvdc;

        // References
        let g = &params.gains;
        self.q_ref = inputs.q_ref;
        self.vdc_ref = inputs.vdc_ref;
        self.i_cmd = Complex64::new(
            state.xdc + g.kp_dc * (self.vdc_ref - state.vdc),
            state.xq - g.kp_q * (self.q_ref - self.s_pcc.im),
        );
        self.ia_ref = gate * self.i_cmd;

        // PLL frame
        self.w_grid = inputs.w_grid;
        let theta = self.w_grid * t;
        (self.v_alpha, self.v_beta) = alpha_beta(self.va, theta);
        (self.vd, self.vq) = park(self.v_alpha, self.v_beta, state.wte);
        self.rotation = Complex64::cis(theta - state.wte);
        self.we = state.xpll + g.kp_pll * self.vd + params.w_nominal;
    }

    /// PCC RMS voltage relative to the rated RMS voltage.
    pub fn voltage_pu(&self, params: &DerParameters) -> f64 {
        self.va_rms * params.bases.vbase / params.vrms_rated
    }
}
