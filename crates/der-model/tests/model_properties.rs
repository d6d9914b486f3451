mod common;

use common::*;
use der_model::{Axis, ClampOutcome, StateVar, StateVector};
use num_complex::Complex64;

#[test]
fn frozen_integrators_do_not_drift() {
    let mut m = stand_alone_model();
    let first = m.derivatives(&DUTY_SATURATED, T_EVAL).unwrap();
    let second = m.derivatives(&DUTY_SATURATED, T_EVAL).unwrap();

    assert_eq!(first, second);
    for var in [StateVar::XaRe, StateVar::XaIm, StateVar::UaRe, StateVar::UaIm] {
        assert_eq!(first[var.index()], 0.0, "{} should be frozen", var.name());
    }
}

#[test]
fn ride_through_disconnects_once_per_jacobian() {
    let mut m = tripped_model();
    let state = StateVector::from_array(NOMINAL);

    let before = m.disconnect_count();
    m.jacobian_of(&state, 0.2);
    assert_eq!(m.disconnect_count(), before + 1);
    assert!(!m.is_connected());

    let d = m.derived().clone();
    assert_eq!(d.inj, Complex64::default());
    assert_eq!(d.ia_ref, Complex64::default());
    assert_eq!(d.ppv, 0.0);
    assert_eq!(d.vta, d.ma * state.vdc / 2.0);

    // The PCC drops out of the filter equation; the converter still drives it.
    let p = m.params().clone();
    let dx = m.derivatives_of(&state, 0.2);
    let d = m.derived().clone();
    let coupling = d.we / p.bases.wbase;
    let expected_re = (-p.rf * state.ia.re + d.vta.re) / p.lf + coupling * state.ia.im;
    let expected_im = (-p.rf * state.ia.im + d.vta.im) / p.lf - coupling * state.ia.re;
    assert!((dx[StateVar::IaRe.index()] - expected_re).abs() < 1e-9 * expected_re.abs().max(1.0));
    assert!((dx[StateVar::IaIm.index()] - expected_im).abs() < 1e-9 * expected_im.abs().max(1.0));

    // Current loop tracks a zero reference; outer loops hold.
    let expected_ua = p.gains.wp * (-state.ua.re - state.ia.re);
    assert!((dx[StateVar::UaRe.index()] - expected_ua).abs() < 1e-9 * expected_ua.abs());
    assert_eq!(dx[StateVar::Xdc.index()], 0.0);
    assert_eq!(dx[StateVar::Xq.index()], 0.0);
    let decisions = m.windup_decisions(&state, 0.2);
    assert_eq!(decisions.outcome(Axis::Dc), ClampOutcome::Held { axis: Axis::Dc });
    assert_eq!(decisions.outcome(Axis::Q), ClampOutcome::Held { axis: Axis::Q });
}

#[test]
fn healthy_grid_never_disconnects() {
    let mut m = stand_alone_model();
    let state = StateVector::from_array(NOMINAL);
    m.jacobian_of(&state, 0.2);
    m.derivatives_of(&state, 0.2);
    assert_eq!(m.disconnect_count(), 0);
    assert!(m.is_connected());
}

#[test]
fn dc_link_power_balance() {
    for mut m in [stand_alone_model(), diode_model()] {
        let state = StateVector::from_array(NOMINAL);
        let dx = m.derivatives_of(&state, T_EVAL);
        let d = m.derived();
        let c = m.params().c_dc;
        let lhs = d.ppv - d.s.re;
        let rhs = state.vdc * c * dx[StateVar::Vdc.index()];
        assert!((lhs - rhs).abs() < 1e-12 * lhs.abs().max(1.0));
    }
}

#[test]
fn stand_alone_toggle_only_changes_grid_side_powers() {
    let mut stand_alone = stand_alone_model();
    let state = StateVector::from_array(NOMINAL);
    let dx_stand_alone = stand_alone.derivatives_of(&state, T_EVAL);
    let d_stand_alone = stand_alone.derived().clone();

    let sa = d_stand_alone
        .stand_alone
        .expect("stand-alone quantities are computed");
    assert!(sa.s_load.is_some());
    assert!(sa.s_grid.norm() > 0.0);

    // Same PCC voltage, but supplied instead of computed.
    let mut measured = measured_model(d_stand_alone.va);
    let dx_measured = measured.derivatives_of(&state, T_EVAL);
    let d_measured = measured.derived();

    assert!(d_measured.stand_alone.is_none());
    for var in StateVar::ALL {
        let (a, b) = (dx_stand_alone[var.index()], dx_measured[var.index()]);
        assert!(
            (a - b).abs() <= 1e-9 * a.abs().max(1.0),
            "{}: {a} vs {b}",
            var.name()
        );
    }
}

#[test]
fn stand_alone_power_flows_balance() {
    let mut m = stand_alone_model();
    let state = StateVector::from_array(NOMINAL);
    m.derivatives_of(&state, T_EVAL);
    let d = m.derived();
    let sa = d.stand_alone.expect("stand-alone");
    let p = m.params();

    // PCC injection = load + transformer LV side
    let s_load = sa.s_load.expect("load present");
    let s_lv = 0.5 * d.va * sa.it.conj();
    assert!((d.s_pcc - (s_load + s_lv)).norm() < 1e-12);

    // Grid source absorbs what crosses the transformer minus its losses
    let s_z1 = 0.5 * sa.it * p.z1 * sa.it.conj();
    let s_hv = 0.5 * sa.vhv * (sa.it / p.a).conj();
    assert!((s_lv - s_z1 - s_hv).norm() < 1e-12);
}

#[test]
fn steady_state_is_an_equilibrium() {
    let mut m = stand_alone_model();
    let y = m.steady_state(0.0).unwrap();

    let dx = m.derivatives_of(&y, 0.0);
    for var in StateVar::ALL.iter().filter(|v| **v != StateVar::Wte) {
        assert!(dx[var.index()].abs() < 1e-8, "{} = {}", var.name(), dx[var.index()]);
    }
    let d = m.derived();
    assert!((d.s_pcc.im - 0.1).abs() < 1e-9);
    assert!((d.ppv - d.s.re).abs() < 1e-9);
    assert!(d.vd.abs() < 1e-9);
    assert!((d.we - m.params().w_nominal).abs() < 1e-6);

    assert!((y.ia.re - 0.989_560_281).abs() < 1e-6);
    assert!((y.ia.im + 0.150_712_869).abs() < 1e-6);
    assert!((y.vdc - m.params().vdc_rated).abs() < 1e-12);
    assert!(m.windup_decisions(&y, 0.0).iter().all(|o| o.is_free()));
}

#[test]
fn steady_state_with_diode_panel() {
    let mut m = diode_model();
    let y = m.steady_state(0.5).unwrap();
    let dx = m.derivatives_of(&y, 0.5);
    assert!(dx[StateVar::Vdc.index()].abs() < 1e-8);
    let d = m.derived();
    assert!((d.s.re - d.ppv).abs() < 1e-9);
    assert!(d.ppv > 0.5);
    assert!(m.windup_decisions(&y, 0.5).is_free(Axis::Dc));
}

mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn state_strategy() -> impl Strategy<Value = [f64; 11]> {
        (
            (-3.0..3.0f64, -3.0..3.0f64, -3.0..3.0f64, -3.0..3.0f64),
            (-1.0..1.0f64, -1.0..1.0f64, 0.5..4.0f64),
            (-5.0..5.0f64, -5.0..5.0f64, -50.0..50.0f64, -100.0..100.0f64),
        )
            .prop_map(|((a, b, c, d), (e, f, g), (h, i, j, k))| {
                [a, b, c, d, e, f, g, h, i, j, k]
            })
    }

    proptest! {
        #[test]
        fn derivatives_are_finite(y in state_strategy(), t in 0.0..10.0f64) {
            let mut m = stand_alone_model();
            let dx = m.derivatives(&y, t).unwrap();
            prop_assert!(dx.iter().all(|v| v.is_finite()));
        }

        #[test]
        fn jacobian_is_finite(y in state_strategy(), t in 0.0..10.0f64) {
            let mut m = diode_model();
            let j = m.jacobian(&y, t).unwrap().into_matrix();
            prop_assert!(j.iter().all(|v| v.is_finite()));
        }

        #[test]
        fn frozen_rows_vanish_together(y in state_strategy(), t in 0.0..1.0f64) {
            let mut m = stand_alone_model();
            let state = StateVector::from_array(y);
            let decisions = m.windup_decisions(&state, t);
            let dx = m.derivatives_of(&state, t);
            let j = m.jacobian_of(&state, t);
            let rows = [
                (Axis::XaRe, StateVar::XaRe),
                (Axis::XaIm, StateVar::XaIm),
                (Axis::UaRe, StateVar::UaRe),
                (Axis::UaIm, StateVar::UaIm),
                (Axis::Dc, StateVar::Xdc),
                (Axis::Q, StateVar::Xq),
            ];
            for (axis, row) in rows {
                if !decisions.is_free(axis) {
                    prop_assert_eq!(dx[row.index()], 0.0);
                    for col in StateVar::ALL {
                        prop_assert_eq!(j[(row, col)], 0.0);
                    }
                }
            }
        }
    }
}
