//! Integrator accuracy on the full cell model and robustness against degenerate inputs.

use cell_aging_sim::simulation::{
    CellModel, CellParameters, CellState, ExternalState, Rk4Integrator, STATE_DIM,
};
use rstest::rstest;

fn fresh_cell() -> CellState {
    CellState {
        c_s_bar: 0.8 * 24983.26,
        c_e_bar: 1000.0,
        temperature_k: 298.15,
        l_sei: 5e-9,
        delta_ce_dyn: 0.0,
        q_rev: 0.0,
        q_dead: 0.0,
    }
}

/// Integrate to `horizon` with the input frozen, so the ODE itself is autonomous
fn integrate_frozen(model: &CellModel, ext: &ExternalState, dt: f64, horizon: f64) -> [f64; STATE_DIM] {
    let mut rk4 = Rk4Integrator::<STATE_DIM>::new(0.0, fresh_cell().into());
    let steps = (horizon / dt).round() as usize;
    for _ in 0..steps {
        rk4.step(model, dt, ext).unwrap();
    }
    *rk4.state()
}

#[test]
fn test_rk4_fourth_order_on_gradient_relaxation() {
    let model = CellModel::new(CellParameters::default());
    let ext = model.calculate_state(0.0, &fresh_cell(), &ExternalState::default().with_current(1.0));

    let reference = integrate_frozen(&model, &ext, 0.0625, 80.0)[4];
    let coarse = integrate_frozen(&model, &ext, 2.0, 80.0)[4];
    let fine = integrate_frozen(&model, &ext, 1.0, 80.0)[4];

    let ratio = (coarse - reference).abs() / (fine - reference).abs();
    assert!(ratio > 14.0 && ratio < 19.0, "halving dt cut the error by {ratio}");
}

#[test]
fn test_input_seen_by_all_stages_is_returned_refreshed() {
    let model = CellModel::new(CellParameters::default());
    let ext = ExternalState::default().with_current(2.0);
    let mut rk4 = Rk4Integrator::<STATE_DIM>::new(0.0, fresh_cell().into());

    let next = rk4.step(&model, 1.0, &ext).unwrap();

    assert_eq!(ext.r_tot, 0.1, "caller's input untouched");
    assert!(next.r_tot < 0.05, "refreshed from the film and separator");
    assert_eq!(next.current_a, 2.0);
    assert_eq!(rk4.time(), 1.0);
}

#[rstest]
#[case::zero_diffusivity(ExternalState { d_e: 0.0, ..ExternalState::default().with_current(3.0) })]
#[case::zero_soh(ExternalState { soh: 0.0, ..ExternalState::default().with_current(3.0) })]
#[case::zero_voltage_power(ExternalState { voltage_v: 0.0, ..ExternalState::default().with_power(2.0, 0.5) })]
#[case::heavy_charge(ExternalState::default().with_current(-30.0))]
fn test_degenerate_inputs_stay_finite(#[case] ext: ExternalState) {
    let model = CellModel::new(CellParameters::default());
    let y = CellState {
        l_sei: 0.0,
        ..fresh_cell()
    };

    let dy = model.derivatives(0.0, &y, &ext).to_array();
    assert!(dy.iter().all(|v| v.is_finite()), "derivatives {dy:?}");

    let next = model.calculate_state(0.0, &y, &ext);
    assert!(next.voltage_v.is_finite());
    assert!(next.current_a.is_finite());
    assert!(next.soh >= 0.01 && next.soh <= 1.0);
}

#[test]
fn test_plated_lithium_decays_faster_on_thin_film() {
    let model = CellModel::new(CellParameters::default());
    let ext = ExternalState::default().with_current(0.0);
    let thin = CellState {
        q_rev: 1.0,
        ..fresh_cell()
    };
    let thick = CellState {
        l_sei: 5e-8,
        ..thin
    };

    let thin_rate = model.derivatives(0.0, &thin, &ext).q_dead;
    let thick_rate = model.derivatives(0.0, &thick, &ext).q_dead;

    assert!(thin_rate > 0.0);
    assert!((thin_rate / thick_rate - 10.0).abs() < 1e-9);
}
