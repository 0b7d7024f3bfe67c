//! Physical ageing scenarios: discharge, cold-charge plating, SEI passivation, SOH monotonicity.

use cell_aging_sim::load::SimulationPlan;
use cell_aging_sim::runner::{run_static_test, StaticTestSettings};
use cell_aging_sim::simulation::{
    initial_state_for_soh, CellModel, CellParameters, CellState, ExternalState, Rk4Integrator,
    STATE_DIM,
};
use proptest::prelude::*;

const C_S_MAX: f64 = 24983.26;

fn new_cell(soc: f64, temperature_k: f64) -> CellState {
    CellState {
        c_s_bar: soc * C_S_MAX,
        c_e_bar: 1000.0,
        temperature_k,
        l_sei: 5e-9,
        delta_ce_dyn: 0.0,
        q_rev: 0.0,
        q_dead: 0.0,
    }
}

#[test]
fn test_new_cell_constant_discharge() {
    let model = CellModel::new(CellParameters::default());
    let y0 = new_cell(0.8, 298.15);
    let soh_0 = model.state_of_health(&y0);

    let mut rk4 = Rk4Integrator::<STATE_DIM>::new(0.0, y0.into());
    let mut ext = ExternalState::default().with_current(1.0);
    let mut temperatures = vec![y0.temperature_k];
    let mut socs = Vec::new();

    for _ in 0..100 {
        ext = rk4.step(&model, 1.0, &ext).unwrap();
        temperatures.push(rk4.state()[2]);
        socs.push(ext.soc);
        assert_eq!(ext.current_a, 1.0, "imposed current is never overwritten");
    }

    assert!(temperatures.windows(2).all(|w| w[1] > w[0]), "temperature rises every step");
    assert!(socs.windows(2).all(|w| w[1] < w[0]), "SOC falls every step");

    // SEI growth on a 5 nm film costs a few ppm of capacity over 100 s
    let soh_loss = soh_0 - ext.soh;
    assert!(soh_loss > 0.0);
    assert!(soh_loss < 5e-6, "SOH loss {soh_loss}");
}

#[test]
fn test_cold_fast_charge_triggers_plating() {
    let params = CellParameters::default().with_ambient_c(0.0);
    let model = CellModel::new(params);
    let y0 = new_cell(0.9, 273.0);

    let mut rk4 = Rk4Integrator::<STATE_DIM>::new(0.0, y0.into());
    let mut ext = ExternalState {
        voltage_v: 4.0,
        ..Default::default()
    }
    .with_current(-5.0);

    let onset = (0..60).find(|_| {
        ext = rk4.step(&model, 1.0, &ext).unwrap();
        ext.anode_potential_v < 0.0
    });
    let onset = onset.expect("anode potential should drop below 0 V within a minute");
    assert!(onset > 0, "a 90% cell starts above the plating threshold");
    assert!(ext.plating_current_a < 0.0);

    let mut dead = vec![rk4.state()[6]];
    for _ in 0..10 {
        ext = rk4.step(&model, 1.0, &ext).unwrap();
        dead.push(rk4.state()[6]);
    }
    assert!(dead.iter().all(|q| *q >= 0.0));
    assert!(dead.windows(2).all(|w| w[1] > w[0]), "dead lithium accumulates: {dead:?}");
    assert!(rk4.state()[5] > 0.0, "reversible plated lithium present");
}

#[test]
fn test_sei_passivation_slows_aging() {
    let plan = SimulationPlan::from_json(
        r#"{ "profiles": { "idle": { "lcd": { "brightness": 20 } } }, "timeline": [] }"#,
    )
    .unwrap();
    let params = CellParameters::default();

    let rates: Vec<f64> = [1.0, 0.95, 0.90, 0.85, 0.80]
        .into_iter()
        .map(|soh| {
            let (y0, ext0) = initial_state_for_soh(&params, soh, 1.0).unwrap();
            let model = CellModel::new(params.clone());
            run_static_test(&model, &plan, "idle", y0, ext0, &StaticTestSettings::default())
                .unwrap()
                .loss_rate_per_hour
        })
        .collect();

    assert!(rates.iter().all(|r| *r > 0.0), "{rates:?}");
    assert!(
        rates.windows(2).all(|w| w[1] < w[0]),
        "ageing rate must fall as the film thickens: {rates:?}"
    );
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_soh_never_increases_under_discharge(
        soc in 0.2f64..0.95,
        temperature_k in 263.0f64..323.0,
        current in 0.0f64..5.0,
        dt in 0.1f64..5.0,
    ) {
        let model = CellModel::new(CellParameters::default());
        let y0 = new_cell(soc, temperature_k);
        let mut rk4 = Rk4Integrator::<STATE_DIM>::new(0.0, y0.into());
        let mut ext = ExternalState::default().with_current(current);
        let mut previous = model.state_of_health(&y0);

        for _ in 0..20 {
            ext = rk4.step(&model, dt, &ext).unwrap();
            prop_assert!(ext.soh <= previous, "SOH rose from {} to {}", previous, ext.soh);
            previous = ext.soh;
        }
    }

    #[test]
    fn prop_soc_matches_definition(
        soc in 0.05f64..0.95,
        current in -3.0f64..3.0,
        l_sei in 5e-9f64..2e-6,
        q_dead in 0.0f64..50.0,
    ) {
        let model = CellModel::new(CellParameters::default());
        let y = CellState { l_sei, q_dead, ..new_cell(soc, 298.15) };
        let ext = model.calculate_state(0.0, &y, &ExternalState::default().with_current(current));

        prop_assert_eq!(ext.soc, y.c_s_bar / (ext.c_s_max * ext.soh));
    }
}
