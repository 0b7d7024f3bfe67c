//! End-to-end runs of the static test, the ageing sweep and the charge cycle on the shipped plan.

use std::path::PathBuf;
use std::sync::Arc;

use cell_aging_sim::config::SweepConfig;
use cell_aging_sim::controller::{ChargeController, ChargingConfig, StopReason};
use cell_aging_sim::load::SimulationPlan;
use cell_aging_sim::runner::{
    acceleration_factors, run_cycle, run_static_test, run_sweep, write_csv_file, CycleSettings,
    StaticTestSettings, SweepRecord, TimeSeriesRecord, CHARGING_PROFILE,
};
use cell_aging_sim::simulation::{initial_state_for_soh, CellModel, CellParameters};

fn shipped_plan() -> SimulationPlan {
    SimulationPlan::from_file(PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("plans/cost.json"))
        .unwrap()
}

fn scratch_file(name: &str) -> PathBuf {
    std::env::temp_dir()
        .join(format!("cell-aging-sim-{}", std::process::id()))
        .join(name)
}

#[test]
fn test_static_profiles_on_shipped_plan() {
    let plan = shipped_plan();
    let params = CellParameters::default();
    let settings = StaticTestSettings {
        duration_s: 600.0,
        ..Default::default()
    };

    let run = |profile: &str| {
        let (y0, ext0) = initial_state_for_soh(&params, 0.9, 1.0).unwrap();
        run_static_test(&CellModel::new(params.clone()), &plan, profile, y0, ext0, &settings)
            .unwrap()
    };
    let idle = run("idle_baseline");
    let gaming = run("5g_gaming_heavy");

    for result in [&idle, &gaming] {
        assert_eq!(result.stop, StopReason::DurationReached { time_s: 600.0 });
        assert_eq!(result.steps, 600);
        assert!(result.loss_rate_per_hour > 0.0);
        assert!(result.soh_end < result.soh_start);
    }
    assert!(gaming.avg_temperature_c > idle.avg_temperature_c);
    assert!(gaming.final_ext.soc < idle.final_ext.soc);
    assert!(gaming.final_state.temperature_k > idle.final_state.temperature_k);
}

#[tokio::test]
async fn test_sweep_table_and_acceleration() {
    let plan = Arc::new(shipped_plan());
    let cfg = SweepConfig {
        soh_levels: vec![0.9],
        ambient_c: vec![25.0, 45.0],
        profiles: vec!["idle_baseline".into(), "video_streaming".into()],
        max_parallel: 2,
        ..Default::default()
    };
    let settings = StaticTestSettings {
        duration_s: 300.0,
        ..Default::default()
    };

    let records = run_sweep(Arc::new(CellParameters::default()), plan, &cfg, settings)
        .await
        .unwrap();
    assert_eq!(records.len(), 4);

    let rate = |scenario: &str, ambient_c: f64| {
        records
            .iter()
            .find(|r| r.scenario == scenario && r.ambient_c == ambient_c)
            .map(|r| r.aging_rate_per_hour)
            .unwrap()
    };
    assert!(rate("idle_baseline", 45.0) > rate("idle_baseline", 25.0));
    assert!(rate("video_streaming", 45.0) > rate("video_streaming", 25.0));
    for record in &records {
        assert!(record.avg_battery_temp_c > record.ambient_c - 0.01);
        assert!(record.est_life_hours.is_finite());
    }

    let factors = acceleration_factors(&records, "idle_baseline");
    assert_eq!(factors.len(), 4);
    assert!(factors
        .iter()
        .filter(|f| f.scenario == "idle_baseline")
        .all(|f| (f.factor - 1.0).abs() < 1e-12));

    let path = scratch_file("sweep.csv");
    write_csv_file(&path, &records).unwrap();
    let read_back: Vec<SweepRecord> = csv::Reader::from_path(&path)
        .unwrap()
        .deserialize()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(read_back.len(), records.len());
    assert_eq!(read_back[0].scenario, records[0].scenario);
    std::fs::remove_file(&path).ok();
}

#[test]
fn test_depleted_cell_charges_through_timeline() {
    let plan = shipped_plan();
    let params = CellParameters::default();
    let (y0, ext0) = initial_state_for_soh(&params, 1.0, 0.05).unwrap();
    let model = CellModel::new(params);
    let mut charger = ChargeController::new(ChargingConfig::default());
    let settings = CycleSettings {
        dt_s: 1.0,
        max_time_s: 600.0,
        record_interval_s: 100.0,
    };

    let outcome = run_cycle(&model, &plan, &mut charger, y0, ext0, &settings).unwrap();

    assert!(charger.is_charging());
    assert_eq!(outcome.records.len(), 6);
    assert!(outcome.records.iter().all(|r| r.profile == CHARGING_PROFILE));
    assert!(outcome.records.iter().all(|r| r.current_a < 0.0));
    assert!(outcome.records.windows(2).all(|w| w[1].soc > w[0].soc));
    assert!(outcome.final_state.q_dead == 0.0, "no plating at room temperature");

    let path = scratch_file("cycle.csv");
    write_csv_file(&path, &outcome.records).unwrap();
    let mut reader = csv::Reader::from_path(&path).unwrap();
    let headers = reader.headers().unwrap().clone();
    assert_eq!(&headers[0], "time_s");
    assert!(headers.iter().any(|h| h == "q_dead_c"));
    let rows: Vec<TimeSeriesRecord> = reader.deserialize().collect::<Result<_, _>>().unwrap();
    assert_eq!(rows.len(), 6);
    std::fs::remove_file(&path).ok();
}
