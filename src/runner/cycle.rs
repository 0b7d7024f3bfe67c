//! Full charge/discharge cycle following a load plan.
//!
//! Before every step the charger decides whether it owns the current. Otherwise the active plan
//! profile sets the per-cell power and the device heat. A row is recorded every
//! `record_interval_s` of simulated time.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::SimulationConfig;
use crate::controller::{ChargeController, StopReason, Termination};
use crate::error::SimError;
use crate::load::LoadProvider;
use crate::simulation::{CellModel, CellState, ExternalState, Rk4Integrator, STATE_DIM};

/// Profile label recorded while the charger drives the cell
pub const CHARGING_PROFILE: &str = "CHARGING";

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CycleSettings {
    pub dt_s: f64,
    pub max_time_s: f64,
    pub record_interval_s: f64,
}

impl Default for CycleSettings {
    fn default() -> Self {
        Self {
            dt_s: 1.0,
            max_time_s: 30_000.0,
            record_interval_s: 100.0,
        }
    }
}

impl From<&SimulationConfig> for CycleSettings {
    fn from(cfg: &SimulationConfig) -> Self {
        Self {
            dt_s: cfg.dt_s,
            max_time_s: cfg.max_time_s,
            record_interval_s: cfg.record_interval_s,
        }
    }
}

/// One row of the exported time series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeriesRecord {
    pub time_s: f64,
    pub profile: String,
    pub current_a: f64,
    pub voltage_v: f64,
    pub heat_w: f64,
    pub temperature_k: f64,
    pub soc: f64,
    pub soh: f64,
    pub anode_potential_v: f64,
    pub plating_current_a: f64,
    pub q_rev_c: f64,
    pub q_dead_c: f64,
    pub l_sei_m: f64,
}

impl TimeSeriesRecord {
    fn new(time_s: f64, profile: &str, y: &CellState, ext: &ExternalState) -> Self {
        Self {
            time_s,
            profile: profile.to_string(),
            current_a: ext.current_a,
            voltage_v: ext.voltage_v,
            heat_w: ext.heat_w,
            temperature_k: y.temperature_k,
            soc: ext.soc,
            soh: ext.soh,
            anode_potential_v: ext.anode_potential_v,
            plating_current_a: ext.plating_current_a,
            q_rev_c: y.q_rev,
            q_dead_c: y.q_dead,
            l_sei_m: y.l_sei,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CycleOutcome {
    pub records: Vec<TimeSeriesRecord>,
    pub final_state: CellState,
    pub final_ext: ExternalState,
    pub steps: usize,
    pub stop: StopReason,
}

pub fn run_cycle<L: LoadProvider>(
    model: &CellModel,
    load: &L,
    charger: &mut ChargeController,
    y0: CellState,
    ext0: ExternalState,
    settings: &CycleSettings,
) -> Result<CycleOutcome, SimError> {
    let n_parallel = model.params().n_parallel;
    let termination = Termination::new(settings.max_time_s);
    let record_every = ((settings.record_interval_s / settings.dt_s).round() as usize).max(1);

    let mut rk4 = Rk4Integrator::<STATE_DIM>::new(0.0, y0.into());
    let mut ext = ext0;
    let mut records = Vec::new();
    let mut steps = 0usize;

    let stop = loop {
        let t = rk4.time();
        if let Some(reason) = termination.budget_exhausted(t) {
            break reason;
        }

        let Some(sample) = load.load_at(t) else {
            warn!(time_s = t, "No active load profile");
            break StopReason::OutOfPlan { time_s: t };
        };

        let y = CellState::from_array(rk4.state());
        let (input, profile) = match charger.command(t, model, &y, &ext) {
            Some(charging) => (charging, CHARGING_PROFILE),
            None => {
                let (power_w, heat_w) = sample.per_cell(n_parallel);
                (ext.with_power(power_w, heat_w), sample.profile)
            }
        };

        ext = rk4.step(model, settings.dt_s, &input)?;
        steps += 1;

        if steps % record_every == 0 {
            let y = CellState::from_array(rk4.state());
            records.push(TimeSeriesRecord::new(rk4.time(), profile, &y, &ext));
        }
    };

    let final_state = CellState::from_array(rk4.state());
    info!(
        steps,
        time_s = rk4.time(),
        soc = ext.soc,
        soh = ext.soh,
        q_dead_c = final_state.q_dead,
        stop = %stop,
        "Cycle run finished"
    );

    Ok(CycleOutcome {
        records,
        final_state,
        final_ext: ext,
        steps,
        stop,
    })
}
