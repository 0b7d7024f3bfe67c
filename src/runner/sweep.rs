//! # Ageing Sweep
//!
//! Runs the static-load test over SOH levels × ambient temperatures × load profiles. Each point
//! is an independent run with its own parameter block and initial state (full charge, cell at
//! ambient). Points fan out on blocking worker threads, bounded by `max_parallel`, and come
//! back in submission order.

use anyhow::{Context, Result};
use itertools::iproduct;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

use super::static_test::{run_static_test, StaticTestSettings};
use crate::config::SweepConfig;
use crate::error::SimError;
use crate::load::SimulationPlan;
use crate::simulation::{initial_state_for_soh, CellModel, CellParameters};

/// SOH a cell may lose before it counts as worn out (100% -> 80%)
pub const END_OF_LIFE_SOH_LOSS: f64 = 0.2;
/// Loss rates at or below this are treated as no ageing
const MIN_AGING_RATE: f64 = 1e-10;
/// Every sweep run starts fully charged
const SWEEP_START_SOC: f64 = 1.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepPoint {
    pub soh: f64,
    pub ambient_c: f64,
    pub profile: String,
}

/// One row of the sweep table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepRecord {
    pub scenario: String,
    pub soh_start: f64,
    pub ambient_c: f64,
    pub avg_battery_temp_c: f64,
    pub aging_rate_per_hour: f64,
    pub temp_rise_c: f64,
    /// Hours until 20% SOH loss at this rate; infinite when the cell does not age
    pub est_life_hours: f64,
}

/// Ageing rate of a scenario relative to the baseline at the same SOH and ambient
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccelerationFactor {
    pub scenario: String,
    pub soh_start: f64,
    pub ambient_c: f64,
    pub factor: f64,
}

pub fn estimated_life_hours(aging_rate_per_hour: f64) -> f64 {
    if aging_rate_per_hour > MIN_AGING_RATE {
        END_OF_LIFE_SOH_LOSS / aging_rate_per_hour
    } else {
        f64::INFINITY
    }
}

/// Cartesian product in SOH → ambient → profile order
pub fn sweep_points(cfg: &SweepConfig, plan: &SimulationPlan) -> Vec<SweepPoint> {
    let profiles: Vec<String> = if cfg.profiles.is_empty() {
        plan.profile_names().map(str::to_string).collect()
    } else {
        cfg.profiles.clone()
    };

    iproduct!(&cfg.soh_levels, &cfg.ambient_c, &profiles)
        .map(|(soh, ambient_c, profile)| SweepPoint {
            soh: *soh,
            ambient_c: *ambient_c,
            profile: profile.clone(),
        })
        .collect()
}

/// Run one point; `Ok(None)` when its profile is missing from the plan
pub fn run_point(
    base: &CellParameters,
    plan: &SimulationPlan,
    point: &SweepPoint,
    settings: &StaticTestSettings,
) -> Result<Option<SweepRecord>, SimError> {
    let params = base.with_ambient_c(point.ambient_c);
    let (y0, ext0) = initial_state_for_soh(&params, point.soh, SWEEP_START_SOC)?;
    let model = CellModel::new(params);

    let result = match run_static_test(&model, plan, &point.profile, y0, ext0, settings) {
        Ok(result) => result,
        Err(SimError::ProfileNotFound(profile)) => {
            warn!(%profile, soh = point.soh, ambient_c = point.ambient_c, "Skipping sweep point, profile not found");
            return Ok(None);
        }
        Err(e) => return Err(e),
    };

    info!(
        profile = %point.profile,
        soh = point.soh,
        ambient_c = point.ambient_c,
        avg_temp_c = result.avg_temperature_c,
        rate = result.loss_rate_per_hour,
        "Sweep point done"
    );

    Ok(Some(SweepRecord {
        scenario: point.profile.clone(),
        soh_start: point.soh,
        ambient_c: point.ambient_c,
        avg_battery_temp_c: result.avg_temperature_c,
        aging_rate_per_hour: result.loss_rate_per_hour,
        temp_rise_c: result.avg_temperature_c - point.ambient_c,
        est_life_hours: estimated_life_hours(result.loss_rate_per_hour),
    }))
}

/// Run every point of the sweep, at most `cfg.max_parallel` at a time
///
/// Every point runs to completion; failed points are logged and the first failure is returned.
pub async fn run_sweep(
    base: Arc<CellParameters>,
    plan: Arc<SimulationPlan>,
    cfg: &SweepConfig,
    settings: StaticTestSettings,
) -> Result<Vec<SweepRecord>> {
    let points = sweep_points(cfg, &plan);
    info!(
        points = points.len(),
        max_parallel = cfg.max_parallel,
        "Starting ageing sweep"
    );

    let semaphore = Arc::new(Semaphore::new(cfg.max_parallel.max(1)));
    let mut handles = Vec::with_capacity(points.len());

    for point in points {
        let permit = semaphore
            .clone()
            .acquire_owned()
            .await
            .context("sweep semaphore closed")?;
        let base = Arc::clone(&base);
        let plan = Arc::clone(&plan);

        handles.push(tokio::task::spawn_blocking(move || {
            let _permit = permit;
            run_point(&base, &plan, &point, &settings)
                .with_context(|| format!("sweep point {point:?} failed"))
        }));
    }

    let mut records = Vec::new();
    let mut first_failure = None;
    for handle in handles {
        match handle.await.map_err(anyhow::Error::from).and_then(|point| point) {
            Ok(Some(record)) => records.push(record),
            Ok(None) => {}
            Err(e) => {
                error!(error = %format!("{e:#}"), "Sweep point failed");
                first_failure.get_or_insert(e);
            }
        }
    }

    if let Some(e) = first_failure {
        return Err(e);
    }
    info!(records = records.len(), "Ageing sweep complete");
    Ok(records)
}

/// Acceleration factor of every record against `baseline` at the same SOH and ambient
///
/// Records without a matching baseline, or whose baseline does not age, are left out.
pub fn acceleration_factors(records: &[SweepRecord], baseline: &str) -> Vec<AccelerationFactor> {
    records
        .iter()
        .filter_map(|record| {
            let base = records.iter().find(|b| {
                b.scenario == baseline
                    && b.soh_start == record.soh_start
                    && b.ambient_c == record.ambient_c
            })?;
            (base.aging_rate_per_hour > MIN_AGING_RATE).then(|| AccelerationFactor {
                scenario: record.scenario.clone(),
                soh_start: record.soh_start,
                ambient_c: record.ambient_c,
                factor: record.aging_rate_per_hour / base.aging_rate_per_hour,
            })
        })
        .collect()
}
