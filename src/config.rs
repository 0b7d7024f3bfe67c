use anyhow::{bail, Context, Result};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use validator::{Validate, ValidationError};

use crate::controller::ChargingConfig;
use crate::error::SimError;
use crate::simulation::CellParameters;

pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";
pub const ENV_PREFIX: &str = "CELLSIM__";

/// Effective application configuration: defaults, then TOML, then `CELLSIM__` environment
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct Config {
    #[validate(nested)]
    pub cell: CellParameters,
    #[validate(nested)]
    pub simulation: SimulationConfig,
    #[validate(nested)]
    pub charging: ChargingConfig,
    #[validate(nested)]
    pub sweep: SweepConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct SimulationConfig {
    /// Load plan (profiles + timeline) JSON
    pub plan_path: PathBuf,
    #[validate(range(exclusive_min = 0.0))]
    pub dt_s: f64,
    #[validate(range(exclusive_min = 0.0))]
    pub max_time_s: f64,
    #[validate(range(exclusive_min = 0.0))]
    pub record_interval_s: f64,
    #[validate(range(exclusive_min = 0.0))]
    pub static_duration_s: f64,
    pub low_voltage_cutoff_v: f64,
    #[validate(range(exclusive_min = 0.0, max = 1.0))]
    pub initial_soh: f64,
    #[validate(range(min = 0.0, max = 1.0))]
    pub initial_soc: f64,
    pub output_path: PathBuf,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            plan_path: PathBuf::from("plans/cost.json"),
            dt_s: 1.0,
            max_time_s: 30_000.0,
            record_interval_s: 100.0,
            static_duration_s: 3600.0,
            low_voltage_cutoff_v: 2.5,
            initial_soh: 1.0,
            initial_soc: 0.8,
            output_path: PathBuf::from("simulation_results.csv"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct SweepConfig {
    #[validate(length(min = 1), custom(function = "validate_soh_levels"))]
    pub soh_levels: Vec<f64>,
    #[validate(length(min = 1))]
    pub ambient_c: Vec<f64>,
    /// Profiles to scan; empty means every profile in the plan
    pub profiles: Vec<String>,
    /// Reference profile for acceleration factors
    pub baseline_profile: Option<String>,
    #[validate(range(exclusive_min = 0.0))]
    pub duration_s: f64,
    #[validate(range(min = 1))]
    pub max_parallel: usize,
    pub output_path: PathBuf,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            soh_levels: vec![1.0, 0.95, 0.90, 0.85, 0.80],
            ambient_c: vec![25.0],
            profiles: Vec::new(),
            baseline_profile: None,
            duration_s: 3600.0,
            max_parallel: 4,
            output_path: PathBuf::from("aging_scan_results.csv"),
        }
    }
}

fn validate_soh_levels(levels: &Vec<f64>) -> Result<(), ValidationError> {
    if levels.iter().all(|soh| *soh > 0.0 && *soh <= 1.0) {
        Ok(())
    } else {
        Err(ValidationError::new("soh_out_of_range"))
    }
}

impl Config {
    /// Load from `path` (must exist) or from the default location (optional)
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let toml = match path {
            Some(path) => {
                if !path.exists() {
                    bail!("config file not found: {}", path.display());
                }
                Toml::file(path)
            }
            None => Toml::file(DEFAULT_CONFIG_PATH),
        };

        let cfg: Config = Figment::from(Serialized::defaults(Config::default()))
            .merge(toml)
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .context("failed to extract configuration")?;

        cfg.validate()
            .map_err(|e| SimError::InvalidConfig(e.to_string()))?;
        Ok(cfg)
    }

    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}
