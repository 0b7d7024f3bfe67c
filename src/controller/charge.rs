//! # CC/CV Charge Controller
//!
//! Decides, before every integration step, whether the charger owns the cell current.
//!
//! - **Start**: SOC below `start_soc` or terminal voltage below `start_voltage_v`.
//! - **While charging**: `I = min(max(I_cc, I_cv), 0)`. `I_cc` is the constant-current target and
//!   `I_cv` the current that holds the terminal voltage at the CV limit. The smaller magnitude
//!   wins, so the charger tapers once the CV limit is reached.
//! - **Stop**: the commanded current has tapered below `stop_current_a` and SOC is above
//!   `stop_soc`. The stopping step is commanded at 0 A; the device load resumes on the next step.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use tracing::{debug, info};
use validator::Validate;

use crate::simulation::cell::CellModel;
use crate::simulation::cv_solver::ConstantVoltageSolver;
use crate::simulation::state::{CellState, ExternalState};

/// Charger settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ChargingConfig {
    /// Constant-current target (A), negative = charge
    #[validate(range(max = 0.0))]
    pub cc_current_a: f64,
    /// Constant-voltage limit (V)
    #[validate(range(min = 3.0, max = 5.0))]
    pub cv_limit_v: f64,
    /// Start charging below this SOC
    #[validate(range(min = 0.0, max = 1.0))]
    pub start_soc: f64,
    /// Start charging below this terminal voltage (V)
    #[validate(range(min = 0.0))]
    pub start_voltage_v: f64,
    /// Stop once |I| tapers below this (A)
    #[validate(range(min = 0.0))]
    pub stop_current_a: f64,
    /// ...and SOC is above this
    #[validate(range(min = 0.0, max = 1.0))]
    pub stop_soc: f64,
    /// Share of charging power dissipated as heat in the device
    #[validate(range(min = 0.0, max = 1.0))]
    pub heat_ratio: f64,
    /// Newton-Raphson settings for the CV current
    pub solver: ConstantVoltageSolver,
}

impl Default for ChargingConfig {
    fn default() -> Self {
        Self {
            cc_current_a: -2.5,
            cv_limit_v: 4.4,
            start_soc: 0.10,
            start_voltage_v: 2.7,
            stop_current_a: 0.005,
            stop_soc: 0.93,
            heat_ratio: 0.8,
            solver: ConstantVoltageSolver::default(),
        }
    }
}

/// Whether the charger or the device load drives the cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum ChargePhase {
    #[default]
    Discharging,
    Charging,
}

/// Hysteretic CC/CV charger
#[derive(Debug, Clone)]
pub struct ChargeController {
    config: ChargingConfig,
    phase: ChargePhase,
}

impl ChargeController {
    pub fn new(config: ChargingConfig) -> Self {
        Self {
            config,
            phase: ChargePhase::Discharging,
        }
    }

    pub fn phase(&self) -> ChargePhase {
        self.phase
    }

    pub fn is_charging(&self) -> bool {
        self.phase == ChargePhase::Charging
    }

    /// Update the phase and, while charging, return the external state for the next step
    ///
    /// `None` means the device load drives this step.
    pub fn command(
        &mut self,
        t: f64,
        model: &CellModel,
        y: &CellState,
        ext: &ExternalState,
    ) -> Option<ExternalState> {
        let cfg = &self.config;

        if self.phase == ChargePhase::Discharging
            && (ext.soc < cfg.start_soc || ext.voltage_v < cfg.start_voltage_v)
        {
            info!(
                time_s = t,
                soc = ext.soc,
                voltage_v = ext.voltage_v,
                "Start charging"
            );
            self.phase = ChargePhase::Charging;
        }

        if self.phase == ChargePhase::Discharging {
            return None;
        }

        let cv = cfg.solver.solve(model, y, ext, cfg.cv_limit_v);
        if !cv.converged {
            debug!(
                time_s = t,
                iterations = cv.iterations,
                residual_v = cv.residual_v,
                "CV solve hit iteration cap"
            );
        }

        let mut target = cfg.cc_current_a.max(cv.current_a).min(0.0);

        if target.abs() < cfg.stop_current_a && ext.soc > cfg.stop_soc {
            info!(time_s = t, soc = ext.soc, "Stop charging");
            self.phase = ChargePhase::Discharging;
            target = 0.0;
        }

        let power_w = target * ext.voltage_v;
        Some(ExternalState {
            power_w,
            heat_w: power_w.abs() * cfg.heat_ratio,
            ..ext.with_current(target)
        })
    }
}
