//! # Cell State
//!
//! Two kinds of state flow through a run:
//!
//! - [`CellState`]: the seven integrated quantities, owned by the integrator and advanced one
//!   RK4 step at a time.
//! - [`ExternalState`]: algebraic/observed quantities (current, voltage, SOC, SOH, ...) derived from
//!   a `CellState` after each completed step. The previous step's value is the input to the next
//!   derivative evaluation, so the electrical coupling lags by exactly one step.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Number of integrated quantities
pub const STATE_DIM: usize = 7;

/// Integrated state vector of the cell
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CellState {
    /// Average negative-electrode lithium concentration (mol/m³)
    pub c_s_bar: f64,
    /// Average electrolyte concentration (mol/m³)
    pub c_e_bar: f64,
    /// Cell temperature (K)
    pub temperature_k: f64,
    /// SEI film thickness (m)
    pub l_sei: f64,
    /// Dynamic electrolyte concentration-gradient correction (mol/m³)
    pub delta_ce_dyn: f64,
    /// Reversible (strippable) plated lithium (C)
    pub q_rev: f64,
    /// Irreversible dead lithium (C)
    pub q_dead: f64,
}

impl CellState {
    pub fn to_array(&self) -> [f64; STATE_DIM] {
        [
            self.c_s_bar,
            self.c_e_bar,
            self.temperature_k,
            self.l_sei,
            self.delta_ce_dyn,
            self.q_rev,
            self.q_dead,
        ]
    }

    pub fn from_array(y: &[f64; STATE_DIM]) -> Self {
        Self {
            c_s_bar: y[0],
            c_e_bar: y[1],
            temperature_k: y[2],
            l_sei: y[3],
            delta_ce_dyn: y[4],
            q_rev: y[5],
            q_dead: y[6],
        }
    }
}

impl From<CellState> for [f64; STATE_DIM] {
    fn from(state: CellState) -> Self {
        state.to_array()
    }
}

impl From<[f64; STATE_DIM]> for CellState {
    fn from(y: [f64; STATE_DIM]) -> Self {
        Self::from_array(&y)
    }
}

/// How the cell current is determined between steps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum LoadControl {
    /// Device draws a power; the cell current follows as I = P / V
    #[default]
    Power,
    /// Current is imposed from outside (CC/CV charging, fixed-current tests)
    Current,
}

/// Observed/algebraic cell quantities, recomputed after every integration step
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExternalState {
    /// Cell current (A), positive = discharge
    pub current_a: f64,
    /// Terminal voltage (V)
    pub voltage_v: f64,
    /// Electrolyte diffusivity (m²/s)
    pub d_e: f64,
    /// Total internal resistance (Ohm)
    pub r_tot: f64,
    /// Maximum negative-electrode concentration (mol/m³), constant per run
    pub c_s_max: f64,
    /// Electrical power drawn from this cell (W)
    pub power_w: f64,
    /// Heat injected by the device (W)
    pub heat_w: f64,
    /// State of charge relative to the current (aged) capacity
    pub soc: f64,
    /// State of health, clamped to [0.01, 1]
    pub soh: f64,
    /// Ageing factor scaling the exchange current densities
    pub ageing: f64,
    /// Negative-electrode potential vs. Li/Li+ (V)
    pub anode_potential_v: f64,
    /// Plating (negative) or stripping (positive) current (A)
    pub plating_current_a: f64,
    /// Whether the current is imposed or derived from power
    pub control: LoadControl,
}

impl Default for ExternalState {
    fn default() -> Self {
        Self {
            current_a: 0.0,
            voltage_v: 3.7,
            d_e: 2e-10,
            r_tot: 0.1,
            c_s_max: 24983.26,
            power_w: 0.0,
            heat_w: 0.0,
            soc: 0.7,
            soh: 1.0,
            ageing: 1.0,
            anode_potential_v: 0.1,
            plating_current_a: 0.0,
            control: LoadControl::Power,
        }
    }
}

impl ExternalState {
    /// Impose a fixed current for the next step
    pub fn with_current(self, current_a: f64) -> Self {
        Self {
            current_a,
            control: LoadControl::Current,
            ..self
        }
    }

    /// Draw a power (W per cell) and inject device heat (W) for the next step
    ///
    /// The current is seeded from the last voltage so the first stage already sees the load.
    pub fn with_power(self, power_w: f64, heat_w: f64) -> Self {
        let current_a = if self.voltage_v > 0.1 {
            power_w / self.voltage_v
        } else {
            self.current_a
        };
        Self {
            current_a,
            power_w,
            heat_w,
            control: LoadControl::Power,
            ..self
        }
    }
}
