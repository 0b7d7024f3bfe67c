//! Run termination: time budget, low-voltage cutoff, exhausted load plan.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::simulation::state::ExternalState;

/// Why a run ended
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum StopReason {
    /// Simulated time reached the configured budget
    DurationReached { time_s: f64 },
    /// Terminal voltage fell below the cutoff
    LowVoltageCutoff { time_s: f64, voltage_v: f64 },
    /// The load plan had no active profile
    OutOfPlan { time_s: f64 },
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StopReason::DurationReached { time_s } => write!(f, "duration reached at t={time_s}s"),
            StopReason::LowVoltageCutoff { time_s, voltage_v } => {
                write!(f, "low-voltage cutoff ({voltage_v:.3} V) at t={time_s}s")
            }
            StopReason::OutOfPlan { time_s } => write!(f, "out of plan at t={time_s}s"),
        }
    }
}

/// Checks a run against its budget after every step
#[derive(Debug, Clone, Copy)]
pub struct Termination {
    max_time_s: f64,
    low_voltage_cutoff_v: Option<f64>,
}

impl Termination {
    pub fn new(max_time_s: f64) -> Self {
        Self {
            max_time_s,
            low_voltage_cutoff_v: None,
        }
    }

    pub fn with_low_voltage_cutoff(mut self, cutoff_v: f64) -> Self {
        self.low_voltage_cutoff_v = Some(cutoff_v);
        self
    }

    /// Duration check, made before each step
    pub fn budget_exhausted(&self, t: f64) -> Option<StopReason> {
        (t >= self.max_time_s).then_some(StopReason::DurationReached { time_s: t })
    }

    /// Post-step check on the freshly computed external state
    pub fn check_cutoff(&self, t: f64, ext: &ExternalState) -> Option<StopReason> {
        let cutoff = self.low_voltage_cutoff_v?;
        if ext.voltage_v < cutoff {
            warn!(
                time_s = t,
                voltage_v = ext.voltage_v,
                cutoff_v = cutoff,
                "Low-voltage cutoff"
            );
            return Some(StopReason::LowVoltageCutoff {
                time_s: t,
                voltage_v: ext.voltage_v,
            });
        }
        None
    }
}
