//! Charging control and run termination.

pub mod charge;
pub mod termination;

pub use charge::{ChargeController, ChargePhase, ChargingConfig};
pub use termination::{StopReason, Termination};
