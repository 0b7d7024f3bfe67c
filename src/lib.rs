//! Electrochemical-thermal-ageing simulator for a single lithium-ion cell under
//! time-varying device load.

pub mod config;
pub mod controller;
pub mod error;
pub mod load;
pub mod runner;
pub mod simulation;
pub mod telemetry;

pub use error::SimError;
