//! Device load model
//!
//! Turns a handset's component states into the electrical power and heat the cell sees.

pub mod device;
pub mod plan;

pub use device::{DeviceState, PowerDraw};
pub use plan::{LoadProvider, LoadSample, SimulationPlan, StaticLoad, TimelineEvent};
