//! Drivers that turn the cell model into experiments.

pub mod cycle;
pub mod export;
pub mod sweep;

pub use cycle::{run_cycle, CycleOutcome, CycleSettings, TimeSeriesRecord, CHARGING_PROFILE};
pub use export::{write_csv, write_csv_file};
pub use static_test::{run_static_load, run_static_test, StaticTestResult, StaticTestSettings};
pub use sweep::{acceleration_factors, run_sweep, AccelerationFactor, SweepRecord};
