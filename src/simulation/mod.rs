//! # Cell Simulation Core
//!
//! Coupled electrochemical, thermal and ageing model of a single lithium-ion cell, advanced with
//! a fixed-step RK4 integrator.
//!
//! ## Components
//!
//! - **OCV**: Closed-form electrode open-circuit potentials
//! - **Parameters**: Immutable per-run cell constants and derived geometry
//! - **State**: The seven integrated quantities and the observed/algebraic state
//! - **Cell**: Derivatives, the post-step algebraic update and plating/stripping mode selection
//! - **Integrator**: Generic `OdeSystem` trait and RK4 stepper
//! - **CV solver**: Newton-Raphson current at a voltage limit
//! - **Initial**: Consistent starting state for a target SOH/SOC
//!
//! ## Usage
//!
//! ```rust
//! use cell_aging_sim::simulation::{
//!     initial_state_for_soh, CellModel, CellParameters, Rk4Integrator, STATE_DIM,
//! };
//!
//! let params = CellParameters::default().with_ambient_c(35.0);
//! let (y0, mut ext) = initial_state_for_soh(&params, 0.95, 1.0).unwrap();
//! let model = CellModel::new(params);
//!
//! let mut rk4 = Rk4Integrator::<STATE_DIM>::new(0.0, y0.into());
//! for _ in 0..60 {
//!     ext = rk4.step(&model, 1.0, &ext.with_current(1.0)).unwrap();
//! }
//! assert!(ext.soc < 1.0);
//! ```

pub mod cell;
pub mod cv_solver;
pub mod initial;
pub mod integrator;
pub mod ocv;
pub mod parameters;
pub mod state;

pub use cell::{CellModel, KineticsMode};
pub use cv_solver::{ConstantVoltageSolver, CvSolution};
pub use initial::initial_state_for_soh;
pub use integrator::{OdeSystem, Rk4Integrator};
pub use parameters::{CellGeometry, CellParameters};
pub use state::{CellState, ExternalState, LoadControl, STATE_DIM};
