//! # Constant-Voltage Current Solver
//!
//! Finds the charge current that holds the terminal voltage at a limit, by Newton-Raphson on
//!
//! ```text
//! f(I) = U_p(θp) - U_n(θn) - η_n(I) - η_p(I) - I * R_tot - V_limit
//! η_x(I) = (2RT/F) * asinh(I / (2 * A_x * i0_x))
//! ```
//!
//! The exchange currents here are a fixed, simplified estimate (reference electrolyte
//! concentration, no gradient correction, square-root kinetics, no plating branch). They do not
//! match the mode-aware kinetics in [`CellModel::derivatives`]; the mismatch is known and kept.
//!
//! There is no bisection fallback. When the cap is hit the last iterate is returned; [`CvSolution::converged`] says whether the tolerance was met.

use super::cell::CellModel;
use super::ocv::{clamp_stoichiometry, ocv_negative, ocv_positive, positive_stoichiometry};
use super::parameters::{EPS, FARADAY, GAS_CONSTANT};
use super::state::{CellState, ExternalState};
use serde::{Deserialize, Serialize};

/// Electrolyte concentration assumed by the simplified exchange currents (mol/m³)
const REFERENCE_ELECTROLYTE: f64 = 1000.0;
/// Kinetic exponent of the simplified exchange currents
const SOLVER_KINETIC_EXPONENT: f64 = 0.5;

/// Newton-Raphson settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConstantVoltageSolver {
    /// Iteration cap
    pub max_iterations: usize,
    /// Convergence tolerance on the voltage residual (V)
    pub tolerance_v: f64,
    /// Starting current (A), negative = charge
    pub initial_guess_a: f64,
}

impl Default for ConstantVoltageSolver {
    fn default() -> Self {
        Self {
            max_iterations: 10,
            tolerance_v: 1e-4,
            initial_guess_a: -1.0,
        }
    }
}

/// Result of a CV solve
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CvSolution {
    /// Best current estimate (A)
    pub current_a: f64,
    /// Newton updates performed
    pub iterations: usize,
    /// Residual V(I) - V_limit at the returned current (V)
    pub residual_v: f64,
    pub converged: bool,
}

/// Frozen per-solve quantities
struct VoltageCurve {
    ocv: f64,
    rtf2: f64,
    /// 2 * A_n * i0_n
    scale_n: f64,
    /// 2 * A_p * i0_p
    scale_p: f64,
    r_tot: f64,
}

impl VoltageCurve {
    fn new(model: &CellModel, y: &CellState, ext: &ExternalState) -> Self {
        let p = model.params();
        let g = model.geometry();
        let c_s = y.c_s_bar;

        let theta_n = clamp_stoichiometry(c_s / ext.c_s_max);
        let theta_p = positive_stoichiometry(theta_n);

        let base_n = (REFERENCE_ELECTROLYTE * c_s * (p.c_max_neg - c_s)).max(EPS);
        let base_p =
            (REFERENCE_ELECTROLYTE * p.c_max_pos.powi(2) * theta_p * (1.0 - theta_p)).max(EPS);
        let i0_n = p.k0 * ext.ageing * base_n.powf(SOLVER_KINETIC_EXPONENT);
        let i0_p = p.k0 * ext.ageing * base_p.powf(SOLVER_KINETIC_EXPONENT);

        Self {
            ocv: ocv_positive(theta_p) - ocv_negative(theta_n),
            rtf2: 2.0 * GAS_CONSTANT * y.temperature_k / FARADAY,
            scale_n: (2.0 * g.a_surf_neg * i0_n).max(EPS),
            scale_p: (2.0 * g.a_surf_pos * i0_p).max(EPS),
            r_tot: ext.r_tot,
        }
    }

    fn voltage(&self, current: f64) -> f64 {
        let eta_n = self.rtf2 * (current / self.scale_n).asinh();
        let eta_p = self.rtf2 * (current / self.scale_p).asinh();
        self.ocv - eta_n - eta_p - current * self.r_tot
    }

    fn slope(&self, current: f64) -> f64 {
        let arg_n = current / self.scale_n;
        let arg_p = current / self.scale_p;
        let d_eta_n = self.rtf2 / (1.0 + arg_n * arg_n).sqrt() / self.scale_n;
        let d_eta_p = self.rtf2 / (1.0 + arg_p * arg_p).sqrt() / self.scale_p;
        -d_eta_n - d_eta_p - self.r_tot
    }
}

impl ConstantVoltageSolver {
    /// Terminal voltage the solver's simplified model predicts for a current
    pub fn terminal_voltage(
        &self,
        model: &CellModel,
        y: &CellState,
        ext: &ExternalState,
        current_a: f64,
    ) -> f64 {
        VoltageCurve::new(model, y, ext).voltage(current_a)
    }

    /// Newton-Raphson solve with diagnostics
    pub fn solve(
        &self,
        model: &CellModel,
        y: &CellState,
        ext: &ExternalState,
        v_limit: f64,
    ) -> CvSolution {
        let curve = VoltageCurve::new(model, y, ext);
        let mut current = self.initial_guess_a;

        for iteration in 0..self.max_iterations {
            let residual = curve.voltage(current) - v_limit;
            if residual.abs() < self.tolerance_v {
                return CvSolution {
                    current_a: current,
                    iterations: iteration,
                    residual_v: residual,
                    converged: true,
                };
            }
            current -= residual / curve.slope(current);
        }

        let residual = curve.voltage(current) - v_limit;
        CvSolution {
            current_a: current,
            iterations: self.max_iterations,
            residual_v: residual,
            converged: residual.abs() < self.tolerance_v,
        }
    }

    /// Best-effort current at the voltage limit
    pub fn solve_current_at_voltage(
        &self,
        model: &CellModel,
        y: &CellState,
        ext: &ExternalState,
        v_limit: f64,
    ) -> f64 {
        self.solve(model, y, ext, v_limit).current_a
    }
}
