//! Initial conditions from a target state of health and state of charge.
//!
//! All historical capacity loss is attributed to SEI (no initial dead lithium), so the film
//! thickness is back-solved from the SOH and floored at a fresh-cell minimum.

use super::parameters::{CellGeometry, CellParameters, FARADAY};
use super::state::{CellState, ExternalState};
use crate::error::SimError;

/// Thinnest SEI film a formed cell carries (m)
pub const MIN_SEI_THICKNESS: f64 = 5.0e-9;
/// Electrolyte concentration at equilibrium (mol/m³)
pub const EQUILIBRIUM_ELECTROLYTE: f64 = 1000.0;
/// Voltage guess before the first algebraic update (V)
const INITIAL_VOLTAGE_GUESS: f64 = 4.2;

/// Build a consistent `(CellState, ExternalState)` pair
///
/// The cell starts at ambient temperature with no gradient and no plated lithium.
pub fn initial_state_for_soh(
    params: &CellParameters,
    target_soh: f64,
    soc_start: f64,
) -> Result<(CellState, ExternalState), SimError> {
    if !(target_soh > 0.0 && target_soh <= 1.0) {
        return Err(SimError::InvalidInitialCondition(format!(
            "target SOH {target_soh} outside (0, 1]"
        )));
    }
    if !(0.0..=1.0).contains(&soc_start) {
        return Err(SimError::InvalidInitialCondition(format!(
            "starting SOC {soc_start} outside [0, 1]"
        )));
    }

    let geometry = CellGeometry::from_parameters(params);

    // SOH = 1 - Q_lost / Q_nom, Q_lost = A_n * L_SEI / V_SEI * F
    let q_lost = (1.0 - target_soh) * geometry.q_nominal;
    let sei_volume = q_lost * params.v_sei / FARADAY;
    let l_sei = (sei_volume / geometry.a_surf_neg).max(MIN_SEI_THICKNESS);

    let y0 = CellState {
        c_s_bar: soc_start * params.c_max_neg * target_soh,
        c_e_bar: EQUILIBRIUM_ELECTROLYTE,
        temperature_k: params.ambient_k,
        l_sei,
        delta_ce_dyn: 0.0,
        q_rev: 0.0,
        q_dead: 0.0,
    };

    let ext = ExternalState {
        soc: soc_start,
        soh: target_soh,
        voltage_v: INITIAL_VOLTAGE_GUESS,
        c_s_max: params.c_max_neg,
        ageing: 1.0 - l_sei / params.l_neg,
        ..Default::default()
    };

    Ok((y0, ext))
}
