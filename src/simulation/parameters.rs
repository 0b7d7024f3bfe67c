//! # Cell Parameters
//!
//! Geometry, material, kinetic and thermal constants of a single pouch cell inside a
//! handheld device. A parameter block is read-only for the duration of a run: sweeps build
//! a fresh block per point (see [`CellParameters::with_ambient_c`] and
//! [`CellParameters::with_overrides`]) instead of mutating a shared one.

use crate::error::SimError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use validator::Validate;

/// Universal gas constant (J/mol·K)
pub const GAS_CONSTANT: f64 = 8.314;
/// Faraday constant (C/mol)
pub const FARADAY: f64 = 96485.3;
/// Reference temperature for Arrhenius corrections (K)
pub const T_REF: f64 = 298.15;
/// Offset between Celsius and Kelvin
pub const KELVIN_OFFSET: f64 = 273.15;

/// Floor applied to denominators and fractional-power bases
pub const EPS: f64 = 1e-9;

/// Physical configuration of the simulated cell
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default, deny_unknown_fields)]
pub struct CellParameters {
    /// Number of cells in parallel sharing the device load
    #[validate(range(min = 1.0))]
    pub n_parallel: f64,

    /// Electrode plate area (m²)
    #[validate(range(exclusive_min = 0.0))]
    pub area: f64,
    /// Negative electrode thickness (m)
    #[validate(range(exclusive_min = 0.0))]
    pub l_neg: f64,
    /// Separator thickness (m)
    #[validate(range(exclusive_min = 0.0))]
    pub l_sep: f64,
    /// Positive electrode thickness (m)
    #[validate(range(exclusive_min = 0.0))]
    pub l_pos: f64,
    /// Negative particle radius (m)
    #[validate(range(exclusive_min = 0.0))]
    pub r_s_neg: f64,
    /// Positive particle radius (m)
    #[validate(range(exclusive_min = 0.0))]
    pub r_s_pos: f64,

    /// Active material volume fraction, negative electrode
    #[validate(range(exclusive_min = 0.0, max = 1.0))]
    pub eps_s_neg: f64,
    /// Active material volume fraction, positive electrode
    #[validate(range(exclusive_min = 0.0, max = 1.0))]
    pub eps_s_pos: f64,
    /// Electrolyte porosity
    #[validate(range(exclusive_min = 0.0, max = 1.0))]
    pub eps_e: f64,

    /// Maximum lithium concentration, negative electrode (mol/m³)
    #[validate(range(exclusive_min = 0.0))]
    pub c_max_neg: f64,
    /// Maximum lithium concentration, positive electrode (mol/m³)
    #[validate(range(exclusive_min = 0.0))]
    pub c_max_pos: f64,
    /// Cation transference number
    #[validate(range(min = 0.0, max = 1.0))]
    pub t0_pos: f64,
    /// Electrolyte diffusivity at the reference temperature (m²/s)
    #[validate(range(exclusive_min = 0.0))]
    pub d_e_ref: f64,
    /// Separator ionic conductivity (S/m)
    #[validate(range(exclusive_min = 0.0))]
    pub kappa_sep: f64,

    /// Solvent diffusivity through the SEI (m²/s)
    pub d_solv: f64,
    /// SEI molar volume (m³/mol)
    #[validate(range(exclusive_min = 0.0))]
    pub v_sei: f64,
    /// SEI ionic conductivity (S/m)
    #[validate(range(exclusive_min = 0.0))]
    pub kappa_sei: f64,
    /// Activation temperature of SEI growth (K), E_a / R
    pub sei_activation_k: f64,

    /// Intercalation rate constant
    pub k0: f64,
    /// Charge transfer coefficient
    #[validate(range(exclusive_min = 0.0, max = 1.0))]
    pub alpha: f64,

    /// Plating exchange-current coefficient (A/m²)
    pub k_plating: f64,
    /// Plating transfer coefficient
    pub alpha_plating: f64,
    /// Base conversion rate of reversible plated lithium into dead lithium (1/s)
    pub gamma_0: f64,
    /// Time constant of stripping once the plated reserve runs low (s)
    ///
    /// Stripping current is capped at `Q_rev / strip_time_constant_s`. RK4 keeps the taper
    /// stable for `dt` up to about 2.7 times this value.
    #[validate(range(exclusive_min = 0.0))]
    pub strip_time_constant_s: f64,
    /// Reference SEI thickness for the dead-lithium conversion rate (m)
    #[validate(range(exclusive_min = 0.0))]
    pub l_sei_0: f64,

    /// Lumped thermal mass of the device around the cell (kg)
    #[validate(range(exclusive_min = 0.0))]
    pub thermal_mass_kg: f64,
    /// Specific heat of the lumped mass (J/kg·K)
    #[validate(range(exclusive_min = 0.0))]
    pub specific_heat_j_per_kg_k: f64,
    /// Convective heat transfer coefficient (W/m²·K)
    #[validate(range(min = 0.0))]
    pub h_conv: f64,
    /// Cooling surface area (m²)
    #[validate(range(min = 0.0))]
    pub cooling_area: f64,
    /// Ambient temperature (K)
    #[validate(range(min = 200.0, max = 400.0))]
    pub ambient_k: f64,

    /// Fixed tab/contact resistance added to the ohmic path (Ohm)
    #[validate(range(min = 0.0))]
    pub contact_resistance_ohm: f64,
}

impl Default for CellParameters {
    fn default() -> Self {
        Self {
            n_parallel: 6.0,
            area: 0.028359,
            l_neg: 1e-4,
            l_sep: 2.5e-5,
            l_pos: 1e-4,
            r_s_neg: 1e-5,
            r_s_pos: 1e-5,
            eps_s_neg: 0.6,
            eps_s_pos: 0.5,
            eps_e: 0.3,
            c_max_neg: 24983.26,
            c_max_pos: 51217.92,
            t0_pos: 0.4,
            d_e_ref: 2.0e-10,
            kappa_sep: 0.164,
            d_solv: 1.25e-21,
            v_sei: 9.585e-5,
            kappa_sei: 5.0e-6,
            sei_activation_k: 3000.0,
            k0: 1e-5,
            alpha: 0.5,
            k_plating: 1e-4,
            alpha_plating: 0.5,
            gamma_0: 1.0e-4,
            strip_time_constant_s: 1.0,
            l_sei_0: 5.0e-9,
            thermal_mass_kg: 0.150,          // Phone body, not the bare cell
            specific_heat_j_per_kg_k: 900.0,
            h_conv: 5.0,                     // Still air
            cooling_area: 0.0569,
            ambient_k: T_REF,
            contact_resistance_ohm: 0.002,
        }
    }
}

impl CellParameters {
    /// Same cell at a different ambient temperature (°C)
    pub fn with_ambient_c(&self, ambient_c: f64) -> Self {
        Self {
            ambient_k: ambient_c + KELVIN_OFFSET,
            ..self.clone()
        }
    }

    /// Apply named overrides (field name -> value) on top of this block
    ///
    /// Used by sensitivity sweeps. Unknown names are rejected rather than silently ignored.
    pub fn with_overrides(&self, overrides: &BTreeMap<String, f64>) -> Result<Self, SimError> {
        let mut value = serde_json::to_value(self)?;
        let fields = value
            .as_object_mut()
            .ok_or_else(|| SimError::InvalidConfig("cell parameters are not a map".into()))?;

        for (name, override_value) in overrides {
            match fields.get_mut(name) {
                Some(slot) => *slot = serde_json::Value::from(*override_value),
                None => return Err(SimError::UnknownParameter(name.clone())),
            }
        }

        let params: Self = serde_json::from_value(value)?;
        params
            .validate()
            .map_err(|e| SimError::InvalidConfig(e.to_string()))?;
        Ok(params)
    }

    /// Lumped heat capacity m·c_p (J/K)
    pub fn heat_capacity_j_per_k(&self) -> f64 {
        self.thermal_mass_kg * self.specific_heat_j_per_kg_k
    }
}

/// Quantities derived once from [`CellParameters`] at model construction
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CellGeometry {
    /// Electrochemically active surface, negative electrode (m²)
    pub a_surf_neg: f64,
    /// Electrochemically active surface, positive electrode (m²)
    pub a_surf_pos: f64,
    /// Total stack thickness, electrodes plus both separator halves (m)
    pub l_total: f64,
    /// Nominal capacity of the negative electrode (C)
    pub q_nominal: f64,
    /// Ohmic resistance of the electrolyte-filled separator (Ohm)
    pub r_separator: f64,
}

impl CellGeometry {
    pub fn from_parameters(p: &CellParameters) -> Self {
        let l_total = p.l_pos + 2.0 * p.l_sep + p.l_neg;
        Self {
            a_surf_neg: p.area * p.l_neg * 3.0 * p.eps_s_neg / p.r_s_neg,
            a_surf_pos: p.area * p.l_pos * 3.0 * p.eps_s_pos / p.r_s_pos,
            l_total,
            q_nominal: p.eps_s_neg * FARADAY * p.l_neg * p.area * p.c_max_neg,
            r_separator: l_total / (4.0 * p.kappa_sep * p.area),
        }
    }

    /// SEI film resistance for a given film thickness (Ohm)
    pub fn sei_resistance(&self, p: &CellParameters, l_sei: f64) -> f64 {
        l_sei / (self.a_surf_neg * p.kappa_sei).max(EPS)
    }

    /// Charge (C) consumed by an SEI film of the given thickness
    pub fn sei_charge_loss(&self, p: &CellParameters, l_sei: f64) -> f64 {
        self.a_surf_neg * l_sei / p.v_sei * FARADAY
    }
}
