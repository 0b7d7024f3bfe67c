//! # Electrochemical-Thermal Cell Model
//!
//! Single-particle model with electrolyte correction (SPMe flavour), lumped thermal balance,
//! SEI growth and lithium plating/stripping bookkeeping.
//!
//! ## State equations
//!
//! ```text
//! d(c_s)/dt    = -I_int / (eps_s,n * SOH * F * L_n * A)
//! d(c_e)/dt    = (1 - t0) / (eps_e * F) * (I / L_p - I / L_n)
//! d(T)/dt      = (I² R_tot N_par + Q_dev - h A_cool (T - T_amb)) / (m c_p)
//! d(L_SEI)/dt  = c_s * D_solv * exp(-E/R (1/T - 1/T_ref)) * V_SEI / (2 L_SEI)
//! d(δc_e)/dt   = (δc_e,target - δc_e) / tau_diff,   tau_diff = L_tot² / (20 D_e)
//! d(Q_rev)/dt  = -I_pl - gamma * max(Q_rev, 0),      gamma = gamma_0 * L_SEI,0 / L_SEI
//! d(Q_dead)/dt = gamma * max(Q_rev, 0)
//! I_strip      = min(I, Q_rev / tau_strip)
//! ```
//!
//! `I`, `Q_dev`, `R_tot` and `D_e` come from the *previous* [`ExternalState`]; they are held fixed
//! across the four RK4 stages.
//!
//! ## Numeric policy
//!
//! Nothing in here returns an error for a numeric edge case. Denominators and fractional-power
//! bases are floored at [`EPS`] and log arguments are kept positive, so a long unattended sweep
//! degrades to floor values instead of aborting. Tests pin this behaviour down.

use super::integrator::OdeSystem;
use super::ocv::{clamp_stoichiometry, ocv_negative, ocv_positive, positive_stoichiometry};
use super::parameters::{CellGeometry, CellParameters, EPS, FARADAY, GAS_CONSTANT, T_REF};
use super::state::{CellState, ExternalState, LoadControl, STATE_DIM};
use serde::{Deserialize, Serialize};

/// Minimum Q_rev (C) for stripping to take over the discharge current
pub const STRIPPING_THRESHOLD_C: f64 = 1e-5;
/// Lower clamp of the state of health
pub const SOH_MIN: f64 = 0.01;
/// Below this |V| the power-to-current loop is not closed
const MIN_VOLTAGE_FOR_POWER_V: f64 = 0.1;

/// Which reaction carries the negative-electrode current during one derivative evaluation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum KineticsMode {
    /// Anode below 0 V vs. Li/Li+: part of the charge current deposits metallic lithium
    Plating { plating_current_a: f64 },
    /// Discharge with reversible plated lithium available: it dissolves first, at up to the
    /// full current while the reserve lasts
    Stripping { stripping_current_a: f64 },
    /// Plain intercalation
    Normal,
}

impl KineticsMode {
    /// Current attributed to plating (negative) or stripping (positive)
    pub fn plating_current(&self) -> f64 {
        match *self {
            KineticsMode::Plating { plating_current_a } => plating_current_a,
            KineticsMode::Stripping { stripping_current_a } => stripping_current_a,
            KineticsMode::Normal => 0.0,
        }
    }

    /// Current left for intercalation, so that plating + intercalation = total
    pub fn intercalation_current(&self, total_current_a: f64) -> f64 {
        match *self {
            KineticsMode::Plating { plating_current_a } => total_current_a - plating_current_a,
            KineticsMode::Stripping { stripping_current_a } => {
                total_current_a - stripping_current_a
            }
            KineticsMode::Normal => total_current_a,
        }
    }

}

/// Single-cell electrochemical-thermal-ageing model
#[derive(Debug, Clone)]
pub struct CellModel {
    params: CellParameters,
    geometry: CellGeometry,
}

impl CellModel {
    pub fn new(params: CellParameters) -> Self {
        let geometry = CellGeometry::from_parameters(&params);
        Self { params, geometry }
    }

    pub fn params(&self) -> &CellParameters {
        &self.params
    }

    pub fn geometry(&self) -> &CellGeometry {
        &self.geometry
    }

    /// 2RT/F, the voltage scale of the symmetric Butler-Volmer inversion
    fn thermal_voltage(temperature_k: f64) -> f64 {
        2.0 * GAS_CONSTANT * temperature_k / FARADAY
    }

    /// Negative-electrode exchange current density (A/m²)
    fn exchange_current_neg(&self, c_e: f64, c_s: f64, ageing: f64) -> f64 {
        let p = &self.params;
        let base = (c_e * c_s * (p.c_max_neg - c_s)).max(EPS);
        p.k0 * ageing * base.powf(p.alpha)
    }

    /// Positive-electrode exchange current density (A/m²)
    fn exchange_current_pos(&self, c_e: f64, theta_p: f64, ageing: f64) -> f64 {
        let p = &self.params;
        let base = (c_e * p.c_max_pos.powi(2) * theta_p * (1.0 - theta_p)).max(EPS);
        p.k0 * ageing * base.powf(p.alpha)
    }

    /// Negative-electrode potential vs. Li/Li+ (V) for a state and the applied current
    ///
    /// OCV + charge-transfer overpotential + ohmic drop across the SEI film. Negative values
    /// mean lithium metal is thermodynamically favoured over intercalation.
    pub fn anode_potential(&self, y: &CellState, ext: &ExternalState) -> f64 {
        let p = &self.params;
        let i0_n = self.exchange_current_neg(y.c_e_bar - y.delta_ce_dyn, y.c_s_bar, ext.ageing);

        let j_n = ext.current_a / self.geometry.a_surf_neg;
        let eta_n = Self::thermal_voltage(y.temperature_k) * (j_n / (2.0 * i0_n.max(EPS))).asinh();

        let u_n = ocv_negative(clamp_stoichiometry(y.c_s_bar / p.c_max_neg));
        let v_drop_sei = ext.current_a * self.geometry.sei_resistance(p, y.l_sei);

        u_n + eta_n + v_drop_sei
    }

    /// Select plating, stripping or normal intercalation for this evaluation
    pub fn classify_mode(&self, y: &CellState, ext: &ExternalState) -> KineticsMode {
        let phi_anode = self.anode_potential(y, ext);
        self.mode_for_potential(phi_anode, y, ext)
    }

    fn mode_for_potential(&self, phi_anode: f64, y: &CellState, ext: &ExternalState) -> KineticsMode {
        let p = &self.params;
        if phi_anode < 0.0 {
            // Cathodic Tafel branch only; grows without bound as phi drops
            let exp_term = (-p.alpha_plating * FARADAY * phi_anode
                / (GAS_CONSTANT * y.temperature_k.max(EPS)))
            .exp();
            KineticsMode::Plating {
                plating_current_a: -p.k_plating * p.area * exp_term,
            }
        } else if ext.current_a > 0.0 && y.q_rev > STRIPPING_THRESHOLD_C {
            // Tapers to zero with the reserve; the remainder intercalates
            let reserve_limit_a = y.q_rev / p.strip_time_constant_s.max(EPS);
            KineticsMode::Stripping {
                stripping_current_a: ext.current_a.min(reserve_limit_a),
            }
        } else {
            KineticsMode::Normal
        }
    }

    /// Time derivatives of the seven states
    pub fn derivatives(&self, _t: f64, y: &CellState, ext: &ExternalState) -> CellState {
        let p = &self.params;
        let g = &self.geometry;
        let current = ext.current_a;
        let l_sei = y.l_sei.max(EPS);
        let d_e = ext.d_e;

        let mode = self.classify_mode(y, ext);
        let i_plating = mode.plating_current();
        let i_intercalation = mode.intercalation_current(current);

        let dcs_dt = -i_intercalation
            / (p.eps_s_neg * ext.soh.max(EPS) * FARADAY * p.l_neg * p.area);

        // Plating is assumed not to disturb the electrolyte profile
        let dce_dt = (1.0 - p.t0_pos) / (p.eps_e * FARADAY) * (current / p.l_pos - current / p.l_neg);

        let heat_gen = current.powi(2) * ext.r_tot * p.n_parallel + ext.heat_w;
        let heat_loss = p.h_conv * p.cooling_area * (y.temperature_k - p.ambient_k);
        let dt_dt = (heat_gen - heat_loss) / p.heat_capacity_j_per_k();

        let arrhenius =
            (-p.sei_activation_k * (1.0 / y.temperature_k.max(EPS) - 1.0 / T_REF)).exp();
        let dlsei_dt = y.c_s_bar * p.d_solv * arrhenius * p.v_sei / (2.0 * l_sei);

        // Floors sit on the denominators; a physical D_e (~1e-10) is itself below EPS
        let delta_ce_target = (1.0 - p.t0_pos) / (2.0 * FARADAY * d_e).max(EPS) * (current * p.l_sep);
        let tau_diff = g.l_total.powi(2) / (20.0 * d_e).max(EPS);
        let ddelta_dt = (delta_ce_target - y.delta_ce_dyn) / tau_diff;

        // Thicker SEI passivates plated lithium and slows its conversion to dead lithium
        let gamma = p.gamma_0 * (p.l_sei_0 / l_sei);
        let decay_rate = gamma * y.q_rev.max(0.0);
        let dqrev_dt = -i_plating - decay_rate;
        let dqdead_dt = decay_rate;

        CellState {
            c_s_bar: dcs_dt,
            c_e_bar: dce_dt,
            temperature_k: dt_dt,
            l_sei: dlsei_dt,
            delta_ce_dyn: ddelta_dt,
            q_rev: dqrev_dt,
            q_dead: dqdead_dt,
        }
    }

    /// State of health from SEI and dead-lithium capacity loss
    pub fn state_of_health(&self, y: &CellState) -> f64 {
        let q_lost_sei = self.geometry.sei_charge_loss(&self.params, y.l_sei);
        let q_lost = q_lost_sei + y.q_dead;
        (1.0 - q_lost / self.geometry.q_nominal).clamp(SOH_MIN, 1.0)
    }

    /// Electrolyte diffusivity at temperature (m²/s)
    pub fn electrolyte_diffusivity(&self, temperature_k: f64) -> f64 {
        self.params.d_e_ref * (-1.0 / temperature_k.max(EPS) + 1.0 / T_REF).exp()
    }

    /// Derive the observed quantities for a freshly integrated state
    ///
    /// Takes the previous external state by reference and returns a new value; the input is
    /// never modified.
    pub fn calculate_state(&self, _t: f64, y: &CellState, ext: &ExternalState) -> ExternalState {
        let p = &self.params;
        let g = &self.geometry;
        let mut next = *ext;

        next.soh = self.state_of_health(y);
        next.ageing = 1.0 - y.l_sei / p.l_neg;
        // Not clamped; may overshoot [0, 1] near the ends of a charge
        next.soc = y.c_s_bar / (ext.c_s_max * next.soh);
        next.d_e = self.electrolyte_diffusivity(y.temperature_k);
        next.r_tot = g.r_separator + g.sei_resistance(p, y.l_sei) + p.contact_resistance_ohm;

        let current = ext.current_a;
        let rtf2 = Self::thermal_voltage(y.temperature_k);

        let theta_n = clamp_stoichiometry(y.c_s_bar / ext.c_s_max);
        let theta_p = positive_stoichiometry(theta_n);
        let u_n = ocv_negative(theta_n);
        let u_p = ocv_positive(theta_p);

        let i0_n = self
            .exchange_current_neg(y.c_e_bar - y.delta_ce_dyn, y.c_s_bar, next.ageing)
            .max(EPS);
        let i0_p = self
            .exchange_current_pos(y.c_e_bar + y.delta_ce_dyn, theta_p, next.ageing)
            .max(EPS);
        let eta_n = rtf2 * (-current / (2.0 * g.a_surf_neg * i0_n)).asinh();
        let eta_p = rtf2 * (current / (2.0 * g.a_surf_pos * i0_p)).asinh();

        // Quasi-steady gradient for the concentration overpotential
        let delta_ce = (1.0 - p.t0_pos) / (2.0 * FARADAY * next.d_e).max(EPS) * (current * p.l_sep);
        let ce_high = (y.c_e_bar + delta_ce).max(EPS);
        let ce_low = (y.c_e_bar - delta_ce).max(EPS);
        let v_conc = rtf2 * (1.0 - p.t0_pos) * (ce_high / ce_low).ln();

        next.voltage_v = u_p - u_n + eta_p - eta_n + v_conc - current * next.r_tot;

        let phi_anode = self.anode_potential(y, ext);
        next.anode_potential_v = phi_anode;
        next.plating_current_a = self.mode_for_potential(phi_anode, y, ext).plating_current();

        if next.voltage_v.abs() > MIN_VOLTAGE_FOR_POWER_V && ext.control == LoadControl::Power {
            next.current_a = next.power_w / next.voltage_v;
        }

        next
    }
}

impl OdeSystem<STATE_DIM> for CellModel {
    type Input = ExternalState;

    fn derivatives(&self, t: f64, y: &[f64; STATE_DIM], input: &ExternalState) -> [f64; STATE_DIM] {
        CellModel::derivatives(self, t, &CellState::from_array(y), input).to_array()
    }

    fn calculate_state(&self, t: f64, y: &[f64; STATE_DIM], input: &ExternalState) -> ExternalState {
        CellModel::calculate_state(self, t, &CellState::from_array(y), input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::integrator::Rk4Integrator;
    use approx::assert_relative_eq;
    use proptest::prelude::*;
    use rstest::rstest;

    fn model() -> CellModel {
        CellModel::new(CellParameters::default())
    }

    fn fresh_state(soc: f64, temperature_k: f64) -> CellState {
        CellState {
            c_s_bar: soc * 24983.26,
            c_e_bar: 1000.0,
            temperature_k,
            l_sei: 5e-9,
            delta_ce_dyn: 0.0,
            q_rev: 0.0,
            q_dead: 0.0,
        }
    }

    #[test]
    fn test_rest_has_no_concentration_or_heat_drive() {
        let m = model();
        let y = fresh_state(0.8, 298.15);
        let ext = ExternalState::default();

        let dy = m.derivatives(0.0, &y, &ext);

        assert_eq!(dy.c_s_bar, 0.0);
        assert_eq!(dy.c_e_bar, 0.0);
        assert_eq!(dy.temperature_k, 0.0);
        assert!(dy.l_sei > 0.0, "SEI keeps growing at rest");
        assert_eq!(dy.q_rev, 0.0);
        assert_eq!(dy.q_dead, 0.0);
    }

    #[test]
    fn test_discharge_depletes_anode_and_heats() {
        let m = model();
        let y = fresh_state(0.8, 298.15);
        let ext = ExternalState::default().with_current(1.0);

        let dy = m.derivatives(0.0, &y, &ext);

        assert!(dy.c_s_bar < 0.0);
        assert!(dy.temperature_k > 0.0);
        assert!(dy.delta_ce_dyn > 0.0);
        assert_eq!(m.classify_mode(&y, &ext), KineticsMode::Normal);
    }

    #[test]
    fn test_cold_fast_charge_plates() {
        let m = model();
        let y = fresh_state(0.95, 273.0);
        let ext = ExternalState::default().with_current(-5.0);

        assert!(m.anode_potential(&y, &ext) < 0.0);
        let mode = m.classify_mode(&y, &ext);
        assert!(matches!(mode, KineticsMode::Plating { plating_current_a } if plating_current_a < 0.0));

        let dy = m.derivatives(0.0, &y, &ext);
        assert!(dy.q_rev > 0.0, "plating accumulates reversible lithium");
    }

    #[test]
    fn test_discharge_strips_reversible_lithium() {
        let m = model();
        let y = CellState {
            q_rev: 5.0,
            ..fresh_state(0.5, 298.15)
        };
        let ext = ExternalState::default().with_current(0.8);

        let mode = m.classify_mode(&y, &ext);
        assert_eq!(mode, KineticsMode::Stripping { stripping_current_a: 0.8 });

        let dy = m.derivatives(0.0, &y, &ext);
        assert_eq!(dy.c_s_bar, 0.0, "stripping leaves the graphite untouched");
        assert!(dy.q_rev < 0.0);
        assert!(dy.q_dead > 0.0);
    }

    #[test]
    fn test_stripping_tapers_with_small_reserve() {
        let m = model();
        let y = CellState {
            q_rev: 0.2,
            ..fresh_state(0.5, 298.15)
        };
        let ext = ExternalState::default().with_current(0.8);

        let mode = m.classify_mode(&y, &ext);
        assert_eq!(mode, KineticsMode::Stripping { stripping_current_a: 0.2 });
        assert_relative_eq!(mode.intercalation_current(0.8), 0.6, max_relative = 1e-12);
        assert!(m.derivatives(0.0, &y, &ext).c_s_bar < 0.0);
    }

    #[test]
    fn test_negative_reserve_never_unwinds_dead_lithium() {
        let m = model();
        let y = CellState {
            q_rev: -0.1,
            q_dead: 0.3,
            ..fresh_state(0.5, 298.15)
        };

        let dy = m.derivatives(0.0, &y, &ExternalState::default().with_current(1.0));
        assert_eq!(dy.q_dead, 0.0);
    }

    #[test]
    fn test_stripping_depletion_keeps_ageing_monotone() {
        let m = model();
        let y0 = CellState {
            q_rev: 1e-3,
            ..fresh_state(0.9, 298.15)
        };
        let mut rk4 = Rk4Integrator::<STATE_DIM>::new(0.0, y0.into());
        let mut ext = ExternalState::default().with_current(1.0);
        let mut previous = y0;
        let mut previous_soh = m.state_of_health(&y0);

        for _ in 0..1800 {
            ext = rk4.step(&m, 1.0, &ext).unwrap();
            let y = CellState::from_array(rk4.state());

            assert!(y.q_rev >= 0.0, "reserve overdrawn: {}", y.q_rev);
            assert!(y.q_dead >= previous.q_dead, "dead lithium shrank");
            assert!(ext.soh <= previous_soh, "SOH rose from {previous_soh} to {}", ext.soh);
            previous = y;
            previous_soh = ext.soh;
        }

        assert!(previous.q_rev < STRIPPING_THRESHOLD_C);
        assert!(previous.q_dead > 0.0);
    }

    #[rstest]
    #[case(5e-9, 1.0)]
    #[case(5e-8, 0.1)]
    #[case(5e-7, 0.01)]
    fn test_dead_lithium_conversion_slows_with_sei(#[case] l_sei: f64, #[case] relative_rate: f64) {
        let m = model();
        let y = CellState {
            l_sei,
            q_rev: 1.0,
            ..fresh_state(0.5, 298.15)
        };
        let dy = m.derivatives(0.0, &y, &ExternalState::default());

        assert_relative_eq!(dy.q_dead, 1e-4 * relative_rate, max_relative = 1e-9);
        assert_relative_eq!(dy.q_rev, -dy.q_dead, max_relative = 1e-12);
    }

    #[test]
    fn test_sei_growth_accelerates_with_temperature() {
        let m = model();
        let cool = m.derivatives(0.0, &fresh_state(0.5, 298.15), &ExternalState::default());
        let hot = m.derivatives(0.0, &fresh_state(0.5, 318.15), &ExternalState::default());
        assert!(hot.l_sei > cool.l_sei);
    }

    #[test]
    fn test_collapsed_sei_and_diffusivity_stay_finite() {
        let m = model();
        let y = CellState {
            l_sei: 0.0,
            ..fresh_state(0.5, 298.15)
        };
        let ext = ExternalState {
            d_e: 0.0,
            soh: 0.0,
            ..ExternalState::default().with_current(1.0)
        };

        let dy = m.derivatives(0.0, &y, &ext).to_array();
        assert!(dy.iter().all(|v| v.is_finite()), "{dy:?}");
    }

    #[test]
    fn test_empty_anode_floors_exchange_current() {
        let m = model();
        // c_s = 0 makes the exchange-current base zero; floored instead of NaN
        let y = CellState {
            c_s_bar: 0.0,
            ..fresh_state(0.5, 298.15)
        };
        let ext = ExternalState::default().with_current(0.5);

        assert!(m.anode_potential(&y, &ext).is_finite());
        let next = m.calculate_state(1.0, &y, &ext);
        assert!(next.voltage_v.is_finite());
    }

    #[test]
    fn test_concentration_log_guarded() {
        let m = model();
        // Electrolyte nearly exhausted; c_e - delta would go negative
        let y = CellState {
            c_e_bar: 0.01,
            ..fresh_state(0.5, 298.15)
        };
        let ext = ExternalState::default().with_current(3.0);

        let next = m.calculate_state(1.0, &y, &ext);
        assert!(next.voltage_v.is_finite());
    }

    #[test]
    fn test_soc_definition() {
        let m = model();
        let y = CellState {
            l_sei: 2e-7,
            q_dead: 10.0,
            ..fresh_state(0.6, 298.15)
        };
        let next = m.calculate_state(0.0, &y, &ExternalState::default());

        assert_eq!(next.soc, y.c_s_bar / (next.c_s_max * next.soh));
        assert!(next.soh < 1.0);
    }

    #[test]
    fn test_soh_clamped() {
        let m = model();
        let y = CellState {
            q_dead: 1e9,
            ..fresh_state(0.5, 298.15)
        };
        assert_eq!(m.state_of_health(&y), SOH_MIN);

        let pristine = CellState {
            l_sei: 0.0,
            ..fresh_state(0.5, 298.15)
        };
        assert_eq!(m.state_of_health(&pristine), 1.0);
    }

    #[test]
    fn test_power_control_closes_current_loop() {
        let m = model();
        let y = fresh_state(0.8, 298.15);
        let ext = ExternalState::default().with_power(2.0, 0.0);

        let next = m.calculate_state(1.0, &y, &ext);
        assert_relative_eq!(next.current_a, 2.0 / next.voltage_v, max_relative = 1e-12);
    }

    #[test]
    fn test_current_control_holds_current() {
        let m = model();
        let y = fresh_state(0.8, 298.15);
        let ext = ExternalState {
            power_w: 10.0,
            ..ExternalState::default().with_current(-1.5)
        };

        let next = m.calculate_state(1.0, &y, &ext);
        assert_eq!(next.current_a, -1.5);
    }

    #[test]
    fn test_calculate_state_does_not_touch_input() {
        let m = model();
        let y = fresh_state(0.8, 298.15);
        let ext = ExternalState::default().with_power(1.0, 0.2);
        let before = ext;

        let _ = m.calculate_state(1.0, &y, &ext);
        assert_eq!(ext, before);
    }

    #[test]
    fn test_resistance_grows_with_sei() {
        let m = model();
        let thin = m.calculate_state(0.0, &fresh_state(0.5, 298.15), &ExternalState::default());
        let thick = m.calculate_state(
            0.0,
            &CellState {
                l_sei: 1e-7,
                ..fresh_state(0.5, 298.15)
            },
            &ExternalState::default(),
        );
        assert!(thick.r_tot > thin.r_tot);
        assert!(thick.ageing < thin.ageing);
    }

    proptest! {
        #[test]
        fn prop_mode_attribution_sums_to_total(
            soc in 0.01f64..0.99,
            temperature_k in 250.0f64..330.0,
            current in -20.0f64..20.0,
            q_rev in 0.0f64..1.0,
        ) {
            let m = model();
            let y = CellState { q_rev, ..fresh_state(soc, temperature_k) };
            let ext = ExternalState::default().with_current(current);

            let phi = m.anode_potential(&y, &ext);
            let mode = m.classify_mode(&y, &ext);
            let total = mode.plating_current() + mode.intercalation_current(current);
            prop_assert!((total - current).abs() <= 1e-9 * (1.0 + current.abs()));

            match mode {
                KineticsMode::Plating { .. } => prop_assert!(phi < 0.0),
                KineticsMode::Stripping { .. } => {
                    prop_assert!(phi >= 0.0 && current > 0.0 && q_rev > STRIPPING_THRESHOLD_C)
                }
                KineticsMode::Normal => prop_assert!(
                    phi >= 0.0 && !(current > 0.0 && q_rev > STRIPPING_THRESHOLD_C)
                ),
            }
        }
    }
}
