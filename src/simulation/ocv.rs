//! # Open-Circuit Voltage Curves
//!
//! Closed-form equilibrium potentials of the two electrodes as a function of their
//! lithiation fraction (theta, 0..1). Graphite negative vs. Li/Li+, layered-oxide positive.
//!
//! Both curves are evaluated on the clamped stoichiometry window returned by
//! [`clamp_stoichiometry`]; outside that window the tanh/exp terms are no longer meaningful.

/// Lower bound of the usable stoichiometry window
pub const THETA_MIN: f64 = 0.001;
/// Upper bound of the usable stoichiometry window
pub const THETA_MAX: f64 = 0.999;

/// Clamp a lithiation fraction into the usable window
pub fn clamp_stoichiometry(theta: f64) -> f64 {
    theta.clamp(THETA_MIN, THETA_MAX)
}

/// Positive-electrode lithiation paired with a given negative-electrode lithiation
///
/// Single-particle cells are balanced so the positive electrode empties as the negative fills.
pub fn positive_stoichiometry(theta_n: f64) -> f64 {
    clamp_stoichiometry(0.4 + 0.585 * (0.99 - theta_n))
}

/// Negative electrode (graphite) open-circuit potential in volts
pub fn ocv_negative(theta: f64) -> f64 {
    0.194 + 1.5 * (-120.0 * theta).exp()
        + 0.0351 * ((theta - 0.286) / 0.083).tanh()
        - 0.0045 * ((theta - 0.849) / 0.119).tanh()
        - 0.035 * ((theta - 0.9233) / 0.05).tanh()
        - 0.0147 * ((theta - 0.5) / 0.034).tanh()
        - 0.102 * ((theta - 0.194) / 0.142).tanh()
        - 0.022 * ((theta - 0.9) / 0.0164).tanh()
        - 0.011 * ((theta - 0.123) / 0.0096).tanh()
}

/// Positive electrode open-circuit potential in volts
pub fn ocv_positive(theta: f64) -> f64 {
    4.04596 + (-42.30027 * theta + 16.56714).exp()
        - 0.04880 * (50.83402 * theta - 24.09702).atan()
        - 0.03544 * (13.274 * theta - 12.878).atan()
        - 0.04444 * theta
        - 0.2058 * (2.6214 * theta - 2.1877).exp()
}

/// Full-cell open-circuit voltage for a negative-electrode lithiation
pub fn ocv_cell(theta_n: f64) -> f64 {
    let theta_n = clamp_stoichiometry(theta_n);
    ocv_positive(positive_stoichiometry(theta_n)) - ocv_negative(theta_n)
}
