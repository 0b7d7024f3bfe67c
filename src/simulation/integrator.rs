//! # Fixed-Step RK4 Integrator
//!
//! Classical fourth-order Runge-Kutta over a fixed-size state vector:
//!
//! ```text
//! k1 = f(t,        y,             u)
//! k2 = f(t + dt/2, y + dt/2 * k1, u)
//! k3 = f(t + dt/2, y + dt/2 * k2, u)
//! k4 = f(t + dt,   y + dt * k3,   u)
//! y' = y + dt/6 * (k1 + 2 k2 + 2 k3 + k4)
//! ```
//!
//! The external input `u` is the same value at all four stages. After the state is advanced the
//! system's algebraic update runs exactly once on the new state and its result is returned.
//! Explicit and non-adaptive: the caller picks `dt` small against the fastest time constant.

use crate::error::SimError;

/// A system that can be advanced by [`Rk4Integrator`]
pub trait OdeSystem<const N: usize> {
    /// Inputs held fixed during a step and refreshed by the algebraic update
    type Input;

    /// dy/dt at `(t, y)` for the given inputs
    fn derivatives(&self, t: f64, y: &[f64; N], input: &Self::Input) -> [f64; N];

    /// Algebraic update run once per completed step
    fn calculate_state(&self, t: f64, y: &[f64; N], input: &Self::Input) -> Self::Input;
}

/// Owns the time and state of one run
#[derive(Debug, Clone)]
pub struct Rk4Integrator<const N: usize> {
    t: f64,
    state: [f64; N],
}

fn offset<const N: usize>(y: &[f64; N], k: &[f64; N], h: f64) -> [f64; N] {
    std::array::from_fn(|i| y[i] + h * k[i])
}

impl<const N: usize> Rk4Integrator<N> {
    pub fn new(t0: f64, y0: [f64; N]) -> Self {
        Self { t: t0, state: y0 }
    }

    /// Current simulated time (s)
    pub fn time(&self) -> f64 {
        self.t
    }

    pub fn state(&self) -> &[f64; N] {
        &self.state
    }

    /// Advance by `dt` and return the refreshed inputs
    ///
    /// Fails fast on a non-positive or non-finite step; nothing else can fail.
    pub fn step<S>(&mut self, system: &S, dt: f64, input: &S::Input) -> Result<S::Input, SimError>
    where
        S: OdeSystem<N>,
    {
        if !(dt.is_finite() && dt > 0.0) {
            return Err(SimError::InvalidTimeStep(dt));
        }

        let t = self.t;
        let y = &self.state;
        let half = 0.5 * dt;

        let k1 = system.derivatives(t, y, input);
        let k2 = system.derivatives(t + half, &offset(y, &k1, half), input);
        let k3 = system.derivatives(t + half, &offset(y, &k2, half), input);
        let k4 = system.derivatives(t + dt, &offset(y, &k3, dt), input);

        self.state = std::array::from_fn(|i| {
            y[i] + dt / 6.0 * (k1[i] + 2.0 * k2[i] + 2.0 * k3[i] + k4[i])
        });
        self.t += dt;

        Ok(system.calculate_state(self.t, &self.state, input))
    }
}
