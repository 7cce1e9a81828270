//! Reference ODE systems.

use std::f64::consts::PI;

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use crate::params::ProblemParameters;
use crate::traits::OdeSystem;

/// du/dt = −k·u, applied componentwise.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LinearDecay {
    pub rate: f64,
}

impl LinearDecay {
    /// Value after `steps` exact implicit Euler steps: u0 / (1 + k·dt)^n.
    pub fn implicit_euler_exact(&self, u0: f64, dt: f64, steps: usize) -> f64 {
        u0 / (1.0 + self.rate * dt).powf(steps as f64)
    }
}

impl OdeSystem for LinearDecay {
    fn rhs(&self, _t: f64, u: &[f64], _params: &ProblemParameters, out: &mut [f64]) {
        for (o, x) in out.iter_mut().zip(u) {
            *o = -self.rate * x;
        }
    }
}

/// du_i/dt = −(i+1)·t·u_i
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ScaledDecay;

impl ScaledDecay {
    /// Closed-form solution at `t` starting from `u0` at `t0`.
    pub fn exact(&self, t0: f64, u0: &[f64], t: f64) -> Vec<f64> {
        u0.iter()
            .enumerate()
            .map(|(i, &x)| x * (-((i + 1) as f64) * (t * t - t0 * t0) / 2.0).exp())
            .collect()
    }
}

impl OdeSystem for ScaledDecay {
    fn rhs(&self, t: f64, u: &[f64], _params: &ProblemParameters, out: &mut [f64]) {
        for i in 0..out.len() {
            out[i] = -((i + 1) as f64) * t * u[i];
        }
    }
}

/// One-dimensional Brusselator reaction-diffusion system.
///
/// The state stores the `u` species on `neq / 2` interior nodes followed by
/// the `v` species on the same nodes, with grid spacing 1 / (neq + 1).
/// Boundaries are held at the homogeneous steady state u = a, v = b / a.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Brusselator {
    pub a: f64,
    pub b: f64,
    pub alpha: f64,
}

impl Default for Brusselator {
    fn default() -> Self {
        Self {
            a: 1.0,
            b: 3.0,
            alpha: 0.02,
        }
    }
}

impl Brusselator {
    /// Checks that `params` describes a Brusselator grid this system can run on.
    pub fn validate(&self, params: &ProblemParameters) -> Result<()> {
        if params.neq % 2 != 0 {
            bail!(
                "Brusselator needs an even number of equations (got {}).",
                params.neq
            );
        }
        if params.neq < 4 {
            bail!(
                "Brusselator needs at least two nodes per species (got neq = {}).",
                params.neq
            );
        }
        if !self.a.is_finite() || self.a == 0.0 {
            bail!("Brusselator coefficient a must be finite and non-zero (got {}).", self.a);
        }
        Ok(())
    }

    /// u_i = 1 + sin(2π x_i), v_i = 3 with x_i = (i+1)·dx.
    pub fn initial_condition(&self, params: &ProblemParameters) -> Result<Vec<f64>> {
        self.validate(params)?;
        let nx = params.neq / 2;
        let dx = grid_spacing(params);
        let mut state = vec![3.0; params.neq];
        for i in 0..nx {
            state[i] = 1.0 + (2.0 * PI * (i + 1) as f64 * dx).sin();
        }
        Ok(state)
    }
}

fn grid_spacing(params: &ProblemParameters) -> f64 {
    1.0 / (params.neq + 1) as f64
}

impl OdeSystem for Brusselator {
    fn rhs(&self, _t: f64, y: &[f64], params: &ProblemParameters, out: &mut [f64]) {
        let n = params.neq / 2;
        let (u, v) = y.split_at(n);
        let (fu, rest) = out.split_at_mut(n);
        let (fv, unused) = rest.split_at_mut(n);
        // An odd trailing equation is outside the model.
        unused.fill(0.0);

        let dx = grid_spacing(params);
        let diffusion = self.alpha / (dx * dx);
        let u_edge = self.a;
        let v_edge = self.b / self.a;

        for i in 0..n {
            let u_left = if i == 0 { u_edge } else { u[i - 1] };
            let u_right = if i + 1 == n { u_edge } else { u[i + 1] };
            let v_left = if i == 0 { v_edge } else { v[i - 1] };
            let v_right = if i + 1 == n { v_edge } else { v[i + 1] };
            let reaction = u[i] * u[i] * v[i];

            fu[i] = self.a + reaction - (self.b + 1.0) * u[i]
                + diffusion * (u_left - 2.0 * u[i] + u_right);
            fv[i] = self.b * u[i] - reaction + diffusion * (v_left - 2.0 * v[i] + v_right);
        }
    }
}
