use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

/// Immutable configuration of one integration run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProblemParameters {
    /// Number of equations.
    pub neq: usize,
    /// Number of time steps covering `[ti, tf]`.
    pub nt: usize,
    pub ti: f64,
    pub tf: f64,
    pub dt: f64,
}

impl ProblemParameters {
    /// Uniform grid of `nt` steps over `[ti, tf]`.
    pub fn new(neq: usize, nt: usize, ti: f64, tf: f64) -> Result<Self> {
        if nt == 0 {
            bail!("nt must be greater than zero.");
        }
        Self::with_dt(neq, nt, ti, tf, (tf - ti) / nt as f64)
    }

    pub fn with_dt(neq: usize, nt: usize, ti: f64, tf: f64, dt: f64) -> Result<Self> {
        let params = Self {
            neq,
            nt,
            ti,
            tf,
            dt,
        };
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> Result<()> {
        if self.neq == 0 {
            bail!("neq must be greater than zero.");
        }
        if self.nt == 0 {
            bail!("nt must be greater than zero.");
        }
        if !self.ti.is_finite() || !self.tf.is_finite() {
            bail!("ti and tf must be finite (got ti = {}, tf = {}).", self.ti, self.tf);
        }
        if self.ti > self.tf {
            bail!("ti must not exceed tf (got ti = {}, tf = {}).", self.ti, self.tf);
        }
        if !self.dt.is_finite() || self.dt <= 0.0 {
            bail!("dt must be positive (got {}).", self.dt);
        }
        Ok(())
    }

    /// Time after `step` uniform steps from `ti`.
    pub fn time_at(&self, step: usize) -> f64 {
        self.ti + step as f64 * self.dt
    }
}
