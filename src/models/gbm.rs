// src/models/gbm.rs
//! Lognormal process embedded in the two-factor engine.
//!
//! The variance axis is frozen (no drift, no diffusion, no correlation), so the
//! solution is constant along it and the engine reduces to a one-dimensional
//! Black-Scholes PDE in `x = ln S`. Used as the closed-form reference case.

use super::model::{Coordinate, FdmProcess, PdeCoefficients};
use crate::error::{validation::*, PdeResult};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BlackScholesProcess {
    pub r: f64,
    pub q: f64,
    pub sigma: f64,
}

impl BlackScholesProcess {
    pub fn new(r: f64, q: f64, sigma: f64) -> PdeResult<Self> {
        validate_finite("r", r)?;
        validate_finite("q", q)?;
        validate_positive("sigma", sigma)?;
        Ok(BlackScholesProcess { r, q, sigma })
    }
}

impl FdmProcess for BlackScholesProcess {
    fn coordinates(&self) -> [Coordinate; 2] {
        [Coordinate::Log, Coordinate::Linear]
    }

    fn coefficients(&self, _x: f64, _y: f64, _t: f64) -> PdeCoefficients {
        let var = self.sigma * self.sigma;
        PdeCoefficients {
            drift: [self.r - self.q - 0.5 * var, 0.0],
            diffusion: [0.5 * var, 0.0],
            cross: 0.0,
            discount: self.r,
        }
    }

    fn name(&self) -> &'static str {
        "Black-Scholes"
    }
}
