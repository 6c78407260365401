// src/models/heston.rs
//! Heston Stochastic Volatility Model
//!
//! # Mathematical Framework
//!
//! The Heston model describes asset price evolution with stochastic volatility:
//! ```text
//! dS_t = (r - q) S_t dt + √V_t S_t dW_t^(1)
//! dV_t = κ(θ - V_t) dt + ξ√V_t dW_t^(2)
//! ```
//!
//! Where:
//! - S_t: Asset price
//! - V_t: Instantaneous variance (volatility squared)
//! - κ: Mean reversion speed for variance
//! - θ: Long-term variance level
//! - ξ: Volatility of variance (vol-of-vol)
//! - ρ: Correlation between dW_t^(1) and dW_t^(2)
//!
//! # Pricing PDE
//!
//! With `x = ln S` and τ the time to maturity, the value `u(x, v, τ)` solves
//! ```text
//! ∂u/∂τ = ½v u_xx + (r - q - ½v) u_x + ½ξ²v u_vv + κ(θ - v) u_v + ρξv u_xv - r u
//! ```
//! The log transform removes the `S²` growth of the diffusion coefficient, so a
//! moderately sized mesh covers many standard deviations of the spot.
//!
//! # Feller Condition
//!
//! ```text
//! 2κθ > ξ²
//! ```
//! When violated, variance can touch zero. The PDE stays well-posed because the
//! variance drift at `v = 0` is `κθ > 0`, so the engine only warns.

use super::model::{Coordinate, FdmProcess, PdeCoefficients};
use crate::error::{validation::*, PdeResult};
use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct HestonParams {
    pub s0: f64,    // Initial stock price
    pub v0: f64,    // Initial variance
    pub r: f64,     // Risk-free rate
    pub q: f64,     // Dividend yield
    pub kappa: f64, // Mean reversion speed
    pub theta: f64, // Long-term variance
    pub xi: f64,    // Volatility of variance (vol-of-vol)
    pub rho: f64,   // Correlation between stock and variance
}

impl Default for HestonParams {
    fn default() -> Self {
        HestonParams {
            s0: 100.0,
            v0: 0.04,
            r: 0.05,
            q: 0.0,
            kappa: 1.5,
            theta: 0.04,
            xi: 0.3,
            rho: -0.7,
        }
    }
}

impl HestonParams {
    pub fn feller_satisfied(&self) -> bool {
        2.0 * self.kappa * self.theta > self.xi * self.xi
    }
}

#[derive(Clone, Debug)]
pub struct Heston {
    pub params: HestonParams,
}

impl Heston {
    pub fn new(params: HestonParams) -> PdeResult<Self> {
        Self::validate_params(&params)?;

        if !params.feller_satisfied() {
            warn!(
                kappa = params.kappa,
                theta = params.theta,
                xi = params.xi,
                "Feller condition violated (2κθ ≤ ξ²); variance may reach zero"
            );
        }

        Ok(Heston { params })
    }

    /// Validate Heston parameters
    fn validate_params(params: &HestonParams) -> PdeResult<()> {
        validate_positive("s0", params.s0)?;
        validate_non_negative("v0", params.v0)?;
        validate_finite("r", params.r)?;
        validate_finite("q", params.q)?;
        validate_positive("kappa", params.kappa)?;
        validate_positive("theta", params.theta)?;
        validate_positive("xi", params.xi)?;
        validate_correlation("rho", params.rho)?;

        Ok(())
    }
}

impl FdmProcess for Heston {
    fn coordinates(&self) -> [Coordinate; 2] {
        [Coordinate::Log, Coordinate::Linear]
    }

    fn coefficients(&self, _x: f64, v: f64, _t: f64) -> PdeCoefficients {
        let p = &self.params;
        PdeCoefficients {
            drift: [p.r - p.q - 0.5 * v, p.kappa * (p.theta - v)],
            diffusion: [0.5 * v, 0.5 * p.xi * p.xi * v],
            cross: p.rho * p.xi * v,
            discount: p.r,
        }
    }

    fn name(&self) -> &'static str {
        "Heston"
    }
}
