// src/solvers/craig_sneyd.rs
//! Craig–Sneyd ADI Scheme
//!
//! # Mathematical Framework
//!
//! Douglas stages `Y₀, Y₂` followed by a correction of the mixed term only:
//! ```text
//! Ỹ₀ = Y₀ + μΔτ·L₀₁(Y₂ - U)
//! Ỹ₁ = (I - θΔτ L₀)⁻¹ (Ỹ₀ - θΔτ L₀ U)
//! Ỹ₂ = (I - θΔτ L₁)⁻¹ (Ỹ₁ - θΔτ L₁ U)
//! U' = Ỹ₂
//! ```
//!
//! Without a mixed term `L₀₁ ≡ 0`, `Ỹ₀ = Y₀` and the step is exactly Douglas.

use super::douglas::douglas_stages;
use super::AdiWorkspace;
use crate::error::PdeResult;
use crate::fdm::boundary::BoundaryConditionSet;
use crate::fdm::operator::FdmOperator;
use ndarray::{Array2, Zip};

/// Craig–Sneyd scheme
pub struct CraigSneyd;

impl CraigSneyd {
    #[allow(clippy::too_many_arguments)]
    pub fn step(
        operator: &FdmOperator,
        boundaries: &BoundaryConditionSet,
        u: &Array2<f64>,
        tau: f64,
        dt: f64,
        theta: f64,
        mu: f64,
        ws: &mut AdiWorkspace,
        out: &mut Array2<f64>,
    ) -> PdeResult<()> {
        let tau_next = tau + dt;
        douglas_stages(operator, boundaries, u, tau, dt, theta, ws, out)?;

        // Y₂ - U, then L₀₁ of it
        Zip::from(&mut ws.increment)
            .and(&*out)
            .and(u)
            .for_each(|d, &y, &u| *d = y - u);
        operator.apply_mixed_into(&ws.increment, &mut ws.corrector_full);

        let weight = mu * dt;
        Zip::from(&mut *out)
            .and(&ws.predictor)
            .and(&ws.corrector_full)
            .for_each(|y, &p, &m| *y = p + m * weight);
        boundaries.apply_to(out, operator.mesher(), tau_next);

        ws.sweeps
            .run(operator, boundaries, out, &ws.directional, theta * dt, tau_next)
    }
}
