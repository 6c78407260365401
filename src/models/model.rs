// src/models/model.rs
use serde::{Deserialize, Serialize};

/// The two state dimensions of the pricing PDE.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Dimension {
    /// Primary state variable (asset price)
    Spot,
    /// Secondary state variable (instantaneous variance)
    Variance,
}

impl Dimension {
    pub const ALL: [Dimension; 2] = [Dimension::Spot, Dimension::Variance];

    pub fn index(self) -> usize {
        match self {
            Dimension::Spot => 0,
            Dimension::Variance => 1,
        }
    }

    pub fn other(self) -> Dimension {
        match self {
            Dimension::Spot => Dimension::Variance,
            Dimension::Variance => Dimension::Spot,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Dimension::Spot => "spot",
            Dimension::Variance => "variance",
        }
    }
}

/// Change of variables between a state value and its mesh coordinate.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Coordinate {
    #[default]
    Linear,
    /// Mesh holds `ln(state)`
    Log,
}

impl Coordinate {
    pub fn to_mesh(self, state: f64) -> f64 {
        match self {
            Coordinate::Linear => state,
            Coordinate::Log => state.ln(),
        }
    }

    pub fn to_state(self, mesh: f64) -> f64 {
        match self {
            Coordinate::Linear => mesh,
            Coordinate::Log => mesh.exp(),
        }
    }
}

/// Local coefficients of the backward generator, expressed in mesh coordinates:
///
/// ```text
/// L u = Σ_d diffusion[d]·∂²u/∂x_d² + drift[d]·∂u/∂x_d + cross·∂²u/∂x₀∂x₁ − discount·u
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PdeCoefficients {
    pub drift: [f64; 2],
    pub diffusion: [f64; 2],
    pub cross: f64,
    pub discount: f64,
}

/// A two-factor stochastic process as seen by the finite-difference engine.
pub trait FdmProcess: Send + Sync {
    /// Mesh coordinate used for each dimension (`[spot, variance]`).
    fn coordinates(&self) -> [Coordinate; 2];

    /// Generator coefficients at mesh point `(x, y)` and calendar time `t`.
    fn coefficients(&self, x: f64, y: f64, t: f64) -> PdeCoefficients;

    /// When false the discrete operator is built once per solve.
    fn is_time_dependent(&self) -> bool {
        false
    }

    fn name(&self) -> &'static str;
}
