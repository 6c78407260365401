// src/fdm/boundary.rs
//! Dirichlet boundary conditions
//!
//! A condition pins the solution on one edge of the mesh. It acts in two
//! places during a time step:
//! - implicit solves along its own dimension replace the edge row of
//!   `(I - θΔτ L_d)` by the identity and force the right-hand side to the
//!   boundary value (see [`BoundaryConditionSet::apply_dimension`]);
//! - after every explicit application and every implicit sweep the edge line
//!   of the grid is overwritten ([`BoundaryConditionSet::apply_to`]).
//!
//! Where two conditions cover the same node (corners, or a repeated edge) the
//! one registered last wins.

use crate::error::{validation::validate_finite, PdeResult};
use crate::fdm::mesher::FdmMesher;
use crate::models::model::Dimension;
use ndarray::{Array2, Axis};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Lower,
    Upper,
}

/// `f(other_state, time_to_maturity)`: boundary value as a function of the
/// state along the edge and of the time to maturity.
pub type BoundaryRule = Arc<dyn Fn(f64, f64) -> f64 + Send + Sync>;

#[derive(Clone)]
pub enum BoundaryValue {
    Fixed(f64),
    Rule(BoundaryRule),
}

impl fmt::Debug for BoundaryValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoundaryValue::Fixed(v) => f.debug_tuple("Fixed").field(v).finish(),
            BoundaryValue::Rule(_) => f.write_str("Rule(..)"),
        }
    }
}

#[derive(Clone, Debug)]
pub struct DirichletBoundary {
    pub dimension: Dimension,
    pub side: Side,
    pub value: BoundaryValue,
}

impl DirichletBoundary {
    pub fn fixed(dimension: Dimension, side: Side, value: f64) -> Self {
        DirichletBoundary {
            dimension,
            side,
            value: BoundaryValue::Fixed(value),
        }
    }

    pub fn with_rule<F>(dimension: Dimension, side: Side, rule: F) -> Self
    where
        F: Fn(f64, f64) -> f64 + Send + Sync + 'static,
    {
        DirichletBoundary {
            dimension,
            side,
            value: BoundaryValue::Rule(Arc::new(rule)),
        }
    }

    /// Grid index of the edge along `self.dimension`.
    pub fn index(&self, mesher: &FdmMesher) -> usize {
        match self.side {
            Side::Lower => 0,
            Side::Upper => mesher.axis(self.dimension).size() - 1,
        }
    }

    pub fn value_at(&self, other_state: f64, tau: f64) -> f64 {
        match &self.value {
            BoundaryValue::Fixed(v) => *v,
            BoundaryValue::Rule(rule) => rule(other_state, tau),
        }
    }

    /// Overwrite the edge line of `values` with the boundary values at `tau`.
    pub fn apply_to(&self, values: &mut Array2<f64>, mesher: &FdmMesher, tau: f64) {
        let other = mesher.axis(self.dimension.other());
        let index = self.index(mesher);
        let mut edge = values.index_axis_mut(Axis(self.dimension.index()), index);
        for (k, node) in edge.iter_mut().enumerate() {
            *node = self.value_at(other.state(k), tau);
        }
    }
}

/// Ordered collection of Dirichlet conditions.
#[derive(Clone, Debug, Default)]
pub struct BoundaryConditionSet {
    conditions: Vec<DirichletBoundary>,
}

impl BoundaryConditionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, condition: DirichletBoundary) -> Self {
        self.conditions.push(condition);
        self
    }

    pub fn push(&mut self, condition: DirichletBoundary) {
        self.conditions.push(condition);
    }

    pub fn iter(&self) -> impl Iterator<Item = &DirichletBoundary> {
        self.conditions.iter()
    }

    pub fn len(&self) -> usize {
        self.conditions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// True when some condition pins the given edge.
    pub fn covers(&self, dimension: Dimension, side: Side) -> bool {
        self.conditions
            .iter()
            .any(|c| c.dimension == dimension && c.side == side)
    }

    /// Check every boundary value on the mesh at the given times is finite.
    pub fn validate(&self, mesher: &FdmMesher, taus: &[f64]) -> PdeResult<()> {
        for condition in &self.conditions {
            let other = mesher.axis(condition.dimension.other());
            for &tau in taus {
                for k in 0..other.size() {
                    validate_finite("boundary value", condition.value_at(other.state(k), tau))?;
                }
            }
        }
        Ok(())
    }

    /// Overwrite every pinned edge node, in registration order.
    pub fn apply_to(&self, values: &mut Array2<f64>, mesher: &FdmMesher, tau: f64) {
        for condition in &self.conditions {
            condition.apply_to(values, mesher, tau);
        }
    }

    /// Overwrite the pinned edges of one dimension only, in registration order.
    ///
    /// Used on the right-hand side of an implicit solve along `dimension`,
    /// where edges of the other dimension are ordinary interior rows.
    pub fn apply_dimension(
        &self,
        dimension: Dimension,
        values: &mut Array2<f64>,
        mesher: &FdmMesher,
        tau: f64,
    ) {
        for condition in self.conditions.iter().filter(|c| c.dimension == dimension) {
            condition.apply_to(values, mesher, tau);
        }
    }
}
