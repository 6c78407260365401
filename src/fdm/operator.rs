// src/fdm/operator.rs
//! Discrete generator of the two-factor pricing PDE
//!
//! # Decomposition
//!
//! ```text
//! L = L₀ + L₁ + L₀₁
//! ```
//! - `L₀`, `L₁`: one tridiagonal operator per dimension holding that
//!   dimension's diffusion and drift plus half of the discount term;
//! - `L₀₁`: the mixed-derivative term on a 3×3 stencil, always applied
//!   explicitly by the ADI schemes.
//!
//! # Stencils on a non-uniform mesh
//!
//! With `h₋ = x_i - x_{i-1}`, `h₊ = x_{i+1} - x_i`:
//! ```text
//! u_xx ≈ 2/(h₋(h₋+h₊))·u_{i-1} − 2/(h₋h₊)·u_i + 2/(h₊(h₋+h₊))·u_{i+1}
//! u_x  ≈ −h₊/(h₋(h₋+h₊))·u_{i-1} + (h₊−h₋)/(h₋h₊)·u_i + h₋/(h₊(h₋+h₊))·u_{i+1}
//! ```
//! The mixed term is the tensor product of the two central first-derivative
//! stencils.
//!
//! # Drift discretization
//!
//! Central differences keep second-order accuracy but produce oscillations
//! once convection dominates diffusion. Per node the cell Péclet number
//! `|b|·max(h₋, h₊) / (2a)` is compared to a threshold; above it the drift
//! switches to first-order upwind differences in the direction of the drift.
//!
//! # Edges
//!
//! Edge rows drop the second-derivative and mixed terms and use one-sided
//! first differences pointing into the domain. Edges pinned by a Dirichlet
//! condition get identity rows in the [`StepOperator`] used by implicit
//! solves.

use crate::error::{PdeError, PdeResult};
use crate::fdm::boundary::{BoundaryConditionSet, Side};
use crate::fdm::mesher::{Fdm1dMesher, FdmMesher};
use crate::math_utils::solve_tridiagonal;
use crate::models::model::{Dimension, FdmProcess};
use ndarray::{Array2, ArrayView1, ArrayViewMut1, Axis, Zip};
use std::sync::{Arc, Mutex};
use tracing::trace;

/// Default cell Péclet number above which drift terms are upwinded.
pub const DEFAULT_PECLET_THRESHOLD: f64 = 1.0;

/// Tridiagonal operator acting along one dimension of the grid.
#[derive(Clone, Debug)]
struct TripleBand {
    lower: Array2<f64>,
    diag: Array2<f64>,
    upper: Array2<f64>,
}

impl TripleBand {
    fn zeros(shape: (usize, usize)) -> Self {
        TripleBand {
            lower: Array2::zeros(shape),
            diag: Array2::zeros(shape),
            upper: Array2::zeros(shape),
        }
    }
}

/// Central first-derivative weights `(w₋, w₀, w₊)` at every interior node.
fn central_weights(axis: &Fdm1dMesher) -> Vec<[f64; 3]> {
    (0..axis.size())
        .map(|i| match (axis.dminus(i), axis.dplus(i)) {
            (Some(hm), Some(hp)) => [
                -hp / (hm * (hm + hp)),
                (hp - hm) / (hm * hp),
                hm / (hp * (hm + hp)),
            ],
            _ => [0.0; 3],
        })
        .collect()
}

/// Row of `a·u_xx + b·u_x − ½r·u` at index `i` of `axis`.
fn stencil_row(axis: &Fdm1dMesher, i: usize, a: f64, b: f64, r: f64, peclet: f64) -> [f64; 3] {
    let half_r = 0.5 * r;
    match (axis.dminus(i), axis.dplus(i)) {
        (Some(hm), Some(hp)) => {
            let second = [
                2.0 / (hm * (hm + hp)),
                -2.0 / (hm * hp),
                2.0 / (hp * (hm + hp)),
            ];
            let cell_peclet = if b == 0.0 {
                0.0
            } else if a > 0.0 {
                b.abs() * hm.max(hp) / (2.0 * a)
            } else {
                f64::INFINITY
            };
            let first = if cell_peclet <= peclet {
                [
                    -hp / (hm * (hm + hp)),
                    (hp - hm) / (hm * hp),
                    hm / (hp * (hm + hp)),
                ]
            } else if b > 0.0 {
                [0.0, -1.0 / hp, 1.0 / hp]
            } else {
                [-1.0 / hm, 1.0 / hm, 0.0]
            };
            [
                a * second[0] + b * first[0],
                a * second[1] + b * first[1] - half_r,
                a * second[2] + b * first[2],
            ]
        }
        (None, Some(hp)) => [0.0, -b / hp - half_r, b / hp],
        (Some(hm), None) => [-b / hm, b / hm - half_r, 0.0],
        (None, None) => [0.0, -half_r, 0.0],
    }
}

fn check_coefficient(name: &str, dim: Dimension, value: f64, x: f64, y: f64) -> PdeResult<()> {
    if !value.is_finite() {
        return Err(PdeError::InvalidParameters {
            parameter: format!("{}[{}] at ({:.6}, {:.6})", name, dim.name(), x, y),
            value,
            constraint: "must be finite".to_string(),
        });
    }
    Ok(())
}

/// 1-D tridiagonal product `out = A u` on one grid line.
fn band_product(
    lower: ArrayView1<f64>,
    diag: ArrayView1<f64>,
    upper: ArrayView1<f64>,
    u: ArrayView1<f64>,
    mut out: ArrayViewMut1<f64>,
) {
    let n = u.len();
    for k in 0..n {
        let mut acc = diag[k] * u[k];
        if k > 0 {
            acc += lower[k] * u[k - 1];
        }
        if k + 1 < n {
            acc += upper[k] * u[k + 1];
        }
        out[k] = acc;
    }
}

/// Finite-difference generator `L = L₀ + L₁ + L₀₁` for a process on a mesh.
pub struct FdmOperator {
    process: Arc<dyn FdmProcess>,
    mesher: Arc<FdmMesher>,
    peclet_threshold: f64,
    bands: [TripleBand; 2],
    cross: Array2<f64>,
    central: [Vec<[f64; 3]>; 2],
    time: f64,
    refreshes: usize,
}

impl FdmOperator {
    /// Build the operator at calendar time `t`.
    ///
    /// Fails if any coefficient is non-finite or a diffusion coefficient is
    /// negative anywhere on the mesh.
    pub fn new(
        process: Arc<dyn FdmProcess>,
        mesher: Arc<FdmMesher>,
        peclet_threshold: f64,
        t: f64,
    ) -> PdeResult<Self> {
        if !(peclet_threshold > 0.0) {
            return Err(PdeError::InvalidParameters {
                parameter: "peclet_threshold".to_string(),
                value: peclet_threshold,
                constraint: "must be positive (use infinity for pure central differences)"
                    .to_string(),
            });
        }
        if process.coordinates() != mesher.coordinates() {
            return Err(PdeError::config(
                "mesher",
                format!(
                    "mesh coordinates {:?} do not match the {} process coordinates {:?}",
                    mesher.coordinates(),
                    process.name(),
                    process.coordinates()
                ),
            ));
        }

        let shape = mesher.shape();
        let central = [
            central_weights(mesher.axis(Dimension::Spot)),
            central_weights(mesher.axis(Dimension::Variance)),
        ];
        let mut op = FdmOperator {
            process,
            mesher,
            peclet_threshold,
            bands: [TripleBand::zeros(shape), TripleBand::zeros(shape)],
            cross: Array2::zeros(shape),
            central,
            time: t,
            refreshes: 0,
        };
        op.rebuild(t)?;
        Ok(op)
    }

    fn rebuild(&mut self, t: f64) -> PdeResult<()> {
        let spot = self.mesher.axis(Dimension::Spot);
        let variance = self.mesher.axis(Dimension::Variance);
        let (n0, n1) = self.mesher.shape();

        for i in 0..n0 {
            let x = spot.locations()[i];
            for j in 0..n1 {
                let y = variance.locations()[j];
                let c = self.process.coefficients(x, y, t);

                for dim in Dimension::ALL {
                    let d = dim.index();
                    check_coefficient("diffusion", dim, c.diffusion[d], x, y)?;
                    check_coefficient("drift", dim, c.drift[d], x, y)?;
                    if c.diffusion[d] < 0.0 {
                        return Err(PdeError::InvalidParameters {
                            parameter: format!("diffusion[{}] at ({:.6}, {:.6})", dim.name(), x, y),
                            value: c.diffusion[d],
                            constraint: "must be non-negative".to_string(),
                        });
                    }
                }
                check_coefficient("cross", Dimension::Spot, c.cross, x, y)?;
                check_coefficient("discount", Dimension::Spot, c.discount, x, y)?;

                let row0 = stencil_row(
                    spot,
                    i,
                    c.diffusion[0],
                    c.drift[0],
                    c.discount,
                    self.peclet_threshold,
                );
                let row1 = stencil_row(
                    variance,
                    j,
                    c.diffusion[1],
                    c.drift[1],
                    c.discount,
                    self.peclet_threshold,
                );
                for (band, row) in self.bands.iter_mut().zip([row0, row1]) {
                    band.lower[[i, j]] = row[0];
                    band.diag[[i, j]] = row[1];
                    band.upper[[i, j]] = row[2];
                }

                let interior = i > 0 && i + 1 < n0 && j > 0 && j + 1 < n1;
                self.cross[[i, j]] = if interior { c.cross } else { 0.0 };
            }
        }

        self.time = t;
        self.refreshes += 1;
        trace!(t, refreshes = self.refreshes, "rebuilt finite-difference operator");
        Ok(())
    }

    /// Move the operator to calendar time `t`; rebuilds only for
    /// time-dependent processes.
    pub fn set_time(&mut self, t: f64) -> PdeResult<()> {
        if self.process.is_time_dependent() && t != self.time {
            self.rebuild(t)?;
        }
        Ok(())
    }

    /// Number of times the coefficients have been assembled.
    pub fn refresh_count(&self) -> usize {
        self.refreshes
    }

    pub fn mesher(&self) -> &FdmMesher {
        &self.mesher
    }

    /// `L_d u` for one dimension, written into `out`.
    pub fn apply_direction_into(&self, dim: Dimension, u: &Array2<f64>, out: &mut Array2<f64>) {
        let band = &self.bands[dim.index()];
        let axis = Axis(dim.index());
        Zip::from(out.lanes_mut(axis))
            .and(u.lanes(axis))
            .and(band.lower.lanes(axis))
            .and(band.diag.lanes(axis))
            .and(band.upper.lanes(axis))
            .for_each(|out, u, lower, diag, upper| band_product(lower, diag, upper, u, out));
    }

    pub fn apply_direction(&self, dim: Dimension, u: &Array2<f64>) -> Array2<f64> {
        let mut out = Array2::zeros(u.raw_dim());
        self.apply_direction_into(dim, u, &mut out);
        out
    }

    /// `L₀₁ u`, the mixed-derivative term, written into `out`.
    pub fn apply_mixed_into(&self, u: &Array2<f64>, out: &mut Array2<f64>) {
        let (n0, n1) = u.dim();
        out.fill(0.0);
        for i in 1..n0.saturating_sub(1) {
            let wx = self.central[0][i];
            for j in 1..n1.saturating_sub(1) {
                let c = self.cross[[i, j]];
                if c == 0.0 {
                    continue;
                }
                let wy = self.central[1][j];
                let mut acc = 0.0;
                for (a, wa) in wx.iter().enumerate() {
                    for (b, wb) in wy.iter().enumerate() {
                        acc += wa * wb * u[[i + a - 1, j + b - 1]];
                    }
                }
                out[[i, j]] = c * acc;
            }
        }
    }

    pub fn apply_mixed(&self, u: &Array2<f64>) -> Array2<f64> {
        let mut out = Array2::zeros(u.raw_dim());
        self.apply_mixed_into(u, &mut out);
        out
    }

    /// Full generator `L u = L₀u + L₁u + L₀₁u`.
    pub fn apply(&self, u: &Array2<f64>) -> Array2<f64> {
        let mut out = self.apply_mixed(u);
        out += &self.apply_direction(Dimension::Spot, u);
        out += &self.apply_direction(Dimension::Variance, u);
        out
    }

    /// Assemble `I − a·L_d` for both dimensions.
    ///
    /// Edges pinned by `bcs` get identity rows. The result stays valid until
    /// the operator is rebuilt or `a` changes, see [`StepOperator::is_current`].
    pub fn step_operator(&self, a: f64, bcs: &BoundaryConditionSet) -> StepOperator {
        let bands = Dimension::ALL.map(|dim| {
            let src = &self.bands[dim.index()];
            let mut band = TripleBand {
                lower: src.lower.mapv(|l| -a * l),
                diag: src.diag.mapv(|d| 1.0 - a * d),
                upper: src.upper.mapv(|u| -a * u),
            };
            let axis = Axis(dim.index());
            let last = self.mesher.axis(dim).size() - 1;
            for (side, edge) in [(Side::Lower, 0), (Side::Upper, last)] {
                if bcs.covers(dim, side) {
                    band.lower.index_axis_mut(axis, edge).fill(0.0);
                    band.diag.index_axis_mut(axis, edge).fill(1.0);
                    band.upper.index_axis_mut(axis, edge).fill(0.0);
                }
            }
            band
        });
        trace!(a, refreshes = self.refreshes, "assembled step operator");
        StepOperator {
            a,
            refreshes: self.refreshes,
            bands,
        }
    }

    /// Solve `(I − a·L_d) x = rhs` line by line along dimension `d` into `out`.
    ///
    /// `step` must come from this operator and the same `bcs`. The edges of
    /// `d` pinned by `bcs` are first written into `rhs` (at time to maturity
    /// `tau`), so their identity rows reproduce the boundary values. `scratch`
    /// holds the per-line elimination factors. Lines are mutually independent
    /// and are solved in parallel.
    #[allow(clippy::too_many_arguments)]
    pub fn solve_splitting(
        &self,
        dim: Dimension,
        step: &StepOperator,
        bcs: &BoundaryConditionSet,
        tau: f64,
        rhs: &mut Array2<f64>,
        scratch: &mut Array2<f64>,
        out: &mut Array2<f64>,
    ) -> PdeResult<()> {
        let shape = self.mesher.shape();
        if rhs.dim() != shape || scratch.dim() != shape || out.dim() != shape {
            return Err(PdeError::config(
                "solve_splitting",
                format!("buffers must match the {:?} grid", shape),
            ));
        }
        bcs.apply_dimension(dim, rhs, &self.mesher, tau);

        let band = &step.bands[dim.index()];
        let axis = Axis(dim.index());
        let failure: Mutex<Option<PdeError>> = Mutex::new(None);

        Zip::from(out.lanes_mut(axis))
            .and(rhs.lanes(axis))
            .and(band.lower.lanes(axis))
            .and(band.diag.lanes(axis))
            .and(band.upper.lanes(axis))
            .and(scratch.lanes_mut(axis))
            .par_for_each(|out, rhs, lower, diag, upper, scratch| {
                if let Err(e) = solve_tridiagonal(lower, diag, upper, rhs, scratch, out) {
                    let mut slot = failure.lock().unwrap_or_else(|p| p.into_inner());
                    slot.get_or_insert(e);
                }
            });

        match failure.into_inner().unwrap_or_else(|p| p.into_inner()) {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

/// Banded `I − a·L_d` per dimension, with identity rows on pinned edges.
///
/// Kept across time steps: nominal steps share one `a = θΔτ`, so the bands
/// are only reassembled after a split step or a coefficient rebuild.
#[derive(Clone, Debug)]
pub struct StepOperator {
    a: f64,
    refreshes: usize,
    bands: [TripleBand; 2],
}

impl StepOperator {
    /// Relative tolerance on `a` under which cached bands are reused.
    const TOLERANCE: f64 = 1e-12;

    /// Implicit weight `a` the bands were assembled with.
    pub fn a(&self) -> f64 {
        self.a
    }

    /// True if the bands still describe `I − a·L_d` for `operator`'s
    /// current coefficients.
    pub fn is_current(&self, operator: &FdmOperator, a: f64) -> bool {
        self.refreshes == operator.refreshes
            && (self.a - a).abs() <= Self::TOLERANCE * a.abs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fdm::mesher::AxisSpec;
    use crate::models::heston::{Heston, HestonParams};
    use crate::models::model::{Coordinate, PdeCoefficients};
    use approx::assert_abs_diff_eq;
    use ndarray::Array2;

    /// u_xx + u_yy + u_xy with no drift or discounting.
    struct Laplace;

    impl FdmProcess for Laplace {
        fn coordinates(&self) -> [Coordinate; 2] {
            [Coordinate::Linear, Coordinate::Linear]
        }
        fn coefficients(&self, _x: f64, _y: f64, _t: f64) -> PdeCoefficients {
            PdeCoefficients {
                drift: [0.0, 0.0],
                diffusion: [1.0, 1.0],
                cross: 1.0,
                discount: 0.0,
            }
        }
        fn name(&self) -> &'static str {
            "Laplace"
        }
    }

    /// Drift that changes with calendar time.
    struct Ramp;

    impl FdmProcess for Ramp {
        fn coordinates(&self) -> [Coordinate; 2] {
            [Coordinate::Linear, Coordinate::Linear]
        }
        fn coefficients(&self, _x: f64, _y: f64, t: f64) -> PdeCoefficients {
            PdeCoefficients {
                drift: [t, 0.0],
                diffusion: [1.0, 0.5],
                cross: 0.0,
                discount: 0.0,
            }
        }
        fn is_time_dependent(&self) -> bool {
            true
        }
        fn name(&self) -> &'static str {
            "Ramp"
        }
    }

    struct NegativeDiffusion;

    impl FdmProcess for NegativeDiffusion {
        fn coordinates(&self) -> [Coordinate; 2] {
            [Coordinate::Linear, Coordinate::Linear]
        }
        fn coefficients(&self, _x: f64, _y: f64, _t: f64) -> PdeCoefficients {
            PdeCoefficients {
                diffusion: [-0.1, 1.0],
                ..PdeCoefficients::default()
            }
        }
        fn name(&self) -> &'static str {
            "NegativeDiffusion"
        }
    }

    fn stretched_mesher() -> Arc<FdmMesher> {
        Arc::new(
            FdmMesher::from_specs(
                &AxisSpec::concentrated(-1.0, 1.0, 21, Coordinate::Linear, 0.2, 0.3),
                &AxisSpec::concentrated(0.0, 2.0, 17, Coordinate::Linear, 0.5, 0.4),
            )
            .expect("Valid mesher"),
        )
    }

    fn grid_of(mesher: &FdmMesher, f: impl Fn(f64, f64) -> f64) -> Array2<f64> {
        let xs = mesher.axis(Dimension::Spot).locations();
        let ys = mesher.axis(Dimension::Variance).locations();
        Array2::from_shape_fn(mesher.shape(), |(i, j)| f(xs[i], ys[j]))
    }

    #[test]
    fn test_stencils_exact_for_quadratics() {
        let mesher = stretched_mesher();
        let op = FdmOperator::new(Arc::new(Laplace), mesher.clone(), f64::INFINITY, 0.0)
            .expect("Valid operator");

        // u = x² + 3xy + y²: u_xx = 2, u_yy = 2, u_xy = 3
        let u = grid_of(&mesher, |x, y| x * x + 3.0 * x * y + y * y);
        let lu = op.apply(&u);
        let (n0, n1) = mesher.shape();
        for i in 1..n0 - 1 {
            for j in 1..n1 - 1 {
                assert_abs_diff_eq!(lu[[i, j]], 7.0, epsilon = 1e-8);
            }
        }
    }

    #[test]
    fn test_rejects_negative_diffusion() {
        let err = FdmOperator::new(Arc::new(NegativeDiffusion), stretched_mesher(), 1.0, 0.0)
            .err()
            .expect("Negative diffusion must be rejected");
        assert!(err.is_configuration());
        assert!(err.to_string().contains("non-negative"));
    }

    #[test]
    fn test_rejects_mismatched_coordinates() {
        let heston = Heston::new(HestonParams::default()).expect("Valid parameters");
        let result = FdmOperator::new(Arc::new(heston), stretched_mesher(), 1.0, 0.0);
        assert!(result.is_err());
    }

    #[test]
    fn test_rebuilds_only_when_time_dependent() {
        let mesher = stretched_mesher();
        let mut fixed = FdmOperator::new(Arc::new(Laplace), mesher.clone(), 1.0, 0.0)
            .expect("Valid operator");
        fixed.set_time(0.5).expect("Refresh");
        fixed.set_time(0.25).expect("Refresh");
        assert_eq!(fixed.refresh_count(), 1);

        let mut ramp =
            FdmOperator::new(Arc::new(Ramp), mesher, 1.0, 0.0).expect("Valid operator");
        ramp.set_time(0.5).expect("Refresh");
        ramp.set_time(0.5).expect("Refresh");
        ramp.set_time(0.25).expect("Refresh");
        assert_eq!(ramp.refresh_count(), 3);
    }

    #[test]
    fn test_upwinding_when_convection_dominates() {
        let mesher = FdmMesher::from_specs(
            &AxisSpec::uniform(0.0, 1.0, 11, Coordinate::Linear),
            &AxisSpec::uniform(0.0, 1.0, 3, Coordinate::Linear),
        )
        .expect("Valid mesher");
        let axis = mesher.axis(Dimension::Spot);

        // Péclet = 10·0.1/(2·0.01) = 50 → upwind forward difference
        let row = stencil_row(axis, 5, 0.01, 10.0, 0.0, 1.0);
        assert!(row[0] >= 0.0 && row[2] >= 0.0, "upwind row must be monotone: {:?}", row);
        assert_abs_diff_eq!(row[0] + row[1] + row[2], 0.0, epsilon = 1e-12);

        // Péclet = 0.5 → central
        let central = stencil_row(axis, 5, 1.0, 10.0, 0.0, 1.0);
        assert_abs_diff_eq!(central[2] - central[0], 10.0 / 0.1, epsilon = 1e-9);
    }

    #[test]
    fn test_solve_splitting_inverts_step_operator() {
        let mesher = stretched_mesher();
        let op = FdmOperator::new(Arc::new(Laplace), mesher.clone(), 1.0, 0.0)
            .expect("Valid operator");
        let bcs = BoundaryConditionSet::new();
        let x = grid_of(&mesher, |x, y| (x + 0.3 * y).sin());
        let a = 0.05;
        let step = op.step_operator(a, &bcs);
        let mut scratch = Array2::zeros(mesher.shape());
        let mut solved = Array2::zeros(mesher.shape());

        for dim in Dimension::ALL {
            // rhs = (I − a L_d) x
            let mut rhs = &x - &(op.apply_direction(dim, &x) * a);
            op.solve_splitting(dim, &step, &bcs, 0.0, &mut rhs, &mut scratch, &mut solved)
                .expect("Diagonally dominant system");
            for (s, e) in solved.iter().zip(x.iter()) {
                assert_abs_diff_eq!(*s, *e, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn test_pinned_edges_take_boundary_values() {
        use crate::fdm::boundary::DirichletBoundary;

        let mesher = stretched_mesher();
        let op = FdmOperator::new(Arc::new(Laplace), mesher.clone(), 1.0, 0.0)
            .expect("Valid operator");
        let bcs = BoundaryConditionSet::new()
            .with(DirichletBoundary::fixed(Dimension::Spot, Side::Lower, 3.0))
            .with(DirichletBoundary::fixed(Dimension::Variance, Side::Upper, -2.0));
        let step = op.step_operator(0.1, &bcs);
        let mut rhs = grid_of(&mesher, |x, y| x * y);
        let before = rhs.clone();
        let mut scratch = Array2::zeros(mesher.shape());
        let mut out = Array2::zeros(mesher.shape());

        op.solve_splitting(Dimension::Spot, &step, &bcs, 0.0, &mut rhs, &mut scratch, &mut out)
            .expect("Diagonally dominant system");
        let (_, n1) = mesher.shape();
        for j in 0..n1 {
            assert_eq!(out[[0, j]], 3.0);
        }
        // variance edges are interior rows of a spot solve and keep their rhs
        assert_eq!(rhs[[5, n1 - 1]], before[[5, n1 - 1]]);
    }

    #[test]
    fn test_step_operator_currency() {
        let mesher = stretched_mesher();
        let bcs = BoundaryConditionSet::new();
        let fixed = FdmOperator::new(Arc::new(Laplace), mesher.clone(), 1.0, 0.0)
            .expect("Valid operator");
        let step = fixed.step_operator(0.01, &bcs);
        assert_eq!(step.a(), 0.01);
        // 3·0.01 − 2·0.01 differs from 0.01 in the last bit
        assert!(step.is_current(&fixed, 3.0 * 0.01 - 2.0 * 0.01));
        assert!(!step.is_current(&fixed, 0.005));

        let mut ramp =
            FdmOperator::new(Arc::new(Ramp), mesher, 1.0, 0.0).expect("Valid operator");
        let step = ramp.step_operator(0.01, &bcs);
        ramp.set_time(0.5).expect("Refresh");
        assert!(!step.is_current(&ramp, 0.01));
    }

    #[test]
    fn test_in_place_products_overwrite_buffers() {
        let mesher = stretched_mesher();
        let op = FdmOperator::new(Arc::new(Laplace), mesher.clone(), 1.0, 0.0)
            .expect("Valid operator");
        let u = grid_of(&mesher, |x, y| (x * y).cos());
        let mut out = Array2::from_elem(mesher.shape(), f64::NAN);

        op.apply_mixed_into(&u, &mut out);
        assert_eq!(out, op.apply_mixed(&u));
        assert_eq!(out[[0, 0]], 0.0);
        op.apply_direction_into(Dimension::Variance, &u, &mut out);
        assert_eq!(out, op.apply_direction(Dimension::Variance, &u));
    }

    #[test]
    fn test_solve_splitting_rejects_foreign_buffers() {
        let mesher = stretched_mesher();
        let op = FdmOperator::new(Arc::new(Laplace), mesher, 1.0, 0.0).expect("Valid operator");
        let bcs = BoundaryConditionSet::new();
        let step = op.step_operator(0.1, &bcs);
        let mut rhs = Array2::zeros((3, 3));
        let mut scratch = Array2::zeros((3, 3));
        let mut out = Array2::zeros((3, 3));
        let err = op
            .solve_splitting(Dimension::Spot, &step, &bcs, 0.0, &mut rhs, &mut scratch, &mut out)
            .unwrap_err();
        assert!(err.is_configuration());
    }
}
