// src/math_utils.rs
use crate::error::{PdeError, PdeResult};
use ndarray::{ArrayView1, ArrayViewMut1};
use statrs::function::erf;
use std::f64::consts::SQRT_2;

const PIVOT_EPS: f64 = 1.0e-300;

pub fn norm_cdf(x: f64) -> f64 {
    0.5 * (1.0 + erf::erf(x / SQRT_2))
}

/// Thomas algorithm for a tridiagonal system `A x = rhs`.
///
/// `lower[0]` and `upper[n-1]` are ignored. `scratch` must hold `n` elements and
/// is used for the modified upper diagonal. Runs in O(n) without allocating,
/// and takes strided views so grid lines can be solved in place.
pub fn solve_tridiagonal(
    lower: ArrayView1<f64>,
    diag: ArrayView1<f64>,
    upper: ArrayView1<f64>,
    rhs: ArrayView1<f64>,
    mut scratch: ArrayViewMut1<f64>,
    mut out: ArrayViewMut1<f64>,
) -> PdeResult<()> {
    let n = diag.len();
    if n == 0 {
        return Ok(());
    }
    if lower.len() != n
        || upper.len() != n
        || rhs.len() != n
        || scratch.len() != n
        || out.len() != n
    {
        return Err(PdeError::config(
            "tridiagonal",
            "band, rhs and output lengths must match",
        ));
    }

    let mut pivot = diag[0];
    if pivot.abs() < PIVOT_EPS {
        return Err(PdeError::SingularSystem {
            size: n,
            row: 0,
            pivot,
        });
    }
    scratch[0] = if n > 1 { upper[0] / pivot } else { 0.0 };
    out[0] = rhs[0] / pivot;

    for i in 1..n {
        pivot = diag[i] - lower[i] * scratch[i - 1];
        if pivot.abs() < PIVOT_EPS {
            return Err(PdeError::SingularSystem { size: n, row: i, pivot });
        }
        scratch[i] = if i + 1 < n { upper[i] / pivot } else { 0.0 };
        out[i] = (rhs[i] - lower[i] * out[i - 1]) / pivot;
    }

    for i in (0..n - 1).rev() {
        out[i] -= scratch[i] * out[i + 1];
    }
    Ok(())
}

pub struct Timer {
    start_time: std::time::Instant,
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

impl Timer {
    pub fn new() -> Timer {
        Timer {
            start_time: std::time::Instant::now(),
        }
    }

    pub fn start(&mut self) {
        self.start_time = std::time::Instant::now();
    }

    pub fn elapsed_ms(&self) -> f64 {
        self.start_time.elapsed().as_secs_f64() * 1000.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::{aview1, aview_mut1};

    #[test]
    fn test_norm_cdf_symmetry() {
        assert_relative_eq!(norm_cdf(0.0), 0.5, epsilon = 1e-15);
        assert_relative_eq!(norm_cdf(1.3) + norm_cdf(-1.3), 1.0, epsilon = 1e-14);
    }

    #[test]
    fn test_tridiagonal_small_system() {
        // [2 1 0; 1 3 1; 0 1 2] x = [3, 5, 3] => x = [1, 1, 1]
        let lower = [0.0, 1.0, 1.0];
        let diag = [2.0, 3.0, 2.0];
        let upper = [1.0, 1.0, 0.0];
        let rhs = [3.0, 5.0, 3.0];
        let mut scratch = [0.0; 3];
        let mut out = [0.0; 3];

        solve_tridiagonal(
            aview1(&lower),
            aview1(&diag),
            aview1(&upper),
            aview1(&rhs),
            aview_mut1(&mut scratch),
            aview_mut1(&mut out),
        )
        .expect("Well-conditioned system");
        for x in out {
            assert_relative_eq!(x, 1.0, epsilon = 1e-14);
        }
    }

    #[test]
    fn test_tridiagonal_matches_dense_solve() {
        use nalgebra::{DMatrix, DVector};
        use rand::rngs::StdRng;
        use rand::{Rng, SeedableRng};

        let mut rng = StdRng::seed_from_u64(42);
        let n = 40;
        let lower: Vec<f64> = (0..n).map(|i| if i == 0 { 0.0 } else { rng.gen_range(-1.0..1.0) }).collect();
        let upper: Vec<f64> = (0..n).map(|i| if i + 1 == n { 0.0 } else { rng.gen_range(-1.0..1.0) }).collect();
        let diag: Vec<f64> = (0..n).map(|_| 2.5 + rng.gen_range(0.0..1.0)).collect();
        let rhs: Vec<f64> = (0..n).map(|_| rng.gen_range(-10.0..10.0)).collect();

        let dense = DMatrix::from_fn(n, n, |i, j| {
            if i == j {
                diag[i]
            } else if j + 1 == i {
                lower[i]
            } else if i + 1 == j {
                upper[i]
            } else {
                0.0
            }
        });
        let reference = dense
            .lu()
            .solve(&DVector::from_vec(rhs.clone()))
            .expect("Non-singular dense system");

        let mut scratch = vec![0.0; n];
        let mut out = vec![0.0; n];
        solve_tridiagonal(
            aview1(&lower),
            aview1(&diag),
            aview1(&upper),
            aview1(&rhs),
            aview_mut1(&mut scratch),
            aview_mut1(&mut out),
        )
        .expect("Diagonally dominant system");
        for i in 0..n {
            assert_relative_eq!(out[i], reference[i], epsilon = 1e-10);
        }
    }

    #[test]
    fn test_tridiagonal_singular_pivot() {
        let lower = [0.0, 1.0];
        let diag = [0.0, 1.0];
        let upper = [1.0, 0.0];
        let rhs = [1.0, 1.0];
        let mut scratch = [0.0; 2];
        let mut out = [0.0; 2];

        let err = solve_tridiagonal(
            aview1(&lower),
            aview1(&diag),
            aview1(&upper),
            aview1(&rhs),
            aview_mut1(&mut scratch),
            aview_mut1(&mut out),
        )
        .unwrap_err();
        assert!(matches!(err, PdeError::SingularSystem { row: 0, .. }));
    }

    #[test]
    fn test_tridiagonal_on_strided_columns() {
        use ndarray::{Array2, Axis};

        // Same system in every column of a row-major grid, so lanes are strided
        let lower = Array2::from_shape_fn((3, 2), |(i, _)| if i == 0 { 0.0 } else { 1.0 });
        let diag = Array2::from_shape_fn((3, 2), |(i, _)| if i == 1 { 3.0 } else { 2.0 });
        let upper = Array2::from_shape_fn((3, 2), |(i, _)| if i == 2 { 0.0 } else { 1.0 });
        let rhs = Array2::from_shape_fn((3, 2), |(i, j)| {
            let x = (j + 1) as f64;
            if i == 1 { 5.0 * x } else { 3.0 * x }
        });
        let mut scratch = Array2::zeros((3, 2));
        let mut out = Array2::zeros((3, 2));

        for j in 0..2 {
            solve_tridiagonal(
                lower.index_axis(Axis(1), j),
                diag.index_axis(Axis(1), j),
                upper.index_axis(Axis(1), j),
                rhs.index_axis(Axis(1), j),
                scratch.index_axis_mut(Axis(1), j),
                out.index_axis_mut(Axis(1), j),
            )
            .expect("Well-conditioned system");
        }
        for ((_, j), x) in out.indexed_iter() {
            assert_relative_eq!(*x, (j + 1) as f64, epsilon = 1e-14);
        }
    }
}
