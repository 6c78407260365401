// src/fdm/interpolation.rs
//! Spline interpolation of the solved grid
//!
//! # Natural Cubic Spline
//!
//! On the segment `[x_k, x_{k+1}]` with `h = x_{k+1} - x_k`,
//! `A = (x_{k+1} - x)/h`, `B = 1 - A`:
//! ```text
//! S(x) = A·y_k + B·y_{k+1} + ((A³ - A)·M_k + (B³ - B)·M_{k+1})·h²/6
//! ```
//! where the second derivatives `M` solve a tridiagonal system with
//! `M_0 = M_{n-1} = 0`.
//!
//! # Bicubic Spline
//!
//! One spline in `x` per grid line of constant `y` is built up front. A query
//! evaluates every line spline at `x` and interpolates
//! the results with a spline in `y`. The surface reproduces grid values at the
//! nodes and is exact for functions bilinear in `(x, y)`.

use crate::error::{validation::validate_grid_size, PdeError, PdeResult};
use crate::math_utils::solve_tridiagonal;
use ndarray::{aview1, aview_mut1, Array2, Axis};

/// Natural cubic spline through `(xs, ys)` with strictly increasing `xs`.
#[derive(Clone, Debug)]
pub struct CubicSpline {
    xs: Vec<f64>,
    ys: Vec<f64>,
    second: Vec<f64>,
}

impl CubicSpline {
    pub fn new(xs: &[f64], ys: &[f64]) -> PdeResult<Self> {
        if xs.len() != ys.len() {
            return Err(PdeError::config(
                "spline",
                format!("xs and ys must have same length: got {} and {}", xs.len(), ys.len()),
            ));
        }
        validate_grid_size("spline", xs.len())?;
        if xs.windows(2).any(|w| !(w[1] > w[0])) {
            return Err(PdeError::config("spline", "abscissae must be strictly increasing"));
        }

        let n = xs.len();
        let h: Vec<f64> = xs.windows(2).map(|w| w[1] - w[0]).collect();

        let mut lower = vec![0.0; n];
        let mut diag = vec![1.0; n];
        let mut upper = vec![0.0; n];
        let mut rhs = vec![0.0; n];
        for i in 1..n - 1 {
            lower[i] = h[i - 1];
            diag[i] = 2.0 * (h[i - 1] + h[i]);
            upper[i] = h[i];
            rhs[i] = 6.0 * ((ys[i + 1] - ys[i]) / h[i] - (ys[i] - ys[i - 1]) / h[i - 1]);
        }

        let mut scratch = vec![0.0; n];
        let mut second = vec![0.0; n];
        solve_tridiagonal(
            aview1(&lower),
            aview1(&diag),
            aview1(&upper),
            aview1(&rhs),
            aview_mut1(&mut scratch),
            aview_mut1(&mut second),
        )?;

        Ok(CubicSpline {
            xs: xs.to_vec(),
            ys: ys.to_vec(),
            second,
        })
    }

    /// Segment index containing `x`, clamped to the first/last segment.
    fn segment(&self, x: f64) -> usize {
        let pos = self.xs.partition_point(|&xi| xi <= x);
        pos.saturating_sub(1).min(self.xs.len() - 2)
    }

    fn weights(&self, x: f64) -> (usize, f64, f64, f64) {
        let k = self.segment(x);
        let h = self.xs[k + 1] - self.xs[k];
        let a = (self.xs[k + 1] - x) / h;
        (k, h, a, 1.0 - a)
    }

    pub fn value(&self, x: f64) -> f64 {
        let (k, h, a, b) = self.weights(x);
        a * self.ys[k]
            + b * self.ys[k + 1]
            + ((a * a * a - a) * self.second[k] + (b * b * b - b) * self.second[k + 1]) * h * h
                / 6.0
    }

    pub fn derivative(&self, x: f64) -> f64 {
        let (k, h, a, b) = self.weights(x);
        (self.ys[k + 1] - self.ys[k]) / h - (3.0 * a * a - 1.0) / 6.0 * h * self.second[k]
            + (3.0 * b * b - 1.0) / 6.0 * h * self.second[k + 1]
    }

    pub fn second_derivative(&self, x: f64) -> f64 {
        let (k, _, a, b) = self.weights(x);
        a * self.second[k] + b * self.second[k + 1]
    }
}

/// Smooth surface over a rectangular grid `values[[i, j]] = f(xs[i], ys[j])`.
#[derive(Clone, Debug)]
pub struct BicubicSpline {
    ys: Vec<f64>,
    lines: Vec<CubicSpline>,
}

impl BicubicSpline {
    pub fn new(xs: &[f64], ys: &[f64], values: &Array2<f64>) -> PdeResult<Self> {
        if values.dim() != (xs.len(), ys.len()) {
            return Err(PdeError::config(
                "surface",
                format!(
                    "grid shape {:?} does not match {} x {} abscissae",
                    values.dim(),
                    xs.len(),
                    ys.len()
                ),
            ));
        }
        validate_grid_size("surface", ys.len())?;

        let lines = values
            .axis_iter(Axis(1))
            .map(|column| CubicSpline::new(xs, &column.to_vec()))
            .collect::<PdeResult<Vec<_>>>()?;

        Ok(BicubicSpline {
            ys: ys.to_vec(),
            lines,
        })
    }

    fn across(&self, y: f64, along: impl Fn(&CubicSpline) -> f64) -> PdeResult<f64> {
        let samples: Vec<f64> = self.lines.iter().map(along).collect();
        Ok(CubicSpline::new(&self.ys, &samples)?.value(y))
    }

    pub fn value(&self, x: f64, y: f64) -> PdeResult<f64> {
        self.across(y, |line| line.value(x))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_spline_passes_through_nodes() {
        let xs = [0.0, 0.5, 1.5, 2.0, 3.5];
        let ys = [1.0, -0.5, 2.0, 0.3, 4.0];
        let spline = CubicSpline::new(&xs, &ys).expect("Valid spline");
        for (x, y) in xs.iter().zip(ys.iter()) {
            assert_relative_eq!(spline.value(*x), *y, epsilon = 1e-12);
        }
        assert_relative_eq!(spline.second_derivative(0.0), 0.0, epsilon = 1e-12);
        assert_relative_eq!(spline.second_derivative(3.5), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_spline_exact_for_linear_data() {
        let xs = [0.0, 0.3, 1.0, 1.1, 2.0];
        let ys: Vec<f64> = xs.iter().map(|x| 2.0 * x - 1.0).collect();
        let spline = CubicSpline::new(&xs, &ys).expect("Valid spline");
        assert_relative_eq!(spline.value(0.77), 0.54, epsilon = 1e-12);
        assert_relative_eq!(spline.derivative(1.5), 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_spline_tracks_smooth_function() {
        let xs: Vec<f64> = (0..=40).map(|i| i as f64 * 0.1).collect();
        let ys: Vec<f64> = xs.iter().map(|x| x.sin()).collect();
        let spline = CubicSpline::new(&xs, &ys).expect("Valid spline");
        assert_relative_eq!(spline.value(1.234), 1.234f64.sin(), epsilon = 1e-5);
        assert_relative_eq!(spline.derivative(2.05), 2.05f64.cos(), epsilon = 1e-3);
    }

    #[test]
    fn test_spline_rejects_bad_input() {
        assert!(CubicSpline::new(&[0.0, 1.0], &[0.0, 1.0]).is_err());
        assert!(CubicSpline::new(&[0.0, 1.0, 1.0], &[0.0, 1.0, 2.0]).is_err());
        assert!(CubicSpline::new(&[0.0, 1.0, 2.0], &[0.0, 1.0]).is_err());
    }

    #[test]
    fn test_bicubic_reproduces_bilinear_surface() {
        let xs = [0.0, 0.4, 1.0, 1.7, 2.0];
        let ys = [0.0, 0.1, 0.5, 1.0];
        let f = |x: f64, y: f64| 1.0 + 2.0 * x - 3.0 * y + 0.5 * x * y;
        let values = Array2::from_shape_fn((xs.len(), ys.len()), |(i, j)| f(xs[i], ys[j]));
        let surface = BicubicSpline::new(&xs, &ys, &values).expect("Valid surface");

        for &(x, y) in &[(0.2, 0.05), (1.3, 0.7), (1.95, 0.99), (0.4, 0.5)] {
            assert_relative_eq!(surface.value(x, y).unwrap(), f(x, y), epsilon = 1e-12);
            // linear in x along every line of constant y
            let slope = (surface.value(x + 0.01, y).unwrap()
                - surface.value(x - 0.01, y).unwrap())
                / 0.02;
            assert_relative_eq!(slope, 2.0 + 0.5 * y, epsilon = 1e-9);
        }
    }
}
