//! ADI time-stepping schemes
//!
//! Each scheme advances the grid one step in time to maturity. Scheme choice
//! and its two tuning parameters travel together in [`FdmSchemeDesc`].

pub mod craig_sneyd;
pub mod douglas;
pub mod hundsdorfer;

use crate::error::{validation::validate_range, PdeError, PdeResult};
use crate::fdm::boundary::BoundaryConditionSet;
use crate::fdm::operator::FdmOperator;
use craig_sneyd::CraigSneyd;
use douglas::{Douglas, ImplicitSweeps};
use hundsdorfer::Hundsdorfer;
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FdmSchemeType {
    Hundsdorfer,
    Douglas,
    CraigSneyd,
}

impl fmt::Display for FdmSchemeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FdmSchemeType::Hundsdorfer => "Hundsdorfer-Verwer",
            FdmSchemeType::Douglas => "Douglas",
            FdmSchemeType::CraigSneyd => "Craig-Sneyd",
        };
        f.write_str(name)
    }
}

/// Scheme selection with its implicitness `theta` and corrector weight `mu`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FdmSchemeDesc {
    pub scheme: FdmSchemeType,
    pub theta: f64,
    pub mu: f64,
}

impl Default for FdmSchemeDesc {
    fn default() -> Self {
        Self::hundsdorfer()
    }
}

/// Grid-shaped stage buffers reused by every step of one solve.
///
/// A workspace serves one operator. Its cached `I − θΔτ L_d` bands are
/// reassembled only when that operator is rebuilt or `θΔτ` changes.
pub struct AdiWorkspace {
    shape: (usize, usize),
    pub(crate) sweeps: ImplicitSweeps,
    /// `[L₀ U, L₁ U]`
    pub(crate) directional: [Array2<f64>; 2],
    /// `L U`
    pub(crate) full: Array2<f64>,
    /// `Y₀`
    pub(crate) predictor: Array2<f64>,
    pub(crate) increment: Array2<f64>,
    pub(crate) corrector_directional: [Array2<f64>; 2],
    pub(crate) corrector_full: Array2<f64>,
}

impl AdiWorkspace {
    pub fn new(shape: (usize, usize)) -> Self {
        AdiWorkspace {
            shape,
            sweeps: ImplicitSweeps::new(shape),
            directional: [Array2::zeros(shape), Array2::zeros(shape)],
            full: Array2::zeros(shape),
            predictor: Array2::zeros(shape),
            increment: Array2::zeros(shape),
            corrector_directional: [Array2::zeros(shape), Array2::zeros(shape)],
            corrector_full: Array2::zeros(shape),
        }
    }

    pub fn shape(&self) -> (usize, usize) {
        self.shape
    }

    /// How many times the implicit step bands have been assembled.
    pub fn step_operator_builds(&self) -> usize {
        self.sweeps.builds()
    }
}

impl FdmSchemeDesc {
    /// Douglas with θ = ½, the Crank–Nicolson weight.
    ///
    /// The θ = 0.3 used by the corrector schemes leaves the Douglas step
    /// without a stabilising second pass: stiff modes are then amplified
    /// (growth factor up to 1/θ − 1 > 1) and the payoff kink blows up.
    pub fn douglas() -> Self {
        FdmSchemeDesc {
            scheme: FdmSchemeType::Douglas,
            theta: 0.5,
            mu: 0.0,
        }
    }

    /// Craig–Sneyd with θ = ½ and μ = ½.
    ///
    /// Its corrector only revisits the mixed term, so the directional parts
    /// carry the same stiff-mode growth as Douglas below θ = ½.
    pub fn craig_sneyd() -> Self {
        FdmSchemeDesc {
            scheme: FdmSchemeType::CraigSneyd,
            theta: 0.5,
            mu: 0.5,
        }
    }

    pub fn hundsdorfer() -> Self {
        FdmSchemeDesc {
            scheme: FdmSchemeType::Hundsdorfer,
            theta: 0.3,
            mu: 0.5,
        }
    }

    /// θ ∈ (0, 1], μ ∈ [0, 1]
    pub fn validate(&self) -> PdeResult<()> {
        if !(self.theta > 0.0 && self.theta <= 1.0) {
            return Err(PdeError::InvalidParameters {
                parameter: "theta".to_string(),
                value: self.theta,
                constraint: "implicitness must be in (0, 1]; θ = 0 is fully explicit and unstable"
                    .to_string(),
            });
        }
        validate_range("mu", self.mu, 0.0, 1.0)
    }

    /// Advance `u` from time to maturity `tau` to `tau + dt` into `out`.
    ///
    /// `operator` must already be set to the step's time. `u`, `out` and
    /// `workspace` must all have the operator's grid shape.
    #[allow(clippy::too_many_arguments)]
    pub fn step(
        &self,
        operator: &FdmOperator,
        boundaries: &BoundaryConditionSet,
        u: &Array2<f64>,
        tau: f64,
        dt: f64,
        workspace: &mut AdiWorkspace,
        out: &mut Array2<f64>,
    ) -> PdeResult<()> {
        if !(dt > 0.0) {
            return Err(PdeError::InvalidParameters {
                parameter: "dt".to_string(),
                value: dt,
                constraint: "time step must be positive".to_string(),
            });
        }
        let shape = operator.mesher().shape();
        if u.dim() != shape || out.dim() != shape || workspace.shape() != shape {
            return Err(PdeError::config(
                "workspace",
                format!("grid buffers must match the {:?} mesh", shape),
            ));
        }
        let (theta, mu) = (self.theta, self.mu);
        match self.scheme {
            FdmSchemeType::Douglas => {
                Douglas::step(operator, boundaries, u, tau, dt, theta, workspace, out)
            }
            FdmSchemeType::CraigSneyd => {
                CraigSneyd::step(operator, boundaries, u, tau, dt, theta, mu, workspace, out)
            }
            FdmSchemeType::Hundsdorfer => {
                Hundsdorfer::step(operator, boundaries, u, tau, dt, theta, mu, workspace, out)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fdm::boundary::{DirichletBoundary, Side};
    use crate::fdm::mesher::{AxisSpec, FdmMesher};
    use crate::models::model::{Coordinate, Dimension, FdmProcess, PdeCoefficients};
    use approx::assert_abs_diff_eq;
    use std::f64::consts::PI;
    use std::sync::Arc;

    /// Heat equation `u_τ = u_xx + u_yy`.
    struct Heat {
        cross: f64,
    }

    impl FdmProcess for Heat {
        fn coordinates(&self) -> [Coordinate; 2] {
            [Coordinate::Linear, Coordinate::Linear]
        }
        fn coefficients(&self, _x: f64, _y: f64, _t: f64) -> PdeCoefficients {
            PdeCoefficients {
                drift: [0.0, 0.0],
                diffusion: [1.0, 1.0],
                cross: self.cross,
                discount: 0.0,
            }
        }
        fn name(&self) -> &'static str {
            "Heat"
        }
    }

    fn setup(cross: f64) -> (FdmOperator, BoundaryConditionSet, Array2<f64>) {
        let mesher = Arc::new(
            FdmMesher::from_specs(
                &AxisSpec::uniform(0.0, 1.0, 41, Coordinate::Linear),
                &AxisSpec::uniform(0.0, 1.0, 41, Coordinate::Linear),
            )
            .expect("Valid mesher"),
        );
        let operator = FdmOperator::new(Arc::new(Heat { cross }), mesher.clone(), 1.0, 0.0)
            .expect("Valid operator");
        let mut boundaries = BoundaryConditionSet::new();
        for dim in Dimension::ALL {
            for side in [Side::Lower, Side::Upper] {
                boundaries.push(DirichletBoundary::fixed(dim, side, 0.0));
            }
        }
        let xs = mesher.axis(Dimension::Spot).locations().to_vec();
        let ys = mesher.axis(Dimension::Variance).locations().to_vec();
        let u0 = Array2::from_shape_fn(mesher.shape(), |(i, j)| {
            (PI * xs[i]).sin() * (PI * ys[j]).sin()
        });
        (operator, boundaries, u0)
    }

    /// March `steps` steps of `dt` from `u0`, swapping two grid buffers.
    fn march(
        desc: FdmSchemeDesc,
        operator: &FdmOperator,
        boundaries: &BoundaryConditionSet,
        u0: &Array2<f64>,
        steps: usize,
        dt: f64,
        workspace: &mut AdiWorkspace,
    ) -> Array2<f64> {
        let mut u = u0.clone();
        let mut next = Array2::zeros(u0.raw_dim());
        for n in 0..steps {
            desc.step(operator, boundaries, &u, n as f64 * dt, dt, workspace, &mut next)
                .expect("Stable step");
            std::mem::swap(&mut u, &mut next);
        }
        u
    }

    #[test]
    fn test_schemes_decay_heat_mode() {
        // u = e^{-2π²τ} sin(πx) sin(πy)
        let (operator, boundaries, u0) = setup(0.0);
        let (steps, horizon) = (40, 0.05);
        let dt = horizon / steps as f64;
        let exact = (-2.0 * PI * PI * horizon).exp();

        for desc in [
            FdmSchemeDesc::douglas(),
            FdmSchemeDesc::craig_sneyd(),
            FdmSchemeDesc::hundsdorfer(),
        ] {
            let mut workspace = AdiWorkspace::new(u0.dim());
            let u = march(desc, &operator, &boundaries, &u0, steps, dt, &mut workspace);
            println!("{}: centre {:.6} vs exact {:.6}", desc.scheme, u[[20, 20]], exact);
            assert_abs_diff_eq!(u[[20, 20]], exact, epsilon = 5e-3);
            assert_eq!(u[[0, 7]], 0.0);
            assert_eq!(u[[40, 40]], 0.0);
        }
    }

    #[test]
    fn test_craig_sneyd_equals_douglas_without_cross_term() {
        let (operator, boundaries, u0) = setup(0.0);
        let dt = 1e-3;
        let douglas = march(
            FdmSchemeDesc::douglas(),
            &operator,
            &boundaries,
            &u0,
            1,
            dt,
            &mut AdiWorkspace::new(u0.dim()),
        );
        let craig_sneyd = march(
            FdmSchemeDesc::craig_sneyd(),
            &operator,
            &boundaries,
            &u0,
            1,
            dt,
            &mut AdiWorkspace::new(u0.dim()),
        );
        for (a, b) in douglas.iter().zip(craig_sneyd.iter()) {
            assert_abs_diff_eq!(*a, *b, epsilon = 1e-14);
        }
    }

    #[test]
    fn test_mixed_term_stays_stable() {
        let (operator, boundaries, u0) = setup(0.8);
        let mut workspace = AdiWorkspace::new(u0.dim());
        let u = march(
            FdmSchemeDesc::hundsdorfer(),
            &operator,
            &boundaries,
            &u0,
            100,
            1e-4,
            &mut workspace,
        );
        assert!(u.iter().all(|v| v.is_finite()));
        assert!(u[[20, 20]] > 0.0 && u[[20, 20]] < 1.0);
    }

    #[test]
    fn test_workspace_reuses_step_bands() {
        let (operator, boundaries, u0) = setup(0.8);
        let dt = 1e-3;

        for desc in [
            FdmSchemeDesc::douglas(),
            FdmSchemeDesc::craig_sneyd(),
            FdmSchemeDesc::hundsdorfer(),
        ] {
            let mut shared = AdiWorkspace::new(u0.dim());
            let reused = march(desc, &operator, &boundaries, &u0, 25, dt, &mut shared);
            assert_eq!(shared.step_operator_builds(), 1, "{}", desc.scheme);

            // a fresh workspace per step must give the same grid
            let mut u = u0.clone();
            for n in 0..25 {
                let mut next = Array2::zeros(u0.raw_dim());
                desc.step(
                    &operator,
                    &boundaries,
                    &u,
                    n as f64 * dt,
                    dt,
                    &mut AdiWorkspace::new(u0.dim()),
                    &mut next,
                )
                .expect("Stable step");
                u = next;
            }
            assert_eq!(reused, u, "{}", desc.scheme);

            // a different step size reassembles the bands once
            let mut next = Array2::zeros(u0.raw_dim());
            for _ in 0..3 {
                desc.step(&operator, &boundaries, &u0, 0.0, 0.5 * dt, &mut shared, &mut next)
                    .expect("Stable step");
            }
            assert_eq!(shared.step_operator_builds(), 2, "{}", desc.scheme);
        }
    }

    #[test]
    fn test_default_weights() {
        let douglas = FdmSchemeDesc::douglas();
        assert_eq!((douglas.theta, douglas.mu), (0.5, 0.0));
        let craig_sneyd = FdmSchemeDesc::craig_sneyd();
        assert_eq!((craig_sneyd.theta, craig_sneyd.mu), (0.5, 0.5));
        let default = FdmSchemeDesc::default();
        assert_eq!(default.scheme, FdmSchemeType::Hundsdorfer);
        assert_eq!((default.theta, default.mu), (0.3, 0.5));
    }

    #[test]
    fn test_validation() {
        assert!(FdmSchemeDesc::default().validate().is_ok());
        let explicit = FdmSchemeDesc {
            theta: 0.0,
            ..FdmSchemeDesc::douglas()
        };
        assert!(explicit.validate().is_err());
        let bad_mu = FdmSchemeDesc {
            mu: 1.5,
            ..FdmSchemeDesc::craig_sneyd()
        };
        assert!(bad_mu.validate().is_err());

        let (operator, boundaries, u0) = setup(0.0);
        let mut workspace = AdiWorkspace::new(u0.dim());
        let mut out = Array2::zeros(u0.raw_dim());
        assert!(FdmSchemeDesc::douglas()
            .step(&operator, &boundaries, &u0, 0.0, 0.0, &mut workspace, &mut out)
            .is_err());

        let mut small = AdiWorkspace::new((5, 5));
        let err = FdmSchemeDesc::douglas()
            .step(&operator, &boundaries, &u0, 0.0, 1e-3, &mut small, &mut out)
            .unwrap_err();
        assert!(err.is_configuration());
    }
}
