// src/fdm/fdm_solver.rs
//! Finite-difference solver for two-factor pricing problems
//!
//! # Lifecycle
//!
//! The solver reads its process, mesh and step conditions through versioned
//! [`Handle`]s. A solved grid is cached together with the three handle
//! generations it was computed from; a query compares them with the current
//! generations and recomputes on mismatch. Recomputation holds the cache's
//! write lock, so concurrent queries against one instance wait for a single
//! writer instead of solving twice.
//!
//! # Backward March
//!
//! Working in time to maturity `τ`:
//! 1. the grid is initialised with the payoff at `τ = 0`;
//! 2. boundaries and step conditions are applied at `τ = 0`;
//! 3. each step advances by the scheme, then fires matching conditions;
//! 4. the grid at `τ = T` is interpolated by a bicubic spline.
//!
//! Steps are equally spaced, except that a step straddling a condition's
//! trigger time is split so the condition fires exactly at its time.
//!
//! # Theta
//!
//! Theta comes from a recorded snapshot, never from a second solve:
//! ```text
//! Θ = (V(τ_snap) - V(T)) / (T - τ_snap)
//! ```
//! The snapshot nearest the valuation date is used. Without a registered one
//! the solver records its own at calendar time `0.99·min(1/365, T)`.

use crate::error::{validation::*, PdeError, PdeResult};
use crate::fdm::boundary::BoundaryConditionSet;
use crate::fdm::interpolation::BicubicSpline;
use crate::fdm::mesher::FdmMesher;
use crate::fdm::operator::{FdmOperator, DEFAULT_PECLET_THRESHOLD};
use crate::fdm::payoffs::Payoff;
use crate::fdm::step_condition::{
    Snapshot, SnapshotCondition, StepConditionComposite, TIME_TOLERANCE,
};
use crate::handle::Handle;
use crate::math_utils::Timer;
use crate::models::heston::Heston;
use crate::models::model::{Dimension, FdmProcess};
use crate::solvers::{AdiWorkspace, FdmSchemeDesc};
use bitflags::bitflags;
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock};
use tracing::{debug, trace};

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct GreeksConfig: u32 {
        const NONE  = 0;
        const VALUE = 1 << 0;
        const DELTA = 1 << 1;
        const GAMMA = 1 << 2;
        const THETA = 1 << 3;
        const ALL = Self::VALUE.bits() | Self::DELTA.bits() | Self::GAMMA.bits() | Self::THETA.bits();
    }
}

/// Sensitivities at one point; fields not requested are `None`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Greeks {
    pub value: Option<f64>,
    pub delta: Option<f64>,
    pub gamma: Option<f64>,
    pub theta: Option<f64>,
}

fn default_peclet_threshold() -> f64 {
    DEFAULT_PECLET_THRESHOLD
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SolverConfig {
    /// Years from valuation to payoff
    pub maturity: f64,
    /// Nominal number of equally spaced steps
    pub time_steps: usize,
    pub scheme: FdmSchemeDesc,
    #[serde(default = "default_peclet_threshold")]
    pub peclet_threshold: f64,
    /// Calendar time (years after valuation) of the built-in theta snapshot
    #[serde(default)]
    pub theta_snapshot_time: Option<f64>,
}

impl Default for SolverConfig {
    fn default() -> Self {
        SolverConfig {
            maturity: 1.0,
            time_steps: 100,
            scheme: FdmSchemeDesc::default(),
            peclet_threshold: DEFAULT_PECLET_THRESHOLD,
            theta_snapshot_time: None,
        }
    }
}

impl SolverConfig {
    pub fn validate(&self) -> PdeResult<()> {
        validate_positive("maturity", self.maturity)?;
        validate_steps(self.time_steps)?;
        validate_positive("dt", self.maturity / self.time_steps as f64)?;
        self.scheme.validate()?;
        validate_positive("peclet_threshold", self.peclet_threshold)?;
        if let Some(t) = self.theta_snapshot_time {
            if !(t > 0.0 && t <= self.maturity) {
                return Err(PdeError::InvalidParameters {
                    parameter: "theta_snapshot_time".to_string(),
                    value: t,
                    constraint: format!("must be in (0, {}]", self.maturity),
                });
            }
        }
        Ok(())
    }

    /// Time to maturity of the built-in theta snapshot.
    pub fn theta_snapshot_tau(&self) -> f64 {
        let t = self
            .theta_snapshot_time
            .unwrap_or(0.99 * (1.0 / 365.0_f64).min(self.maturity));
        self.maturity - t
    }
}

/// Summary of the last recomputation.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SolverDiagnostics {
    pub time_slices: usize,
    pub operator_refreshes: usize,
    /// Assemblies of the implicit `I − θΔτ L_d` bands
    pub step_operator_builds: usize,
    pub theta_snapshot_tau: f64,
    pub elapsed_ms: f64,
}

struct SolverResult {
    stamp: [u64; 3],
    mesher: Arc<FdmMesher>,
    values: Array2<f64>,
    surface: BicubicSpline,
    snapshot: Snapshot,
    snapshot_surface: BicubicSpline,
    diagnostics: SolverDiagnostics,
}

/// Merge the nominal step grid with stopping times strictly inside `(0, T)`.
fn time_grid(maturity: f64, steps: usize, stopping: &[f64]) -> Vec<f64> {
    let dt = maturity / steps as f64;
    let mut times: Vec<f64> = (0..=steps).map(|k| k as f64 * dt).collect();
    times[steps] = maturity;
    for &t in stopping {
        if t > TIME_TOLERANCE
            && t < maturity - TIME_TOLERANCE
            && !times.iter().any(|x| (x - t).abs() <= TIME_TOLERANCE)
        {
            times.push(t);
        }
    }
    times.sort_by(|a, b| a.total_cmp(b));
    times
}

/// Lazily evaluated finite-difference solver.
///
/// Generic over the process; `FdmHestonSolver` alone means the Heston model.
pub struct FdmHestonSolver<P: FdmProcess + 'static = Heston> {
    process: Handle<P>,
    mesher: Handle<FdmMesher>,
    conditions: Handle<StepConditionComposite>,
    boundaries: BoundaryConditionSet,
    payoff: Payoff,
    config: SolverConfig,
    cache: RwLock<Option<Arc<SolverResult>>>,
}

impl<P: FdmProcess + 'static> FdmHestonSolver<P> {
    /// Validates every input eagerly; nothing is solved until the first query.
    pub fn new(
        process: Handle<P>,
        mesher: Handle<FdmMesher>,
        conditions: Handle<StepConditionComposite>,
        boundaries: BoundaryConditionSet,
        payoff: Payoff,
        config: SolverConfig,
    ) -> PdeResult<Self> {
        config.validate()?;
        payoff.validate()?;

        let solver = FdmHestonSolver {
            process,
            mesher,
            conditions,
            boundaries,
            payoff,
            config,
            cache: RwLock::new(None),
        };
        solver.validate_inputs(
            &solver.process.get(),
            &solver.mesher.get(),
            &solver.conditions.get(),
        )?;
        Ok(solver)
    }

    fn validate_inputs(
        &self,
        process: &Arc<P>,
        mesher: &Arc<FdmMesher>,
        conditions: &StepConditionComposite,
    ) -> PdeResult<()> {
        conditions.validate(self.config.maturity)?;
        self.boundaries
            .validate(mesher, &[0.0, self.config.maturity])?;
        // coefficient and coordinate checks live in the operator
        let process: Arc<dyn FdmProcess> = Arc::clone(process) as Arc<dyn FdmProcess>;
        FdmOperator::new(
            process,
            Arc::clone(mesher),
            self.config.peclet_threshold,
            0.0,
        )?;
        Ok(())
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    pub fn payoff(&self) -> &Payoff {
        &self.payoff
    }

    pub fn process(&self) -> &Handle<P> {
        &self.process
    }

    /// Mesh currently linked to the solver.
    pub fn mesher(&self) -> Arc<FdmMesher> {
        self.mesher.get()
    }

    fn stamp(&self) -> [u64; 3] {
        [
            self.process.generation(),
            self.mesher.generation(),
            self.conditions.generation(),
        ]
    }

    /// True when a cached solution matches the current inputs.
    pub fn is_fresh(&self) -> bool {
        let stamp = self.stamp();
        self.cache
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .map_or(false, |r| r.stamp == stamp)
    }

    /// Drop the cached solution; the next query recomputes.
    pub fn invalidate(&self) {
        *self.cache.write().unwrap_or_else(|e| e.into_inner()) = None;
    }

    /// Solve now if stale.
    pub fn calculate(&self) -> PdeResult<()> {
        self.fresh_result().map(|_| ())
    }

    fn fresh_result(&self) -> PdeResult<Arc<SolverResult>> {
        let stamp = self.stamp();
        if let Some(result) = self
            .cache
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
        {
            if result.stamp == stamp {
                return Ok(Arc::clone(result));
            }
        }

        let mut cache = self.cache.write().unwrap_or_else(|e| e.into_inner());
        let (process, process_gen) = self.process.current();
        let (mesher, mesher_gen) = self.mesher.current();
        let (conditions, conditions_gen) = self.conditions.current();
        let stamp = [process_gen, mesher_gen, conditions_gen];

        // another writer may have finished while we waited
        if let Some(result) = cache.as_ref() {
            if result.stamp == stamp {
                return Ok(Arc::clone(result));
            }
        }

        let result = Arc::new(self.solve(stamp, process, mesher, &conditions)?);
        *cache = Some(Arc::clone(&result));
        Ok(result)
    }

    fn solve(
        &self,
        stamp: [u64; 3],
        process: Arc<P>,
        mesher: Arc<FdmMesher>,
        conditions: &StepConditionComposite,
    ) -> PdeResult<SolverResult> {
        let timer = Timer::new();
        let maturity = self.config.maturity;
        let scheme = self.config.scheme;

        // relinked inputs are validated again before use
        self.validate_inputs(&process, &mesher, conditions)?;

        let mut composite = conditions.clone();
        let theta_tau = match composite
            .snapshot_times()
            .into_iter()
            .filter(|&t| t < maturity - TIME_TOLERANCE)
            .last()
        {
            Some(tau) => tau,
            None => {
                let tau = self.config.theta_snapshot_tau();
                composite.push(Arc::new(SnapshotCondition::new(tau)));
                tau
            }
        };

        let times = time_grid(maturity, self.config.time_steps, &composite.stopping_times());
        let (n_spot, n_var) = mesher.shape();
        debug!(
            process = process.name(),
            scheme = %scheme.scheme,
            theta = scheme.theta,
            mu = scheme.mu,
            n_spot,
            n_var,
            slices = times.len() - 1,
            "recomputing finite-difference solution"
        );

        let spot = mesher.axis(Dimension::Spot);
        let mut values = Array2::from_shape_fn(mesher.shape(), |(i, _)| {
            self.payoff.value(spot.state(i))
        });
        let mut snapshots: Vec<Snapshot> = Vec::new();
        self.boundaries.apply_to(&mut values, &mesher, 0.0);
        composite.apply_to(&mut values, &mesher, 0.0, &mut snapshots);

        let first_mid = maturity - 0.5 * (times[0] + times[1]);
        let dyn_process: Arc<dyn FdmProcess> = process.clone();
        let mut operator = FdmOperator::new(
            dyn_process,
            Arc::clone(&mesher),
            self.config.peclet_threshold,
            first_mid,
        )?;

        let mut next = Array2::zeros(values.raw_dim());
        let mut workspace = AdiWorkspace::new(mesher.shape());
        for (step, window) in times.windows(2).enumerate() {
            let (tau, tau_next) = (window[0], window[1]);
            let dt = tau_next - tau;
            operator.set_time(maturity - (tau + 0.5 * dt))?;

            scheme.step(
                &operator,
                &self.boundaries,
                &values,
                tau,
                dt,
                &mut workspace,
                &mut next,
            )?;
            if let Some(bad) = next.iter().find(|v| !v.is_finite()) {
                return Err(PdeError::NumericalInstability {
                    method: scheme.scheme.to_string(),
                    reason: format!(
                        "value {} at step {} (τ = {:.6}, Δτ = {:.3e})",
                        bad, step, tau_next, dt
                    ),
                });
            }
            std::mem::swap(&mut values, &mut next);

            let fired = composite.apply_to(&mut values, &mesher, tau_next, &mut snapshots);
            trace!(step, tau = tau_next, dt, fired, "time step");
        }

        let snapshot = snapshots
            .into_iter()
            .rev()
            .find(|s| (s.tau - theta_tau).abs() <= TIME_TOLERANCE)
            .ok_or_else(|| {
                PdeError::config(
                    "step_conditions",
                    format!("no snapshot recorded at τ = {}", theta_tau),
                )
            })?;

        let xs = spot.locations();
        let ys = mesher.axis(Dimension::Variance).locations();
        let surface = BicubicSpline::new(xs, ys, &values)?;
        let snapshot_surface = BicubicSpline::new(xs, ys, &snapshot.values)?;

        let diagnostics = SolverDiagnostics {
            time_slices: times.len() - 1,
            operator_refreshes: operator.refresh_count(),
            step_operator_builds: workspace.step_operator_builds(),
            theta_snapshot_tau: theta_tau,
            elapsed_ms: timer.elapsed_ms(),
        };
        debug!(
            elapsed_ms = diagnostics.elapsed_ms,
            operator_refreshes = diagnostics.operator_refreshes,
            step_operator_builds = diagnostics.step_operator_builds,
            "finite-difference solution cached"
        );

        Ok(SolverResult {
            stamp,
            mesher,
            values,
            surface,
            snapshot,
            snapshot_surface,
            diagnostics,
        })
    }

    /// Copy of the solved grid at the valuation date, indexed `[spot, variance]`.
    pub fn result_values(&self) -> PdeResult<Array2<f64>> {
        Ok(self.fresh_result()?.values.clone())
    }

    /// Grid recorded for theta, with its time to maturity.
    pub fn theta_snapshot(&self) -> PdeResult<Snapshot> {
        Ok(self.fresh_result()?.snapshot.clone())
    }

    pub fn diagnostics(&self) -> PdeResult<SolverDiagnostics> {
        Ok(self.fresh_result()?.diagnostics)
    }

    /// Mesh coordinates of the state point `(s, v)`.
    fn mesh_point(mesher: &FdmMesher, s: f64, v: f64) -> PdeResult<(f64, f64)> {
        let mut point = [0.0; 2];
        for (dim, state) in [(Dimension::Spot, s), (Dimension::Variance, v)] {
            let axis = mesher.axis(dim);
            let x = axis.coordinate().to_mesh(state);
            if !axis.contains(x) {
                return Err(PdeError::OutOfDomain {
                    dimension: dim.name().to_string(),
                    value: state,
                    min: axis.state(0),
                    max: axis.state(axis.size() - 1),
                });
            }
            point[dim.index()] = x;
        }
        Ok((point[0], point[1]))
    }

    /// `eps` must be positive, at most half the smaller spot cell next to the
    /// node nearest `s`, and keep `s ± eps` inside the mesh.
    fn check_bump(mesher: &FdmMesher, s: f64, eps: f64) -> PdeResult<()> {
        validate_positive("eps", eps)?;
        let axis = mesher.axis(Dimension::Spot);
        let x = axis.coordinate().to_mesh(s);
        let k = axis.locate(x);
        let nearest = if (axis.state(k + 1) - s).abs() < (s - axis.state(k)).abs() {
            k + 1
        } else {
            k
        };
        let mut spacing = f64::INFINITY;
        if nearest > 0 {
            spacing = spacing.min(axis.state(nearest) - axis.state(nearest - 1));
        }
        if nearest + 1 < axis.size() {
            spacing = spacing.min(axis.state(nearest + 1) - axis.state(nearest));
        }
        if eps > 0.5 * spacing {
            return Err(PdeError::InvalidParameters {
                parameter: "eps".to_string(),
                value: eps,
                constraint: format!(
                    "must not exceed half the local spot spacing ({:.6e})",
                    0.5 * spacing
                ),
            });
        }
        let (lo, hi) = (axis.state(0), axis.state(axis.size() - 1));
        if s - eps < lo || s + eps > hi {
            return Err(PdeError::InvalidParameters {
                parameter: "eps".to_string(),
                value: eps,
                constraint: format!("s ± eps must stay inside [{}, {}]", lo, hi),
            });
        }
        Ok(())
    }

    fn value_in(result: &SolverResult, s: f64, v: f64) -> PdeResult<f64> {
        let (x, y) = Self::mesh_point(&result.mesher, s, v)?;
        result.surface.value(x, y)
    }

    /// Interpolated value at spot `s` and variance `v`.
    pub fn value_at(&self, s: f64, v: f64) -> PdeResult<f64> {
        let result = self.fresh_result()?;
        Self::value_in(&result, s, v)
    }

    /// `∂V/∂S` by central differences of the surface with step `eps`.
    pub fn delta_at(&self, s: f64, v: f64, eps: f64) -> PdeResult<f64> {
        let result = self.fresh_result()?;
        Self::mesh_point(&result.mesher, s, v)?;
        Self::check_bump(&result.mesher, s, eps)?;
        let up = Self::value_in(&result, s + eps, v)?;
        let down = Self::value_in(&result, s - eps, v)?;
        Ok((up - down) / (2.0 * eps))
    }

    /// `∂²V/∂S²` by central differences of the surface with step `eps`.
    pub fn gamma_at(&self, s: f64, v: f64, eps: f64) -> PdeResult<f64> {
        let result = self.fresh_result()?;
        let centre = Self::value_in(&result, s, v)?;
        Self::check_bump(&result.mesher, s, eps)?;
        let up = Self::value_in(&result, s + eps, v)?;
        let down = Self::value_in(&result, s - eps, v)?;
        Ok((up - 2.0 * centre + down) / (eps * eps))
    }

    /// `∂V/∂t` in calendar time from the theta snapshot.
    pub fn theta_at(&self, s: f64, v: f64) -> PdeResult<f64> {
        let result = self.fresh_result()?;
        let (x, y) = Self::mesh_point(&result.mesher, s, v)?;
        let now = result.surface.value(x, y)?;
        let later = result.snapshot_surface.value(x, y)?;
        Ok((later - now) / (self.config.maturity - result.diagnostics.theta_snapshot_tau))
    }

    /// Selected sensitivities at one point, from a single cached solution.
    pub fn greeks(&self, s: f64, v: f64, eps: f64, which: GreeksConfig) -> PdeResult<Greeks> {
        let mut greeks = Greeks::default();
        if which.contains(GreeksConfig::VALUE) {
            greeks.value = Some(self.value_at(s, v)?);
        }
        if which.contains(GreeksConfig::DELTA) {
            greeks.delta = Some(self.delta_at(s, v, eps)?);
        }
        if which.contains(GreeksConfig::GAMMA) {
            greeks.gamma = Some(self.gamma_at(s, v, eps)?);
        }
        if which.contains(GreeksConfig::THETA) {
            greeks.theta = Some(self.theta_at(s, v)?);
        }
        Ok(greeks)
    }
}
