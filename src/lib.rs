//! # fast-pde: Finite-Difference ADI Engine for Two-Factor Pricing PDEs
//!
//! A Rust library that prices derivatives whose value solves a parabolic PDE in
//! two state variables (spot and instantaneous variance) by marching a
//! discretized grid backward from maturity to the valuation date.
//!
//! ## Key Features
//!
//! - **Non-uniform meshes**: asinh concentration around strikes and zero variance
//! - **Operator splitting**: Douglas, Craig–Sneyd and Hundsdorfer–Verwer ADI schemes
//! - **Banded solves**: O(n) tridiagonal sweeps, parallel across grid lines with Rayon
//! - **Step conditions**: early exercise and snapshots fired at exact times
//! - **Lazy evaluation**: results cached against versioned input handles
//! - **Greeks**: delta, gamma from a bicubic spline surface, theta from a snapshot
//!
//! ## Quick Start
//!
//! ```rust
//! use fast_pde::fdm::boundary::BoundaryConditionSet;
//! use fast_pde::fdm::fdm_solver::{FdmHestonSolver, SolverConfig};
//! use fast_pde::fdm::mesher::FdmMesher;
//! use fast_pde::fdm::payoffs::Payoff;
//! use fast_pde::fdm::step_condition::StepConditionComposite;
//! use fast_pde::handle::Handle;
//! use fast_pde::models::heston::{Heston, HestonParams};
//!
//! let params = HestonParams::default();
//! let config = SolverConfig {
//!     maturity: 1.0,
//!     time_steps: 50,
//!     ..Default::default()
//! };
//! let mesher = FdmMesher::for_heston(&params, config.maturity, 100.0, 60, 30)
//!     .expect("Valid mesh");
//!
//! let solver = FdmHestonSolver::new(
//!     Handle::new(Heston::new(params).expect("Valid parameters")),
//!     Handle::new(mesher),
//!     Handle::new(StepConditionComposite::new()),
//!     BoundaryConditionSet::new(),
//!     Payoff::EuropeanCall { k: 100.0 },
//!     config,
//! )
//! .expect("Valid solver");
//!
//! let price = solver.value_at(100.0, 0.04).expect("Inside the mesh");
//! println!("Heston call: {:.4}", price);
//! ```
//!
//! ## Mathematical Foundation
//!
//! In time to maturity `τ` the value solves `∂u/∂τ = L u` with
//! `L = L₀ + L₁ + L₀₁`: one tridiagonal operator per dimension and a mixed
//! term. ADI schemes treat `L₀`, `L₁` implicitly one direction at a time and
//! `L₀₁` explicitly.

// Module declarations
pub mod analytics;
pub mod error;
pub mod fdm;
pub mod handle;
pub mod math_utils;
pub mod models;
pub mod solvers;

// Re-export commonly used types for convenience
pub use error::{PdeError, PdeResult};
pub use fdm::fdm_solver::{FdmHestonSolver, Greeks, GreeksConfig, SolverConfig};
pub use handle::Handle;
pub use solvers::{FdmSchemeDesc, FdmSchemeType};
