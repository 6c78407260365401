//! Finite-difference engine: mesh, operator, boundaries, step conditions,
//! interpolation and the lazily evaluated solver.

pub mod boundary;
pub mod fdm_solver;
pub mod interpolation;
pub mod mesher;
pub mod operator;
pub mod payoffs;
pub mod step_condition;
