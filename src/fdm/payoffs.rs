//! Terminal Payoff Functions
//!
//! # Mathematical Definitions
//!
//! ## Vanilla Options
//! - **Call**: max(S_T - K, 0)
//! - **Put**: max(K - S_T, 0)
//!
//! ## Cash-or-Nothing Digitals
//! - **Digital call**: cash · 1{S_T > K}
//! - **Digital put**: cash · 1{S_T < K}
//!
//! # Implementation Notes
//!
//! Payoffs depend on the terminal spot only, so they are evaluated once per
//! spot mesh line and broadcast along the variance axis. Early-exercise
//! conditions reuse the same function as intrinsic value.

use crate::error::{validation::*, PdeResult};
use serde::{Deserialize, Serialize};

/// Enumeration of supported terminal payoffs
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum Payoff {
    /// European call option: max(S_T - K, 0)
    EuropeanCall { k: f64 },

    /// European put option: max(K - S_T, 0)
    EuropeanPut { k: f64 },

    /// Cash-or-nothing call: cash if S_T > K
    DigitalCall { k: f64, cash: f64 },

    /// Cash-or-nothing put: cash if S_T < K
    DigitalPut { k: f64, cash: f64 },
}

impl Payoff {
    /// Payoff at terminal spot `s` (state units).
    pub fn value(&self, s: f64) -> f64 {
        match *self {
            Payoff::EuropeanCall { k } => (s - k).max(0.0),
            Payoff::EuropeanPut { k } => (k - s).max(0.0),
            Payoff::DigitalCall { k, cash } => {
                if s > k {
                    cash
                } else {
                    0.0
                }
            }
            Payoff::DigitalPut { k, cash } => {
                if s < k {
                    cash
                } else {
                    0.0
                }
            }
        }
    }

    pub fn strike(&self) -> f64 {
        match *self {
            Payoff::EuropeanCall { k }
            | Payoff::EuropeanPut { k }
            | Payoff::DigitalCall { k, .. }
            | Payoff::DigitalPut { k, .. } => k,
        }
    }

    pub fn validate(&self) -> PdeResult<()> {
        validate_positive("strike", self.strike())?;
        match *self {
            Payoff::DigitalCall { cash, .. } | Payoff::DigitalPut { cash, .. } => {
                validate_finite("cash", cash)
            }
            _ => Ok(()),
        }
    }
}
