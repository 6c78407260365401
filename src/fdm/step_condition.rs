// src/fdm/step_condition.rs
//! Step conditions
//!
//! Hooks that mutate the grid at chosen points of the backward sweep. Trigger
//! times are *times to maturity* `τ`: `τ = 0` is the payoff date and `τ = T`
//! the valuation date.
//!
//! At each visited `τ` (including both ends) the composite runs every
//! condition whose trigger matches within [`TIME_TOLERANCE`], in registration
//! order. A snapshot condition stores a copy of the grid as it stands at that
//! point of the sequence.

use crate::error::{PdeError, PdeResult};
use crate::fdm::mesher::FdmMesher;
use crate::fdm::payoffs::Payoff;
use crate::models::model::Dimension;
use ndarray::{Array2, Axis};
use std::fmt;
use std::sync::Arc;
use tracing::trace;

/// Two times to maturity closer than this are the same time slice.
pub const TIME_TOLERANCE: f64 = 1e-10;

/// When a condition fires.
#[derive(Clone, Debug, PartialEq)]
pub enum FireAt {
    /// At every visited time slice
    EveryStep,
    /// At the listed times to maturity
    Times(Vec<f64>),
}

impl FireAt {
    pub fn matches(&self, tau: f64) -> bool {
        match self {
            FireAt::EveryStep => true,
            FireAt::Times(times) => times.iter().any(|t| (t - tau).abs() <= TIME_TOLERANCE),
        }
    }
}

pub trait StepCondition: Send + Sync {
    fn trigger(&self) -> &FireAt;

    /// Mutate `values` at time to maturity `tau`.
    fn apply_to(&self, values: &mut Array2<f64>, mesher: &FdmMesher, tau: f64);

    /// When true, the composite keeps a copy of the grid after this condition.
    fn records_snapshot(&self) -> bool {
        false
    }

    fn name(&self) -> &'static str;
}

/// Grid recorded by a snapshot condition.
#[derive(Clone, Debug, PartialEq)]
pub struct Snapshot {
    pub tau: f64,
    pub values: Array2<f64>,
}

/// Records the grid at one time to maturity; leaves it unchanged.
#[derive(Clone, Debug)]
pub struct SnapshotCondition {
    tau: f64,
    trigger: FireAt,
}

impl SnapshotCondition {
    pub fn new(tau: f64) -> Self {
        SnapshotCondition {
            tau,
            trigger: FireAt::Times(vec![tau]),
        }
    }

    pub fn tau(&self) -> f64 {
        self.tau
    }
}

impl StepCondition for SnapshotCondition {
    fn trigger(&self) -> &FireAt {
        &self.trigger
    }

    fn apply_to(&self, _values: &mut Array2<f64>, _mesher: &FdmMesher, _tau: f64) {}

    fn records_snapshot(&self) -> bool {
        true
    }

    fn name(&self) -> &'static str {
        "snapshot"
    }
}

/// Early exercise: `V ← max(V, intrinsic(S))` at every mesh point.
#[derive(Clone, Debug)]
pub struct ExerciseCondition {
    payoff: Payoff,
    trigger: FireAt,
}

impl ExerciseCondition {
    /// Exercisable at every time slice.
    pub fn american(payoff: Payoff) -> Self {
        ExerciseCondition {
            payoff,
            trigger: FireAt::EveryStep,
        }
    }

    /// Exercisable at the listed times to maturity.
    pub fn bermudan(payoff: Payoff, exercise_taus: Vec<f64>) -> Self {
        ExerciseCondition {
            payoff,
            trigger: FireAt::Times(exercise_taus),
        }
    }
}

impl StepCondition for ExerciseCondition {
    fn trigger(&self) -> &FireAt {
        &self.trigger
    }

    fn apply_to(&self, values: &mut Array2<f64>, mesher: &FdmMesher, _tau: f64) {
        let spot = mesher.axis(Dimension::Spot);
        for (i, mut line) in values.axis_iter_mut(Axis(0)).enumerate() {
            let intrinsic = self.payoff.value(spot.state(i));
            line.mapv_inplace(|v| v.max(intrinsic));
        }
    }

    fn name(&self) -> &'static str {
        "exercise"
    }
}

/// Ordered collection of step conditions.
#[derive(Clone, Default)]
pub struct StepConditionComposite {
    conditions: Vec<Arc<dyn StepCondition>>,
}

impl fmt::Debug for StepConditionComposite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.conditions.iter().map(|c| c.name()))
            .finish()
    }
}

impl StepConditionComposite {
    /// No-op composite.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with<C: StepCondition + 'static>(mut self, condition: C) -> Self {
        self.push(Arc::new(condition));
        self
    }

    pub fn push(&mut self, condition: Arc<dyn StepCondition>) {
        self.conditions.push(condition);
    }

    pub fn len(&self) -> usize {
        self.conditions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Sorted, de-duplicated trigger times of every time-tagged condition.
    pub fn stopping_times(&self) -> Vec<f64> {
        let mut times: Vec<f64> = self
            .conditions
            .iter()
            .filter_map(|c| match c.trigger() {
                FireAt::Times(times) => Some(times.iter().copied()),
                FireAt::EveryStep => None,
            })
            .flatten()
            .collect();
        times.sort_by(|a, b| a.total_cmp(b));
        times.dedup_by(|a, b| (*a - *b).abs() <= TIME_TOLERANCE);
        times
    }

    /// Trigger times of the snapshot-recording conditions.
    pub fn snapshot_times(&self) -> Vec<f64> {
        let mut times: Vec<f64> = self
            .conditions
            .iter()
            .filter(|c| c.records_snapshot())
            .filter_map(|c| match c.trigger() {
                FireAt::Times(times) => Some(times.iter().copied()),
                FireAt::EveryStep => None,
            })
            .flatten()
            .collect();
        times.sort_by(|a, b| a.total_cmp(b));
        times
    }

    /// Every trigger time must be finite and inside `[0, maturity]`.
    pub fn validate(&self, maturity: f64) -> PdeResult<()> {
        for condition in &self.conditions {
            if let FireAt::Times(times) = condition.trigger() {
                if let Some(bad) = times
                    .iter()
                    .find(|&&t| !(t >= -TIME_TOLERANCE && t <= maturity + TIME_TOLERANCE))
                {
                    return Err(PdeError::config(
                        "step_conditions",
                        format!(
                            "{} condition fires at τ = {}, outside [0, {}]",
                            condition.name(),
                            bad,
                            maturity
                        ),
                    ));
                }
            }
        }
        Ok(())
    }

    /// Run every condition matching `tau` in registration order. Snapshots are
    /// appended to `snapshots`. Returns the number of conditions fired.
    pub fn apply_to(
        &self,
        values: &mut Array2<f64>,
        mesher: &FdmMesher,
        tau: f64,
        snapshots: &mut Vec<Snapshot>,
    ) -> usize {
        let mut fired = 0;
        for condition in &self.conditions {
            if !condition.trigger().matches(tau) {
                continue;
            }
            condition.apply_to(values, mesher, tau);
            if condition.records_snapshot() {
                snapshots.push(Snapshot {
                    tau,
                    values: values.clone(),
                });
            }
            trace!(tau, condition = condition.name(), "step condition fired");
            fired += 1;
        }
        fired
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fdm::mesher::AxisSpec;
    use crate::models::model::Coordinate;

    fn mesher() -> FdmMesher {
        FdmMesher::from_specs(
            &AxisSpec::uniform(80.0, 120.0, 5, Coordinate::Linear),
            &AxisSpec::uniform(0.0, 0.2, 3, Coordinate::Linear),
        )
        .expect("Valid mesher")
    }

    /// Adds a constant; used to observe ordering.
    struct Shift(f64, FireAt);

    impl StepCondition for Shift {
        fn trigger(&self) -> &FireAt {
            &self.1
        }
        fn apply_to(&self, values: &mut Array2<f64>, _mesher: &FdmMesher, _tau: f64) {
            values.mapv_inplace(|v| v + self.0);
        }
        fn name(&self) -> &'static str {
            "shift"
        }
    }

    #[test]
    fn test_conditions_run_in_registration_order() {
        let mesher = mesher();
        let composite = StepConditionComposite::new()
            .with(Shift(1.0, FireAt::Times(vec![0.5])))
            .with(SnapshotCondition::new(0.5))
            .with(Shift(10.0, FireAt::EveryStep));

        let mut values = Array2::zeros(mesher.shape());
        let mut snapshots = Vec::new();
        let fired = composite.apply_to(&mut values, &mesher, 0.5 + 1e-12, &mut snapshots);

        assert_eq!(fired, 3);
        assert_eq!(snapshots.len(), 1);
        assert!(snapshots[0].values.iter().all(|&v| v == 1.0));
        assert!(values.iter().all(|&v| v == 11.0));

        let fired = composite.apply_to(&mut values, &mesher, 0.25, &mut snapshots);
        assert_eq!(fired, 1);
        assert_eq!(snapshots.len(), 1);
    }

    #[test]
    fn test_empty_composite_is_a_no_op() {
        let mesher = mesher();
        let composite = StepConditionComposite::new();
        let mut values = Array2::from_elem(mesher.shape(), 3.0);
        let mut snapshots = Vec::new();
        assert_eq!(composite.apply_to(&mut values, &mesher, 0.0, &mut snapshots), 0);
        assert!(values.iter().all(|&v| v == 3.0));
        assert!(composite.stopping_times().is_empty());
    }

    #[test]
    fn test_exercise_floors_at_intrinsic() {
        let mesher = mesher();
        let exercise = ExerciseCondition::american(Payoff::EuropeanPut { k: 100.0 });
        let mut values = Array2::from_elem(mesher.shape(), 5.0);
        exercise.apply_to(&mut values, &mesher, 0.3);

        // spots 80, 90, 100, 110, 120 → intrinsic 20, 10, 0, 0, 0
        assert_eq!(values[[0, 1]], 20.0);
        assert_eq!(values[[1, 2]], 10.0);
        assert_eq!(values[[2, 0]], 5.0);
        assert_eq!(values[[4, 1]], 5.0);
    }

    #[test]
    fn test_stopping_times_sorted_and_deduplicated() {
        let composite = StepConditionComposite::new()
            .with(SnapshotCondition::new(0.75))
            .with(ExerciseCondition::bermudan(
                Payoff::EuropeanPut { k: 100.0 },
                vec![0.5, 0.25, 0.75],
            ))
            .with(ExerciseCondition::american(Payoff::EuropeanPut { k: 100.0 }));

        assert_eq!(composite.stopping_times(), vec![0.25, 0.5, 0.75]);
        assert_eq!(composite.snapshot_times(), vec![0.75]);
        assert!(composite.validate(1.0).is_ok());
        assert!(composite.validate(0.6).is_err());
    }
}
