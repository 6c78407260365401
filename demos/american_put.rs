// demos/american_put.rs
use fast_pde::fdm::boundary::{BoundaryConditionSet, DirichletBoundary, Side};
use fast_pde::fdm::fdm_solver::{FdmHestonSolver, SolverConfig};
use fast_pde::fdm::mesher::FdmMesher;
use fast_pde::fdm::payoffs::Payoff;
use fast_pde::fdm::step_condition::{ExerciseCondition, StepConditionComposite};
use fast_pde::handle::Handle;
use fast_pde::models::heston::{Heston, HestonParams};
use fast_pde::models::model::Dimension;
use tracing_subscriber::EnvFilter;

const STRIKE: f64 = 100.0;

fn put_solver(
    params: HestonParams,
    conditions: StepConditionComposite,
) -> FdmHestonSolver {
    let config = SolverConfig {
        maturity: 1.0,
        time_steps: 100,
        ..SolverConfig::default()
    };
    let mesher = FdmMesher::for_heston(&params, config.maturity, STRIKE, 101, 51)
        .expect("Valid mesh");
    let s_min = mesher.axis(Dimension::Spot).state(0);
    let r = params.r;
    let exercisable = !conditions.is_empty();
    // deep in the money an exercisable put is worth its intrinsic value
    let boundaries = BoundaryConditionSet::new()
        .with(DirichletBoundary::with_rule(
            Dimension::Spot,
            Side::Lower,
            move |_, tau| {
                let held = STRIKE * (-r * tau).exp() - s_min;
                if exercisable {
                    held.max(STRIKE - s_min)
                } else {
                    held
                }
            },
        ))
        .with(DirichletBoundary::fixed(Dimension::Spot, Side::Upper, 0.0));

    FdmHestonSolver::new(
        Handle::new(Heston::new(params).expect("Valid parameters")),
        Handle::new(mesher),
        Handle::new(conditions),
        boundaries,
        Payoff::EuropeanPut { k: STRIKE },
        config,
    )
    .expect("Valid solver")
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("American vs European put under Heston");
    println!("=====================================\n");

    let params = HestonParams::default();
    let payoff = Payoff::EuropeanPut { k: STRIKE };

    let european = put_solver(params, StepConditionComposite::new());
    let american = put_solver(
        params,
        StepConditionComposite::new().with(ExerciseCondition::american(payoff)),
    );
    let bermudan = put_solver(
        params,
        StepConditionComposite::new().with(ExerciseCondition::bermudan(
            payoff,
            vec![0.25, 0.5, 0.75],
        )),
    );

    println!(
        "{:>8} {:>12} {:>12} {:>12} {:>10}",
        "Spot", "European", "Bermudan", "American", "Premium"
    );
    for s in [70.0, 80.0, 90.0, 100.0, 110.0, 120.0] {
        let e = european.value_at(s, params.v0).expect("Inside the mesh");
        let b = bermudan.value_at(s, params.v0).expect("Inside the mesh");
        let a = american.value_at(s, params.v0).expect("Inside the mesh");
        println!(
            "{:>8.1} {:>12.6} {:>12.6} {:>12.6} {:>10.6}",
            s,
            e,
            b,
            a,
            a - e
        );
    }

    // early-exercise boundary: largest spot node where the put is exercised
    let values = american.result_values().expect("Solved");
    let mesher = american.mesher();
    let spot = mesher.axis(Dimension::Spot);
    let variance = mesher.axis(Dimension::Variance);
    println!("\nExercise boundary at valuation:");
    for j in (0..variance.size()).step_by(10) {
        let boundary = (0..spot.size())
            .filter(|&i| values[[i, j]] <= payoff.value(spot.state(i)) + 1e-10)
            .last()
            .map(|i| spot.state(i));
        match boundary {
            Some(s) => println!("  v = {:>8.4}: S* ≈ {:.4}", variance.state(j), s),
            None => println!("  v = {:>8.4}: no exercise region", variance.state(j)),
        }
    }
}
