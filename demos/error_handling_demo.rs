// demos/error_handling_demo.rs
use fast_pde::error::PdeError;
use fast_pde::fdm::boundary::BoundaryConditionSet;
use fast_pde::fdm::fdm_solver::{FdmHestonSolver, SolverConfig};
use fast_pde::fdm::mesher::{AxisSpec, FdmMesher};
use fast_pde::fdm::payoffs::Payoff;
use fast_pde::fdm::step_condition::{SnapshotCondition, StepConditionComposite};
use fast_pde::handle::Handle;
use fast_pde::models::heston::{Heston, HestonParams};
use fast_pde::models::model::Coordinate;
use fast_pde::solvers::{FdmSchemeDesc, FdmSchemeType};
use tracing_subscriber::EnvFilter;

fn report<T>(result: Result<T, PdeError>) {
    match result {
        Ok(_) => println!("   Unexpected: Should have failed!"),
        Err(e) => println!("   ✓ Caught error: {}", e),
    }
}

fn solver_with(
    conditions: StepConditionComposite,
    config: SolverConfig,
) -> Result<FdmHestonSolver, PdeError> {
    let params = HestonParams::default();
    let mesher = FdmMesher::for_heston(&params, config.maturity, 100.0, 41, 21)?;
    FdmHestonSolver::new(
        Handle::new(Heston::new(params)?),
        Handle::new(mesher),
        Handle::new(conditions),
        BoundaryConditionSet::new(),
        Payoff::EuropeanCall { k: 100.0 },
        config,
    )
}

fn main() {
    // Feller warnings from the model surface through tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("fast_pde=warn".parse().expect("Valid directive")))
        .init();

    println!("Error Handling Demo for fast-pde");
    println!("================================\n");

    println!("1. Invalid Heston parameters...");
    report(Heston::new(HestonParams {
        rho: 1.5,
        ..HestonParams::default()
    }));

    println!("\n2. Extreme but valid parameters (Feller condition violated)...");
    match Heston::new(HestonParams {
        kappa: 1.0,
        xi: 0.8,
        ..HestonParams::default()
    }) {
        Ok(_) => println!("   ✓ Created with warning"),
        Err(e) => println!("   Error: {}", e),
    }

    println!("\n3. Degenerate mesh specification...");
    report(FdmMesher::from_specs(
        &AxisSpec::uniform(100.0, 50.0, 51, Coordinate::Log),
        &AxisSpec::uniform(0.0, 1.0, 21, Coordinate::Linear),
    ));

    println!("\n4. Scheme with theta outside (0, 1]...");
    report(solver_with(
        StepConditionComposite::new(),
        SolverConfig {
            scheme: FdmSchemeDesc {
                scheme: FdmSchemeType::Douglas,
                theta: 1.5,
                mu: 0.0,
            },
            ..SolverConfig::default()
        },
    ));

    println!("\n5. Step condition after maturity...");
    report(solver_with(
        StepConditionComposite::new().with(SnapshotCondition::new(2.0)),
        SolverConfig::default(),
    ));

    println!("\n6. Queries against a valid solver...");
    let solver = match solver_with(StepConditionComposite::new(), SolverConfig::default()) {
        Ok(solver) => solver,
        Err(e) => {
            println!("   Unexpected error: {}", e);
            return;
        }
    };
    match solver.value_at(100.0, 0.04) {
        Ok(price) => println!("   ✓ Success: price = {:.6}", price),
        Err(e) => println!("   Unexpected error: {}", e),
    }

    println!("\n7. Query outside the mesh...");
    match solver.value_at(5.0, 0.04) {
        Err(PdeError::OutOfDomain {
            dimension,
            value,
            min,
            max,
        }) => println!(
            "   ✓ Caught OutOfDomain: {} = {} not in [{:.4}, {:.4}]",
            dimension, value, min, max
        ),
        Err(other) => println!("   Unexpected error type: {}", other),
        Ok(_) => println!("   Unexpected: Should have failed!"),
    }

    println!("\n8. Bump size larger than the local spacing...");
    match solver.delta_at(100.0, 0.04, 10.0) {
        Err(e) if e.is_configuration() => println!("   ✓ Caught configuration error: {}", e),
        Err(e) => println!("   Unexpected error type: {}", e),
        Ok(_) => println!("   Unexpected: Should have failed!"),
    }

    println!("\n✓ Error handling demo complete!");
}
