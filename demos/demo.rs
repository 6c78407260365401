// demos/demo.rs
use fast_pde::analytics::bs_analytic;
use fast_pde::fdm::boundary::{BoundaryConditionSet, DirichletBoundary, Side};
use fast_pde::fdm::fdm_solver::{FdmHestonSolver, GreeksConfig, SolverConfig};
use fast_pde::fdm::mesher::{AxisSpec, FdmMesher};
use fast_pde::fdm::payoffs::Payoff;
use fast_pde::fdm::step_condition::StepConditionComposite;
use fast_pde::handle::Handle;
use fast_pde::math_utils::Timer;
use fast_pde::models::gbm::BlackScholesProcess;
use fast_pde::models::heston::{Heston, HestonParams};
use fast_pde::models::model::{Coordinate, Dimension};
use fast_pde::solvers::FdmSchemeDesc;
use rayon::prelude::*;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("fast_pde=info".parse().expect("Valid directive")))
        .init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() > 1 && args[1] == "--lognormal" {
        run_lognormal_check();
    } else {
        run_heston_demo();
    }
}

fn heston_call(params: HestonParams, k: f64, scheme: FdmSchemeDesc) -> FdmHestonSolver {
    let config = SolverConfig {
        maturity: 1.0,
        time_steps: 100,
        scheme,
        ..SolverConfig::default()
    };
    let mesher =
        FdmMesher::for_heston(&params, config.maturity, k, 101, 51).expect("Valid mesh");
    FdmHestonSolver::new(
        Handle::new(Heston::new(params).expect("Valid parameters")),
        Handle::new(mesher),
        Handle::new(StepConditionComposite::new()),
        BoundaryConditionSet::new(),
        Payoff::EuropeanCall { k },
        config,
    )
    .expect("Valid solver")
}

fn run_heston_demo() {
    println!("fast-pde: Heston ADI Demo");
    println!("=========================\n");

    let params = HestonParams::default();
    println!(
        "S0 = {}, v0 = {}, r = {}, κ = {}, θ = {}, ξ = {}, ρ = {}",
        params.s0, params.v0, params.r, params.kappa, params.theta, params.xi, params.rho
    );
    println!("Feller condition satisfied: {}\n", params.feller_satisfied());

    println!("{:<22} {:>12} {:>12}", "Scheme", "Price", "Time (ms)");
    println!("{:-<48}", "");
    for scheme in [
        FdmSchemeDesc::douglas(),
        FdmSchemeDesc::craig_sneyd(),
        FdmSchemeDesc::hundsdorfer(),
    ] {
        let solver = heston_call(params, 100.0, scheme);
        let timer = Timer::new();
        let price = solver.value_at(params.s0, params.v0).expect("Inside the mesh");
        println!(
            "{:<22} {:>12.6} {:>12.2}",
            scheme.scheme.to_string(),
            price,
            timer.elapsed_ms()
        );
    }

    let solver = heston_call(params, 100.0, FdmSchemeDesc::default());
    let greeks = solver
        .greeks(params.s0, params.v0, 0.5, GreeksConfig::ALL)
        .expect("Valid query");
    let diagnostics = solver.diagnostics().expect("Solved");
    println!("\nGreeks at (S0, v0), Hundsdorfer-Verwer:");
    println!("  value: {:>10.6}", greeks.value.unwrap_or(f64::NAN));
    println!("  delta: {:>10.6}", greeks.delta.unwrap_or(f64::NAN));
    println!("  gamma: {:>10.6}", greeks.gamma.unwrap_or(f64::NAN));
    println!("  theta: {:>10.6}", greeks.theta.unwrap_or(f64::NAN));
    println!(
        "  ({} time slices, theta snapshot at τ = {:.6})",
        diagnostics.time_slices, diagnostics.theta_snapshot_tau
    );

    // one independent solver per strike
    let strikes = [80.0, 90.0, 100.0, 110.0, 120.0];
    let timer = Timer::new();
    let strip: Vec<(f64, f64)> = strikes
        .par_iter()
        .map(|&k| {
            let price = heston_call(params, k, FdmSchemeDesc::default())
                .value_at(params.s0, params.v0)
                .expect("Inside the mesh");
            (k, price)
        })
        .collect();
    println!(
        "\nStrike strip ({} solvers on {} threads, {:.1} ms):",
        strikes.len(),
        rayon::current_num_threads(),
        timer.elapsed_ms()
    );
    for (k, price) in strip {
        let flat = bs_analytic::bs_call_price(params.s0, k, params.r, params.q, params.v0.sqrt(), 1.0);
        println!("  K = {:>6.1}: Heston {:>10.6}   flat-vol BS {:>10.6}", k, price, flat);
    }
}

fn run_lognormal_check() {
    println!("fast-pde: lognormal check against Black-Scholes");
    println!("===============================================\n");

    let (k, r, sigma) = (100.0, 0.05, 0.2);
    let analytic = bs_analytic::bs_call_price(100.0, k, r, 0.0, sigma, 1.0);

    println!("{:>6} {:>6} {:>14} {:>12}", "nx", "steps", "price", "error");
    for (nx, steps) in [(51, 20), (101, 40), (201, 80), (401, 160)] {
        let mesher = FdmMesher::from_specs(
            &AxisSpec::concentrated(25.0, 400.0, nx, Coordinate::Log, k, 0.1),
            &AxisSpec::uniform(0.03, 0.05, 3, Coordinate::Linear),
        )
        .expect("Valid mesh");
        let s_max = mesher.axis(Dimension::Spot).state(nx - 1);
        let boundaries = BoundaryConditionSet::new()
            .with(DirichletBoundary::fixed(Dimension::Spot, Side::Lower, 0.0))
            .with(DirichletBoundary::with_rule(
                Dimension::Spot,
                Side::Upper,
                move |_, tau| s_max - k * (-r * tau).exp(),
            ));
        let solver = FdmHestonSolver::new(
            Handle::new(BlackScholesProcess::new(r, 0.0, sigma).expect("Valid parameters")),
            Handle::new(mesher),
            Handle::new(StepConditionComposite::new()),
            boundaries,
            Payoff::EuropeanCall { k },
            SolverConfig {
                time_steps: steps,
                ..SolverConfig::default()
            },
        )
        .expect("Valid solver");

        let price = solver.value_at(100.0, 0.04).expect("Inside the mesh");
        println!(
            "{:>6} {:>6} {:>14.8} {:>12.3e}",
            nx,
            steps,
            price,
            (price - analytic).abs()
        );
    }
    println!("\nBlack-Scholes: {:.8}", analytic);
}
