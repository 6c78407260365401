// scripts/benchmark.rs
use fast_pde::fdm::boundary::BoundaryConditionSet;
use fast_pde::fdm::fdm_solver::{FdmHestonSolver, SolverConfig};
use fast_pde::fdm::mesher::FdmMesher;
use fast_pde::fdm::payoffs::Payoff;
use fast_pde::fdm::step_condition::StepConditionComposite;
use fast_pde::handle::Handle;
use fast_pde::math_utils::Timer;
use fast_pde::models::heston::{Heston, HestonParams};
use fast_pde::solvers::FdmSchemeDesc;
use fast_pde::PdeResult;
use rayon::prelude::*;
use std::env;
use std::fs::File;
use std::io::{self, Write};
use std::process::Command;
use tracing_subscriber::EnvFilter;

// Heston (1993) closed form for the default parameters
const REFERENCE_PRICE: f64 = 10.361869020965678;

#[derive(Debug)]
struct SystemInfo {
    os: String,
    cpu_model: String,
    cpu_cores: usize,
    rust_version: String,
    rustc_flags: String,
    rayon_threads: usize,
}

impl SystemInfo {
    fn gather() -> Self {
        Self {
            os: env::consts::OS.to_string(),
            cpu_model: Self::cpu_model(),
            cpu_cores: num_cpus::get(),
            rust_version: Command::new("rustc")
                .arg("--version")
                .output()
                .map(|output| String::from_utf8_lossy(&output.stdout).trim().to_string())
                .unwrap_or_else(|_| "Unknown Rust version".to_string()),
            rustc_flags: env::var("RUSTFLAGS").unwrap_or_else(|_| "default".to_string()),
            rayon_threads: rayon::current_num_threads(),
        }
    }

    fn cpu_model() -> String {
        #[cfg(target_os = "linux")]
        {
            std::fs::read_to_string("/proc/cpuinfo")
                .ok()
                .and_then(|content| {
                    content
                        .lines()
                        .find(|line| line.starts_with("model name"))
                        .and_then(|line| line.split(':').nth(1))
                        .map(|s| s.trim().to_string())
                })
                .unwrap_or_else(|| "Unknown CPU".to_string())
        }

        #[cfg(target_os = "macos")]
        {
            Command::new("sysctl")
                .args(["-n", "machdep.cpu.brand_string"])
                .output()
                .map(|output| String::from_utf8_lossy(&output.stdout).trim().to_string())
                .unwrap_or_else(|_| "Unknown CPU".to_string())
        }

        #[cfg(not(any(target_os = "linux", target_os = "macos")))]
        {
            "Unknown CPU".to_string()
        }
    }
}

#[derive(Debug)]
struct BenchmarkResult {
    name: String,
    grid: (usize, usize),
    steps: usize,
    time_ms: f64,
    nodes_per_sec: f64,
    value: f64,
    error: f64,
}

fn solver(
    params: HestonParams,
    grid: (usize, usize),
    steps: usize,
    scheme: FdmSchemeDesc,
    k: f64,
) -> PdeResult<FdmHestonSolver> {
    let config = SolverConfig {
        maturity: 1.0,
        time_steps: steps,
        scheme,
        ..SolverConfig::default()
    };
    let mesher = FdmMesher::for_heston(&params, config.maturity, k, grid.0, grid.1)?;
    FdmHestonSolver::new(
        Handle::new(Heston::new(params)?),
        Handle::new(mesher),
        Handle::new(StepConditionComposite::new()),
        BoundaryConditionSet::new(),
        Payoff::EuropeanCall { k },
        config,
    )
}

fn run_grid_benchmarks() -> PdeResult<Vec<BenchmarkResult>> {
    let params = HestonParams::default();
    let grids = [((51, 26), 50), ((101, 51), 100), ((201, 101), 200)];
    let schemes = [
        FdmSchemeDesc::douglas(),
        FdmSchemeDesc::craig_sneyd(),
        FdmSchemeDesc::hundsdorfer(),
    ];

    let mut results = Vec::new();
    for &(grid, steps) in &grids {
        for &scheme in &schemes {
            println!("Benchmarking {} on {}x{} with {} steps...", scheme.scheme, grid.0, grid.1, steps);
            let solver = solver(params, grid, steps, scheme, 100.0)?;

            let timer = Timer::new();
            solver.calculate()?;
            let time_ms = timer.elapsed_ms();
            let value = solver.value_at(params.s0, params.v0)?;
            let node_steps = (grid.0 * grid.1 * steps) as f64;

            results.push(BenchmarkResult {
                name: scheme.scheme.to_string(),
                grid,
                steps,
                time_ms,
                nodes_per_sec: node_steps / (time_ms / 1000.0),
                value,
                error: (value - REFERENCE_PRICE).abs(),
            });
        }
    }
    Ok(results)
}

/// Independent solver instances priced across the thread pool.
fn run_parallel_benchmark() -> PdeResult<(usize, f64, f64)> {
    let params = HestonParams::default();
    let strikes: Vec<f64> = (0..32).map(|i| 70.0 + 2.0 * i as f64).collect();

    let mut timer = Timer::new();
    for &k in &strikes {
        solver(params, (101, 51), 100, FdmSchemeDesc::default(), k)?.calculate()?;
    }
    let sequential_ms = timer.elapsed_ms();

    timer.start();
    strikes
        .par_iter()
        .map(|&k| solver(params, (101, 51), 100, FdmSchemeDesc::default(), k)?.calculate())
        .collect::<PdeResult<Vec<()>>>()?;
    let parallel_ms = timer.elapsed_ms();

    Ok((strikes.len(), sequential_ms, parallel_ms))
}

fn write_results_to_csv(
    results: &[BenchmarkResult],
    system_info: &SystemInfo,
    filename: &str,
) -> io::Result<()> {
    let mut file = File::create(filename)?;

    writeln!(file, "# System Information")?;
    writeln!(file, "# OS: {}", system_info.os)?;
    writeln!(file, "# CPU: {}", system_info.cpu_model)?;
    writeln!(file, "# CPU Cores: {}", system_info.cpu_cores)?;
    writeln!(file, "# Rust Version: {}", system_info.rust_version)?;
    writeln!(file, "# RUSTFLAGS: {}", system_info.rustc_flags)?;
    writeln!(file, "# Rayon Threads: {}", system_info.rayon_threads)?;
    writeln!(
        file,
        "# Benchmark Date: {}",
        chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC")
    )?;
    writeln!(file, "#")?;
    writeln!(file, "Scheme,Spot_Nodes,Variance_Nodes,Steps,Time_ms,Node_Steps_per_sec,Value,Abs_Error")?;

    for result in results {
        writeln!(
            file,
            "{},{},{},{},{:.2},{:.0},{:.8},{:.3e}",
            result.name,
            result.grid.0,
            result.grid.1,
            result.steps,
            result.time_ms,
            result.nodes_per_sec,
            result.value,
            result.error
        )?;
    }
    Ok(())
}

fn main() -> PdeResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("fast-pde Benchmark Suite");
    println!("========================\n");

    let system_info = SystemInfo::gather();
    println!("System Information:");
    println!("  OS: {}", system_info.os);
    println!("  CPU: {}", system_info.cpu_model);
    println!("  CPU Cores: {}", system_info.cpu_cores);
    println!("  Rust Version: {}", system_info.rust_version);
    println!("  RUSTFLAGS: {}", system_info.rustc_flags);
    println!("  Rayon Threads: {}", system_info.rayon_threads);
    println!();

    let results = run_grid_benchmarks()?;

    println!("\n{:=<88}", "");
    println!(
        "{:<20} {:>10} {:>6} {:>12} {:>16} {:>10} {:>10}",
        "Scheme", "Grid", "Steps", "Time (ms)", "Node-steps/s", "Value", "Error"
    );
    println!("{:-<88}", "");
    for result in &results {
        println!(
            "{:<20} {:>10} {:>6} {:>12.2} {:>16.0} {:>10.6} {:>10.2e}",
            result.name,
            format!("{}x{}", result.grid.0, result.grid.1),
            result.steps,
            result.time_ms,
            result.nodes_per_sec,
            result.value,
            result.error
        );
    }
    println!("{:=<88}", "");

    let (instances, sequential_ms, parallel_ms) = run_parallel_benchmark()?;
    println!(
        "\n{} independent solvers: sequential {:.1} ms, parallel {:.1} ms (speedup {:.2}x)",
        instances,
        sequential_ms,
        parallel_ms,
        sequential_ms / parallel_ms
    );

    let timestamp = chrono::Utc::now().format("%Y%m%d_%H%M%S");
    let filename = format!("benchmark_results_{}.csv", timestamp);
    match write_results_to_csv(&results, &system_info, &filename) {
        Ok(()) => println!("\nResults saved to: {}", filename),
        Err(e) => eprintln!("\nCould not write {}: {}", filename, e),
    }

    println!("\nTo reproduce: cargo run --bin benchmark --release");
    Ok(())
}
