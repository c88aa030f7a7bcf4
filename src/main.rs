//! Flowshop Solver - Command Line Interface
//!
//! Solves permutation flowshop instances in Taillard's format.

use clap::{Parser, Subcommand, ValueEnum};
use flowshop_solver::benchmark::{load_instances_from_dir, parameter_sweep, write_csv, Benchmark, BenchmarkConfig, BoundGap};
use flowshop_solver::heuristics::construction::*;
use flowshop_solver::heuristics::local_search::*;
use flowshop_solver::heuristics::scatter_search::{ReferenceSetSize, ScatterSearch, ScatterSearchConfig};
use flowshop_solver::instance::FlowshopInstance;
use flowshop_solver::solution::Solution;

use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Instant;

#[derive(Parser)]
#[command(name = "flowshop-solver")]
#[command(author = "M2 AI2D Student")]
#[command(version = "1.0")]
#[command(about = "Permutation flowshop solver with construction heuristics and scatter search")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    Solve {
        #[arg(short, long)]
        instance: PathBuf,

        /// Algorithm to use
        #[arg(short, long, value_enum, default_value = "scatter")]
        algorithm: Algorithm,

        /// Scatter search population size
        #[arg(short, long, default_value = "10")]
        population: usize,

        /// Scatter search iterations
        #[arg(long, default_value = "3")]
        iterations: usize,

        /// Good candidates in the reference set
        #[arg(long, default_value = "2")]
        good: usize,

        /// Diverse candidates in the reference set
        #[arg(long, default_value = "2")]
        diverse: usize,

        /// Random seed
        #[arg(short, long, default_value = "42")]
        seed: u64,

        /// Time limit in seconds
        #[arg(short, long)]
        time_limit: Option<f64>,

        /// Parallel improvement and path evaluation
        #[arg(long)]
        parallel: bool,

        /// JSON scatter search configuration, overrides the parameters above
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output solution to file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Run benchmarks on a directory of instances
    Benchmark {
        /// Directory containing instance files
        #[arg(short, long)]
        dir: PathBuf,

        /// Output directory for results
        #[arg(short, long, default_value = "results")]
        output: PathBuf,

        /// Number of scatter search runs per instance
        #[arg(short, long, default_value = "5")]
        runs: usize,

        /// Scatter search population size
        #[arg(short, long, default_value = "10")]
        population: usize,

        /// Scatter search iterations
        #[arg(long, default_value = "3")]
        iterations: usize,

        /// Maximum number of jobs
        #[arg(long)]
        max_jobs: Option<usize>,
    },

    /// Analyze an instance
    Analyze {
        /// Path to the instance file
        #[arg(short, long)]
        instance: PathBuf,
    },

    /// Random parameter sweep of the scatter search on one instance
    Tune {
        /// Path to the instance file
        #[arg(short, long)]
        instance: PathBuf,

        /// Number of sampled configurations
        #[arg(short, long, default_value = "10")]
        trials: usize,

        /// Seed of the parameter sampler
        #[arg(short, long, default_value = "42")]
        seed: u64,

        /// Output CSV file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
enum Algorithm {
    /// Nawaz-Enscore-Ham insertion
    Neh,
    /// Palmer's slope index
    Palmer,
    /// Shortest total processing time
    Spt,
    /// Campbell-Dudek-Smith
    Cds,
    /// Best of the four construction heuristics
    MultiStart,
    /// Multi-start followed by adjacent swap descent
    LocalSearch,
    /// Scatter search
    Scatter,
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Solve {
            instance, algorithm, population, iterations, good, diverse,
            seed, time_limit, parallel, config, output, verbose,
        } => {
            let ss_config = match config {
                Some(path) => exit_on_error(ScatterSearchConfig::from_json_file(&path), "Error loading configuration"),
                None => ScatterSearchConfig {
                    population_size: population,
                    max_iterations: iterations,
                    reference_set: ReferenceSetSize::new(good, diverse),
                    seed,
                    parallel,
                    time_limit,
                },
            };
            solve_instance(&instance, algorithm, ss_config, output, verbose);
        }

        Commands::Benchmark { dir, output, runs, population, iterations, max_jobs } => {
            run_benchmark(&dir, &output, runs, population, iterations, max_jobs);
        }

        Commands::Analyze { instance } => {
            analyze_instance(&instance);
        }

        Commands::Tune { instance, trials, seed, output } => {
            tune_parameters(&instance, trials, seed, output);
        }
    }
}

fn exit_on_error<T, E: std::fmt::Display>(result: Result<T, E>, context: &str) -> T {
    match result {
        Ok(value) => value,
        Err(e) => {
            eprintln!("{}: {}", context, e);
            std::process::exit(1);
        }
    }
}

fn load_instance(path: &Path) -> FlowshopInstance {
    exit_on_error(FlowshopInstance::from_file(path), "Error loading instance")
}

fn construct_solution<H: ConstructionHeuristic>(instance: &FlowshopInstance, heuristic: &H) -> Solution {
    let start = Instant::now();
    let candidate = heuristic.construct(instance);
    let mut solution = exit_on_error(
        Solution::from_candidate(instance, &candidate, heuristic.name()),
        "Invalid sequence",
    );
    solution.computation_time = start.elapsed().as_secs_f64();
    solution
}

fn solve_instance(
    path: &Path,
    algorithm: Algorithm,
    config: ScatterSearchConfig,
    output: Option<PathBuf>,
    verbose: bool,
) {
    println!("Loading instance from {:?}...", path);
    let instance = load_instance(path);

    if verbose {
        println!("{}", instance.statistics());
    }

    println!("Solving with {:?} algorithm...", algorithm);

    let solution = match algorithm {
        Algorithm::Neh => construct_solution(&instance, &NehHeuristic::new()),
        Algorithm::Palmer => construct_solution(&instance, &PalmerHeuristic::new()),
        Algorithm::Spt => construct_solution(&instance, &SptHeuristic::new()),
        Algorithm::Cds => construct_solution(&instance, &CdsHeuristic::new()),
        Algorithm::MultiStart => construct_solution(&instance, &MultiStartConstruction::with_all_heuristics()),
        Algorithm::LocalSearch => {
            let start = Instant::now();
            let multi = MultiStartConstruction::with_all_heuristics();
            let search = AdjacentSwapSearch::new();
            let mut candidate = multi.construct(&instance);
            let mut passes = 0;
            while search.improve(&instance, &mut candidate) {
                passes += 1;
            }
            let mut sol = exit_on_error(
                Solution::from_candidate(&instance, &candidate, "LocalSearch"),
                "Invalid sequence",
            );
            sol.computation_time = start.elapsed().as_secs_f64();
            sol.iterations = Some(passes);
            sol
        }
        Algorithm::Scatter => {
            if verbose {
                println!("Configuration: {:?}", config);
            }
            let spinner = ProgressBar::new_spinner();
            spinner.set_message(format!("Scatter search on {}", instance.name));
            spinner.enable_steady_tick(std::time::Duration::from_millis(100));

            let result = ScatterSearch::new(config).run(&instance);
            spinner.finish_and_clear();
            exit_on_error(result, "Scatter search failed")
        }
    };

    println!("\n========== Results ==========");
    println!("Algorithm: {}", solution.algorithm);
    println!("Makespan: {:.0}", solution.makespan);
    if let Some(ub) = instance.upper_bound {
        let gap = BoundGap::new(ub, solution.makespan);
        println!("Upper bound: {:.0} (gap {:.0}, {:.2}%)", ub, gap.absolute, gap.percent);
    }
    println!("Time: {:.4}s", solution.computation_time);
    if let Some(iter) = solution.iterations {
        println!("Iterations: {}", iter);
    }

    if verbose {
        println!("\nSequence: {:?}", solution.sequence);
        println!("Machine idle times: {:?}", solution.machine_idle_times());
        for (m, row) in solution.jobs.iter().enumerate() {
            let spans: Vec<String> = row.iter()
                .map(|j| format!("J{}[{:.0}-{:.0}]", j.name, j.start, j.end))
                .collect();
            println!("  M{}: {}", m, spans.join(" "));
        }
    }

    if let Some(out_path) = output {
        let json = exit_on_error(serde_json::to_string_pretty(&solution), "Failed to serialize solution");
        exit_on_error(std::fs::write(&out_path, json), "Failed to write output");
        println!("\nSolution saved to {:?}", out_path);
    }
}

fn run_benchmark(
    dir: &Path,
    output: &Path,
    runs: usize,
    population: usize,
    iterations: usize,
    max_jobs: Option<usize>,
) {
    println!("Loading instances from {:?}...", dir);
    let mut instances = load_instances_from_dir(dir);

    if let Some(max) = max_jobs {
        instances.retain(|i| i.num_jobs <= max);
    }

    println!("Found {} instances", instances.len());

    if instances.is_empty() {
        eprintln!("No instances found!");
        return;
    }

    let config = BenchmarkConfig {
        num_runs: runs,
        scatter: ScatterSearchConfig {
            population_size: population,
            max_iterations: iterations,
            ..Default::default()
        },
        output_dir: output.to_string_lossy().to_string(),
        ..Default::default()
    };

    let mut benchmark = Benchmark::new(config);

    let pb = ProgressBar::new(instances.len() as u64);
    pb.set_style(ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("#>-"));

    for instance in &instances {
        pb.set_message(format!("{} ({}x{})", instance.name, instance.num_jobs, instance.num_machines));
        exit_on_error(benchmark.run_full_benchmark(instance), "Benchmark failed");
        pb.inc(1);
    }
    pb.finish_with_message("done");

    let report = exit_on_error(benchmark.save_results(), "Failed to save results");
    println!("\n{}", report);
    println!("Results, statistics and report saved to {:?}", output);
}

fn analyze_instance(path: &Path) {
    let instance = load_instance(path);

    println!("{}", instance.statistics());

    println!("\nQuick heuristic estimates:");
    for heuristic in seed_heuristics() {
        let start = Instant::now();
        let candidate = heuristic.construct(&instance);
        println!("  {:<8} makespan {:>8.0}  ({:.4}s)",
            heuristic.name(), candidate.makespan, start.elapsed().as_secs_f64());
    }

    let mut candidate = MultiStartConstruction::with_all_heuristics().construct(&instance);
    let search = AdjacentSwapSearch::new();
    while search.improve(&instance, &mut candidate) {}
    println!("  {:<8} makespan {:>8.0}", "+ swaps", candidate.makespan);
}

fn tune_parameters(path: &Path, trials: usize, seed: u64, output: Option<PathBuf>) {
    let instance = load_instance(path);
    println!("Sweeping {} configurations on {}...", trials, instance.name);

    let pb = ProgressBar::new(trials as u64);
    pb.set_style(ProgressStyle::default_bar()
        .template("[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("#>-"));

    let results = exit_on_error(
        parameter_sweep(&instance, trials, seed, |r| {
            pb.set_message(format!("last {:.0}", r.makespan));
            pb.inc(1);
        }),
        "Parameter sweep failed",
    );
    pb.finish_and_clear();

    println!("\n{:<6} {:>6} {:>6} {:>6} {:>8} {:>10} {:>10}",
        "Trial", "Pop", "Iter", "Good", "Diverse", "Makespan", "Time");
    println!("{}", "-".repeat(60));
    for r in &results {
        println!("{:<6} {:>6} {:>6} {:>6} {:>8} {:>10.0} {:>10.3}",
            r.trial, r.population_size, r.max_iterations, r.good, r.diverse, r.makespan, r.time);
    }

    if let Some(best) = results.iter().min_by(|a, b| a.makespan.total_cmp(&b.makespan)) {
        println!("\nBest: trial {} with makespan {:.0}", best.trial, best.makespan);
    }

    if let Some(out_path) = output {
        exit_on_error(write_csv(&out_path, &results), "Failed to export sweep");
        println!("Results saved to {:?}", out_path);
    }
}
