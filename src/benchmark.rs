//! Benchmarking and experimentation module for the flowshop solver.
//!
//! Provides tools for running experiments, collecting statistics,
//! and comparing algorithm performance against Taillard's bounds.

use crate::error::Result;
use crate::heuristics::construction::*;
use crate::heuristics::local_search::{AdjacentSwapSearch, LocalSearch};
use crate::heuristics::scatter_search::{ScatterSearch, ScatterSearchConfig};
use crate::instance::FlowshopInstance;
use crate::solution::Solution;

use ordered_float::OrderedFloat;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use std::collections::HashMap;
use std::fs::File;
use std::path::Path;
use std::time::Instant;

/// Distance between a reference bound and an obtained makespan.
///
/// Both values are `bound - makespan`, so a negative gap means the makespan
/// is above the bound.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundGap {
    pub absolute: f64,
    /// Percentage of the bound, rounded to two decimals
    pub percent: f64,
}

impl BoundGap {
    pub fn new(bound: f64, makespan: f64) -> Self {
        let absolute = bound - makespan;
        let percent = if bound != 0.0 {
            (absolute / bound * 10000.0).round() / 100.0
        } else {
            0.0
        };
        BoundGap { absolute, percent }
    }
}

/// Result of running a single algorithm on an instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlgorithmResult {
    /// Algorithm name
    pub algorithm: String,
    /// Instance name
    pub instance: String,
    pub jobs: usize,
    pub machines: usize,
    pub makespan: f64,
    /// Computation time in seconds
    pub time: f64,
    /// Number of iterations (if applicable)
    pub iterations: Option<usize>,
    /// Reference upper bound (Taillard's best known, if available)
    pub upper_bound: Option<f64>,
    pub gap: Option<f64>,
    pub gap_percent: Option<f64>,
}

/// Aggregated statistics for an algorithm
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlgorithmStatistics {
    /// Algorithm name
    pub algorithm: String,
    /// Number of recorded runs
    pub num_runs: usize,
    pub avg_makespan: f64,
    pub best_makespan: f64,
    pub worst_makespan: f64,
    /// Population standard deviation of the makespan
    pub std_makespan: f64,
    pub avg_time: f64,
    pub total_time: f64,
    /// Average gap percentage over runs with a known bound
    pub avg_gap_percent: Option<f64>,
}

/// Benchmark configuration
#[derive(Debug, Clone)]
pub struct BenchmarkConfig {
    /// Number of seeded scatter search runs per instance
    pub num_runs: usize,
    /// Base scatter search configuration; run `k` uses `seed + k`
    pub scatter: ScatterSearchConfig,
    /// Run the seeded scatter search runs in parallel
    pub parallel: bool,
    /// Output directory
    pub output_dir: String,
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        BenchmarkConfig {
            num_runs: 5,
            scatter: ScatterSearchConfig::default(),
            parallel: true,
            output_dir: "results".to_string(),
        }
    }
}

/// Benchmarking engine
pub struct Benchmark {
    config: BenchmarkConfig,
    results: Vec<AlgorithmResult>,
    best_known: HashMap<String, f64>,
}

impl Benchmark {
    pub fn new(config: BenchmarkConfig) -> Self {
        Benchmark {
            config,
            results: Vec::new(),
            best_known: HashMap::new(),
        }
    }

    /// Override the reference bound of an instance
    pub fn set_best_known(&mut self, instance_name: &str, makespan: f64) {
        self.best_known.insert(instance_name.to_string(), makespan);
    }

    /// Run all construction heuristics on an instance
    pub fn run_construction_heuristics(&mut self, instance: &FlowshopInstance) -> Result<()> {
        for heuristic in seed_heuristics() {
            let start = Instant::now();
            let candidate = heuristic.construct(instance);
            let mut solution = Solution::from_candidate(instance, &candidate, heuristic.name())?;
            solution.computation_time = start.elapsed().as_secs_f64();
            self.record_result(instance, &solution);
        }
        Ok(())
    }

    /// Best construction followed by adjacent swaps until no swap improves
    pub fn run_local_search(&mut self, instance: &FlowshopInstance) -> Result<()> {
        let start = Instant::now();
        let multi = MultiStartConstruction::with_all_heuristics();
        let search = AdjacentSwapSearch::new();

        let mut candidate = multi.construct(instance);
        let mut passes = 0;
        while search.improve(instance, &mut candidate) {
            passes += 1;
        }

        let name = format!("{} + {}", multi.name(), search.name());
        let mut solution = Solution::from_candidate(instance, &candidate, &name)?;
        solution.computation_time = start.elapsed().as_secs_f64();
        solution.iterations = Some(passes);
        self.record_result(instance, &solution);
        Ok(())
    }

    /// Run `num_runs` scatter searches with consecutive seeds
    pub fn run_scatter_search(&mut self, instance: &FlowshopInstance) -> Result<()> {
        let configs: Vec<ScatterSearchConfig> = (0..self.config.num_runs)
            .map(|run| ScatterSearchConfig {
                seed: self.config.scatter.seed.wrapping_add(run as u64),
                ..self.config.scatter.clone()
            })
            .collect();

        let solutions: Vec<Solution> = if self.config.parallel {
            configs.into_par_iter()
                .map(|config| ScatterSearch::new(config).run(instance))
                .collect::<Result<Vec<_>>>()?
        } else {
            configs.into_iter()
                .map(|config| ScatterSearch::new(config).run(instance))
                .collect::<Result<Vec<_>>>()?
        };

        for solution in &solutions {
            self.record_result(instance, solution);
        }
        Ok(())
    }

    /// Run full benchmark on an instance
    pub fn run_full_benchmark(&mut self, instance: &FlowshopInstance) -> Result<()> {
        log::info!("Running benchmark on instance: {}", instance.name);

        self.run_construction_heuristics(instance)?;
        self.run_local_search(instance)?;
        self.run_scatter_search(instance)
    }

    /// Run benchmark on multiple instances
    pub fn run_on_instances(&mut self, instances: &[FlowshopInstance]) -> Result<()> {
        for instance in instances {
            self.run_full_benchmark(instance)?;
        }
        Ok(())
    }

    /// Record a result, computing the gap against the best known bound
    pub fn record_result(&mut self, instance: &FlowshopInstance, solution: &Solution) {
        let upper_bound = self.best_known.get(&instance.name)
            .copied()
            .or(instance.upper_bound);
        let gap = upper_bound.map(|bound| BoundGap::new(bound, solution.makespan));

        self.results.push(AlgorithmResult {
            algorithm: solution.algorithm.clone(),
            instance: instance.name.clone(),
            jobs: instance.num_jobs,
            machines: instance.num_machines,
            makespan: solution.makespan,
            time: solution.computation_time,
            iterations: solution.iterations,
            upper_bound,
            gap: gap.map(|g| g.absolute),
            gap_percent: gap.map(|g| g.percent),
        });
    }

    /// Compute statistics for each algorithm
    pub fn compute_statistics(&self) -> Vec<AlgorithmStatistics> {
        let mut stats_map: HashMap<String, Vec<&AlgorithmResult>> = HashMap::new();

        for result in &self.results {
            stats_map.entry(result.algorithm.clone())
                .or_default()
                .push(result);
        }

        let mut statistics: Vec<AlgorithmStatistics> = stats_map.into_iter()
            .map(|(algorithm, results)| {
                let makespans: Vec<f64> = results.iter().map(|r| r.makespan).collect();
                let times: Vec<f64> = results.iter().map(|r| r.time).collect();
                let gaps: Vec<f64> = results.iter().filter_map(|r| r.gap_percent).collect();

                AlgorithmStatistics {
                    algorithm,
                    num_runs: results.len(),
                    avg_makespan: makespans.iter().mean(),
                    best_makespan: makespans.iter().cloned().fold(f64::INFINITY, f64::min),
                    worst_makespan: makespans.iter().cloned().fold(f64::NEG_INFINITY, f64::max),
                    std_makespan: makespans.iter().population_std_dev(),
                    avg_time: times.iter().mean(),
                    total_time: times.iter().sum(),
                    avg_gap_percent: if gaps.is_empty() { None } else { Some(gaps.iter().mean()) },
                }
            })
            .collect();

        statistics.sort_by_key(|s| (OrderedFloat(s.avg_makespan), s.algorithm.clone()));
        statistics
    }

    /// Export results to CSV
    pub fn export_to_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path)?;
        let mut writer = csv::Writer::from_writer(file);

        for result in &self.results {
            writer.serialize(result)?;
        }

        writer.flush()?;
        Ok(())
    }

    /// Export statistics to CSV
    pub fn export_statistics_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path)?;
        let mut writer = csv::Writer::from_writer(file);

        for stat in self.compute_statistics() {
            writer.serialize(stat)?;
        }

        writer.flush()?;
        Ok(())
    }

    /// Generate summary report
    pub fn generate_report(&self) -> String {
        let mut report = String::new();

        report.push_str("========================================\n");
        report.push_str("     Flowshop Benchmark Report\n");
        report.push_str("========================================\n");
        report.push_str(&format!("Generated: {}\n\n", chrono::Local::now().format("%Y-%m-%d %H:%M:%S")));

        let stats = self.compute_statistics();

        report.push_str("Algorithm Performance Summary:\n");
        report.push_str("-".repeat(90).as_str());
        report.push('\n');
        report.push_str(&format!("{:<28} {:>6} {:>12} {:>12} {:>10} {:>10} {:>10}\n",
            "Algorithm", "Runs", "Avg Cmax", "Best Cmax", "Std", "Avg Gap%", "Avg Time"));
        report.push_str("-".repeat(90).as_str());
        report.push('\n');

        for stat in &stats {
            let gap_str = stat.avg_gap_percent
                .map(|g| format!("{:.2}%", g))
                .unwrap_or_else(|| "-".to_string());

            report.push_str(&format!("{:<28} {:>6} {:>12.2} {:>12.2} {:>10.2} {:>10} {:>10.4}\n",
                stat.algorithm,
                stat.num_runs,
                stat.avg_makespan,
                stat.best_makespan,
                stat.std_makespan,
                gap_str,
                stat.avg_time));
        }

        report.push_str("-".repeat(90).as_str());
        report.push('\n');

        report.push_str("\nBest Solutions per Instance:\n");

        let mut instance_best: HashMap<&str, &AlgorithmResult> = HashMap::new();
        for result in &self.results {
            let entry = instance_best.entry(result.instance.as_str()).or_insert(result);
            if result.makespan < entry.makespan {
                *entry = result;
            }
        }

        let mut best: Vec<&AlgorithmResult> = instance_best.into_values().collect();
        best.sort_by(|a, b| a.instance.cmp(&b.instance));

        for result in best {
            let bound_str = match (result.upper_bound, result.gap_percent) {
                (Some(ub), Some(gap)) => format!(" [UB {:.0}, gap {:.2}%]", ub, gap),
                _ => String::new(),
            };
            report.push_str(&format!("  {}: {:.0} ({}){}\n",
                result.instance, result.makespan, result.algorithm, bound_str));
        }

        report
    }

    /// Write `results.csv`, `statistics.csv` and `report.txt` into the
    /// configured output directory, creating it if needed. Returns the report.
    pub fn save_results(&self) -> Result<String> {
        let dir = Path::new(&self.config.output_dir);
        std::fs::create_dir_all(dir)?;

        self.export_to_csv(dir.join("results.csv"))?;
        self.export_statistics_csv(dir.join("statistics.csv"))?;

        let report = self.generate_report();
        std::fs::write(dir.join("report.txt"), &report)?;
        log::info!("Benchmark results saved to {}", dir.display());

        Ok(report)
    }

    /// Get all results
    pub fn results(&self) -> &[AlgorithmResult] {
        &self.results
    }

    /// Get best known values
    pub fn best_known(&self) -> &HashMap<String, f64> {
        &self.best_known
    }

    pub fn config(&self) -> &BenchmarkConfig {
        &self.config
    }
}

/// One evaluated configuration of a parameter sweep
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepResult {
    pub trial: usize,
    pub population_size: usize,
    pub max_iterations: usize,
    pub good: usize,
    pub diverse: usize,
    pub seed: u64,
    pub makespan: f64,
    pub time: f64,
    pub gap_percent: Option<f64>,
}

impl SweepResult {
    fn new(trial: usize, config: &ScatterSearchConfig, instance: &FlowshopInstance, solution: &Solution) -> Self {
        SweepResult {
            trial,
            population_size: config.population_size,
            max_iterations: config.max_iterations,
            good: config.reference_set.good,
            diverse: config.reference_set.diverse,
            seed: config.seed,
            makespan: solution.makespan,
            time: solution.computation_time,
            gap_percent: instance.upper_bound.map(|ub| BoundGap::new(ub, solution.makespan).percent),
        }
    }
}

/// Randomly sampled scatter search configurations for a parameter sweep
pub fn sample_configs(trials: usize, seed: u64) -> Vec<ScatterSearchConfig> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..trials).map(|_| ScatterSearchConfig::sample(&mut rng)).collect()
}

/// Evaluate `trials` sampled configurations on one instance.
///
/// `on_trial` is called after each finished trial, e.g. to advance a progress bar.
pub fn parameter_sweep<F>(instance: &FlowshopInstance, trials: usize, seed: u64, mut on_trial: F) -> Result<Vec<SweepResult>>
where
    F: FnMut(&SweepResult),
{
    let mut results = Vec::with_capacity(trials);

    for (trial, config) in sample_configs(trials, seed).into_iter().enumerate() {
        let solution = ScatterSearch::new(config.clone()).run(instance)?;
        let result = SweepResult::new(trial, &config, instance, &solution);
        log::debug!("Trial {}: makespan {:.0} in {:.3}s", trial, result.makespan, result.time);
        on_trial(&result);
        results.push(result);
    }

    Ok(results)
}

/// Write any serializable rows to a CSV file
pub fn write_csv<P: AsRef<Path>, T: Serialize>(path: P, rows: &[T]) -> Result<()> {
    let file = File::create(path)?;
    let mut writer = csv::Writer::from_writer(file);
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Helper function to load Taillard instances from a directory.
/// Files that fail to parse are skipped with a warning.
pub fn load_instances_from_dir<P: AsRef<Path>>(dir: P) -> Vec<FlowshopInstance> {
    let mut instances = Vec::new();

    if let Ok(entries) = std::fs::read_dir(dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            match FlowshopInstance::from_file(&path) {
                Ok(instance) => instances.push(instance),
                Err(e) => log::warn!("Skipping {}: {}", path.display(), e),
            }
        }
    }

    instances.sort_by(|a, b| {
        (a.num_jobs, a.num_machines, &a.name).cmp(&(b.num_jobs, b.num_machines, &b.name))
    });

    instances
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_instance() -> FlowshopInstance {
        FlowshopInstance::new("3x6", vec![
            vec![5.0, 1.0, 7.0, 3.0, 4.0, 6.0],
            vec![2.0, 6.0, 1.0, 4.0, 8.0, 2.0],
            vec![3.0, 3.0, 2.0, 8.0, 1.0, 5.0],
        ]).unwrap().with_bounds(Some(30.0), Some(33.0))
    }

    fn small_config() -> BenchmarkConfig {
        BenchmarkConfig {
            num_runs: 3,
            scatter: ScatterSearchConfig { population_size: 6, max_iterations: 2, ..Default::default() },
            parallel: false,
            ..Default::default()
        }
    }

    #[test]
    fn test_benchmark_config() {
        let config = BenchmarkConfig::default();
        assert_eq!(config.num_runs, 5);
        assert_eq!(config.scatter.population_size, 10);
    }

    #[test]
    fn test_bound_gap() {
        let gap = BoundGap::new(1278.0, 1300.0);
        assert_eq!(gap.absolute, -22.0);
        assert_eq!(gap.percent, -1.72);

        let gap = BoundGap::new(100.0, 90.0);
        assert_eq!(gap.absolute, 10.0);
        assert_eq!(gap.percent, 10.0);
    }

    #[test]
    fn test_full_benchmark_records_every_algorithm() {
        let instance = create_test_instance();
        let mut benchmark = Benchmark::new(small_config());
        benchmark.run_full_benchmark(&instance).unwrap();

        // 4 heuristics, 1 local search, 3 scatter runs
        assert_eq!(benchmark.results().len(), 8);
        for result in benchmark.results() {
            assert_eq!(result.upper_bound, Some(33.0));
            assert_eq!(result.gap, Some(33.0 - result.makespan));
            assert_eq!(result.jobs, 6);
            assert_eq!(result.machines, 3);
        }

        let stats = benchmark.compute_statistics();
        assert_eq!(stats.len(), 6);
        let scatter = stats.iter().find(|s| s.algorithm == "ScatterSearch").unwrap();
        assert_eq!(scatter.num_runs, 3);
        assert!(scatter.best_makespan <= scatter.avg_makespan);
        assert!(scatter.avg_makespan <= scatter.worst_makespan);
        assert!(scatter.std_makespan >= 0.0);
        assert!(stats.windows(2).all(|w| w[0].avg_makespan <= w[1].avg_makespan));
    }

    #[test]
    fn test_parallel_runs_match_sequential() {
        let instance = create_test_instance();

        let mut sequential = Benchmark::new(small_config());
        sequential.run_scatter_search(&instance).unwrap();

        let mut parallel = Benchmark::new(BenchmarkConfig { parallel: true, ..small_config() });
        parallel.run_scatter_search(&instance).unwrap();

        let a: Vec<f64> = sequential.results().iter().map(|r| r.makespan).collect();
        let b: Vec<f64> = parallel.results().iter().map(|r| r.makespan).collect();
        assert_eq!(a, b);
    }

    #[test]
    fn test_best_known_overrides_instance_bound() {
        let instance = create_test_instance();
        let mut benchmark = Benchmark::new(small_config());
        benchmark.set_best_known("3x6", 40.0);
        benchmark.run_construction_heuristics(&instance).unwrap();

        assert!(benchmark.results().iter().all(|r| r.upper_bound == Some(40.0)));
    }

    #[test]
    fn test_statistics_values() {
        let instance = FlowshopInstance::new("plain", vec![vec![1.0, 2.0], vec![2.0, 1.0]]).unwrap();
        let mut benchmark = Benchmark::new(small_config());

        for (makespan, time) in [(10.0, 1.0), (14.0, 3.0)] {
            let mut solution = Solution::from_sequence(&instance, vec![0, 1], "A").unwrap();
            solution.makespan = makespan;
            solution.computation_time = time;
            benchmark.record_result(&instance, &solution);
        }

        let stats = benchmark.compute_statistics();
        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].avg_makespan, 12.0);
        assert_eq!(stats[0].std_makespan, 2.0);
        assert_eq!(stats[0].best_makespan, 10.0);
        assert_eq!(stats[0].worst_makespan, 14.0);
        assert_eq!(stats[0].total_time, 4.0);
        assert_eq!(stats[0].avg_gap_percent, None);
    }

    #[test]
    fn test_report_mentions_instances() {
        let instance = create_test_instance();
        let mut benchmark = Benchmark::new(small_config());
        benchmark.run_construction_heuristics(&instance).unwrap();

        let report = benchmark.generate_report();
        assert!(report.contains("Generated: "));
        assert!(report.contains("NEH"));
        assert!(report.contains("3x6:"));
    }

    #[test]
    fn test_save_results_writes_output_dir() {
        let output = std::env::temp_dir().join(format!("flowshop-bench-{}", std::process::id()));
        let instance = create_test_instance();
        let mut benchmark = Benchmark::new(BenchmarkConfig {
            output_dir: output.to_string_lossy().to_string(),
            ..small_config()
        });
        benchmark.run_construction_heuristics(&instance).unwrap();

        let report = benchmark.save_results().unwrap();

        assert_eq!(std::fs::read_to_string(output.join("report.txt")).unwrap(), report);
        let results = std::fs::read_to_string(output.join("results.csv")).unwrap();
        assert_eq!(results.lines().count(), 5);
        assert!(results.lines().next().unwrap().starts_with("algorithm,instance"));
        let statistics = std::fs::read_to_string(output.join("statistics.csv")).unwrap();
        assert_eq!(statistics.lines().count(), 5);

        let _ = std::fs::remove_dir_all(output);
    }

    #[test]
    fn test_parameter_sweep() {
        let instance = FlowshopInstance::new("tiny", vec![
            vec![2.0, 3.0, 1.0],
            vec![1.0, 2.0, 4.0],
        ]).unwrap();

        let mut seen = 0;
        let results = parameter_sweep(&instance, 2, 7, |_| seen += 1).unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(seen, 2);
        for (trial, result) in results.iter().enumerate() {
            assert_eq!(result.trial, trial);
            assert!(result.good + result.diverse <= result.population_size);
            assert_eq!(result.makespan, 8.0);
        }
    }

    #[test]
    fn test_sample_configs_reproducible() {
        let a = sample_configs(5, 3);
        let b = sample_configs(5, 3);
        let sizes = |c: &[ScatterSearchConfig]| c.iter().map(|x| (x.population_size, x.seed)).collect::<Vec<_>>();
        assert_eq!(sizes(&a), sizes(&b));
    }
}
