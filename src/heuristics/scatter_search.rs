//! Scatter Search for the permutation flowshop.
//!
//! The search follows the classical five methods:
//!
//! 1. **Diversification**: `population_size - 1` random permutations, plus one
//!    seed each from NEH, Palmer, SPT and CDS.
//! 2. **Improvement**: every candidate goes through the local search.
//! 3. **Reference set update**: the `good` best and the `diverse` worst
//!    candidates are selected.
//! 4. **Subset generation**: every pair of reference candidates.
//! 5. **Combination**: each pair is path-relinked, all intermediate sequences
//!    join the population, which is then sorted and cut back to
//!    `population_size`.
//!
//! Steps 3–5 and a new improvement pass repeat `max_iterations` times.

use crate::error::{FlowshopError, Result};
use crate::heuristics::construction::{seed_heuristics, ConstructionHeuristic};
use crate::heuristics::local_search::{AdjacentSwapSearch, LocalSearch};
use crate::heuristics::path_relinking::path_relinking;
use crate::instance::FlowshopInstance;
use crate::solution::{Candidate, Solution};
use ordered_float::OrderedFloat;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Number of good and diverse candidates entering the reference set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceSetSize {
    pub good: usize,
    pub diverse: usize,
}

impl ReferenceSetSize {
    pub fn new(good: usize, diverse: usize) -> Self {
        ReferenceSetSize { good, diverse }
    }

    pub fn total(&self) -> usize {
        self.good + self.diverse
    }

    /// Derive the sizes from percentages: the reference set takes
    /// `reference_ratio`% of the population, and `good_ratio`% of the
    /// reference set are good candidates. `diverse` is clamped so the set
    /// never exceeds the population.
    pub fn from_ratios(population_size: usize, reference_ratio: f64, good_ratio: f64) -> Self {
        let reference = (population_size as f64 * reference_ratio / 100.0).round();
        let good = (reference * good_ratio / 100.0).round() as usize;
        let diverse = (reference * (100.0 - good_ratio) / 100.0).round() as usize;

        let good = good.min(population_size);
        let diverse = diverse.min(population_size - good);
        ReferenceSetSize { good, diverse }
    }
}

impl Default for ReferenceSetSize {
    fn default() -> Self {
        ReferenceSetSize { good: 2, diverse: 2 }
    }
}

/// Scatter Search configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScatterSearchConfig {
    /// Population size kept after each combination
    pub population_size: usize,
    /// Number of reference/combine/improve iterations
    pub max_iterations: usize,
    /// Reference set composition
    pub reference_set: ReferenceSetSize,
    /// Random seed for the diversification shuffles
    pub seed: u64,
    /// Evaluate local search and path-relinking steps on the rayon pool
    pub parallel: bool,
    /// Time limit in seconds, checked between iterations
    pub time_limit: Option<f64>,
}

impl Default for ScatterSearchConfig {
    fn default() -> Self {
        ScatterSearchConfig {
            population_size: 10,
            max_iterations: 3,
            reference_set: ReferenceSetSize::default(),
            seed: 42,
            parallel: false,
            time_limit: None,
        }
    }
}

impl ScatterSearchConfig {
    pub fn validate(&self) -> Result<()> {
        if self.population_size == 0 {
            return Err(FlowshopError::InvalidConfig(
                "population_size must be positive".to_string(),
            ));
        }
        if let Some(limit) = self.time_limit {
            if limit.is_nan() || limit < 0.0 {
                return Err(FlowshopError::InvalidConfig(format!(
                    "time_limit must be non-negative, got {}",
                    limit
                )));
            }
        }
        Ok(())
    }

    /// Load a configuration from a JSON file; missing fields take their defaults.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: ScatterSearchConfig = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Draw a random parameter set for parameter sweeps.
    pub fn sample<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let max_iterations = rng.gen_range(20..=60);
        let population_size = rng.gen_range(20..=200);
        let reference_ratio = rng.gen_range(1..=100) as f64;
        let good_ratio = rng.gen_range(0..=100) as f64;

        ScatterSearchConfig {
            population_size,
            max_iterations,
            reference_set: ReferenceSetSize::from_ratios(population_size, reference_ratio, good_ratio),
            seed: rng.gen(),
            ..Default::default()
        }
    }
}

/// Every unordered pair of reference indices, in reference order.
pub fn subset_generation(reference_set: &[usize]) -> Vec<(usize, usize)> {
    let mut subsets = Vec::new();
    for i in 0..reference_set.len() {
        for j in i + 1..reference_set.len() {
            subsets.push((reference_set[i], reference_set[j]));
        }
    }
    subsets
}

/// Scatter Search solver.
///
/// Holds only configuration; every call to [`ScatterSearch::run`] builds its
/// own population and random source, so one solver may serve many runs.
pub struct ScatterSearch {
    config: ScatterSearchConfig,
    local_search: Box<dyn LocalSearch + Send + Sync>,
    cancel: Option<Arc<AtomicBool>>,
}

impl ScatterSearch {
    pub fn new(config: ScatterSearchConfig) -> Self {
        ScatterSearch {
            config,
            local_search: Box::new(AdjacentSwapSearch::new()),
            cancel: None,
        }
    }

    /// Replace the improvement method
    pub fn with_local_search<L: LocalSearch + Send + Sync + 'static>(mut self, local_search: L) -> Self {
        self.local_search = Box::new(local_search);
        self
    }

    /// Stop at the next iteration boundary once `flag` is set
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    pub fn config(&self) -> &ScatterSearchConfig {
        &self.config
    }

    /// Run with a `ChaCha8Rng` seeded from the configuration
    pub fn run(&self, instance: &FlowshopInstance) -> Result<Solution> {
        let mut rng = ChaCha8Rng::seed_from_u64(self.config.seed);
        self.run_with_rng(instance, &mut rng)
    }

    /// Run with a caller supplied random source
    pub fn run_with_rng<R: Rng + ?Sized>(&self, instance: &FlowshopInstance, rng: &mut R) -> Result<Solution> {
        let start = Instant::now();
        instance.validate()?;
        self.config.validate()?;

        log::info!(
            "[SS] {} ({} jobs x {} machines): population {}, iterations {}, reference {}+{}",
            instance.name,
            instance.num_jobs,
            instance.num_machines,
            self.config.population_size,
            self.config.max_iterations,
            self.config.reference_set.good,
            self.config.reference_set.diverse
        );

        let mut run = SearchRun::new(instance, &self.config, self.local_search.as_ref());
        run.initialize(rng)?;
        run.improve();

        let mut completed = 0;
        for iteration in 0..self.config.max_iterations {
            if self.should_stop(start) {
                log::warn!("[SS] Stopped before iteration {} of {}", iteration, self.config.max_iterations);
                break;
            }

            let reference_set = run.reference_set_update()?;
            let subsets = subset_generation(&reference_set);
            let offspring = run.combine(&subsets);
            run.improve();
            completed += 1;

            log::debug!(
                "[SS] Iter {}  Subsets {}  Offspring {}  Best {:.2}  Elapsed {:.2}s",
                iteration + 1,
                subsets.len(),
                offspring,
                run.best_makespan().unwrap_or(f64::NAN),
                start.elapsed().as_secs_f64()
            );
        }

        let best = run.into_best()
            .ok_or_else(|| FlowshopError::InvalidConfig("empty population".to_string()))?;
        best.ensure_permutation(instance.num_jobs)?;

        let mut solution = Solution::from_candidate(instance, &best, "ScatterSearch")?;
        solution.computation_time = start.elapsed().as_secs_f64();
        solution.iterations = Some(completed);

        log::info!(
            "[SS] {} finished: makespan {:.2} after {} iterations in {:.3}s",
            instance.name,
            solution.makespan,
            completed,
            solution.computation_time
        );

        Ok(solution)
    }

    fn should_stop(&self, start: Instant) -> bool {
        if let Some(flag) = &self.cancel {
            if flag.load(Ordering::Relaxed) {
                return true;
            }
        }
        match self.config.time_limit {
            Some(limit) => start.elapsed().as_secs_f64() >= limit,
            None => false,
        }
    }
}

impl Default for ScatterSearch {
    fn default() -> Self {
        Self::new(ScatterSearchConfig::default())
    }
}

/// State of one scatter search run
struct SearchRun<'a> {
    instance: &'a FlowshopInstance,
    config: &'a ScatterSearchConfig,
    local_search: &'a (dyn LocalSearch + Send + Sync),
    population: Vec<Candidate>,
}

impl<'a> SearchRun<'a> {
    fn new(
        instance: &'a FlowshopInstance,
        config: &'a ScatterSearchConfig,
        local_search: &'a (dyn LocalSearch + Send + Sync),
    ) -> Self {
        SearchRun {
            instance,
            config,
            local_search,
            population: Vec::with_capacity(config.population_size + 4),
        }
    }

    /// Diversification: random permutations followed by the heuristic seeds.
    /// The population is deliberately left above `population_size`.
    fn initialize<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<()> {
        self.population.clear();

        let jobs = self.instance.job_list();
        for _ in 0..self.config.population_size - 1 {
            let mut sequence = jobs.clone();
            sequence.shuffle(rng);
            self.population.push(Candidate::new(self.instance, sequence));
        }

        for heuristic in seed_heuristics() {
            let candidate = heuristic.construct(self.instance);
            candidate.ensure_permutation(self.instance.num_jobs)?;
            log::debug!("[SS] {} seed makespan {:.2}", heuristic.name(), candidate.makespan);
            self.population.push(candidate);
        }

        Ok(())
    }

    fn improve(&mut self) {
        let instance = self.instance;
        let local_search = self.local_search;

        if self.config.parallel {
            self.population.par_iter_mut().for_each(|candidate| {
                local_search.improve(instance, candidate);
            });
        } else {
            for candidate in self.population.iter_mut() {
                local_search.improve(instance, candidate);
            }
        }
    }

    /// Indices of the `good` lowest then the `diverse` highest makespans.
    /// Each pick is a linear scan over unselected indices where only a
    /// strictly better value replaces the current choice.
    fn reference_set_update(&self) -> Result<Vec<usize>> {
        let size = self.config.reference_set;
        if size.total() > self.population.len() {
            return Err(FlowshopError::ReferenceSetUnderflow {
                requested: size.total(),
                available: self.population.len(),
            });
        }

        let mut selected: Vec<usize> = Vec::with_capacity(size.total());
        for _ in 0..size.good {
            if let Some(j) = self.scan(&selected, |a, b| a < b) {
                selected.push(j);
            }
        }
        for _ in 0..size.diverse {
            if let Some(j) = self.scan(&selected, |a, b| a > b) {
                selected.push(j);
            }
        }

        Ok(selected)
    }

    fn scan(&self, selected: &[usize], better: impl Fn(f64, f64) -> bool) -> Option<usize> {
        let mut chosen: Option<usize> = None;
        for (j, candidate) in self.population.iter().enumerate() {
            if selected.contains(&j) {
                continue;
            }
            let replace = match chosen {
                Some(c) => better(candidate.makespan, self.population[c].makespan),
                None => true,
            };
            if replace {
                chosen = Some(j);
            }
        }
        chosen
    }

    /// Path-relink every subset, add the offspring, sort and truncate.
    /// Returns the number of offspring produced.
    fn combine(&mut self, subsets: &[(usize, usize)]) -> usize {
        let paths: Vec<Vec<usize>> = subsets.iter()
            .flat_map(|&(a, b)| path_relinking(&self.population[a].sequence, &self.population[b].sequence))
            .collect();

        let instance = self.instance;
        let offspring: Vec<Candidate> = if self.config.parallel {
            paths.into_par_iter().map(|sequence| Candidate::new(instance, sequence)).collect()
        } else {
            paths.into_iter().map(|sequence| Candidate::new(instance, sequence)).collect()
        };
        let count = offspring.len();

        self.population.extend(offspring);
        self.sort_population();
        self.population.truncate(self.config.population_size);

        count
    }

    fn sort_population(&mut self) {
        self.population.sort_by_key(|candidate| OrderedFloat(candidate.makespan));
    }

    fn best_makespan(&self) -> Option<f64> {
        self.population.iter()
            .map(|candidate| candidate.makespan)
            .min_by_key(|&m| OrderedFloat(m))
    }

    fn into_best(mut self) -> Option<Candidate> {
        self.sort_population();
        self.population.into_iter().next()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solution::is_permutation;

    fn create_test_instance() -> FlowshopInstance {
        FlowshopInstance::new("3x6", vec![
            vec![5.0, 1.0, 7.0, 3.0, 4.0, 6.0],
            vec![2.0, 6.0, 1.0, 4.0, 8.0, 2.0],
            vec![3.0, 3.0, 2.0, 8.0, 1.0, 5.0],
        ]).unwrap()
    }

    fn population_from(instance: &FlowshopInstance, makespans: &[f64]) -> Vec<Candidate> {
        makespans.iter()
            .map(|&makespan| Candidate { sequence: instance.job_list(), makespan })
            .collect()
    }

    #[test]
    fn test_initial_population_is_oversized() {
        let instance = create_test_instance();
        let config = ScatterSearchConfig { population_size: 5, ..Default::default() };
        let local_search = AdjacentSwapSearch::new();
        let mut run = SearchRun::new(&instance, &config, &local_search);
        let mut rng = ChaCha8Rng::seed_from_u64(1);

        run.initialize(&mut rng).unwrap();

        assert_eq!(run.population.len(), 8);
        let seeds: Vec<Candidate> = seed_heuristics().iter().map(|h| h.construct(&instance)).collect();
        assert_eq!(&run.population[4..], &seeds[..]);
        for candidate in &run.population {
            assert!(is_permutation(&candidate.sequence, instance.num_jobs));
        }
    }

    #[test]
    fn test_reference_set_update_tie_breaks() {
        let instance = create_test_instance();
        let config = ScatterSearchConfig {
            reference_set: ReferenceSetSize::new(2, 2),
            ..Default::default()
        };
        let local_search = AdjacentSwapSearch::new();
        let mut run = SearchRun::new(&instance, &config, &local_search);
        run.population = population_from(&instance, &[5.0, 3.0, 3.0, 9.0, 9.0, 1.0]);

        assert_eq!(run.reference_set_update().unwrap(), vec![5, 1, 3, 4]);
    }

    #[test]
    fn test_diverse_excludes_good() {
        let instance = create_test_instance();
        let config = ScatterSearchConfig {
            reference_set: ReferenceSetSize::new(2, 1),
            ..Default::default()
        };
        let local_search = AdjacentSwapSearch::new();
        let mut run = SearchRun::new(&instance, &config, &local_search);
        run.population = population_from(&instance, &[4.0, 2.0, 6.0]);

        // good takes 1 then 0, leaving only 2 for the diverse pick
        assert_eq!(run.reference_set_update().unwrap(), vec![1, 0, 2]);
    }

    #[test]
    fn test_reference_set_underflow() {
        let instance = create_test_instance();
        let config = ScatterSearchConfig {
            reference_set: ReferenceSetSize::new(3, 2),
            ..Default::default()
        };
        let local_search = AdjacentSwapSearch::new();
        let mut run = SearchRun::new(&instance, &config, &local_search);
        run.population = population_from(&instance, &[1.0, 2.0, 3.0, 4.0]);

        let err = run.reference_set_update().unwrap_err();
        assert!(matches!(err, FlowshopError::ReferenceSetUnderflow { requested: 5, available: 4 }));
    }

    #[test]
    fn test_subset_generation() {
        assert_eq!(subset_generation(&[5, 1, 3]), vec![(5, 1), (5, 3), (1, 3)]);
        assert!(subset_generation(&[7]).is_empty());
        assert_eq!(subset_generation(&[0, 1, 2, 3]).len(), 6);
    }

    #[test]
    fn test_combine_trims_to_population_size() {
        let instance = create_test_instance();
        let config = ScatterSearchConfig {
            population_size: 4,
            reference_set: ReferenceSetSize::new(2, 2),
            ..Default::default()
        };
        let local_search = AdjacentSwapSearch::new();
        let mut run = SearchRun::new(&instance, &config, &local_search);
        let mut rng = ChaCha8Rng::seed_from_u64(3);

        run.initialize(&mut rng).unwrap();
        run.improve();
        let best_before = run.best_makespan().unwrap();

        let reference_set = run.reference_set_update().unwrap();
        run.combine(&subset_generation(&reference_set));

        assert_eq!(run.population.len(), 4);
        assert!(run.population.windows(2).all(|w| w[0].makespan <= w[1].makespan));
        assert!(run.population[0].makespan <= best_before);
        for candidate in &run.population {
            assert!(is_permutation(&candidate.sequence, instance.num_jobs));
            assert_eq!(candidate.makespan, instance.makespan(&candidate.sequence));
        }
    }

    #[test]
    fn test_not_worse_than_construction_heuristics() {
        let instance = create_test_instance();
        let best_seed = seed_heuristics().iter()
            .map(|h| h.construct(&instance).makespan)
            .fold(f64::INFINITY, f64::min);

        let solution = ScatterSearch::new(ScatterSearchConfig {
            population_size: 6,
            max_iterations: 4,
            ..Default::default()
        }).run(&instance).unwrap();

        assert!(solution.makespan <= best_seed);
        assert!(is_permutation(&solution.sequence, instance.num_jobs));
        assert_eq!(solution.makespan, instance.makespan(&solution.sequence));
        assert_eq!(solution.iterations, Some(4));
        assert_eq!(solution.algorithm, "ScatterSearch");
        assert_eq!(solution.jobs.len(), instance.num_machines);
    }

    #[test]
    fn test_reproducible_with_seed() {
        let instance = create_test_instance();
        let config = ScatterSearchConfig { seed: 9, max_iterations: 5, ..Default::default() };

        let first = ScatterSearch::new(config.clone()).run(&instance).unwrap();
        let second = ScatterSearch::new(config).run(&instance).unwrap();

        assert_eq!(first.sequence, second.sequence);
        assert_eq!(first.makespan, second.makespan);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let instance = create_test_instance();
        let config = ScatterSearchConfig { seed: 5, max_iterations: 5, ..Default::default() };
        let parallel = ScatterSearchConfig { parallel: true, ..config.clone() };

        let a = ScatterSearch::new(config).run(&instance).unwrap();
        let b = ScatterSearch::new(parallel).run(&instance).unwrap();

        assert_eq!(a.sequence, b.sequence);
        assert_eq!(a.makespan, b.makespan);
    }

    #[test]
    fn test_zero_iterations() {
        let instance = create_test_instance();
        let solution = ScatterSearch::new(ScatterSearchConfig {
            max_iterations: 0,
            ..Default::default()
        }).run(&instance).unwrap();

        assert_eq!(solution.iterations, Some(0));
        assert!(is_permutation(&solution.sequence, instance.num_jobs));
    }

    #[test]
    fn test_run_reports_underflow() {
        let instance = create_test_instance();
        let search = ScatterSearch::new(ScatterSearchConfig {
            population_size: 5,
            reference_set: ReferenceSetSize::new(10, 10),
            ..Default::default()
        });

        let err = search.run(&instance).unwrap_err();
        assert!(matches!(err, FlowshopError::ReferenceSetUnderflow { requested: 20, available: 8 }));
    }

    #[test]
    fn test_rejects_degenerate_instance() {
        let instance = FlowshopInstance {
            name: "empty".to_string(),
            num_jobs: 0,
            num_machines: 2,
            processing_times: vec![Vec::new(), Vec::new()],
            lower_bound: None,
            upper_bound: None,
        };
        let err = ScatterSearch::default().run(&instance).unwrap_err();
        assert!(matches!(err, FlowshopError::DegenerateProblem { .. }));
    }

    #[test]
    fn test_rejects_empty_population_config() {
        let instance = create_test_instance();
        let err = ScatterSearch::new(ScatterSearchConfig {
            population_size: 0,
            ..Default::default()
        }).run(&instance).unwrap_err();
        assert!(matches!(err, FlowshopError::InvalidConfig(_)));
    }

    #[test]
    fn test_zero_time_limit_stops_before_first_iteration() {
        let instance = create_test_instance();
        let solution = ScatterSearch::new(ScatterSearchConfig {
            max_iterations: 10,
            time_limit: Some(0.0),
            ..Default::default()
        }).run(&instance).unwrap();

        assert_eq!(solution.iterations, Some(0));
        assert!(is_permutation(&solution.sequence, instance.num_jobs));
        assert_eq!(solution.makespan, instance.makespan(&solution.sequence));
    }

    #[test]
    fn test_rejects_negative_time_limit() {
        let config = ScatterSearchConfig { time_limit: Some(-1.0), ..Default::default() };
        assert!(matches!(config.validate(), Err(FlowshopError::InvalidConfig(_))));
    }

    #[test]
    fn test_config_from_json_file() {
        let dir = std::env::temp_dir();
        let valid = dir.join(format!("ss-config-{}-valid.json", std::process::id()));
        let invalid = dir.join(format!("ss-config-{}-invalid.json", std::process::id()));
        std::fs::write(&valid, r#"{ "population_size": 12, "max_iterations": 7, "parallel": true }"#).unwrap();
        std::fs::write(&invalid, r#"{ "population_size": 0 }"#).unwrap();

        let config = ScatterSearchConfig::from_json_file(&valid).unwrap();
        assert_eq!(config.population_size, 12);
        assert_eq!(config.max_iterations, 7);
        assert!(config.parallel);
        assert_eq!(config.reference_set, ReferenceSetSize::default());

        let err = ScatterSearchConfig::from_json_file(&invalid).unwrap_err();
        assert!(matches!(err, FlowshopError::InvalidConfig(_)));

        let err = ScatterSearchConfig::from_json_file(dir.join("ss-config-does-not-exist.json")).unwrap_err();
        assert!(matches!(err, FlowshopError::Io(_)));

        let _ = std::fs::remove_file(valid);
        let _ = std::fs::remove_file(invalid);
    }

    #[test]
    fn test_cancel_flag_stops_at_iteration_boundary() {
        let instance = create_test_instance();
        let flag = Arc::new(AtomicBool::new(true));
        let solution = ScatterSearch::new(ScatterSearchConfig {
            max_iterations: 10,
            ..Default::default()
        })
        .with_cancel_flag(flag)
        .run(&instance)
        .unwrap();

        assert_eq!(solution.iterations, Some(0));
        assert!(is_permutation(&solution.sequence, instance.num_jobs));
    }

    #[test]
    fn test_reference_sizes_from_ratios() {
        assert_eq!(ReferenceSetSize::from_ratios(20, 50.0, 70.0), ReferenceSetSize::new(7, 3));
        assert_eq!(ReferenceSetSize::from_ratios(45, 22.0, 70.0), ReferenceSetSize::new(7, 3));
        // 0.5 rounds up on both sides, diverse is clamped to fit
        assert_eq!(ReferenceSetSize::from_ratios(1, 100.0, 50.0), ReferenceSetSize::new(1, 0));
    }

    #[test]
    fn test_sampled_configs_are_valid() {
        let mut rng = ChaCha8Rng::seed_from_u64(123);
        for _ in 0..100 {
            let config = ScatterSearchConfig::sample(&mut rng);
            assert!((20..=60).contains(&config.max_iterations));
            assert!((20..=200).contains(&config.population_size));
            assert!(config.reference_set.total() <= config.population_size);
            assert!(config.validate().is_ok());
        }
    }

    #[test]
    fn test_config_json_defaults() {
        let config: ScatterSearchConfig =
            serde_json::from_str(r#"{ "population_size": 30, "reference_set": { "good": 5, "diverse": 3 } }"#).unwrap();
        assert_eq!(config.population_size, 30);
        assert_eq!(config.reference_set, ReferenceSetSize::new(5, 3));
        assert_eq!(config.max_iterations, 3);
        assert!(!config.parallel);
    }
}
