//! Construction heuristics for the permutation flowshop.
//!
//! Each heuristic builds one complete job sequence from scratch:
//! - SPT (shortest total processing time first)
//! - Palmer's slope index
//! - NEH (Nawaz, Enscore & Ham insertion)
//! - CDS (Campbell, Dudek & Smith), built on Johnson's two-machine rule

use crate::instance::FlowshopInstance;
use crate::solution::Candidate;
use ordered_float::OrderedFloat;
use std::cmp::Reverse;

pub trait ConstructionHeuristic {
    fn construct(&self, instance: &FlowshopInstance) -> Candidate;
    fn name(&self) -> &str;
}

/// The four deterministic seeds of the scatter search, in insertion order.
pub fn seed_heuristics() -> Vec<Box<dyn ConstructionHeuristic + Send + Sync>> {
    vec![
        Box::new(NehHeuristic::new()),
        Box::new(PalmerHeuristic::new()),
        Box::new(SptHeuristic::new()),
        Box::new(CdsHeuristic::new()),
    ]
}

/// Shortest Processing Time
///
/// Orders jobs ascending by their total processing time over all machines.
#[derive(Debug, Clone, Copy, Default)]
pub struct SptHeuristic;

impl SptHeuristic {
    pub fn new() -> Self {
        SptHeuristic
    }
}

impl ConstructionHeuristic for SptHeuristic {
    fn construct(&self, instance: &FlowshopInstance) -> Candidate {
        let totals = instance.total_job_times();
        let mut sequence = instance.job_list();
        sequence.sort_by_key(|&job| OrderedFloat(totals[job]));
        Candidate::new(instance, sequence)
    }

    fn name(&self) -> &str {
        "SPT"
    }
}

/// Palmer's Slope Index
///
/// Jobs whose processing times grow along the machine route get a large
/// slope and are scheduled first.
#[derive(Debug, Clone, Copy, Default)]
pub struct PalmerHeuristic;

impl PalmerHeuristic {
    pub fn new() -> Self {
        PalmerHeuristic
    }

    /// Slope index of every job: `Σ_m -(M - (2(m+1) - 1)) · p[m][job]`
    pub fn slope_indices(instance: &FlowshopInstance) -> Vec<f64> {
        let m = instance.num_machines as f64;
        let coefficients: Vec<f64> = (0..instance.num_machines)
            .map(|machine| -(m - (2.0 * (machine + 1) as f64 - 1.0)))
            .collect();

        (0..instance.num_jobs)
            .map(|job| {
                coefficients.iter()
                    .enumerate()
                    .map(|(machine, c)| c * instance.processing_time(machine, job))
                    .sum()
            })
            .collect()
    }
}

impl ConstructionHeuristic for PalmerHeuristic {
    fn construct(&self, instance: &FlowshopInstance) -> Candidate {
        let slopes = Self::slope_indices(instance);
        let mut sequence = instance.job_list();
        sequence.sort_by_key(|&job| Reverse(OrderedFloat(slopes[job])));
        Candidate::new(instance, sequence)
    }

    fn name(&self) -> &str {
        "Palmer"
    }
}

/// NEH Insertion Heuristic
///
/// Takes jobs by descending total processing time and inserts each one at
/// the position of the partial sequence that yields the smallest makespan.
#[derive(Debug, Clone, Copy, Default)]
pub struct NehHeuristic;

impl NehHeuristic {
    pub fn new() -> Self {
        NehHeuristic
    }

    /// Jobs by descending total time. The sort is stable, so among equal
    /// totals the lowest job index leads.
    pub fn priority_order(instance: &FlowshopInstance) -> Vec<usize> {
        let totals = instance.total_job_times();
        let mut order = instance.job_list();
        order.sort_by_key(|&job| Reverse(OrderedFloat(totals[job])));
        order
    }

    /// Best insertion of `job` into `partial`; the first position reaching
    /// the strict minimum wins.
    fn best_insertion(instance: &FlowshopInstance, partial: &[usize], job: usize) -> (Vec<usize>, f64) {
        let mut best: Option<(Vec<usize>, f64)> = None;

        for pos in 0..=partial.len() {
            let mut trial = partial.to_vec();
            trial.insert(pos, job);
            let makespan = instance.makespan(&trial);

            let better = match &best {
                Some((_, best_makespan)) => makespan < *best_makespan,
                None => true,
            };
            if better {
                best = Some((trial, makespan));
            }
        }

        // partial.len() + 1 >= 1 positions were tried
        best.unwrap_or_else(|| (vec![job], instance.makespan(&[job])))
    }
}

impl ConstructionHeuristic for NehHeuristic {
    fn construct(&self, instance: &FlowshopInstance) -> Candidate {
        let order = Self::priority_order(instance);

        let mut sequence: Vec<usize> = Vec::with_capacity(order.len());
        let mut makespan = 0.0;
        for &job in &order {
            let (next, next_makespan) = Self::best_insertion(instance, &sequence, job);
            sequence = next;
            makespan = next_makespan;
        }

        Candidate { sequence, makespan }
    }

    fn name(&self) -> &str {
        "NEH"
    }
}

/// Johnson's rule on a two-machine problem given as per-job times on the
/// first (`machine_a`) and second (`machine_b`) machine.
///
/// Jobs with `a < b` go to the front, ascending by `a + b`; the others
/// (ties included) follow, descending by `a + b`.
pub fn johnsons_rule(machine_a: &[f64], machine_b: &[f64]) -> Vec<usize> {
    let (mut front, mut back): (Vec<usize>, Vec<usize>) = (0..machine_a.len())
        .partition(|&job| machine_a[job] < machine_b[job]);

    let sum = |job: usize| OrderedFloat(machine_a[job] + machine_b[job]);
    front.sort_by_key(|&job| sum(job));
    back.sort_by_key(|&job| Reverse(sum(job)));

    front.extend(back);
    front
}

/// Campbell, Dudek & Smith
///
/// Solves `M - 1` aggregated two-machine surrogates with Johnson's rule and
/// keeps the surrogate sequence with the smallest real makespan.
#[derive(Debug, Clone, Copy, Default)]
pub struct CdsHeuristic;

impl CdsHeuristic {
    pub fn new() -> Self {
        CdsHeuristic
    }

    /// Sequences of every surrogate problem, in surrogate order.
    pub fn surrogate_sequences(instance: &FlowshopInstance) -> Vec<Vec<usize>> {
        let last = instance.num_machines - 1;
        let mut machine_a = instance.processing_times[0].clone();
        let mut machine_b = instance.processing_times[last].clone();

        let mut sequences = vec![johnsons_rule(&machine_a, &machine_b)];

        for s in 1..last {
            for job in 0..instance.num_jobs {
                machine_a[job] += instance.processing_time(s, job);
                machine_b[job] += instance.processing_time(last - s, job);
            }
            sequences.push(johnsons_rule(&machine_a, &machine_b));
        }

        sequences
    }
}

impl ConstructionHeuristic for CdsHeuristic {
    fn construct(&self, instance: &FlowshopInstance) -> Candidate {
        let mut best: Option<Candidate> = None;

        for sequence in Self::surrogate_sequences(instance) {
            let candidate = Candidate::new(instance, sequence);
            let better = match &best {
                Some(b) => candidate.makespan < b.makespan,
                None => true,
            };
            if better {
                best = Some(candidate);
            }
        }

        // at least one surrogate always exists
        best.unwrap_or_else(|| Candidate::new(instance, instance.job_list()))
    }

    fn name(&self) -> &str {
        "CDS"
    }
}

/// Multi-Start Construction
///
/// Runs multiple construction heuristics and returns the best result.
pub struct MultiStartConstruction {
    heuristics: Vec<Box<dyn ConstructionHeuristic + Send + Sync>>,
}

impl MultiStartConstruction {
    pub fn new() -> Self {
        MultiStartConstruction {
            heuristics: Vec::new(),
        }
    }

    pub fn with_all_heuristics() -> Self {
        MultiStartConstruction {
            heuristics: seed_heuristics(),
        }
    }

    pub fn add_heuristic<H: ConstructionHeuristic + Send + Sync + 'static>(&mut self, h: H) {
        self.heuristics.push(Box::new(h));
    }

    /// Best candidate together with the name of the heuristic that built it
    pub fn construct_named(&self, instance: &FlowshopInstance) -> Option<(Candidate, &str)> {
        let mut best: Option<(Candidate, &str)> = None;

        for heuristic in &self.heuristics {
            let candidate = heuristic.construct(instance);
            log::debug!("{} makespan {:.2}", heuristic.name(), candidate.makespan);

            let better = match &best {
                Some((b, _)) => candidate.makespan < b.makespan,
                None => true,
            };
            if better {
                best = Some((candidate, heuristic.name()));
            }
        }

        best
    }
}

impl Default for MultiStartConstruction {
    fn default() -> Self {
        Self::with_all_heuristics()
    }
}

impl ConstructionHeuristic for MultiStartConstruction {
    fn construct(&self, instance: &FlowshopInstance) -> Candidate {
        self.construct_named(instance)
            .map(|(candidate, _)| candidate)
            .unwrap_or_else(|| Candidate::new(instance, instance.job_list()))
    }

    fn name(&self) -> &str {
        "MultiStart"
    }
}
