//! Local search improvement for flowshop candidates.

use crate::instance::FlowshopInstance;
use crate::solution::Candidate;

/// Trait for local search improvement methods
pub trait LocalSearch {
    /// Improve `candidate` in place. Returns `true` if its makespan decreased.
    fn improve(&self, instance: &FlowshopInstance, candidate: &mut Candidate) -> bool;
    fn name(&self) -> &str;
}

/// Adjacent Pair Exchange
///
/// Tries every swap of two neighbouring jobs, each derived from the
/// unmodified sequence, and applies the single best strictly improving one.
#[derive(Debug, Clone, Copy, Default)]
pub struct AdjacentSwapSearch;

impl AdjacentSwapSearch {
    pub fn new() -> Self {
        AdjacentSwapSearch
    }

    /// Best strictly improving adjacent swap, as `(position, makespan)`.
    pub fn best_move(&self, instance: &FlowshopInstance, candidate: &Candidate) -> Option<(usize, f64)> {
        let n = candidate.sequence.len();
        let mut best: Option<(usize, f64)> = None;
        let mut best_makespan = candidate.makespan;

        for i in 0..n.saturating_sub(1) {
            let mut trial = candidate.sequence.clone();
            trial.swap(i, i + 1);
            let makespan = instance.makespan(&trial);

            if makespan < best_makespan {
                best_makespan = makespan;
                best = Some((i, makespan));
            }
        }

        best
    }
}

impl LocalSearch for AdjacentSwapSearch {
    fn improve(&self, instance: &FlowshopInstance, candidate: &mut Candidate) -> bool {
        match self.best_move(instance, candidate) {
            Some((i, makespan)) => {
                candidate.sequence.swap(i, i + 1);
                candidate.makespan = makespan;
                true
            }
            None => false,
        }
    }

    fn name(&self) -> &str {
        "AdjacentSwap"
    }
}
