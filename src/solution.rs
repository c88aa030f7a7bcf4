//! Solution representation for the permutation flowshop.
//!
//! Two representations live here: the lightweight [`Candidate`] that every
//! search loop mutates, and the fully expanded [`Solution`] carrying the
//! per-machine timing table, built once at the end of a run.

use crate::error::{FlowshopError, Result};
use crate::instance::FlowshopInstance;
use serde::{Deserialize, Serialize};

/// A job sequence together with its makespan.
///
/// Candidates are always created evaluated, so `makespan` is never a
/// placeholder value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub sequence: Vec<usize>,
    pub makespan: f64,
}

impl Candidate {
    /// Evaluate `sequence` and wrap it as a candidate
    pub fn new(instance: &FlowshopInstance, sequence: Vec<usize>) -> Self {
        let makespan = instance.makespan(&sequence);
        Candidate { sequence, makespan }
    }

    /// Fail with `NonPermutationSequence` unless the sequence holds every job exactly once
    pub fn ensure_permutation(&self, num_jobs: usize) -> Result<()> {
        ensure_permutation(&self.sequence, num_jobs)
    }
}

/// Check that `sequence` contains each index of `0..num_jobs` exactly once
pub fn is_permutation(sequence: &[usize], num_jobs: usize) -> bool {
    if sequence.len() != num_jobs {
        return false;
    }

    let mut seen = vec![false; num_jobs];
    for &job in sequence {
        if job >= num_jobs || seen[job] {
            return false;
        }
        seen[job] = true;
    }
    true
}

pub fn ensure_permutation(sequence: &[usize], num_jobs: usize) -> Result<()> {
    if is_permutation(sequence, num_jobs) {
        Ok(())
    } else {
        Err(FlowshopError::NonPermutationSequence {
            jobs: num_jobs,
            sequence: sequence.to_vec(),
        })
    }
}

/// Timing of one job on one machine
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScheduledJob {
    pub start: f64,
    pub end: f64,
    pub process_time: f64,
    /// Job index
    pub name: usize,
}

/// Represents a complete schedule for a flowshop instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Solution {
    /// Job order shared by all machines
    pub sequence: Vec<usize>,
    /// Completion time of the last job on the last machine
    pub makespan: f64,
    /// Timing table indexed `[machine][position]`
    pub jobs: Vec<Vec<ScheduledJob>>,
    /// Algorithm that generated this solution
    pub algorithm: String,
    /// Computation time in seconds
    pub computation_time: f64,
    /// Number of iterations (if applicable)
    pub iterations: Option<usize>,
}

impl Solution {
    /// Expand a full job permutation into its timing table.
    ///
    /// Same recurrence as [`FlowshopInstance::makespan`] but every
    /// start/end pair is recorded.
    pub fn from_sequence(instance: &FlowshopInstance, sequence: Vec<usize>, algorithm: &str) -> Result<Self> {
        instance.validate()?;
        ensure_permutation(&sequence, instance.num_jobs)?;

        let mut jobs: Vec<Vec<ScheduledJob>> = Vec::with_capacity(instance.num_machines);

        for machine in 0..instance.num_machines {
            let mut row: Vec<ScheduledJob> = Vec::with_capacity(sequence.len());

            for (pos, &job) in sequence.iter().enumerate() {
                let end_of_prev_machine = if machine == 0 { 0.0 } else { jobs[machine - 1][pos].end };
                let end_of_prev_job = if pos == 0 { 0.0 } else { row[pos - 1].end };
                let start = end_of_prev_machine.max(end_of_prev_job);
                let process_time = instance.processing_time(machine, job);

                row.push(ScheduledJob {
                    start,
                    end: start + process_time,
                    process_time,
                    name: job,
                });
            }

            jobs.push(row);
        }

        let makespan = jobs.last()
            .and_then(|row| row.last())
            .map(|job| job.end)
            .unwrap_or(0.0);

        Ok(Solution {
            sequence,
            makespan,
            jobs,
            algorithm: algorithm.to_string(),
            computation_time: 0.0,
            iterations: None,
        })
    }

    /// Expand a candidate produced by a heuristic
    pub fn from_candidate(instance: &FlowshopInstance, candidate: &Candidate, algorithm: &str) -> Result<Self> {
        Self::from_sequence(instance, candidate.sequence.clone(), algorithm)
    }

    /// Idle time accumulated on each machine before its last job completes
    pub fn machine_idle_times(&self) -> Vec<f64> {
        self.jobs.iter()
            .map(|row| {
                let busy: f64 = row.iter().map(|j| j.process_time).sum();
                row.last().map(|j| j.end - busy).unwrap_or(0.0)
            })
            .collect()
    }
}

impl std::fmt::Display for Solution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Solution ({})", self.algorithm)?;
        writeln!(f, "  Makespan: {:.2}", self.makespan)?;
        writeln!(f, "  Time: {:.4}s", self.computation_time)?;
        if let Some(iter) = self.iterations {
            writeln!(f, "  Iterations: {}", iter)?;
        }
        writeln!(f, "  Sequence: {:?}", self.sequence)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_instance() -> FlowshopInstance {
        FlowshopInstance::new("test", vec![
            vec![2.0, 3.0, 1.0],
            vec![1.0, 2.0, 4.0],
        ]).unwrap()
    }

    #[test]
    fn test_candidate_is_evaluated() {
        let instance = create_test_instance();
        let candidate = Candidate::new(&instance, vec![2, 0, 1]);
        assert_eq!(candidate.makespan, 8.0);
        assert!(candidate.ensure_permutation(3).is_ok());
    }

    #[test]
    fn test_timing_table() {
        let instance = create_test_instance();
        let sol = Solution::from_sequence(&instance, vec![2, 0, 1], "test").unwrap();

        assert_eq!(sol.makespan, 8.0);
        let ends_m0: Vec<f64> = sol.jobs[0].iter().map(|j| j.end).collect();
        assert_eq!(ends_m0, vec![1.0, 3.0, 6.0]);

        let m1 = &sol.jobs[1];
        assert_eq!((m1[0].start, m1[0].end), (1.0, 5.0));
        assert_eq!((m1[1].start, m1[1].end), (5.0, 6.0));
        assert_eq!((m1[2].start, m1[2].end), (6.0, 8.0));
        assert_eq!(m1[2].name, 1);
        assert_eq!(m1[2].process_time, 2.0);
    }

    #[test]
    fn test_timing_table_matches_makespan() {
        let instance = FlowshopInstance::new("3x4", vec![
            vec![5.0, 1.0, 7.0, 3.0],
            vec![2.0, 6.0, 1.0, 4.0],
            vec![3.0, 3.0, 2.0, 8.0],
        ]).unwrap();
        let seq = vec![3, 1, 0, 2];
        let sol = Solution::from_sequence(&instance, seq.clone(), "test").unwrap();
        assert_eq!(sol.makespan, instance.makespan(&seq));
    }

    #[test]
    fn test_rejects_non_permutation() {
        let instance = create_test_instance();
        let err = Solution::from_sequence(&instance, vec![0, 0, 1], "test").unwrap_err();
        assert!(matches!(err, FlowshopError::NonPermutationSequence { jobs: 3, .. }));

        assert!(!is_permutation(&[0, 1], 3));
        assert!(!is_permutation(&[0, 1, 3], 3));
        assert!(is_permutation(&[1, 2, 0], 3));
    }

    #[test]
    fn test_idle_times() {
        let instance = create_test_instance();
        let sol = Solution::from_sequence(&instance, vec![2, 0, 1], "test").unwrap();
        // M1 busy 7 out of 8
        assert_eq!(sol.machine_idle_times(), vec![0.0, 1.0]);
    }
}
