//! Module for parsing and representing flowshop instances.
//!
//! This module handles Taillard's benchmark format and owns the makespan
//! recurrence used by every heuristic in the crate.

use crate::error::{FlowshopError, Result};
use std::fs;
use std::path::Path;
use serde::{Deserialize, Serialize};

/// Represents a complete permutation flowshop instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowshopInstance {
    /// Name of the instance
    pub name: String,
    /// Number of jobs
    pub num_jobs: usize,
    /// Number of machines
    pub num_machines: usize,
    /// Processing times indexed `[machine][job]`
    pub processing_times: Vec<Vec<f64>>,
    /// Lower bound on the optimal makespan (reporting only)
    pub lower_bound: Option<f64>,
    /// Best known makespan (reporting only)
    pub upper_bound: Option<f64>,
}

impl FlowshopInstance {
    /// Build a validated instance from a `[machine][job]` processing time matrix.
    pub fn new(name: &str, processing_times: Vec<Vec<f64>>) -> Result<Self> {
        let num_machines = processing_times.len();
        let num_jobs = processing_times.first().map(|row| row.len()).unwrap_or(0);

        let instance = FlowshopInstance {
            name: name.to_string(),
            num_jobs,
            num_machines,
            processing_times,
            lower_bound: None,
            upper_bound: None,
        };
        instance.validate()?;
        Ok(instance)
    }

    /// Attach reference bounds used by the reporting layer.
    pub fn with_bounds(mut self, lower_bound: Option<f64>, upper_bound: Option<f64>) -> Self {
        self.lower_bound = lower_bound;
        self.upper_bound = upper_bound;
        self
    }

    /// Check the shape invariants. Must pass before any search begins.
    pub fn validate(&self) -> Result<()> {
        if self.num_jobs == 0 || self.num_machines == 0 {
            return Err(FlowshopError::DegenerateProblem {
                jobs: self.num_jobs,
                machines: self.num_machines,
            });
        }

        if self.processing_times.len() != self.num_machines {
            return Err(FlowshopError::InvalidProblemShape(format!(
                "{} rows of processing times for {} machines",
                self.processing_times.len(),
                self.num_machines
            )));
        }

        for (machine, row) in self.processing_times.iter().enumerate() {
            if row.len() != self.num_jobs {
                return Err(FlowshopError::InvalidProblemShape(format!(
                    "machine {} has {} processing times for {} jobs",
                    machine,
                    row.len(),
                    self.num_jobs
                )));
            }
            if let Some(job) = row.iter().position(|&t| !t.is_finite() || t < 0.0) {
                return Err(FlowshopError::InvalidProblemShape(format!(
                    "processing time of job {} on machine {} is {}",
                    job, machine, row[job]
                )));
            }
        }

        Ok(())
    }

    /// Parse an instance from a Taillard format file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = fs::read_to_string(&path)?;
        let name = path.as_ref()
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        Self::parse_taillard(&name, &text)
    }

    /// Parse Taillard's format:
    ///
    /// ```text
    /// number of jobs, number of machines, initial seed, upper bound and lower bound :
    ///           20           5   873654221        1278        1232
    /// processing times :
    ///  54 83 15 71 77 36 53 38 27 87 76 91 14 29 12 77 32 87 68 94
    ///  ...
    /// ```
    pub fn parse_taillard(name: &str, text: &str) -> Result<Self> {
        let mut lines = text.lines()
            .map(str::trim)
            .filter(|line| !line.is_empty());

        lines.next()
            .ok_or_else(|| FlowshopError::Parse("empty instance file".to_string()))?;

        let header = lines.next()
            .ok_or_else(|| FlowshopError::Parse("missing instance properties line".to_string()))?;
        let properties = parse_numbers(header)?;
        let tokens: Vec<&str> = header.split_whitespace().collect();
        if tokens.len() < 2 {
            return Err(FlowshopError::Parse(format!(
                "expected at least jobs and machines on the properties line, got '{}'",
                header
            )));
        }
        let num_jobs = parse_count(tokens[0], "jobs")?;
        let num_machines = parse_count(tokens[1], "machines")?;
        let upper_bound = properties.get(3).copied();
        let lower_bound = properties.get(4).copied();

        lines.next()
            .ok_or_else(|| FlowshopError::Parse("missing processing times section".to_string()))?;

        let mut processing_times = Vec::new();
        for line in lines.take(num_machines) {
            processing_times.push(parse_numbers(line)?);
        }

        let instance = FlowshopInstance {
            name: name.to_string(),
            num_jobs,
            num_machines,
            processing_times,
            lower_bound,
            upper_bound,
        };
        instance.validate()?;
        Ok(instance)
    }

    /// Processing time of `job` on `machine`
    #[inline]
    pub fn processing_time(&self, machine: usize, job: usize) -> f64 {
        self.processing_times[machine][job]
    }

    /// Makespan of a (possibly partial) sequence.
    ///
    /// Only the previous position's completion times are kept, one per machine,
    /// so the cost is O(machines × len) time and O(machines) memory.
    pub fn makespan(&self, sequence: &[usize]) -> f64 {
        let mut completion = vec![0.0; self.num_machines];

        for &job in sequence {
            completion[0] += self.processing_times[0][job];
            for machine in 1..self.num_machines {
                let start = completion[machine - 1].max(completion[machine]);
                completion[machine] = start + self.processing_times[machine][job];
            }
        }

        completion.last().copied().unwrap_or(0.0)
    }

    /// Sum of the processing times of each job over all machines
    pub fn total_job_times(&self) -> Vec<f64> {
        (0..self.num_jobs)
            .map(|job| self.processing_times.iter().map(|row| row[job]).sum())
            .collect()
    }

    /// Identity sequence `0..num_jobs`
    pub fn job_list(&self) -> Vec<usize> {
        (0..self.num_jobs).collect()
    }

    /// Get statistics about the instance
    pub fn statistics(&self) -> InstanceStatistics {
        let all_times: Vec<f64> = self.processing_times.iter().flatten().copied().collect();
        let total_work: f64 = all_times.iter().sum();
        let avg_processing_time = if all_times.is_empty() {
            0.0
        } else {
            total_work / all_times.len() as f64
        };
        let max_processing_time = all_times.iter().cloned().fold(0.0, f64::max);

        let machine_loads: Vec<f64> = self.processing_times.iter()
            .map(|row| row.iter().sum())
            .collect();
        let max_machine_load = machine_loads.iter().cloned().fold(0.0, f64::max);

        InstanceStatistics {
            name: self.name.clone(),
            num_jobs: self.num_jobs,
            num_machines: self.num_machines,
            total_work,
            avg_processing_time,
            max_processing_time,
            max_machine_load,
            lower_bound: self.lower_bound,
            upper_bound: self.upper_bound,
        }
    }
}

fn parse_numbers(line: &str) -> Result<Vec<f64>> {
    line.split_whitespace()
        .map(|token| token.parse::<f64>()
            .map_err(|_| FlowshopError::Parse(format!("invalid number '{}'", token))))
        .collect()
}

fn parse_count(token: &str, what: &str) -> Result<usize> {
    token.parse::<usize>()
        .map_err(|_| FlowshopError::Parse(format!("number of {} must be a non-negative integer, got '{}'", what, token)))
}

/// Statistics about a flowshop instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceStatistics {
    pub name: String,
    pub num_jobs: usize,
    pub num_machines: usize,
    pub total_work: f64,
    pub avg_processing_time: f64,
    pub max_processing_time: f64,
    /// Largest per-machine workload, a trivial makespan lower bound
    pub max_machine_load: f64,
    pub lower_bound: Option<f64>,
    pub upper_bound: Option<f64>,
}

impl std::fmt::Display for InstanceStatistics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Instance: {}", self.name)?;
        writeln!(f, "  Jobs: {}", self.num_jobs)?;
        writeln!(f, "  Machines: {}", self.num_machines)?;
        writeln!(f, "  Total work: {:.2}", self.total_work)?;
        writeln!(f, "  Avg processing time: {:.2}", self.avg_processing_time)?;
        writeln!(f, "  Max processing time: {:.2}", self.max_processing_time)?;
        writeln!(f, "  Max machine load: {:.2}", self.max_machine_load)?;
        match self.lower_bound {
            Some(lb) => writeln!(f, "  Lower bound: {:.0}", lb)?,
            None => writeln!(f, "  Lower bound: -")?,
        }
        match self.upper_bound {
            Some(ub) => writeln!(f, "  Upper bound: {:.0}", ub),
            None => writeln!(f, "  Upper bound: -"),
        }
    }
}
