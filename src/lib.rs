//! Permutation Flowshop Solver Library
//!
//! Minimises the makespan of a permutation flowshop: every job visits the
//! machines in the same order, and one job sequence is shared by all machines.
//!
//! # Features
//!
//! - Makespan evaluation of full and partial sequences
//! - Construction heuristics (NEH, Palmer, SPT, CDS with Johnson's rule)
//! - Adjacent pair exchange local search
//! - Path relinking between sequences
//! - Scatter Search combining all of the above
//! - Taillard instance loading and benchmarking tools
//!
//! # Example
//!
//! ```no_run
//! use flowshop_solver::instance::FlowshopInstance;
//! use flowshop_solver::heuristics::scatter_search::{ScatterSearch, ScatterSearchConfig};
//!
//! let instance = FlowshopInstance::from_file("tai20_5_0.txt").unwrap();
//!
//! let search = ScatterSearch::new(ScatterSearchConfig::default());
//! let solution = search.run(&instance).unwrap();
//!
//! println!("Makespan: {:.0}", solution.makespan);
//! ```

pub mod error;
pub mod instance;
pub mod solution;
pub mod heuristics;
pub mod benchmark;

pub use error::{FlowshopError, Result};
pub use instance::FlowshopInstance;
pub use solution::{Candidate, Solution};
