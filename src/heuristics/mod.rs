//! Heuristics module for the permutation flowshop.
//!
//! This module exports the construction heuristics, the local search, path
//! relinking and the scatter search that combines them.

pub mod construction;
pub mod local_search;
pub mod path_relinking;
pub mod scatter_search;

pub use construction::*;
pub use local_search::*;
pub use path_relinking::*;
pub use scatter_search::*;
