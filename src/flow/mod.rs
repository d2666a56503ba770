//! Max-flow evaluation under transient arc failures
//!
//! - `computation`: the engine (snapshot, overlay, preflow solver, last value)
//! - `sweep`: single-arc failure ranking
//! - `parallel`: batch evaluation on per-worker engine clones

pub mod computation;
pub mod parallel;
pub mod sweep;

pub use arcflow_algorithms::{SolverConfig, SolverStats};
pub use computation::{FlowComputation, FlowError, FlowResult, IntegerCapacity};
pub use parallel::{evaluate_scenarios_parallel, single_arc_sweep_parallel, ParallelConfig};
pub use sweep::ArcImpact;
