//! Arcflow
//!
//! Repeated maximum-flow evaluation under transient arc failures.
//!
//! # Architecture
//!
//! - [`graph`]: append-only directed multigraph and dense per-arc value maps
//! - [`flow`]: the scenario engine, which snapshots a capacity map once and then
//!   answers "what is the max flow if these arcs fail?" without rebuilding state
//! - [`boundary`]: handle-based surface for hosts that cannot hold references
//! - [`network`]: JSON/YAML network descriptions with named scenarios
//!
//! The solvers themselves live in the `arcflow-algorithms` crate and operate on
//! a CSR residual network independent of the graph store.
//!
//! ## Example Usage
//!
//! ```rust
//! use arcflow::graph::{ArcMap, DigraphStore};
//! use arcflow::FlowComputation;
//!
//! let mut graph = DigraphStore::new();
//! let a = graph.add_node();
//! let b = graph.add_node();
//! let c = graph.add_node();
//! let ab = graph.add_arc(a, b);
//! let bc = graph.add_arc(b, c);
//!
//! let mut capacities: ArcMap<i32> = ArcMap::new(&graph);
//! capacities.set(ab, 5);
//! capacities.set(bc, 3);
//!
//! let mut flow = FlowComputation::new(&graph, &capacities, a, c).unwrap();
//! assert_eq!(flow.run_scenario(&[]).unwrap(), 3);
//! assert_eq!(flow.run_scenario(&[bc]).unwrap(), 0);
//! assert_eq!(flow.run_scenario(&[]).unwrap(), 3);
//! ```

#![allow(missing_docs)]
#![warn(clippy::all)]

pub mod boundary;
pub mod flow;
pub mod graph;
pub mod network;

// Re-export main types for convenience
pub use graph::{
    ArcId, ArcMap, ArcValue, DigraphStore, DynArcMap, GraphError, GraphResult, GraphTag, MapValue,
    NodeId, ValueKind,
};

pub use flow::{
    evaluate_scenarios_parallel, single_arc_sweep_parallel, ArcImpact, FlowComputation, FlowError,
    FlowResult, IntegerCapacity, ParallelConfig, SolverConfig, SolverStats,
};

pub use boundary::{
    ApiError, ApiResult, ArcHandle, FlowHandle, GraphHandle, MapHandle, NodeHandle, Session,
};

pub use network::{LoadError, LoadResult, Network, NetworkSpec, Scenario};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get version string
pub fn version() -> &'static str {
    VERSION
}
