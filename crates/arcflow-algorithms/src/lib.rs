pub mod common;
pub mod flow;
pub mod preflow;

pub use common::{Capacity, FlowNetwork, NodeIndex};
pub use flow::{edmonds_karp, FlowResult};
pub use preflow::{Preflow, SolverConfig, SolverStats};
