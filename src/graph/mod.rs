//! Digraph store and arc attribute maps
//!
//! This module implements the graph side of the engine:
//! - Append-only directed multigraph with dense sequential node and arc ids
//! - Typed per-arc value storage (six numeric kinds), statically or dynamically tagged

pub mod arc_map;
pub mod store;
pub mod types;
pub mod value;

// Re-export main types
pub use arc_map::{ArcMap, DynArcMap};
pub use store::{DigraphStore, GraphError, GraphResult};
pub use types::{ArcId, GraphTag, NodeId};
pub use value::{ArcValue, MapValue, ValueKind};
