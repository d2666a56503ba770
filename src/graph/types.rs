//! Core identifier types for the digraph store

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Identifier of a node, dense and sequential per graph (0, 1, 2, ...)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub struct NodeId(pub u32);

impl NodeId {
    pub fn new(id: u32) -> Self {
        NodeId(id)
    }

    pub fn as_u32(&self) -> u32 {
        self.0
    }

    /// Position in dense per-node arrays
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self.0)
    }
}

impl From<u32> for NodeId {
    fn from(id: u32) -> Self {
        NodeId(id)
    }
}

/// Identifier of an arc, dense and sequential per graph (0, 1, 2, ...)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub struct ArcId(pub u32);

impl ArcId {
    pub fn new(id: u32) -> Self {
        ArcId(id)
    }

    pub fn as_u32(&self) -> u32 {
        self.0
    }

    /// Position in dense per-arc arrays
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ArcId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ArcId({})", self.0)
    }
}

impl From<u32> for ArcId {
    fn from(id: u32) -> Self {
        ArcId(id)
    }
}

/// Process-unique identity of a graph instance.
///
/// Arc maps and flow computations record the tag of the graph they were created
/// for, so they can refuse to be paired with a different graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GraphTag(u64);

static NEXT_GRAPH_TAG: AtomicU64 = AtomicU64::new(1);

impl GraphTag {
    pub(crate) fn fresh() -> Self {
        GraphTag(NEXT_GRAPH_TAG.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for GraphTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Graph#{}", self.0)
    }
}
