//! In-memory digraph storage
//!
//! Append-only directed multigraph: nodes and arcs receive dense sequential ids
//! and are never removed. Parallel arcs and self-loops are allowed.

use super::value::ValueKind;
use super::types::{ArcId, GraphTag, NodeId};
use thiserror::Error;

/// Errors that can occur during graph operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GraphError {
    #[error("Node {0} not found")]
    NodeNotFound(NodeId),

    #[error("Arc {0} not found")]
    ArcNotFound(ArcId),

    #[error("Arc map belongs to {map}, not {graph}")]
    ForeignMap { map: GraphTag, graph: GraphTag },

    #[error("Value kind mismatch: map holds {expected}, got {found}")]
    KindMismatch { expected: ValueKind, found: ValueKind },

    #[error("Map of kind {0} does not hold integer values")]
    NotIntegerKind(ValueKind),

    #[error("Graph is full: id space exhausted")]
    IdSpaceExhausted,
}

pub type GraphResult<T> = Result<T, GraphError>;

/// Endpoints recorded for an arc at creation time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ArcRecord {
    source: NodeId,
    target: NodeId,
}

/// In-memory digraph storage
///
/// Arena layout indexed by id:
/// - arcs: ArcId -> (source, target)
/// - outgoing: NodeId -> Vec<ArcId> (adjacency list for outgoing arcs)
/// - incoming: NodeId -> Vec<ArcId> (adjacency list for incoming arcs)
#[derive(Debug)]
pub struct DigraphStore {
    /// Identity checked by arc maps and flow computations
    tag: GraphTag,

    /// Arc storage
    arcs: Vec<ArcRecord>,

    /// Outgoing arcs for each node
    outgoing: Vec<Vec<ArcId>>,

    /// Incoming arcs for each node
    incoming: Vec<Vec<ArcId>>,
}

impl DigraphStore {
    /// Create a new empty graph
    pub fn new() -> Self {
        DigraphStore {
            tag: GraphTag::fresh(),
            arcs: Vec::new(),
            outgoing: Vec::new(),
            incoming: Vec::new(),
        }
    }

    /// Create an empty graph with room for the given number of nodes and arcs
    pub fn with_capacity(nodes: usize, arcs: usize) -> Self {
        let mut store = Self::new();
        store.reserve(nodes, arcs);
        store
    }

    pub fn reserve(&mut self, nodes: usize, arcs: usize) {
        self.arcs.reserve(arcs);
        self.outgoing.reserve(nodes);
        self.incoming.reserve(nodes);
    }

    pub fn tag(&self) -> GraphTag {
        self.tag
    }

    /// Add a node; ids are handed out as 0, 1, 2, ...
    ///
    /// # Panics
    ///
    /// Panics once `u32::MAX` nodes exist. Use [`DigraphStore::try_add_node`] to
    /// observe that condition as an error.
    pub fn add_node(&mut self) -> NodeId {
        match self.try_add_node() {
            Ok(id) => id,
            Err(e) => panic!("{}", e),
        }
    }

    pub fn try_add_node(&mut self) -> GraphResult<NodeId> {
        let id = u32::try_from(self.outgoing.len()).map_err(|_| GraphError::IdSpaceExhausted)?;
        self.outgoing.push(Vec::new());
        self.incoming.push(Vec::new());
        Ok(NodeId::new(id))
    }

    /// Add an arc from `source` to `target`.
    ///
    /// # Panics
    ///
    /// Panics if either endpoint does not belong to this graph. Use
    /// [`DigraphStore::try_add_arc`] for a checked variant.
    pub fn add_arc(&mut self, source: NodeId, target: NodeId) -> ArcId {
        match self.try_add_arc(source, target) {
            Ok(id) => id,
            Err(e) => panic!("add_arc({}, {}): {}", source, target, e),
        }
    }

    pub fn try_add_arc(&mut self, source: NodeId, target: NodeId) -> GraphResult<ArcId> {
        if !self.contains_node(source) {
            return Err(GraphError::NodeNotFound(source));
        }
        if !self.contains_node(target) {
            return Err(GraphError::NodeNotFound(target));
        }
        let id = ArcId::new(u32::try_from(self.arcs.len()).map_err(|_| GraphError::IdSpaceExhausted)?);

        self.arcs.push(ArcRecord { source, target });
        self.outgoing[source.index()].push(id);
        self.incoming[target.index()].push(id);
        Ok(id)
    }

    /// Integer identity of a node
    pub fn node_id(&self, node: NodeId) -> u32 {
        node.as_u32()
    }

    /// Integer identity of an arc
    pub fn arc_id(&self, arc: ArcId) -> u32 {
        arc.as_u32()
    }

    /// Source node of an arc
    ///
    /// # Panics
    ///
    /// Panics if the arc does not belong to this graph.
    pub fn source(&self, arc: ArcId) -> NodeId {
        self.arcs[arc.index()].source
    }

    /// Target node of an arc
    ///
    /// # Panics
    ///
    /// Panics if the arc does not belong to this graph.
    pub fn target(&self, arc: ArcId) -> NodeId {
        self.arcs[arc.index()].target
    }

    /// Checked `(source, target)` lookup
    pub fn endpoints(&self, arc: ArcId) -> GraphResult<(NodeId, NodeId)> {
        self.arcs
            .get(arc.index())
            .map(|record| (record.source, record.target))
            .ok_or(GraphError::ArcNotFound(arc))
    }

    pub fn contains_node(&self, node: NodeId) -> bool {
        node.index() < self.outgoing.len()
    }

    pub fn contains_arc(&self, arc: ArcId) -> bool {
        arc.index() < self.arcs.len()
    }

    pub fn node_count(&self) -> usize {
        self.outgoing.len()
    }

    pub fn arc_count(&self) -> usize {
        self.arcs.len()
    }

    /// All nodes in id order
    pub fn nodes(&self) -> impl ExactSizeIterator<Item = NodeId> + '_ {
        (0..self.outgoing.len()).map(|i| NodeId::new(i as u32))
    }

    /// All arcs in id order
    pub fn arcs(&self) -> impl ExactSizeIterator<Item = ArcId> + '_ {
        (0..self.arcs.len()).map(|i| ArcId::new(i as u32))
    }

    /// Outgoing arcs of a node, in creation order
    pub fn out_arcs(&self, node: NodeId) -> &[ArcId] {
        self.outgoing.get(node.index()).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Incoming arcs of a node, in creation order
    pub fn in_arcs(&self, node: NodeId) -> &[ArcId] {
        self.incoming.get(node.index()).map(Vec::as_slice).unwrap_or(&[])
    }

    /// `(source, target)` index pairs of every arc, in arc id order
    pub fn arc_index_pairs(&self) -> Vec<(usize, usize)> {
        self.arcs
            .iter()
            .map(|record| (record.source.index(), record.target.index()))
            .collect()
    }
}

impl Default for DigraphStore {
    fn default() -> Self {
        Self::new()
    }
}
