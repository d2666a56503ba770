//! Shared residual-network layout for flow algorithms
//!
//! Provides a dense, integer-indexed view of a directed multigraph in which every
//! arc owns a pair of residual slots (forward and backward).

/// Dense node index (0..N)
pub type NodeIndex = usize;

/// Integer capacity / flow amount used by all solvers
pub type Capacity = i64;

/// A residual network laid out in Compressed Sparse Row (CSR) format.
///
/// Arc `i` of the input contributes a forward slot in the range of its source
/// node and a backward slot in the range of its target node. The two slots of a
/// pair point at each other through `mates`, so pushing along one slot credits
/// the other. Topology is immutable once built; capacities live with the solver.
#[derive(Debug, Clone)]
pub struct FlowNetwork {
    /// Number of nodes
    node_count: usize,
    /// Offsets into `heads`/`mates`. Size = node_count + 1
    offsets: Vec<usize>,
    /// Head node of every residual slot
    heads: Vec<NodeIndex>,
    /// Paired slot of every residual slot
    mates: Vec<usize>,
    /// Forward slot of every input arc, indexed by arc index
    arc_slots: Vec<usize>,
}

impl FlowNetwork {
    /// Build a residual network from `(source, target)` pairs, one per arc.
    ///
    /// Arc indices are positions in `arcs`. Endpoints must be `< node_count`.
    pub fn from_arcs(node_count: usize, arcs: &[(NodeIndex, NodeIndex)]) -> Self {
        let mut degree = vec![0usize; node_count];
        for &(u, v) in arcs {
            degree[u] += 1;
            degree[v] += 1;
        }

        let mut offsets = Vec::with_capacity(node_count + 1);
        offsets.push(0);
        for d in &degree {
            let last = *offsets.last().unwrap_or(&0);
            offsets.push(last + d);
        }

        let slot_count = arcs.len() * 2;
        let mut heads = vec![0; slot_count];
        let mut mates = vec![0; slot_count];
        let mut arc_slots = Vec::with_capacity(arcs.len());
        let mut cursor: Vec<usize> = offsets[..node_count].to_vec();

        for &(u, v) in arcs {
            let forward = cursor[u];
            cursor[u] += 1;
            let backward = cursor[v];
            cursor[v] += 1;

            heads[forward] = v;
            heads[backward] = u;
            mates[forward] = backward;
            mates[backward] = forward;
            arc_slots.push(forward);
        }

        FlowNetwork {
            node_count,
            offsets,
            heads,
            mates,
            arc_slots,
        }
    }

    pub fn node_count(&self) -> usize {
        self.node_count
    }

    pub fn arc_count(&self) -> usize {
        self.arc_slots.len()
    }

    /// Total number of residual slots (twice the arc count)
    pub fn slot_count(&self) -> usize {
        self.heads.len()
    }

    /// Residual slots incident to a node
    pub fn slots(&self, node: NodeIndex) -> std::ops::Range<usize> {
        self.offsets[node]..self.offsets[node + 1]
    }

    /// Head node of a residual slot
    pub fn head(&self, slot: usize) -> NodeIndex {
        self.heads[slot]
    }

    /// Reverse slot of a residual slot
    pub fn mate(&self, slot: usize) -> usize {
        self.mates[slot]
    }

    /// Forward slot of an input arc
    pub fn arc_slot(&self, arc: usize) -> usize {
        self.arc_slots[arc]
    }

    /// Residual capacities with every forward slot set to its arc capacity and
    /// every backward slot at zero.
    ///
    /// `capacities` is indexed by arc; missing trailing entries count as zero.
    pub fn load_residual(&self, capacities: &[Capacity], residual: &mut Vec<Capacity>) {
        residual.clear();
        residual.resize(self.slot_count(), 0);
        for (arc, &slot) in self.arc_slots.iter().enumerate() {
            residual[slot] = capacities.get(arc).copied().unwrap_or(0);
        }
    }
}
