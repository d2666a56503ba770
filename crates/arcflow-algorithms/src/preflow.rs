//! Preflow-push maximum flow
//!
//! Highest-label push-relabel with gap detection and periodic global relabeling.
//! Only the first phase is implemented: it yields a maximum preflow, whose excess
//! at the sink equals the maximum flow value. Converting the preflow into a
//! feasible flow assignment (the second phase) is never needed here.

use super::common::{Capacity, FlowNetwork, NodeIndex};
use std::collections::VecDeque;
use tracing::trace;

/// Tuning knobs for the preflow solver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SolverConfig {
    /// Relabel operations between two global relabels. 0 = node count.
    pub global_relabel_frequency: usize,
    /// Lift every node above an emptied label to "unreachable"
    pub gap_heuristic: bool,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            global_relabel_frequency: 0,
            gap_heuristic: true,
        }
    }
}

/// Operation counters of the most recent run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SolverStats {
    pub pushes: u64,
    pub relabels: u64,
    pub global_relabels: u64,
}

/// Reusable preflow-push solver bound to one network and one terminal pair.
///
/// Call [`Preflow::init`] with a full capacity assignment, then
/// [`Preflow::run_first_phase`], then read [`Preflow::flow_value`]. All buffers
/// are allocated once in [`Preflow::new`] and reused by every subsequent run.
#[derive(Debug, Clone)]
pub struct Preflow {
    network: FlowNetwork,
    source: NodeIndex,
    sink: NodeIndex,
    config: SolverConfig,

    /// Residual capacity per slot
    residual: Vec<Capacity>,
    /// Excess per node
    excess: Vec<Capacity>,
    /// Distance labels; `node_count` marks nodes cut off from the sink
    labels: Vec<usize>,
    /// Current-arc pointer per node (slot index)
    current: Vec<usize>,
    /// Number of nodes carrying each label below `node_count`
    label_count: Vec<usize>,
    /// Active nodes bucketed by label
    buckets: Vec<Vec<NodeIndex>>,
    highest: usize,
    /// Relabels since the last global relabel
    work: usize,
    stats: SolverStats,
    initialized: bool,
}

impl Preflow {
    /// Bind a solver to a network and a terminal pair.
    ///
    /// # Panics
    ///
    /// Panics if either terminal is out of range or `source == sink`.
    pub fn new(network: FlowNetwork, source: NodeIndex, sink: NodeIndex, config: SolverConfig) -> Self {
        let n = network.node_count();
        assert!(source < n && sink < n, "terminal out of range for {} nodes", n);
        assert_ne!(source, sink, "source and sink must differ");

        let slot_count = network.slot_count();
        Preflow {
            network,
            source,
            sink,
            config,
            residual: Vec::with_capacity(slot_count),
            excess: vec![0; n],
            labels: vec![n; n],
            current: vec![0; n],
            label_count: vec![0; n],
            buckets: vec![Vec::new(); n],
            highest: 0,
            work: 0,
            stats: SolverStats::default(),
            initialized: false,
        }
    }

    pub fn network(&self) -> &FlowNetwork {
        &self.network
    }

    pub fn source(&self) -> NodeIndex {
        self.source
    }

    pub fn sink(&self) -> NodeIndex {
        self.sink
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    pub fn stats(&self) -> SolverStats {
        self.stats
    }

    /// Reset every piece of solver state from a capacity assignment (indexed by
    /// arc) and saturate the arcs leaving the source.
    pub fn init(&mut self, capacities: &[Capacity]) {
        self.network.load_residual(capacities, &mut self.residual);
        self.excess.fill(0);
        self.stats = SolverStats::default();
        self.work = 0;

        self.global_relabel();

        let source = self.source;
        for slot in self.network.slots(source) {
            let amount = self.residual[slot];
            let target = self.network.head(slot);
            if amount <= 0 || target == source {
                continue;
            }
            let mate = self.network.mate(slot);
            self.residual[slot] = 0;
            self.residual[mate] += amount;
            self.excess[target] += amount;
            self.excess[source] -= amount;
        }

        self.rebuild_buckets();
        self.initialized = true;
    }

    /// Compute a maximum preflow. Afterwards the sink holds the maximum flow value.
    pub fn run_first_phase(&mut self) {
        debug_assert!(self.initialized, "init must precede run_first_phase");
        let n = self.network.node_count();
        let frequency = match self.config.global_relabel_frequency {
            0 => n.max(1),
            f => f,
        };

        while let Some(node) = self.pop_active() {
            self.discharge(node);
            if self.work >= frequency {
                self.global_relabel();
                self.rebuild_buckets();
            }
        }

        trace!(
            pushes = self.stats.pushes,
            relabels = self.stats.relabels,
            global_relabels = self.stats.global_relabels,
            value = self.flow_value(),
            "preflow first phase finished"
        );
    }

    /// Excess accumulated at the sink
    pub fn flow_value(&self) -> Capacity {
        self.excess[self.sink]
    }

    /// Convenience: `init` + `run_first_phase` + `flow_value`
    pub fn max_flow_value(&mut self, capacities: &[Capacity]) -> Capacity {
        self.init(capacities);
        self.run_first_phase();
        self.flow_value()
    }

    fn pop_active(&mut self) -> Option<NodeIndex> {
        let n = self.network.node_count();
        loop {
            if let Some(node) = self.buckets[self.highest].pop() {
                // entries go stale after gaps and relabels
                if self.labels[node] == self.highest && self.labels[node] < n && self.excess[node] > 0 {
                    return Some(node);
                }
                continue;
            }
            if self.highest == 0 {
                return None;
            }
            self.highest -= 1;
        }
    }

    fn activate(&mut self, node: NodeIndex) {
        let label = self.labels[node];
        self.buckets[label].push(node);
        if label > self.highest {
            self.highest = label;
        }
    }

    fn discharge(&mut self, node: NodeIndex) {
        let n = self.network.node_count();
        while self.excess[node] > 0 {
            let slot = self.current[node];
            if slot == self.network.slots(node).end {
                self.relabel(node);
                if self.labels[node] >= n {
                    break;
                }
                continue;
            }

            let target = self.network.head(slot);
            let residual = self.residual[slot];
            if residual > 0 && self.labels[node] == self.labels[target] + 1 {
                let delta = self.excess[node].min(residual);
                let mate = self.network.mate(slot);
                self.residual[slot] -= delta;
                self.residual[mate] += delta;
                self.excess[node] -= delta;

                let was_idle = self.excess[target] == 0;
                self.excess[target] += delta;
                self.stats.pushes += 1;

                if was_idle && target != self.sink {
                    self.activate(target);
                }
            } else {
                self.current[node] += 1;
            }
        }
    }

    fn relabel(&mut self, node: NodeIndex) {
        let n = self.network.node_count();
        let old = self.labels[node];

        let mut lowest = n;
        for slot in self.network.slots(node) {
            let other = self.network.head(slot);
            if other != node && self.residual[slot] > 0 {
                lowest = lowest.min(self.labels[other]);
            }
        }
        let new = if lowest >= n { n } else { lowest + 1 };

        self.stats.relabels += 1;
        self.work += 1;
        self.label_count[old] -= 1;

        if self.config.gap_heuristic && self.label_count[old] == 0 {
            // nothing above an empty label can reach the sink any more
            for other in 0..n {
                let label = self.labels[other];
                if label > old && label < n {
                    self.label_count[label] -= 1;
                    self.labels[other] = n;
                }
            }
            self.labels[node] = n;
        } else {
            self.labels[node] = new;
            if new < n {
                self.label_count[new] += 1;
            }
        }

        self.current[node] = self.network.slots(node).start;
    }

    /// Exact distance labels by reverse BFS from the sink over the residual network
    fn global_relabel(&mut self) {
        let n = self.network.node_count();
        self.labels.fill(n);
        self.labels[self.sink] = 0;

        let mut queue = VecDeque::with_capacity(n);
        queue.push_back(self.sink);

        while let Some(node) = queue.pop_front() {
            let next = self.labels[node] + 1;
            for slot in self.network.slots(node) {
                let other = self.network.head(slot);
                if other == self.source || self.labels[other] != n {
                    continue;
                }
                // slot `mate` runs other -> node
                if self.residual[self.network.mate(slot)] > 0 {
                    self.labels[other] = next;
                    queue.push_back(other);
                }
            }
        }

        self.label_count.fill(0);
        for node in 0..n {
            let label = self.labels[node];
            if label < n {
                self.label_count[label] += 1;
            }
            self.current[node] = self.network.slots(node).start;
        }

        self.work = 0;
        self.stats.global_relabels += 1;
    }

    fn rebuild_buckets(&mut self) {
        let n = self.network.node_count();
        for bucket in &mut self.buckets {
            bucket.clear();
        }
        self.highest = 0;
        for node in 0..n {
            if node != self.source && node != self.sink && self.excess[node] > 0 && self.labels[node] < n {
                self.activate(node);
            }
        }
    }
}
