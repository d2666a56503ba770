//! Scenario evaluation over a fixed capacity snapshot
//!
//! A `FlowComputation` copies a capacity map once, binds a preflow solver to the
//! graph, and then answers any number of "what if these arcs fail" queries.
//! Each query zeroes the disabled arcs in a private overlay, recomputes the max
//! flow value from scratch, and writes the snapshot values back, so no query
//! leaves state behind for the next one.

use crate::graph::{ArcId, ArcMap, DigraphStore, DynArcMap, GraphError, MapValue, NodeId};
use arcflow_algorithms::{FlowNetwork, Preflow, SolverConfig, SolverStats};
use std::cmp::Ordering;
use std::ops::Deref;
use thiserror::Error;
use tracing::{debug, info};

/// Errors raised while building or querying a flow computation
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FlowError {
    #[error("Terminal {0} is not a node of the graph")]
    InvalidTerminal(NodeId),

    #[error("Source and sink are the same node {0}")]
    SourceIsSink(NodeId),

    #[error("Arc {0} is not covered by this flow computation")]
    UnknownArc(ArcId),

    #[error("Negative capacity {value} on arc {arc}")]
    NegativeCapacity { arc: ArcId, value: i64 },

    #[error("Capacity on arc {0} does not fit in i64")]
    CapacityOutOfRange(ArcId),

    #[error("Sum of capacities does not fit in i64")]
    CapacityOverflow,

    #[error("No scenario has been evaluated yet")]
    NotEvaluated,

    #[error("Flow value cannot be compared with {0}")]
    Incomparable(f64),

    #[error("Thread pool error: {0}")]
    ThreadPool(String),

    #[error(transparent)]
    Graph(#[from] GraphError),
}

pub type FlowResult<T> = Result<T, FlowError>;

/// Integer kinds accepted as capacities
pub trait IntegerCapacity: MapValue {
    /// Widen to the solver's capacity type; `None` if the value does not fit
    fn to_capacity(self) -> Option<i64>;
}

impl IntegerCapacity for i32 {
    fn to_capacity(self) -> Option<i64> {
        Some(self as i64)
    }
}

impl IntegerCapacity for u32 {
    fn to_capacity(self) -> Option<i64> {
        Some(self as i64)
    }
}

impl IntegerCapacity for i64 {
    fn to_capacity(self) -> Option<i64> {
        Some(self)
    }
}

impl IntegerCapacity for u64 {
    fn to_capacity(self) -> Option<i64> {
        i64::try_from(self).ok()
    }
}

/// Max-flow engine for repeated arc-failure scenarios.
///
/// `G` is how the engine refers to its graph: `&DigraphStore` for plain Rust
/// callers, or a shared pointer such as `Arc<DigraphStore>` when the engine must
/// be stored next to the graph. Either way the graph cannot be mutated while
/// the engine holds it.
#[derive(Debug, Clone)]
pub struct FlowComputation<G: Deref<Target = DigraphStore>> {
    graph: G,
    source: NodeId,
    sink: NodeId,
    /// Capacities copied at construction; never changes
    snapshot: Box<[i64]>,
    /// Working capacities handed to the solver
    overlay: ArcMap<i64>,
    solver: Preflow,
    last_value: Option<i64>,
}

impl<G: Deref<Target = DigraphStore>> FlowComputation<G> {
    /// Bind an engine with the default solver configuration
    pub fn new<C: IntegerCapacity>(
        graph: G,
        capacities: &ArcMap<C>,
        source: NodeId,
        sink: NodeId,
    ) -> FlowResult<Self> {
        Self::with_config(graph, capacities, source, sink, SolverConfig::default())
    }

    pub fn with_config<C: IntegerCapacity>(
        graph: G,
        capacities: &ArcMap<C>,
        source: NodeId,
        sink: NodeId,
        config: SolverConfig,
    ) -> FlowResult<Self> {
        capacities.check_graph(&graph)?;
        let snapshot = graph
            .arcs()
            .map(|arc| {
                capacities
                    .get(arc)
                    .to_capacity()
                    .ok_or(FlowError::CapacityOutOfRange(arc))
            })
            .collect::<FlowResult<Vec<i64>>>()?;
        Self::from_snapshot(graph, snapshot, source, sink, config)
    }

    /// Bind an engine to a dynamically-typed map; the map must hold an integer
    /// kind, and values that do not fit `i64` fail the same way as in [`Self::with_config`]
    pub fn from_dyn(
        graph: G,
        capacities: &DynArcMap,
        source: NodeId,
        sink: NodeId,
        config: SolverConfig,
    ) -> FlowResult<Self> {
        capacities.check_graph(&graph)?;
        let kind = capacities.kind();
        if !kind.is_integer() {
            return Err(GraphError::NotIntegerKind(kind).into());
        }
        let snapshot = graph
            .arcs()
            .map(|arc| {
                capacities
                    .get(arc)
                    .as_i64()
                    .ok_or(FlowError::CapacityOutOfRange(arc))
            })
            .collect::<FlowResult<Vec<i64>>>()?;
        Self::from_snapshot(graph, snapshot, source, sink, config)
    }

    fn from_snapshot(
        graph: G,
        snapshot: Vec<i64>,
        source: NodeId,
        sink: NodeId,
        config: SolverConfig,
    ) -> FlowResult<Self> {
        for terminal in [source, sink] {
            if !graph.contains_node(terminal) {
                return Err(FlowError::InvalidTerminal(terminal));
            }
        }
        if source == sink {
            return Err(FlowError::SourceIsSink(source));
        }
        if let Some((i, &value)) = snapshot.iter().enumerate().find(|&(_, &c)| c < 0) {
            return Err(FlowError::NegativeCapacity {
                arc: ArcId::new(i as u32),
                value,
            });
        }
        snapshot
            .iter()
            .try_fold(0i64, |acc, &c| acc.checked_add(c))
            .ok_or(FlowError::CapacityOverflow)?;

        let network = FlowNetwork::from_arcs(graph.node_count(), &graph.arc_index_pairs());
        let solver = Preflow::new(network, source.index(), sink.index(), config);

        let mut overlay = ArcMap::new(&graph);
        for (i, &c) in snapshot.iter().enumerate() {
            overlay.set(ArcId::new(i as u32), c);
        }

        info!(
            nodes = graph.node_count(),
            arcs = graph.arc_count(),
            source = source.as_u32(),
            sink = sink.as_u32(),
            "flow computation bound"
        );

        Ok(FlowComputation {
            graph,
            source,
            sink,
            snapshot: snapshot.into_boxed_slice(),
            overlay,
            solver,
            last_value: None,
        })
    }

    /// Max flow value with every arc in `disabled` temporarily at zero capacity.
    ///
    /// Duplicates in `disabled` are harmless. The overlay equals the snapshot
    /// again when this returns, whether it succeeds or not.
    pub fn run_scenario(&mut self, disabled: &[ArcId]) -> FlowResult<i64> {
        if let Some(&arc) = disabled.iter().find(|arc| arc.index() >= self.snapshot.len()) {
            return Err(FlowError::UnknownArc(arc));
        }

        for &arc in disabled {
            self.overlay.set(arc, 0);
        }

        // the solver state depends on the whole assignment, so start over
        self.solver.init(self.overlay.as_slice());
        self.solver.run_first_phase();
        let value = self.solver.flow_value();
        self.last_value = Some(value);

        for &arc in disabled {
            self.overlay.set(arc, self.snapshot[arc.index()]);
        }

        debug!(disabled = disabled.len(), value, "scenario evaluated");
        Ok(value)
    }

    /// Max flow value with no arc disabled
    pub fn baseline(&mut self) -> FlowResult<i64> {
        self.run_scenario(&[])
    }

    /// Value of the most recent scenario
    pub fn last_value(&self) -> Option<i64> {
        self.last_value
    }

    /// Exact comparison of the last value against `x`: `Less` when the last
    /// value is smaller than `x`, and so on. No tolerance is applied and the
    /// integer value is never rounded to `f64`.
    pub fn compare_last_value(&self, x: f64) -> FlowResult<Ordering> {
        let last = self.last_value.ok_or(FlowError::NotEvaluated)?;
        compare_exact(last, x).ok_or(FlowError::Incomparable(x))
    }

    pub fn graph(&self) -> &DigraphStore {
        &self.graph
    }

    pub fn source(&self) -> NodeId {
        self.source
    }

    pub fn sink(&self) -> NodeId {
        self.sink
    }

    /// Number of arcs covered by the snapshot
    pub fn arc_count(&self) -> usize {
        self.snapshot.len()
    }

    pub fn config(&self) -> &SolverConfig {
        self.solver.config()
    }

    /// Solver counters of the most recent scenario
    pub fn stats(&self) -> SolverStats {
        self.solver.stats()
    }

    pub fn snapshot_capacity(&self, arc: ArcId) -> Option<i64> {
        self.snapshot.get(arc.index()).copied()
    }

    pub fn overlay_capacity(&self, arc: ArcId) -> Option<i64> {
        (arc.index() < self.snapshot.len()).then(|| self.overlay.get(arc))
    }

    /// True when no scenario has left a trace in the overlay
    pub fn overlay_matches_snapshot(&self) -> bool {
        self.overlay.as_slice() == &*self.snapshot
    }
}

/// Compare an integer with a float without losing precision on either side;
/// `None` for NaN
fn compare_exact(value: i64, x: f64) -> Option<Ordering> {
    // 2^63, exactly representable
    const I64_BOUND: f64 = 9_223_372_036_854_775_808.0;

    if x.is_nan() {
        return None;
    }
    if x >= I64_BOUND {
        return Some(Ordering::Less);
    }
    if x < -I64_BOUND {
        return Some(Ordering::Greater);
    }

    // in [-2^63, 2^63) the integral part converts to i64 exactly
    let whole = x.trunc();
    match value.cmp(&(whole as i64)) {
        Ordering::Equal => 0.0_f64.partial_cmp(&(x - whole)),
        other => Some(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A -> B (5), B -> C (3)
    fn path_graph() -> (DigraphStore, ArcMap<i32>, [NodeId; 3], [ArcId; 2]) {
        let mut g = DigraphStore::new();
        let a = g.add_node();
        let b = g.add_node();
        let c = g.add_node();
        let ab = g.add_arc(a, b);
        let bc = g.add_arc(b, c);
        let mut caps = ArcMap::new(&g);
        caps.set(ab, 5);
        caps.set(bc, 3);
        (g, caps, [a, b, c], [ab, bc])
    }

    #[test]
    fn test_path_scenarios() {
        let (g, caps, [a, _, c], [_, bc]) = path_graph();
        let mut flow = FlowComputation::new(&g, &caps, a, c).unwrap();

        assert_eq!(flow.last_value(), None);
        assert_eq!(flow.run_scenario(&[]).unwrap(), 3);
        assert_eq!(flow.run_scenario(&[bc]).unwrap(), 0);
        assert_eq!(flow.last_value(), Some(0));
        assert_eq!(flow.run_scenario(&[]).unwrap(), 3);
        assert!(flow.overlay_matches_snapshot());
    }

    #[test]
    fn test_snapshot_is_isolated_from_original_map() {
        let (g, mut caps, [a, _, c], [ab, bc]) = path_graph();
        let mut flow = FlowComputation::new(&g, &caps, a, c).unwrap();

        caps.set(bc, 100);
        caps.set(ab, 100);
        assert_eq!(flow.baseline().unwrap(), 3);
        assert_eq!(flow.snapshot_capacity(bc), Some(3));
    }

    #[test]
    fn test_duplicates_in_disabled_set() {
        let (g, caps, [a, _, c], [ab, bc]) = path_graph();
        let mut flow = FlowComputation::new(&g, &caps, a, c).unwrap();

        assert_eq!(flow.run_scenario(&[ab, ab, ab]).unwrap(), 0);
        assert!(flow.overlay_matches_snapshot());
        assert_eq!(flow.overlay_capacity(ab), Some(5));
        assert_eq!(flow.overlay_capacity(bc), Some(3));
    }

    #[test]
    fn test_unknown_arc_leaves_overlay_untouched() {
        let (g, caps, [a, _, c], [ab, _]) = path_graph();
        let mut flow = FlowComputation::new(&g, &caps, a, c).unwrap();

        let err = flow.run_scenario(&[ab, ArcId::new(17)]).unwrap_err();
        assert_eq!(err, FlowError::UnknownArc(ArcId::new(17)));
        assert!(flow.overlay_matches_snapshot());
        assert_eq!(flow.last_value(), None);
    }

    #[test]
    fn test_compare_last_value() {
        let (g, caps, [a, _, c], _) = path_graph();
        let mut flow = FlowComputation::new(&g, &caps, a, c).unwrap();

        assert_eq!(flow.compare_last_value(3.0), Err(FlowError::NotEvaluated));
        flow.baseline().unwrap();
        assert_eq!(flow.compare_last_value(3.0), Ok(Ordering::Equal));
        assert_eq!(flow.compare_last_value(4.0), Ok(Ordering::Less));
        assert_eq!(flow.compare_last_value(2.5), Ok(Ordering::Greater));
        assert!(matches!(flow.compare_last_value(f64::NAN), Err(FlowError::Incomparable(_))));
    }

    #[test]
    fn test_invalid_terminals() {
        let (g, caps, [a, _, _], _) = path_graph();
        assert_eq!(
            FlowComputation::new(&g, &caps, a, NodeId::new(9)).unwrap_err(),
            FlowError::InvalidTerminal(NodeId::new(9))
        );
        assert_eq!(
            FlowComputation::new(&g, &caps, a, a).unwrap_err(),
            FlowError::SourceIsSink(a)
        );
    }

    #[test]
    fn test_negative_capacity_rejected() {
        let (g, mut caps, [a, _, c], [_, bc]) = path_graph();
        caps.set(bc, -1);
        assert_eq!(
            FlowComputation::new(&g, &caps, a, c).unwrap_err(),
            FlowError::NegativeCapacity { arc: bc, value: -1 }
        );
    }

    #[test]
    fn test_capacity_range_checks() {
        let mut g = DigraphStore::new();
        let a = g.add_node();
        let b = g.add_node();
        let first = g.add_arc(a, b);
        let second = g.add_arc(a, b);

        let mut caps: ArcMap<u64> = ArcMap::new(&g);
        caps.set(first, u64::MAX);
        assert_eq!(
            FlowComputation::new(&g, &caps, a, b).unwrap_err(),
            FlowError::CapacityOutOfRange(first)
        );

        caps.set(first, i64::MAX as u64);
        caps.set(second, 1);
        assert_eq!(
            FlowComputation::new(&g, &caps, a, b).unwrap_err(),
            FlowError::CapacityOverflow
        );
    }

    #[test]
    fn test_foreign_map_rejected() {
        let (g, _, [a, _, c], _) = path_graph();
        let (other, other_caps, _, _) = path_graph();
        drop(other);
        assert!(matches!(
            FlowComputation::new(&g, &other_caps, a, c),
            Err(FlowError::Graph(GraphError::ForeignMap { .. }))
        ));
    }

    #[test]
    fn test_from_dyn_map() {
        let (g, _, [a, _, c], [ab, bc]) = path_graph();
        let mut caps = DynArcMap::new(&g, crate::graph::ValueKind::UInt32);
        caps.set(ab, 7u32.into()).unwrap();
        caps.set(bc, 4u32.into()).unwrap();

        let mut flow = FlowComputation::from_dyn(&g, &caps, a, c, SolverConfig::default()).unwrap();
        assert_eq!(flow.baseline().unwrap(), 4);

        let floats = DynArcMap::new(&g, crate::graph::ValueKind::Float64);
        assert!(matches!(
            FlowComputation::from_dyn(&g, &floats, a, c, SolverConfig::default()),
            Err(FlowError::Graph(GraphError::NotIntegerKind(_)))
        ));
    }

    #[test]
    fn test_dyn_and_typed_maps_agree_on_out_of_range_capacity() {
        let mut g = DigraphStore::new();
        let a = g.add_node();
        let b = g.add_node();
        let arc = g.add_arc(a, b);

        let mut typed: ArcMap<u64> = ArcMap::new(&g);
        typed.set(arc, u64::MAX);
        let mut dynamic = DynArcMap::new(&g, crate::graph::ValueKind::UInt64);
        dynamic.set(arc, u64::MAX.into()).unwrap();

        let from_typed = FlowComputation::new(&g, &typed, a, b).unwrap_err();
        let from_dynamic = FlowComputation::from_dyn(&g, &dynamic, a, b, SolverConfig::default()).unwrap_err();
        assert_eq!(from_typed, FlowError::CapacityOutOfRange(arc));
        assert_eq!(from_dynamic, from_typed);
    }

    #[test]
    fn test_compare_is_exact_beyond_f64_precision() {
        // 2^53 + 1 has no f64 representation
        let mut g = DigraphStore::new();
        let a = g.add_node();
        let b = g.add_node();
        let big = g.add_arc(a, b);
        let one = g.add_arc(a, b);
        let mut caps: ArcMap<i64> = ArcMap::new(&g);
        caps.set(big, 1 << 53);
        caps.set(one, 1);

        let mut flow = FlowComputation::new(&g, &caps, a, b).unwrap();
        assert_eq!(flow.baseline().unwrap(), 9_007_199_254_740_993);
        assert_eq!(flow.compare_last_value(9_007_199_254_740_992.0), Ok(Ordering::Greater));
        assert_eq!(flow.compare_last_value(9_007_199_254_740_994.0), Ok(Ordering::Less));

        assert_eq!(flow.run_scenario(&[one]).unwrap(), 1 << 53);
        assert_eq!(flow.compare_last_value(9_007_199_254_740_992.0), Ok(Ordering::Equal));
    }

    #[test]
    fn test_compare_exact_edges() {
        assert_eq!(compare_exact(3, 3.0), Some(Ordering::Equal));
        assert_eq!(compare_exact(3, 3.5), Some(Ordering::Less));
        assert_eq!(compare_exact(3, 2.999), Some(Ordering::Greater));
        assert_eq!(compare_exact(-2, -2.5), Some(Ordering::Greater));
        assert_eq!(compare_exact(-2, -1.5), Some(Ordering::Less));
        assert_eq!(compare_exact(0, -0.0), Some(Ordering::Equal));
        assert_eq!(compare_exact(i64::MAX, 9_223_372_036_854_775_808.0), Some(Ordering::Less));
        assert_eq!(compare_exact(i64::MAX, 9_223_372_036_854_774_784.0), Some(Ordering::Greater));
        assert_eq!(compare_exact(i64::MIN, -9_223_372_036_854_775_808.0), Some(Ordering::Equal));
        assert_eq!(compare_exact(i64::MIN, -1e19), Some(Ordering::Greater));
        assert_eq!(compare_exact(0, f64::INFINITY), Some(Ordering::Less));
        assert_eq!(compare_exact(0, f64::NEG_INFINITY), Some(Ordering::Greater));
        assert_eq!(compare_exact(0, f64::NAN), None);
    }

    #[test]
    fn test_arcs_added_after_map_read_as_zero() {
        let mut g = DigraphStore::new();
        let a = g.add_node();
        let b = g.add_node();
        let first = g.add_arc(a, b);
        let mut caps: ArcMap<i32> = ArcMap::new(&g);
        caps.set(first, 2);
        g.add_arc(a, b);

        let mut flow = FlowComputation::new(&g, &caps, a, b).unwrap();
        assert_eq!(flow.arc_count(), 2);
        assert_eq!(flow.baseline().unwrap(), 2);
    }

    #[test]
    fn test_shared_graph_pointer() {
        let (g, caps, [a, _, c], [ab, _]) = path_graph();
        let shared = std::sync::Arc::new(g);
        let mut flow = FlowComputation::new(std::sync::Arc::clone(&shared), &caps, a, c).unwrap();
        assert_eq!(flow.run_scenario(&[ab]).unwrap(), 0);
        assert_eq!(flow.graph().arc_count(), 2);
    }
}
