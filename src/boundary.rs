//! Handle-based embedding surface
//!
//! Hosts that cannot hold Rust references (scripting bindings, FFI shims) drive
//! the engine through a [`Session`]: every graph, node, arc, map and flow
//! computation is addressed by a small copyable handle, created and destroyed
//! explicitly. Misuse is reported as [`ApiError`] instead of aborting.
//!
//! Handles that denote an existing element (e.g. the endpoints of an arc) are
//! issued fresh on every query. They compare unequal to each other but resolve
//! to the same element, and each one has to be destroyed on its own.

use crate::flow::{FlowComputation, FlowError, SolverConfig};
use crate::graph::{ArcId, ArcValue, DigraphStore, DynArcMap, GraphError, NodeId, ValueKind};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

macro_rules! handle_type {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(u64);

        impl $name {
            const LABEL: &'static str = $label;

            pub fn from_raw(raw: u64) -> Self {
                $name(raw)
            }

            pub fn raw(&self) -> u64 {
                self.0
            }

            fn invalid(self) -> ApiError {
                ApiError::InvalidHandle {
                    kind: Self::LABEL,
                    raw: self.0,
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}#{}", Self::LABEL, self.0)
            }
        }
    };
}

handle_type!(
    /// Opaque graph handle
    GraphHandle,
    "graph"
);
handle_type!(
    /// Opaque node handle
    NodeHandle,
    "node"
);
handle_type!(
    /// Opaque arc handle
    ArcHandle,
    "arc"
);
handle_type!(
    /// Opaque arc map handle
    MapHandle,
    "map"
);
handle_type!(
    /// Opaque flow computation handle
    FlowHandle,
    "flow"
);

/// Errors reported across the boundary
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ApiError {
    #[error("Invalid {kind} handle {raw}")]
    InvalidHandle { kind: &'static str, raw: u64 },

    #[error("Unknown value kind tag {0}")]
    UnknownKind(u32),

    #[error("{0} is still referenced by a map or flow computation")]
    GraphInUse(GraphHandle),

    #[error("{element} does not belong to {graph}")]
    ForeignElement { element: String, graph: GraphHandle },

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    Flow(#[from] FlowError),
}

pub type ApiResult<T> = Result<T, ApiError>;

struct MapEntry {
    graph: GraphHandle,
    map: DynArcMap,
}

struct FlowEntry {
    graph: GraphHandle,
    engine: FlowComputation<Arc<DigraphStore>>,
}

/// Handle tables for every live object
///
/// Graphs are held behind `Arc` so flow computations can keep a reference to
/// them. Adding nodes or arcs needs exclusive access and therefore fails with
/// [`ApiError::GraphInUse`] while a flow computation is bound to the graph.
#[derive(Default)]
pub struct Session {
    next_handle: u64,
    graphs: FxHashMap<GraphHandle, Arc<DigraphStore>>,
    nodes: FxHashMap<NodeHandle, (GraphHandle, NodeId)>,
    arcs: FxHashMap<ArcHandle, (GraphHandle, ArcId)>,
    maps: FxHashMap<MapHandle, MapEntry>,
    flows: FxHashMap<FlowHandle, FlowEntry>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handles start at 1 so that 0 can serve as a null handle on the host side
    fn issue(&mut self) -> u64 {
        self.next_handle += 1;
        self.next_handle
    }

    /// Number of handles not yet destroyed, across all kinds
    pub fn live_handles(&self) -> usize {
        self.graphs.len() + self.nodes.len() + self.arcs.len() + self.maps.len() + self.flows.len()
    }

    // ---- graphs ----

    pub fn graph_create(&mut self) -> GraphHandle {
        let handle = GraphHandle(self.issue());
        self.graphs.insert(handle, Arc::new(DigraphStore::new()));
        debug!(%handle, "graph created");
        handle
    }

    /// Destroy a graph; its maps and flow computations must be destroyed first.
    /// Node and arc handles of the graph stay allocated but stop resolving.
    pub fn graph_destroy(&mut self, graph: GraphHandle) -> ApiResult<()> {
        if !self.graphs.contains_key(&graph) {
            return Err(graph.invalid());
        }
        let referenced = self.maps.values().any(|m| m.graph == graph)
            || self.flows.values().any(|f| f.graph == graph);
        if referenced {
            return Err(ApiError::GraphInUse(graph));
        }
        self.graphs.remove(&graph);
        debug!(%graph, "graph destroyed");
        Ok(())
    }

    fn graph(&self, graph: GraphHandle) -> ApiResult<&Arc<DigraphStore>> {
        self.graphs.get(&graph).ok_or_else(|| graph.invalid())
    }

    fn graph_mut(&mut self, graph: GraphHandle) -> ApiResult<&mut DigraphStore> {
        let store = self.graphs.get_mut(&graph).ok_or_else(|| graph.invalid())?;
        Arc::get_mut(store).ok_or(ApiError::GraphInUse(graph))
    }

    pub fn node_count(&self, graph: GraphHandle) -> ApiResult<usize> {
        Ok(self.graph(graph)?.node_count())
    }

    pub fn arc_count(&self, graph: GraphHandle) -> ApiResult<usize> {
        Ok(self.graph(graph)?.arc_count())
    }

    // ---- nodes and arcs ----

    pub fn node_add(&mut self, graph: GraphHandle) -> ApiResult<NodeHandle> {
        let node = self.graph_mut(graph)?.try_add_node()?;
        let handle = NodeHandle(self.issue());
        self.nodes.insert(handle, (graph, node));
        Ok(handle)
    }

    pub fn arc_add(
        &mut self,
        graph: GraphHandle,
        source: NodeHandle,
        target: NodeHandle,
    ) -> ApiResult<ArcHandle> {
        let source = self.node_in(graph, source)?;
        let target = self.node_in(graph, target)?;
        let arc = self.graph_mut(graph)?.try_add_arc(source, target)?;
        let handle = ArcHandle(self.issue());
        self.arcs.insert(handle, (graph, arc));
        Ok(handle)
    }

    /// Integer identity of the node, unique within its graph
    pub fn node_id(&self, node: NodeHandle) -> ApiResult<u32> {
        let (graph, id) = self.resolve_node(node)?;
        self.graph(graph)?;
        Ok(id.as_u32())
    }

    /// Integer identity of the arc, unique within its graph
    pub fn arc_id(&self, arc: ArcHandle) -> ApiResult<u32> {
        let (graph, id) = self.resolve_arc(arc)?;
        self.graph(graph)?;
        Ok(id.as_u32())
    }

    /// Fresh handle for the arc's source node
    pub fn arc_source(&mut self, arc: ArcHandle) -> ApiResult<NodeHandle> {
        let (graph, id) = self.resolve_arc(arc)?;
        let (source, _) = self.graph(graph)?.endpoints(id)?;
        let handle = NodeHandle(self.issue());
        self.nodes.insert(handle, (graph, source));
        Ok(handle)
    }

    /// Fresh handle for the arc's target node
    pub fn arc_target(&mut self, arc: ArcHandle) -> ApiResult<NodeHandle> {
        let (graph, id) = self.resolve_arc(arc)?;
        let (_, target) = self.graph(graph)?.endpoints(id)?;
        let handle = NodeHandle(self.issue());
        self.nodes.insert(handle, (graph, target));
        Ok(handle)
    }

    /// Release the handle only; the node stays in its graph
    pub fn node_destroy(&mut self, node: NodeHandle) -> ApiResult<()> {
        self.nodes.remove(&node).map(|_| ()).ok_or_else(|| node.invalid())
    }

    /// Release the handle only; the arc stays in its graph
    pub fn arc_destroy(&mut self, arc: ArcHandle) -> ApiResult<()> {
        self.arcs.remove(&arc).map(|_| ()).ok_or_else(|| arc.invalid())
    }

    fn resolve_node(&self, node: NodeHandle) -> ApiResult<(GraphHandle, NodeId)> {
        self.nodes.get(&node).copied().ok_or_else(|| node.invalid())
    }

    fn resolve_arc(&self, arc: ArcHandle) -> ApiResult<(GraphHandle, ArcId)> {
        self.arcs.get(&arc).copied().ok_or_else(|| arc.invalid())
    }

    fn node_in(&self, graph: GraphHandle, node: NodeHandle) -> ApiResult<NodeId> {
        match self.resolve_node(node)? {
            (owner, id) if owner == graph => Ok(id),
            _ => Err(ApiError::ForeignElement {
                element: node.to_string(),
                graph,
            }),
        }
    }

    fn arc_in(&self, graph: GraphHandle, arc: ArcHandle) -> ApiResult<ArcId> {
        match self.resolve_arc(arc)? {
            (owner, id) if owner == graph => Ok(id),
            _ => Err(ApiError::ForeignElement {
                element: arc.to_string(),
                graph,
            }),
        }
    }

    // ---- arc maps ----

    pub fn map_create(&mut self, graph: GraphHandle, kind: ValueKind) -> ApiResult<MapHandle> {
        let map = DynArcMap::new(self.graph(graph)?, kind);
        let handle = MapHandle(self.issue());
        self.maps.insert(handle, MapEntry { graph, map });
        debug!(%handle, %graph, %kind, "map created");
        Ok(handle)
    }

    /// [`Session::map_create`] with the kind given as its numeric tag
    pub fn map_create_tagged(&mut self, graph: GraphHandle, tag: u32) -> ApiResult<MapHandle> {
        let kind = ValueKind::from_tag(tag).ok_or(ApiError::UnknownKind(tag))?;
        self.map_create(graph, kind)
    }

    pub fn map_destroy(&mut self, map: MapHandle) -> ApiResult<()> {
        self.maps.remove(&map).map(|_| ()).ok_or_else(|| map.invalid())
    }

    pub fn map_kind(&self, map: MapHandle) -> ApiResult<ValueKind> {
        Ok(self.maps.get(&map).ok_or_else(|| map.invalid())?.map.kind())
    }

    /// Locate the map entry and the arc id it is addressed with, extending the
    /// map over arcs added since the last access
    fn map_slot(&mut self, map: MapHandle, arc: ArcHandle) -> ApiResult<(&mut DynArcMap, ArcId)> {
        let graph = self.maps.get(&map).ok_or_else(|| map.invalid())?.graph;
        let arc = self.arc_in(graph, arc)?;
        let store = Arc::clone(self.graph(graph)?);
        let entry = self.maps.get_mut(&map).ok_or_else(|| map.invalid())?;
        entry.map.sync_with(&store)?;
        Ok((&mut entry.map, arc))
    }

    /// Store a tagged value; its kind must equal the map's kind
    pub fn map_set(&mut self, map: MapHandle, arc: ArcHandle, value: ArcValue) -> ApiResult<()> {
        let (map, arc) = self.map_slot(map, arc)?;
        map.set(arc, value)?;
        Ok(())
    }

    /// Integer fast path; only valid on `int32` maps
    pub fn map_set_int(&mut self, map: MapHandle, arc: ArcHandle, value: i32) -> ApiResult<()> {
        let (map, arc) = self.map_slot(map, arc)?;
        map.set_int(arc, value)?;
        Ok(())
    }

    pub fn map_get(&mut self, map: MapHandle, arc: ArcHandle) -> ApiResult<ArcValue> {
        let (map, arc) = self.map_slot(map, arc)?;
        Ok(map.get(arc))
    }

    // ---- flow computations ----

    /// Snapshot `capacities` and bind a flow computation to its graph
    pub fn flow_create(
        &mut self,
        graph: GraphHandle,
        capacities: MapHandle,
        source: NodeHandle,
        sink: NodeHandle,
    ) -> ApiResult<FlowHandle> {
        self.flow_create_with(graph, capacities, source, sink, SolverConfig::default())
    }

    pub fn flow_create_with(
        &mut self,
        graph: GraphHandle,
        capacities: MapHandle,
        source: NodeHandle,
        sink: NodeHandle,
        config: SolverConfig,
    ) -> ApiResult<FlowHandle> {
        let store = Arc::clone(self.graph(graph)?);
        let entry = self.maps.get(&capacities).ok_or_else(|| capacities.invalid())?;
        if entry.graph != graph {
            return Err(ApiError::ForeignElement {
                element: capacities.to_string(),
                graph,
            });
        }
        let source = self.node_in(graph, source)?;
        let sink = self.node_in(graph, sink)?;

        let engine = FlowComputation::from_dyn(store, &entry.map, source, sink, config)?;
        let handle = FlowHandle(self.issue());
        self.flows.insert(handle, FlowEntry { graph, engine });
        Ok(handle)
    }

    pub fn flow_destroy(&mut self, flow: FlowHandle) -> ApiResult<()> {
        self.flows.remove(&flow).map(|_| ()).ok_or_else(|| flow.invalid())
    }

    /// Max flow value with the given arcs temporarily disabled
    pub fn flow_run(&mut self, flow: FlowHandle, disabled: &[ArcHandle]) -> ApiResult<i64> {
        let graph = self.flows.get(&flow).ok_or_else(|| flow.invalid())?.graph;
        let arcs = disabled
            .iter()
            .map(|&arc| self.arc_in(graph, arc))
            .collect::<ApiResult<Vec<ArcId>>>()?;
        let entry = self.flows.get_mut(&flow).ok_or_else(|| flow.invalid())?;
        Ok(entry.engine.run_scenario(&arcs)?)
    }

    pub fn flow_last_value(&self, flow: FlowHandle) -> ApiResult<i64> {
        let entry = self.flows.get(&flow).ok_or_else(|| flow.invalid())?;
        Ok(entry.engine.last_value().ok_or(FlowError::NotEvaluated)?)
    }

    /// -1, 0 or 1 as the last value is less than, equal to or greater than `x`
    pub fn flow_compare(&self, flow: FlowHandle, x: f64) -> ApiResult<i32> {
        let entry = self.flows.get(&flow).ok_or_else(|| flow.invalid())?;
        Ok(entry.engine.compare_last_value(x)? as i32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Path A -> B -> C with capacities 5 and 3 on an int32 map
    fn path_session() -> (Session, GraphHandle, MapHandle, [NodeHandle; 3], [ArcHandle; 2]) {
        let mut s = Session::new();
        let g = s.graph_create();
        let a = s.node_add(g).unwrap();
        let b = s.node_add(g).unwrap();
        let c = s.node_add(g).unwrap();
        let ab = s.arc_add(g, a, b).unwrap();
        let bc = s.arc_add(g, b, c).unwrap();
        let caps = s.map_create(g, ValueKind::Int32).unwrap();
        s.map_set_int(caps, ab, 5).unwrap();
        s.map_set_int(caps, bc, 3).unwrap();
        (s, g, caps, [a, b, c], [ab, bc])
    }

    #[test]
    fn test_handles_are_distinct_and_non_zero() {
        let (s, g, caps, nodes, arcs) = path_session();
        let mut raws = vec![g.raw(), caps.raw()];
        raws.extend(nodes.iter().map(|n| n.raw()));
        raws.extend(arcs.iter().map(|a| a.raw()));
        raws.sort_unstable();
        raws.dedup();
        assert_eq!(raws.len(), 7);
        assert!(!raws.contains(&0));
        assert_eq!(s.live_handles(), 7);
    }

    #[test]
    fn test_endpoint_queries_issue_fresh_handles() {
        let (mut s, _, _, [a, b, _], [ab, _]) = path_session();
        let src1 = s.arc_source(ab).unwrap();
        let src2 = s.arc_source(ab).unwrap();
        let tgt = s.arc_target(ab).unwrap();

        assert_ne!(src1, src2);
        assert_ne!(src1, a);
        assert_eq!(s.node_id(src1).unwrap(), s.node_id(a).unwrap());
        assert_eq!(s.node_id(src2).unwrap(), s.node_id(a).unwrap());
        assert_eq!(s.node_id(tgt).unwrap(), s.node_id(b).unwrap());

        let before = s.live_handles();
        s.node_destroy(src1).unwrap();
        s.node_destroy(src2).unwrap();
        s.node_destroy(tgt).unwrap();
        assert_eq!(s.live_handles(), before - 3);
        assert_eq!(s.node_id(a).unwrap(), 0);
    }

    #[test]
    fn test_flow_lifecycle() {
        let (mut s, g, caps, [a, _, c], [_, bc]) = path_session();
        let flow = s.flow_create(g, caps, a, c).unwrap();

        assert!(matches!(
            s.flow_last_value(flow),
            Err(ApiError::Flow(FlowError::NotEvaluated))
        ));
        assert_eq!(s.flow_run(flow, &[]).unwrap(), 3);
        assert_eq!(s.flow_run(flow, &[bc]).unwrap(), 0);
        assert_eq!(s.flow_last_value(flow).unwrap(), 0);
        assert_eq!(s.flow_run(flow, &[]).unwrap(), 3);

        assert_eq!(s.flow_compare(flow, 3.0).unwrap(), 0);
        assert_eq!(s.flow_compare(flow, 10.0).unwrap(), -1);
        assert_eq!(s.flow_compare(flow, -1.0).unwrap(), 1);

        // snapshot: later map writes are not observed
        s.map_set_int(caps, bc, 100).unwrap();
        assert_eq!(s.flow_run(flow, &[]).unwrap(), 3);

        s.flow_destroy(flow).unwrap();
        assert_eq!(
            s.flow_destroy(flow),
            Err(ApiError::InvalidHandle { kind: "flow", raw: flow.raw() })
        );
    }

    #[test]
    fn test_graph_destroy_order_enforced() {
        let (mut s, g, caps, [a, _, c], _) = path_session();
        let flow = s.flow_create(g, caps, a, c).unwrap();

        assert_eq!(s.graph_destroy(g), Err(ApiError::GraphInUse(g)));
        s.flow_destroy(flow).unwrap();
        assert_eq!(s.graph_destroy(g), Err(ApiError::GraphInUse(g)));
        s.map_destroy(caps).unwrap();
        s.graph_destroy(g).unwrap();

        assert!(matches!(s.graph_destroy(g), Err(ApiError::InvalidHandle { .. })));
        assert!(matches!(s.node_id(a), Err(ApiError::InvalidHandle { kind: "graph", .. })));
    }

    #[test]
    fn test_graph_frozen_while_flow_bound() {
        let (mut s, g, caps, [a, b, c], _) = path_session();
        let flow = s.flow_create(g, caps, a, c).unwrap();

        assert_eq!(s.node_add(g), Err(ApiError::GraphInUse(g)));
        assert_eq!(s.arc_add(g, a, b), Err(ApiError::GraphInUse(g)));

        s.flow_destroy(flow).unwrap();
        assert!(s.node_add(g).is_ok());
    }

    #[test]
    fn test_map_kinds_and_values() {
        let (mut s, g, _, _, [ab, bc]) = path_session();
        let floats = s.map_create_tagged(g, ValueKind::Float64.tag()).unwrap();
        assert_eq!(s.map_kind(floats).unwrap(), ValueKind::Float64);
        assert_eq!(s.map_create_tagged(g, 42), Err(ApiError::UnknownKind(42)));

        s.map_set(floats, ab, ArcValue::Float64(0.5)).unwrap();
        assert_eq!(s.map_get(floats, ab).unwrap(), ArcValue::Float64(0.5));
        assert_eq!(s.map_get(floats, bc).unwrap(), ArcValue::Float64(0.0));

        assert!(matches!(
            s.map_set(floats, ab, ArcValue::Int32(1)),
            Err(ApiError::Graph(GraphError::KindMismatch { .. }))
        ));
        assert!(matches!(
            s.map_set_int(floats, ab, 1),
            Err(ApiError::Graph(GraphError::KindMismatch { .. }))
        ));
    }

    #[test]
    fn test_map_extends_over_new_arcs() {
        let (mut s, g, caps, [a, _, c], _) = path_session();
        let ac = s.arc_add(g, a, c).unwrap();
        assert_eq!(s.map_get(caps, ac).unwrap(), ArcValue::Int32(0));

        s.map_set_int(caps, ac, 4).unwrap();
        let flow = s.flow_create(g, caps, a, c).unwrap();
        assert_eq!(s.flow_run(flow, &[]).unwrap(), 7);
    }

    #[test]
    fn test_foreign_elements_rejected() {
        let (mut s, g, caps, [a, _, c], [ab, _]) = path_session();
        let other = s.graph_create();
        let x = s.node_add(other).unwrap();
        let y = s.node_add(other).unwrap();
        let xy = s.arc_add(other, x, y).unwrap();

        assert!(matches!(s.arc_add(g, a, x), Err(ApiError::ForeignElement { .. })));
        assert!(matches!(s.map_set_int(caps, xy, 1), Err(ApiError::ForeignElement { .. })));
        assert!(matches!(s.flow_create(other, caps, x, y), Err(ApiError::ForeignElement { .. })));

        let flow = s.flow_create(g, caps, a, c).unwrap();
        assert!(matches!(s.flow_run(flow, &[ab, xy]), Err(ApiError::ForeignElement { .. })));
    }

    #[test]
    fn test_float_capacities_rejected() {
        let (mut s, g, _, [a, _, c], _) = path_session();
        let floats = s.map_create(g, ValueKind::Float32).unwrap();
        assert!(matches!(
            s.flow_create(g, floats, a, c),
            Err(ApiError::Flow(FlowError::Graph(GraphError::NotIntegerKind(ValueKind::Float32))))
        ));
        assert!(matches!(
            s.flow_create(g, floats, a, a),
            Err(ApiError::Flow(_))
        ));
    }
}
