//! Dense per-arc attribute storage
//!
//! An arc map is bound to one graph and one value kind. Values live in a dense
//! array indexed by arc id. The map does not borrow its graph, so the graph can
//! keep growing after the map is created: arcs the map has not seen yet read as
//! the kind's zero value, and writing to them (or calling
//! [`ArcMap::sync_with`]) extends the storage with zeros.

use super::store::{DigraphStore, GraphError, GraphResult};
use super::types::{ArcId, GraphTag};
use super::value::{ArcValue, MapValue, ValueKind};

/// Statically-typed arc map
#[derive(Debug, Clone, PartialEq)]
pub struct ArcMap<V: MapValue> {
    graph: GraphTag,
    values: Vec<V>,
}

impl<V: MapValue> ArcMap<V> {
    /// Create a map covering every current arc of `graph`, zero-initialized
    pub fn new(graph: &DigraphStore) -> Self {
        Self::filled(graph, V::default())
    }

    /// Create a map covering every current arc of `graph`, set to `value`
    pub fn filled(graph: &DigraphStore, value: V) -> Self {
        ArcMap {
            graph: graph.tag(),
            values: vec![value; graph.arc_count()],
        }
    }

    pub fn graph_tag(&self) -> GraphTag {
        self.graph
    }

    pub fn kind(&self) -> ValueKind {
        V::KIND
    }

    /// Number of arcs currently backed by storage
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Stored value, or the zero value for arcs added after the last extension
    pub fn get(&self, arc: ArcId) -> V {
        self.values.get(arc.index()).copied().unwrap_or_default()
    }

    /// Store a value, growing the storage up to `arc` if needed.
    ///
    /// `arc` must be an arc of the bound graph: storage grows to whatever id is
    /// passed. Use [`ArcMap::set_checked`] for ids of unknown origin.
    pub fn set(&mut self, arc: ArcId, value: V) {
        let idx = arc.index();
        if idx >= self.values.len() {
            self.values.resize(idx + 1, V::default());
        }
        self.values[idx] = value;
    }

    /// [`ArcMap::set`] after checking that `arc` exists in `graph`, the map's
    /// own graph
    pub fn set_checked(&mut self, graph: &DigraphStore, arc: ArcId, value: V) -> GraphResult<()> {
        self.check_graph(graph)?;
        if !graph.contains_arc(arc) {
            return Err(GraphError::ArcNotFound(arc));
        }
        self.set(arc, value);
        Ok(())
    }

    /// Overwrite every backed entry
    pub fn fill(&mut self, value: V) {
        self.values.fill(value);
    }

    /// Extend storage to cover every arc of `graph`
    pub fn sync_with(&mut self, graph: &DigraphStore) -> GraphResult<()> {
        self.check_graph(graph)?;
        if self.values.len() < graph.arc_count() {
            self.values.resize(graph.arc_count(), V::default());
        }
        Ok(())
    }

    pub fn check_graph(&self, graph: &DigraphStore) -> GraphResult<()> {
        if self.graph != graph.tag() {
            return Err(GraphError::ForeignMap {
                map: self.graph,
                graph: graph.tag(),
            });
        }
        Ok(())
    }

    /// Backed values in arc id order
    pub fn as_slice(&self) -> &[V] {
        &self.values
    }

    pub fn iter(&self) -> impl Iterator<Item = (ArcId, V)> + '_ {
        self.values
            .iter()
            .enumerate()
            .map(|(i, v)| (ArcId::new(i as u32), *v))
    }
}

/// Arc map whose value kind is chosen at runtime
#[derive(Debug, Clone, PartialEq)]
pub enum DynArcMap {
    Int32(ArcMap<i32>),
    UInt32(ArcMap<u32>),
    Int64(ArcMap<i64>),
    UInt64(ArcMap<u64>),
    Float32(ArcMap<f32>),
    Float64(ArcMap<f64>),
}

macro_rules! dispatch {
    ($map:expr, $inner:ident => $body:expr) => {
        match $map {
            DynArcMap::Int32($inner) => $body,
            DynArcMap::UInt32($inner) => $body,
            DynArcMap::Int64($inner) => $body,
            DynArcMap::UInt64($inner) => $body,
            DynArcMap::Float32($inner) => $body,
            DynArcMap::Float64($inner) => $body,
        }
    };
}

impl DynArcMap {
    pub fn new(graph: &DigraphStore, kind: ValueKind) -> Self {
        match kind {
            ValueKind::Int32 => DynArcMap::Int32(ArcMap::new(graph)),
            ValueKind::UInt32 => DynArcMap::UInt32(ArcMap::new(graph)),
            ValueKind::Int64 => DynArcMap::Int64(ArcMap::new(graph)),
            ValueKind::UInt64 => DynArcMap::UInt64(ArcMap::new(graph)),
            ValueKind::Float32 => DynArcMap::Float32(ArcMap::new(graph)),
            ValueKind::Float64 => DynArcMap::Float64(ArcMap::new(graph)),
        }
    }

    pub fn kind(&self) -> ValueKind {
        dispatch!(self, m => m.kind())
    }

    pub fn graph_tag(&self) -> GraphTag {
        dispatch!(self, m => m.graph_tag())
    }

    pub fn len(&self) -> usize {
        dispatch!(self, m => m.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, arc: ArcId) -> ArcValue {
        dispatch!(self, m => m.get(arc).into_value())
    }

    /// Store a tagged value; its kind must equal the map's kind
    pub fn set(&mut self, arc: ArcId, value: ArcValue) -> GraphResult<()> {
        let expected = self.kind();
        let mismatch = GraphError::KindMismatch {
            expected,
            found: value.kind(),
        };
        dispatch!(self, m => set_tagged(m, arc, value).ok_or(mismatch))
    }

    /// Fast path for the common `int32` capacity map
    pub fn set_int(&mut self, arc: ArcId, value: i32) -> GraphResult<()> {
        match self {
            DynArcMap::Int32(m) => {
                m.set(arc, value);
                Ok(())
            }
            other => Err(GraphError::KindMismatch {
                expected: other.kind(),
                found: ValueKind::Int32,
            }),
        }
    }

    pub fn sync_with(&mut self, graph: &DigraphStore) -> GraphResult<()> {
        dispatch!(self, m => m.sync_with(graph))
    }

    pub fn check_graph(&self, graph: &DigraphStore) -> GraphResult<()> {
        dispatch!(self, m => m.check_graph(graph))
    }
}

fn set_tagged<V: MapValue>(map: &mut ArcMap<V>, arc: ArcId, value: ArcValue) -> Option<()> {
    map.set(arc, V::from_value(value)?);
    Some(())
}

macro_rules! dyn_from {
    ($ty:ty, $variant:ident) => {
        impl From<ArcMap<$ty>> for DynArcMap {
            fn from(map: ArcMap<$ty>) -> Self {
                DynArcMap::$variant(map)
            }
        }
    };
}

dyn_from!(i32, Int32);
dyn_from!(u32, UInt32);
dyn_from!(i64, Int64);
dyn_from!(u64, UInt64);
dyn_from!(f32, Float32);
dyn_from!(f64, Float64);
