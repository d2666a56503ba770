//! Network description files
//!
//! A network description names its nodes, lists capacitated arcs between
//! them, picks a source and a sink, and optionally carries failure scenarios
//! and solver settings. JSON and YAML are both accepted:
//!
//! ```yaml
//! nodes: [a, b, c]
//! arcs:
//!   - { from: a, to: b, capacity: 5, label: ab }
//!   - { from: b, to: c, capacity: 3 }
//! source: a
//! sink: c
//! scenarios:
//!   - { name: cut-ab, disabled: [ab] }
//!   - { disabled: [1] }
//! ```
//!
//! Disabled arcs are referenced by label or by arc index.

use crate::flow::{FlowComputation, FlowResult, ParallelConfig, SolverConfig};
use crate::graph::{ArcId, ArcMap, DigraphStore, NodeId};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

/// Errors raised while reading or resolving a network description
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Unsupported network file extension: {0}")]
    UnsupportedFormat(PathBuf),

    #[error("Node '{0}' is declared twice")]
    DuplicateNode(String),

    #[error("Arc label '{0}' is used twice")]
    DuplicateLabel(String),

    #[error("Unknown node '{0}'")]
    UnknownNode(String),

    #[error("Scenario '{scenario}' references unknown arc {arc}")]
    UnknownArc { scenario: String, arc: String },
}

pub type LoadResult<T> = Result<T, LoadError>;

/// One capacitated arc
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArcSpec {
    pub from: String,
    pub to: String,
    pub capacity: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// Arc reference inside a scenario: a label or a zero-based arc index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ArcRef {
    Index(usize),
    Label(String),
}

impl std::fmt::Display for ArcRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ArcRef::Index(i) => write!(f, "#{}", i),
            ArcRef::Label(label) => write!(f, "'{}'", label),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub disabled: Vec<ArcRef>,
}

/// Serialized form of a network
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkSpec {
    pub nodes: Vec<String>,
    pub arcs: Vec<ArcSpec>,
    pub source: String,
    pub sink: String,
    #[serde(default)]
    pub scenarios: Vec<ScenarioSpec>,
    #[serde(default)]
    pub solver: SolverConfig,
    #[serde(default)]
    pub parallel: ParallelConfig,
}

impl NetworkSpec {
    /// Read a description, choosing the parser from the file extension
    /// (`.json`, `.yaml` or `.yml`)
    pub fn from_path(path: impl AsRef<Path>) -> LoadResult<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json_str(&text),
            Some("yaml") | Some("yml") => Self::from_yaml_str(&text),
            _ => Err(LoadError::UnsupportedFormat(path.to_path_buf())),
        }
    }

    pub fn from_json_str(text: &str) -> LoadResult<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn from_yaml_str(text: &str) -> LoadResult<Self> {
        Ok(serde_yaml::from_str(text)?)
    }

    /// Build the graph and capacity map and resolve every name
    pub fn build(&self) -> LoadResult<Network> {
        let mut graph = DigraphStore::with_capacity(self.nodes.len(), self.arcs.len());
        let mut by_name: FxHashMap<&str, NodeId> = FxHashMap::default();
        for name in &self.nodes {
            let node = graph.add_node();
            if by_name.insert(name.as_str(), node).is_some() {
                return Err(LoadError::DuplicateNode(name.clone()));
            }
        }
        let lookup = |name: &str| {
            by_name
                .get(name)
                .copied()
                .ok_or_else(|| LoadError::UnknownNode(name.to_string()))
        };

        let mut arc_labels = Vec::with_capacity(self.arcs.len());
        let mut by_label: FxHashMap<&str, ArcId> = FxHashMap::default();
        let mut endpoints = Vec::with_capacity(self.arcs.len());
        for spec in &self.arcs {
            endpoints.push((lookup(&spec.from)?, lookup(&spec.to)?));
        }
        let mut capacities = ArcMap::new(&graph);
        for (spec, (from, to)) in self.arcs.iter().zip(endpoints) {
            let arc = graph.add_arc(from, to);
            capacities.set(arc, spec.capacity);
            match &spec.label {
                Some(label) => {
                    if by_label.insert(label.as_str(), arc).is_some() {
                        return Err(LoadError::DuplicateLabel(label.clone()));
                    }
                    arc_labels.push(label.clone());
                }
                None => arc_labels.push(format!("{}->{}", spec.from, spec.to)),
            }
        }

        let scenarios = self
            .scenarios
            .iter()
            .enumerate()
            .map(|(i, spec)| {
                let name = spec.name.clone().unwrap_or_else(|| format!("scenario-{}", i));
                let disabled = spec
                    .disabled
                    .iter()
                    .map(|r| {
                        let arc = match r {
                            ArcRef::Index(idx) if *idx < self.arcs.len() => Some(ArcId::new(*idx as u32)),
                            ArcRef::Index(_) => None,
                            ArcRef::Label(label) => by_label.get(label.as_str()).copied(),
                        };
                        arc.ok_or_else(|| LoadError::UnknownArc {
                            scenario: name.clone(),
                            arc: r.to_string(),
                        })
                    })
                    .collect::<LoadResult<Vec<ArcId>>>()?;
                Ok(Scenario { name, disabled })
            })
            .collect::<LoadResult<Vec<Scenario>>>()?;

        let source = lookup(&self.source)?;
        let sink = lookup(&self.sink)?;

        info!(
            nodes = graph.node_count(),
            arcs = graph.arc_count(),
            scenarios = scenarios.len(),
            "network loaded"
        );

        Ok(Network {
            graph,
            capacities,
            source,
            sink,
            node_names: self.nodes.clone(),
            arc_labels,
            scenarios,
            solver: self.solver,
            parallel: self.parallel.clone(),
        })
    }
}

/// Named set of arcs to disable together
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scenario {
    pub name: String,
    pub disabled: Vec<ArcId>,
}

/// A resolved network ready for evaluation
#[derive(Debug)]
pub struct Network {
    pub graph: DigraphStore,
    pub capacities: ArcMap<i64>,
    pub source: NodeId,
    pub sink: NodeId,
    pub node_names: Vec<String>,
    /// Arc label, or `from->to` for unlabeled arcs
    pub arc_labels: Vec<String>,
    pub scenarios: Vec<Scenario>,
    pub solver: SolverConfig,
    pub parallel: ParallelConfig,
}

impl Network {
    /// Load and build in one step
    pub fn load(path: impl AsRef<Path>) -> LoadResult<Self> {
        NetworkSpec::from_path(path)?.build()
    }

    /// Flow computation over this network with its solver settings
    pub fn engine(&self) -> FlowResult<FlowComputation<&DigraphStore>> {
        FlowComputation::with_config(
            &self.graph,
            &self.capacities,
            self.source,
            self.sink,
            self.solver,
        )
    }

    pub fn arc_label(&self, arc: ArcId) -> &str {
        self.arc_labels.get(arc.index()).map(String::as_str).unwrap_or("?")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DIAMOND_YAML: &str = r#"
nodes: [s, a, b, t]
arcs:
  - { from: s, to: a, capacity: 10, label: sa }
  - { from: s, to: b, capacity: 5, label: sb }
  - { from: a, to: t, capacity: 4 }
  - { from: b, to: t, capacity: 8 }
source: s
sink: t
scenarios:
  - { name: lose-sa, disabled: [sa] }
  - { disabled: [sb, 2] }
solver:
  gap_heuristic: false
"#;

    #[test]
    fn test_yaml_network() {
        let spec = NetworkSpec::from_yaml_str(DIAMOND_YAML).unwrap();
        assert!(!spec.solver.gap_heuristic);

        let network = spec.build().unwrap();
        assert_eq!(network.graph.node_count(), 4);
        assert_eq!(network.graph.arc_count(), 4);
        assert_eq!(network.arc_label(ArcId::new(0)), "sa");
        assert_eq!(network.arc_label(ArcId::new(2)), "a->t");
        assert_eq!(network.scenarios[0].name, "lose-sa");
        assert_eq!(network.scenarios[1].name, "scenario-1");
        assert_eq!(network.scenarios[1].disabled, vec![ArcId::new(1), ArcId::new(2)]);

        let mut engine = network.engine().unwrap();
        assert_eq!(engine.baseline().unwrap(), 9);
        assert_eq!(engine.run_scenario(&network.scenarios[0].disabled).unwrap(), 5);
        assert_eq!(engine.run_scenario(&network.scenarios[1].disabled).unwrap(), 0);
    }

    #[test]
    fn test_json_network() {
        let json = r#"{
            "nodes": ["x", "y"],
            "arcs": [{"from": "x", "to": "y", "capacity": 4},
                     {"from": "x", "to": "y", "capacity": 6}],
            "source": "x",
            "sink": "y"
        }"#;
        let network = NetworkSpec::from_json_str(json).unwrap().build().unwrap();
        assert!(network.scenarios.is_empty());
        assert_eq!(network.solver, SolverConfig::default());
        assert_eq!(network.engine().unwrap().baseline().unwrap(), 10);
    }

    #[test]
    fn test_resolution_errors() {
        let mut spec = NetworkSpec::from_yaml_str(DIAMOND_YAML).unwrap();
        spec.sink = "nowhere".to_string();
        assert!(matches!(spec.build(), Err(LoadError::UnknownNode(n)) if n == "nowhere"));

        let mut spec = NetworkSpec::from_yaml_str(DIAMOND_YAML).unwrap();
        spec.scenarios.push(ScenarioSpec {
            name: Some("bad".to_string()),
            disabled: vec![ArcRef::Index(4)],
        });
        assert!(matches!(spec.build(), Err(LoadError::UnknownArc { scenario, .. }) if scenario == "bad"));

        let mut spec = NetworkSpec::from_yaml_str(DIAMOND_YAML).unwrap();
        spec.nodes.push("a".to_string());
        assert!(matches!(spec.build(), Err(LoadError::DuplicateNode(_))));

        let mut spec = NetworkSpec::from_yaml_str(DIAMOND_YAML).unwrap();
        spec.arcs[1].label = Some("sa".to_string());
        assert!(matches!(spec.build(), Err(LoadError::DuplicateLabel(_))));
    }

    #[test]
    fn test_malformed_input() {
        assert!(matches!(NetworkSpec::from_json_str("{"), Err(LoadError::Json(_))));
        assert!(matches!(NetworkSpec::from_yaml_str("nodes: 3"), Err(LoadError::Yaml(_))));
    }
}
