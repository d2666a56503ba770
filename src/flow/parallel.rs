//! Parallel scenario evaluation
//!
//! One engine cannot evaluate scenarios concurrently, since its overlay is
//! plain mutable state. Throughput comes from cloning a prototype engine once
//! per rayon worker instead; every clone owns its overlay and solver and only
//! shares the read-only graph.

use super::computation::{FlowComputation, FlowError, FlowResult};
use super::sweep::ArcImpact;
use crate::graph::{ArcId, DigraphStore};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::ops::Deref;
use tracing::debug;

/// Configuration for batch evaluation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParallelConfig {
    /// Worker threads (None = rayon's global pool)
    pub workers: Option<usize>,
}

/// Evaluate every scenario on per-worker clones of `prototype`.
///
/// Results are returned in scenario order. The prototype itself is not run.
pub fn evaluate_scenarios_parallel<G, S>(
    prototype: &FlowComputation<G>,
    scenarios: &[S],
    config: &ParallelConfig,
) -> FlowResult<Vec<i64>>
where
    G: Deref<Target = DigraphStore> + Clone + Send + Sync,
    S: AsRef<[ArcId]> + Sync,
{
    debug!(scenarios = scenarios.len(), workers = ?config.workers, "parallel evaluation");

    let run = || {
        scenarios
            .par_iter()
            .map_init(
                || prototype.clone(),
                |engine, disabled| engine.run_scenario(disabled.as_ref()),
            )
            .collect::<FlowResult<Vec<i64>>>()
    };

    match config.workers {
        Some(workers) => {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(workers)
                .build()
                .map_err(|e| FlowError::ThreadPool(e.to_string()))?;
            pool.install(run)
        }
        None => run(),
    }
}

/// Parallel counterpart of [`FlowComputation::single_arc_sweep`]
pub fn single_arc_sweep_parallel<G>(
    prototype: &FlowComputation<G>,
    config: &ParallelConfig,
) -> FlowResult<Vec<ArcImpact>>
where
    G: Deref<Target = DigraphStore> + Clone + Send + Sync,
{
    let mut baseline_engine = prototype.clone();
    let baseline = baseline_engine.baseline()?;

    let scenarios: Vec<[ArcId; 1]> = (0..prototype.arc_count())
        .map(|i| [ArcId::new(i as u32)])
        .collect();
    let values = evaluate_scenarios_parallel(prototype, &scenarios, config)?;

    let mut impacts: Vec<ArcImpact> = scenarios
        .iter()
        .zip(values)
        .map(|([arc], value)| ArcImpact::new(*arc, baseline, value))
        .collect();
    ArcImpact::sort_by_loss(&mut impacts);
    Ok(impacts)
}
