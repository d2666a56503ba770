//! Single-arc failure sweep
//!
//! Disables every arc on its own and ranks arcs by how much flow is lost.

use super::computation::{FlowComputation, FlowResult};
use crate::graph::{ArcId, DigraphStore};
use serde::{Deserialize, Serialize};
use std::ops::Deref;

/// Effect of losing one arc
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArcImpact {
    pub arc: ArcId,
    /// Flow value with the arc disabled
    pub value: i64,
    /// Baseline minus `value`
    pub loss: i64,
}

impl ArcImpact {
    pub fn new(arc: ArcId, baseline: i64, value: i64) -> Self {
        ArcImpact {
            arc,
            value,
            loss: baseline - value,
        }
    }

    /// Largest loss first, ties by arc id
    pub fn sort_by_loss(impacts: &mut [ArcImpact]) {
        impacts.sort_by(|a, b| b.loss.cmp(&a.loss).then(a.arc.cmp(&b.arc)));
    }
}

impl<G: Deref<Target = DigraphStore>> FlowComputation<G> {
    /// Evaluate the failure of each arc alone.
    ///
    /// Arcs with zero capacity cannot carry flow, so they are reported with the
    /// baseline value without running the solver.
    pub fn single_arc_sweep(&mut self) -> FlowResult<Vec<ArcImpact>> {
        let baseline = self.baseline()?;
        let mut impacts = Vec::with_capacity(self.arc_count());

        for i in 0..self.arc_count() {
            let arc = ArcId::new(i as u32);
            let value = match self.snapshot_capacity(arc) {
                Some(0) => baseline,
                _ => self.run_scenario(&[arc])?,
            };
            impacts.push(ArcImpact::new(arc, baseline, value));
        }

        ArcImpact::sort_by_loss(&mut impacts);
        Ok(impacts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::ArcMap;

    #[test]
    fn test_bottleneck_ranks_first() {
        // A -> B (5), B -> C (3), plus a dead-end arc A -> D (9)
        let mut g = DigraphStore::new();
        let a = g.add_node();
        let b = g.add_node();
        let c = g.add_node();
        let d = g.add_node();
        let ab = g.add_arc(a, b);
        let bc = g.add_arc(b, c);
        let ad = g.add_arc(a, d);
        let mut caps: ArcMap<i32> = ArcMap::new(&g);
        caps.set(ab, 5);
        caps.set(bc, 3);
        caps.set(ad, 9);

        let mut flow = FlowComputation::new(&g, &caps, a, c).unwrap();
        let impacts = flow.single_arc_sweep().unwrap();

        assert_eq!(impacts.len(), 3);
        assert_eq!(impacts[0], ArcImpact { arc: ab, value: 0, loss: 3 });
        assert_eq!(impacts[1], ArcImpact { arc: bc, value: 0, loss: 3 });
        assert_eq!(impacts[2], ArcImpact { arc: ad, value: 3, loss: 0 });
        assert!(flow.overlay_matches_snapshot());
    }

    #[test]
    fn test_zero_capacity_arcs_skip_solver() {
        let mut g = DigraphStore::new();
        let a = g.add_node();
        let b = g.add_node();
        let live = g.add_arc(a, b);
        let dead = g.add_arc(a, b);
        let mut caps: ArcMap<i64> = ArcMap::new(&g);
        caps.set(live, 4);

        let mut flow = FlowComputation::new(&g, &caps, a, b).unwrap();
        let impacts = flow.single_arc_sweep().unwrap();
        assert_eq!(impacts[0].arc, live);
        assert_eq!(impacts[1], ArcImpact { arc: dead, value: 4, loss: 0 });
    }
}
