//! Augmenting-path max flow
//!
//! Implements Max Flow using the Edmonds-Karp algorithm (BFS-based Ford-Fulkerson).
//! Slower than [`crate::Preflow`] but simple enough to serve as a reference.

use super::common::{Capacity, FlowNetwork, NodeIndex};
use std::collections::VecDeque;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlowResult {
    pub max_flow: Capacity,
    /// Number of augmenting paths found
    pub augmentations: usize,
}

/// Edmonds-Karp Algorithm for Max Flow
///
/// `capacities` is indexed by arc. Returns `None` if a terminal is out of range
/// or `source == sink`.
pub fn edmonds_karp(
    network: &FlowNetwork,
    capacities: &[Capacity],
    source: NodeIndex,
    sink: NodeIndex,
) -> Option<FlowResult> {
    let n = network.node_count();
    if source >= n || sink >= n || source == sink {
        return None;
    }

    let mut residual = Vec::new();
    network.load_residual(capacities, &mut residual);

    let mut total_flow = 0;
    let mut augmentations = 0;
    // slot used to reach each node in the current BFS tree
    let mut parent_slot: Vec<Option<usize>> = vec![None; n];
    let mut visited = vec![false; n];
    let mut queue = VecDeque::with_capacity(n);

    loop {
        parent_slot.fill(None);
        visited.fill(false);
        queue.clear();

        visited[source] = true;
        queue.push_back(source);

        while let Some(u) = queue.pop_front() {
            if u == sink {
                break;
            }
            for slot in network.slots(u) {
                let v = network.head(slot);
                if !visited[v] && residual[slot] > 0 {
                    visited[v] = true;
                    parent_slot[v] = Some(slot);
                    queue.push_back(v);
                }
            }
        }

        if !visited[sink] {
            break;
        }

        // Bottleneck along the path
        let mut path_flow = Capacity::MAX;
        let mut curr = sink;
        while let Some(slot) = parent_slot[curr] {
            path_flow = path_flow.min(residual[slot]);
            curr = network.head(network.mate(slot));
        }

        // Update residual capacities
        curr = sink;
        while let Some(slot) = parent_slot[curr] {
            residual[slot] -= path_flow;
            residual[network.mate(slot)] += path_flow;
            curr = network.head(network.mate(slot));
        }

        total_flow += path_flow;
        augmentations += 1;
    }

    Some(FlowResult {
        max_flow: total_flow,
        augmentations,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edmonds_karp() {
        // S(0) -> A(1) (100)
        // S(0) -> B(2) (50)
        // A(1) -> B(2) (50)
        // A(1) -> T(3) (50)
        // B(2) -> T(3) (100)
        //
        // S->A->T: 50, S->B->T: 50, S->A->B->T: 50. Total 150.
        let arcs = [(0, 1), (0, 2), (1, 2), (1, 3), (2, 3)];
        let network = FlowNetwork::from_arcs(4, &arcs);

        let result = edmonds_karp(&network, &[100, 50, 50, 50, 100], 0, 3).unwrap();
        assert_eq!(result.max_flow, 150);
        assert_eq!(result.augmentations, 3);
    }

    #[test]
    fn test_invalid_terminals() {
        let network = FlowNetwork::from_arcs(2, &[(0, 1)]);
        assert!(edmonds_karp(&network, &[1], 0, 2).is_none());
        assert!(edmonds_karp(&network, &[1], 1, 1).is_none());
    }

    #[test]
    fn test_zero_capacity_blocks_path() {
        let network = FlowNetwork::from_arcs(3, &[(0, 1), (1, 2)]);
        let result = edmonds_karp(&network, &[5, 0], 0, 2).unwrap();
        assert_eq!(result.max_flow, 0);
        assert_eq!(result.augmentations, 0);
    }
}
