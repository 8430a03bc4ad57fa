//! Single-source, multi-threshold reachability.
//!
//! One Dijkstra expansion serves every threshold of a query: thresholds are
//! visited in ascending order and the settled set is snapshotted whenever the
//! frontier moves past the current one. Nodes go UNVISITED (infinite
//! distance) → FRONTIER (in the heap) → SETTLED (in the bitset) and never back.

use std::collections::BinaryHeap;
use std::time::Instant;

use fixedbitset::FixedBitSet;
use geo::{Coord, LineString};
use hashbrown::HashSet;
use itertools::Itertools;
use log::debug;
use petgraph::graph::{EdgeIndex, NodeIndex};

use super::state::State;
use crate::geometry::clip_line;
use crate::{DistanceType, Error, NodeId, SpatialGraphIndex, Weight};

/// Number of settled nodes between two deadline checks
const DEADLINE_CHECK_INTERVAL: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReachedNode {
    pub node: NodeIndex,
    /// Shortest network distance from the source
    pub distance: Weight,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EdgeReach {
    /// Both endpoints are within the threshold
    Full,
    /// Only `from` is within the threshold, `fraction` of the edge measured
    /// from it is reachable
    Partial { from: NodeIndex, fraction: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReachedEdge {
    pub edge: EdgeIndex,
    pub reach: EdgeReach,
}

/// Nodes within a threshold of the source, and the edges touching them
#[derive(Debug, Clone, Default)]
pub struct EgoSubgraph {
    pub threshold: Weight,
    /// Reached nodes in settle order, the source first
    pub nodes: Vec<ReachedNode>,
    pub edges: Vec<ReachedEdge>,
}

impl EgoSubgraph {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, node: NodeIndex) -> bool {
        self.nodes.iter().any(|reached| reached.node == node)
    }

    pub fn node_ids(&self, index: &SpatialGraphIndex) -> Vec<NodeId> {
        self.nodes
            .iter()
            .map(|reached| index.node_id(reached.node))
            .collect()
    }

    pub fn node_coordinates(&self, index: &SpatialGraphIndex) -> Vec<Coord<f64>> {
        self.nodes
            .iter()
            .map(|reached| index.node_coord(reached.node))
            .collect()
    }

    /// Line geometries of the reached edges, partial edges cut to their reachable part
    pub fn edge_geometries(&self, index: &SpatialGraphIndex) -> Vec<LineString<f64>> {
        self.edges
            .iter()
            .map(|reached| {
                let geometry = &index.edge_segment(reached.edge).geometry;
                match reached.reach {
                    EdgeReach::Full => geometry.clone(),
                    EdgeReach::Partial { from, fraction } => {
                        let starts_at_from = index
                            .edge_endpoints(reached.edge)
                            .is_some_and(|(source, _)| source == from);
                        if starts_at_from {
                            clip_line(geometry, fraction)
                        } else {
                            let mut reversed = geometry.clone();
                            reversed.0.reverse();
                            clip_line(&reversed, fraction)
                        }
                    }
                }
            })
            .collect()
    }
}

/// Reachable subgraphs of `source` for every threshold, in the given order
///
/// # Errors
///
/// [`Error::UnknownNode`] for an unknown source, [`Error::ConfigurationError`]
/// for an unsupported distance type or a negative threshold.
pub fn compute_ego_subgraphs(
    index: &SpatialGraphIndex,
    source: NodeId,
    distance_type: DistanceType,
    thresholds: &[Weight],
) -> Result<Vec<EgoSubgraph>, Error> {
    let source = index.node_index(source)?;
    let subgraphs = ego_subgraphs_until(index, source, distance_type, thresholds, None)?;

    // Without a deadline every threshold is finished
    Ok(subgraphs.into_iter().flatten().collect())
}

/// Same as [`compute_ego_subgraphs`] but gives up at `deadline`.
///
/// Thresholds already passed by the expansion when time ran out are returned
/// in full, the rest are `None`.
pub fn ego_subgraphs_until(
    index: &SpatialGraphIndex,
    source: NodeIndex,
    distance_type: DistanceType,
    thresholds: &[Weight],
    deadline: Option<Instant>,
) -> Result<Vec<Option<EgoSubgraph>>, Error> {
    ego_subgraphs_interruptible(index, source, distance_type, thresholds, |settled| {
        (settled - 1) % DEADLINE_CHECK_INTERVAL == 0
            && deadline.is_some_and(|limit| Instant::now() >= limit)
    })
}

/// Expansion that stops as soon as `interrupt` returns true.
///
/// `interrupt` is asked after every settled node with the number of nodes
/// settled so far.
pub(crate) fn ego_subgraphs_interruptible<F>(
    index: &SpatialGraphIndex,
    source: NodeIndex,
    distance_type: DistanceType,
    thresholds: &[Weight],
    mut interrupt: F,
) -> Result<Vec<Option<EgoSubgraph>>, Error>
where
    F: FnMut(usize) -> bool,
{
    index.ensure_supported(distance_type)?;
    if let Some(bad) = thresholds.iter().find(|t| !t.is_finite() || **t < 0.0) {
        return Err(Error::ConfigurationError(format!(
            "distance thresholds must be finite and non-negative, got {bad}"
        )));
    }

    let order = (0..thresholds.len())
        .sorted_by(|&a, &b| thresholds[a].total_cmp(&thresholds[b]))
        .collect::<Vec<_>>();

    let node_count = index.node_count();
    let mut distances = vec![Weight::INFINITY; node_count];
    let mut settled = FixedBitSet::with_capacity(node_count);
    let mut settle_order: Vec<NodeIndex> = Vec::new();
    // Size of the settled set at each threshold, by ascending position
    let mut cuts: Vec<Option<usize>> = vec![None; order.len()];
    let mut next_cut = 0;
    let mut timed_out = false;

    let mut heap = BinaryHeap::new();
    distances[source.index()] = 0.0;
    heap.push(State {
        cost: 0.0,
        node: source,
    });

    while let Some(State { cost, node }) = heap.pop() {
        // The frontier minimum passed these thresholds, their sets are final
        while next_cut < order.len() && cost > thresholds[order[next_cut]] {
            cuts[next_cut] = Some(settle_order.len());
            next_cut += 1;
        }
        if next_cut == order.len() {
            break;
        }

        // Stale heap entry
        if settled.put(node.index()) {
            continue;
        }
        settle_order.push(node);

        if interrupt(settle_order.len()) {
            timed_out = true;
            break;
        }

        for (next, _, weight) in index.incident_edges(node, distance_type) {
            if settled.contains(next.index()) {
                continue;
            }
            let next_cost = cost + weight;
            if next_cost < distances[next.index()] {
                distances[next.index()] = next_cost;
                heap.push(State {
                    cost: next_cost,
                    node: next,
                });
            }
        }
    }

    if !timed_out {
        // Frontier exhausted: everything reachable is within the remaining thresholds
        for cut in &mut cuts[next_cut..] {
            *cut = Some(settle_order.len());
        }
    }

    debug!(
        "Traversal from node {} settled {} nodes for {} thresholds{}",
        index.node_id(source),
        settle_order.len(),
        thresholds.len(),
        if timed_out { " (timed out)" } else { "" }
    );

    let mut subgraphs = vec![None; thresholds.len()];
    for (position, cut) in cuts.into_iter().enumerate() {
        let Some(cut) = cut else { continue };
        let original = order[position];
        subgraphs[original] = Some(snapshot(
            index,
            distance_type,
            &distances,
            &settle_order[..cut],
            thresholds[original],
        ));
    }

    Ok(subgraphs)
}

/// Subgraph made of the first `members` settled nodes
fn snapshot(
    index: &SpatialGraphIndex,
    distance_type: DistanceType,
    distances: &[Weight],
    members: &[NodeIndex],
    limit: Weight,
) -> EgoSubgraph {
    let member_set: HashSet<NodeIndex> = members.iter().copied().collect();
    let mut full_edges: HashSet<EdgeIndex> = HashSet::new();
    let mut edges = Vec::new();

    for &node in members {
        for (other, edge, weight) in index.incident_edges(node, distance_type) {
            if member_set.contains(&other) {
                if full_edges.insert(edge) {
                    edges.push(ReachedEdge {
                        edge,
                        reach: EdgeReach::Full,
                    });
                }
            } else {
                let remaining = limit - distances[node.index()];
                let fraction = if weight > 0.0 {
                    (remaining / weight).clamp(0.0, 1.0)
                } else {
                    1.0
                };
                edges.push(ReachedEdge {
                    edge,
                    reach: EdgeReach::Partial {
                        from: node,
                        fraction,
                    },
                });
            }
        }
    }

    EgoSubgraph {
        threshold: limit,
        nodes: members
            .iter()
            .map(|&node| ReachedNode {
                node,
                distance: distances[node.index()],
            })
            .collect(),
        edges,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{EdgeWeights, NetworkEdge, NetworkNode};

    /// 1 --10-- 2 --10-- 3 --10-- 4, plus 2 --4-- 5 (time weights doubled)
    fn line_with_spur() -> SpatialGraphIndex {
        let nodes = vec![
            NetworkNode::new(1, 0.0, 0.0),
            NetworkNode::new(2, 10.0, 0.0),
            NetworkNode::new(3, 20.0, 0.0),
            NetworkNode::new(4, 30.0, 0.0),
            NetworkNode::new(5, 10.0, 4.0),
        ];
        let edges = vec![
            NetworkEdge::new(1, 2, EdgeWeights::new(10.0, 20.0)),
            NetworkEdge::new(2, 3, EdgeWeights::new(10.0, 20.0)),
            NetworkEdge::new(3, 4, EdgeWeights::new(10.0, 20.0)),
            NetworkEdge::new(5, 2, EdgeWeights::new(4.0, 8.0)),
        ];
        SpatialGraphIndex::build(nodes, edges).unwrap()
    }

    fn sorted_ids(subgraph: &EgoSubgraph, index: &SpatialGraphIndex) -> Vec<NodeId> {
        let mut ids = subgraph.node_ids(index);
        ids.sort_unstable();
        ids
    }

    #[test]
    fn thresholds_keep_caller_order() {
        let index = line_with_spur();
        let subgraphs =
            compute_ego_subgraphs(&index, 1, DistanceType::Length, &[25.0, 5.0, 14.0]).unwrap();

        assert_eq!(subgraphs.len(), 3);
        assert_eq!(subgraphs[0].threshold, 25.0);
        assert_eq!(sorted_ids(&subgraphs[0], &index), vec![1, 2, 3, 5]);
        assert_eq!(sorted_ids(&subgraphs[1], &index), vec![1]);
        assert_eq!(sorted_ids(&subgraphs[2], &index), vec![1, 2, 5]);
    }

    #[test]
    fn threshold_equal_to_distance_is_inclusive() {
        let index = line_with_spur();
        let subgraphs = compute_ego_subgraphs(&index, 1, DistanceType::Length, &[10.0]).unwrap();
        assert_eq!(sorted_ids(&subgraphs[0], &index), vec![1, 2]);
    }

    #[test]
    fn distances_are_shortest_paths() {
        let index = line_with_spur();
        let subgraphs = compute_ego_subgraphs(&index, 5, DistanceType::Length, &[100.0]).unwrap();

        let distance_of = |id: NodeId| {
            subgraphs[0]
                .nodes
                .iter()
                .find(|reached| index.node_id(reached.node) == id)
                .map(|reached| reached.distance)
        };
        assert_eq!(distance_of(5), Some(0.0));
        assert_eq!(distance_of(1), Some(14.0));
        assert_eq!(distance_of(4), Some(24.0));
    }

    #[test]
    fn outgoing_edges_are_included_partially() {
        let index = line_with_spur();
        let subgraphs = compute_ego_subgraphs(&index, 1, DistanceType::Length, &[5.0]).unwrap();
        let subgraph = &subgraphs[0];

        assert_eq!(subgraph.edges.len(), 1);
        match subgraph.edges[0].reach {
            EdgeReach::Partial { from, fraction } => {
                assert_eq!(index.node_id(from), 1);
                assert!((fraction - 0.5).abs() < 1e-12);
            }
            EdgeReach::Full => panic!("edge 1-2 must be partial at 5"),
        }

        let lines = subgraph.edge_geometries(&index);
        assert_eq!(lines[0].0.last(), Some(&Coord { x: 5.0, y: 0.0 }));
    }

    #[test]
    fn partial_edges_are_cut_from_the_reached_end() {
        let index = line_with_spur();
        // From node 4 the edge 3-4 was inserted as 3 -> 4, so it must be walked backwards
        let subgraphs = compute_ego_subgraphs(&index, 4, DistanceType::Length, &[2.5]).unwrap();
        let lines = subgraphs[0].edge_geometries(&index);

        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].0.first(), Some(&Coord { x: 30.0, y: 0.0 }));
        assert_eq!(lines[0].0.last(), Some(&Coord { x: 27.5, y: 0.0 }));
    }

    #[test]
    fn inner_edges_are_full_and_unique() {
        let index = line_with_spur();
        let subgraphs = compute_ego_subgraphs(&index, 2, DistanceType::Length, &[10.0]).unwrap();
        let subgraph = &subgraphs[0];

        let full = subgraph
            .edges
            .iter()
            .filter(|edge| edge.reach == EdgeReach::Full)
            .count();
        // 1-2, 2-3, 2-5 full; 3-4 partial with nothing left to walk
        assert_eq!(full, 3);
        assert_eq!(subgraph.edges.len(), 4);
    }

    #[test]
    fn time_weights_change_reach() {
        let index = line_with_spur();
        let subgraphs = compute_ego_subgraphs(&index, 1, DistanceType::Time, &[25.0]).unwrap();
        assert_eq!(sorted_ids(&subgraphs[0], &index), vec![1, 2]);
    }

    #[test]
    fn larger_thresholds_nest_smaller_ones() {
        let index = line_with_spur();
        let thresholds = [3.0, 11.0, 14.0, 19.0, 30.0];
        let subgraphs =
            compute_ego_subgraphs(&index, 1, DistanceType::Length, &thresholds).unwrap();

        for pair in subgraphs.windows(2) {
            assert!(pair[0].nodes.iter().all(|n| pair[1].contains(n.node)));
        }
    }

    #[test]
    fn expired_deadline_leaves_thresholds_unfinished() {
        let index = line_with_spur();
        let source = index.node_index(1).unwrap();
        let subgraphs = ego_subgraphs_until(
            &index,
            source,
            DistanceType::Length,
            &[5.0, 50.0],
            Some(Instant::now()),
        )
        .unwrap();

        assert!(subgraphs.iter().all(Option::is_none));
    }

    #[test]
    fn interrupted_expansion_keeps_finished_thresholds() {
        let index = line_with_spur();
        let source = index.node_index(1).unwrap();
        // Settle order from node 1: 1 (0), 2 (10), 5 (14), 3 (20), 4 (30)
        let subgraphs = ego_subgraphs_interruptible(
            &index,
            source,
            DistanceType::Length,
            &[25.0, 5.0, 14.0],
            |settled| settled == 4,
        )
        .unwrap();

        assert_eq!(subgraphs.len(), 3);
        assert!(subgraphs[0].is_none());

        let within_5 = subgraphs[1].as_ref().unwrap();
        assert_eq!(within_5.threshold, 5.0);
        assert_eq!(sorted_ids(within_5, &index), vec![1]);

        let within_14 = subgraphs[2].as_ref().unwrap();
        assert_eq!(within_14.threshold, 14.0);
        assert_eq!(sorted_ids(within_14, &index), vec![1, 2, 5]);
    }

    #[test]
    fn interruption_before_any_cut_leaves_everything_unfinished() {
        let index = line_with_spur();
        let source = index.node_index(1).unwrap();
        let subgraphs = ego_subgraphs_interruptible(
            &index,
            source,
            DistanceType::Length,
            &[14.0, 5.0],
            |settled| settled == 1,
        )
        .unwrap();

        assert_eq!(subgraphs.len(), 2);
        assert!(subgraphs.iter().all(Option::is_none));
    }

    #[test]
    fn unknown_source_is_reported() {
        let index = line_with_spur();
        assert!(matches!(
            compute_ego_subgraphs(&index, 42, DistanceType::Length, &[5.0]),
            Err(Error::UnknownNode(42))
        ));
    }
}
