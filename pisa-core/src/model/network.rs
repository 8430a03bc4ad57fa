//! Immutable spatial graph shared by all reachability queries

use geo::{Coord, Distance, Euclidean, LineString, Point};
use hashbrown::{HashMap, hash_map::Entry};
use log::info;
use petgraph::graph::{EdgeIndex, NodeIndex, UnGraph};
use petgraph::visit::EdgeRef;
use rstar::{PointDistance, RTree, primitives::GeomWithData};

use super::components::{DistanceType, EdgeSegment, NetworkEdge, NetworkNode};
use crate::{Error, NodeId, Weight};

/// Undirected network stored in a dense node arena
pub type SpatialGraph = UnGraph<NetworkNode, EdgeSegment>;

/// R-tree entry: node coordinates with the node's arena slot
pub type IndexedPoint = GeomWithData<[f64; 2], NodeIndex>;

/// Weighted network with nearest-node lookup.
///
/// Built once and never mutated afterwards, so a single instance can be
/// shared between threads without locking.
#[derive(Debug, Clone)]
pub struct SpatialGraphIndex {
    pub(crate) graph: SpatialGraph,
    node_lookup: HashMap<NodeId, NodeIndex>,
    rtree: RTree<IndexedPoint>,
    supported: Vec<DistanceType>,
}

impl SpatialGraphIndex {
    /// Builds adjacency and the spatial index over node coordinates
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigurationError`] for duplicate node ids, non-finite
    /// coordinates, invalid weights, or edges referencing unknown nodes.
    pub fn build(nodes: Vec<NetworkNode>, edges: Vec<NetworkEdge>) -> Result<Self, Error> {
        let mut graph = SpatialGraph::with_capacity(nodes.len(), edges.len());
        let mut node_lookup = HashMap::with_capacity(nodes.len());

        for node in nodes {
            let (x, y) = node.geometry.x_y();
            if !x.is_finite() || !y.is_finite() {
                return Err(Error::ConfigurationError(format!(
                    "node {} has non-finite coordinates ({x}, {y})",
                    node.id
                )));
            }

            match node_lookup.entry(node.id) {
                Entry::Vacant(entry) => {
                    entry.insert(graph.add_node(node));
                }
                Entry::Occupied(entry) => {
                    return Err(Error::ConfigurationError(format!(
                        "duplicate node id {}",
                        entry.key()
                    )));
                }
            }
        }

        for edge in edges {
            let lookup = |id: NodeId| {
                node_lookup.get(&id).copied().ok_or_else(|| {
                    Error::ConfigurationError(format!(
                        "edge ({}, {}) references unknown node {id}",
                        edge.source, edge.target
                    ))
                })
            };
            let source = lookup(edge.source)?;
            let target = lookup(edge.target)?;
            edge.weights.validate()?;

            let geometry = orient_geometry(
                edge.geometry,
                graph[source].geometry,
                graph[target].geometry,
            );
            graph.add_edge(
                source,
                target,
                EdgeSegment {
                    weights: edge.weights,
                    geometry,
                },
            );
        }

        let points = graph
            .node_indices()
            .map(|idx| {
                let (x, y) = graph[idx].geometry.x_y();
                GeomWithData::new([x, y], idx)
            })
            .collect();
        let rtree = RTree::bulk_load(points);

        let supported = DistanceType::ALL
            .into_iter()
            .filter(|dt| {
                graph
                    .edge_weights()
                    .all(|edge| dt.weight(&edge.weights).is_some())
            })
            .collect::<Vec<_>>();

        info!(
            "Spatial graph built: {} nodes, {} edges, distance types: {:?}",
            graph.node_count(),
            graph.edge_count(),
            supported
        );

        Ok(Self {
            graph,
            node_lookup,
            rtree,
            supported,
        })
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    pub fn graph(&self) -> &SpatialGraph {
        &self.graph
    }

    /// Whether every edge carries a weight for `distance_type`
    pub fn supports(&self, distance_type: DistanceType) -> bool {
        self.supported.contains(&distance_type)
    }

    pub fn ensure_supported(&self, distance_type: DistanceType) -> Result<(), Error> {
        if self.supports(distance_type) {
            Ok(())
        } else {
            Err(Error::ConfigurationError(format!(
                "distance type '{distance_type}' is not available on every edge of the network"
            )))
        }
    }

    /// Node closest to `coordinate` by planar distance, ties go to the smallest id
    ///
    /// # Errors
    ///
    /// [`Error::NoReachableNode`] if the graph is empty or the coordinate is not finite
    pub fn nearest_node(&self, coordinate: Coord<f64>) -> Result<NodeId, Error> {
        self.nearest_index(coordinate).map(|idx| self.graph[idx].id)
    }

    pub(crate) fn nearest_index(&self, coordinate: Coord<f64>) -> Result<NodeIndex, Error> {
        if !coordinate.x.is_finite() || !coordinate.y.is_finite() {
            return Err(Error::NoReachableNode);
        }

        let query = [coordinate.x, coordinate.y];
        let mut candidates = self
            .rtree
            .nearest_neighbor_iter(&query)
            .map(|point| (point, point.distance_2(&query)));
        let (first, best) = candidates.next().ok_or(Error::NoReachableNode)?;

        let nearest = candidates
            .take_while(|&(_, distance_2)| distance_2 <= best)
            .map(|(point, _)| point.data)
            .fold(first.data, |current, candidate| {
                if self.graph[candidate].id < self.graph[current].id {
                    candidate
                } else {
                    current
                }
            });

        Ok(nearest)
    }

    /// Neighbors of a node with the edge weight for `distance_type`
    ///
    /// Parallel edges are reported once per edge.
    pub fn neighbors(
        &self,
        node: NodeId,
        distance_type: DistanceType,
    ) -> Result<Vec<(NodeId, Weight)>, Error> {
        let idx = self.node_index(node)?;
        self.ensure_supported(distance_type)?;

        Ok(self
            .incident_edges(idx, distance_type)
            .map(|(next, _, weight)| (self.graph[next].id, weight))
            .collect())
    }

    /// Edges touching `node` as `(other endpoint, edge, weight)`
    pub(crate) fn incident_edges(
        &self,
        node: NodeIndex,
        distance_type: DistanceType,
    ) -> impl Iterator<Item = (NodeIndex, EdgeIndex, Weight)> + '_ {
        self.graph.edges(node).filter_map(move |edge| {
            let other = if edge.source() == node {
                edge.target()
            } else {
                edge.source()
            };
            distance_type
                .weight(&edge.weight().weights)
                .map(|weight| (other, edge.id(), weight))
        })
    }

    pub fn node_index(&self, node: NodeId) -> Result<NodeIndex, Error> {
        self.node_lookup
            .get(&node)
            .copied()
            .ok_or(Error::UnknownNode(node))
    }

    pub fn node_id(&self, idx: NodeIndex) -> NodeId {
        self.graph[idx].id
    }

    pub fn node_coordinate(&self, node: NodeId) -> Result<Coord<f64>, Error> {
        self.node_index(node).map(|idx| self.node_coord(idx))
    }

    pub(crate) fn node_coord(&self, idx: NodeIndex) -> Coord<f64> {
        self.graph[idx].geometry.0
    }

    pub(crate) fn edge_segment(&self, edge: EdgeIndex) -> &EdgeSegment {
        &self.graph[edge]
    }

    /// Arena slots the edge was inserted with, in geometry orientation
    pub(crate) fn edge_endpoints(&self, edge: EdgeIndex) -> Option<(NodeIndex, NodeIndex)> {
        self.graph.edge_endpoints(edge)
    }
}

/// Uses a straight segment when no geometry is given, otherwise makes sure the
/// line starts at the source node.
fn orient_geometry(
    geometry: Option<LineString<f64>>,
    source: Point<f64>,
    target: Point<f64>,
) -> LineString<f64> {
    let Some(mut line) = geometry.filter(|line| !line.0.is_empty()) else {
        return LineString::from(vec![source.0, target.0]);
    };

    let head = Point::from(line.0[0]);
    if Euclidean.distance(head, target) < Euclidean.distance(head, source) {
        line.0.reverse();
    }
    line
}
