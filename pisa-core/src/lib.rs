//! Network-distance reachability and isopolygon construction.
//!
//! Given a weighted network and a set of facility locations, computes the
//! area reachable from every facility within a list of network-distance
//! thresholds and arranges the results in an [`IsopolygonTable`].

pub mod algo;
pub mod error;
pub mod export;
pub mod geometry;
pub mod loading;
pub mod model;
pub mod population;
pub mod prelude;
pub mod routing;

pub use algo::isopolygon::{
    Diagnostic, DiagnosticKind, IsopolygonConfig, IsopolygonTable, QueryPoint, QueryPoints,
    calculate_isopolygons,
};
pub use error::Error;
pub use geometry::{GeoUnion, PolygonUnion, build_polygon};
pub use loading::{NetworkConfig, create_spatial_graph};
pub use model::{
    DistanceThreshold, DistanceType, EdgeWeights, NetworkEdge, NetworkNode, SpatialGraphIndex,
};
pub use routing::{EgoSubgraph, compute_ego_subgraphs};

/// External (source network) node identifier, e.g. an OSM node id
pub type NodeId = i64;

/// Network distance in the units of the selected [`DistanceType`]
pub type Weight = f64;

/// Default radius of the disk drawn around every reached node
pub const DEFAULT_NODE_BUFFER: f64 = 0.001;

/// Default half-width of the corridor drawn around every reached edge
pub const DEFAULT_EDGE_BUFFER: f64 = 0.0005;
