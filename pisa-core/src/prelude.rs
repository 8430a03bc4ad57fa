// Re-export key components
pub use crate::algo::isopolygon::{
    Diagnostic, DiagnosticKind, IsopolygonConfig, IsopolygonTable, QueryPoint, QueryPoints,
    calculate_isopolygons,
};
pub use crate::geometry::{GeoUnion, PolygonUnion};
pub use crate::loading::{NetworkConfig, create_spatial_graph};
pub use crate::model::{DistanceThreshold, DistanceType, SpatialGraphIndex};
pub use crate::population::{PopulationIndex, PopulationPoint};

// Core types for the network
pub use crate::Error;
pub use crate::NodeId;
pub use crate::Weight;
pub use crate::{DEFAULT_EDGE_BUFFER, DEFAULT_NODE_BUFFER};
