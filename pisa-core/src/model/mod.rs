//! Data model for network-distance reachability
//!
//! Contains the network components and the immutable spatial graph index
//! shared by all isopolygon computations.

pub mod components;
pub mod network;

pub use components::{
    DistanceThreshold, DistanceType, EdgeSegment, EdgeWeights, NetworkEdge, NetworkNode,
};
pub use network::{IndexedPoint, SpatialGraph, SpatialGraphIndex};
