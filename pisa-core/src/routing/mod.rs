//! Distance-bounded traversal of the spatial graph

mod ego;
mod state;

pub use ego::{
    EdgeReach, EgoSubgraph, ReachedEdge, ReachedNode, compute_ego_subgraphs,
    ego_subgraphs_until,
};
