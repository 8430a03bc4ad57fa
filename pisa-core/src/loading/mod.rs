//! This module is responsible for loading network tables and building the
//! spatial graph index used for reachability queries.

mod builder;
mod config;
mod parser;
mod raw_types;

pub use builder::{create_spatial_graph, network_from_records};
pub use config::NetworkConfig;
pub use raw_types::{EdgeRecord, NodeRecord};
