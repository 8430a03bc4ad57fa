use thiserror::Error;

use crate::NodeId;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    ConfigurationError(String),
    #[error("No reachable node found for the query point")]
    NoReachableNode,
    #[error("Unknown node id {0}")]
    UnknownNode(NodeId),
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
    #[error("Geometry error: {0}")]
    GeometryError(String),
    #[error("Invalid data: {0}")]
    InvalidData(String),
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("GeoJSON error: {0}")]
    GeoJsonError(String),
}
