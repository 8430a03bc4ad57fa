use geo::LineString;
use log::info;
use wkt::TryFromWkt;

use super::config::NetworkConfig;
use super::parser::deserialize_table;
use super::raw_types::{EdgeRecord, NodeRecord};
use crate::model::{EdgeWeights, NetworkEdge, NetworkNode};
use crate::{Error, SpatialGraphIndex};

/// Builds the spatial graph index from the configured CSV tables
///
/// # Errors
///
/// Returns an error if the files cannot be read or the network is malformed
pub fn create_spatial_graph(config: &NetworkConfig) -> Result<SpatialGraphIndex, Error> {
    validate_config(config)?;

    info!("Reading network nodes: {}", config.nodes_path.display());
    let nodes: Vec<NodeRecord> = deserialize_table(&config.nodes_path)?;

    info!("Reading network edges: {}", config.edges_path.display());
    let edges: Vec<EdgeRecord> = deserialize_table(&config.edges_path)?;

    info!("Loaded {} nodes and {} edges", nodes.len(), edges.len());

    network_from_records(nodes, edges, config.default_speed_kph)
}

/// Builds the spatial graph index from in-memory records
pub fn network_from_records(
    nodes: Vec<NodeRecord>,
    edges: Vec<EdgeRecord>,
    default_speed_kph: Option<f64>,
) -> Result<SpatialGraphIndex, Error> {
    let nodes = nodes
        .into_iter()
        .map(|record| NetworkNode::new(record.id, record.x, record.y))
        .collect();

    let edges = edges
        .into_iter()
        .map(|record| edge_from_record(record, default_speed_kph))
        .collect::<Result<Vec<_>, Error>>()?;

    SpatialGraphIndex::build(nodes, edges)
}

fn edge_from_record(
    record: EdgeRecord,
    default_speed_kph: Option<f64>,
) -> Result<NetworkEdge, Error> {
    let weights = match (record.time, default_speed_kph) {
        (Some(time), _) => EdgeWeights::new(record.length, time),
        (None, Some(speed)) => EdgeWeights::from_speed(record.length, speed),
        (None, None) => EdgeWeights::length(record.length),
    };

    let edge = NetworkEdge::new(record.u, record.v, weights);
    match record.geometry.as_deref().map(str::trim) {
        Some(wkt) if !wkt.is_empty() => {
            let geometry = LineString::try_from_wkt_str(wkt).map_err(|e| {
                Error::InvalidData(format!(
                    "edge ({}, {}) has invalid WKT geometry: {e}",
                    record.u, record.v
                ))
            })?;
            Ok(edge.with_geometry(geometry))
        }
        _ => Ok(edge),
    }
}

fn validate_config(config: &NetworkConfig) -> Result<(), Error> {
    for path in [&config.nodes_path, &config.edges_path] {
        if !path.exists() {
            return Err(Error::IoError(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("Network table not found: {}", path.display()),
            )));
        }
    }

    if let Some(speed) = config.default_speed_kph
        && (!speed.is_finite() || speed <= 0.0)
    {
        return Err(Error::ConfigurationError(format!(
            "default speed must be positive, got {speed} km/h"
        )));
    }

    Ok(())
}
