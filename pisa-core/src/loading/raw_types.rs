use serde::Deserialize;

use crate::NodeId;

#[derive(Debug, Clone, Deserialize)]
pub struct NodeRecord {
    pub id: NodeId,
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EdgeRecord {
    pub u: NodeId,
    pub v: NodeId,
    pub length: f64,
    #[serde(default)]
    pub time: Option<f64>,
    /// WKT `LINESTRING`
    #[serde(default)]
    pub geometry: Option<String>,
}
