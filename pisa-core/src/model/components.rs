//! Network components - nodes, edges, weights and thresholds

use std::fmt;
use std::str::FromStr;

use geo::{LineString, Point};
use serde::{Deserialize, Serialize};

use crate::{Error, NodeId, Weight};

/// Network node as supplied by the network source
#[derive(Debug, Clone)]
pub struct NetworkNode {
    /// Source id of the node
    pub id: NodeId,
    /// Node coordinates
    pub geometry: Point<f64>,
}

impl NetworkNode {
    pub fn new(id: NodeId, x: f64, y: f64) -> Self {
        Self {
            id,
            geometry: Point::new(x, y),
        }
    }
}

/// Network edge as supplied by the network source
#[derive(Debug, Clone)]
pub struct NetworkEdge {
    pub source: NodeId,
    pub target: NodeId,
    pub weights: EdgeWeights,
    /// Line geometry; a straight segment between the endpoints is used when absent
    pub geometry: Option<LineString<f64>>,
}

impl NetworkEdge {
    pub fn new(source: NodeId, target: NodeId, weights: EdgeWeights) -> Self {
        Self {
            source,
            target,
            weights,
            geometry: None,
        }
    }

    #[must_use]
    pub fn with_geometry(mut self, geometry: LineString<f64>) -> Self {
        self.geometry = Some(geometry);
        self
    }
}

/// Edge payload stored in the graph
#[derive(Debug, Clone)]
pub struct EdgeSegment {
    pub weights: EdgeWeights,
    /// Geometry oriented from the graph source node to the graph target node
    pub geometry: LineString<f64>,
}

/// Per distance type weights of a single edge
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeWeights {
    /// Length, usually in meters
    pub length: Weight,
    /// Traversal time, usually in seconds
    pub time: Option<Weight>,
}

impl EdgeWeights {
    pub fn length(length: Weight) -> Self {
        Self { length, time: None }
    }

    pub fn new(length: Weight, time: Weight) -> Self {
        Self {
            length,
            time: Some(time),
        }
    }

    /// Weights for an edge travelled at a constant speed in km/h
    pub fn from_speed(length: Weight, speed_kph: f64) -> Self {
        Self::new(length, length / (speed_kph / 3.6))
    }

    fn all(&self) -> impl Iterator<Item = Weight> {
        std::iter::once(self.length).chain(self.time)
    }

    pub(crate) fn validate(&self) -> Result<(), Error> {
        match self.all().find(|w| !w.is_finite() || *w < 0.0) {
            Some(bad) => Err(Error::ConfigurationError(format!(
                "edge weights must be finite and non-negative, got {bad}"
            ))),
            None => Ok(()),
        }
    }
}

/// Kind of network distance used for traversal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceType {
    #[default]
    Length,
    Time,
}

impl DistanceType {
    pub const ALL: [DistanceType; 2] = [DistanceType::Length, DistanceType::Time];

    /// Weight of an edge for this distance type, `None` if the edge lacks it
    #[inline]
    pub fn weight(self, weights: &EdgeWeights) -> Option<Weight> {
        match self {
            DistanceType::Length => Some(weights.length),
            DistanceType::Time => weights.time,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DistanceType::Length => "length",
            DistanceType::Time => "time",
        }
    }
}

impl fmt::Display for DistanceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DistanceType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "length" => Ok(DistanceType::Length),
            "time" | "travel_time" => Ok(DistanceType::Time),
            other => Err(Error::ConfigurationError(format!(
                "unknown distance type '{other}', expected one of: length, time"
            ))),
        }
    }
}

/// Positive network distance limit with its table column label
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceThreshold {
    value: Weight,
    label: String,
}

impl DistanceThreshold {
    pub fn new(value: Weight) -> Result<Self, Error> {
        if !value.is_finite() || value <= 0.0 {
            return Err(Error::ConfigurationError(format!(
                "distance thresholds must be positive and finite, got {value}"
            )));
        }

        Ok(Self {
            value,
            label: format!("ID_{value}"),
        })
    }

    pub fn value(&self) -> Weight {
        self.value
    }

    /// Column label in the form `ID_<value>`
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn from_values(values: &[Weight]) -> Result<Vec<Self>, Error> {
        values.iter().map(|&value| Self::new(value)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn threshold_labels_use_shortest_display() {
        let thresholds = DistanceThreshold::from_values(&[5.0, 20.0, 2.5]).unwrap();
        let labels: Vec<_> = thresholds.iter().map(DistanceThreshold::label).collect();
        assert_eq!(labels, ["ID_5", "ID_20", "ID_2.5"]);
    }

    #[test]
    fn non_positive_threshold_is_rejected() {
        assert!(matches!(
            DistanceThreshold::new(0.0),
            Err(Error::ConfigurationError(_))
        ));
        assert!(DistanceThreshold::new(f64::NAN).is_err());
        assert!(DistanceThreshold::new(-3.0).is_err());
    }

    #[test]
    fn distance_type_parsing() {
        assert_eq!("length".parse::<DistanceType>().unwrap(), DistanceType::Length);
        assert_eq!("Time".parse::<DistanceType>().unwrap(), DistanceType::Time);
        assert!(matches!(
            "bicycle".parse::<DistanceType>(),
            Err(Error::ConfigurationError(_))
        ));
    }

    #[test]
    fn weight_selection_per_distance_type() {
        let weights = EdgeWeights::from_speed(100.0, 36.0);
        assert_eq!(DistanceType::Length.weight(&weights), Some(100.0));
        assert!((DistanceType::Time.weight(&weights).unwrap() - 10.0).abs() < 1e-9);
        assert_eq!(DistanceType::Time.weight(&EdgeWeights::length(1.0)), None);
    }

    #[test]
    fn negative_weights_are_malformed() {
        assert!(EdgeWeights::length(-1.0).validate().is_err());
        assert!(EdgeWeights::new(1.0, f64::INFINITY).validate().is_err());
        assert!(EdgeWeights::new(0.0, 0.0).validate().is_ok());
    }
}
