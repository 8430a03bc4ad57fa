//! Isopolygons for many query points and distance thresholds.
//!
//! Every query point is snapped to its nearest network node, one traversal
//! serves all thresholds of that point, and each reachable subgraph is
//! buffered into a polygon. Points are processed in parallel; the table keeps
//! input order for rows and threshold order for columns.

use std::fmt;
use std::time::{Duration, Instant};

use geo::{Coord, MultiPolygon, Point};
use log::{debug, info, warn};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::geometry::{DEFAULT_DISK_SEGMENTS, GeoUnion, PolygonUnion, build_polygon_with};
use crate::routing::ego_subgraphs_until;
use crate::{
    DEFAULT_EDGE_BUFFER, DEFAULT_NODE_BUFFER, DistanceThreshold, DistanceType, Error,
    SpatialGraphIndex, Weight,
};

/// Parameters of an isopolygon batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IsopolygonConfig {
    pub distance_type: DistanceType,
    /// Disk radius around reached nodes and the query point, in coordinate units
    pub node_buffer: f64,
    /// Corridor half-width around reached edges, in coordinate units
    pub edge_buffer: f64,
    pub disk_segments: usize,
    /// Grid size used when a union has to be retried
    pub snap_tolerance: f64,
    /// Wall-clock budget per query point
    pub point_timeout_ms: Option<u64>,
}

impl Default for IsopolygonConfig {
    fn default() -> Self {
        Self {
            distance_type: DistanceType::Length,
            node_buffer: DEFAULT_NODE_BUFFER,
            edge_buffer: DEFAULT_EDGE_BUFFER,
            disk_segments: DEFAULT_DISK_SEGMENTS,
            snap_tolerance: GeoUnion::DEFAULT_SNAP_TOLERANCE,
            point_timeout_ms: None,
        }
    }
}

impl IsopolygonConfig {
    pub fn new(distance_type: DistanceType, node_buffer: f64, edge_buffer: f64) -> Self {
        Self {
            distance_type,
            node_buffer,
            edge_buffer,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_point_timeout(mut self, timeout: Duration) -> Self {
        self.point_timeout_ms = Some(u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX));
        self
    }

    pub fn point_timeout(&self) -> Option<Duration> {
        self.point_timeout_ms.map(Duration::from_millis)
    }

    /// Checks everything that would make the whole batch meaningless
    pub fn validate(&self, index: &SpatialGraphIndex) -> Result<(), Error> {
        index.ensure_supported(self.distance_type)?;

        for (name, value) in [
            ("node_buffer", self.node_buffer),
            ("edge_buffer", self.edge_buffer),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(Error::ConfigurationError(format!(
                    "{name} must be finite and non-negative, got {value}"
                )));
            }
        }

        if self.disk_segments < 3 {
            return Err(Error::ConfigurationError(format!(
                "disk_segments must be at least 3, got {}",
                self.disk_segments
            )));
        }

        if !self.snap_tolerance.is_finite() || self.snap_tolerance <= 0.0 {
            return Err(Error::ConfigurationError(format!(
                "snap_tolerance must be positive, got {}",
                self.snap_tolerance
            )));
        }

        Ok(())
    }
}

/// Location to compute isopolygons for, e.g. a facility
#[derive(Debug, Clone, PartialEq)]
pub struct QueryPoint {
    pub coordinate: Coord<f64>,
    pub id: Option<String>,
}

impl QueryPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            coordinate: Coord { x, y },
            id: None,
        }
    }

    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
}

impl From<Point<f64>> for QueryPoint {
    fn from(point: Point<f64>) -> Self {
        Self::new(point.x(), point.y())
    }
}

/// Ordered collection of query points, one table row each
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryPoints(pub Vec<QueryPoint>);

impl QueryPoints {
    pub fn from_pairs(pairs: &[(f64, f64)]) -> Self {
        Self(pairs.iter().map(|&(x, y)| QueryPoint::new(x, y)).collect())
    }

    /// Points from parallel x and y sequences
    pub fn from_columns(xs: &[f64], ys: &[f64]) -> Result<Self, Error> {
        if xs.len() != ys.len() {
            return Err(Error::ConfigurationError(format!(
                "coordinate columns differ in length: {} x values, {} y values",
                xs.len(),
                ys.len()
            )));
        }
        Ok(Self(
            xs.iter()
                .zip(ys)
                .map(|(&x, &y)| QueryPoint::new(x, y))
                .collect(),
        ))
    }

    pub fn single(x: f64, y: f64) -> Self {
        Self(vec![QueryPoint::new(x, y)])
    }

    /// Attaches identifiers in point order
    pub fn with_ids<S: Into<String>>(mut self, ids: Vec<S>) -> Result<Self, Error> {
        if ids.len() != self.0.len() {
            return Err(Error::ConfigurationError(format!(
                "{} ids given for {} points",
                ids.len(),
                self.0.len()
            )));
        }
        for (point, id) in self.0.iter_mut().zip(ids) {
            point.id = Some(id.into());
        }
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, QueryPoint> {
        self.0.iter()
    }
}

impl From<Vec<QueryPoint>> for QueryPoints {
    fn from(points: Vec<QueryPoint>) -> Self {
        Self(points)
    }
}

impl From<QueryPoint> for QueryPoints {
    fn from(point: QueryPoint) -> Self {
        Self(vec![point])
    }
}

impl From<Point<f64>> for QueryPoints {
    fn from(point: Point<f64>) -> Self {
        Self(vec![point.into()])
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DiagnosticKind {
    /// The point could not be snapped to the network
    NoReachableNode,
    /// Buffering or union failed even after snapping
    GeometryError(String),
    /// The per-point time budget ran out before the cell was built
    TimedOut,
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiagnosticKind::NoReachableNode => f.write_str("no reachable node"),
            DiagnosticKind::GeometryError(reason) => write!(f, "geometry error: {reason}"),
            DiagnosticKind::TimedOut => f.write_str("timed out"),
        }
    }
}

/// Record of a cell (or whole row) that degraded to an empty geometry
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub row: usize,
    /// `None` when the whole row is affected
    pub column: Option<usize>,
    pub kind: DiagnosticKind,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.column {
            Some(column) => write!(f, "row {}, column {}: {}", self.row, column, self.kind),
            None => write!(f, "row {}: {}", self.row, self.kind),
        }
    }
}

/// Isopolygons indexed by (query point, threshold)
#[derive(Debug, Clone)]
pub struct IsopolygonTable {
    thresholds: Vec<DistanceThreshold>,
    point_ids: Vec<Option<String>>,
    cells: Vec<Vec<MultiPolygon<f64>>>,
    diagnostics: Vec<Diagnostic>,
}

type RowResult = (Vec<MultiPolygon<f64>>, Vec<Diagnostic>);

impl IsopolygonTable {
    /// Computes the table with default disk resolution and union backend
    ///
    /// # Errors
    ///
    /// Configuration problems (unsupported distance type, invalid buffers or
    /// thresholds) abort before any point is processed. Per point problems
    /// only empty the affected cells, see [`IsopolygonTable::diagnostics`].
    pub fn compute(
        points: &QueryPoints,
        distance_type: DistanceType,
        thresholds: &[Weight],
        index: &SpatialGraphIndex,
        node_buffer: f64,
        edge_buffer: f64,
    ) -> Result<Self, Error> {
        let config = IsopolygonConfig::new(distance_type, node_buffer, edge_buffer);
        Self::compute_with_config(points, thresholds, index, &config)
    }

    pub fn compute_with_config(
        points: &QueryPoints,
        thresholds: &[Weight],
        index: &SpatialGraphIndex,
        config: &IsopolygonConfig,
    ) -> Result<Self, Error> {
        let union = GeoUnion::new(config.snap_tolerance);
        Self::compute_with_union(points, thresholds, index, config, &union)
    }

    pub fn compute_with_union<U: PolygonUnion + ?Sized>(
        points: &QueryPoints,
        thresholds: &[Weight],
        index: &SpatialGraphIndex,
        config: &IsopolygonConfig,
        union: &U,
    ) -> Result<Self, Error> {
        config.validate(index)?;
        let thresholds = DistanceThreshold::from_values(thresholds)?;
        let values = thresholds
            .iter()
            .map(DistanceThreshold::value)
            .collect::<Vec<_>>();

        info!(
            "Computing isopolygons for {} points and {} thresholds by {}",
            points.len(),
            values.len(),
            config.distance_type
        );

        let rows = points
            .0
            .par_iter()
            .enumerate()
            .map(|(row, point)| compute_row(row, point, &values, index, config, union))
            .collect::<Result<Vec<RowResult>, Error>>()?;

        let mut cells = Vec::with_capacity(rows.len());
        let mut diagnostics = Vec::new();
        for (row_cells, row_diagnostics) in rows {
            cells.push(row_cells);
            diagnostics.extend(row_diagnostics);
        }

        if diagnostics.is_empty() {
            info!("Isopolygon table complete");
        } else {
            warn!(
                "Isopolygon table complete with {} degraded entries",
                diagnostics.len()
            );
        }

        Ok(Self {
            thresholds,
            point_ids: points.iter().map(|point| point.id.clone()).collect(),
            cells,
            diagnostics,
        })
    }

    /// (rows, columns)
    pub fn shape(&self) -> (usize, usize) {
        (self.cells.len(), self.thresholds.len())
    }

    /// Column labels, `ID_<threshold>`
    pub fn columns(&self) -> Vec<&str> {
        self.thresholds.iter().map(DistanceThreshold::label).collect()
    }

    pub fn thresholds(&self) -> &[DistanceThreshold] {
        &self.thresholds
    }

    pub fn point_ids(&self) -> &[Option<String>] {
        &self.point_ids
    }

    pub fn cell(&self, row: usize, column: usize) -> Option<&MultiPolygon<f64>> {
        self.cells.get(row)?.get(column)
    }

    /// Cell by column label
    pub fn get(&self, row: usize, label: &str) -> Option<&MultiPolygon<f64>> {
        let column = self
            .thresholds
            .iter()
            .position(|threshold| threshold.label() == label)?;
        self.cell(row, column)
    }

    pub fn row(&self, row: usize) -> Option<&[MultiPolygon<f64>]> {
        self.cells.get(row).map(Vec::as_slice)
    }

    pub fn rows(&self) -> impl Iterator<Item = &[MultiPolygon<f64>]> {
        self.cells.iter().map(Vec::as_slice)
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn is_complete(&self) -> bool {
        self.diagnostics.is_empty()
    }
}

/// Computes isopolygons for `points` as configured
pub fn calculate_isopolygons(
    index: &SpatialGraphIndex,
    points: &QueryPoints,
    thresholds: &[Weight],
    config: &IsopolygonConfig,
) -> Result<IsopolygonTable, Error> {
    IsopolygonTable::compute_with_config(points, thresholds, index, config)
}

fn compute_row<U: PolygonUnion + ?Sized>(
    row: usize,
    point: &QueryPoint,
    thresholds: &[Weight],
    index: &SpatialGraphIndex,
    config: &IsopolygonConfig,
    union: &U,
) -> Result<RowResult, Error> {
    let empty = || MultiPolygon::new(Vec::new());
    let deadline = config.point_timeout().map(|timeout| Instant::now() + timeout);

    let source = match index.nearest_index(point.coordinate) {
        Ok(source) => source,
        Err(err) => {
            warn!("Point {row} at {:?}: {err}", point.coordinate);
            let diagnostic = Diagnostic {
                row,
                column: None,
                kind: DiagnosticKind::NoReachableNode,
            };
            return Ok((vec![empty(); thresholds.len()], vec![diagnostic]));
        }
    };
    debug!("Point {row} snapped to node {}", index.node_id(source));

    let subgraphs =
        ego_subgraphs_until(index, source, config.distance_type, thresholds, deadline)?;

    let mut cells = Vec::with_capacity(thresholds.len());
    let mut diagnostics = Vec::new();

    for (column, subgraph) in subgraphs.into_iter().enumerate() {
        let expired = deadline.is_some_and(|limit| Instant::now() >= limit);
        let Some(subgraph) = subgraph.filter(|_| !expired) else {
            cells.push(empty());
            diagnostics.push(Diagnostic {
                row,
                column: Some(column),
                kind: DiagnosticKind::TimedOut,
            });
            continue;
        };

        // The query point itself is always part of its isopolygon
        let mut nodes = subgraph.node_coordinates(index);
        nodes.push(point.coordinate);
        let edges = subgraph.edge_geometries(index);

        match build_polygon_with(
            &nodes,
            &edges,
            config.node_buffer,
            config.edge_buffer,
            config.disk_segments,
            union,
        ) {
            Ok(polygon) => cells.push(polygon),
            Err(err) => {
                warn!("Point {row}, threshold {}: {err}", thresholds[column]);
                cells.push(empty());
                diagnostics.push(Diagnostic {
                    row,
                    column: Some(column),
                    kind: DiagnosticKind::GeometryError(err.to_string()),
                });
            }
        }
    }

    Ok((cells, diagnostics))
}
