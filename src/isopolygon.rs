use pisa_core::prelude::*;
use pyo3::prelude::*;
use rayon::prelude::*;
use wkt::ToWkt;

use crate::network::PySpatialNetwork;
use crate::to_py_err;

/// Coordinate input: a sequence or a single scalar (one point)
#[derive(FromPyObject)]
pub enum Coordinates {
    Many(Vec<f64>),
    One(f64),
}

#[cfg(feature = "stubgen")]
pyo3_stub_gen::impl_stub_type!(Coordinates = Vec<f64> | f64);

impl Coordinates {
    fn into_vec(self) -> Vec<f64> {
        match self {
            Coordinates::Many(values) => values,
            Coordinates::One(value) => vec![value],
        }
    }
}

/// Facility locations as received from Python
enum Facilities {
    Columns(Coordinates, Coordinates),
    Pairs(Vec<(f64, f64)>),
}

impl Facilities {
    fn into_query_points(self) -> Result<QueryPoints, Error> {
        match self {
            Facilities::Columns(x, y) => QueryPoints::from_columns(&x.into_vec(), &y.into_vec()),
            Facilities::Pairs(pairs) => Ok(QueryPoints::from_pairs(&pairs)),
        }
    }
}

/// IsopolygonTable
///
/// One row per facility (input order) and one column per distance
/// threshold, labelled ``ID_<threshold>``. Cells are polygons or
/// multipolygons, empty when the cell could not be computed; the reasons are
/// listed by ``diagnostics()``.
#[cfg_attr(feature = "stubgen", pyo3_stub_gen::derive::gen_stub_pyclass)]
#[pyclass(name = "IsopolygonTable")]
pub struct PyIsopolygonTable {
    inner: IsopolygonTable,
}

#[cfg_attr(feature = "stubgen", pyo3_stub_gen::derive::gen_stub_pymethods)]
#[pymethods]
impl PyIsopolygonTable {
    #[getter]
    pub fn shape(&self) -> (usize, usize) {
        self.inner.shape()
    }

    #[getter]
    pub fn columns(&self) -> Vec<String> {
        self.inner
            .columns()
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    /// Cells as WKT strings, row by row
    pub fn to_wkt(&self, py: Python<'_>) -> Vec<Vec<String>> {
        py.detach(|| {
            self.inner
                .rows()
                .collect::<Vec<_>>()
                .par_iter()
                .map(|cells| {
                    cells
                        .iter()
                        .map(|cell| cell.to_wkt().to_string())
                        .collect()
                })
                .collect()
        })
    }

    /// WKT of the cell in `row` under column `label`
    pub fn cell_wkt(&self, row: usize, label: &str) -> PyResult<String> {
        self.inner
            .get(row, label)
            .map(|cell| cell.to_wkt().to_string())
            .ok_or_else(|| {
                PyErr::new::<pyo3::exceptions::PyKeyError, _>(format!(
                    "No cell at row {row}, column {label}"
                ))
            })
    }

    /// GeoJSON FeatureCollection with one feature per cell
    pub fn to_geojson(&self) -> PyResult<String> {
        self.inner
            .to_geojson_string()
            .map_err(|e| to_py_err("Failed to export GeoJSON", e))
    }

    /// ``(row, column or None, message)`` for every degraded cell or row
    pub fn diagnostics(&self) -> Vec<(usize, Option<usize>, String)> {
        self.inner
            .diagnostics()
            .iter()
            .map(|d| (d.row, d.column, d.kind.to_string()))
            .collect()
    }

    /// Population covered by each cell, from weighted points
    pub fn served_population(
        &self,
        py: Python<'_>,
        x: Vec<f64>,
        y: Vec<f64>,
        population: Vec<f64>,
    ) -> PyResult<Vec<Vec<f64>>> {
        if x.len() != y.len() || x.len() != population.len() {
            return Err(PyErr::new::<pyo3::exceptions::PyValueError, _>(format!(
                "x, y and population differ in length ({}, {}, {})",
                x.len(),
                y.len(),
                population.len()
            )));
        }

        py.detach(|| {
            let points = x
                .iter()
                .zip(&y)
                .zip(&population)
                .map(|((&x, &y), &count)| PopulationPoint::new(x, y, count))
                .collect();
            let index = PopulationIndex::new(points)
                .map_err(|e| to_py_err("Invalid population data", e))?;
            Ok(index.served_population(&self.inner))
        })
    }

    fn __repr__(&self) -> String {
        let (rows, columns) = self.inner.shape();
        format!(
            "IsopolygonTable with {rows} rows, {columns} columns and {} diagnostics",
            self.inner.diagnostics().len()
        )
    }
}

/// Calculate isopolygons around facilities over a street network
///
/// Parameters
/// ----------
/// network : SpatialNetwork
///     Network to travel on
/// x, y : list[float] | float
///     Facility coordinates, in the network's coordinate reference
/// distance_type : str
///     ``"length"`` or ``"time"``
/// distance_values : list[float]
///     Positive network distance thresholds, ascending
/// node_buff : float, default=0.001
///     Radius of the disk drawn around reached nodes and the facility
/// edge_buff : float, default=0.0005
///     Half-width of the corridor drawn around reached edges
/// timeout_ms : int, optional
///     Time budget per facility; unfinished cells are left empty
///
/// Returns
/// -------
/// IsopolygonTable
///
/// Raises
/// ------
/// ValueError
///     If the distance type, buffers or thresholds are invalid
#[cfg_attr(feature = "stubgen", pyo3_stub_gen::derive::gen_stub_pyfunction)]
#[pyfunction]
#[pyo3(signature = (
    network,
    x,
    y,
    distance_type,
    distance_values,
    node_buff=DEFAULT_NODE_BUFFER,
    edge_buff=DEFAULT_EDGE_BUFFER,
    timeout_ms=None
))]
#[allow(clippy::too_many_arguments)]
pub fn calculate_isopolygons(
    py: Python<'_>,
    network: &PySpatialNetwork,
    x: Coordinates,
    y: Coordinates,
    distance_type: &str,
    distance_values: Vec<f64>,
    node_buff: f64,
    edge_buff: f64,
    timeout_ms: Option<u64>,
) -> PyResult<PyIsopolygonTable> {
    run_isopolygons(
        py,
        network,
        Facilities::Columns(x, y),
        distance_type,
        &distance_values,
        node_buff,
        edge_buff,
        timeout_ms,
    )
}

/// Calculate isopolygons around facilities given as ``(x, y)`` pairs
///
/// Same as ``calculate_isopolygons`` with the facility coordinates passed
/// as one sequence of pairs instead of two columns.
#[cfg_attr(feature = "stubgen", pyo3_stub_gen::derive::gen_stub_pyfunction)]
#[pyfunction]
#[pyo3(signature = (
    network,
    points,
    distance_type,
    distance_values,
    node_buff=DEFAULT_NODE_BUFFER,
    edge_buff=DEFAULT_EDGE_BUFFER,
    timeout_ms=None
))]
#[allow(clippy::too_many_arguments)]
pub fn calculate_isopolygons_from_pairs(
    py: Python<'_>,
    network: &PySpatialNetwork,
    points: Vec<(f64, f64)>,
    distance_type: &str,
    distance_values: Vec<f64>,
    node_buff: f64,
    edge_buff: f64,
    timeout_ms: Option<u64>,
) -> PyResult<PyIsopolygonTable> {
    run_isopolygons(
        py,
        network,
        Facilities::Pairs(points),
        distance_type,
        &distance_values,
        node_buff,
        edge_buff,
        timeout_ms,
    )
}

#[allow(clippy::too_many_arguments)]
fn run_isopolygons(
    py: Python<'_>,
    network: &PySpatialNetwork,
    facilities: Facilities,
    distance_type: &str,
    distance_values: &[f64],
    node_buff: f64,
    edge_buff: f64,
    timeout_ms: Option<u64>,
) -> PyResult<PyIsopolygonTable> {
    let distance_type = distance_type
        .parse::<DistanceType>()
        .map_err(|e| to_py_err("Invalid distance type", e))?;
    let points = facilities
        .into_query_points()
        .map_err(|e| to_py_err("Invalid facility coordinates", e))?;

    let mut config = IsopolygonConfig::new(distance_type, node_buff, edge_buff);
    config.point_timeout_ms = timeout_ms;

    py.detach(|| {
        let table =
            pisa_core::calculate_isopolygons(&network.index, &points, distance_values, &config)
                .map_err(|e| to_py_err("Failed to calculate isopolygons", e))?;

        Ok(PyIsopolygonTable { inner: table })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pairs_and_columns_give_same_points() {
        let pairs = Facilities::Pairs(vec![(1.0, 2.0), (3.0, 4.0)])
            .into_query_points()
            .unwrap();
        let columns = Facilities::Columns(
            Coordinates::Many(vec![1.0, 3.0]),
            Coordinates::Many(vec![2.0, 4.0]),
        )
        .into_query_points()
        .unwrap();

        assert_eq!(pairs, columns);
    }

    #[test]
    fn scalar_columns_give_one_point() {
        let points = Facilities::Columns(Coordinates::One(1.0), Coordinates::One(2.0))
            .into_query_points()
            .unwrap();
        assert_eq!(points, QueryPoints::single(1.0, 2.0));
    }

    #[test]
    fn mismatched_columns_are_rejected() {
        let result = Facilities::Columns(
            Coordinates::Many(vec![1.0, 3.0]),
            Coordinates::Many(vec![2.0]),
        )
        .into_query_points();
        assert!(matches!(result, Err(Error::ConfigurationError(_))));
    }

    #[test]
    fn empty_pairs_give_no_rows() {
        let points = Facilities::Pairs(Vec::new()).into_query_points().unwrap();
        assert!(points.is_empty());
    }
}
