use geo::Coord;
use pisa_core::loading::{EdgeRecord, NodeRecord};
use pisa_core::prelude::*;
use pyo3::prelude::*;

use crate::to_py_err;

/// SpatialNetwork
///
/// Immutable weighted street network with a spatial index over its nodes.
/// Built once, then shared by every isopolygon computation.
///
/// Example:
///
/// .. code-block:: python
///
///     network = load_network("nodes.csv", "edges.csv", default_speed_kph=4.5)
///     table = calculate_isopolygons(network, xs, ys, "length", [500, 1000])
#[cfg_attr(feature = "stubgen", pyo3_stub_gen::derive::gen_stub_pyclass)]
#[pyclass(name = "SpatialNetwork")]
pub struct PySpatialNetwork {
    pub(crate) index: SpatialGraphIndex,
}

#[cfg_attr(feature = "stubgen", pyo3_stub_gen::derive::gen_stub_pymethods)]
#[pymethods]
impl PySpatialNetwork {
    pub fn node_count(&self) -> usize {
        self.index.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.index.edge_count()
    }

    /// Whether every edge has a weight for `distance_type` ("length" or "time")
    pub fn supports(&self, distance_type: &str) -> PyResult<bool> {
        let distance_type = distance_type
            .parse::<DistanceType>()
            .map_err(|e| to_py_err("Invalid distance type", e))?;
        Ok(self.index.supports(distance_type))
    }

    /// Id of the node closest to (x, y)
    pub fn nearest_node(&self, x: f64, y: f64) -> PyResult<NodeId> {
        self.index
            .nearest_node(Coord { x, y })
            .map_err(|e| to_py_err("Failed to locate nearest node", e))
    }

    fn __repr__(&self) -> String {
        format!(
            "SpatialNetwork with {} nodes and {} edges",
            self.index.node_count(),
            self.index.edge_count()
        )
    }

    fn __str__(&self) -> String {
        self.__repr__()
    }
}

/// Load a network from node and edge CSV tables
///
/// Parameters
/// ----------
/// nodes_path : str
///     CSV with ``id,x,y`` columns
/// edges_path : str
///     CSV with ``u,v,length`` columns and optional ``time`` and ``geometry`` (WKT)
/// default_speed_kph : float, optional
///     Speed used to derive ``time`` weights where the table has none
///
/// Raises
/// ------
/// ValueError
///     If the tables describe a malformed network
/// RuntimeError
///     If the tables cannot be read
#[cfg_attr(feature = "stubgen", pyo3_stub_gen::derive::gen_stub_pyfunction)]
#[pyfunction]
#[pyo3(signature = (nodes_path, edges_path, default_speed_kph=None))]
pub fn load_network(
    py: Python<'_>,
    nodes_path: &str,
    edges_path: &str,
    default_speed_kph: Option<f64>,
) -> PyResult<PySpatialNetwork> {
    let mut config = NetworkConfig::new(nodes_path, edges_path);
    config.default_speed_kph = default_speed_kph;

    py.detach(|| {
        let index =
            create_spatial_graph(&config).map_err(|e| to_py_err("Failed to load network", e))?;
        Ok(PySpatialNetwork { index })
    })
}

/// Build a network from in-memory records
///
/// Parameters
/// ----------
/// nodes : list[tuple[int, float, float]]
///     ``(id, x, y)`` per node
/// edges : list[tuple[int, int, float, float | None, str | None]]
///     ``(u, v, length, time, wkt_geometry)`` per edge
/// default_speed_kph : float, optional
///     Speed used to derive missing ``time`` weights
#[cfg_attr(feature = "stubgen", pyo3_stub_gen::derive::gen_stub_pyfunction)]
#[pyfunction]
#[pyo3(signature = (nodes, edges, default_speed_kph=None))]
#[allow(clippy::type_complexity)]
pub fn network_from_records(
    py: Python<'_>,
    nodes: Vec<(NodeId, f64, f64)>,
    edges: Vec<(NodeId, NodeId, f64, Option<f64>, Option<String>)>,
    default_speed_kph: Option<f64>,
) -> PyResult<PySpatialNetwork> {
    py.detach(|| {
        let nodes = nodes
            .into_iter()
            .map(|(id, x, y)| NodeRecord { id, x, y })
            .collect();
        let edges = edges
            .into_iter()
            .map(|(u, v, length, time, geometry)| EdgeRecord {
                u,
                v,
                length,
                time,
                geometry,
            })
            .collect();

        let index = pisa_core::loading::network_from_records(nodes, edges, default_speed_kph)
            .map_err(|e| to_py_err("Failed to build network", e))?;
        Ok(PySpatialNetwork { index })
    })
}
