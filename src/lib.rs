use pyo3::prelude::*;

use isopolygon::{PyIsopolygonTable, calculate_isopolygons, calculate_isopolygons_from_pairs};
use network::{PySpatialNetwork, load_network, network_from_records};

pub mod isopolygon;
pub mod network;

/// A Python module implemented in Rust.
#[pymodule]
fn pisa(m: &Bound<'_, PyModule>) -> PyResult<()> {
    pyo3_log::init();

    m.add_class::<PySpatialNetwork>()?;
    m.add_function(wrap_pyfunction!(load_network, m)?)?;
    m.add_function(wrap_pyfunction!(network_from_records, m)?)?;

    m.add_class::<PyIsopolygonTable>()?;
    m.add_function(wrap_pyfunction!(calculate_isopolygons, m)?)?;
    m.add_function(wrap_pyfunction!(calculate_isopolygons_from_pairs, m)?)?;
    Ok(())
}

/// Maps core errors to Python exceptions: bad input becomes `ValueError`,
/// everything else `RuntimeError`.
pub(crate) fn to_py_err(context: &str, err: pisa_core::Error) -> PyErr {
    use pisa_core::Error;

    let message = format!("{context}: {err}");
    match err {
        Error::ConfigurationError(_)
        | Error::InvalidParameter(_)
        | Error::InvalidData(_)
        | Error::UnknownNode(_) => PyErr::new::<pyo3::exceptions::PyValueError, _>(message),
        _ => PyErr::new::<pyo3::exceptions::PyRuntimeError, _>(message),
    }
}

#[cfg(feature = "stubgen")]
pyo3_stub_gen::define_stub_info_gatherer!(stub_info);
