//! Buffering and dissolving of reachable network parts into one region

mod shapes;
mod union;

use geo::{Buffer, Coord, LineString, MultiPolygon, Polygon};
use log::trace;

use crate::Error;

pub use shapes::{clip_line, disk, line_length};
pub use union::{GeoUnion, PolygonUnion};

/// Vertex count of the regular polygon approximating a node disk
pub const DEFAULT_DISK_SEGMENTS: usize = 64;

/// Buffers every node and edge and dissolves them into a single region
/// using the default [`GeoUnion`].
///
/// # Errors
///
/// [`Error::InvalidParameter`] for negative radii, [`Error::GeometryError`]
/// if the union cannot be computed.
pub fn build_polygon(
    node_coordinates: &[Coord<f64>],
    edge_geometries: &[LineString<f64>],
    node_buffer: f64,
    edge_buffer: f64,
) -> Result<MultiPolygon<f64>, Error> {
    build_polygon_with(
        node_coordinates,
        edge_geometries,
        node_buffer,
        edge_buffer,
        DEFAULT_DISK_SEGMENTS,
        &GeoUnion::default(),
    )
}

/// [`build_polygon`] with an explicit disk resolution and union backend
pub fn build_polygon_with<U: PolygonUnion + ?Sized>(
    node_coordinates: &[Coord<f64>],
    edge_geometries: &[LineString<f64>],
    node_buffer: f64,
    edge_buffer: f64,
    disk_segments: usize,
    union: &U,
) -> Result<MultiPolygon<f64>, Error> {
    validate_radius("node buffer", node_buffer)?;
    validate_radius("edge buffer", edge_buffer)?;

    let finite = |c: &Coord<f64>| c.x.is_finite() && c.y.is_finite();
    if !node_coordinates.iter().all(finite)
        || !edge_geometries.iter().all(|line| line.0.iter().all(finite))
    {
        return Err(Error::GeometryError(
            "cannot buffer non-finite coordinates".to_string(),
        ));
    }

    let mut parts: Vec<Polygon<f64>> = Vec::new();

    if node_buffer > 0.0 {
        parts.extend(
            node_coordinates
                .iter()
                .map(|&center| disk(center, node_buffer, disk_segments)),
        );
    }

    if edge_buffer > 0.0 {
        for line in edge_geometries {
            match line.0.first() {
                None => {}
                Some(&start) if line_length(line) == 0.0 => {
                    parts.push(disk(start, edge_buffer, disk_segments));
                }
                Some(_) => parts.extend(line.buffer(edge_buffer)),
            }
        }
    }

    trace!(
        "Dissolving {} buffered parts ({} nodes, {} edges)",
        parts.len(),
        node_coordinates.len(),
        edge_geometries.len()
    );

    if parts.is_empty() {
        return Ok(MultiPolygon::new(Vec::new()));
    }
    union.union(&parts)
}

fn validate_radius(name: &str, radius: f64) -> Result<(), Error> {
    if radius.is_finite() && radius >= 0.0 {
        Ok(())
    } else {
        Err(Error::InvalidParameter(format!(
            "{name} must be a finite non-negative number, got {radius}"
        )))
    }
}
