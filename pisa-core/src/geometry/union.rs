use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use geo::{
    Coord, CoordsIter, MapCoords, MultiPolygon, Polygon, RemoveRepeatedPoints, unary_union,
};
use log::warn;

use crate::Error;

/// Dissolves polygons into their union.
///
/// Traversal and buffering code only talk to this trait, so the boolean
/// operations backend can be swapped.
pub trait PolygonUnion: Send + Sync {
    fn union(&self, polygons: &[Polygon<f64>]) -> Result<MultiPolygon<f64>, Error>;
}

/// Union through `geo`'s boolean operations.
///
/// A failed union is retried once with all coordinates snapped to a grid of
/// `snap_tolerance`.
#[derive(Debug, Clone, Copy)]
pub struct GeoUnion {
    pub snap_tolerance: f64,
}

impl GeoUnion {
    pub const DEFAULT_SNAP_TOLERANCE: f64 = 1e-9;

    pub fn new(snap_tolerance: f64) -> Self {
        Self { snap_tolerance }
    }
}

impl Default for GeoUnion {
    fn default() -> Self {
        Self::new(Self::DEFAULT_SNAP_TOLERANCE)
    }
}

impl PolygonUnion for GeoUnion {
    fn union(&self, polygons: &[Polygon<f64>]) -> Result<MultiPolygon<f64>, Error> {
        if polygons.is_empty() {
            return Ok(MultiPolygon::new(Vec::new()));
        }
        if !polygons.iter().all(|p| all_finite(p.coords_iter())) {
            return Err(Error::GeometryError(
                "non-finite coordinate in union input".to_string(),
            ));
        }

        match dissolve(polygons) {
            Ok(result) => Ok(result),
            Err(reason) => {
                warn!(
                    "Union of {} polygons failed ({reason}), retrying with snapping tolerance {}",
                    polygons.len(),
                    self.snap_tolerance
                );
                let snapped = snap_to_grid(polygons, self.snap_tolerance);
                dissolve(&snapped).map_err(|reason| {
                    Error::GeometryError(format!(
                        "union failed after snapping to {}: {reason}",
                        self.snap_tolerance
                    ))
                })
            }
        }
    }
}

fn dissolve(polygons: &[Polygon<f64>]) -> Result<MultiPolygon<f64>, String> {
    let result = panic::catch_unwind(AssertUnwindSafe(|| unary_union(polygons)))
        .map_err(|payload| panic_message(payload.as_ref()))?;

    if all_finite(result.coords_iter()) {
        Ok(result)
    } else {
        Err("non-finite coordinate in union result".to_string())
    }
}

fn snap_to_grid(polygons: &[Polygon<f64>], tolerance: f64) -> Vec<Polygon<f64>> {
    if tolerance <= 0.0 {
        return polygons.to_vec();
    }

    polygons
        .iter()
        .map(|polygon| {
            polygon
                .map_coords(|c| Coord {
                    x: (c.x / tolerance).round() * tolerance,
                    y: (c.y / tolerance).round() * tolerance,
                })
                .remove_repeated_points()
        })
        // collapsed rings cannot contribute area
        .filter(|polygon| polygon.exterior().0.len() >= 4)
        .collect()
}

fn all_finite(mut coords: impl Iterator<Item = Coord<f64>>) -> bool {
    coords.all(|c| c.x.is_finite() && c.y.is_finite())
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "boolean operation panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use geo::{Area, polygon};

    use super::*;

    #[test]
    fn overlapping_squares_merge() {
        let a = polygon![(x: 0.0, y: 0.0), (x: 2.0, y: 0.0), (x: 2.0, y: 2.0), (x: 0.0, y: 2.0)];
        let b = polygon![(x: 1.0, y: 1.0), (x: 3.0, y: 1.0), (x: 3.0, y: 3.0), (x: 1.0, y: 3.0)];

        let merged = GeoUnion::default().union(&[a, b]).unwrap();
        assert_eq!(merged.0.len(), 1);
        assert!((merged.unsigned_area() - 7.0).abs() < 1e-9);
    }

    #[test]
    fn duplicate_and_collinear_points_are_tolerated() {
        let a = polygon![
            (x: 0.0, y: 0.0), (x: 1.0, y: 0.0), (x: 1.0, y: 0.0), (x: 2.0, y: 0.0),
            (x: 2.0, y: 2.0), (x: 0.0, y: 2.0)
        ];
        let merged = GeoUnion::default().union(&[a.clone(), a]).unwrap();
        assert!((merged.unsigned_area() - 4.0).abs() < 1e-9);
    }

    #[test]
    fn snapping_removes_collapsed_rings() {
        let sliver = polygon![(x: 0.0, y: 0.0), (x: 1e-12, y: 0.0), (x: 1e-12, y: 1e-12)];
        assert!(snap_to_grid(&[sliver], 1e-9).is_empty());
    }

    #[test]
    fn empty_input_gives_empty_union() {
        assert!(GeoUnion::default().union(&[]).unwrap().0.is_empty());
    }
}
