//! Population covered by isopolygons.
//!
//! Population grids are reduced to weighted points (e.g. raster cell
//! centroids); a cell of the isopolygon table serves every point it covers.

use geo::{BoundingRect, Intersects, MultiPolygon, Point};
use log::info;
use rayon::prelude::*;
use rstar::{AABB, RTree, primitives::GeomWithData};

use crate::{Error, IsopolygonTable};

/// Population count located at a point
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PopulationPoint {
    pub geometry: Point<f64>,
    pub population: f64,
}

impl PopulationPoint {
    pub fn new(x: f64, y: f64, population: f64) -> Self {
        Self {
            geometry: Point::new(x, y),
            population,
        }
    }
}

type IndexedPopulation = GeomWithData<[f64; 2], f64>;

/// R-tree over population points
#[derive(Debug, Clone)]
pub struct PopulationIndex {
    rtree: RTree<IndexedPopulation>,
    total: f64,
}

impl PopulationIndex {
    pub fn new(points: Vec<PopulationPoint>) -> Result<Self, Error> {
        let entries = points
            .into_iter()
            .map(|point| {
                let (x, y) = point.geometry.x_y();
                if !x.is_finite() || !y.is_finite() {
                    return Err(Error::InvalidData(format!(
                        "population point has non-finite coordinates ({x}, {y})"
                    )));
                }
                if !point.population.is_finite() || point.population < 0.0 {
                    return Err(Error::InvalidData(format!(
                        "population at ({x}, {y}) must be non-negative, got {}",
                        point.population
                    )));
                }
                Ok(GeomWithData::new([x, y], point.population))
            })
            .collect::<Result<Vec<_>, Error>>()?;

        let total = entries.iter().map(|entry| entry.data).sum();
        info!(
            "Population index built over {} points, total population {total}",
            entries.len()
        );

        Ok(Self {
            rtree: RTree::bulk_load(entries),
            total,
        })
    }

    pub fn len(&self) -> usize {
        self.rtree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.rtree.size() == 0
    }

    pub fn total(&self) -> f64 {
        self.total
    }

    /// Sum of population on or inside `area`
    pub fn covered_population(&self, area: &MultiPolygon<f64>) -> f64 {
        let Some(bounds) = area.bounding_rect() else {
            return 0.0;
        };
        let envelope = AABB::from_corners(
            [bounds.min().x, bounds.min().y],
            [bounds.max().x, bounds.max().y],
        );

        // Envelope candidates first, exact test second
        self.rtree
            .locate_in_envelope(&envelope)
            .filter(|entry| {
                let [x, y] = *entry.geom();
                area.intersects(&Point::new(x, y))
            })
            .map(|entry| entry.data)
            .sum()
    }

    /// Covered population for every cell, shaped like the table
    pub fn served_population(&self, table: &IsopolygonTable) -> Vec<Vec<f64>> {
        table
            .rows()
            .collect::<Vec<_>>()
            .par_iter()
            .map(|cells| {
                cells
                    .iter()
                    .map(|cell| self.covered_population(cell))
                    .collect()
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use geo::polygon;

    use super::*;
    use crate::model::{EdgeWeights, NetworkEdge, NetworkNode};
    use crate::{DistanceType, QueryPoints, SpatialGraphIndex};

    fn grid() -> PopulationIndex {
        let points = (0..5)
            .flat_map(|i| {
                (0..5).map(move |j| PopulationPoint::new(f64::from(i), f64::from(j), 10.0))
            })
            .collect();
        PopulationIndex::new(points).unwrap()
    }

    #[test]
    fn counts_points_inside_and_on_boundary() {
        let index = grid();
        let area = MultiPolygon::new(vec![polygon![
            (x: -0.5, y: -0.5), (x: 1.0, y: -0.5), (x: 1.0, y: 1.5), (x: -0.5, y: 1.5)
        ]]);
        // (0,0), (0,1) inside, (1,0), (1,1) on the boundary
        assert_eq!(index.covered_population(&area), 40.0);
        assert_eq!(index.total(), 250.0);
    }

    #[test]
    fn empty_area_covers_nobody() {
        assert_eq!(grid().covered_population(&MultiPolygon::new(Vec::new())), 0.0);
    }

    #[test]
    fn negative_population_is_invalid() {
        let points = vec![PopulationPoint::new(0.0, 0.0, -1.0)];
        assert!(matches!(
            PopulationIndex::new(points),
            Err(Error::InvalidData(_))
        ));
    }

    #[test]
    fn served_population_follows_table_shape() {
        let nodes = vec![NetworkNode::new(1, 0.0, 0.0), NetworkNode::new(2, 4.0, 0.0)];
        let edges = vec![NetworkEdge::new(1, 2, EdgeWeights::length(4.0))];
        let network = SpatialGraphIndex::build(nodes, edges).unwrap();

        let points = QueryPoints::single(0.0, 0.0);
        let table =
            IsopolygonTable::compute(&points, DistanceType::Length, &[1.5, 10.0], &network, 0.3, 0.3)
                .unwrap();

        let served = grid().served_population(&table);
        assert_eq!(served.len(), 1);
        // (0,0) and (1,0) within 1.5, then the whole bottom row
        assert_eq!(served[0], vec![20.0, 50.0]);
    }
}
