use geo::Area;
use geojson::{Feature, FeatureCollection, Geometry, GeometryValue};
use serde_json::json;

use crate::{Error, IsopolygonTable};

impl IsopolygonTable {
    /// Converts the table to a `GeoJSON` `FeatureCollection`, one feature per
    /// cell in row-major order.
    pub fn to_geojson(&self) -> Result<FeatureCollection, Error> {
        let (rows, columns) = self.shape();
        let mut features = Vec::with_capacity(rows * columns);

        for (row, cells) in self.rows().enumerate() {
            let point_id = self.point_ids().get(row).cloned().flatten();

            for (threshold, cell) in self.thresholds().iter().zip(cells) {
                let geometry = Geometry::new(GeometryValue::from(cell));
                let value = json!({
                    "type": "Feature",
                    "geometry": geometry,
                    "properties": {
                        "row": row,
                        "point_id": point_id,
                        "threshold": threshold.value(),
                        "label": threshold.label(),
                        "area": cell.unsigned_area(),
                    }
                });
                let feature = serde_json::from_value::<Feature>(value)
                    .map_err(|e| Error::GeoJsonError(e.to_string()))?;
                features.push(feature);
            }
        }

        Ok(FeatureCollection {
            features,
            bbox: None,
            foreign_members: None,
        })
    }

    pub fn to_geojson_string(&self) -> Result<String, Error> {
        serde_json::to_string(&self.to_geojson()?)
            .map_err(|e| Error::GeoJsonError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use crate::model::{EdgeWeights, NetworkEdge, NetworkNode};
    use crate::{DistanceType, IsopolygonTable, QueryPoints, SpatialGraphIndex};

    #[test]
    fn one_feature_per_cell_with_labels() {
        let nodes = vec![NetworkNode::new(1, 0.0, 0.0), NetworkNode::new(2, 5.0, 0.0)];
        let edges = vec![NetworkEdge::new(1, 2, EdgeWeights::length(5.0))];
        let index = SpatialGraphIndex::build(nodes, edges).unwrap();

        let points = QueryPoints::from_pairs(&[(0.0, 0.0), (5.0, 0.0)])
            .with_ids(vec!["clinic-a", "clinic-b"])
            .unwrap();
        let table =
            IsopolygonTable::compute(&points, DistanceType::Length, &[2.0, 10.0], &index, 0.5, 0.2)
                .unwrap();

        let collection = table.to_geojson().unwrap();
        assert_eq!(collection.features.len(), 4);

        let last = &collection.features[3];
        assert_eq!(last.property("label").unwrap(), "ID_10");
        assert_eq!(last.property("point_id").unwrap(), "clinic-b");
        assert_eq!(last.property("row").unwrap(), 1);
        assert!(last.property("area").unwrap().as_f64().unwrap() > 0.0);

        let text = table.to_geojson_string().unwrap();
        assert!(text.contains("FeatureCollection"));
        assert!(text.contains("\"MultiPolygon\""));
        assert!(collection.features.iter().all(|f| f.geometry.is_some()));
    }
}
