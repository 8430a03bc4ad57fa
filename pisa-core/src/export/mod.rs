//! Output formats for isopolygon tables

mod to_geojson;
