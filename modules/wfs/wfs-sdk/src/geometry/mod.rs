//! Geometry records and their WKT / GML encodings.

mod gml;

use geo_types::Geometry;
use thiserror::Error;
use wkt::{ToWkt, TryFromWkt};

use crate::xml::{XmlError, XmlWriter};

/// A geometry tagged with its spatial reference id (e.g. `EPSG:4326`).
#[derive(Debug, Clone, PartialEq)]
pub struct GeometryRecord {
    pub geometry: Geometry<f64>,
    pub srs: String,
}

impl GeometryRecord {
    pub fn new(geometry: impl Into<Geometry<f64>>, srs: impl Into<String>) -> Self {
        Self {
            geometry: geometry.into(),
            srs: srs.into(),
        }
    }

    /// Lowercase kind name; see [`geometry_kind`].
    #[must_use]
    pub fn kind(&self) -> &'static str {
        geometry_kind(&self.geometry)
    }
}

#[derive(Error, Debug, Clone)]
pub enum GeometryError {
    #[error("invalid WKT: {0}")]
    Wkt(String),

    #[error("invalid GML: {0}")]
    Gml(String),

    #[error("unsupported geometry: {0}")]
    Unsupported(String),

    #[error(transparent)]
    Xml(#[from] XmlError),
}

/// Converts geometries between WKT (backend side) and GML (protocol side).
pub trait GeometryCodec: Send + Sync {
    /// # Errors
    /// Unparsable WKT.
    fn from_wkt(&self, wkt: &str, srs: &str) -> Result<GeometryRecord, GeometryError>;

    fn to_wkt(&self, geometry: &GeometryRecord) -> String;

    /// Reads a GML geometry element. Geometries without `srsName` take `default_srs`.
    ///
    /// # Errors
    /// Unknown element or malformed coordinates.
    fn read_gml(
        &self,
        node: roxmltree::Node<'_, '_>,
        default_srs: &str,
    ) -> Result<GeometryRecord, GeometryError>;

    /// Writes the geometry as a `gml:` prefixed element; the caller declares the prefix.
    ///
    /// # Errors
    /// Geometry kinds GML 2 cannot express, or a write failure.
    fn write_gml(&self, geometry: &GeometryRecord, out: &mut XmlWriter) -> Result<(), GeometryError>;
}

/// GML 2.1.2 codec with tolerant GML 3 coordinate reading. Coordinates are
/// kept in x,y order; no axis swapping.
#[derive(Debug, Clone, Copy, Default)]
pub struct Gml2Codec;

impl GeometryCodec for Gml2Codec {
    fn from_wkt(&self, wkt: &str, srs: &str) -> Result<GeometryRecord, GeometryError> {
        let geometry = Geometry::<f64>::try_from_wkt_str(wkt)
            .map_err(|e| GeometryError::Wkt(e.to_string()))?;
        Ok(GeometryRecord::new(geometry, srs))
    }

    fn to_wkt(&self, geometry: &GeometryRecord) -> String {
        geometry.geometry.wkt_string()
    }

    fn read_gml(
        &self,
        node: roxmltree::Node<'_, '_>,
        default_srs: &str,
    ) -> Result<GeometryRecord, GeometryError> {
        let srs = node.attribute("srsName").unwrap_or(default_srs);
        Ok(GeometryRecord::new(gml::read_geometry(node)?, srs))
    }

    fn write_gml(&self, geometry: &GeometryRecord, out: &mut XmlWriter) -> Result<(), GeometryError> {
        gml::write_geometry(&geometry.geometry, Some(&geometry.srs), out)
    }
}

/// `point`, `linestring`, `polygon`, `multipoint`, `multilinestring`,
/// `multipolygon`, `geometrycollection`, `line`, `rect` or `triangle`.
#[must_use]
pub fn geometry_kind(geometry: &Geometry<f64>) -> &'static str {
    match geometry {
        Geometry::Point(_) => "point",
        Geometry::Line(_) => "line",
        Geometry::LineString(_) => "linestring",
        Geometry::Polygon(_) => "polygon",
        Geometry::MultiPoint(_) => "multipoint",
        Geometry::MultiLineString(_) => "multilinestring",
        Geometry::MultiPolygon(_) => "multipolygon",
        Geometry::GeometryCollection(_) => "geometrycollection",
        Geometry::Rect(_) => "rect",
        Geometry::Triangle(_) => "triangle",
    }
}
