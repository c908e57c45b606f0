//! XML namespaces used by WFS 1.0.0 documents.

pub const GML: &str = "http://www.opengis.net/gml";
pub const MS: &str = "http://mapserver.gis.umn.edu/mapserver";
pub const OGC: &str = "http://www.opengis.net/ogc";
pub const WFS: &str = "http://www.opengis.net/wfs";
pub const XSD: &str = "http://www.w3.org/2001/XMLSchema";
pub const XSI: &str = "http://www.w3.org/2001/XMLSchema-instance";
