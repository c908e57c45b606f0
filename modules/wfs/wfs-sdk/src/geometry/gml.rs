use std::borrow::Cow;

use geo_types::{Coord, Geometry, LineString, MultiLineString, MultiPoint, MultiPolygon, Point, Polygon};
use roxmltree::Node;

use super::GeometryError;
use crate::xml::XmlWriter;

fn gml_error(message: impl Into<String>) -> GeometryError {
    GeometryError::Gml(message.into())
}

fn elements<'a, 'input>(node: Node<'a, 'input>) -> impl Iterator<Item = Node<'a, 'input>> {
    node.children().filter(Node::is_element)
}

pub(super) fn read_geometry(node: Node<'_, '_>) -> Result<Geometry<f64>, GeometryError> {
    match node.tag_name().name() {
        "Point" => read_point(node).map(Geometry::Point),
        "LineString" => read_line_string(node).map(Geometry::LineString),
        "Polygon" => read_polygon(node).map(Geometry::Polygon),
        "MultiPoint" => read_members(node, &["pointMember", "pointMembers"], read_point)
            .map(|points| Geometry::MultiPoint(MultiPoint(points))),
        "MultiLineString" => read_members(node, &["lineStringMember"], read_line_string)
            .map(|lines| Geometry::MultiLineString(MultiLineString(lines))),
        "MultiPolygon" => read_members(node, &["polygonMember"], read_polygon)
            .map(|polygons| Geometry::MultiPolygon(MultiPolygon(polygons))),
        other => Err(GeometryError::Unsupported(other.to_owned())),
    }
}

fn read_point(node: Node<'_, '_>) -> Result<Point<f64>, GeometryError> {
    match read_coords(node)?.as_slice() {
        [coord] => Ok(Point::from(*coord)),
        coords => Err(gml_error(format!(
            "Point needs exactly one coordinate, got {}",
            coords.len()
        ))),
    }
}

fn read_line_string(node: Node<'_, '_>) -> Result<LineString<f64>, GeometryError> {
    let coords = read_coords(node)?;
    if coords.len() < 2 {
        return Err(gml_error(format!(
            "LineString needs at least two coordinates, got {}",
            coords.len()
        )));
    }
    Ok(LineString::new(coords))
}

fn read_ring(boundary: Node<'_, '_>) -> Result<LineString<f64>, GeometryError> {
    let ring = elements(boundary)
        .find(|n| n.tag_name().name() == "LinearRing")
        .ok_or_else(|| gml_error("polygon boundary without LinearRing"))?;
    let coords = read_coords(ring)?;
    if coords.len() < 3 {
        return Err(gml_error(format!(
            "LinearRing needs at least three coordinates, got {}",
            coords.len()
        )));
    }
    Ok(LineString::new(coords))
}

fn read_polygon(node: Node<'_, '_>) -> Result<Polygon<f64>, GeometryError> {
    let mut exterior = None;
    let mut interiors = Vec::new();

    for child in elements(node) {
        match child.tag_name().name() {
            "outerBoundaryIs" | "exterior" => exterior = Some(read_ring(child)?),
            "innerBoundaryIs" | "interior" => interiors.push(read_ring(child)?),
            _ => {}
        }
    }

    let exterior = exterior.ok_or_else(|| gml_error("Polygon without exterior ring"))?;
    Ok(Polygon::new(exterior, interiors))
}

fn read_members<T>(
    node: Node<'_, '_>,
    member_names: &[&str],
    read: fn(Node<'_, '_>) -> Result<T, GeometryError>,
) -> Result<Vec<T>, GeometryError> {
    let mut out = Vec::new();
    for member in elements(node).filter(|n| member_names.contains(&n.tag_name().name())) {
        for geometry in elements(member) {
            out.push(read(geometry)?);
        }
    }
    Ok(out)
}

fn read_coords(node: Node<'_, '_>) -> Result<Vec<Coord<f64>>, GeometryError> {
    let mut coords = Vec::new();
    for child in elements(node) {
        match child.tag_name().name() {
            "coordinates" => coords.extend(parse_coordinates(child)?),
            "coord" => coords.push(parse_coord(child)?),
            "pos" => {
                let values = parse_numbers(child.text().unwrap_or_default())?;
                match values.as_slice() {
                    [x, y, ..] => coords.push(Coord { x: *x, y: *y }),
                    _ => return Err(gml_error("pos needs at least two values")),
                }
            }
            "posList" => {
                let dimension = child
                    .attribute("srsDimension")
                    .map_or(Ok(2), str::parse::<usize>)
                    .map_err(|_| gml_error("invalid srsDimension"))?;
                if dimension < 2 {
                    return Err(gml_error("srsDimension must be at least 2"));
                }
                let values = parse_numbers(child.text().unwrap_or_default())?;
                if values.len() % dimension != 0 {
                    return Err(gml_error("posList length is not a multiple of srsDimension"));
                }
                coords.extend(
                    values
                        .chunks_exact(dimension)
                        .map(|tuple| Coord { x: tuple[0], y: tuple[1] }),
                );
            }
            _ => {}
        }
    }
    Ok(coords)
}

fn number(raw: &str) -> Result<f64, GeometryError> {
    raw.trim()
        .parse::<f64>()
        .map_err(|_| gml_error(format!("invalid number '{raw}'")))
}

fn parse_numbers(text: &str) -> Result<Vec<f64>, GeometryError> {
    text.split_whitespace().map(number).collect()
}

/// GML 2 `coordinates`, honouring the `decimal`, `cs` and `ts` separators.
fn parse_coordinates(node: Node<'_, '_>) -> Result<Vec<Coord<f64>>, GeometryError> {
    let decimal = node.attribute("decimal").unwrap_or(".");
    let cs = node.attribute("cs").unwrap_or(",");
    let ts = node.attribute("ts").unwrap_or(" ");
    let text = node.text().unwrap_or_default().trim();

    let tuples: Vec<&str> = if ts.trim().is_empty() {
        text.split_whitespace().collect()
    } else {
        text.split(ts).map(str::trim).filter(|t| !t.is_empty()).collect()
    };

    tuples
        .into_iter()
        .map(|tuple| {
            let mut parts = tuple.split(cs).map(|part| {
                if decimal == "." {
                    Cow::Borrowed(part)
                } else {
                    Cow::Owned(part.replace(decimal, "."))
                }
            });
            let (Some(x), Some(y)) = (parts.next(), parts.next()) else {
                return Err(gml_error(format!("coordinate tuple '{tuple}' needs x and y")));
            };
            Ok(Coord {
                x: number(&x)?,
                y: number(&y)?,
            })
        })
        .collect()
}

/// GML 2 `<coord><X/><Y/></coord>`.
fn parse_coord(node: Node<'_, '_>) -> Result<Coord<f64>, GeometryError> {
    let axis = |name: &str| {
        elements(node)
            .find(|n| n.tag_name().name() == name)
            .and_then(|n| n.text())
            .ok_or_else(|| gml_error(format!("coord without {name}")))
            .and_then(number)
    };
    Ok(Coord {
        x: axis("X")?,
        y: axis("Y")?,
    })
}

pub(super) fn write_geometry(
    geometry: &Geometry<f64>,
    srs: Option<&str>,
    out: &mut XmlWriter,
) -> Result<(), GeometryError> {
    let attrs: Vec<(&str, &str)> = srs.map(|s| ("srsName", s)).into_iter().collect();

    match geometry {
        Geometry::Point(point) => write_point(*point, &attrs, out),
        Geometry::LineString(line) => write_line_string(line, &attrs, out),
        Geometry::Line(line) => write_line_string(&LineString::from(*line), &attrs, out),
        Geometry::Polygon(polygon) => write_polygon(polygon, &attrs, out),
        Geometry::Rect(rect) => write_polygon(&rect.to_polygon(), &attrs, out),
        Geometry::Triangle(triangle) => write_polygon(&triangle.to_polygon(), &attrs, out),
        Geometry::MultiPoint(points) => {
            out.start("gml:MultiPoint", &attrs)?;
            for point in &points.0 {
                out.start("gml:pointMember", &[])?;
                write_point(*point, &[], out)?;
                out.end("gml:pointMember")?;
            }
            Ok(out.end("gml:MultiPoint")?)
        }
        Geometry::MultiLineString(lines) => {
            out.start("gml:MultiLineString", &attrs)?;
            for line in &lines.0 {
                out.start("gml:lineStringMember", &[])?;
                write_line_string(line, &[], out)?;
                out.end("gml:lineStringMember")?;
            }
            Ok(out.end("gml:MultiLineString")?)
        }
        Geometry::MultiPolygon(polygons) => {
            out.start("gml:MultiPolygon", &attrs)?;
            for polygon in &polygons.0 {
                out.start("gml:polygonMember", &[])?;
                write_polygon(polygon, &[], out)?;
                out.end("gml:polygonMember")?;
            }
            Ok(out.end("gml:MultiPolygon")?)
        }
        Geometry::GeometryCollection(_) => {
            Err(GeometryError::Unsupported("GeometryCollection".to_owned()))
        }
    }
}

fn write_point(point: Point<f64>, attrs: &[(&str, &str)], out: &mut XmlWriter) -> Result<(), GeometryError> {
    out.start("gml:Point", attrs)?;
    write_coordinates(std::iter::once(point.0), out)?;
    Ok(out.end("gml:Point")?)
}

fn write_line_string(
    line: &LineString<f64>,
    attrs: &[(&str, &str)],
    out: &mut XmlWriter,
) -> Result<(), GeometryError> {
    out.start("gml:LineString", attrs)?;
    write_coordinates(line.0.iter().copied(), out)?;
    Ok(out.end("gml:LineString")?)
}

fn write_polygon(
    polygon: &Polygon<f64>,
    attrs: &[(&str, &str)],
    out: &mut XmlWriter,
) -> Result<(), GeometryError> {
    out.start("gml:Polygon", attrs)?;
    write_ring("gml:outerBoundaryIs", polygon.exterior(), out)?;
    for interior in polygon.interiors() {
        write_ring("gml:innerBoundaryIs", interior, out)?;
    }
    Ok(out.end("gml:Polygon")?)
}

fn write_ring(boundary: &str, ring: &LineString<f64>, out: &mut XmlWriter) -> Result<(), GeometryError> {
    out.start(boundary, &[])?;
    out.start("gml:LinearRing", &[])?;
    write_coordinates(ring.0.iter().copied(), out)?;
    out.end("gml:LinearRing")?;
    Ok(out.end(boundary)?)
}

fn write_coordinates(
    coords: impl Iterator<Item = Coord<f64>>,
    out: &mut XmlWriter,
) -> Result<(), GeometryError> {
    let text = coords
        .map(|c| format!("{},{}", c.x, c.y))
        .collect::<Vec<_>>()
        .join(" ");
    Ok(out.text_element("gml:coordinates", &[], &text)?)
}
