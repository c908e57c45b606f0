//! The three area layers and the mapping between area terms and features.

use std::sync::Arc;

use serde_json::{Map, Value, json};
use wfs_sdk::{
    Feature, FeatureField, FieldData, GeometryCodec, GeometryRecord, LayerDefinition, Operation,
    UncommittedFeature, UncommittedFeatureUpdate,
};

use super::client::id_string;

pub const AREA_SRS: &str = "EPSG:4326";

/// Layer `ext` key holding the backend geometry kind the layer serves.
pub const GEO_TYPE_EXT: &str = "geo_type";

const GEOFIELD: &str = "field_farm_geofield";

/// (layer name, title, GML property type, backend geometry kind)
const AREA_LAYERS: [(&str, &str, &str, &str); 3] = [
    ("farmos_areas_point", "farmOS point areas", "PointPropertyType", "point"),
    ("farmos_areas_polygon", "farmOS polygon areas", "PolygonPropertyType", "polygon"),
    (
        "farmos_areas_linestring",
        "farmOS line areas",
        "LineStringPropertyType",
        "linestring",
    ),
];

/// (feature field, backend property)
pub const FIELD_MAPPING: [(&str, &str); 3] = [
    ("name", "name"),
    ("description", "description"),
    ("area_type", "field_farm_area_type"),
];

#[must_use]
pub fn area_layers() -> Vec<Arc<LayerDefinition>> {
    AREA_LAYERS
        .iter()
        .map(|&(name, title, geometry_type, geo_type)| {
            Arc::new(
                LayerDefinition::new(name, AREA_SRS)
                    .with_title(title)
                    .with_geometry_type(geometry_type)
                    .with_operations(Operation::ALL)
                    .with_fields([
                        FeatureField::new("name", "string").required(),
                        FeatureField::new("description", "string"),
                        FeatureField::new("area_type", "string"),
                    ])
                    .with_ext(GEO_TYPE_EXT, geo_type),
            )
        })
        .collect()
}

/// Builds the feature `record` contributes to `layer`.
///
/// `None` when the record's geometry kind is not the layer's, or when the
/// record lacks a term id or a readable geometry.
pub fn feature_from_record(
    layer: &LayerDefinition,
    record: &Value,
    codec: &dyn GeometryCodec,
) -> Option<Feature> {
    let tid = id_string(&record["tid"])?;
    let geofield = &record[GEOFIELD][0];
    let wkt = geofield["geom"].as_str().filter(|w| !w.trim().is_empty())?;

    let geometry = match codec.from_wkt(wkt, &layer.default_srs) {
        Ok(geometry) => geometry,
        Err(e) => {
            tracing::warn!(tid = %tid, error = %e, "skipping area with unreadable geometry");
            return None;
        }
    };

    let kind = geofield["geo_type"]
        .as_str()
        .map_or_else(|| geometry.kind().to_owned(), str::to_ascii_lowercase);
    if layer.ext.get(GEO_TYPE_EXT).map(String::as_str) != Some(kind.as_str()) {
        return None;
    }

    let mut field_data = FieldData::new();
    for (field, property) in FIELD_MAPPING {
        if let Some(value) = text_value(&record[property]) {
            field_data.insert(field.to_owned(), value);
        }
    }

    Some(Feature {
        feature_id: format!("{}.{tid}", layer.name),
        geometry,
        field_data,
    })
}

/// Text of a plain or `{ "value": .. }` formatted backend property.
fn text_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Object(o) => o.get("value").and_then(text_value),
        _ => None,
    }
}

/// Backend record for a new area.
#[must_use]
pub fn record_from_insert(feature: &UncommittedFeature, codec: &dyn GeometryCodec) -> Map<String, Value> {
    let mut record = mapped_fields(&feature.field_data);
    record.insert(GEOFIELD.to_owned(), geofield(&feature.geometry, codec));
    record
}

/// Partial backend record carrying only what the update changes.
#[must_use]
pub fn record_from_update(update: &UncommittedFeatureUpdate, codec: &dyn GeometryCodec) -> Value {
    let mut record = mapped_fields(&update.field_data);
    if let Some(geometry) = &update.geometry {
        record.insert(GEOFIELD.to_owned(), geofield(geometry, codec));
    }
    Value::Object(record)
}

fn mapped_fields(field_data: &FieldData) -> Map<String, Value> {
    FIELD_MAPPING
        .iter()
        .filter_map(|&(field, property)| {
            field_data
                .get(field)
                .map(|value| (property.to_owned(), Value::String(value.clone())))
        })
        .collect()
}

fn geofield(geometry: &GeometryRecord, codec: &dyn GeometryCodec) -> Value {
    json!([{ "geom": codec.to_wkt(geometry) }])
}

/// Backend term id of `feature_id`, which must be `"<layer>.<digits>"`.
///
/// # Errors
/// A message naming the rejected id.
pub fn area_id<'a>(layer: &LayerDefinition, feature_id: &'a str) -> Result<&'a str, String> {
    feature_id
        .strip_prefix(layer.name.as_str())
        .and_then(|rest| rest.strip_prefix('.'))
        .filter(|tid| !tid.is_empty() && tid.bytes().all(|b| b.is_ascii_digit()))
        .ok_or_else(|| format!("Feature id '{feature_id}' does not name a {} feature", layer.name))
}
