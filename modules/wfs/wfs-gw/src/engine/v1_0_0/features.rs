use wfs_sdk::{FeatureServer, GeometryCodec, RequestContext, WfsError, XmlWriter};

use super::{GML_VERSION, VERSION, WFS_SCHEMA_LOCATION};
use crate::engine::{WFS_MIME_TYPE, ns};

pub(super) async fn get_feature(
    server: &dyn FeatureServer,
    codec: &dyn GeometryCodec,
    ctx: &RequestContext,
    type_name: Option<&str>,
) -> Result<Vec<u8>, WfsError> {
    let type_name = type_name.unwrap_or_default();
    let layers = server.layer_definitions(ctx).await?;
    let layer = layers
        .iter()
        .find(|layer| layer.name == type_name)
        .ok_or_else(|| {
            WfsError::invalid_request(format!(
                "Requested features of an unknown TYPENAME: '{type_name}'"
            ))
        })?;

    let features = server.get_all_features(ctx, layer).await?;
    tracing::debug!(layer = %layer.name, count = features.len(), "encoding features");

    let schema_location = format!(
        "{ms} {resource}?SERVICE=WFS&VERSION={VERSION}&REQUEST=DescribeFeatureType&TYPENAME={name}&OUTPUTFORMAT={WFS_MIME_TYPE}; subtype=gml/{GML_VERSION} {wfs} {WFS_SCHEMA_LOCATION}",
        ms = ns::MS,
        resource = ctx.online_resource(),
        name = layer.name,
        wfs = ns::WFS,
    );
    let layer_tag = format!("ms:{}", layer.name);

    let mut out = XmlWriter::new();
    out.declaration()?;
    out.start(
        "wfs:FeatureCollection",
        &[
            ("xmlns:wfs", ns::WFS),
            ("xmlns:gml", ns::GML),
            ("xmlns:ms", ns::MS),
            ("xmlns:xsi", ns::XSI),
            ("xsi:schemaLocation", schema_location.as_str()),
        ],
    )?;

    for feature in &features {
        out.start("gml:featureMember", &[])?;
        out.start(&layer_tag, &[("fid", feature.feature_id.as_str())])?;
        out.start("ms:geometry", &[])?;
        codec.write_gml(&feature.geometry, &mut out)?;
        out.end("ms:geometry")?;
        for field in &layer.fields {
            if let Some(value) = feature.field_data.get(&field.name) {
                out.text_element(&format!("ms:{}", field.name), &[], value)?;
            }
        }
        out.end(&layer_tag)?;
        out.end("gml:featureMember")?;
    }

    out.end("wfs:FeatureCollection")?;
    Ok(out.into_bytes())
}
