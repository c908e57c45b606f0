use wfs_sdk::{FeatureServer, LayerDefinition, Operation, RequestContext, WfsError, XmlWriter};

use super::{Capability, GML_VERSION, VERSION};
use crate::engine::ns;

fn optional_text(out: &mut XmlWriter, name: &str, text: Option<&str>) -> Result<(), WfsError> {
    if let Some(text) = text {
        out.text_element(name, &[], text)?;
    }
    Ok(())
}

pub(super) async fn get_capabilities(
    server: &dyn FeatureServer,
    ctx: &RequestContext,
) -> Result<Vec<u8>, WfsError> {
    let layers = server.layer_definitions(ctx).await?;
    let info = server.service_info();
    let location = ctx.online_resource();

    let mut out = XmlWriter::new();
    out.declaration()?;
    out.start(
        "wfs:WFS_Capabilities",
        &[("version", VERSION), ("xmlns:wfs", ns::WFS), ("xmlns:ogc", ns::OGC)],
    )?;

    out.start("wfs:Service", &[])?;
    out.text_element("wfs:Name", &[], &info.name)?;
    optional_text(&mut out, "wfs:Title", info.title.as_deref())?;
    optional_text(&mut out, "wfs:Abstract", info.r#abstract.as_deref())?;
    if !info.keywords.is_empty() {
        out.text_element("wfs:Keywords", &[], &info.keywords.join(", "))?;
    }
    out.text_element("wfs:OnlineResource", &[], location)?;
    out.end("wfs:Service")?;

    out.start("wfs:Capability", &[])?;
    out.start("wfs:Request", &[])?;
    for capability in Capability::ALL {
        let tag = format!("wfs:{}", capability.name());
        out.start(&tag, &[])?;
        out.start("wfs:DCPType", &[])?;
        out.start("wfs:HTTP", &[])?;
        out.empty(
            &format!("wfs:{}", capability.method().as_str()),
            &[("onlineResource", location)],
        )?;
        out.end("wfs:HTTP")?;
        out.end("wfs:DCPType")?;
        capability.write_description(&mut out)?;
        out.end(&tag)?;
    }
    out.end("wfs:Request")?;
    out.end("wfs:Capability")?;

    out.start("wfs:FeatureTypeList", &[])?;
    for layer in &layers {
        out.start("wfs:FeatureType", &[])?;
        out.text_element("wfs:Name", &[], &layer.name)?;
        optional_text(&mut out, "wfs:Title", layer.title.as_deref())?;
        optional_text(&mut out, "wfs:Abstract", layer.r#abstract.as_deref())?;
        out.text_element("wfs:SRS", &[], &layer.default_srs)?;
        out.start("wfs:Operations", &[])?;
        for operation in Operation::ALL.into_iter().filter(|op| layer.allows(*op)) {
            out.empty(&format!("wfs:{operation}"), &[])?;
        }
        out.end("wfs:Operations")?;
        out.end("wfs:FeatureType")?;
    }
    out.end("wfs:FeatureTypeList")?;

    out.end("wfs:WFS_Capabilities")?;
    Ok(out.into_bytes())
}

pub(super) async fn describe_feature_type(
    server: &dyn FeatureServer,
    ctx: &RequestContext,
    type_name: Option<&str>,
) -> Result<Vec<u8>, WfsError> {
    let layers = server.layer_definitions(ctx).await?;
    let type_name = type_name.filter(|name| !name.is_empty());
    let gml_schema = format!("http://schemas.opengis.net/gml/{GML_VERSION}/feature.xsd");

    let mut out = XmlWriter::new();
    out.declaration()?;
    out.start(
        "schema",
        &[
            ("xmlns", ns::XSD),
            ("xmlns:gml", ns::GML),
            ("xmlns:ms", ns::MS),
            ("targetNamespace", ns::MS),
            ("elementFormDefault", "qualified"),
            ("version", "0.1"),
        ],
    )?;
    out.empty(
        "import",
        &[("namespace", ns::GML), ("schemaLocation", gml_schema.as_str())],
    )?;

    for layer in layers
        .iter()
        .filter(|layer| type_name.is_none_or(|name| layer.name == name))
    {
        write_layer_schema(&mut out, layer)?;
    }

    out.end("schema")?;
    Ok(out.into_bytes())
}

fn write_layer_schema(out: &mut XmlWriter, layer: &LayerDefinition) -> Result<(), WfsError> {
    let type_name = format!("{}Type", layer.name);
    let element_type = format!("ms:{type_name}");
    let geometry_type = format!("gml:{}", layer.geometry_type);

    out.empty(
        "element",
        &[
            ("name", layer.name.as_str()),
            ("type", element_type.as_str()),
            ("substitutionGroup", "gml:_Feature"),
        ],
    )?;
    out.start("complexType", &[("name", type_name.as_str())])?;
    out.start("complexContent", &[])?;
    out.start("extension", &[("base", "gml:AbstractFeatureType")])?;
    out.start("sequence", &[])?;
    out.empty("element", &[("name", "geometry"), ("type", geometry_type.as_str())])?;
    for field in &layer.fields {
        let mut attrs = vec![("name", field.name.as_str()), ("type", field.field_type.as_str())];
        if !field.required {
            attrs.push(("minOccurs", "0"));
        }
        out.empty("element", &attrs)?;
    }
    out.end("sequence")?;
    out.end("extension")?;
    out.end("complexContent")?;
    out.end("complexType")?;
    Ok(())
}
