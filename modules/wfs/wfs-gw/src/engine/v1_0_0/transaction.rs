//! WFS-T: request parsing, commit, and the `TransactionResponse` document.

use std::collections::BTreeMap;
use std::sync::Arc;

use roxmltree::Node;
use wfs_sdk::{
    CommitOutcomeItem, FeatureServer, FieldData, GeometryCodec, GeometryRecord, LayerDefinition,
    Operation, RequestContext, Transaction, TransactionOutcome, UncommittedFeature,
    UncommittedFeatureDelete, UncommittedFeatureUpdate, WfsError, XmlWriter,
};

use super::{VERSION, WFS_SCHEMA_LOCATION};
use crate::engine::ns;

/// Overall result reported in `TransactionResult/Status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionStatus {
    Success,
    Partial,
    Failed,
}

impl TransactionStatus {
    #[must_use]
    pub fn derive(successes: usize, failures: usize) -> Self {
        match (successes, failures) {
            (0, _) => Self::Failed,
            (_, 0) => Self::Success,
            _ => Self::Partial,
        }
    }

    fn tag(self) -> &'static str {
        match self {
            Self::Success => "wfs:SUCCESS",
            Self::Partial => "wfs:PARTIAL",
            Self::Failed => "wfs:FAILED",
        }
    }
}

pub(super) async fn transaction(
    server: &dyn FeatureServer,
    codec: &dyn GeometryCodec,
    ctx: &RequestContext,
    body: &[u8],
) -> Result<Vec<u8>, WfsError> {
    let text = std::str::from_utf8(body)
        .map_err(|e| WfsError::invalid_request(format!("Transaction body is not UTF-8: {e}")))?;
    let document = roxmltree::Document::parse(text)
        .map_err(|e| WfsError::invalid_request(format!("Malformed Transaction document: {e}")))?;

    let layers = server.layer_definitions(ctx).await?;
    let transaction = read_transaction(document.root_element(), &layers, codec)?;
    let read_failures = transaction.read_transaction_failures.clone();
    tracing::info!(
        inserts = transaction.features_to_insert.len(),
        updates = transaction.features_to_update.len(),
        deletes = transaction.features_to_delete.len(),
        read_failures = read_failures.len(),
        "committing transaction"
    );

    let outcome = server.commit_transaction(ctx, transaction).await?;
    write_transaction_response(&read_failures, &outcome)
}

fn elements<'a, 'input>(node: Node<'a, 'input>) -> impl Iterator<Item = Node<'a, 'input>> {
    node.children().filter(Node::is_element)
}

fn is(node: Node<'_, '_>, namespace: &str, name: &str) -> bool {
    node.tag_name().namespace() == Some(namespace) && node.tag_name().name() == name
}

fn child<'a, 'input>(node: Node<'a, 'input>, name: &str) -> Option<Node<'a, 'input>> {
    elements(node).find(|n| n.tag_name().name() == name)
}

/// `ms:areas` → `areas`.
fn local_name(qualified: &str) -> &str {
    qualified
        .rsplit_once(':')
        .map_or(qualified, |(_, local)| local)
}

/// Reads a `wfs:Transaction` into mutations plus read failures.
///
/// Actions are processed in document order. Problems with one feature or
/// action become read failures; parsing continues with the next one.
///
/// # Errors
/// [`WfsError::InvalidRequest`] when `root` is not `wfs:Transaction`.
pub fn read_transaction(
    root: Node<'_, '_>,
    layers: &[Arc<LayerDefinition>],
    codec: &dyn GeometryCodec,
) -> Result<Transaction, WfsError> {
    if !is(root, ns::WFS, "Transaction") {
        return Err(WfsError::invalid_request(format!(
            "Expected a wfs:Transaction document, got '{}'",
            root.tag_name().name()
        )));
    }

    let mut reader = TransactionReader {
        layers,
        codec,
        transaction: Transaction::default(),
    };

    for action in elements(root) {
        let handle = action.attribute("handle");
        match (action.tag_name().namespace(), action.tag_name().name()) {
            (Some(ns::WFS), "Insert") => {
                for feature in elements(action) {
                    reader.read_insert_feature(handle, feature);
                }
            }
            (Some(ns::WFS), "Update") => reader.read_update(handle, action),
            (Some(ns::WFS), "Delete") => reader.read_delete(handle, action),
            (_, name) => {
                reader.fail(None, handle, format!("Received unknown operation type: {name}"));
            }
        }
    }

    Ok(reader.transaction)
}

struct TransactionReader<'a> {
    layers: &'a [Arc<LayerDefinition>],
    codec: &'a dyn GeometryCodec,
    transaction: Transaction,
}

impl TransactionReader<'_> {
    fn fail(
        &mut self,
        layer: Option<&Arc<LayerDefinition>>,
        handle: Option<&str>,
        message: impl Into<String>,
    ) {
        let mut item = CommitOutcomeItem::new(message).with_handle(handle);
        if let Some(layer) = layer {
            item = item.with_layer(layer);
        }
        self.transaction.read_transaction_failures.push(item);
    }

    fn resolve_layer(
        &mut self,
        type_name: &str,
        operation: Operation,
        handle: Option<&str>,
        unknown_message: impl FnOnce() -> String,
    ) -> Option<Arc<LayerDefinition>> {
        let Some(layer) = self
            .layers
            .iter()
            .find(|layer| layer.name == type_name)
            .map(Arc::clone)
        else {
            self.fail(None, handle, unknown_message());
            return None;
        };

        if !layer.allows(operation) {
            self.fail(
                None,
                handle,
                format!(
                    "Received unsupported operation {} for TYPENAME: '{type_name}'",
                    operation.as_str().to_ascii_lowercase()
                ),
            );
            return None;
        }
        Some(layer)
    }

    /// Exactly one geometry element inside `container`, decoded.
    fn read_geometry(
        &mut self,
        layer: &Arc<LayerDefinition>,
        handle: Option<&str>,
        container: Option<Node<'_, '_>>,
        context: &str,
    ) -> Option<GeometryRecord> {
        let geometries: Vec<Node<'_, '_>> = container.into_iter().flat_map(elements).collect();
        let [node] = geometries.as_slice() else {
            self.fail(
                Some(layer),
                handle,
                format!(
                    "Received invalid feature {context} with {} geometries",
                    geometries.len()
                ),
            );
            return None;
        };

        match self.codec.read_gml(*node, &layer.default_srs) {
            Ok(geometry) => Some(geometry),
            Err(e) => {
                self.fail(
                    Some(layer),
                    handle,
                    format!("Received invalid geometry in feature {context}: {e}"),
                );
                None
            }
        }
    }

    fn read_insert_feature(&mut self, handle: Option<&str>, feature: Node<'_, '_>) {
        let type_name = feature.tag_name().name();
        let Some(layer) = self.resolve_layer(type_name, Operation::Insert, handle, || {
            format!("Received invalid feature to insert for unknown TYPENAME: '{type_name}'")
        }) else {
            return;
        };

        let Some(geometry) =
            self.read_geometry(&layer, handle, child(feature, "geometry"), "to insert")
        else {
            return;
        };

        let mut field_data = FieldData::new();
        let mut missing = Vec::new();
        for field in &layer.fields {
            match child(feature, &field.name).and_then(|n| n.text()) {
                Some(value) => {
                    field_data.insert(field.name.clone(), value.to_owned());
                }
                None if field.required => missing.push(field.name.as_str()),
                None => {}
            }
        }

        if !missing.is_empty() {
            let message = format!(
                "Received invalid feature to insert with missing required fields: {}",
                missing.join(", ")
            );
            self.fail(Some(&layer), handle, message);
            return;
        }

        self.transaction.features_to_insert.push(UncommittedFeature {
            layer,
            geometry,
            field_data,
            handle: handle.map(str::to_owned),
        });
    }

    /// Feature ids of the action's `ogc:Filter`. Any other filter kind fails
    /// the whole action.
    fn read_feature_ids(
        &mut self,
        layer: &Arc<LayerDefinition>,
        handle: Option<&str>,
        action: Node<'_, '_>,
        verb: &str,
    ) -> Option<Vec<String>> {
        let mut feature_ids = Vec::new();
        for filter in elements(action).filter(|n| is(*n, ns::OGC, "Filter")) {
            for condition in elements(filter) {
                let fid = condition
                    .attribute("fid")
                    .filter(|_| is(condition, ns::OGC, "FeatureId"));
                let Some(fid) = fid else {
                    self.fail(
                        Some(layer),
                        handle,
                        format!("Only {verb} features by feature id is supported"),
                    );
                    return None;
                };
                feature_ids.push(fid.to_owned());
            }
        }

        if feature_ids.is_empty() {
            self.fail(
                Some(layer),
                handle,
                format!("Received no feature id to use for {verb} features"),
            );
            return None;
        }
        Some(feature_ids)
    }

    fn read_update(&mut self, handle: Option<&str>, action: Node<'_, '_>) {
        let type_name = local_name(action.attribute("typeName").unwrap_or_default());
        let Some(layer) = self.resolve_layer(type_name, Operation::Update, handle, || {
            format!("Received update for unknown TYPENAME: '{type_name}'")
        }) else {
            return;
        };

        let mut geometry = None;
        let mut field_data = FieldData::new();
        for property in elements(action).filter(|n| is(*n, ns::WFS, "Property")) {
            let name = elements(property)
                .find(|n| is(*n, ns::WFS, "Name"))
                .and_then(|n| n.text())
                .map(str::trim)
                .unwrap_or_default();
            let value = elements(property).find(|n| is(*n, ns::WFS, "Value"));

            if name == "geometry" {
                if let Some(parsed) = self.read_geometry(&layer, handle, value, "update") {
                    geometry = Some(parsed);
                }
            } else if layer.field(name).is_some() {
                let text = value.and_then(|v| v.text()).unwrap_or_default();
                field_data.insert(name.to_owned(), text.to_owned());
            }
        }

        let Some(feature_ids) = self.read_feature_ids(&layer, handle, action, "updating") else {
            return;
        };

        self.transaction
            .features_to_update
            .extend(feature_ids.into_iter().map(|feature_id| UncommittedFeatureUpdate {
                layer: Arc::clone(&layer),
                feature_id,
                geometry: geometry.clone(),
                field_data: field_data.clone(),
                handle: handle.map(str::to_owned),
            }));
    }

    fn read_delete(&mut self, handle: Option<&str>, action: Node<'_, '_>) {
        let type_name = local_name(action.attribute("typeName").unwrap_or_default());
        let Some(layer) = self.resolve_layer(type_name, Operation::Delete, handle, || {
            format!("Received delete for unknown TYPENAME: '{type_name}'")
        }) else {
            return;
        };

        let Some(feature_ids) = self.read_feature_ids(&layer, handle, action, "deleting") else {
            return;
        };

        self.transaction
            .features_to_delete
            .extend(feature_ids.into_iter().map(|feature_id| UncommittedFeatureDelete {
                layer: Arc::clone(&layer),
                feature_id,
                handle: handle.map(str::to_owned),
            }));
    }
}

/// Insert outcomes by handle; a missing handle groups under `""`.
fn group_by_handle(items: &[CommitOutcomeItem]) -> BTreeMap<&str, Vec<&CommitOutcomeItem>> {
    let mut groups: BTreeMap<&str, Vec<&CommitOutcomeItem>> = BTreeMap::new();
    for item in items {
        groups
            .entry(item.handle.as_deref().unwrap_or_default())
            .or_default()
            .push(item);
    }
    groups
}

fn write_transaction_response(
    read_failures: &[CommitOutcomeItem],
    outcome: &TransactionOutcome,
) -> Result<Vec<u8>, WfsError> {
    let failure_count = read_failures.len() + outcome.transaction_failures.len();
    let status = TransactionStatus::derive(outcome.success_count(), failure_count);
    let schema_location = format!("{} {WFS_SCHEMA_LOCATION}", ns::WFS);

    let mut out = XmlWriter::new();
    out.declaration()?;
    out.start(
        "wfs:TransactionResponse",
        &[
            ("version", VERSION),
            ("xmlns:wfs", ns::WFS),
            ("xmlns:ogc", ns::OGC),
            ("xmlns:xsi", ns::XSI),
            ("xsi:schemaLocation", schema_location.as_str()),
        ],
    )?;

    out.start("wfs:TransactionResult", &[])?;
    out.start("wfs:Status", &[])?;
    out.empty(status.tag(), &[])?;
    out.end("wfs:Status")?;
    for failure in read_failures.iter().chain(&outcome.transaction_failures) {
        out.text_element("wfs:Message", &[], &failure.data)?;
    }
    out.end("wfs:TransactionResult")?;

    for (handle, items) in group_by_handle(&outcome.inserted) {
        let attrs: Vec<(&str, &str)> = if handle.is_empty() {
            Vec::new()
        } else {
            vec![("handle", handle)]
        };
        out.start("wfs:InsertResult", &attrs)?;
        for item in items {
            out.empty("ogc:FeatureId", &[("fid", item.data.as_str())])?;
        }
        out.end("wfs:InsertResult")?;
    }

    out.end("wfs:TransactionResponse")?;
    Ok(out.into_bytes())
}
