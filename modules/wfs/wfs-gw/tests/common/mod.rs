#![allow(clippy::unwrap_used, clippy::expect_used, dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use geo_types::point;
use parking_lot::Mutex;
use wfs_sdk::{
    CommitOutcomeItem, Feature, FeatureField, FeatureServer, FieldData, GeometryRecord,
    LayerDefinition, Operation, RequestContext, ServiceInfo, Transaction, TransactionOutcome,
    WfsError,
};

/// In-memory feature server that records every call.
pub struct RecordingServer {
    info: ServiceInfo,
    layers: Vec<Arc<LayerDefinition>>,
    features: Vec<Feature>,
    require_credentials: bool,
    panic_on_list: bool,
    pub calls: AtomicUsize,
    pub committed: Mutex<Vec<Transaction>>,
}

impl RecordingServer {
    pub fn new() -> Self {
        let mut field_data = FieldData::new();
        field_data.insert("name".to_owned(), "Barn".to_owned());

        Self {
            info: ServiceInfo {
                name: "farm".to_owned(),
                title: Some("Farm areas".to_owned()),
                ..ServiceInfo::default()
            },
            layers: vec![
                Arc::new(
                    LayerDefinition::new("areas_point", "EPSG:4326")
                        .with_title("Point areas")
                        .with_geometry_type("PointPropertyType")
                        .with_operations(Operation::ALL)
                        .with_fields([
                            FeatureField::new("name", "string").required(),
                            FeatureField::new("description", "string"),
                        ]),
                ),
                Arc::new(LayerDefinition::new("readonly", "EPSG:4326")),
            ],
            features: vec![Feature {
                feature_id: "areas_point.7".to_owned(),
                geometry: GeometryRecord::new(point!(x: 1.5, y: 2.0), "EPSG:4326"),
                field_data,
            }],
            require_credentials: false,
            panic_on_list: false,
            calls: AtomicUsize::new(0),
            committed: Mutex::new(Vec::new()),
        }
    }

    #[must_use]
    pub fn requiring_credentials(mut self) -> Self {
        self.require_credentials = true;
        self
    }

    #[must_use]
    pub fn panicking(mut self) -> Self {
        self.panic_on_list = true;
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn record(&self, ctx: &RequestContext) -> Result<(), WfsError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.require_credentials {
            ctx.credentials()?;
        }
        Ok(())
    }
}

#[async_trait]
impl FeatureServer for RecordingServer {
    fn service_info(&self) -> &ServiceInfo {
        &self.info
    }

    async fn layer_definitions(
        &self,
        ctx: &RequestContext,
    ) -> Result<Vec<Arc<LayerDefinition>>, WfsError> {
        self.record(ctx)?;
        assert!(!self.panic_on_list, "layer listing exploded");
        Ok(self.layers.clone())
    }

    async fn get_all_features(
        &self,
        ctx: &RequestContext,
        layer: &LayerDefinition,
    ) -> Result<Vec<Feature>, WfsError> {
        self.record(ctx)?;
        Ok(self
            .features
            .iter()
            .filter(|f| f.feature_id.starts_with(&format!("{}.", layer.name)))
            .cloned()
            .collect())
    }

    /// Inserts succeed with sequential ids; deletes of `*.404` fail.
    async fn commit_transaction(
        &self,
        ctx: &RequestContext,
        transaction: Transaction,
    ) -> Result<TransactionOutcome, WfsError> {
        self.record(ctx)?;
        let mut outcome = TransactionOutcome::default();
        for (n, insert) in transaction.features_to_insert.iter().enumerate() {
            outcome.inserted.push(
                CommitOutcomeItem::new(format!("{}.{}", insert.layer.name, n + 100))
                    .with_layer(&insert.layer)
                    .with_handle(insert.handle.as_deref()),
            );
        }
        for delete in &transaction.features_to_delete {
            let item = CommitOutcomeItem::new(delete.feature_id.clone()).with_layer(&delete.layer);
            if delete.feature_id.ends_with(".404") {
                outcome
                    .transaction_failures
                    .push(CommitOutcomeItem::new(format!("{} not found", delete.feature_id)));
            } else {
                outcome.deleted.push(item);
            }
        }
        self.committed.lock().push(transaction);
        Ok(outcome)
    }
}

pub const TX_OPEN: &str = r#"<wfs:Transaction xmlns:wfs="http://www.opengis.net/wfs" xmlns:ogc="http://www.opengis.net/ogc" xmlns:gml="http://www.opengis.net/gml" xmlns:ms="http://mapserver.gis.umn.edu/mapserver" service="WFS" version="1.0.0">"#;
pub const TX_CLOSE: &str = "</wfs:Transaction>";

pub fn transaction_body(actions: &str) -> String {
    format!("{TX_OPEN}{actions}{TX_CLOSE}")
}

pub fn point_feature(name: &str) -> String {
    format!(
        "<ms:areas_point><ms:geometry><gml:Point><gml:coordinates>3,4</gml:coordinates></gml:Point></ms:geometry><ms:name>{name}</ms:name></ms:areas_point>"
    )
}
