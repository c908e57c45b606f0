//! [`FeatureServer`] over farmOS areas, proxying every call to the backend
//! as the caller's own farmOS user.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use drupal_restws::{RestWsClient, RestWsConfig};
use farmwfs_utils::LazyCell;
use futures::future::BoxFuture;
use futures::{FutureExt, StreamExt, stream};
use moka::future::Cache;
use serde_json::Value;
use tracing::instrument;
use wfs_sdk::{
    CommitOutcomeItem, Credentials, Feature, FeatureServer, GeometryCodec, Gml2Codec,
    LayerDefinition, RequestContext, ServiceInfo, Transaction, TransactionOutcome,
    UncommittedFeature, UncommittedFeatureDelete, UncommittedFeatureUpdate, WfsError,
};

use super::client::{AreaApi, AreaClient};
use super::error::AreaError;
use super::layers::{self, area_id, feature_from_record};
use crate::config::FarmosAreasConfig;

/// Builds a backend client for one set of caller credentials.
pub trait AreaClientFactory: Send + Sync {
    /// # Errors
    /// Backend configuration the client cannot be built from.
    fn create(&self, credentials: &Credentials) -> Result<Arc<dyn AreaApi>, AreaError>;
}

/// Factory of [`AreaClient`]s over HTTP `restws` sessions.
#[derive(Debug, Clone)]
pub struct RestAreaClientFactory {
    config: RestWsConfig,
}

impl RestAreaClientFactory {
    #[must_use]
    pub fn new(config: RestWsConfig) -> Self {
        Self { config }
    }
}

impl AreaClientFactory for RestAreaClientFactory {
    fn create(&self, credentials: &Credentials) -> Result<Arc<dyn AreaApi>, AreaError> {
        let rest = RestWsClient::new(
            &self.config,
            credentials.user.clone(),
            credentials.password.clone(),
        )?;
        Ok(Arc::new(AreaClient::new(Arc::new(rest))))
    }
}

/// A backend client and the area listing last read through it.
struct ClientEntry {
    client: Arc<dyn AreaApi>,
    records: LazyCell<Vec<Value>>,
}

/// `(user, password fingerprint)`
type ClientKey = (String, String);

enum Applied {
    Inserted(CommitOutcomeItem),
    Updated(CommitOutcomeItem),
    Deleted(CommitOutcomeItem),
    Failed(CommitOutcomeItem),
}

pub struct ProxyFeatureServer {
    info: ServiceInfo,
    layers: Vec<Arc<LayerDefinition>>,
    factory: Arc<dyn AreaClientFactory>,
    clients: Cache<ClientKey, Arc<ClientEntry>>,
    codec: Arc<dyn GeometryCodec>,
    features_ttl: Duration,
    commit_concurrency: usize,
}

impl std::fmt::Debug for ProxyFeatureServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProxyFeatureServer")
            .field("service", &self.info.name)
            .field("cached_clients", &self.clients.entry_count())
            .field("features_ttl", &self.features_ttl)
            .field("commit_concurrency", &self.commit_concurrency)
            .finish_non_exhaustive()
    }
}

impl ProxyFeatureServer {
    /// A server talking `restws` to the configured backend.
    #[must_use]
    pub fn new(config: &FarmosAreasConfig) -> Self {
        Self::with_factory(
            config,
            Arc::new(RestAreaClientFactory::new(config.backend.clone())),
        )
    }

    #[must_use]
    pub fn with_factory(config: &FarmosAreasConfig, factory: Arc<dyn AreaClientFactory>) -> Self {
        Self {
            info: config.service.clone(),
            layers: layers::area_layers(),
            factory,
            clients: Cache::builder()
                .max_capacity(config.client_cache_capacity)
                .build(),
            codec: Arc::new(Gml2Codec),
            features_ttl: config.features_ttl,
            commit_concurrency: config.commit_concurrency.max(1),
        }
    }

    #[must_use]
    pub fn with_codec(mut self, codec: Arc<dyn GeometryCodec>) -> Self {
        self.codec = codec;
        self
    }

    /// The caller's cached client, created on first use. Concurrent first
    /// requests with the same credentials share one client.
    async fn entry(&self, ctx: &RequestContext) -> Result<Arc<ClientEntry>, WfsError> {
        let credentials = ctx.credentials()?;
        let key = (credentials.user.clone(), credentials.password.fingerprint());

        self.clients
            .try_get_with(key, async {
                tracing::debug!(user = %credentials.user, "creating backend client");
                let client = self.factory.create(credentials)?;
                Ok::<_, AreaError>(Arc::new(ClientEntry {
                    client,
                    records: LazyCell::with_ttl(self.features_ttl),
                }))
            })
            .await
            .map_err(|e| e.to_wfs())
    }

    async fn insert(&self, client: &dyn AreaApi, feature: &UncommittedFeature) -> Applied {
        let record = layers::record_from_insert(feature, self.codec.as_ref());
        match client.create(record).await {
            Ok(tid) => Applied::Inserted(
                CommitOutcomeItem::new(format!("{}.{tid}", feature.layer.name))
                    .with_layer(&feature.layer)
                    .with_handle(feature.handle.as_deref()),
            ),
            Err(e) => {
                tracing::warn!(layer = %feature.layer.name, error = %e, "area insert failed");
                Applied::Failed(
                    CommitOutcomeItem::new(format!(
                        "Failed to insert feature into {}: {e}",
                        feature.layer.name
                    ))
                    .with_layer(&feature.layer)
                    .with_handle(feature.handle.as_deref()),
                )
            }
        }
    }

    async fn update(&self, client: &dyn AreaApi, update: &UncommittedFeatureUpdate) -> Applied {
        let result = async {
            let tid = area_id(&update.layer, &update.feature_id).map_err(AreaError::InvalidFeatureId)?;
            client.get_by_id(tid, true).await?;
            client
                .update(tid, &layers::record_from_update(update, self.codec.as_ref()))
                .await
        }
        .await;

        settle(
            result,
            "update",
            &update.feature_id,
            &update.layer,
            update.handle.as_deref(),
            Applied::Updated,
        )
    }

    async fn delete(client: &dyn AreaApi, delete: &UncommittedFeatureDelete) -> Applied {
        let result = async {
            let tid = area_id(&delete.layer, &delete.feature_id).map_err(AreaError::InvalidFeatureId)?;
            client.get_by_id(tid, true).await?;
            client.delete(tid).await
        }
        .await;

        settle(
            result,
            "delete",
            &delete.feature_id,
            &delete.layer,
            delete.handle.as_deref(),
            Applied::Deleted,
        )
    }
}

fn settle(
    result: Result<(), AreaError>,
    verb: &str,
    feature_id: &str,
    layer: &Arc<LayerDefinition>,
    handle: Option<&str>,
    success: fn(CommitOutcomeItem) -> Applied,
) -> Applied {
    match result {
        Ok(()) => success(
            CommitOutcomeItem::new(feature_id)
                .with_layer(layer)
                .with_handle(handle),
        ),
        Err(e) => {
            tracing::warn!(feature_id, verb, error = %e, "area mutation failed");
            Applied::Failed(
                CommitOutcomeItem::new(format!("Failed to {verb} feature {feature_id}: {e}"))
                    .with_layer(layer)
                    .with_handle(handle),
            )
        }
    }
}

#[async_trait]
impl FeatureServer for ProxyFeatureServer {
    fn service_info(&self) -> &ServiceInfo {
        &self.info
    }

    async fn layer_definitions(
        &self,
        ctx: &RequestContext,
    ) -> Result<Vec<Arc<LayerDefinition>>, WfsError> {
        // Layers are static, but listing them still requires a caller identity.
        ctx.credentials()?;
        Ok(self.layers.clone())
    }

    #[instrument(skip_all, fields(layer = %layer.name))]
    async fn get_all_features(
        &self,
        ctx: &RequestContext,
        layer: &LayerDefinition,
    ) -> Result<Vec<Feature>, WfsError> {
        let entry = self.entry(ctx).await?;
        let records = entry
            .records
            .get_or_try_init(|| entry.client.get_all())
            .await?;

        let features: Vec<Feature> = records
            .iter()
            .filter_map(|record| feature_from_record(layer, record, self.codec.as_ref()))
            .collect();
        tracing::debug!(records = records.len(), features = features.len(), "listed areas");
        Ok(features)
    }

    #[instrument(skip_all, fields(mutations = transaction.mutation_count()))]
    async fn commit_transaction(
        &self,
        ctx: &RequestContext,
        transaction: Transaction,
    ) -> Result<TransactionOutcome, WfsError> {
        let entry = self.entry(ctx).await?;
        let client = entry.client.as_ref();

        let mut work: Vec<BoxFuture<'_, Applied>> = Vec::with_capacity(transaction.mutation_count());
        work.extend(transaction.features_to_insert.iter().map(|f| self.insert(client, f).boxed()));
        work.extend(transaction.features_to_update.iter().map(|u| self.update(client, u).boxed()));
        work.extend(transaction.features_to_delete.iter().map(|d| Self::delete(client, d).boxed()));

        let applied: Vec<Applied> = stream::iter(work)
            .buffered(self.commit_concurrency)
            .collect()
            .await;
        entry.records.invalidate();

        let mut outcome = TransactionOutcome::default();
        for item in applied {
            match item {
                Applied::Inserted(item) => outcome.inserted.push(item),
                Applied::Updated(item) => outcome.updated.push(item),
                Applied::Deleted(item) => outcome.deleted.push(item),
                Applied::Failed(item) => outcome.transaction_failures.push(item),
            }
        }

        tracing::info!(
            succeeded = outcome.success_count(),
            failed = outcome.transaction_failures.len(),
            "transaction committed"
        );
        Ok(outcome)
    }
}
