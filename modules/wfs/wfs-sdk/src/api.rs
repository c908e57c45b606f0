use std::sync::Arc;

use async_trait::async_trait;

use crate::context::RequestContext;
use crate::error::WfsError;
use crate::models::{Feature, LayerDefinition, ServiceInfo, Transaction, TransactionOutcome};

/// A source and sink of features, served over WFS by the gateway.
///
/// Implementations must not assume anything about the protocol engine beyond
/// these calls; the engine assumes nothing about the backend.
#[async_trait]
pub trait FeatureServer: Send + Sync {
    /// Service metadata shown in GetCapabilities.
    fn service_info(&self) -> &ServiceInfo;

    /// Layers visible to the caller. Produced per request.
    async fn layer_definitions(
        &self,
        ctx: &RequestContext,
    ) -> Result<Vec<Arc<LayerDefinition>>, WfsError>;

    /// Every feature of `layer`.
    async fn get_all_features(
        &self,
        ctx: &RequestContext,
        layer: &LayerDefinition,
    ) -> Result<Vec<Feature>, WfsError>;

    /// Applies the transaction's mutations.
    ///
    /// Called for every parsed transaction, including ones that carry only
    /// read failures. Per-item backend failures belong in
    /// [`TransactionOutcome::transaction_failures`]; an `Err` means the whole
    /// request failed.
    async fn commit_transaction(
        &self,
        ctx: &RequestContext,
        transaction: Transaction,
    ) -> Result<TransactionOutcome, WfsError>;
}
