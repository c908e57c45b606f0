//! REST route registration for the WFS endpoint.

use std::sync::Arc;

use axum::Router;
use axum::routing::{any, get};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use super::error::panic_response;
use super::handlers::{self, WfsState};
use crate::config::WfsGatewayConfig;
use crate::gateway::WfsGateway;

/// Builds the gateway router: `GET /health` plus the WFS endpoint at `/` and
/// at the configured mount path.
///
/// Layers, outermost first: tracing, body limit, panic catcher.
pub fn router(gateway: Arc<WfsGateway>, config: &WfsGatewayConfig) -> Router {
    let state = Arc::new(WfsState {
        gateway,
        public_url: config.public_url.clone(),
    });

    let mut router = Router::new()
        .route("/health", get(handlers::health))
        .route("/", any(handlers::wfs));

    let mount_path = config.mount_path();
    if mount_path != "/" {
        router = router.route(&mount_path, any(handlers::wfs));
    }

    router
        .with_state(state)
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(RequestBodyLimitLayer::new(config.body_limit_bytes))
        .layer(TraceLayer::new_for_http())
}
