use std::time::Duration;

use drupal_restws::RestWsConfig;
use serde::{Deserialize, Serialize};
use wfs_sdk::ServiceInfo;

/// Settings of the farmOS area feature server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FarmosAreasConfig {
    /// farmOS (Drupal) site the areas live in.
    pub backend: RestWsConfig,

    /// Metadata published in GetCapabilities.
    pub service: ServiceInfo,

    /// Distinct callers whose backend clients are kept alive.
    pub client_cache_capacity: u64,

    /// How long an area listing is reused before it is read again.
    #[serde(with = "farmwfs_utils::humantime_serde")]
    pub features_ttl: Duration,

    /// Backend calls in flight at once while committing a transaction.
    pub commit_concurrency: usize,
}

impl Default for FarmosAreasConfig {
    fn default() -> Self {
        Self {
            backend: RestWsConfig::default(),
            service: ServiceInfo {
                name: "farmos_areas".to_owned(),
                title: Some("farmOS areas".to_owned()),
                r#abstract: Some("Areas of a farmOS site as point, polygon and line layers".to_owned()),
                keywords: vec!["farmOS".to_owned(), "areas".to_owned()],
            },
            client_cache_capacity: 256,
            features_ttl: Duration::from_secs(60),
            commit_concurrency: 16,
        }
    }
}
