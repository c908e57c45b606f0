use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Connection settings for one Drupal site.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RestWsConfig {
    /// Site root, e.g. `http://localhost:80`.
    pub base_url: String,

    pub user_agent: String,

    /// Per-request transport timeout.
    #[serde(with = "farmwfs_utils::humantime_serde")]
    pub request_timeout: Duration,

    pub pool_max_idle_per_host: usize,
}

impl Default for RestWsConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:80".to_owned(),
            user_agent: concat!("farmwfs/", env!("CARGO_PKG_VERSION")).to_owned(),
            request_timeout: Duration::from_secs(30),
            pool_max_idle_per_host: 10,
        }
    }
}
