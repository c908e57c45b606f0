//! Layered server configuration.
//!
//! Sources, lowest precedence first: built-in defaults, the YAML file given
//! with `--config`, `FARMWFS__*` environment variables (`__` separates
//! nesting levels, e.g. `FARMWFS__SERVER__PORT`), then CLI flags.

use std::path::Path;

use anyhow::{Context, Result, bail};
use farmos_areas::FarmosAreasConfig;
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Yaml};
use serde::{Deserialize, Serialize};
use wfs_gw::WfsGatewayConfig;

pub const ENV_PREFIX: &str = "FARMWFS__";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub wfs: WfsGatewayConfig,
    pub farmos: FarmosAreasConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_owned(),
            port: 5707,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// `EnvFilter` directive; `RUST_LOG` wins when set.
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            format: LogFormat::Text,
        }
    }
}

/// Command-line values that override every other source.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub port: Option<u16>,
    pub farm_os_url: Option<String>,
    pub verbose: u8,
}

impl AppConfig {
    /// Defaults, then `path` (if any), then the environment.
    ///
    /// # Errors
    /// Unreadable YAML, unknown keys, or values of the wrong type.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        if let Some(path) = path {
            figment = figment.merge(Yaml::file(path));
        }
        figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .context("invalid configuration")
    }

    pub fn apply_cli_overrides(&mut self, cli: &CliOverrides) {
        if let Some(port) = cli.port {
            self.server.port = port;
        }
        if let Some(url) = &cli.farm_os_url {
            self.farmos.backend.base_url.clone_from(url);
        }
        match cli.verbose {
            0 => {}
            1 => "info".clone_into(&mut self.logging.level),
            2 => "debug".clone_into(&mut self.logging.level),
            _ => "trace".clone_into(&mut self.logging.level),
        }
    }

    /// Checks values the type system cannot.
    ///
    /// # Errors
    /// The first invalid setting found.
    pub fn validate(&self) -> Result<()> {
        let backend = url::Url::parse(&self.farmos.backend.base_url)
            .with_context(|| format!("farmos.backend.base_url '{}'", self.farmos.backend.base_url))?;
        if !matches!(backend.scheme(), "http" | "https") {
            bail!("farmos.backend.base_url must be an http(s) URL");
        }
        if let Some(public_url) = &self.wfs.public_url {
            url::Url::parse(public_url).with_context(|| format!("wfs.public_url '{public_url}'"))?;
        }
        if self.farmos.client_cache_capacity == 0 {
            bail!("farmos.client_cache_capacity must be positive");
        }
        if self.wfs.body_limit_bytes == 0 {
            bail!("wfs.body_limit_bytes must be positive");
        }
        Ok(())
    }

    /// # Errors
    /// Serialization failure.
    pub fn to_yaml(&self) -> Result<String> {
        serde_saphyr::to_string(self).context("failed to render configuration as YAML")
    }
}
