//! Connection settings: config file plus flag/environment overrides.

use anyhow::{Context, Result, bail};
use gateway::{GatewayConfig, Protocol, TokenType};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::cli::ConnectionArgs;

/// Contents of `config.toml`
///
/// ```toml
/// org_id = "acme"
/// host = "axonops.internal:8080"
/// protocol = "http"
/// token_type = "Bearer"
/// timeout = 30
/// ```
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub protocol: Option<String>,
    pub host: Option<String>,
    pub api_key: Option<String>,
    pub org_id: Option<String>,
    pub token_type: Option<String>,
    /// Per-request timeout in seconds
    pub timeout: Option<u64>,
}

impl FileConfig {
    /// Load the config file, or an empty config if it doesn't exist
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("No config file at {}", path.display());
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("Could not read {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("Invalid config file {}", path.display()))
    }

    /// Flags and environment variables take precedence over the file
    pub fn with_overrides(self, args: &ConnectionArgs) -> Self {
        Self {
            protocol: args.protocol.clone().or(self.protocol),
            host: args.host.clone().or(self.host),
            api_key: args.api_key.clone().or(self.api_key),
            org_id: args.org_id.clone().or(self.org_id),
            token_type: args.token_type.clone().or(self.token_type),
            timeout: args.timeout.or(self.timeout),
        }
    }

    /// Validate into a gateway configuration; no request is made
    pub fn resolve(&self) -> Result<GatewayConfig> {
        let Some(org_id) = self.org_id.as_deref().filter(|org| !org.is_empty()) else {
            bail!("org_id is required (set it in config.toml, --org-id or CLUSTERFORM_ORG_ID)");
        };

        let mut config = GatewayConfig::new(org_id);
        if let Some(host) = &self.host {
            config = config.with_host(host.as_str());
        }
        if let Some(protocol) = &self.protocol {
            config = config.with_protocol(protocol.parse::<Protocol>()?);
        }
        if let Some(token_type) = &self.token_type {
            config = config.with_token_type(token_type.parse::<TokenType>()?);
        }
        if let Some(api_key) = &self.api_key {
            config = config.with_api_key(api_key.as_str());
        }
        if let Some(timeout) = self.timeout {
            config = config.with_timeout(Duration::from_secs(timeout));
        }

        config.validate()?;
        Ok(config)
    }
}
