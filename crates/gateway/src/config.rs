//! Gateway connection settings.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Hosted SaaS endpoint; connecting to it requires an API key.
pub const DEFAULT_HOST: &str = "axonops.dev.com";

/// Per-request timeout used when none is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Fixed API version segment of every URL.
pub const API_VERSION: &str = "api/v1";

/// URL scheme used to reach the management host.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Http,
    #[default]
    Https,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Http => write!(f, "http"),
            Self::Https => write!(f, "https"),
        }
    }
}

impl FromStr for Protocol {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "http" => Ok(Self::Http),
            "https" => Ok(Self::Https),
            other => Err(Error::config(format!(
                "unknown protocol '{other}' (expected http or https)"
            ))),
        }
    }
}

/// Authorization scheme placed in front of the API key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenType {
    /// Vendor scheme used by the hosted service.
    #[default]
    AxonApi,
    /// Standard bearer token.
    Bearer,
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AxonApi => write!(f, "AxonApi"),
            Self::Bearer => write!(f, "Bearer"),
        }
    }
}

impl FromStr for TokenType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "AxonApi" => Ok(Self::AxonApi),
            "Bearer" => Ok(Self::Bearer),
            other => Err(Error::config(format!(
                "invalid token type '{other}' (expected AxonApi or Bearer)"
            ))),
        }
    }
}

/// Everything the gateway needs to reach one organization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayConfig {
    pub protocol: Protocol,
    pub host: String,
    /// Optional; self-hosted deployments may run without one.
    pub api_key: Option<String>,
    pub org_id: String,
    pub token_type: TokenType,
    pub timeout: Duration,
}

impl GatewayConfig {
    /// Create a config for an organization on the hosted endpoint.
    pub fn new(org_id: impl Into<String>) -> Self {
        Self {
            protocol: Protocol::default(),
            host: DEFAULT_HOST.to_string(),
            api_key: None,
            org_id: org_id.into(),
            token_type: TokenType::default(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn with_protocol(mut self, protocol: Protocol) -> Self {
        self.protocol = protocol;
        self
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        let key = api_key.into();
        self.api_key = if key.is_empty() { None } else { Some(key) };
        self
    }

    pub fn with_token_type(mut self, token_type: TokenType) -> Self {
        self.token_type = token_type;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Check the settings before any request is sent.
    pub fn validate(&self) -> Result<()> {
        if self.org_id.trim().is_empty() {
            return Err(Error::config("org id is required"));
        }
        if self.host.trim().is_empty() {
            return Err(Error::config("host must not be empty"));
        }
        if self.host == DEFAULT_HOST && self.api_key.is_none() {
            return Err(Error::config(format!(
                "an API key is required when connecting to {DEFAULT_HOST}"
            )));
        }
        if self.timeout.is_zero() {
            return Err(Error::config("timeout must be greater than zero"));
        }
        Ok(())
    }

    /// `{protocol}://{host}/api/v1`
    #[must_use]
    pub fn base_url(&self) -> String {
        format!("{}://{}/{}", self.protocol, self.host, API_VERSION)
    }

    /// Authorization header value, when an API key is configured.
    #[must_use]
    pub fn authorization(&self) -> Option<String> {
        self.api_key
            .as_deref()
            .map(|key| format!("{} {}", self.token_type, key))
    }
}

/// Mask a credential for logging, keeping only its edges.
#[must_use]
pub fn mask_secret(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    if chars.len() <= 20 {
        return "****".to_string();
    }
    let head: String = chars[..15].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}...{tail}")
}
