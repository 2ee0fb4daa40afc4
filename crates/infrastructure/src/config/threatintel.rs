//! Threat intelligence provider configuration and conversion to domain
//! settings.

use domain::threatintel::entity::{DEFAULT_OTX_ENDPOINT, OtxSettings};
use serde::{Deserialize, Serialize};

use super::common::{ConfigError, default_true};
use crate::constants::MAX_LOOKUP_TIMEOUT_MS;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ThreatIntelConfig {
    #[serde(default)]
    pub otx: OtxConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OtxConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// DirectConnect API key. Empty leaves the provider unconfigured.
    #[serde(default)]
    pub api_key: String,

    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Per-request timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_endpoint() -> String {
    DEFAULT_OTX_ENDPOINT.to_string()
}
fn default_timeout_ms() -> u64 {
    5_000
}

impl Default for OtxConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            api_key: String::new(),
            endpoint: default_endpoint(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl OtxConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let prefix = "threatintel.otx";

        // Only http(s) to keep the key off other schemes
        if !self.endpoint.starts_with("http://") && !self.endpoint.starts_with("https://") {
            return Err(ConfigError::Validation {
                field: format!("{prefix}.endpoint"),
                message: format!(
                    "endpoint must use http:// or https:// scheme, got: '{}'",
                    self.endpoint
                ),
            });
        }

        if self.timeout_ms == 0 || self.timeout_ms > MAX_LOOKUP_TIMEOUT_MS {
            return Err(ConfigError::Validation {
                field: format!("{prefix}.timeout_ms"),
                message: format!("timeout must be 1-{MAX_LOOKUP_TIMEOUT_MS} ms"),
            });
        }

        if self.enabled && self.api_key.trim().is_empty() {
            tracing::warn!(
                field = "threatintel.otx.api_key",
                "OTX lookups enabled without an API key"
            );
        }

        if self.enabled && self.endpoint.starts_with("http://") {
            tracing::warn!(
                endpoint = %self.endpoint,
                "OTX endpoint does not use HTTPS, the API key is sent in clear text"
            );
        }

        Ok(())
    }

    pub fn to_domain_settings(&self) -> OtxSettings {
        OtxSettings {
            enabled: self.enabled,
            api_key: self.api_key.trim().to_string(),
            endpoint: self.endpoint.clone(),
            timeout_ms: self.timeout_ms,
        }
    }
}
