use std::sync::{Arc, OnceLock};

use domain::common::error::DomainError;
use domain::threatintel::entity::{OtxIntel, OtxPulse, OtxSettings};
use domain::threatintel::error::ThreatIntelError;
use ports::secondary::domain_intel_provider::{DomainIntelProvider, LookupFuture};
use ports::secondary::metrics_port::MetricsPort;
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use tracing::{debug, info, warn};

const PROVIDER_NAME: &str = "otx";

/// Header carrying the OTX API key.
const API_KEY_HEADER: &str = "X-OTX-API-KEY";

/// Maximum indicator response size: 4 MiB. The `general` section of a
/// popular domain lists at most a few hundred pulses.
const MAX_RESPONSE_SIZE: usize = 4 * 1024 * 1024;

struct ProviderState {
    settings: OtxSettings,
    metrics: Arc<dyn MetricsPort>,
}

/// AlienVault OTX lookup provider over the DirectConnect REST API.
///
/// Settings are captured by the first `initialize` call and fixed for the
/// life of the process. Lookups before initialization, or with no API key,
/// answer `Ok(None)`.
pub struct OtxHttpProvider {
    client: reqwest::Client,
    state: OnceLock<ProviderState>,
}

impl OtxHttpProvider {
    pub fn new() -> Result<Self, DomainError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("otx-lookup/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| DomainError::ProviderError(format!("HTTP client init failed: {e}")))?;

        Ok(Self::with_client(client))
    }

    /// Create with a custom reqwest client (for testing or advanced config).
    pub fn with_client(client: reqwest::Client) -> Self {
        Self {
            client,
            state: OnceLock::new(),
        }
    }

    async fn do_lookup(&self, domain: &str) -> Result<Option<OtxIntel>, DomainError> {
        let Some(state) = self.state.get() else {
            warn!(domain = %domain, "OTX provider used before initialization");
            return Ok(None);
        };
        if !state.settings.is_configured() {
            debug!(domain = %domain, "OTX provider not configured, skipping lookup");
            return Ok(None);
        }
        if domain.is_empty() {
            return Ok(None);
        }

        let fault = |kind: &str, reason: String| -> DomainError {
            state.metrics.record_provider_error(PROVIDER_NAME, kind);
            ThreatIntelError::ProviderFault {
                domain: domain.to_string(),
                reason,
            }
            .into()
        };
        let url = indicator_url(&state.settings.endpoint, domain).map_err(|e| fault("request", e))?;

        let mut response = self
            .client
            .get(url)
            .header(API_KEY_HEADER, &state.settings.api_key)
            .timeout(state.settings.timeout())
            .send()
            .await
            .map_err(|e| fault("http", e.to_string()))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(fault("status", format!("HTTP {}", response.status())));
        }

        // On 32-bit, saturate to usize::MAX, which the cap then rejects.
        let content_length: usize = response
            .content_length()
            .unwrap_or(0)
            .try_into()
            .unwrap_or(usize::MAX);
        if content_length > MAX_RESPONSE_SIZE {
            return Err(fault(
                "size",
                format!("response too large: {content_length} bytes (max {MAX_RESPONSE_SIZE})"),
            ));
        }

        let mut body = Vec::with_capacity(content_length);
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| fault("http", format!("body read failed: {e}")))?
        {
            if body.len() + chunk.len() > MAX_RESPONSE_SIZE {
                return Err(fault(
                    "size",
                    format!("response exceeded {MAX_RESPONSE_SIZE} byte limit"),
                ));
            }
            body.extend_from_slice(&chunk);
        }

        parse_indicator_response(&body)
            .map(Some)
            .map_err(|e| fault("decode", e))
    }
}

impl DomainIntelProvider for OtxHttpProvider {
    fn name(&self) -> &'static str {
        PROVIDER_NAME
    }

    fn initialize(&self, settings: &OtxSettings, metrics: Arc<dyn MetricsPort>) {
        let mut first = false;
        let state = self.state.get_or_init(|| {
            first = true;
            ProviderState {
                settings: settings.clone(),
                metrics,
            }
        });
        if !first {
            return;
        }

        let configured = state.settings.is_configured();
        state
            .metrics
            .set_provider_configured(PROVIDER_NAME, configured);
        if configured {
            info!(endpoint = %state.settings.endpoint, "OTX provider initialized");
        } else if state.settings.enabled {
            warn!("OTX provider enabled without an API key, lookups will return empty results");
        } else {
            info!("OTX provider disabled");
        }
    }

    fn lookup<'a>(&'a self, domain: &'a str) -> LookupFuture<'a> {
        Box::pin(self.do_lookup(domain))
    }
}

/// `{endpoint}/api/v1/indicators/domain/{domain}/general`, with the domain
/// percent-encoded as one path segment so `/`, `?` and `#` cannot reshape
/// the request.
fn indicator_url(endpoint: &str, domain: &str) -> Result<Url, String> {
    // Dot segments would be dropped from the path instead of encoded.
    if matches!(domain, "." | "..") {
        return Err(format!("'{domain}' is not a domain name"));
    }
    let mut url =
        Url::parse(endpoint).map_err(|e| format!("invalid endpoint '{endpoint}': {e}"))?;
    url.path_segments_mut()
        .map_err(|()| format!("invalid endpoint '{endpoint}': not a base URL"))?
        .pop_if_empty()
        .extend(["api", "v1", "indicators", "domain", domain, "general"]);
    Ok(url)
}

// ── Response decoding ───────────────────────────────────────────────

#[derive(Deserialize)]
struct IndicatorResponse {
    #[serde(default)]
    pulse_info: PulseInfo,
}

#[derive(Deserialize, Default)]
struct PulseInfo {
    #[serde(default)]
    pulses: Vec<RawPulse>,
}

#[derive(Deserialize)]
struct RawPulse {
    #[serde(default)]
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    adversary: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
}

/// Decode the `general` section of an OTX domain indicator.
fn parse_indicator_response(body: &[u8]) -> Result<OtxIntel, String> {
    let parsed: IndicatorResponse =
        serde_json::from_slice(body).map_err(|e| format!("JSON parse error: {e}"))?;

    let pulses = parsed
        .pulse_info
        .pulses
        .into_iter()
        .map(|p| OtxPulse {
            id: p.id,
            name: p.name,
            // OTX sends "" when no adversary is attributed
            adversary: p.adversary.filter(|a| !a.is_empty()),
            tags: p.tags,
        })
        .collect();

    Ok(OtxIntel::new(pulses))
}
