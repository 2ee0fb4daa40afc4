use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::pipeline::value::Value;

// ── Provider record ─────────────────────────────────────────────────

/// An OTX pulse: a community report that references an indicator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OtxPulse {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub adversary: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Intelligence returned by the provider for one domain.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OtxIntel {
    pub pulses: Vec<OtxPulse>,
}

impl OtxIntel {
    pub fn new(pulses: Vec<OtxPulse>) -> Self {
        Self { pulses }
    }

    pub fn is_empty(&self) -> bool {
        self.pulses.is_empty()
    }

    /// Distinct pulse ids, in provider order.
    pub fn pulse_ids(&self) -> Vec<&str> {
        distinct(self.pulses.iter().map(|p| p.id.as_str()))
    }

    /// Distinct pulse names, in provider order.
    pub fn pulse_names(&self) -> Vec<&str> {
        distinct(self.pulses.iter().map(|p| p.name.as_str()))
    }
}

fn distinct<'a>(items: impl Iterator<Item = &'a str>) -> Vec<&'a str> {
    let mut out: Vec<&str> = Vec::new();
    for item in items {
        if !item.is_empty() && !out.contains(&item) {
            out.push(item);
        }
    }
    out
}

// ── Lookup result ───────────────────────────────────────────────────

pub const FIELD_THREAT_INDICATED: &str = "otx_threat_indicated";
pub const FIELD_THREAT_IDS: &str = "otx_threat_ids";
pub const FIELD_THREAT_NAMES: &str = "otx_threat_names";

/// Flat field map handed back to pipeline rules, which typically copy it
/// onto the message with `set_fields(...)`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct OtxLookupResult {
    fields: BTreeMap<String, Value>,
}

impl OtxLookupResult {
    /// Result for "lookup ran, nothing known about this domain".
    pub fn empty() -> Self {
        let mut fields = BTreeMap::new();
        fields.insert(FIELD_THREAT_INDICATED.to_string(), Value::Bool(false));
        Self { fields }
    }

    pub fn from_intel(intel: &OtxIntel) -> Self {
        let mut fields = BTreeMap::new();
        fields.insert(
            FIELD_THREAT_INDICATED.to_string(),
            Value::Bool(!intel.is_empty()),
        );
        fields.insert(
            FIELD_THREAT_IDS.to_string(),
            Value::String(intel.pulse_ids().join(",")),
        );
        fields.insert(
            FIELD_THREAT_NAMES.to_string(),
            Value::String(intel.pulse_names().join(",")),
        );
        Self { fields }
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    pub fn is_threat_indicated(&self) -> bool {
        matches!(self.fields.get(FIELD_THREAT_INDICATED), Some(Value::Bool(true)))
    }
}

// ── Lookup outcome ──────────────────────────────────────────────────

/// Why a lookup produced no value at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AbsentReason {
    /// The domain argument was missing or did not resolve to a string.
    InvalidInput,
    /// The provider failed (network, timeout, malformed response).
    ProviderFault,
}

impl AbsentReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InvalidInput => "invalid_input",
            Self::ProviderFault => "provider_fault",
        }
    }
}

/// Outcome of one domain lookup. Exactly one of the three cases; faults
/// never escape as errors.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", content = "result", rename_all = "snake_case")]
pub enum LookupOutcome {
    /// The lookup could not be performed.
    Absent(AbsentReason),
    /// The lookup ran, but no intelligence is available.
    Empty,
    Found(OtxLookupResult),
}

impl LookupOutcome {
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent(_))
    }

    /// Short label for logs and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Absent(reason) => reason.as_str(),
            Self::Empty => "empty",
            Self::Found(_) => "found",
        }
    }

    /// Collapse to the nullable value a pipeline rule sees: `None` when
    /// absent, the empty result when nothing was found.
    pub fn into_value(self) -> Option<OtxLookupResult> {
        match self {
            Self::Absent(_) => None,
            Self::Empty => Some(OtxLookupResult::empty()),
            Self::Found(result) => Some(result),
        }
    }
}

// ── Provider settings ───────────────────────────────────────────────

pub const DEFAULT_OTX_ENDPOINT: &str = "https://otx.alienvault.com";

/// Connection settings for the OTX provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OtxSettings {
    pub enabled: bool,
    pub api_key: String,
    pub endpoint: String,
    pub timeout_ms: u64,
}

impl Default for OtxSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            api_key: String::new(),
            endpoint: DEFAULT_OTX_ENDPOINT.to_string(),
            timeout_ms: 5_000,
        }
    }
}

impl OtxSettings {
    /// A provider is usable only when enabled and holding an API key.
    pub fn is_configured(&self) -> bool {
        self.enabled && !self.api_key.trim().is_empty()
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}
