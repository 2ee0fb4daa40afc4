// ── Paths ──────────────────────────────────────────────────────────

pub const DEFAULT_CONFIG_PATH: &str = "/etc/otx-lookup/config.yaml";

// ── Environment ────────────────────────────────────────────────────

/// Overrides `threatintel.otx.api_key` when set and non-empty.
pub const OTX_API_KEY_ENV: &str = "OTX_API_KEY";

// ── Limits ─────────────────────────────────────────────────────────

/// Upper bound for the per-request provider timeout.
pub const MAX_LOOKUP_TIMEOUT_MS: u64 = 60_000;
