// Focused sub-traits for recording lookup metrics.
//
// All methods take `&self` because the underlying implementation uses
// atomic operations (interior mutability via `prometheus-client`).
//
// Default implementations are no-ops, allowing test mocks to implement
// only the sub-traits relevant to the code under test.

// ── Function-level metrics ─────────────────────────────────────────

pub trait LookupMetrics: Send + Sync {
    /// Record one function evaluation and its outcome label
    /// (`found`, `empty`, `invalid_input`, `provider_fault`).
    fn record_lookup(&self, _function: &str, _outcome: &str) {}

    /// Observe the wall time of one provider round-trip in seconds.
    fn observe_lookup_duration(&self, _provider: &str, _duration_seconds: f64) {}
}

// ── Provider metrics ───────────────────────────────────────────────

pub trait ProviderMetrics: Send + Sync {
    /// Record a provider-side failure (`http`, `status`, `decode`, ...).
    fn record_provider_error(&self, _provider: &str, _kind: &str) {}

    /// Whether the provider holds usable settings (true=configured).
    fn set_provider_configured(&self, _provider: &str, _configured: bool) {}
}

// ── Composite super-trait ──────────────────────────────────────────

/// Unified metrics port composing all sub-traits.
///
/// Components accept `Arc<dyn MetricsPort>`. The sub-traits provide
/// default no-op implementations so that test mocks only need to override
/// the methods they care about.
pub trait MetricsPort: LookupMetrics + ProviderMetrics {}

/// Blanket implementation: any type implementing all sub-traits
/// automatically implements `MetricsPort`.
impl<T> MetricsPort for T where T: LookupMetrics + ProviderMetrics {}
