use ports::secondary::metrics_port::{LookupMetrics, ProviderMetrics};
use prometheus_client::encoding::EncodeLabelSet;
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::gauge::Gauge;
use prometheus_client::metrics::histogram::{Histogram, exponential_buckets_range};
use prometheus_client::registry::Registry;

// ── Label types ─────────────────────────────────────────────────────

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct LookupLabels {
    pub function: String,
    pub outcome: String,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct ProviderLabels {
    pub provider: String,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct ProviderErrorLabels {
    pub provider: String,
    pub kind: String,
}

// ── Lookup metrics registry ─────────────────────────────────────────

/// Prometheus metrics registry for lookup functions and providers.
///
/// All metric families use interior mutability (atomics), so recording
/// metrics only requires `&self`. Wrap in `Arc` for sharing.
pub struct LookupRegistry {
    registry: Registry,
    pub lookups_total: Family<LookupLabels, Counter>,
    pub lookup_duration: Family<ProviderLabels, Histogram>,
    pub provider_errors_total: Family<ProviderErrorLabels, Counter>,
    pub provider_configured: Family<ProviderLabels, Gauge>,
}

impl LookupRegistry {
    /// Create a registry with all metrics under the `otx_lookup` prefix.
    pub fn new() -> Self {
        let mut registry = Registry::with_prefix("otx_lookup");

        let lookups_total = Family::<LookupLabels, Counter>::default();
        registry.register(
            "lookups",
            "Function evaluations by outcome",
            lookups_total.clone(),
        );

        let lookup_duration = Family::<ProviderLabels, Histogram>::new_with_constructor(|| {
            // Exponential buckets from 1ms to 30s (12 buckets)
            Histogram::new(exponential_buckets_range(0.001, 30.0, 12))
        });
        registry.register(
            "lookup_duration_seconds",
            "Provider lookup latency in seconds",
            lookup_duration.clone(),
        );

        let provider_errors_total = Family::<ProviderErrorLabels, Counter>::default();
        registry.register(
            "provider_errors",
            "Provider failures by kind",
            provider_errors_total.clone(),
        );

        let provider_configured = Family::<ProviderLabels, Gauge>::default();
        registry.register(
            "provider_configured",
            "Provider configuration status (1=configured, 0=unconfigured)",
            provider_configured.clone(),
        );

        Self {
            registry,
            lookups_total,
            lookup_duration,
            provider_errors_total,
            provider_configured,
        }
    }

    /// Encode all registered metrics to `OpenMetrics` text format.
    pub fn encode(&self) -> String {
        let mut buffer = String::new();
        // Writing into a String cannot fail.
        let _ = prometheus_client::encoding::text::encode(&mut buffer, &self.registry);
        buffer
    }
}

impl Default for LookupRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ── Sub-trait implementations ──────────────────────────────────────

impl LookupMetrics for LookupRegistry {
    fn record_lookup(&self, function: &str, outcome: &str) {
        self.lookups_total
            .get_or_create(&LookupLabels {
                function: function.to_string(),
                outcome: outcome.to_string(),
            })
            .inc();
    }

    fn observe_lookup_duration(&self, provider: &str, duration_seconds: f64) {
        self.lookup_duration
            .get_or_create(&ProviderLabels {
                provider: provider.to_string(),
            })
            .observe(duration_seconds);
    }
}

impl ProviderMetrics for LookupRegistry {
    fn record_provider_error(&self, provider: &str, kind: &str) {
        self.provider_errors_total
            .get_or_create(&ProviderErrorLabels {
                provider: provider.to_string(),
                kind: kind.to_string(),
            })
            .inc();
    }

    fn set_provider_configured(&self, provider: &str, configured: bool) {
        self.provider_configured
            .get_or_create(&ProviderLabels {
                provider: provider.to_string(),
            })
            .set(i64::from(configured));
    }
}
