use crate::secondary::metrics_port::{LookupMetrics, ProviderMetrics};

/// No-op implementation of all metrics sub-traits for use in tests.
///
/// All methods inherit the default no-op implementations from the sub-traits.
pub struct NoopMetrics;

impl LookupMetrics for NoopMetrics {}
impl ProviderMetrics for NoopMetrics {}
