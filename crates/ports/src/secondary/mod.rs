pub mod domain_intel_provider;
pub mod metrics_port;
