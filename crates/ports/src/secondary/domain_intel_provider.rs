use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use domain::common::error::DomainError;
use domain::threatintel::entity::{OtxIntel, OtxSettings};

use crate::secondary::metrics_port::MetricsPort;

/// Boxed future returned by [`DomainIntelProvider::lookup`].
pub type LookupFuture<'a> =
    Pin<Box<dyn Future<Output = Result<Option<OtxIntel>, DomainError>> + Send + 'a>>;

/// Secondary port for domain threat-intelligence lookups.
///
/// One provider instance is shared by every function call site in the
/// process. Uses `Pin<Box<dyn Future>>` so the trait stays dyn-compatible
/// and can be held as `Arc<dyn DomainIntelProvider>`.
pub trait DomainIntelProvider: Send + Sync {
    /// Short provider name used in logs and metric labels.
    fn name(&self) -> &'static str;

    /// One-time setup. Must be idempotent and safe to race: every function
    /// constructor calls it, only the first call takes effect.
    fn initialize(&self, settings: &OtxSettings, metrics: Arc<dyn MetricsPort>);

    /// Look up intelligence for an already-normalized domain.
    ///
    /// `Ok(None)` means no usable answer (e.g. missing or invalid
    /// configuration). Network and parse failures are `Err`.
    fn lookup<'a>(&'a self, domain: &'a str) -> LookupFuture<'a>;
}
