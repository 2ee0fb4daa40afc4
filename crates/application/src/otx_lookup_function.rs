use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use futures::FutureExt;

use domain::common::error::DomainError;
use domain::pipeline::context::EvaluationContext;
use domain::pipeline::function::{FunctionArgs, FunctionDescriptor, ParameterDescriptor};
use domain::threatintel::entity::{AbsentReason, LookupOutcome, OtxLookupResult, OtxSettings};
use domain::threatintel::error::ThreatIntelError;
use domain::threatintel::lookup::normalize_domain;
use ports::primary::pipeline_function::{EvaluateFuture, PipelineFunction};
use ports::secondary::domain_intel_provider::DomainIntelProvider;
use ports::secondary::metrics_port::MetricsPort;

pub const NAME: &str = "otx_lookup_domain";
pub const DOMAIN_PARAM: &str = "domain_name";

/// Pipeline function `otx_lookup_domain(domain_name)`.
///
/// Normalizes the domain, asks the shared provider, and folds every
/// result into a [`LookupOutcome`]. Holds no per-call state, so one
/// instance serves all concurrent evaluations.
pub struct OtxDomainLookupFunction {
    domain_param: ParameterDescriptor,
    provider: Arc<dyn DomainIntelProvider>,
    metrics: Arc<dyn MetricsPort>,
}

impl OtxDomainLookupFunction {
    /// Bind the function to the process-wide provider. The provider's
    /// `initialize` is idempotent, so every call site may pass settings.
    pub fn new(
        provider: Arc<dyn DomainIntelProvider>,
        settings: &OtxSettings,
        metrics: Arc<dyn MetricsPort>,
    ) -> Self {
        provider.initialize(settings, Arc::clone(&metrics));
        Self {
            domain_param: domain_param(),
            provider,
            metrics,
        }
    }

    /// Registration metadata, available without a provider.
    pub fn function_descriptor() -> FunctionDescriptor {
        FunctionDescriptor {
            name: NAME.to_string(),
            description: "Look up AlienVault OTX threat intelligence data for a domain name."
                .to_string(),
            params: vec![domain_param()],
            return_type: "OtxLookupResult".to_string(),
        }
    }

    /// Run one lookup for an already-resolved argument set.
    pub async fn lookup(&self, args: &FunctionArgs, ctx: &EvaluationContext) -> LookupOutcome {
        let outcome = self.run(args, ctx).await;
        self.metrics.record_lookup(NAME, outcome.label());
        outcome
    }

    async fn run(&self, args: &FunctionArgs, ctx: &EvaluationContext) -> LookupOutcome {
        let Some(raw) = self.domain_param.required_string(args, ctx) else {
            let err = ThreatIntelError::InvalidInput {
                param: DOMAIN_PARAM.to_string(),
            };
            tracing::error!(
                function = NAME,
                error = %err,
                "NULL parameter passed to OTX threat intel lookup"
            );
            return LookupOutcome::Absent(AbsentReason::InvalidInput);
        };

        let domain = normalize_domain(&raw);
        tracing::debug!(function = NAME, domain = %domain, "running OTX lookup");

        let started = Instant::now();
        let result = AssertUnwindSafe(async { self.provider.lookup(&domain).await })
            .catch_unwind()
            .await
            .unwrap_or_else(|payload| Err(panic_fault(payload.as_ref())));
        self.metrics
            .observe_lookup_duration(self.provider.name(), started.elapsed().as_secs_f64());

        match result {
            // Missing or invalid provider configuration.
            Ok(None) => LookupOutcome::Empty,
            Ok(Some(intel)) => LookupOutcome::Found(OtxLookupResult::from_intel(&intel)),
            Err(e) => {
                let err = ThreatIntelError::ProviderFault {
                    domain: domain.clone(),
                    reason: e.to_string(),
                };
                tracing::error!(
                    function = NAME,
                    provider = self.provider.name(),
                    domain = %domain,
                    error = %e,
                    "could not look up OTX threat intelligence"
                );
                ctx.add_error(NAME, err.to_string());
                LookupOutcome::Absent(AbsentReason::ProviderFault)
            }
        }
    }
}

/// A panicking provider is a provider fault like any other.
fn panic_fault(payload: &(dyn Any + Send)) -> DomainError {
    let detail = payload
        .downcast_ref::<&str>()
        .map(ToString::to_string)
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string());
    DomainError::ProviderError(format!("provider panicked: {detail}"))
}

fn domain_param() -> ParameterDescriptor {
    ParameterDescriptor::string(DOMAIN_PARAM).description(
        "The domain to look up. Example: foo.example.org (A trailing dot ('.') will be ignored.)",
    )
}

impl PipelineFunction for OtxDomainLookupFunction {
    type Output = LookupOutcome;

    fn descriptor(&self) -> FunctionDescriptor {
        Self::function_descriptor()
    }

    fn evaluate<'a>(
        &'a self,
        args: &'a FunctionArgs,
        ctx: &'a EvaluationContext,
    ) -> EvaluateFuture<'a, Self::Output> {
        Box::pin(self.lookup(args, ctx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::pipeline::expression::Expression;
    use domain::pipeline::value::{Message, Value};
    use domain::threatintel::entity::{FIELD_THREAT_IDS, OtxIntel, OtxPulse};
    use ports::primary::pipeline_function::precompute_constants;
    use ports::secondary::domain_intel_provider::LookupFuture;
    use ports::secondary::metrics_port::{LookupMetrics, ProviderMetrics};
    use ports::test_utils::NoopMetrics;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};

    enum Behavior {
        Nothing,
        Fault,
        Panic,
        Known { domain: &'static str, intel: OtxIntel },
    }

    struct MockProvider {
        behavior: Behavior,
        calls: AtomicU32,
        inits: AtomicU32,
        seen: Mutex<Vec<String>>,
    }

    impl MockProvider {
        fn new(behavior: Behavior) -> Arc<Self> {
            Arc::new(Self {
                behavior,
                calls: AtomicU32::new(0),
                inits: AtomicU32::new(0),
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    impl DomainIntelProvider for MockProvider {
        fn name(&self) -> &'static str {
            "mock"
        }

        fn initialize(&self, _settings: &OtxSettings, _metrics: Arc<dyn MetricsPort>) {
            self.inits.fetch_add(1, Ordering::Relaxed);
        }

        fn lookup<'a>(&'a self, domain: &'a str) -> LookupFuture<'a> {
            self.calls.fetch_add(1, Ordering::Relaxed);
            self.seen.lock().unwrap().push(domain.to_string());
            Box::pin(async move {
                match &self.behavior {
                    Behavior::Nothing => Ok(None),
                    Behavior::Fault => {
                        Err(DomainError::ProviderError("connect timeout".to_string()))
                    }
                    Behavior::Panic => panic!("provider bug"),
                    Behavior::Known { domain: d, intel } if *d == domain => Ok(Some(intel.clone())),
                    Behavior::Known { .. } => Ok(Some(OtxIntel::default())),
                }
            })
        }
    }

    struct TestMetrics {
        outcomes: Mutex<Vec<String>>,
        durations: AtomicU32,
    }

    impl TestMetrics {
        fn new() -> Self {
            Self {
                outcomes: Mutex::new(Vec::new()),
                durations: AtomicU32::new(0),
            }
        }
    }

    impl LookupMetrics for TestMetrics {
        fn record_lookup(&self, function: &str, outcome: &str) {
            assert_eq!(function, NAME);
            self.outcomes.lock().unwrap().push(outcome.to_string());
        }

        fn observe_lookup_duration(&self, _provider: &str, _duration_seconds: f64) {
            self.durations.fetch_add(1, Ordering::Relaxed);
        }
    }
    impl ProviderMetrics for TestMetrics {}

    fn known_intel() -> OtxIntel {
        OtxIntel::new(vec![OtxPulse {
            id: "5f1a".to_string(),
            name: "Malspam campaign".to_string(),
            adversary: None,
            tags: vec!["phishing".to_string()],
        }])
    }

    fn make_function(provider: Arc<MockProvider>) -> OtxDomainLookupFunction {
        OtxDomainLookupFunction::new(
            provider,
            &OtxSettings::default(),
            Arc::new(NoopMetrics),
        )
    }

    fn domain_args(domain: &str) -> FunctionArgs {
        FunctionArgs::new().with_arg(DOMAIN_PARAM, Expression::constant(domain))
    }

    #[tokio::test]
    async fn unconfigured_provider_gives_empty() {
        let f = make_function(MockProvider::new(Behavior::Nothing));
        let ctx = EvaluationContext::empty();
        assert_eq!(f.lookup(&domain_args("foo.com"), &ctx).await, LookupOutcome::Empty);
        assert!(!ctx.has_errors());
    }

    #[tokio::test]
    async fn provider_fault_gives_absent() {
        let f = make_function(MockProvider::new(Behavior::Fault));
        let ctx = EvaluationContext::empty();
        let outcome = f.lookup(&domain_args("foo.com"), &ctx).await;
        assert_eq!(outcome, LookupOutcome::Absent(AbsentReason::ProviderFault));
        assert!(ctx.errors()[0].message.contains("foo.com"));
    }

    #[tokio::test]
    async fn provider_panic_gives_absent() {
        let metrics = Arc::new(TestMetrics::new());
        let f = OtxDomainLookupFunction::new(
            MockProvider::new(Behavior::Panic),
            &OtxSettings::default(),
            Arc::clone(&metrics) as Arc<dyn MetricsPort>,
        );
        let ctx = EvaluationContext::empty();

        let outcome = f.lookup(&domain_args("foo.com"), &ctx).await;

        assert_eq!(outcome, LookupOutcome::Absent(AbsentReason::ProviderFault));
        assert!(ctx.errors()[0].message.contains("provider panicked: provider bug"));
        assert_eq!(*metrics.outcomes.lock().unwrap(), vec!["provider_fault"]);
    }

    #[tokio::test]
    async fn trailing_dot_is_normalized_before_lookup() {
        let provider = MockProvider::new(Behavior::Known {
            domain: "foo.com",
            intel: known_intel(),
        });
        let f = make_function(Arc::clone(&provider));
        let ctx = EvaluationContext::empty();

        let with_dot = f.lookup(&domain_args("foo.com."), &ctx).await;
        let without_dot = f.lookup(&domain_args("foo.com"), &ctx).await;

        assert_eq!(with_dot, without_dot);
        let LookupOutcome::Found(result) = &with_dot else {
            panic!("expected Found, got {with_dot:?}");
        };
        assert!(result.is_threat_indicated());
        assert_eq!(result.get(FIELD_THREAT_IDS), Some(&Value::from("5f1a")));
        assert_eq!(*provider.seen.lock().unwrap(), vec!["foo.com", "foo.com"]);
    }

    #[tokio::test]
    async fn whitespace_is_trimmed_before_lookup() {
        let provider = MockProvider::new(Behavior::Nothing);
        let f = make_function(Arc::clone(&provider));
        let _ = f
            .lookup(&domain_args("  evil.example.org. "), &EvaluationContext::empty())
            .await;
        assert_eq!(*provider.seen.lock().unwrap(), vec!["evil.example.org"]);
    }

    #[tokio::test]
    async fn missing_argument_skips_provider() {
        let provider = MockProvider::new(Behavior::Fault);
        let f = make_function(Arc::clone(&provider));
        let ctx = EvaluationContext::empty();

        let outcome = f.lookup(&FunctionArgs::new(), &ctx).await;

        assert_eq!(outcome, LookupOutcome::Absent(AbsentReason::InvalidInput));
        assert_eq!(provider.calls.load(Ordering::Relaxed), 0);
        assert!(ctx.has_errors());
    }

    #[tokio::test]
    async fn unresolved_field_skips_provider() {
        let provider = MockProvider::new(Behavior::Nothing);
        let f = make_function(Arc::clone(&provider));
        let args = FunctionArgs::new().with_arg(DOMAIN_PARAM, Expression::field("dns_query"));

        let outcome = f.lookup(&args, &EvaluationContext::empty()).await;

        assert!(outcome.is_absent());
        assert_eq!(provider.calls.load(Ordering::Relaxed), 0);
    }

    #[tokio::test]
    async fn field_argument_resolves_per_message() {
        let provider = MockProvider::new(Behavior::Nothing);
        let f = make_function(Arc::clone(&provider));
        let args = FunctionArgs::new().with_arg(DOMAIN_PARAM, Expression::field("dns_query"));

        for query in ["a.example.", "b.example."] {
            let ctx = EvaluationContext::new(Message::new().with_field("dns_query", query));
            assert_eq!(f.lookup(&args, &ctx).await, LookupOutcome::Empty);
        }
        assert_eq!(*provider.seen.lock().unwrap(), vec!["a.example", "b.example"]);
    }

    #[tokio::test]
    async fn precomputed_constant_is_used() {
        let provider = MockProvider::new(Behavior::Nothing);
        let f = make_function(Arc::clone(&provider));
        let mut args = domain_args(" const.example. ");
        precompute_constants(&f, &mut args);

        assert_eq!(
            args.precomputed(DOMAIN_PARAM),
            Some(&Value::from(" const.example. "))
        );
        let _ = f.evaluate(&args, &EvaluationContext::empty()).await;
        assert_eq!(*provider.seen.lock().unwrap(), vec!["const.example"]);
    }

    #[test]
    fn construction_initializes_shared_provider() {
        let provider = MockProvider::new(Behavior::Nothing);
        let _a = make_function(Arc::clone(&provider));
        let _b = make_function(Arc::clone(&provider));
        // Idempotence is the provider's job; the function always forwards.
        assert_eq!(provider.inits.load(Ordering::Relaxed), 2);
    }

    #[test]
    fn descriptor_declares_single_required_param() {
        let f = make_function(MockProvider::new(Behavior::Nothing));
        let d = f.descriptor();
        assert_eq!(d.name, "otx_lookup_domain");
        assert_eq!(d.return_type, "OtxLookupResult");
        assert_eq!(d.params.len(), 1);
        let p = d.param(DOMAIN_PARAM).unwrap();
        assert!(!p.optional);
        assert!(p.description.contains("trailing dot"));
    }

    #[tokio::test]
    async fn outcomes_are_recorded_in_metrics() {
        let metrics = Arc::new(TestMetrics::new());
        let f = OtxDomainLookupFunction::new(
            MockProvider::new(Behavior::Fault),
            &OtxSettings::default(),
            Arc::clone(&metrics) as Arc<dyn MetricsPort>,
        );
        let ctx = EvaluationContext::empty();
        let _ = f.lookup(&domain_args("foo.com"), &ctx).await;
        let _ = f.lookup(&FunctionArgs::new(), &ctx).await;

        assert_eq!(
            *metrics.outcomes.lock().unwrap(),
            vec!["provider_fault", "invalid_input"]
        );
        // Only the call that reached the provider is timed.
        assert_eq!(metrics.durations.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn concurrent_lookups_share_one_function() {
        let provider = MockProvider::new(Behavior::Nothing);
        let f = Arc::new(make_function(Arc::clone(&provider)));

        let mut handles = Vec::new();
        for i in 0..16 {
            let f = Arc::clone(&f);
            handles.push(tokio::spawn(async move {
                let args = domain_args(&format!("host{i}.example."));
                f.lookup(&args, &EvaluationContext::empty()).await
            }));
        }
        for h in handles {
            assert_eq!(h.await.unwrap(), LookupOutcome::Empty);
        }
        assert_eq!(provider.calls.load(Ordering::Relaxed), 16);
    }
}
