use std::future::Future;
use std::pin::Pin;

use domain::pipeline::context::EvaluationContext;
use domain::pipeline::expression::Expression;
use domain::pipeline::function::{FunctionArgs, FunctionDescriptor};
use domain::pipeline::value::Value;

/// Boxed future returned by [`PipelineFunction::evaluate`].
pub type EvaluateFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Primary port: a function callable from pipeline rules.
///
/// The host parses rule syntax, binds argument expressions by parameter
/// name, and calls `evaluate` once per message. Implementations must not
/// fail: every fault is folded into `Output`.
pub trait PipelineFunction: Send + Sync {
    type Output: Send + 'static;

    fn descriptor(&self) -> FunctionDescriptor;

    /// Evaluate a constant argument once, ahead of per-message evaluation.
    /// Must be pure. The default evaluates against an empty context.
    fn pre_compute_constant_argument(
        &self,
        _args: &FunctionArgs,
        _name: &str,
        expr: &Expression,
    ) -> Value {
        expr.evaluate(&EvaluationContext::empty())
    }

    fn evaluate<'a>(
        &'a self,
        args: &'a FunctionArgs,
        ctx: &'a EvaluationContext,
    ) -> EvaluateFuture<'a, Self::Output>;
}

/// Run the constant-argument hook for every constant argument of `args`
/// and store the results, so evaluation skips re-resolving them.
pub fn precompute_constants<F>(function: &F, args: &mut FunctionArgs)
where
    F: PipelineFunction + ?Sized,
{
    let computed: Vec<(String, Value)> = {
        let bound: &FunctionArgs = args;
        bound
            .constant_args()
            .map(|(name, expr)| {
                (
                    name.to_string(),
                    function.pre_compute_constant_argument(bound, name, expr),
                )
            })
            .collect()
    };

    for (name, value) in computed {
        args.set_precomputed(&name, value);
    }
}
