use std::collections::HashMap;

use serde::Serialize;

use super::context::EvaluationContext;
use super::expression::Expression;
use super::value::Value;

// ── Parameter descriptor ────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamType {
    String,
}

/// Declares one named parameter of a pipeline function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParameterDescriptor {
    pub name: String,
    pub param_type: ParamType,
    pub optional: bool,
    pub description: String,
}

impl ParameterDescriptor {
    /// A required string parameter.
    pub fn string(name: &str) -> Self {
        Self {
            name: name.to_string(),
            param_type: ParamType::String,
            optional: false,
            description: String::new(),
        }
    }

    #[must_use]
    pub fn description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    /// Resolve this parameter as a string.
    ///
    /// Precomputed constants win over per-message evaluation. Returns `None`
    /// and records an error on `ctx` when the argument is missing, resolves
    /// to null, or is not a string.
    pub fn required_string(&self, args: &FunctionArgs, ctx: &EvaluationContext) -> Option<String> {
        let value = match args.precomputed(&self.name) {
            Some(v) => v.clone(),
            None => match args.expression(&self.name) {
                Some(expr) => expr.evaluate(ctx),
                None => {
                    ctx.add_error(&self.name, "missing required argument");
                    return None;
                }
            },
        };

        match value {
            Value::String(s) => Some(s),
            Value::Null => {
                ctx.add_error(&self.name, "required argument resolved to null");
                None
            }
            other => {
                ctx.add_error(
                    &self.name,
                    format!("expected string, got {}", other.type_name()),
                );
                None
            }
        }
    }
}

// ── Function arguments ──────────────────────────────────────────────

/// Arguments bound to one function call site in a rule.
#[derive(Debug, Clone, Default)]
pub struct FunctionArgs {
    expressions: HashMap<String, Expression>,
    precomputed: HashMap<String, Value>,
}

impl FunctionArgs {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_arg(mut self, name: &str, expr: Expression) -> Self {
        self.expressions.insert(name.to_string(), expr);
        self
    }

    pub fn expression(&self, name: &str) -> Option<&Expression> {
        self.expressions.get(name)
    }

    pub fn precomputed(&self, name: &str) -> Option<&Value> {
        self.precomputed.get(name)
    }

    /// Names and expressions of arguments that are compile-time constants.
    pub fn constant_args(&self) -> impl Iterator<Item = (&str, &Expression)> {
        self.expressions
            .iter()
            .filter(|(_, e)| e.is_constant())
            .map(|(n, e)| (n.as_str(), e))
    }

    pub fn set_precomputed(&mut self, name: &str, value: Value) {
        self.precomputed.insert(name.to_string(), value);
    }
}

// ── Function descriptor ─────────────────────────────────────────────

/// Registration metadata a function exposes to the pipeline host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FunctionDescriptor {
    pub name: String,
    pub description: String,
    pub params: Vec<ParameterDescriptor>,
    pub return_type: String,
}

impl FunctionDescriptor {
    pub fn param(&self, name: &str) -> Option<&ParameterDescriptor> {
        self.params.iter().find(|p| p.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::value::Message;

    fn param() -> ParameterDescriptor {
        ParameterDescriptor::string("domain_name").description("The domain to look up.")
    }

    #[test]
    fn string_param_is_required_by_default() {
        let p = param();
        assert!(!p.optional);
        assert_eq!(p.param_type, ParamType::String);
        assert_eq!(p.description, "The domain to look up.");
    }

    #[test]
    fn resolves_field_reference() {
        let args = FunctionArgs::new().with_arg("domain_name", Expression::field("query"));
        let ctx = EvaluationContext::new(Message::new().with_field("query", "foo.com"));
        assert_eq!(param().required_string(&args, &ctx), Some("foo.com".to_string()));
        assert!(!ctx.has_errors());
    }

    #[test]
    fn missing_argument_records_error() {
        let ctx = EvaluationContext::empty();
        assert_eq!(param().required_string(&FunctionArgs::new(), &ctx), None);
        assert_eq!(ctx.errors()[0].source, "domain_name");
    }

    #[test]
    fn unresolved_field_is_none() {
        let args = FunctionArgs::new().with_arg("domain_name", Expression::field("query"));
        let ctx = EvaluationContext::empty();
        assert_eq!(param().required_string(&args, &ctx), None);
        assert!(ctx.has_errors());
    }

    #[test]
    fn non_string_is_none() {
        let args = FunctionArgs::new().with_arg("domain_name", Expression::constant(7_i64));
        let ctx = EvaluationContext::empty();
        assert_eq!(param().required_string(&args, &ctx), None);
        assert!(ctx.errors()[0].message.contains("long"));
    }

    #[test]
    fn precomputed_value_wins() {
        let mut args = FunctionArgs::new().with_arg("domain_name", Expression::field("query"));
        args.set_precomputed("domain_name", Value::from("cached.example"));
        let ctx = EvaluationContext::new(Message::new().with_field("query", "other.example"));
        assert_eq!(
            param().required_string(&args, &ctx),
            Some("cached.example".to_string())
        );
    }

    #[test]
    fn constant_args_filters_field_refs() {
        let args = FunctionArgs::new()
            .with_arg("a", Expression::constant("x"))
            .with_arg("b", Expression::field("y"));
        let names: Vec<&str> = args.constant_args().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["a"]);
    }
}
