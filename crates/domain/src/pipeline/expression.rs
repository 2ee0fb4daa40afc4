use super::context::EvaluationContext;
use super::value::Value;

/// A function argument expression as resolved by the rule parser.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// A literal written in the rule source.
    Constant(Value),
    /// A reference to a field of the current message, e.g. `$message.dns_query`.
    Field(String),
}

impl Expression {
    pub fn constant(value: impl Into<Value>) -> Self {
        Self::Constant(value.into())
    }

    pub fn field(name: &str) -> Self {
        Self::Field(name.to_string())
    }

    /// Constant expressions do not depend on the message and can be
    /// evaluated once when the rule is loaded.
    pub fn is_constant(&self) -> bool {
        matches!(self, Self::Constant(_))
    }

    /// Evaluate against a message. Missing fields evaluate to `Value::Null`.
    pub fn evaluate(&self, ctx: &EvaluationContext) -> Value {
        match self {
            Self::Constant(v) => v.clone(),
            Self::Field(name) => ctx.message().field(name).cloned().unwrap_or_default(),
        }
    }
}
