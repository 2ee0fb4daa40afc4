use std::sync::Mutex;

use super::value::Message;

/// An error recorded while evaluating a function against a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvaluationError {
    /// Name of the function or parameter that failed.
    pub source: String,
    pub message: String,
}

/// Per-message evaluation state handed to every function call.
///
/// Errors are recorded through `&self` so a context can be shared by
/// the functions of one rule without threading `&mut` through them.
#[derive(Debug, Default)]
pub struct EvaluationContext {
    message: Message,
    errors: Mutex<Vec<EvaluationError>>,
}

impl EvaluationContext {
    pub fn new(message: Message) -> Self {
        Self {
            message,
            errors: Mutex::new(Vec::new()),
        }
    }

    /// Context without a message. Used for constant folding, where
    /// no field reference can resolve.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn message(&self) -> &Message {
        &self.message
    }

    pub fn add_error(&self, source: &str, message: impl Into<String>) {
        let err = EvaluationError {
            source: source.to_string(),
            message: message.into(),
        };
        match self.errors.lock() {
            Ok(mut errors) => errors.push(err),
            Err(poisoned) => poisoned.into_inner().push(err),
        }
    }

    pub fn has_errors(&self) -> bool {
        !self.errors().is_empty()
    }

    pub fn errors(&self) -> Vec<EvaluationError> {
        match self.errors.lock() {
            Ok(errors) => errors.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}
