//! Minimal host-side model of the log-processing pipeline: message values,
//! argument expressions, evaluation context and function descriptors.

pub mod context;
pub mod expression;
pub mod function;
pub mod value;
