#![forbid(unsafe_code)]

pub mod common;
pub mod pipeline;
pub mod threatintel;
