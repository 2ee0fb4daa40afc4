#![forbid(unsafe_code)]

pub mod otx_lookup_function;
