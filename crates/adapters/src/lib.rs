#![deny(unsafe_code)]

pub mod threatintel;
