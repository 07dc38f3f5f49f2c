//! Common error types

pub mod errors;
