//! Calmux shared core: configuration, error types, constants.

pub mod config;
pub mod constants;
pub mod error;
pub mod types;
