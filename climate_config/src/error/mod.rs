//! Error types produced while aggregating configuration.

mod constructors;
mod types;

pub use types::ClimateError;
