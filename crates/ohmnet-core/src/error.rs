//! Error types for ohmnet-core.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("resistor {name} has invalid resistance: {value}")]
    InvalidResistance { name: String, value: f64 },

    #[error("unknown unit: {0}")]
    UnknownUnit(String),

    #[error("element not found: {0}")]
    ElementNotFound(String),
}

pub type Result<T> = std::result::Result<T, Error>;
