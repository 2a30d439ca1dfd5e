//! Error types for ohmnet-parser.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("parse error at line {line}: {message}")]
    ParseError { line: usize, message: String },

    #[error("unknown element type: {0}")]
    UnknownElement(String),

    #[error("invalid value: {0}")]
    InvalidValue(String),

    #[error("missing node for {0}")]
    MissingNode(String),

    #[error(transparent)]
    Core(#[from] ohmnet_core::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
