//! Error types for ohmnet-solver.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("no terminals specified: both the start and the end pin must be placed")]
    NoTerminals,

    #[error("no rule can simplify the circuit further ({remaining} connections remain)")]
    StructuralReduction { remaining: usize },

    #[error("numeric degeneracy: {0}")]
    NumericDegeneracy(String),

    #[error(transparent)]
    Core(#[from] ohmnet_core::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
