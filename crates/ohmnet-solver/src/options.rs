//! Solver configuration.

/// How degenerate arithmetic is reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum NumericMode {
    /// Follow IEEE-754: results may be `0`, `inf` or `nan` and the caller
    /// interprets them.
    #[default]
    Lenient,
    /// Fail with [`Error::NumericDegeneracy`](crate::Error::NumericDegeneracy)
    /// on parallel shorts, `nan` resistances and non-finite voltages or
    /// currents.
    Strict,
}

/// Options for a full calculation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SolveOptions {
    /// Treatment of degenerate arithmetic.
    pub numeric: NumericMode,
}

impl SolveOptions {
    /// Options that reject degenerate arithmetic.
    pub fn strict() -> Self {
        Self {
            numeric: NumericMode::Strict,
        }
    }

    /// Whether degenerate arithmetic is an error.
    pub fn is_strict(&self) -> bool {
        self.numeric == NumericMode::Strict
    }
}
