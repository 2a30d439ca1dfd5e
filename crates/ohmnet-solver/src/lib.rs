//! Equivalent-resistance solver for ohmnet.
//!
//! This crate provides:
//! - The primitive algebra: an arena of resistor, series, parallel and
//!   delta-wye primitives that compute their resistance from their children
//! - The reduction engine that rewrites a two-terminal resistor network into
//!   a single primitive
//! - Voltage/current propagation from an imposed source down to every
//!   original resistor
//! - [`Board`], a memoizing calculator over a [`Schematic`](ohmnet_core::Schematic)

pub mod board;
pub mod error;
pub mod options;
pub mod primitive;
pub mod propagate;
pub mod reduce;

pub use board::{Board, Reading, Solution};
pub use error::{Error, Result};
pub use options::{NumericMode, SolveOptions};
pub use primitive::{Circuit, Constraint, Kind, OperatingPoint, Primitive, PrimitiveId, Wiring};
pub use propagate::{Potentials, Source, propagate};
pub use reduce::{Reduction, Rule, Triple, reduce};
