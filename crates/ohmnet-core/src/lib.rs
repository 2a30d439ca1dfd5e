//! Core network representation for ohmnet.
//!
//! This crate provides the data the reduction engine consumes: electrical
//! node identities, the resistor/wire/pin element collection a drawing
//! front-end hands over, and unit handling for resistance, voltage and
//! current values.

pub mod element;
pub mod error;
pub mod node;
pub mod schematic;
pub mod units;

pub use element::Element;
pub use error::{Error, Result};
pub use node::{NodeId, NodeTracker};
pub use schematic::{Pin, Resistor, Schematic, Wire};
pub use units::Quantity;
