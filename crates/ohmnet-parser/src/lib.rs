//! Netlist reader for ohmnet.
//!
//! A netlist lists resistors and wires between named positions, the two
//! terminals, and optionally the source to impose:
//!
//! ```
//! use ohmnet_core::{Pin, Quantity};
//! use ohmnet_parser::parse;
//!
//! let result = parse(r#"
//! .title Voltage Divider
//! R1 in mid 10
//! R2 mid out 20
//! .terminals in out
//! .source V 12
//! .end
//! "#).unwrap();
//!
//! assert_eq!(result.title(), Some("Voltage Divider"));
//! assert_eq!(result.schematic.num_resistors(), 2);
//! assert_eq!(result.schematic.pin(Pin::End).map(String::as_str), Some("out"));
//! assert_eq!(result.source.unwrap().quantity, Quantity::Voltage);
//! ```

pub mod error;
pub mod lexer;
pub mod parser;

pub use error::{Error, Result};
pub use parser::{ParseResult, SourceSpec, parse};
