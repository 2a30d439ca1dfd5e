//! Electrical quantities, their units, and SI prefix handling.

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// A physical quantity carried by a resistor or a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Quantity {
    /// Resistance (R), in ohms.
    Resistance,
    /// Voltage (U), in volts.
    Voltage,
    /// Current (I), in amperes.
    Current,
}

impl Quantity {
    /// Unit symbol of the quantity.
    pub fn unit(self) -> &'static str {
        match self {
            Quantity::Resistance => "\u{2126}",
            Quantity::Voltage => "V",
            Quantity::Current => "A",
        }
    }

    /// Conventional one-letter symbol of the quantity (R, U, I).
    pub fn symbol(self) -> char {
        match self {
            Quantity::Resistance => 'R',
            Quantity::Voltage => 'U',
            Quantity::Current => 'I',
        }
    }

    /// Look up a quantity from its unit symbol.
    pub fn from_unit(unit: &str) -> Result<Self> {
        match unit {
            "\u{2126}" | "\u{3a9}" | "ohm" => Ok(Quantity::Resistance),
            "V" | "v" => Ok(Quantity::Voltage),
            "A" | "a" => Ok(Quantity::Current),
            other => Err(Error::UnknownUnit(other.to_string())),
        }
    }
}

impl FromStr for Quantity {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Quantity::from_unit(s.trim())
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.unit())
    }
}

/// Suffixes accepted after a number, matched case-insensitively.
///
/// `MEG` comes before `M` and `G` so `1MEG` is a megohm, not a milli-unit.
const SUFFIXES: [(&str, f64); 9] = [
    ("MEG", 1e6),
    ("T", 1e12),
    ("G", 1e9),
    ("K", 1e3),
    ("M", 1e-3),
    ("U", 1e-6),
    ("N", 1e-9),
    ("P", 1e-12),
    ("F", 1e-15),
];

/// Prefixes used when printing, largest first.
const PREFIXES: [(f64, &str); 10] = [
    (1e12, "T"),
    (1e9, "G"),
    (1e6, "M"),
    (1e3, "k"),
    (1.0, ""),
    (1e-3, "m"),
    (1e-6, "u"),
    (1e-9, "n"),
    (1e-12, "p"),
    (1e-15, "f"),
];

/// Parse a number with an optional SI suffix, e.g. `4.7k` or `1MEG`.
///
/// `inf` and `open` both parse as `+∞`, the resistance of an open circuit.
pub fn parse_value(s: &str) -> Option<f64> {
    let text = s.trim().to_ascii_uppercase();
    match text.as_str() {
        "" => None,
        "INF" | "OPEN" => Some(f64::INFINITY),
        _ => text.parse::<f64>().ok().or_else(|| {
            SUFFIXES.iter().find_map(|&(suffix, scale)| {
                let number = text.strip_suffix(suffix)?;
                number.parse::<f64>().ok().map(|v| v * scale)
            })
        }),
    }
}

/// Print a value scaled to the nearest SI prefix with four decimals.
pub fn format_value(value: f64) -> String {
    if !value.is_finite() {
        return value.to_string();
    }
    let magnitude = value.abs();
    let (scale, prefix) = PREFIXES
        .iter()
        .copied()
        .find(|&(scale, _)| magnitude >= scale)
        .unwrap_or((1.0, ""));
    format!("{:.4}{}", value / scale, prefix)
}

/// Format a value of a quantity with SI prefix and unit, e.g. `4.7000k\u{2126}`.
pub fn format_quantity(value: f64, quantity: Quantity) -> String {
    format!("{}{}", format_value(value), quantity.unit())
}
