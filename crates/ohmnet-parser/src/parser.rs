//! Netlist parser.

use std::collections::HashSet;

use ohmnet_core::units::parse_value;
use ohmnet_core::{Pin, Quantity, Schematic};

use crate::error::{Error, Result};
use crate::lexer::{Lexer, SpannedToken, Token};

/// Source requested by a `.source` line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SourceSpec {
    /// Voltage or current.
    pub quantity: Quantity,
    /// Amount in volts or amperes.
    pub amount: f64,
}

/// Result of parsing a netlist.
#[derive(Debug, Clone)]
pub struct ParseResult {
    /// Resistors, wires and terminal pins, keyed by position name.
    pub schematic: Schematic<String>,
    /// Source to impose, if the netlist names one.
    pub source: Option<SourceSpec>,
}

impl ParseResult {
    /// Title given by a `.title` line.
    pub fn title(&self) -> Option<&str> {
        self.schematic.title()
    }
}

/// Parse a netlist.
///
/// Element lines start with their name: `R<name> <a> <b> <value>` for a
/// resistor, `W<name> <a> <b>` for a wire. Commands are `.title <text>`,
/// `.terminals <start> <end>`, `.source V|A <amount>` and `.end`, after
/// which nothing is read.
pub fn parse(input: &str) -> Result<ParseResult> {
    let tokens = Lexer::new(input).tokenize()?;
    Parser::new(&tokens).parse_all()
}

struct Parser<'a> {
    tokens: &'a [SpannedToken],
    pos: usize,
    schematic: Schematic<String>,
    source: Option<SourceSpec>,
    names: HashSet<String>,
}

impl<'a> Parser<'a> {
    fn new(tokens: &'a [SpannedToken]) -> Self {
        Self {
            tokens,
            pos: 0,
            schematic: Schematic::new(),
            source: None,
            names: HashSet::new(),
        }
    }

    fn parse_all(mut self) -> Result<ParseResult> {
        loop {
            self.skip_eol();
            let line = self.current_line();
            match self.peek().clone() {
                Token::Eof => break,
                Token::Command(cmd) if cmd == "END" => break,
                Token::Command(cmd) => {
                    self.advance();
                    self.parse_command(&cmd, line)?;
                }
                Token::Name(name) => {
                    self.advance();
                    self.parse_element(name, line)?;
                }
                other => {
                    return Err(Error::ParseError {
                        line,
                        message: format!("expected element or command, found {:?}", other),
                    });
                }
            }
            self.expect_eol(line)?;
        }

        Ok(ParseResult {
            schematic: self.schematic,
            source: self.source,
        })
    }

    fn parse_element(&mut self, name: String, line: usize) -> Result<()> {
        if !self.names.insert(name.to_uppercase()) {
            return Err(Error::ParseError {
                line,
                message: format!("duplicate element name {}", name),
            });
        }

        match name.chars().next().map(|c| c.to_ascii_uppercase()) {
            Some('R') => {
                let a = self.expect_node(&name)?;
                let b = self.expect_node(&name)?;
                let value = self.expect_value(line)?;
                self.schematic.add_resistor(name, a, b, value)?;
            }
            Some('W') => {
                let a = self.expect_node(&name)?;
                let b = self.expect_node(&name)?;
                self.schematic.add_wire(name, a, b);
            }
            _ => return Err(Error::UnknownElement(name)),
        }
        Ok(())
    }

    fn parse_command(&mut self, cmd: &str, line: usize) -> Result<()> {
        match cmd {
            "TITLE" => {
                if let Token::Text(text) = self.peek() {
                    let text = text.clone();
                    self.advance();
                    self.schematic.set_title(text);
                }
            }
            "TERMINALS" => {
                let start = self.expect_node(".terminals")?;
                let end = self.expect_node(".terminals")?;
                self.schematic.place_pin(Pin::Start, start);
                self.schematic.place_pin(Pin::End, end);
            }
            "SOURCE" => {
                let unit = match self.peek() {
                    Token::Name(unit) => unit.clone(),
                    _ => {
                        return Err(Error::ParseError {
                            line,
                            message: "expected source unit V or A".to_string(),
                        });
                    }
                };
                self.advance();
                let quantity = match Quantity::from_unit(&unit)? {
                    Quantity::Resistance => {
                        return Err(Error::ParseError {
                            line,
                            message: "a source fixes a voltage (V) or a current (A)".to_string(),
                        });
                    }
                    quantity => quantity,
                };
                let amount = self.expect_value(line)?;
                self.source = Some(SourceSpec { quantity, amount });
            }
            other => {
                return Err(Error::ParseError {
                    line,
                    message: format!("unknown command .{}", other.to_lowercase()),
                });
            }
        }
        Ok(())
    }

    fn peek(&self) -> &Token {
        self.tokens
            .get(self.pos)
            .map(|t| &t.token)
            .unwrap_or(&Token::Eof)
    }

    fn current_line(&self) -> usize {
        self.tokens.get(self.pos).map(|t| t.line).unwrap_or(0)
    }

    fn advance(&mut self) {
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
    }

    fn skip_eol(&mut self) {
        while matches!(self.peek(), Token::Eol) {
            self.advance();
        }
    }

    fn expect_eol(&mut self, line: usize) -> Result<()> {
        match self.peek() {
            Token::Eol | Token::Eof => Ok(()),
            Token::Command(cmd) if cmd == "END" => Ok(()),
            other => Err(Error::ParseError {
                line,
                message: format!("unexpected {:?} at end of line", other),
            }),
        }
    }

    fn expect_node(&mut self, element: &str) -> Result<String> {
        match self.peek() {
            Token::Name(node) | Token::Value(node) => {
                let node = node.clone();
                self.advance();
                Ok(node)
            }
            _ => Err(Error::MissingNode(element.to_string())),
        }
    }

    fn expect_value(&mut self, line: usize) -> Result<f64> {
        match self.peek() {
            Token::Value(v) | Token::Name(v) => {
                let v = v.clone();
                self.advance();
                parse_value(&v).ok_or(Error::InvalidValue(v))
            }
            _ => Err(Error::ParseError {
                line,
                message: "expected value".to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_divider() {
        let result = parse(
            "* divider\n\
             R1 a b 10\n\
             R2 b c 20 ; load\n\
             .terminals a c\n\
             .source V 12\n\
             .end\n",
        )
        .unwrap();

        let sch = &result.schematic;
        assert_eq!(sch.num_resistors(), 2);
        assert_eq!(sch.resistor("R2").unwrap().resistance(), 20.0);
        assert_eq!(sch.resistor("R2").unwrap().pos_a, "b");
        assert_eq!(sch.pin(Pin::Start).map(String::as_str), Some("a"));
        assert_eq!(sch.pin(Pin::End).map(String::as_str), Some("c"));
        assert_eq!(
            result.source,
            Some(SourceSpec {
                quantity: Quantity::Voltage,
                amount: 12.0
            })
        );
        assert_eq!(result.title(), None);
    }

    #[test]
    fn test_parse_wires_and_suffixes() {
        let result = parse("R1 1 2 4.7k\nW1 2 3\nR2 3 0 1MEG\nRopen 1 0 open").unwrap();
        let sch = &result.schematic;
        assert_eq!(sch.wires().len(), 1);
        assert_eq!(sch.wires()[0].pos_b, "3");
        assert!((sch.resistor("R1").unwrap().resistance() - 4700.0).abs() < 1e-9);
        assert!((sch.resistor("R2").unwrap().resistance() - 1e6).abs() < 1e-6);
        assert_eq!(sch.resistor("Ropen").unwrap().resistance(), f64::INFINITY);
        assert!(result.source.is_none());
    }

    #[test]
    fn test_parse_title_and_current_source() {
        let result = parse(".title Bridge (unbalanced)\nR1 a b 1\n.source A 0.5m").unwrap();
        assert_eq!(result.title(), Some("Bridge (unbalanced)"));
        let source = result.source.unwrap();
        assert_eq!(source.quantity, Quantity::Current);
        assert!((source.amount - 0.5e-3).abs() < 1e-15);
    }

    #[test]
    fn test_end_stops_parsing() {
        let result = parse("R1 a b 1\n.end\nthis is ignored").unwrap();
        assert_eq!(result.schematic.num_resistors(), 1);
    }

    #[test]
    fn test_unknown_element() {
        let err = parse("C1 a b 1u").unwrap_err();
        assert!(matches!(err, Error::UnknownElement(name) if name == "C1"));
    }

    #[test]
    fn test_missing_node() {
        let err = parse("R1 a\n").unwrap_err();
        assert!(matches!(err, Error::MissingNode(name) if name == "R1"));
        let err = parse(".terminals a").unwrap_err();
        assert!(matches!(err, Error::MissingNode(_)));
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            parse("R1 a b 10X"),
            Err(Error::InvalidValue(v)) if v == "10X"
        ));
        assert!(matches!(
            parse("R1 a b -5"),
            Err(Error::Core(ohmnet_core::Error::InvalidResistance { .. }))
        ));
        assert!(matches!(
            parse("R1 a b"),
            Err(Error::ParseError { line: 1, .. })
        ));
    }

    #[test]
    fn test_bad_source_and_commands() {
        assert!(matches!(
            parse(".source W 5"),
            Err(Error::Core(ohmnet_core::Error::UnknownUnit(_)))
        ));
        assert!(matches!(
            parse(".source ohm 5"),
            Err(Error::ParseError { .. })
        ));
        assert!(matches!(
            parse("R1 a b 1\n.tran 1n 10n"),
            Err(Error::ParseError { line: 2, .. })
        ));
    }

    #[test]
    fn test_trailing_tokens_and_duplicates() {
        assert!(matches!(
            parse("W1 a b c"),
            Err(Error::ParseError { line: 1, .. })
        ));
        assert!(matches!(
            parse("R1 a b 1\nr1 b c 2"),
            Err(Error::ParseError { line: 2, .. })
        ));
    }
}
