//! Memoizing calculator over a [`Schematic`].

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use ohmnet_core::{NodeId, Pin, Schematic};

use crate::error::{Error, Result};
use crate::options::SolveOptions;
use crate::primitive::{Circuit, PrimitiveId};
use crate::propagate::{Potentials, Source, propagate};
use crate::reduce::{Rule, Triple, reduce};

/// Voltage across and current through one resistor.
///
/// Both values are signed along the resistor's `pos_a -> pos_b`
/// orientation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reading {
    /// Voltage drop from `pos_a` to `pos_b` (V).
    pub voltage: f64,
    /// Current from `pos_a` to `pos_b` (A).
    pub current: f64,
}

/// Result of one calculation.
#[derive(Debug, Clone)]
pub struct Solution {
    /// Arena holding every primitive built during reduction.
    pub circuit: Circuit,
    /// Primitive equivalent to the whole network.
    pub root: PrimitiveId,
    /// Node of the start pin.
    pub start: NodeId,
    /// Node of the end pin.
    pub end: NodeId,
    /// Reduction rules in the order they fired.
    pub steps: Vec<Rule>,
    /// Source the solution was computed for.
    pub source: Option<Source>,
    /// Node potentials, present when a source was imposed.
    pub potentials: Option<Potentials>,
    readings: Vec<Option<Reading>>,
}

impl Solution {
    /// Equivalent resistance between the start and end pins (Ω).
    pub fn resistance(&self) -> f64 {
        self.circuit.resistance(self.root)
    }

    /// Equivalent circuit rendered as a nested expression.
    pub fn expression(&self) -> String {
        self.circuit.expression(self.root).to_string()
    }

    /// Total current delivered by the source (A).
    pub fn current(&self) -> Option<f64> {
        self.total().map(|(_, current)| current)
    }

    /// Voltage across the terminals (V).
    pub fn voltage(&self) -> Option<f64> {
        self.total().map(|(voltage, _)| voltage)
    }

    fn total(&self) -> Option<(f64, f64)> {
        let root = &self.circuit[self.root];
        let op = root.operating()?;
        if root.node_a() == self.start {
            Some((op.voltage, op.current))
        } else {
            Some((-op.voltage, -op.current))
        }
    }

    /// Reading of the resistor at `index` in the schematic.
    pub fn reading(&self, index: usize) -> Option<Reading> {
        self.readings.get(index).copied().flatten()
    }

    /// Readings of every resistor, in schematic order.
    pub fn readings(&self) -> &[Option<Reading>] {
        &self.readings
    }
}

/// A schematic together with the last calculation done on it.
///
/// [`Board::calculate`] skips the work when neither the schematic, the
/// source nor the options changed since the last successful run.
#[derive(Debug, Clone)]
pub struct Board<P> {
    schematic: Schematic<P>,
    options: SolveOptions,
    last: Option<(u64, Solution)>,
}

impl<P> Board<P>
where
    P: Hash + Eq + Clone + std::fmt::Debug,
{
    /// Create a board with default options.
    pub fn new(schematic: Schematic<P>) -> Self {
        Self::with_options(schematic, SolveOptions::default())
    }

    /// Create a board with the given options.
    pub fn with_options(schematic: Schematic<P>, options: SolveOptions) -> Self {
        Self {
            schematic,
            options,
            last: None,
        }
    }

    /// The schematic, including the readings of the last calculation.
    pub fn schematic(&self) -> &Schematic<P> {
        &self.schematic
    }

    /// Mutable access to the schematic.
    pub fn schematic_mut(&mut self) -> &mut Schematic<P> {
        &mut self.schematic
    }

    /// Current options.
    pub fn options(&self) -> SolveOptions {
        self.options
    }

    /// Replace the options.
    pub fn set_options(&mut self, options: SolveOptions) {
        self.options = options;
    }

    /// Forget the last solution so the next calculation runs in full.
    pub fn invalidate(&mut self) {
        self.last = None;
    }

    /// Whether the last solution still matches the board and `source`.
    pub fn is_current(&self, source: Option<Source>) -> bool {
        let key = self.key(source);
        self.last.as_ref().is_some_and(|(cached, _)| *cached == key)
    }

    fn key(&self, source: Option<Source>) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.schematic.hash(&mut hasher);
        source.hash(&mut hasher);
        self.options.hash(&mut hasher);
        hasher.finish()
    }

    /// Reduce the schematic and, given a source, compute the reading of
    /// every resistor.
    ///
    /// Readings are written back onto the schematic's resistors as
    /// magnitudes.
    pub fn calculate(&mut self, source: Option<Source>) -> Result<&Solution> {
        let key = self.key(source);
        match self.last.take() {
            Some((cached, solution)) if cached == key => {
                log::debug!("schematic unchanged, reusing last solution");
                Ok(&self.last.insert((cached, solution)).1)
            }
            _ => {
                let solution = self.solve(source)?;
                Ok(&self.last.insert((key, solution)).1)
            }
        }
    }

    fn solve(&mut self, source: Option<Source>) -> Result<Solution> {
        let strict = self.options.is_strict();
        let schematic = &mut self.schematic;
        schematic.clear_readings();

        let nodes = schematic.identify_nodes();
        schematic.assign_nodes(&nodes);
        let pin_node = |pin| schematic.pin(pin).and_then(|pos| nodes.search_node(pos));
        let (Some(start), Some(end)) = (pin_node(Pin::Start), pin_node(Pin::End)) else {
            return Err(Error::NoTerminals);
        };

        let mut circuit = Circuit::new();
        let mut leaves = Vec::with_capacity(schematic.num_resistors());
        let mut triples = Vec::with_capacity(schematic.num_resistors());
        for (index, resistor) in schematic.resistors().iter().enumerate() {
            let Some((a, b)) = resistor.node_a.zip(resistor.node_b) else {
                return Err(ohmnet_core::Error::ElementNotFound(resistor.name.clone()).into());
            };
            let leaf = circuit.resistor(resistor.resistance(), Some(index), a, b);
            leaves.push(leaf);
            triples.push(Triple::new(a, leaf, b));
        }

        log::info!(
            "reducing {} resistors over {} nodes",
            leaves.len(),
            nodes.node_count()
        );
        let reduction = reduce(&mut circuit, triples, start, end, nodes.id_bound())?;
        if strict {
            circuit.check_numeric(reduction.root)?;
        }

        let potentials = source.map(|source| propagate(&mut circuit, &reduction, start, source));

        let readings: Vec<Option<Reading>> = schematic
            .resistors()
            .iter()
            .zip(&leaves)
            .map(|(resistor, &leaf)| match circuit[leaf].operating() {
                Some(op) => Some(Reading {
                    voltage: op.voltage,
                    current: op.current,
                }),
                None => potentials
                    .as_ref()
                    .and_then(|p| p.voltage(circuit[leaf].node_a(), circuit[leaf].node_b()))
                    .map(|voltage| Reading {
                        voltage,
                        current: voltage / resistor.resistance(),
                    }),
            })
            .collect();

        let solution = Solution {
            circuit,
            root: reduction.root,
            start,
            end,
            steps: reduction.steps,
            source,
            potentials,
            readings,
        };

        // Nothing is written back unless the whole calculation succeeds.
        if strict {
            for (resistor, reading) in schematic.resistors().iter().zip(&solution.readings) {
                if let Some(reading) = reading
                    && !(reading.voltage.is_finite() && reading.current.is_finite())
                {
                    return Err(Error::NumericDegeneracy(format!(
                        "{} reads {} V and {} A",
                        resistor.name, reading.voltage, reading.current
                    )));
                }
            }
            if let Some((voltage, current)) = solution.total()
                && !(voltage.is_finite() && current.is_finite())
            {
                return Err(Error::NumericDegeneracy(format!(
                    "source sees {} V and {} A",
                    voltage, current
                )));
            }
        }

        for (resistor, reading) in schematic.resistors_mut().iter_mut().zip(&solution.readings) {
            if let Some(reading) = reading {
                resistor.voltage = Some(reading.voltage.abs());
                resistor.current = Some(reading.current.abs());
            }
        }
        Ok(solution)
    }
}
