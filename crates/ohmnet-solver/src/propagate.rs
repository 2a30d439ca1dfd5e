//! Distribution of an imposed source over a reduced circuit.

use std::hash::{Hash, Hasher};

use log::debug;
use ohmnet_core::{NodeId, Quantity};

use crate::error::{Error, Result};
use crate::primitive::{Circuit, Constraint};
use crate::reduce::Reduction;

/// An ideal source connected between the start and end terminals.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Source {
    /// Fixed voltage (V).
    Voltage(f64),
    /// Fixed current (A).
    Current(f64),
}

impl Source {
    /// Create a source from the quantity it fixes.
    pub fn new(quantity: Quantity, amount: f64) -> Result<Self> {
        match quantity {
            Quantity::Voltage => Ok(Source::Voltage(amount)),
            Quantity::Current => Ok(Source::Current(amount)),
            Quantity::Resistance => Err(Error::Core(ohmnet_core::Error::UnknownUnit(
                quantity.unit().to_string(),
            ))),
        }
    }

    /// Create a source from a unit tag, `"V"` or `"A"`.
    pub fn from_unit(unit: &str, amount: f64) -> Result<Self> {
        Source::new(Quantity::from_unit(unit)?, amount)
    }

    /// Quantity the source fixes.
    pub fn quantity(self) -> Quantity {
        match self {
            Source::Voltage(_) => Quantity::Voltage,
            Source::Current(_) => Quantity::Current,
        }
    }

    /// Magnitude of the source.
    pub fn amount(self) -> f64 {
        match self {
            Source::Voltage(v) | Source::Current(v) => v,
        }
    }

    fn constraint(self, sign: f64) -> Constraint {
        match self {
            Source::Voltage(v) => Constraint::Voltage(sign * v),
            Source::Current(i) => Constraint::Current(sign * i),
        }
    }
}

impl Hash for Source {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.quantity().hash(state);
        self.amount().to_bits().hash(state);
    }
}

/// Node potentials, measured as the voltage drop from the start node.
///
/// The start node sits at `0`, the end node at the source voltage, and a
/// resistor from `a` to `b` carries a current `(p[b] - p[a]) / R` from `a`
/// towards `b`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Potentials {
    values: Vec<Option<f64>>,
}

impl Potentials {
    fn with_bound(node_bound: u32) -> Self {
        Self {
            values: vec![None; node_bound as usize],
        }
    }

    /// Potential of a node, once established.
    pub fn get(&self, node: NodeId) -> Option<f64> {
        self.values.get(node.index()).copied().flatten()
    }

    /// Voltage drop from `a` to `b`, once both potentials are established.
    pub fn voltage(&self, a: NodeId, b: NodeId) -> Option<f64> {
        Some(self.get(b)? - self.get(a)?)
    }

    /// Number of nodes with an established potential.
    pub fn known(&self) -> usize {
        self.values.iter().filter(|v| v.is_some()).count()
    }

    /// Size of the node table, including star points.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check whether the node table is empty.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn set(&mut self, node: NodeId, value: f64) {
        self.values[node.index()] = Some(value);
    }
}

/// Impose `source` on a reduced circuit and derive the voltage and
/// current of every primitive in it.
///
/// The source is pushed down from the root through series and parallel
/// parts, and pruned branches are marked idle. Then every primitive is
/// revisited until nothing changes: a known voltage with one known endpoint
/// fixes the other endpoint, and two known endpoints fix the voltage of a
/// primitive nobody imposed one on yet (the triangle sides behind a
/// delta-wye transform).
pub fn propagate(
    circuit: &mut Circuit,
    reduction: &Reduction,
    start: NodeId,
    source: Source,
) -> Potentials {
    circuit.clear_all();
    let resistances = circuit.resistances();
    let root = reduction.root;

    let bound = reduction.node_bound.max(start.as_u32() + 1);
    let mut potentials = Potentials::with_bound(bound);
    potentials.set(start, 0.0);

    let sign = if circuit[root].node_a() == start { 1.0 } else { -1.0 };
    circuit.impose_with(&resistances, root, source.constraint(sign));
    for &pruned in &reduction.pruned {
        circuit.impose_with(&resistances, pruned, Constraint::Idle);
    }

    let roots = std::iter::once(root).chain(reduction.pruned.iter().copied());
    let order = circuit.reachable_from(roots);
    let mut passes = 0;
    loop {
        passes += 1;
        let mut changed = false;
        for &id in &order {
            let (a, b, voltage) = {
                let primitive = &circuit[id];
                (primitive.node_a(), primitive.node_b(), primitive.voltage())
            };
            match (voltage, potentials.get(a), potentials.get(b)) {
                (Some(u), Some(pa), None) => potentials.set(b, pa + u),
                (Some(u), None, Some(pb)) => potentials.set(a, pb - u),
                (None, Some(pa), Some(pb)) => {
                    circuit.impose_with(&resistances, id, Constraint::Voltage(pb - pa))
                }
                _ => continue,
            }
            changed = true;
        }
        if !changed {
            break;
        }
    }
    debug!(
        "potentials settled after {} passes, {} of {} nodes known",
        passes,
        potentials.known(),
        potentials.len()
    );

    potentials
}
