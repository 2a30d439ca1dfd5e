//! Expression tree of an equivalent circuit.
//!
//! Every primitive lives in a [`Circuit`] arena and is addressed by a
//! [`PrimitiveId`]. Children are always allocated before their parent, so
//! arena order is a valid bottom-up evaluation order.
//!
//! Voltages and currents are signed along each primitive's own
//! `node_a -> node_b` orientation: a positive voltage means `node_a` sits at
//! the higher potential and a positive current flows from `node_a` to
//! `node_b`.

use std::fmt;
use std::ops::Index;

use ohmnet_core::NodeId;

use crate::error::{Error, Result};

/// Handle of a primitive inside a [`Circuit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PrimitiveId(u32);

impl PrimitiveId {
    /// Position of the primitive in its arena.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Which star leg of a delta-wye transform a [`Kind::Delta`] represents.
///
/// For a triangle with sides `A`, `B`, `C` the star leg at a corner is the
/// product of the two sides meeting there over the sum of all three.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Wiring {
    /// Leg opposite side `C`: `A*B / (A+B+C)`.
    OppositeC,
    /// Leg opposite side `B`: `A*C / (A+B+C)`.
    OppositeB,
    /// Leg opposite side `A`: `B*C / (A+B+C)`.
    OppositeA,
}

impl Wiring {
    /// Numeric wiring type, 1 to 3.
    pub fn as_u8(self) -> u8 {
        match self {
            Wiring::OppositeC => 1,
            Wiring::OppositeB => 2,
            Wiring::OppositeA => 3,
        }
    }

    /// Wiring from its numeric type.
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(Wiring::OppositeC),
            2 => Some(Wiring::OppositeB),
            3 => Some(Wiring::OppositeA),
            _ => None,
        }
    }

    /// Star-leg resistance for triangle sides `[A, B, C]`.
    pub fn star_resistance(self, [a, b, c]: [f64; 3]) -> f64 {
        let product = match self {
            Wiring::OppositeC => a * b,
            Wiring::OppositeB => a * c,
            Wiring::OppositeA => b * c,
        };
        product / (a + b + c)
    }
}

/// The shape of a primitive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Kind {
    /// A leaf with a fixed resistance.
    ///
    /// `element` is the index of the caller's resistor this leaf stands
    /// for; synthetic shorts and opens carry `None`.
    Resistor {
        resistance: f64,
        element: Option<usize>,
    },
    /// Two parts sharing the `junction` node and nothing else.
    ///
    /// The first part spans `node_a..junction`, the second
    /// `junction..node_b`.
    Series {
        parts: [PrimitiveId; 2],
        junction: NodeId,
    },
    /// Two parts spanning the same pair of nodes.
    Parallel { parts: [PrimitiveId; 2] },
    /// One star leg replacing the triangle `sides`.
    ///
    /// `node_a` is the triangle corner, `node_b` the star point. The sides
    /// are shared by the three legs of one transform and receive their
    /// voltages from node potentials, never from the leg itself.
    Delta {
        sides: [PrimitiveId; 3],
        wiring: Wiring,
    },
}

impl Kind {
    /// Child primitives, in order.
    pub fn children(&self) -> &[PrimitiveId] {
        match self {
            Kind::Resistor { .. } => &[],
            Kind::Series { parts, .. } | Kind::Parallel { parts } => parts,
            Kind::Delta { sides, .. } => sides,
        }
    }

    fn combine(&self, resistance_of: impl Fn(PrimitiveId) -> f64) -> f64 {
        match *self {
            Kind::Resistor { resistance, .. } => resistance,
            Kind::Series { parts, .. } => resistance_of(parts[0]) + resistance_of(parts[1]),
            Kind::Parallel { parts } => {
                1.0 / (1.0 / resistance_of(parts[0]) + 1.0 / resistance_of(parts[1]))
            }
            Kind::Delta { sides, wiring } => {
                wiring.star_resistance(sides.map(|side| resistance_of(side)))
            }
        }
    }
}

/// Voltage across and current through a primitive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OperatingPoint {
    /// Voltage drop from `node_a` to `node_b` (V).
    pub voltage: f64,
    /// Current flowing from `node_a` to `node_b` (A).
    pub current: f64,
}

/// A value imposed on a primitive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Constraint {
    /// Fix the voltage; the current follows from Ohm's law.
    Voltage(f64),
    /// Fix the current; the voltage follows from Ohm's law.
    Current(f64),
    /// Carry no current and hold no voltage, down through series and
    /// parallel parts.
    Idle,
    /// Forget the operating point of this primitive only.
    Clear,
}

/// One node of the expression tree.
#[derive(Debug, Clone, PartialEq)]
pub struct Primitive {
    kind: Kind,
    node_a: NodeId,
    node_b: NodeId,
    operating: Option<OperatingPoint>,
}

impl Primitive {
    /// Shape of the primitive.
    pub fn kind(&self) -> &Kind {
        &self.kind
    }

    /// First endpoint.
    pub fn node_a(&self) -> NodeId {
        self.node_a
    }

    /// Second endpoint.
    pub fn node_b(&self) -> NodeId {
        self.node_b
    }

    /// Voltage and current, once imposed.
    pub fn operating(&self) -> Option<OperatingPoint> {
        self.operating
    }

    /// Voltage drop from `node_a` to `node_b`, once imposed.
    pub fn voltage(&self) -> Option<f64> {
        self.operating.map(|op| op.voltage)
    }

    /// Current from `node_a` to `node_b`, once imposed.
    pub fn current(&self) -> Option<f64> {
        self.operating.map(|op| op.current)
    }
}

/// Arena owning every primitive created for one network.
#[derive(Debug, Clone, Default)]
pub struct Circuit {
    primitives: Vec<Primitive>,
}

impl Circuit {
    /// Create an empty arena.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of primitives.
    pub fn len(&self) -> usize {
        self.primitives.len()
    }

    /// Check whether the arena is empty.
    pub fn is_empty(&self) -> bool {
        self.primitives.is_empty()
    }

    /// Iterate over every primitive with its id, in allocation order.
    pub fn iter(&self) -> impl Iterator<Item = (PrimitiveId, &Primitive)> {
        self.primitives
            .iter()
            .enumerate()
            .map(|(i, p)| (PrimitiveId(i as u32), p))
    }

    /// Add a leaf resistor.
    pub fn resistor(
        &mut self,
        resistance: f64,
        element: Option<usize>,
        node_a: NodeId,
        node_b: NodeId,
    ) -> PrimitiveId {
        self.push(
            Kind::Resistor {
                resistance,
                element,
            },
            node_a,
            node_b,
        )
    }

    /// Add a series combination of `first` (spanning `node_a..junction`) and
    /// `second` (spanning `junction..node_b`).
    pub fn series(
        &mut self,
        first: PrimitiveId,
        second: PrimitiveId,
        node_a: NodeId,
        junction: NodeId,
        node_b: NodeId,
    ) -> PrimitiveId {
        self.push(
            Kind::Series {
                parts: [first, second],
                junction,
            },
            node_a,
            node_b,
        )
    }

    /// Add a parallel combination of two parts spanning `node_a..node_b`.
    pub fn parallel(
        &mut self,
        first: PrimitiveId,
        second: PrimitiveId,
        node_a: NodeId,
        node_b: NodeId,
    ) -> PrimitiveId {
        self.push(
            Kind::Parallel {
                parts: [first, second],
            },
            node_a,
            node_b,
        )
    }

    /// Add one star leg of a delta-wye transform between a triangle
    /// `corner` and the `star` point.
    pub fn delta(
        &mut self,
        sides: [PrimitiveId; 3],
        wiring: Wiring,
        corner: NodeId,
        star: NodeId,
    ) -> PrimitiveId {
        self.push(Kind::Delta { sides, wiring }, corner, star)
    }

    fn push(&mut self, kind: Kind, node_a: NodeId, node_b: NodeId) -> PrimitiveId {
        let id = PrimitiveId(self.primitives.len() as u32);
        self.primitives.push(Primitive {
            kind,
            node_a,
            node_b,
            operating: None,
        });
        id
    }

    /// Resistance of a primitive, recomputed from its live children.
    pub fn resistance(&self, id: PrimitiveId) -> f64 {
        self[id].kind.combine(|child| self.resistance(child))
    }

    /// Resistance of every primitive, indexed by [`PrimitiveId::index`].
    pub fn resistances(&self) -> Vec<f64> {
        let mut values: Vec<f64> = Vec::with_capacity(self.primitives.len());
        for primitive in &self.primitives {
            let value = primitive.kind.combine(|child| values[child.index()]);
            values.push(value);
        }
        values
    }

    /// Impose a voltage or current on a primitive and push it down the tree.
    ///
    /// Series parts all carry the series current, parallel parts all see the
    /// parallel voltage. Delta legs and leaves stop the walk.
    pub fn impose(&mut self, id: PrimitiveId, constraint: Constraint) {
        let resistances = self.resistances();
        self.impose_with(&resistances, id, constraint);
    }

    pub(crate) fn impose_with(
        &mut self,
        resistances: &[f64],
        id: PrimitiveId,
        constraint: Constraint,
    ) {
        let mut pending = vec![(id, constraint)];
        while let Some((id, constraint)) = pending.pop() {
            let r = resistances[id.index()];
            let point = match constraint {
                Constraint::Clear => {
                    self.primitives[id.index()].operating = None;
                    continue;
                }
                Constraint::Idle => OperatingPoint {
                    voltage: 0.0,
                    current: 0.0,
                },
                Constraint::Voltage(voltage) => OperatingPoint {
                    voltage,
                    current: voltage / r,
                },
                Constraint::Current(current) => OperatingPoint {
                    voltage: r * current,
                    current,
                },
            };

            let primitive = &mut self.primitives[id.index()];
            primitive.operating = Some(point);
            let (node_a, kind) = (primitive.node_a, primitive.kind);
            let idle = constraint == Constraint::Idle;

            match kind {
                Kind::Series {
                    parts: [first, second],
                    junction,
                } => {
                    let first_sign = orientation(self[first].node_a == node_a);
                    let second_sign = orientation(self[second].node_a == junction);
                    for (part, sign) in [(second, second_sign), (first, first_sign)] {
                        let pushed = if idle {
                            Constraint::Idle
                        } else {
                            Constraint::Current(sign * point.current)
                        };
                        pending.push((part, pushed));
                    }
                }
                Kind::Parallel { parts } => {
                    for part in parts.into_iter().rev() {
                        let sign = orientation(self[part].node_a == node_a);
                        let pushed = if idle {
                            Constraint::Idle
                        } else {
                            Constraint::Voltage(sign * point.voltage)
                        };
                        pending.push((part, pushed));
                    }
                }
                Kind::Resistor { .. } | Kind::Delta { .. } => {}
            }
        }
    }

    /// Forget every operating point.
    pub fn clear_all(&mut self) {
        for primitive in &mut self.primitives {
            primitive.operating = None;
        }
    }

    /// Every primitive reachable from `root`, parents before children.
    ///
    /// Delta sides shared by several legs are listed once.
    pub fn reachable(&self, root: PrimitiveId) -> Vec<PrimitiveId> {
        self.reachable_from([root])
    }

    /// Every primitive reachable from any of `roots`, in the order the
    /// roots are given.
    pub fn reachable_from(&self, roots: impl IntoIterator<Item = PrimitiveId>) -> Vec<PrimitiveId> {
        let mut seen = vec![false; self.primitives.len()];
        let mut order = Vec::new();
        let mut stack: Vec<PrimitiveId> = roots.into_iter().collect();
        stack.reverse();
        while let Some(id) = stack.pop() {
            if std::mem::replace(&mut seen[id.index()], true) {
                continue;
            }
            order.push(id);
            stack.extend(self[id].kind.children().iter().rev());
        }
        order
    }

    /// Reject values IEEE-754 arithmetic can only express as `nan` or as a
    /// meaningless split.
    ///
    /// Fails on two zero-resistance branches in parallel (the current split
    /// between them is undefined) and on any `nan` resistance, such as a
    /// delta whose sides sum to zero or multiply zero by infinity.
    pub fn check_numeric(&self, root: PrimitiveId) -> Result<()> {
        let resistances = self.resistances();
        for id in self.reachable(root) {
            if let Kind::Parallel { parts } = self[id].kind
                && parts.iter().all(|part| resistances[part.index()] == 0.0)
            {
                return Err(Error::NumericDegeneracy(format!(
                    "two short circuits in parallel: {}",
                    self.expression(id)
                )));
            }
            if resistances[id.index()].is_nan() {
                return Err(Error::NumericDegeneracy(format!(
                    "indeterminate resistance of {}",
                    self.expression(id)
                )));
            }
        }
        Ok(())
    }

    /// Render a primitive as a nested expression.
    ///
    /// Leaves print as `[R]`, series as `+(a, b)`, parallel as `:(a, b)` and
    /// star legs as `Δ(a, b, c, type)`.
    pub fn expression(&self, id: PrimitiveId) -> Expression<'_> {
        Expression { circuit: self, id }
    }
}

impl Index<PrimitiveId> for Circuit {
    type Output = Primitive;

    fn index(&self, id: PrimitiveId) -> &Primitive {
        &self.primitives[id.index()]
    }
}

fn orientation(aligned: bool) -> f64 {
    if aligned { 1.0 } else { -1.0 }
}

/// Display adapter returned by [`Circuit::expression`].
#[derive(Debug, Clone, Copy)]
pub struct Expression<'a> {
    circuit: &'a Circuit,
    id: PrimitiveId,
}

impl fmt::Display for Expression<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sub = |id| self.circuit.expression(id);
        match self.circuit[self.id].kind {
            Kind::Resistor { resistance, .. } => write!(f, "[{}]", resistance),
            Kind::Series { parts: [a, b], .. } => write!(f, "+({}, {})", sub(a), sub(b)),
            Kind::Parallel { parts: [a, b] } => write!(f, ":({}, {})", sub(a), sub(b)),
            Kind::Delta {
                sides: [a, b, c],
                wiring,
            } => write!(
                f,
                "\u{394}({}, {}, {}, {})",
                sub(a),
                sub(b),
                sub(c),
                wiring.as_u8()
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn n(id: u32) -> NodeId {
        NodeId::new(id)
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-12 * b.abs().max(1.0)
    }

    #[test]
    fn test_leaf_ohms_law() {
        for (r, i, u) in [(1.0, 1.0, 1.0), (75.5, 0.34, 25.67), (47e8, 1e-8, 47.0)] {
            let mut circuit = Circuit::new();
            let leaf = circuit.resistor(r, None, n(0), n(1));

            circuit.impose(leaf, Constraint::Current(i));
            assert!(close(circuit[leaf].voltage().unwrap(), u));

            circuit.impose(leaf, Constraint::Voltage(u));
            assert!(close(circuit[leaf].current().unwrap(), i));
        }
    }

    #[test]
    fn test_leaf_ieee_edges() {
        let mut circuit = Circuit::new();
        let leaf = circuit.resistor(1.0, None, n(0), n(1));
        circuit.impose(leaf, Constraint::Current(0.0));
        assert_eq!(circuit[leaf].voltage(), Some(0.0));
        circuit.impose(leaf, Constraint::Current(f64::INFINITY));
        assert_eq!(circuit[leaf].voltage(), Some(f64::INFINITY));

        let short = circuit.resistor(0.0, None, n(0), n(1));
        circuit.impose(short, Constraint::Current(f64::INFINITY));
        assert!(circuit[short].voltage().unwrap().is_nan());
    }

    #[test]
    fn test_clear_keeps_children() {
        let mut circuit = Circuit::new();
        let r1 = circuit.resistor(10.0, None, n(0), n(1));
        let r2 = circuit.resistor(20.0, None, n(1), n(2));
        let s = circuit.series(r1, r2, n(0), n(1), n(2));

        circuit.impose(s, Constraint::Voltage(12.0));
        circuit.impose(s, Constraint::Clear);
        assert_eq!(circuit[s].operating(), None);
        assert!(circuit[r1].operating().is_some());

        circuit.clear_all();
        assert_eq!(circuit[r1].operating(), None);
    }

    #[test]
    fn test_series_pushes_current() {
        let mut circuit = Circuit::new();
        let r1 = circuit.resistor(10.0, Some(0), n(0), n(1));
        let r2 = circuit.resistor(20.0, Some(1), n(1), n(2));
        let s = circuit.series(r1, r2, n(0), n(1), n(2));

        assert_eq!(circuit.resistance(s), 30.0);
        circuit.impose(s, Constraint::Voltage(12.0));
        assert!(close(circuit[r1].current().unwrap(), 0.4));
        assert!(close(circuit[r2].current().unwrap(), 0.4));
        assert!(close(circuit[r1].voltage().unwrap(), 4.0));
        assert!(close(circuit[r2].voltage().unwrap(), 8.0));
    }

    #[test]
    fn test_parallel_pushes_voltage() {
        let mut circuit = Circuit::new();
        let r1 = circuit.resistor(30.0, None, n(0), n(1));
        let r2 = circuit.resistor(60.0, None, n(0), n(1));
        let p = circuit.parallel(r1, r2, n(0), n(1));

        assert!(close(circuit.resistance(p), 20.0));
        circuit.impose(p, Constraint::Current(3.0));
        assert!(close(circuit[r1].voltage().unwrap(), 60.0));
        assert!(close(circuit[r1].current().unwrap(), 2.0));
        assert!(close(circuit[r2].current().unwrap(), 1.0));
    }

    #[test]
    fn test_reversed_children_get_negative_values() {
        let mut circuit = Circuit::new();
        let forward = circuit.resistor(10.0, None, n(0), n(1));
        let backward = circuit.resistor(10.0, None, n(2), n(1));
        let s = circuit.series(forward, backward, n(0), n(1), n(2));
        circuit.impose(s, Constraint::Current(1.0));
        assert_eq!(circuit[forward].current(), Some(1.0));
        assert_eq!(circuit[backward].current(), Some(-1.0));

        let flipped = circuit.resistor(10.0, None, n(2), n(0));
        let p = circuit.parallel(s, flipped, n(0), n(2));
        circuit.impose(p, Constraint::Voltage(5.0));
        assert_eq!(circuit[flipped].voltage(), Some(-5.0));
        assert_eq!(circuit[s].voltage(), Some(5.0));
    }

    #[test]
    fn test_idle_branch() {
        let mut circuit = Circuit::new();
        let open = circuit.resistor(f64::INFINITY, None, n(0), n(1));
        let short = circuit.resistor(0.0, None, n(1), n(2));
        let s = circuit.series(open, short, n(0), n(1), n(2));
        let r = circuit.resistor(10.0, None, n(0), n(2));
        let p = circuit.parallel(s, r, n(0), n(2));

        circuit.impose(p, Constraint::Idle);
        for id in [open, short, s, r, p] {
            let op = circuit[id].operating().unwrap();
            assert_eq!((op.voltage, op.current), (0.0, 0.0));
        }
        assert_eq!(circuit.reachable_from([r, s]), vec![r, s, open, short]);
    }

    #[test]
    fn test_delta_formulas() {
        let sides = [2.0, 3.0, 5.0];
        assert!(close(Wiring::OppositeC.star_resistance(sides), 0.6));
        assert!(close(Wiring::OppositeB.star_resistance(sides), 1.0));
        assert!(close(Wiring::OppositeA.star_resistance(sides), 1.5));
        for k in 1..=3 {
            assert_eq!(Wiring::from_u8(k).unwrap().as_u8(), k);
        }
        assert_eq!(Wiring::from_u8(4), None);
    }

    #[test]
    fn test_delta_does_not_push() {
        let mut circuit = Circuit::new();
        let a = circuit.resistor(1.0, None, n(0), n(1));
        let b = circuit.resistor(1.0, None, n(1), n(2));
        let c = circuit.resistor(1.0, None, n(2), n(0));
        let leg = circuit.delta([a, b, c], Wiring::OppositeC, n(1), n(3));
        circuit.impose(leg, Constraint::Current(3.0));
        assert!(close(circuit[leg].voltage().unwrap(), 1.0));
        assert_eq!(circuit[a].operating(), None);
    }

    /// Tree of a five-resistor bridge with its delta already expanded:
    /// sides 1, 3, 4 form the triangle, 2 and 5 lead to the end node.
    #[test]
    fn test_bridge_expression() {
        let mut circuit = Circuit::new();
        let (start, m1, m2, end, star) = (n(0), n(1), n(3), n(2), n(4));
        let r1 = circuit.resistor(1.0, None, start, m1);
        let r2 = circuit.resistor(2.0, None, m1, end);
        let r3 = circuit.resistor(3.0, None, m1, m2);
        let r4 = circuit.resistor(4.0, None, start, m2);
        let r5 = circuit.resistor(5.0, None, m2, end);
        let sides = [r1, r3, r4];
        let leg1 = circuit.delta(sides, Wiring::OppositeC, start, star);
        let leg2 = circuit.delta(sides, Wiring::OppositeB, m2, star);
        let leg3 = circuit.delta(sides, Wiring::OppositeA, m1, star);
        let upper = circuit.series(r2, leg3, end, m1, star);
        let lower = circuit.series(r5, leg2, end, m2, star);
        let both = circuit.parallel(upper, lower, end, star);
        let whole = circuit.series(leg1, both, start, star, end);

        assert_eq!(
            circuit.expression(whole).to_string(),
            "+(\u{394}([1], [3], [4], 1), :(+([2], \u{394}([1], [3], [4], 3)), \
             +([5], \u{394}([1], [3], [4], 2))))"
        );
        assert!(close(circuit.resistance(whole), 181.0 / 72.0));

        circuit.impose(whole, Constraint::Current(1.0));
        assert!(close(circuit[r2].voltage().unwrap().abs(), 11.0 / 9.0));
        assert!(close(circuit[r5].voltage().unwrap().abs(), 35.0 / 18.0));

        let resistances = circuit.resistances();
        for (id, _) in circuit.iter() {
            assert_eq!(resistances[id.index()], circuit.resistance(id));
        }
        assert_eq!(circuit.reachable(whole).len(), circuit.len());
    }

    #[test]
    fn test_check_numeric() {
        let mut circuit = Circuit::new();
        let s1 = circuit.resistor(0.0, None, n(0), n(1));
        let s2 = circuit.resistor(0.0, None, n(0), n(1));
        let p = circuit.parallel(s1, s2, n(0), n(1));
        assert_eq!(circuit.resistance(p), 0.0);
        assert!(matches!(
            circuit.check_numeric(p),
            Err(Error::NumericDegeneracy(_))
        ));

        let z: Vec<_> = (0..3)
            .map(|i| circuit.resistor(0.0, None, n(i), n((i + 1) % 3)))
            .collect();
        let leg = circuit.delta([z[0], z[1], z[2]], Wiring::OppositeA, n(0), n(3));
        assert!(circuit.resistance(leg).is_nan());
        assert!(circuit.check_numeric(leg).is_err());

        let fine = circuit.resistor(5.0, None, n(0), n(1));
        assert!(circuit.check_numeric(fine).is_ok());
    }
}
