//! Reduction of a two-terminal resistor network to a single primitive.
//!
//! The engine keeps a working list of `(node, primitive, node)` triples and
//! rewrites it with four rules, always retrying from the first rule after
//! any rewrite:
//!
//! 1. [`Rule::Unnecessary`]: drop dangling branches and self-loops.
//! 2. [`Rule::Series`]: eliminate a non-terminal node with two connections.
//! 3. [`Rule::Parallel`]: merge two connections between the same nodes.
//! 4. [`Rule::DeltaWye`]: replace a triangle by a star around a new node.
//!
//! Every rewrite keeps the list electrically equivalent to the original
//! network between the start and end nodes.

use std::collections::HashMap;
use std::fmt;

use log::{debug, trace};
use ohmnet_core::NodeId;

use crate::error::{Error, Result};
use crate::primitive::{Circuit, PrimitiveId, Wiring};

/// A `(node, primitive, node)` edge of the working graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Triple {
    pub node_a: NodeId,
    pub primitive: PrimitiveId,
    pub node_b: NodeId,
}

impl Triple {
    /// Create a new triple.
    pub fn new(node_a: NodeId, primitive: PrimitiveId, node_b: NodeId) -> Self {
        Self {
            node_a,
            primitive,
            node_b,
        }
    }

    /// The endpoint opposite to `known`.
    pub fn other_side(&self, known: NodeId) -> NodeId {
        if self.node_a == known {
            self.node_b
        } else {
            self.node_a
        }
    }

    /// Whether both endpoints are the same node.
    pub fn is_loop(&self) -> bool {
        self.node_a == self.node_b
    }

    fn same_nodes(&self, other: &Triple) -> bool {
        (self.node_a, self.node_b) == (other.node_a, other.node_b)
            || (self.node_a, self.node_b) == (other.node_b, other.node_a)
    }
}

/// A reduction rule, in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rule {
    /// Dangling branches and self-loops carry no current.
    Unnecessary,
    /// Two connections meeting at a node nothing else touches.
    Series,
    /// Two connections between the same pair of nodes.
    Parallel,
    /// A triangle of three nodes replaced by an equivalent star.
    DeltaWye,
}

impl Rule {
    /// All rules, cheapest and most specific first.
    pub const ORDER: [Rule; 4] = [Rule::Unnecessary, Rule::Series, Rule::Parallel, Rule::DeltaWye];
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Rule::Unnecessary => "unnecessary-edge removal",
            Rule::Series => "series merge",
            Rule::Parallel => "parallel merge",
            Rule::DeltaWye => "delta-wye transform",
        };
        f.write_str(name)
    }
}

/// Outcome of a successful reduction.
#[derive(Debug, Clone, PartialEq)]
pub struct Reduction {
    /// The primitive equivalent to the whole network.
    pub root: PrimitiveId,
    /// Exclusive upper bound of every node id in the result, including
    /// star points introduced by delta-wye transforms.
    pub node_bound: u32,
    /// Rules in the order they fired.
    pub steps: Vec<Rule>,
    /// Primitives dropped because they carry no current: dangling
    /// branches, self-loops, and the whole network when both terminals
    /// share a node.
    pub pruned: Vec<PrimitiveId>,
}

/// Reduce `triples` to one primitive equivalent to the network between
/// `start` and `end`.
///
/// `node_bound` is an exclusive upper bound of the node ids in use; star
/// points get fresh ids from there. Two coinciding terminals yield a
/// synthetic 0 Ω leaf, a network without any path between them a
/// synthetic `+∞` leaf. Networks the four rules cannot take apart fail
/// with [`Error::StructuralReduction`].
pub fn reduce(
    circuit: &mut Circuit,
    triples: Vec<Triple>,
    start: NodeId,
    end: NodeId,
    node_bound: u32,
) -> Result<Reduction> {
    let used = triples
        .iter()
        .flat_map(|t| [t.node_a, t.node_b])
        .chain([start, end])
        .map(|node| node.as_u32() + 1)
        .max()
        .unwrap_or(0);

    Reducer {
        circuit,
        triples,
        start,
        end,
        node_bound: node_bound.max(used),
        steps: Vec::new(),
        pruned: Vec::new(),
    }
    .run()
}

struct Reducer<'a> {
    circuit: &'a mut Circuit,
    triples: Vec<Triple>,
    start: NodeId,
    end: NodeId,
    node_bound: u32,
    steps: Vec<Rule>,
    pruned: Vec<PrimitiveId>,
}

impl Reducer<'_> {
    fn run(mut self) -> Result<Reduction> {
        if self.start == self.end {
            debug!("terminals share node {}, circuit is shorted", self.start);
            self.pruned = self.triples.drain(..).map(|t| t.primitive).collect();
            let root = self.circuit.resistor(0.0, None, self.start, self.end);
            return Ok(self.finish(root));
        }

        loop {
            trace!("{} connections remain", self.triples.len());
            match Rule::ORDER.into_iter().find(|&rule| self.apply(rule)) {
                Some(rule) => {
                    debug!("{} applied, {} connections left", rule, self.triples.len());
                    self.steps.push(rule);
                }
                None => break,
            }
        }

        match self.triples.len() {
            0 => {
                debug!("no path between {} and {}, circuit is open", self.start, self.end);
                let root = self
                    .circuit
                    .resistor(f64::INFINITY, None, self.start, self.end);
                Ok(self.finish(root))
            }
            1 => {
                let root = self.triples[0].primitive;
                Ok(self.finish(root))
            }
            remaining => Err(Error::StructuralReduction { remaining }),
        }
    }

    fn finish(self, root: PrimitiveId) -> Reduction {
        Reduction {
            root,
            node_bound: self.node_bound,
            steps: self.steps,
            pruned: self.pruned,
        }
    }

    fn apply(&mut self, rule: Rule) -> bool {
        match rule {
            Rule::Unnecessary => self.remove_unnecessary(),
            Rule::Series => self.merge_series(),
            Rule::Parallel => self.merge_parallel(),
            Rule::DeltaWye => self.transform_delta(),
        }
    }

    fn is_terminal(&self, node: NodeId) -> bool {
        node == self.start || node == self.end
    }

    /// Triple indices touching each node. A self-loop is listed once.
    fn incidence(&self) -> Vec<Vec<usize>> {
        let mut incidence = vec![Vec::new(); self.node_bound as usize];
        for (i, triple) in self.triples.iter().enumerate() {
            incidence[triple.node_a.index()].push(i);
            if !triple.is_loop() {
                incidence[triple.node_b.index()].push(i);
            }
        }
        incidence
    }

    fn replace(&mut self, removed: &[usize], added: impl IntoIterator<Item = Triple>) {
        let mut index = 0;
        self.triples.retain(|_| {
            let keep = !removed.contains(&index);
            index += 1;
            keep
        });
        self.triples.extend(added);
    }

    fn remove_unnecessary(&mut self) -> bool {
        let mut removed: Vec<usize> = self
            .incidence()
            .iter()
            .enumerate()
            .filter(|&(node, hits)| hits.len() == 1 && !self.is_terminal(NodeId::new(node as u32)))
            .map(|(_, hits)| hits[0])
            .collect();
        removed.extend(
            self.triples
                .iter()
                .enumerate()
                .filter(|(_, t)| t.is_loop())
                .map(|(i, _)| i),
        );
        if removed.is_empty() {
            return false;
        }
        removed.sort_unstable();
        removed.dedup();
        self.pruned
            .extend(removed.iter().map(|&i| self.triples[i].primitive));
        self.replace(&removed, []);
        true
    }

    fn merge_series(&mut self) -> bool {
        let incidence = self.incidence();
        let found = incidence.iter().enumerate().find_map(|(node, hits)| {
            let node = NodeId::new(node as u32);
            match hits.as_slice() {
                &[first, second] if !self.is_terminal(node) => Some((node, first, second)),
                _ => None,
            }
        });
        let Some((junction, first, second)) = found else {
            return false;
        };

        let (t0, t1) = (self.triples[first], self.triples[second]);
        let node_a = t0.other_side(junction);
        let node_b = t1.other_side(junction);
        let series = self
            .circuit
            .series(t0.primitive, t1.primitive, node_a, junction, node_b);
        self.replace(&[first, second], [Triple::new(node_a, series, node_b)]);
        true
    }

    fn merge_parallel(&mut self) -> bool {
        let mut seen: HashMap<(NodeId, NodeId), usize> = HashMap::new();
        let mut found = None;
        for (i, triple) in self.triples.iter().enumerate() {
            let key = if triple.node_a <= triple.node_b {
                (triple.node_a, triple.node_b)
            } else {
                (triple.node_b, triple.node_a)
            };
            if let Some(&first) = seen.get(&key) {
                found = Some((first, i));
                break;
            }
            seen.insert(key, i);
        }
        let Some((first, second)) = found else {
            return false;
        };

        let (t0, t1) = (self.triples[first], self.triples[second]);
        debug_assert!(t0.same_nodes(&t1));
        let parallel = self
            .circuit
            .parallel(t0.primitive, t1.primitive, t0.node_a, t0.node_b);
        self.replace(&[first, second], [Triple::new(t0.node_a, parallel, t0.node_b)]);
        true
    }

    /// Find a triangle `(n0, A, n1), (n1, B, n2), (n2, C, n0)` of three
    /// distinct triples over three distinct nodes.
    fn find_triangle(&self) -> Option<([usize; 3], [NodeId; 3])> {
        let incidence = self.incidence();
        for (n0, hits) in incidence.iter().enumerate() {
            let n0 = NodeId::new(n0 as u32);
            for &first in hits {
                let n1 = self.triples[first].other_side(n0);
                for &second in &incidence[n1.index()] {
                    if second == first {
                        continue;
                    }
                    let n2 = self.triples[second].other_side(n1);
                    if n2 == n0 {
                        continue;
                    }
                    for &third in &incidence[n2.index()] {
                        if third != first
                            && third != second
                            && self.triples[third].other_side(n2) == n0
                        {
                            return Some(([first, second, third], [n0, n1, n2]));
                        }
                    }
                }
            }
        }
        None
    }

    fn transform_delta(&mut self) -> bool {
        let Some(([first, second, third], [n0, n1, n2])) = self.find_triangle() else {
            return false;
        };

        let star = NodeId::new(self.node_bound);
        self.node_bound += 1;

        let sides = [
            self.triples[first].primitive,
            self.triples[second].primitive,
            self.triples[third].primitive,
        ];
        // Side A joins n0-n1, B joins n1-n2, C joins n2-n0.
        let legs = [
            (n1, Wiring::OppositeC),
            (n0, Wiring::OppositeB),
            (n2, Wiring::OppositeA),
        ]
        .map(|(corner, wiring)| {
            let leg = self.circuit.delta(sides, wiring, corner, star);
            Triple::new(corner, leg, star)
        });

        debug!("triangle {}-{}-{} replaced by star point {}", n0, n1, n2, star);
        self.replace(&[first, second, third], legs);
        true
    }
}
