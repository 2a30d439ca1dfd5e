//! The element collection a front-end hands to the solver.

use std::fmt;
use std::hash::{Hash, Hasher};

use crate::element::Element;
use crate::error::{Error, Result};
use crate::node::{NodeId, NodeTracker};

/// A resistor placed between two positions.
///
/// The node and reading fields are written by the solver after each
/// calculation; everything else belongs to the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct Resistor<P> {
    /// Element name (e.g., "R1").
    pub name: String,
    /// First endpoint.
    pub pos_a: P,
    /// Second endpoint.
    pub pos_b: P,
    resistance: f64,
    /// Node of `pos_a` as of the last calculation.
    pub node_a: Option<NodeId>,
    /// Node of `pos_b` as of the last calculation.
    pub node_b: Option<NodeId>,
    /// Magnitude of the voltage across the resistor (V).
    pub voltage: Option<f64>,
    /// Magnitude of the current through the resistor (A).
    pub current: Option<f64>,
}

impl<P> Resistor<P> {
    /// Create a new resistor.
    ///
    /// Zero (a short) and `+∞` (an open) are accepted; negative and NaN
    /// resistances are rejected.
    pub fn new(name: impl Into<String>, pos_a: P, pos_b: P, resistance: f64) -> Result<Self> {
        let name = name.into();
        if resistance.is_nan() || resistance < 0.0 {
            return Err(Error::InvalidResistance {
                name,
                value: resistance,
            });
        }
        Ok(Self {
            name,
            pos_a,
            pos_b,
            resistance,
            node_a: None,
            node_b: None,
            voltage: None,
            current: None,
        })
    }

    /// Resistance value in ohms.
    pub fn resistance(&self) -> f64 {
        self.resistance
    }

    /// Forget the results of the previous calculation.
    pub fn clear_readings(&mut self) {
        self.voltage = None;
        self.current = None;
    }
}

impl<P: Hash> Hash for Resistor<P> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
        self.pos_a.hash(state);
        self.pos_b.hash(state);
        self.resistance.to_bits().hash(state);
    }
}

impl<P: fmt::Debug> Element<P> for Resistor<P> {
    fn name(&self) -> &str {
        &self.name
    }

    fn positions(&self) -> [&P; 2] {
        [&self.pos_a, &self.pos_b]
    }
}

/// A zero-resistance connection between two positions.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Wire<P> {
    /// Element name (e.g., "W1").
    pub name: String,
    /// First endpoint.
    pub pos_a: P,
    /// Second endpoint.
    pub pos_b: P,
}

impl<P> Wire<P> {
    /// Create a new wire.
    pub fn new(name: impl Into<String>, pos_a: P, pos_b: P) -> Self {
        Self {
            name: name.into(),
            pos_a,
            pos_b,
        }
    }
}

impl<P: fmt::Debug> Element<P> for Wire<P> {
    fn name(&self) -> &str {
        &self.name
    }

    fn positions(&self) -> [&P; 2] {
        [&self.pos_a, &self.pos_b]
    }

    fn is_short(&self) -> bool {
        true
    }
}

/// One of the two terminals a source is connected between.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pin {
    /// The terminal the source current enters the network from.
    Start,
    /// The terminal the source current leaves the network through.
    End,
}

/// Resistors, wires and terminal pins of one network.
#[derive(Debug, Clone)]
pub struct Schematic<P> {
    title: Option<String>,
    resistors: Vec<Resistor<P>>,
    wires: Vec<Wire<P>>,
    start: Option<P>,
    end: Option<P>,
}

impl<P> Default for Schematic<P> {
    fn default() -> Self {
        Self {
            title: None,
            resistors: Vec::new(),
            wires: Vec::new(),
            start: None,
            end: None,
        }
    }
}

impl<P: Hash + Eq + Clone + fmt::Debug> Schematic<P> {
    /// Create an empty schematic.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty schematic with a title.
    pub fn with_title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Default::default()
        }
    }

    /// Get the schematic title.
    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    /// Set the schematic title.
    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = Some(title.into());
    }

    /// Add a resistor, returning its index.
    pub fn add_resistor(
        &mut self,
        name: impl Into<String>,
        pos_a: P,
        pos_b: P,
        resistance: f64,
    ) -> Result<usize> {
        self.resistors
            .push(Resistor::new(name, pos_a, pos_b, resistance)?);
        Ok(self.resistors.len() - 1)
    }

    /// Add a wire between two positions.
    pub fn add_wire(&mut self, name: impl Into<String>, pos_a: P, pos_b: P) {
        self.wires.push(Wire::new(name, pos_a, pos_b));
    }

    /// Place a terminal pin, replacing any previous placement.
    pub fn place_pin(&mut self, pin: Pin, pos: P) {
        match pin {
            Pin::Start => self.start = Some(pos),
            Pin::End => self.end = Some(pos),
        }
    }

    /// Remove a terminal pin.
    pub fn remove_pin(&mut self, pin: Pin) {
        match pin {
            Pin::Start => self.start = None,
            Pin::End => self.end = None,
        }
    }

    /// Position of a terminal pin.
    pub fn pin(&self, pin: Pin) -> Option<&P> {
        match pin {
            Pin::Start => self.start.as_ref(),
            Pin::End => self.end.as_ref(),
        }
    }

    /// All resistors in insertion order.
    pub fn resistors(&self) -> &[Resistor<P>] {
        &self.resistors
    }

    /// Mutable access to the resistors.
    pub fn resistors_mut(&mut self) -> &mut [Resistor<P>] {
        &mut self.resistors
    }

    /// Look up a resistor by name.
    pub fn resistor(&self, name: &str) -> Result<&Resistor<P>> {
        self.resistors
            .iter()
            .find(|r| r.name == name)
            .ok_or_else(|| Error::ElementNotFound(name.to_string()))
    }

    /// All wires in insertion order.
    pub fn wires(&self) -> &[Wire<P>] {
        &self.wires
    }

    /// Number of resistors.
    pub fn num_resistors(&self) -> usize {
        self.resistors.len()
    }

    /// Remove every element and pin.
    pub fn clear(&mut self) {
        self.resistors.clear();
        self.wires.clear();
        self.start = None;
        self.end = None;
    }

    /// Group every position on the schematic into electrical nodes.
    ///
    /// Pins and resistor endpoints are registered on their own, wires join
    /// their endpoints into one node.
    pub fn identify_nodes(&self) -> NodeTracker<P> {
        let mut nodes = NodeTracker::new();
        for pos in [&self.start, &self.end].into_iter().flatten() {
            nodes.add_node(pos.clone());
        }
        for wire in &self.wires {
            register(&mut nodes, wire);
        }
        for resistor in &self.resistors {
            register(&mut nodes, resistor);
        }
        nodes
    }

    /// Write the node of each resistor endpoint back onto the resistor.
    pub fn assign_nodes(&mut self, nodes: &NodeTracker<P>) {
        for resistor in &mut self.resistors {
            resistor.node_a = nodes.search_node(&resistor.pos_a);
            resistor.node_b = nodes.search_node(&resistor.pos_b);
        }
    }

    /// Forget the results of the previous calculation on every resistor.
    pub fn clear_readings(&mut self) {
        for resistor in &mut self.resistors {
            resistor.clear_readings();
        }
    }
}

impl<P: Hash> Hash for Schematic<P> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.resistors.hash(state);
        self.wires.hash(state);
        self.start.hash(state);
        self.end.hash(state);
    }
}

fn register<P, E>(nodes: &mut NodeTracker<P>, element: &E)
where
    P: Hash + Eq + Clone + fmt::Debug,
    E: Element<P>,
{
    let [a, b] = element.positions();
    if element.is_short() {
        let node = nodes.connect(a.clone(), b.clone());
        log::trace!("{} joins {:?} and {:?} into node {}", element.name(), a, b, node);
    } else {
        let (node_a, node_b) = (nodes.add_node(a.clone()), nodes.add_node(b.clone()));
        log::trace!("{} spans nodes {} and {}", element.name(), node_a, node_b);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::hash_map::DefaultHasher;

    fn hash_of<T: Hash>(value: &T) -> u64 {
        let mut hasher = DefaultHasher::new();
        value.hash(&mut hasher);
        hasher.finish()
    }

    #[test]
    fn test_resistor_validation() {
        assert!(Resistor::new("R1", 0, 1, 10.0).is_ok());
        assert!(Resistor::new("R0", 0, 1, 0.0).is_ok());
        assert!(Resistor::new("Ropen", 0, 1, f64::INFINITY).is_ok());
        assert!(matches!(
            Resistor::new("Rneg", 0, 1, -1.0),
            Err(Error::InvalidResistance { name, .. }) if name == "Rneg"
        ));
        assert!(Resistor::new("Rnan", 0, 1, f64::NAN).is_err());
    }

    #[test]
    fn test_wires_join_nodes() {
        let mut sch = Schematic::new();
        sch.add_resistor("R1", (0, 0), (1, 0), 10.0).unwrap();
        sch.add_resistor("R2", (2, 0), (3, 0), 20.0).unwrap();
        sch.add_wire("W1", (1, 0), (2, 0));

        let nodes = sch.identify_nodes();
        assert_eq!(nodes.node_count(), 3);
        assert_eq!(nodes.search_node(&(1, 0)), nodes.search_node(&(2, 0)));
        assert_ne!(nodes.search_node(&(0, 0)), nodes.search_node(&(3, 0)));

        sch.assign_nodes(&nodes);
        let r1 = sch.resistor("R1").unwrap();
        let r2 = sch.resistor("R2").unwrap();
        assert_eq!(r1.node_b, r2.node_a);
    }

    #[test]
    fn test_element_trait() {
        let sch = {
            let mut sch = Schematic::new();
            sch.add_resistor("R1", "a", "b", 10.0).unwrap();
            sch.add_wire("W1", "b", "c");
            sch
        };
        let resistor: &dyn Element<&str> = &sch.resistors()[0];
        let wire: &dyn Element<&str> = &sch.wires()[0];
        assert_eq!((resistor.name(), resistor.is_short()), ("R1", false));
        assert_eq!((wire.name(), wire.is_short()), ("W1", true));
        assert_eq!(wire.positions(), [&"b", &"c"]);
    }

    #[test]
    fn test_pins_are_nodes() {
        let mut sch: Schematic<&str> = Schematic::new();
        sch.place_pin(Pin::Start, "a");
        sch.place_pin(Pin::End, "b");
        let nodes = sch.identify_nodes();
        assert_eq!(nodes.node_count(), 2);
        assert_eq!(sch.pin(Pin::Start), Some(&"a"));

        sch.remove_pin(Pin::End);
        assert_eq!(sch.pin(Pin::End), None);
    }

    #[test]
    fn test_hash_ignores_readings() {
        let mut sch = Schematic::new();
        sch.add_resistor("R1", "a", "b", 10.0).unwrap();
        let before = hash_of(&sch);

        sch.resistors_mut()[0].voltage = Some(1.0);
        assert_eq!(hash_of(&sch), before);

        sch.add_wire("W1", "b", "c");
        assert_ne!(hash_of(&sch), before);
    }

    #[test]
    fn test_unknown_resistor() {
        let sch: Schematic<u32> = Schematic::new();
        assert!(matches!(sch.resistor("R9"), Err(Error::ElementNotFound(_))));
    }
}
