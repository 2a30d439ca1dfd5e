//! Electrical node identities.
//!
//! A node is a maximal set of positions held at the same potential by
//! wires or pins. Positions are registered one at a time or in connected
//! pairs, and nodes only ever merge.

use std::fmt;
use std::hash::Hash;

use indexmap::IndexMap;

/// Unique identifier for an electrical node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    /// Create a new NodeId from a raw value.
    pub fn new(id: u32) -> Self {
        NodeId(id)
    }

    /// Get the raw node ID value.
    pub fn as_u32(self) -> u32 {
        self.0
    }

    /// Get the node ID as an index into dense per-node arrays.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Union-find over positions.
///
/// Every registered position gets a stable handle. Handles are resolved
/// to their representative on demand, and the representative of a merged
/// set is always the lowest handle in it. A [`NodeId`] returned before a
/// merge therefore stays valid for the surviving side and resolves to the
/// lower id for the absorbed side; always go through [`search_node`]
/// instead of caching ids across structural changes.
///
/// [`search_node`]: NodeTracker::search_node
#[derive(Debug, Clone)]
pub struct NodeTracker<P> {
    handles: IndexMap<P, u32>,
    parent: Vec<u32>,
}

impl<P> Default for NodeTracker<P> {
    fn default() -> Self {
        Self {
            handles: IndexMap::new(),
            parent: Vec::new(),
        }
    }
}

impl<P: Hash + Eq + Clone> NodeTracker<P> {
    /// Create an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a single position, returning the node that contains it.
    ///
    /// An unknown position becomes a node of its own.
    pub fn add_node(&mut self, pos: P) -> NodeId {
        let handle = self.handle(pos);
        NodeId(self.find_mut(handle))
    }

    /// Register two positions as electrically connected.
    ///
    /// If both already belong to different nodes, the two nodes are merged
    /// into the lower-indexed one.
    pub fn connect(&mut self, a: P, b: P) -> NodeId {
        let ha = self.handle(a);
        let hb = self.handle(b);
        let ra = self.find_mut(ha);
        let rb = self.find_mut(hb);
        if ra == rb {
            return NodeId(ra);
        }
        let (keep, absorbed) = if ra < rb { (ra, rb) } else { (rb, ra) };
        self.parent[absorbed as usize] = keep;
        NodeId(keep)
    }

    /// Find the node containing a position.
    pub fn search_node(&self, pos: &P) -> Option<NodeId> {
        self.handles.get(pos).map(|&h| NodeId(self.find(h)))
    }

    /// Number of distinct electrical nodes.
    pub fn node_count(&self) -> usize {
        self.nodes().count()
    }

    /// Exclusive upper bound of every [`NodeId`] this tracker hands out.
    pub fn id_bound(&self) -> u32 {
        self.parent.len() as u32
    }

    /// Number of registered positions.
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    /// Check whether no position has been registered.
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Iterate over the distinct nodes in ascending order.
    pub fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.parent
            .iter()
            .enumerate()
            .filter(|&(i, &p)| i as u32 == p)
            .map(|(i, _)| NodeId(i as u32))
    }

    /// All positions belonging to a node, in registration order.
    pub fn members(&self, node: NodeId) -> Vec<&P> {
        self.handles
            .iter()
            .filter(|&(_, &h)| self.find(h) == node.0)
            .map(|(p, _)| p)
            .collect()
    }

    /// Forget every position.
    pub fn reset(&mut self) {
        self.handles.clear();
        self.parent.clear();
    }

    fn handle(&mut self, pos: P) -> u32 {
        if let Some(&h) = self.handles.get(&pos) {
            return h;
        }
        let h = self.parent.len() as u32;
        self.parent.push(h);
        self.handles.insert(pos, h);
        h
    }

    fn find(&self, mut h: u32) -> u32 {
        while self.parent[h as usize] != h {
            h = self.parent[h as usize];
        }
        h
    }

    fn find_mut(&mut self, h: u32) -> u32 {
        let root = self.find(h);
        let mut cur = h;
        while self.parent[cur as usize] != root {
            let next = self.parent[cur as usize];
            self.parent[cur as usize] = root;
            cur = next;
        }
        root
    }
}
