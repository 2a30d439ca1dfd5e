//! Element trait shared by everything placed on a schematic.

/// A two-terminal element placed between two positions.
pub trait Element<P>: std::fmt::Debug {
    /// Get the element's name.
    fn name(&self) -> &str;

    /// Get the two positions this element connects.
    fn positions(&self) -> [&P; 2];

    /// Whether the element ties both positions to one electrical node.
    fn is_short(&self) -> bool {
        false
    }
}
