use crate::element::Element;

/// Node label of a concrete molecular graph.
///
/// Hydrogens are ordinary graph nodes, not implicit counts: a methane
/// species has five atoms. Derived properties (realized valency, geometry)
/// are computed from the graph, not stored here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Atom {
    pub element: Element,
}

impl Atom {
    pub fn new(element: Element) -> Self {
        Self { element }
    }
}
