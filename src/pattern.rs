use std::fmt;

use petgraph::graph::NodeIndex;

use crate::bond::BondOrder;
use crate::element::Element;
use crate::graph::MolGraph;

/// Stable identifier of a registered group pattern.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PatternId(String);

impl PatternId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PatternId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PatternId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Constraint on one pattern role. `None` fields are unconstrained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AtomQuery {
    pub element: Option<Element>,
    /// Exact number of bonded neighbors the species atom must have.
    pub degree: Option<u8>,
}

impl AtomQuery {
    pub fn element(element: Element) -> Self {
        Self {
            element: Some(element),
            degree: None,
        }
    }

    pub fn any() -> Self {
        Self::default()
    }

    pub fn with_degree(mut self, degree: u8) -> Self {
        self.degree = Some(degree);
        self
    }

    /// How selective this role is; used to pick the search seed.
    pub(crate) fn restrictiveness(&self) -> u32 {
        let mut score = 0;
        if self.element.is_some() {
            score += 2;
        }
        if self.degree.is_some() {
            score += 1;
        }
        score
    }
}

/// Constraint on one pattern bond. `None` matches any order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BondQuery {
    pub order: Option<BondOrder>,
}

impl BondQuery {
    pub fn order(order: BondOrder) -> Self {
        Self { order: Some(order) }
    }

    pub fn any() -> Self {
        Self::default()
    }
}

/// A sub-graph query: roles with constraints, connectivity between them,
/// and a designated anchor role reaction rules use to locate the reacting
/// atom. Read-only after registration.
#[derive(Debug, Clone)]
pub struct GroupPattern {
    id: PatternId,
    graph: MolGraph<AtomQuery, BondQuery>,
    anchor: NodeIndex,
}

impl GroupPattern {
    /// The anchor must name a role of `graph`; registration
    /// ([`Registry::add_pattern`](crate::Registry::add_pattern)) rejects
    /// patterns where it does not.
    pub fn new(id: PatternId, graph: MolGraph<AtomQuery, BondQuery>, anchor: NodeIndex) -> Self {
        Self { id, graph, anchor }
    }

    pub fn id(&self) -> &PatternId {
        &self.id
    }

    pub fn graph(&self) -> &MolGraph<AtomQuery, BondQuery> {
        &self.graph
    }

    pub fn anchor(&self) -> NodeIndex {
        self.anchor
    }

    pub fn role_count(&self) -> usize {
        self.graph.atom_count()
    }
}

/// One structural occurrence of a pattern within one species.
///
/// `mapping[role.index()]` is the species atom bound to that role.
/// Transient: recomputed every resolution pass, never cached across
/// mixture changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupOccurrence {
    pub pattern: PatternId,
    pub mapping: Vec<NodeIndex>,
}

impl GroupOccurrence {
    /// Species atom bound to the pattern's role `role`.
    pub fn atom_for(&self, role: NodeIndex) -> NodeIndex {
        self.mapping[role.index()]
    }

    /// Whether the two occurrences bind any species atom in common.
    pub fn overlaps(&self, other: &GroupOccurrence) -> bool {
        self.mapping.iter().any(|a| other.mapping.contains(a))
    }
}
