//! Named, reusable graph-shape templates.
//!
//! A topology carries connectivity and slot arity only — no chemical
//! semantics. Species and pattern declarations instantiate topologies by
//! binding each slot to a concrete element, instead of spelling out
//! families of related structures atom by atom.

use std::fmt;

use petgraph::graph::NodeIndex;

use crate::atom::Atom;
use crate::bond::{Bond, BondOrder};
use crate::element::Element;
use crate::graph::MolGraph;

#[derive(Debug, Clone, PartialEq)]
pub enum TopologyError {
    /// No topology registered under this name.
    UnknownTopology { name: String },
    /// A required slot has no binding.
    UnboundSlot { slot: usize },
    /// More bindings were supplied than the template has slots.
    ExtraBindings { expected: usize, got: usize },
    /// The bound element cannot support the slot's internal degree.
    ArityMismatch {
        slot: usize,
        element: Element,
        required: f64,
        max: f64,
    },
}

impl fmt::Display for TopologyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownTopology { name } => write!(f, "unknown topology {name:?}"),
            Self::UnboundSlot { slot } => write!(f, "slot {slot} has no binding"),
            Self::ExtraBindings { expected, got } => {
                write!(f, "{got} bindings supplied for {expected} slots")
            }
            Self::ArityMismatch {
                slot,
                element,
                required,
                max,
            } => write!(
                f,
                "slot {slot}: {element} (max valency {max}) cannot carry bond order sum {required}"
            ),
        }
    }
}

impl std::error::Error for TopologyError {}

/// A parameterized graph shape: `slots` template positions connected by a
/// fixed edge list.
#[derive(Debug, Clone, PartialEq)]
pub struct Topology {
    name: String,
    slots: usize,
    edges: Vec<(usize, usize, BondOrder)>,
}

impl Topology {
    pub fn new(
        name: impl Into<String>,
        slots: usize,
        edges: Vec<(usize, usize, BondOrder)>,
    ) -> Self {
        let name = name.into();
        debug_assert!(
            edges.iter().all(|&(a, b, _)| a < slots && b < slots),
            "topology {name:?} edge references a slot out of range"
        );
        Self { name, slots, edges }
    }

    /// Unbranched chain of `n` slots joined by `order` bonds.
    pub fn chain(name: impl Into<String>, n: usize, order: BondOrder) -> Self {
        let edges = (1..n).map(|i| (i - 1, i, order)).collect();
        Self::new(name, n, edges)
    }

    /// `n`-membered ring joined by `order` bonds.
    pub fn ring(name: impl Into<String>, n: usize, order: BondOrder) -> Self {
        let mut edges: Vec<_> = (1..n).map(|i| (i - 1, i, order)).collect();
        if n > 2 {
            edges.push((n - 1, 0, order));
        }
        Self::new(name, n, edges)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn slot_count(&self) -> usize {
        self.slots
    }

    /// Bond-order sum a binding for `slot` must be able to realize.
    pub fn slot_order_sum(&self, slot: usize) -> f64 {
        self.edges
            .iter()
            .filter(|&&(a, b, _)| a == slot || b == slot)
            .map(|&(_, _, order)| order.order())
            .sum()
    }

    /// Bind each slot to an element and produce the resulting graph
    /// fragment. The fragment is not yet a species — callers compose and
    /// validate it through [`Species::new`](crate::Species::new).
    pub fn instantiate(
        &self,
        bindings: &[Element],
    ) -> Result<MolGraph<Atom, Bond>, TopologyError> {
        if bindings.len() < self.slots {
            return Err(TopologyError::UnboundSlot {
                slot: bindings.len(),
            });
        }
        if bindings.len() > self.slots {
            return Err(TopologyError::ExtraBindings {
                expected: self.slots,
                got: bindings.len(),
            });
        }
        for (slot, &element) in bindings.iter().enumerate() {
            let required = self.slot_order_sum(slot);
            if element.max_valency() + crate::element::VALENCY_EPSILON < required {
                return Err(TopologyError::ArityMismatch {
                    slot,
                    element,
                    required,
                    max: element.max_valency(),
                });
            }
        }
        let mut graph = MolGraph::new();
        let nodes: Vec<NodeIndex> = bindings
            .iter()
            .map(|&element| graph.add_atom(Atom::new(element)))
            .collect();
        for &(a, b, order) in &self.edges {
            graph.add_bond(nodes[a], nodes[b], Bond::new(order));
        }
        Ok(graph)
    }
}

/// Insertion-ordered catalogue of topologies, keyed by name. Built once at
/// startup and read-only afterward.
#[derive(Debug, Clone, Default)]
pub struct TopologyLibrary {
    entries: Vec<Topology>,
}

impl TopologyLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, topology: Topology) {
        self.entries.push(topology);
    }

    pub fn get(&self, name: &str) -> Option<&Topology> {
        self.entries.iter().find(|t| t.name() == name)
    }

    pub fn instantiate(
        &self,
        name: &str,
        bindings: &[Element],
    ) -> Result<MolGraph<Atom, Bond>, TopologyError> {
        let topology = self.get(name).ok_or_else(|| TopologyError::UnknownTopology {
            name: name.to_owned(),
        })?;
        topology.instantiate(bindings)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Topology> {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::species::Species;

    #[test]
    fn chain_shape() {
        let t = Topology::chain("c3", 3, BondOrder::Single);
        assert_eq!(t.slot_count(), 3);
        assert_eq!(t.slot_order_sum(0), 1.0);
        assert_eq!(t.slot_order_sum(1), 2.0);
    }

    #[test]
    fn ring_shape() {
        let t = Topology::ring("r6", 6, BondOrder::Aromatic);
        assert_eq!(t.slot_count(), 6);
        for slot in 0..6 {
            assert_eq!(t.slot_order_sum(slot), 3.0);
        }
        let g = t.instantiate(&[Element::C; 6]).unwrap();
        assert_eq!(g.bond_count(), 6);
    }

    #[test]
    fn unbound_slot() {
        let t = Topology::chain("c3", 3, BondOrder::Single);
        assert_eq!(
            t.instantiate(&[Element::C, Element::C]).unwrap_err(),
            TopologyError::UnboundSlot { slot: 2 }
        );
    }

    #[test]
    fn extra_bindings() {
        let t = Topology::chain("c2", 2, BondOrder::Single);
        assert_eq!(
            t.instantiate(&[Element::C; 3]).unwrap_err(),
            TopologyError::ExtraBindings {
                expected: 2,
                got: 3
            }
        );
    }

    #[test]
    fn arity_mismatch() {
        // Hydrogen (max valency 1) cannot sit mid-chain.
        let t = Topology::chain("c3", 3, BondOrder::Single);
        let err = t
            .instantiate(&[Element::C, Element::H, Element::C])
            .unwrap_err();
        assert!(matches!(
            err,
            TopologyError::ArityMismatch {
                slot: 1,
                element: Element::H,
                ..
            }
        ));
    }

    #[test]
    fn library_lookup() {
        let mut lib = TopologyLibrary::new();
        lib.insert(Topology::chain("c2", 2, BondOrder::Single));
        assert!(lib.get("c2").is_some());
        assert_eq!(
            lib.instantiate("missing", &[]).unwrap_err(),
            TopologyError::UnknownTopology {
                name: "missing".into()
            }
        );
    }

    #[test]
    fn instantiated_ring_validates_as_species() {
        // Benzene skeleton: aromatic C6 ring with one H per carbon.
        let t = Topology::ring("r6", 6, BondOrder::Aromatic);
        let mut g = t.instantiate(&[Element::C; 6]).unwrap();
        let carbons: Vec<_> = g.atoms().collect();
        for c in carbons {
            let h = g.add_atom(Atom::new(Element::H));
            g.add_bond(c, h, Bond::default());
        }
        assert!(Species::new("benzene".into(), g).is_ok());
    }
}
