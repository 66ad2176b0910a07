use std::fmt;
use std::fmt::Write as _;

use petgraph::graph::NodeIndex;

use crate::atom::Atom;
use crate::bond::{Bond, BondOrder};
use crate::element::{Element, Geometry};
use crate::formula::{empirical_formula, format_formula, molar_mass};
use crate::graph::MolGraph;

/// Stable identifier of a declared species. Used as a map key in mixtures
/// and in applied-reaction records.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SpeciesId(String);

impl SpeciesId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SpeciesId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SpeciesId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Why a graph was rejected as a species.
#[derive(Debug, Clone, PartialEq)]
pub enum StructureError {
    /// The graph has no atoms.
    EmptyGraph,
    /// Not every atom is reachable from every other.
    Disconnected,
    /// An atom's realized bond-order sum is not a permitted valency of its
    /// element.
    BadValency {
        atom: NodeIndex,
        element: Element,
        actual: f64,
        allowed: Vec<f64>,
    },
}

impl fmt::Display for StructureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyGraph => write!(f, "species graph has no atoms"),
            Self::Disconnected => write!(f, "species graph is disconnected"),
            Self::BadValency {
                atom,
                element,
                actual,
                allowed,
            } => write!(
                f,
                "atom {} ({element}): valency {actual} not in {allowed:?}",
                atom.index()
            ),
        }
    }
}

impl std::error::Error for StructureError {}

/// Sum of bond orders realized by `atom` in `graph`.
pub fn total_valency(graph: &MolGraph<Atom, Bond>, atom: NodeIndex) -> f64 {
    graph
        .bonds_of(atom)
        .map(|ei| graph.bond(ei).order.order())
        .sum()
}

/// Check the species invariants: non-empty, connected, every atom's
/// realized valency permitted by its element.
pub fn validate_graph(graph: &MolGraph<Atom, Bond>) -> Result<(), StructureError> {
    if graph.atom_count() == 0 {
        return Err(StructureError::EmptyGraph);
    }
    if !graph.is_connected() {
        return Err(StructureError::Disconnected);
    }
    for idx in graph.atoms() {
        let element = graph.atom(idx).element;
        let v = total_valency(graph, idx);
        if !element.is_valid_valency(v) {
            return Err(StructureError::BadValency {
                atom: idx,
                element,
                actual: v,
                allowed: element.valencies().to_vec(),
            });
        }
    }
    Ok(())
}

/// An immutable declared molecular structure.
///
/// Built once at registry load; mixtures only hold quantities against the
/// id, never mutate the structure. Equality is identity-based on the
/// declared graph — two independently declared, graph-isomorphic species
/// stay distinct unless their [`structural_key`](Species::structural_key)s
/// coincide.
#[derive(Debug, Clone)]
pub struct Species {
    id: SpeciesId,
    graph: MolGraph<Atom, Bond>,
    formula: Vec<(Element, u32)>,
    molar_mass: f64,
    structural_key: String,
}

impl Species {
    /// Validate `graph` and cache the derived properties. Fails with
    /// [`StructureError`] rather than ever producing an invalid species.
    pub fn new(id: SpeciesId, graph: MolGraph<Atom, Bond>) -> Result<Self, StructureError> {
        validate_graph(&graph)?;
        let formula = empirical_formula(&graph);
        let mass = molar_mass(&graph);
        let structural_key = structural_key(&graph);
        Ok(Self {
            id,
            graph,
            formula,
            molar_mass: mass,
            structural_key,
        })
    }

    pub fn id(&self) -> &SpeciesId {
        &self.id
    }

    pub fn graph(&self) -> &MolGraph<Atom, Bond> {
        &self.graph
    }

    /// Ordered (element, count) pairs in the fixed precedence order.
    pub fn formula(&self) -> &[(Element, u32)] {
        &self.formula
    }

    pub fn formula_string(&self) -> String {
        format_formula(&self.formula)
    }

    pub fn molar_mass(&self) -> f64 {
        self.molar_mass
    }

    /// Deterministic encoding of the declared graph. Not symmetry-canonical:
    /// isomorphic graphs declared with different atom orders get different
    /// keys. Used to reunify reaction-constructed products with declared
    /// species and to mint stable ids for novel products.
    pub fn structural_key(&self) -> &str {
        &self.structural_key
    }

    /// Preferred geometry of one atom, from its element and bond count.
    pub fn geometry_of(&self, atom: NodeIndex) -> Geometry {
        self.graph
            .atom(atom)
            .element
            .geometry(self.graph.degree(atom))
    }
}

impl PartialEq for Species {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Species {}

fn bond_order_tag(order: BondOrder) -> char {
    match order {
        BondOrder::Single => 's',
        BondOrder::Double => 'd',
        BondOrder::Triple => 't',
        BondOrder::Aromatic => 'a',
    }
}

/// Encode a graph as atoms-in-index-order plus a sorted bond list.
pub fn structural_key(graph: &MolGraph<Atom, Bond>) -> String {
    let mut key = String::new();
    for idx in graph.atoms() {
        if !key.is_empty() {
            key.push(',');
        }
        key.push_str(graph.atom(idx).element.symbol());
    }
    let mut edges: Vec<(usize, usize, char)> = graph
        .bonds()
        .filter_map(|ei| {
            let (a, b) = graph.bond_endpoints(ei)?;
            let (lo, hi) = if a.index() <= b.index() {
                (a.index(), b.index())
            } else {
                (b.index(), a.index())
            };
            Some((lo, hi, bond_order_tag(graph.bond(ei).order)))
        })
        .collect();
    edges.sort_unstable();
    key.push('|');
    for (i, (a, b, tag)) in edges.iter().enumerate() {
        if i > 0 {
            key.push(',');
        }
        write!(key, "{a}-{b}{tag}").unwrap();
    }
    key
}
