//! Declaration records: the serde-facing description of a rule set.
//!
//! Hosts describe topologies, species, patterns, and rules as plain data
//! (element symbols, index-based bonds) and [`Declarations::build`] turns
//! the lot into a validated [`Registry`]. The wire types stay separate
//! from the core types so the core never carries format concerns.

use petgraph::graph::NodeIndex;
use serde::Deserialize;

use crate::atom::Atom;
use crate::bond::{Bond, BondOrder};
use crate::element::Element;
use crate::graph::MolGraph;
use crate::pattern::{AtomQuery, BondQuery, GroupPattern, PatternId};
use crate::reaction::{
    ExplicitRule, GenericRule, ProductAtom, ProductTemplate, RateClass, RoleRef, RuleId,
};
use crate::registry::{LoadError, Registry};
use crate::species::SpeciesId;
use crate::topology::Topology;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Declarations {
    #[serde(default)]
    pub topologies: Vec<TopologyDecl>,
    #[serde(default)]
    pub species: Vec<SpeciesDecl>,
    #[serde(default)]
    pub patterns: Vec<PatternDecl>,
    #[serde(default)]
    pub rules: Vec<RuleDecl>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum TopologyDecl {
    Chain {
        name: String,
        length: usize,
        #[serde(default)]
        order: BondOrderDecl,
    },
    Ring {
        name: String,
        length: usize,
        #[serde(default)]
        order: BondOrderDecl,
    },
    Edges {
        name: String,
        slots: usize,
        edges: Vec<(usize, usize, BondOrderDecl)>,
    },
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BondOrderDecl {
    #[default]
    Single,
    Double,
    Triple,
    Aromatic,
}

impl From<BondOrderDecl> for BondOrder {
    fn from(d: BondOrderDecl) -> Self {
        match d {
            BondOrderDecl::Single => BondOrder::Single,
            BondOrderDecl::Double => BondOrder::Double,
            BondOrderDecl::Triple => BondOrder::Triple,
            BondOrderDecl::Aromatic => BondOrder::Aromatic,
        }
    }
}

/// A species as either an explicit atom/bond list, a topology
/// instantiation, or both (topology slots first, extra atoms appended).
#[derive(Debug, Clone, Deserialize)]
pub struct SpeciesDecl {
    pub id: String,
    #[serde(default)]
    pub topology: Option<TopologyRef>,
    /// Element symbols appended after any topology slots.
    #[serde(default)]
    pub atoms: Vec<String>,
    /// Bonds by index into the combined atom list.
    #[serde(default)]
    pub bonds: Vec<BondDecl>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TopologyRef {
    pub name: String,
    /// Element symbols bound to the topology's slots, in slot order.
    pub bind: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BondDecl {
    pub a: usize,
    pub b: usize,
    #[serde(default)]
    pub order: BondOrderDecl,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PatternDecl {
    pub id: String,
    pub roles: Vec<RoleDecl>,
    #[serde(default)]
    pub bonds: Vec<PatternBondDecl>,
    /// Role index reaction rules treat as the reacting atom.
    #[serde(default)]
    pub anchor: usize,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RoleDecl {
    /// Element symbol; omitted means any element, `"R"` matches any too.
    #[serde(default)]
    pub element: Option<String>,
    #[serde(default)]
    pub degree: Option<u8>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PatternBondDecl {
    pub a: usize,
    pub b: usize,
    /// Omitted means any bond order.
    #[serde(default)]
    pub order: Option<BondOrderDecl>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RuleDecl {
    Explicit {
        id: String,
        reactants: Vec<Term>,
        products: Vec<Term>,
        #[serde(default)]
        catalysts: Vec<String>,
        #[serde(default)]
        rate: RateDecl,
    },
    Generic {
        id: String,
        slots: Vec<String>,
        products: Vec<ProductDecl>,
        #[serde(default)]
        byproducts: Vec<Term>,
        #[serde(default)]
        rate: RateDecl,
        #[serde(default)]
        multi_fire: bool,
        #[serde(default)]
        allow_self_overlap: bool,
    },
}

#[derive(Debug, Clone, Deserialize)]
pub struct Term {
    pub species: String,
    #[serde(default = "one")]
    pub coeff: f64,
}

fn one() -> f64 {
    1.0
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateDecl {
    Fast,
    #[default]
    Moderate,
    Slow,
}

impl From<RateDecl> for RateClass {
    fn from(d: RateDecl) -> Self {
        match d {
            RateDecl::Fast => RateClass::Fast,
            RateDecl::Moderate => RateClass::Moderate,
            RateDecl::Slow => RateClass::Slow,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProductDecl {
    pub atoms: Vec<ProductAtomDecl>,
    #[serde(default)]
    pub bonds: Vec<BondDecl>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductAtomDecl {
    /// `[slot, role]` back-reference into the rule's patterns.
    #[serde(default)]
    pub role: Option<(usize, usize)>,
    /// Element symbol: required for fresh atoms, an override for mapped
    /// ones.
    #[serde(default)]
    pub element: Option<String>,
}

fn element(symbol: &str) -> Result<Element, LoadError> {
    Element::from_symbol(symbol).ok_or_else(|| LoadError::UnknownElement {
        symbol: symbol.to_owned(),
    })
}

impl Declarations {
    /// Build a validated registry out of the declarations, in declaration
    /// order. The first error wins.
    pub fn build(&self) -> Result<Registry, LoadError> {
        let mut registry = Registry::new();

        for decl in &self.topologies {
            registry.add_topology(decl.to_topology())?;
        }
        for decl in &self.species {
            let graph = decl.to_graph(&registry)?;
            registry.add_species(SpeciesId::new(decl.id.clone()), graph)?;
        }
        for decl in &self.patterns {
            registry.add_pattern(decl.to_pattern()?)?;
        }
        for decl in &self.rules {
            match decl {
                RuleDecl::Explicit {
                    id,
                    reactants,
                    products,
                    catalysts,
                    rate,
                } => registry.add_explicit_rule(ExplicitRule {
                    id: RuleId::new(id.clone()),
                    reactants: terms(reactants),
                    products: terms(products),
                    catalysts: catalysts.iter().map(SpeciesId::new).collect(),
                    rate: (*rate).into(),
                })?,
                RuleDecl::Generic {
                    id,
                    slots,
                    products,
                    byproducts,
                    rate,
                    multi_fire,
                    allow_self_overlap,
                } => {
                    let rule_id = RuleId::new(id.clone());
                    let templates = products
                        .iter()
                        .map(|p| p.to_template(&rule_id))
                        .collect::<Result<_, _>>()?;
                    registry.add_generic_rule(GenericRule {
                        id: rule_id,
                        slots: slots.iter().map(PatternId::new).collect(),
                        products: templates,
                        byproducts: terms(byproducts),
                        rate: (*rate).into(),
                        multi_fire: *multi_fire,
                        allow_self_overlap: *allow_self_overlap,
                    })?
                }
            }
        }

        Ok(registry)
    }
}

fn terms(decls: &[Term]) -> Vec<(SpeciesId, f64)> {
    decls
        .iter()
        .map(|t| (SpeciesId::new(t.species.clone()), t.coeff))
        .collect()
}

impl TopologyDecl {
    fn to_topology(&self) -> Topology {
        match self {
            Self::Chain {
                name,
                length,
                order,
            } => Topology::chain(name.clone(), *length, (*order).into()),
            Self::Ring {
                name,
                length,
                order,
            } => Topology::ring(name.clone(), *length, (*order).into()),
            Self::Edges { name, slots, edges } => Topology::new(
                name.clone(),
                *slots,
                edges
                    .iter()
                    .map(|&(a, b, order)| (a, b, order.into()))
                    .collect(),
            ),
        }
    }
}

impl SpeciesDecl {
    fn to_graph(&self, registry: &Registry) -> Result<MolGraph<Atom, Bond>, LoadError> {
        let id = SpeciesId::new(self.id.clone());
        let mut graph = match &self.topology {
            Some(reference) => {
                let bindings = reference
                    .bind
                    .iter()
                    .map(|s| element(s))
                    .collect::<Result<Vec<_>, _>>()?;
                registry
                    .topologies()
                    .instantiate(&reference.name, &bindings)
                    .map_err(|source| LoadError::Topology {
                        id: id.clone(),
                        source,
                    })?
            }
            None => MolGraph::new(),
        };
        for symbol in &self.atoms {
            graph.add_atom(Atom::new(element(symbol)?));
        }
        for bond in &self.bonds {
            for index in [bond.a, bond.b] {
                if index >= graph.atom_count() {
                    return Err(LoadError::BadBondIndex {
                        id: id.clone(),
                        index,
                    });
                }
            }
            graph.add_bond(
                NodeIndex::new(bond.a),
                NodeIndex::new(bond.b),
                Bond::new(bond.order.into()),
            );
        }
        Ok(graph)
    }
}

impl PatternDecl {
    fn to_pattern(&self) -> Result<GroupPattern, LoadError> {
        let id = PatternId::new(self.id.clone());
        let mut graph = MolGraph::new();
        for role in &self.roles {
            let query = AtomQuery {
                element: role.element.as_deref().map(element).transpose()?,
                degree: role.degree,
            };
            graph.add_atom(query);
        }
        for bond in &self.bonds {
            for index in [bond.a, bond.b] {
                if index >= self.roles.len() {
                    return Err(LoadError::BadRoleIndex {
                        id: id.clone(),
                        index,
                    });
                }
            }
            graph.add_bond(
                NodeIndex::new(bond.a),
                NodeIndex::new(bond.b),
                BondQuery {
                    order: bond.order.map(Into::into),
                },
            );
        }
        if self.anchor >= self.roles.len() {
            return Err(LoadError::BadRoleIndex {
                id,
                index: self.anchor,
            });
        }
        Ok(GroupPattern::new(id, graph, NodeIndex::new(self.anchor)))
    }
}

impl ProductDecl {
    fn to_template(&self, rule: &RuleId) -> Result<ProductTemplate, LoadError> {
        let mut template = ProductTemplate::new();
        for atom in &self.atoms {
            template.add_atom(ProductAtom {
                role: atom.role.map(|(slot, role)| RoleRef {
                    slot,
                    role: NodeIndex::new(role),
                }),
                element: atom.element.as_deref().map(element).transpose()?,
            });
        }
        for bond in &self.bonds {
            for index in [bond.a, bond.b] {
                if index >= self.atoms.len() {
                    return Err(LoadError::BadTemplateIndex {
                        rule: rule.clone(),
                        index,
                    });
                }
            }
            template.add_bond(
                NodeIndex::new(bond.a),
                NodeIndex::new(bond.b),
                Bond::new(bond.order.into()),
            );
        }
        Ok(template)
    }
}
