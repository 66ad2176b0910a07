//! The loaded, read-only rule set: topologies, species, group patterns,
//! and reaction rules, each in declaration order.
//!
//! Everything is validated at load; resolution never sees a dangling id,
//! an unbalanced explicit rule, or a product template role that points
//! nowhere.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::atom::Atom;
use crate::bond::Bond;
use crate::element::{Element, VALENCY_EPSILON};
use crate::find::{find_all, find_pattern};
use crate::graph::MolGraph;
use crate::pattern::{GroupOccurrence, GroupPattern, PatternId};
use crate::resolve::Mixture;
use crate::species::{Species, SpeciesId, StructureError};
use crate::topology::{Topology, TopologyError, TopologyLibrary};
use crate::reaction::{
    enumerate_bindings, Candidate, ExplicitRule, GenericRule, RuleId, SlotBinding,
};

/// Why a declaration set was rejected.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadError {
    /// A declaration names an element symbol outside the element table.
    UnknownElement { symbol: String },
    DuplicateTopology { name: String },
    DuplicateSpecies { id: SpeciesId },
    DuplicatePattern { id: PatternId },
    DuplicateRule { id: RuleId },
    /// A rule references a species that was never declared.
    UnknownSpecies { rule: RuleId, id: SpeciesId },
    /// A generic rule's slot references a pattern that was never declared.
    UnknownPattern { rule: RuleId, id: PatternId },
    /// A product template role points outside the rule's slots or the slot
    /// pattern's roles.
    UnknownRole {
        rule: RuleId,
        slot: usize,
        role: usize,
    },
    /// A stoichiometric coefficient is zero or negative.
    BadCoefficient { rule: RuleId, id: SpeciesId },
    /// A declared bond references an atom index outside the species.
    BadBondIndex { id: SpeciesId, index: usize },
    /// A pattern bond or anchor references a role outside the pattern.
    BadRoleIndex { id: PatternId, index: usize },
    /// A product template bond references an atom outside the template.
    BadTemplateIndex { rule: RuleId, index: usize },
    /// An explicit rule does not conserve some element.
    UnbalancedRule {
        rule: RuleId,
        element: Element,
        reactants: f64,
        products: f64,
    },
    /// A declared species graph failed structural validation.
    Structure {
        id: SpeciesId,
        source: StructureError,
    },
    /// A topology instantiation in a declaration failed.
    Topology {
        id: SpeciesId,
        source: TopologyError,
    },
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownElement { symbol } => write!(f, "unknown element symbol {symbol:?}"),
            Self::DuplicateTopology { name } => write!(f, "duplicate topology {name:?}"),
            Self::DuplicateSpecies { id } => write!(f, "duplicate species {id}"),
            Self::DuplicatePattern { id } => write!(f, "duplicate pattern {id}"),
            Self::DuplicateRule { id } => write!(f, "duplicate rule {id}"),
            Self::UnknownSpecies { rule, id } => {
                write!(f, "rule {rule}: unknown species {id}")
            }
            Self::UnknownPattern { rule, id } => {
                write!(f, "rule {rule}: unknown pattern {id}")
            }
            Self::UnknownRole { rule, slot, role } => {
                write!(f, "rule {rule}: role (slot {slot}, role {role}) does not exist")
            }
            Self::BadCoefficient { rule, id } => {
                write!(f, "rule {rule}: non-positive coefficient for {id}")
            }
            Self::BadBondIndex { id, index } => {
                write!(f, "species {id}: bond references missing atom {index}")
            }
            Self::BadRoleIndex { id, index } => {
                write!(f, "pattern {id}: reference to missing role {index}")
            }
            Self::BadTemplateIndex { rule, index } => {
                write!(f, "rule {rule}: product template references missing atom {index}")
            }
            Self::UnbalancedRule {
                rule,
                element,
                reactants,
                products,
            } => write!(
                f,
                "rule {rule}: {element} unbalanced ({reactants} in, {products} out)"
            ),
            Self::Structure { id, source } => write!(f, "species {id}: {source}"),
            Self::Topology { id, source } => write!(f, "species {id}: {source}"),
        }
    }
}

impl std::error::Error for LoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Structure { source, .. } => Some(source),
            Self::Topology { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// The complete loaded rule set. Construction goes through the `add_*`
/// methods (or [`Declarations::build`](crate::decl::Declarations::build));
/// afterward the registry is read-only and shareable across threads.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    topologies: TopologyLibrary,
    species: Vec<Arc<Species>>,
    species_by_id: HashMap<SpeciesId, Arc<Species>>,
    // First declaration wins when two species share a structural key.
    species_by_key: HashMap<String, Arc<Species>>,
    patterns: Vec<GroupPattern>,
    explicit_rules: Vec<ExplicitRule>,
    generic_rules: Vec<GenericRule>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_topology(&mut self, topology: Topology) -> Result<(), LoadError> {
        if self.topologies.get(topology.name()).is_some() {
            return Err(LoadError::DuplicateTopology {
                name: topology.name().to_owned(),
            });
        }
        debug!(topology = topology.name(), "registered topology");
        self.topologies.insert(topology);
        Ok(())
    }

    /// Validate `graph` and register it under `id`.
    pub fn add_species(
        &mut self,
        id: SpeciesId,
        graph: MolGraph<Atom, Bond>,
    ) -> Result<Arc<Species>, LoadError> {
        if self.species_by_id.contains_key(&id) {
            return Err(LoadError::DuplicateSpecies { id });
        }
        let species = Species::new(id.clone(), graph).map_err(|source| LoadError::Structure {
            id: id.clone(),
            source,
        })?;
        let species = Arc::new(species);
        debug!(species = %id, formula = %species.formula_string(), "registered species");
        self.species_by_key
            .entry(species.structural_key().to_owned())
            .or_insert_with(|| Arc::clone(&species));
        self.species_by_id.insert(id, Arc::clone(&species));
        self.species.push(Arc::clone(&species));
        Ok(species)
    }

    pub fn add_pattern(&mut self, pattern: GroupPattern) -> Result<(), LoadError> {
        if self.pattern(pattern.id()).is_some() {
            return Err(LoadError::DuplicatePattern {
                id: pattern.id().clone(),
            });
        }
        if pattern.anchor().index() >= pattern.role_count() {
            return Err(LoadError::BadRoleIndex {
                id: pattern.id().clone(),
                index: pattern.anchor().index(),
            });
        }
        debug!(pattern = %pattern.id(), roles = pattern.role_count(), "registered pattern");
        self.patterns.push(pattern);
        Ok(())
    }

    pub fn add_explicit_rule(&mut self, rule: ExplicitRule) -> Result<(), LoadError> {
        if self.rule_id_taken(&rule.id) {
            return Err(LoadError::DuplicateRule { id: rule.id.clone() });
        }
        for (id, coeff) in rule.reactants.iter().chain(&rule.products) {
            if !self.species_by_id.contains_key(id) {
                return Err(LoadError::UnknownSpecies {
                    rule: rule.id.clone(),
                    id: id.clone(),
                });
            }
            if *coeff <= 0.0 {
                return Err(LoadError::BadCoefficient {
                    rule: rule.id.clone(),
                    id: id.clone(),
                });
            }
        }
        for id in &rule.catalysts {
            if !self.species_by_id.contains_key(id) {
                return Err(LoadError::UnknownSpecies {
                    rule: rule.id.clone(),
                    id: id.clone(),
                });
            }
        }
        self.check_balance(&rule)?;
        debug!(rule = %rule.id, "registered explicit rule");
        self.explicit_rules.push(rule);
        Ok(())
    }

    pub fn add_generic_rule(&mut self, rule: GenericRule) -> Result<(), LoadError> {
        if self.rule_id_taken(&rule.id) {
            return Err(LoadError::DuplicateRule { id: rule.id.clone() });
        }
        let mut slot_patterns = Vec::with_capacity(rule.slots.len());
        for pattern_id in &rule.slots {
            match self.pattern(pattern_id) {
                Some(p) => slot_patterns.push(p),
                None => {
                    return Err(LoadError::UnknownPattern {
                        rule: rule.id.clone(),
                        id: pattern_id.clone(),
                    })
                }
            }
        }
        for template in &rule.products {
            for idx in template.atoms() {
                if let Some(role_ref) = template.atom(idx).role {
                    let valid = role_ref.slot < slot_patterns.len()
                        && role_ref.role.index() < slot_patterns[role_ref.slot].role_count();
                    if !valid {
                        return Err(LoadError::UnknownRole {
                            rule: rule.id.clone(),
                            slot: role_ref.slot,
                            role: role_ref.role.index(),
                        });
                    }
                }
            }
        }
        for (id, coeff) in &rule.byproducts {
            if !self.species_by_id.contains_key(id) {
                return Err(LoadError::UnknownSpecies {
                    rule: rule.id.clone(),
                    id: id.clone(),
                });
            }
            if *coeff <= 0.0 {
                return Err(LoadError::BadCoefficient {
                    rule: rule.id.clone(),
                    id: id.clone(),
                });
            }
        }
        debug!(rule = %rule.id, slots = rule.slots.len(), "registered generic rule");
        self.generic_rules.push(rule);
        Ok(())
    }

    /// Every element must appear with the same coefficient-weighted count on
    /// both sides. Catalysts are outside the balance.
    fn check_balance(&self, rule: &ExplicitRule) -> Result<(), LoadError> {
        let tally = |side: &[(SpeciesId, f64)]| -> BTreeMap<Element, f64> {
            let mut counts = BTreeMap::new();
            for (id, coeff) in side {
                // Presence was checked before balance.
                if let Some(species) = self.species_by_id.get(id) {
                    for &(element, n) in species.formula() {
                        *counts.entry(element).or_insert(0.0) += coeff * n as f64;
                    }
                }
            }
            counts
        };
        let reactants = tally(&rule.reactants);
        let products = tally(&rule.products);
        for &element in reactants.keys().chain(products.keys()) {
            let r = reactants.get(&element).copied().unwrap_or(0.0);
            let p = products.get(&element).copied().unwrap_or(0.0);
            if (r - p).abs() > VALENCY_EPSILON {
                return Err(LoadError::UnbalancedRule {
                    rule: rule.id.clone(),
                    element,
                    reactants: r,
                    products: p,
                });
            }
        }
        Ok(())
    }

    fn rule_id_taken(&self, id: &RuleId) -> bool {
        self.explicit_rules.iter().any(|r| &r.id == id)
            || self.generic_rules.iter().any(|r| &r.id == id)
    }

    pub fn topologies(&self) -> &TopologyLibrary {
        &self.topologies
    }

    /// Declared species, in declaration order.
    pub fn species(&self) -> &[Arc<Species>] {
        &self.species
    }

    pub fn species_by_id(&self, id: &SpeciesId) -> Option<&Arc<Species>> {
        self.species_by_id.get(id)
    }

    /// The first-declared species whose structural key matches.
    pub fn species_by_key(&self, key: &str) -> Option<&Arc<Species>> {
        self.species_by_key.get(key)
    }

    pub fn pattern(&self, id: &PatternId) -> Option<&GroupPattern> {
        self.patterns.iter().find(|p| p.id() == id)
    }

    /// Registered patterns, in registration order.
    pub fn patterns(&self) -> &[GroupPattern] {
        &self.patterns
    }

    pub fn explicit_rules(&self) -> &[ExplicitRule] {
        &self.explicit_rules
    }

    pub fn generic_rules(&self) -> &[GenericRule] {
        &self.generic_rules
    }

    /// Every occurrence of every registered pattern within `species`,
    /// patterns in registration order. Read-only; exposed for presentation
    /// layers.
    pub fn group_occurrences_for(&self, species: &Species) -> Vec<GroupOccurrence> {
        find_all(species, &self.patterns)
    }

    /// Rules that could fire against `mixture` as it stands, in rule order
    /// (explicit before generic, declaration order within each).
    ///
    /// [`resolve`](crate::resolve::resolve) judges applicability the same
    /// way, against the mixture it was handed, so this predicts exactly
    /// which rules a pass will attempt.
    pub fn applicable_rules(&self, mixture: &Mixture) -> Vec<Candidate<'_>> {
        let mut candidates = Vec::new();
        for rule in &self.explicit_rules {
            let present = !rule.reactants.is_empty()
                && rule.reactants.iter().all(|(id, _)| mixture.contains(id))
                && rule.catalysts.iter().all(|id| mixture.contains(id));
            if present {
                candidates.push(Candidate::Explicit(rule));
            }
        }
        for rule in &self.generic_rules {
            let per_slot: Vec<Vec<SlotBinding>> = rule
                .slots
                .iter()
                .filter_map(|id| self.pattern(id))
                .map(|pattern| {
                    self.species
                        .iter()
                        .filter(|species| mixture.contains(species.id()))
                        .flat_map(|species| {
                            find_pattern(species, pattern).into_iter().map(move |occurrence| {
                                SlotBinding {
                                    species: Arc::clone(species),
                                    occurrence,
                                }
                            })
                        })
                        .collect()
                })
                .collect();
            if per_slot.len() != rule.slots.len() {
                continue;
            }
            match enumerate_bindings(rule, &per_slot) {
                Ok(bindings) if !bindings.is_empty() => {
                    candidates.push(Candidate::Generic { rule, bindings })
                }
                Ok(_) => {}
                Err(error) => {
                    warn!(rule = %rule.id, %error, "binding enumeration overflowed")
                }
            }
        }
        candidates
    }
}
