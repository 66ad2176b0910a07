//! Reaction rules: explicit (exact species in, exact species out) and
//! generic (pattern slots in, template-constructed products out).

pub mod error;
mod runner;

pub use error::ReactionError;
pub use runner::build_products;

use std::fmt;
use std::sync::Arc;

use petgraph::graph::NodeIndex;

use crate::bond::Bond;
use crate::element::Element;
use crate::graph::MolGraph;
use crate::pattern::{GroupOccurrence, PatternId};
use crate::species::{Species, SpeciesId};

/// Cap on enumerated binding combinations for one generic rule. Overflow
/// skips the rule for the pass instead of stalling resolution.
pub const MAX_COMBINATIONS: usize = 1000;

/// Stable identifier of a reaction rule.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RuleId(String);

impl RuleId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RuleId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Declared rate/favorability class. Tie-breaking between rules is by
/// declaration order, not rate; this is display metadata for the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RateClass {
    Fast,
    #[default]
    Moderate,
    Slow,
}

/// A rule naming exact reactant and product species with fixed
/// stoichiometry.
#[derive(Debug, Clone)]
pub struct ExplicitRule {
    pub id: RuleId,
    /// (species, coefficient) pairs; coefficients are consumption ratios.
    pub reactants: Vec<(SpeciesId, f64)>,
    pub products: Vec<(SpeciesId, f64)>,
    /// Species that must be present with nonzero quantity but are not
    /// consumed.
    pub catalysts: Vec<SpeciesId>,
    pub rate: RateClass,
}

/// Reference from a product template atom back to a reactant slot's
/// pattern role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoleRef {
    pub slot: usize,
    pub role: NodeIndex,
}

/// Node label of a product template. A role-bearing atom inherits the
/// matched reactant atom (with an optional element override, e.g. for
/// substitution); an unmapped atom is created fresh and must name an
/// element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProductAtom {
    pub role: Option<RoleRef>,
    pub element: Option<Element>,
}

impl ProductAtom {
    pub fn from_role(slot: usize, role: NodeIndex) -> Self {
        Self {
            role: Some(RoleRef { slot, role }),
            element: None,
        }
    }

    pub fn fresh(element: Element) -> Self {
        Self {
            role: None,
            element: Some(element),
        }
    }
}

pub type ProductTemplate = MolGraph<ProductAtom, Bond>;

/// A rule over matched functional groups rather than named species.
///
/// Each slot names a pattern; a binding assigns one occurrence of that
/// pattern (in some available species) to each slot. Products are built
/// from the templates by graph rewrite (see [`build_products`]).
#[derive(Debug, Clone)]
pub struct GenericRule {
    pub id: RuleId,
    pub slots: Vec<PatternId>,
    pub products: Vec<ProductTemplate>,
    /// Fixed additional products (e.g. water from a condensation).
    pub byproducts: Vec<(SpeciesId, f64)>,
    pub rate: RateClass,
    /// Fire once per enumerated binding instead of once per pass.
    pub multi_fire: bool,
    /// Permit the same occurrence to satisfy more than one slot.
    pub allow_self_overlap: bool,
}

/// One slot's assignment within a generic-rule binding.
#[derive(Debug, Clone)]
pub struct SlotBinding {
    pub species: Arc<Species>,
    pub occurrence: GroupOccurrence,
}

/// A complete assignment of occurrences to a rule's slots, one entry per
/// slot.
pub type GenericBinding = Vec<SlotBinding>;

/// A rule found applicable to the current mixture, with enough context to
/// fire it.
#[derive(Debug, Clone)]
pub enum Candidate<'a> {
    Explicit(&'a ExplicitRule),
    Generic {
        rule: &'a GenericRule,
        bindings: Vec<GenericBinding>,
    },
}

impl Candidate<'_> {
    pub fn rule_id(&self) -> &RuleId {
        match self {
            Candidate::Explicit(rule) => &rule.id,
            Candidate::Generic { rule, .. } => &rule.id,
        }
    }
}

/// Enumerate all role-compatible combinations of per-slot bindings, in
/// slot-major order, capped at [`MAX_COMBINATIONS`].
///
/// Unless the rule allows self-overlap, a combination may not bind the
/// identical (species, occurrence) to two slots.
pub fn enumerate_bindings(
    rule: &GenericRule,
    per_slot: &[Vec<SlotBinding>],
) -> Result<Vec<GenericBinding>, ReactionError> {
    if per_slot.iter().any(|s| s.is_empty()) {
        return Ok(Vec::new());
    }
    let mut combos: Vec<GenericBinding> = vec![Vec::new()];
    for slot_bindings in per_slot {
        let mut next = Vec::new();
        for combo in &combos {
            for binding in slot_bindings {
                if !rule.allow_self_overlap && combo.iter().any(|b| same_occurrence(b, binding)) {
                    continue;
                }
                let mut extended = combo.clone();
                extended.push(binding.clone());
                next.push(extended);
                if next.len() > MAX_COMBINATIONS {
                    return Err(ReactionError::TooManyCombinations);
                }
            }
        }
        combos = next;
    }
    Ok(combos)
}

fn same_occurrence(a: &SlotBinding, b: &SlotBinding) -> bool {
    a.species.id() == b.species.id() && a.occurrence == b.occurrence
}
