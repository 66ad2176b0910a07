//! Single-pass mixture resolution.
//!
//! One pass walks every rule exactly once: explicit rules first, then
//! generic rules, each group in declaration order. Applicability is
//! judged against the input mixture as supplied, so products of earlier
//! rules never enable later rules within the same pass (repeated passes
//! are the caller's pacing decision); quantities consumed by earlier
//! rules do reduce what later rules may take, and a rule whose reactants
//! are exhausted (or whose product construction fails) is skipped — where
//! that is worth reporting, with a diagnostic.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::atom::Atom;
use crate::bond::Bond;
use crate::find::find_pattern;
use crate::graph::MolGraph;
use crate::pattern::GroupPattern;
use crate::reaction::{
    build_products, enumerate_bindings, ExplicitRule, GenericBinding, GenericRule, ReactionError,
    RuleId, SlotBinding,
};
use crate::registry::Registry;
use crate::species::{structural_key, Species, SpeciesId};

/// Quantities smaller than this are treated as absent.
pub const QUANTITY_EPSILON: f64 = 1e-9;

/// Mole quantities keyed by species id. Ordered iteration makes every
/// derived walk deterministic.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mixture {
    contents: BTreeMap<SpeciesId, f64>,
}

impl Mixture {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `moles` of `id`, accumulating with any existing quantity.
    pub fn add(&mut self, id: SpeciesId, moles: f64) {
        if moles <= 0.0 {
            return;
        }
        *self.contents.entry(id).or_insert(0.0) += moles;
    }

    /// Remove up to `moles` of `id`. Entries that drop below the quantity
    /// epsilon are deleted outright.
    pub fn remove(&mut self, id: &SpeciesId, moles: f64) {
        if let Some(amount) = self.contents.get_mut(id) {
            *amount -= moles;
            if *amount <= QUANTITY_EPSILON {
                self.contents.remove(id);
            }
        }
    }

    pub fn amount_of(&self, id: &SpeciesId) -> f64 {
        self.contents.get(id).copied().unwrap_or(0.0)
    }

    pub fn contains(&self, id: &SpeciesId) -> bool {
        self.amount_of(id) > QUANTITY_EPSILON
    }

    pub fn iter(&self) -> impl Iterator<Item = (&SpeciesId, f64)> {
        self.contents.iter().map(|(id, &moles)| (id, moles))
    }

    pub fn len(&self) -> usize {
        self.contents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contents.is_empty()
    }

    pub fn total_moles(&self) -> f64 {
        self.contents.values().sum()
    }

    /// Total mass, resolving molar masses through `known` (registry species
    /// plus any species minted during resolution).
    pub fn total_mass<'a>(&self, known: impl IntoIterator<Item = &'a Arc<Species>>) -> f64 {
        let by_id: HashMap<&SpeciesId, f64> = known
            .into_iter()
            .map(|s| (s.id(), s.molar_mass()))
            .collect();
        self.iter()
            .map(|(id, moles)| moles * by_id.get(id).copied().unwrap_or(0.0))
            .sum()
    }
}

impl FromIterator<(SpeciesId, f64)> for Mixture {
    fn from_iter<T: IntoIterator<Item = (SpeciesId, f64)>>(iter: T) -> Self {
        let mut mixture = Mixture::new();
        for (id, moles) in iter {
            mixture.add(id, moles);
        }
        mixture
    }
}

/// One rule firing: what it took and what it gave, in mole quantities.
#[derive(Debug, Clone, PartialEq)]
pub struct AppliedReaction {
    pub rule: RuleId,
    pub consumed: Vec<(SpeciesId, f64)>,
    pub produced: Vec<(SpeciesId, f64)>,
}

/// A recoverable per-rule problem encountered during a pass.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolveDiagnostic {
    /// The rule (or one of its bindings) was skipped for the pass.
    RuleSkipped {
        rule: RuleId,
        error: ReactionError,
    },
}

/// The outcome of one resolution pass.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub mixture: Mixture,
    pub applied: Vec<AppliedReaction>,
    pub diagnostics: Vec<ResolveDiagnostic>,
    /// Species constructed by generic rules that matched no declared
    /// structure, in mint order.
    pub new_species: Vec<Arc<Species>>,
}

/// Run one resolution pass over `initial`.
///
/// Deterministic: the same registry and mixture always produce the same
/// resolution, including applied-reaction order and minted ids.
pub fn resolve(registry: &Registry, initial: &Mixture) -> Resolution {
    let mut pass = Pass {
        registry,
        snapshot: initial,
        mixture: initial.clone(),
        applied: Vec::new(),
        diagnostics: Vec::new(),
        new_species: Vec::new(),
        minted_by_key: HashMap::new(),
        mint_counter: 0,
    };

    for rule in registry.explicit_rules() {
        pass.apply_explicit(rule);
    }
    for rule in registry.generic_rules() {
        pass.apply_generic(rule);
    }

    debug!(
        applied = pass.applied.len(),
        diagnostics = pass.diagnostics.len(),
        new_species = pass.new_species.len(),
        "resolution pass complete"
    );

    Resolution {
        mixture: pass.mixture,
        applied: pass.applied,
        diagnostics: pass.diagnostics,
        new_species: pass.new_species,
    }
}

struct Pass<'a> {
    registry: &'a Registry,
    /// The input mixture: applicability is judged against this, never
    /// against mid-pass products.
    snapshot: &'a Mixture,
    mixture: Mixture,
    applied: Vec<AppliedReaction>,
    diagnostics: Vec<ResolveDiagnostic>,
    new_species: Vec<Arc<Species>>,
    minted_by_key: HashMap<String, Arc<Species>>,
    mint_counter: usize,
}

impl Pass<'_> {
    fn apply_explicit(&mut self, rule: &ExplicitRule) {
        if rule.reactants.is_empty() {
            return;
        }
        let applicable = rule.reactants.iter().all(|(id, _)| self.snapshot.contains(id))
            && rule.catalysts.iter().all(|c| self.snapshot.contains(c));
        if !applicable {
            return;
        }
        let extent = rule
            .reactants
            .iter()
            .map(|(id, coeff)| self.mixture.amount_of(id) / coeff)
            .fold(f64::INFINITY, f64::min);
        if extent <= QUANTITY_EPSILON {
            return;
        }

        let consumed: Vec<(SpeciesId, f64)> = rule
            .reactants
            .iter()
            .map(|(id, coeff)| (id.clone(), coeff * extent))
            .collect();
        let produced: Vec<(SpeciesId, f64)> = rule
            .products
            .iter()
            .map(|(id, coeff)| (id.clone(), coeff * extent))
            .collect();
        self.commit(rule.id.clone(), consumed, produced);
    }

    fn apply_generic(&mut self, rule: &GenericRule) {
        let patterns: Vec<&GroupPattern> = match rule
            .slots
            .iter()
            .map(|id| self.registry.pattern(id))
            .collect()
        {
            Some(p) => p,
            // Load validation guarantees every slot pattern exists.
            None => return,
        };

        let per_slot: Vec<Vec<SlotBinding>> = patterns
            .iter()
            .map(|pattern| self.slot_bindings(pattern))
            .collect();

        let bindings = match enumerate_bindings(rule, &per_slot) {
            Ok(b) => b,
            Err(error) => {
                warn!(rule = %rule.id, %error, "skipping rule");
                self.diagnostics.push(ResolveDiagnostic::RuleSkipped {
                    rule: rule.id.clone(),
                    error,
                });
                return;
            }
        };

        let fire_count = if rule.multi_fire { bindings.len() } else { 1 };
        for binding in bindings.iter().take(fire_count) {
            if let Err(error) = self.fire_generic(rule, &patterns, binding) {
                warn!(rule = %rule.id, %error, "binding refused");
                self.diagnostics.push(ResolveDiagnostic::RuleSkipped {
                    rule: rule.id.clone(),
                    error,
                });
            }
        }
    }

    /// Occurrences of `pattern` across every species present in the input
    /// mixture, in declaration order. Species minted mid-pass are not
    /// candidates: they were not part of the input.
    fn slot_bindings(&self, pattern: &GroupPattern) -> Vec<SlotBinding> {
        self.registry
            .species()
            .iter()
            .filter(|species| self.snapshot.contains(species.id()))
            .flat_map(|species| {
                find_pattern(species, pattern)
                    .into_iter()
                    .map(move |occurrence| SlotBinding {
                        species: Arc::clone(species),
                        occurrence,
                    })
            })
            .collect()
    }

    fn fire_generic(
        &mut self,
        rule: &GenericRule,
        patterns: &[&GroupPattern],
        binding: &GenericBinding,
    ) -> Result<(), ReactionError> {
        // Slots binding the same species stack their consumption.
        let mut coefficients: BTreeMap<SpeciesId, f64> = BTreeMap::new();
        for slot in binding {
            *coefficients.entry(slot.species.id().clone()).or_insert(0.0) += 1.0;
        }
        let extent = coefficients
            .iter()
            .map(|(id, coeff)| self.mixture.amount_of(id) / coeff)
            .fold(f64::INFINITY, f64::min);
        if extent <= QUANTITY_EPSILON {
            return Ok(());
        }

        let graphs = build_products(rule, patterns, binding)?;
        // Identify (or mint) every product before touching the mixture, so a
        // refused product leaves the pass untouched.
        let mut products: Vec<Arc<Species>> = Vec::with_capacity(graphs.len());
        for graph in graphs {
            products.push(self.identify_product(&rule.id, graph)?);
        }

        let consumed: Vec<(SpeciesId, f64)> = coefficients
            .iter()
            .map(|(id, coeff)| (id.clone(), coeff * extent))
            .collect();
        let mut produced: Vec<(SpeciesId, f64)> = products
            .iter()
            .map(|species| (species.id().clone(), extent))
            .collect();
        for (id, coeff) in &rule.byproducts {
            produced.push((id.clone(), coeff * extent));
        }
        self.commit(rule.id.clone(), consumed, produced);
        Ok(())
    }

    /// Map a constructed product graph to a species: a declared species
    /// with the same structural key, a species minted earlier in this pass,
    /// or a newly minted one.
    fn identify_product(
        &mut self,
        rule: &RuleId,
        graph: MolGraph<Atom, Bond>,
    ) -> Result<Arc<Species>, ReactionError> {
        let key = structural_key(&graph);
        if let Some(species) = self.registry.species_by_key(&key) {
            return Ok(Arc::clone(species));
        }
        if let Some(species) = self.minted_by_key.get(&key) {
            return Ok(Arc::clone(species));
        }
        let id = SpeciesId::new(format!("{rule}/product-{}", self.mint_counter));
        let species = Arc::new(Species::new(id, graph)?);
        debug!(species = %species.id(), formula = %species.formula_string(), "minted species");
        self.mint_counter += 1;
        self.minted_by_key.insert(key, Arc::clone(&species));
        self.new_species.push(Arc::clone(&species));
        Ok(species)
    }

    fn commit(
        &mut self,
        rule: RuleId,
        consumed: Vec<(SpeciesId, f64)>,
        produced: Vec<(SpeciesId, f64)>,
    ) {
        for (id, moles) in &consumed {
            self.mixture.remove(id, *moles);
        }
        for (id, moles) in &produced {
            self.mixture.add(id.clone(), *moles);
        }
        debug!(rule = %rule, "rule fired");
        self.applied.push(AppliedReaction {
            rule,
            consumed,
            produced,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atom::Atom;
    use crate::bond::{Bond, BondOrder};
    use crate::element::Element;
    use crate::graph::MolGraph;
    use crate::pattern::{AtomQuery, BondQuery, PatternId};
    use crate::reaction::{ProductAtom, ProductTemplate, RateClass};
    use petgraph::graph::NodeIndex;

    fn hydrogen() -> MolGraph<Atom, Bond> {
        let mut g = MolGraph::new();
        let a = g.add_atom(Atom::new(Element::H));
        let b = g.add_atom(Atom::new(Element::H));
        g.add_bond(a, b, Bond::default());
        g
    }

    fn oxygen() -> MolGraph<Atom, Bond> {
        let mut g = MolGraph::new();
        let a = g.add_atom(Atom::new(Element::O));
        let b = g.add_atom(Atom::new(Element::O));
        g.add_bond(a, b, Bond::new(BondOrder::Double));
        g
    }

    fn water() -> MolGraph<Atom, Bond> {
        let mut g = MolGraph::new();
        let o = g.add_atom(Atom::new(Element::O));
        for _ in 0..2 {
            let h = g.add_atom(Atom::new(Element::H));
            g.add_bond(o, h, Bond::default());
        }
        g
    }

    fn combustion_registry() -> Registry {
        let mut reg = Registry::new();
        reg.add_species(SpeciesId::new("hydrogen"), hydrogen()).unwrap();
        reg.add_species(SpeciesId::new("oxygen"), oxygen()).unwrap();
        reg.add_species(SpeciesId::new("water"), water()).unwrap();
        reg.add_explicit_rule(crate::reaction::ExplicitRule {
            id: RuleId::new("combustion"),
            reactants: vec![
                (SpeciesId::new("hydrogen"), 2.0),
                (SpeciesId::new("oxygen"), 1.0),
            ],
            products: vec![(SpeciesId::new("water"), 2.0)],
            catalysts: Vec::new(),
            rate: RateClass::Fast,
        })
        .unwrap();
        reg
    }

    fn moles(pairs: &[(&str, f64)]) -> Mixture {
        pairs
            .iter()
            .map(|&(id, n)| (SpeciesId::new(id), n))
            .collect()
    }

    #[test]
    fn explicit_rule_fires_at_limiting_extent() {
        let reg = combustion_registry();
        let result = resolve(&reg, &moles(&[("hydrogen", 4.0), ("oxygen", 1.0)]));
        // Oxygen limits: extent 1, consuming 2 H2 and 1 O2, producing 2 H2O.
        assert_eq!(result.applied.len(), 1);
        assert!((result.mixture.amount_of(&SpeciesId::new("hydrogen")) - 2.0).abs() < 1e-9);
        assert_eq!(result.mixture.amount_of(&SpeciesId::new("oxygen")), 0.0);
        assert!((result.mixture.amount_of(&SpeciesId::new("water")) - 2.0).abs() < 1e-9);
    }

    #[test]
    fn missing_reactant_means_no_fire() {
        let reg = combustion_registry();
        let initial = moles(&[("hydrogen", 4.0)]);
        let result = resolve(&reg, &initial);
        assert!(result.applied.is_empty());
        assert_eq!(result.mixture, initial);
    }

    #[test]
    fn catalyst_gates_but_is_not_consumed() {
        let mut reg = combustion_registry();
        let mut pt = MolGraph::new();
        pt.add_atom(Atom::new(Element::Pt));
        reg.add_species(SpeciesId::new("platinum"), pt).unwrap();
        reg.add_explicit_rule(crate::reaction::ExplicitRule {
            id: RuleId::new("catalyzed"),
            reactants: vec![(SpeciesId::new("water"), 1.0)],
            products: vec![(SpeciesId::new("water"), 1.0)],
            catalysts: vec![SpeciesId::new("platinum")],
            rate: RateClass::Slow,
        })
        .unwrap();

        let without = resolve(&reg, &moles(&[("water", 1.0)]));
        assert!(without.applied.iter().all(|a| a.rule.as_str() != "catalyzed"));

        let with = resolve(&reg, &moles(&[("water", 1.0), ("platinum", 0.5)]));
        assert!(with.applied.iter().any(|a| a.rule.as_str() == "catalyzed"));
        assert!((with.mixture.amount_of(&SpeciesId::new("platinum")) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn rules_apply_in_declaration_order() {
        // Explicit rules run before generic ones, each in declaration order.
        let mut reg = combustion_registry();
        reg.add_explicit_rule(crate::reaction::ExplicitRule {
            id: RuleId::new("first"),
            reactants: vec![(SpeciesId::new("water"), 1.0)],
            products: vec![(SpeciesId::new("water"), 1.0)],
            catalysts: Vec::new(),
            rate: RateClass::Moderate,
        })
        .unwrap();

        let result = resolve(&reg, &moles(&[("water", 3.0)]));
        let first = result.applied.iter().find(|a| a.rule.as_str() == "first");
        assert!(first.is_some());
        assert!((first.unwrap().consumed[0].1 - 3.0).abs() < 1e-9);
    }

    #[test]
    fn products_do_not_enable_rules_in_the_same_pass() {
        // Combustion produces the water electrolysis would need; with no
        // water in the input, electrolysis must wait for the next pass.
        let mut reg = combustion_registry();
        reg.add_explicit_rule(crate::reaction::ExplicitRule {
            id: RuleId::new("electrolysis"),
            reactants: vec![(SpeciesId::new("water"), 2.0)],
            products: vec![
                (SpeciesId::new("hydrogen"), 2.0),
                (SpeciesId::new("oxygen"), 1.0),
            ],
            catalysts: Vec::new(),
            rate: RateClass::Slow,
        })
        .unwrap();

        let result = resolve(&reg, &moles(&[("hydrogen", 2.0), ("oxygen", 1.0)]));
        let fired: Vec<_> = result.applied.iter().map(|a| a.rule.as_str()).collect();
        assert_eq!(fired, ["combustion"]);
        assert!((result.mixture.amount_of(&SpeciesId::new("water")) - 2.0).abs() < 1e-9);
        assert!(!result.mixture.contains(&SpeciesId::new("hydrogen")));
        assert!(!result.mixture.contains(&SpeciesId::new("oxygen")));

        // The next pass picks electrolysis up.
        let second = resolve(&reg, &result.mixture);
        let fired: Vec<_> = second.applied.iter().map(|a| a.rule.as_str()).collect();
        assert_eq!(fired, ["electrolysis"]);
    }

    #[test]
    fn minted_species_do_not_bind_later_generic_rules() {
        let mut reg = chlorination_registry();
        // A second generic rule over the C-Cl group chlorination mints.
        let mut q = MolGraph::new();
        let c = q.add_atom(AtomQuery::element(Element::C));
        let cl = q.add_atom(AtomQuery::element(Element::Cl));
        q.add_bond(c, cl, BondQuery::any());
        reg.add_pattern(crate::pattern::GroupPattern::new(
            PatternId::new("chloro"),
            q,
            c,
        ))
        .unwrap();
        let mut product = ProductTemplate::new();
        let pc = product.add_atom(ProductAtom::from_role(0, NodeIndex::new(0)));
        let h = product.add_atom(ProductAtom::fresh(Element::H));
        product.add_bond(pc, h, Bond::default());
        reg.add_generic_rule(crate::reaction::GenericRule {
            id: RuleId::new("dechlorinate"),
            slots: vec![PatternId::new("chloro")],
            products: vec![product],
            byproducts: Vec::new(),
            rate: RateClass::Moderate,
            multi_fire: false,
            allow_self_overlap: false,
        })
        .unwrap();

        let result = resolve(&reg, &moles(&[("methanol", 1.0)]));
        let fired: Vec<_> = result.applied.iter().map(|a| a.rule.as_str()).collect();
        assert_eq!(fired, ["chlorinate"]);
    }

    #[test]
    fn invalid_product_skips_rule_and_reports() {
        let mut reg = Registry::new();
        reg.add_species(SpeciesId::new("methanol"), methanol()).unwrap();
        reg.add_species(SpeciesId::new("water"), water()).unwrap();
        reg.add_pattern(hydroxyl_pattern()).unwrap();

        // The matched carbon keeps its three hydrogens and gains two more:
        // five bonds, not a carbon valency.
        let mut product = ProductTemplate::new();
        let c = product.add_atom(ProductAtom::from_role(0, NodeIndex::new(0)));
        for _ in 0..2 {
            let h = product.add_atom(ProductAtom::fresh(Element::H));
            product.add_bond(c, h, Bond::default());
        }
        reg.add_generic_rule(crate::reaction::GenericRule {
            id: RuleId::new("overbond"),
            slots: vec![PatternId::new("hydroxyl")],
            products: vec![product],
            byproducts: Vec::new(),
            rate: RateClass::Moderate,
            multi_fire: false,
            allow_self_overlap: false,
        })
        .unwrap();
        reg.add_explicit_rule(crate::reaction::ExplicitRule {
            id: RuleId::new("stir"),
            reactants: vec![(SpeciesId::new("water"), 1.0)],
            products: vec![(SpeciesId::new("water"), 1.0)],
            catalysts: Vec::new(),
            rate: RateClass::Moderate,
        })
        .unwrap();

        let result = resolve(&reg, &moles(&[("methanol", 1.0), ("water", 1.0)]));

        // The unrelated explicit rule still fires.
        assert!(result.applied.iter().any(|a| a.rule.as_str() == "stir"));
        // The bad rule is skipped with a diagnostic, not an abort, and its
        // reactant is left untouched.
        assert_eq!(result.diagnostics.len(), 1);
        match &result.diagnostics[0] {
            ResolveDiagnostic::RuleSkipped { rule, error } => {
                assert_eq!(rule.as_str(), "overbond");
                assert!(matches!(error, ReactionError::InvalidProduct(_)));
            }
        }
        assert!((result.mixture.amount_of(&SpeciesId::new("methanol")) - 1.0).abs() < 1e-9);
        assert!(result.new_species.is_empty());
    }

    #[test]
    fn resolution_is_deterministic() {
        let reg = combustion_registry();
        let initial = moles(&[("hydrogen", 3.0), ("oxygen", 2.0)]);
        let a = resolve(&reg, &initial);
        let b = resolve(&reg, &initial);
        assert_eq!(a.mixture, b.mixture);
        assert_eq!(a.applied, b.applied);
    }

    #[test]
    fn empty_mixture_resolves_to_empty() {
        let reg = combustion_registry();
        let result = resolve(&reg, &Mixture::new());
        assert!(result.mixture.is_empty());
        assert!(result.applied.is_empty());
        assert!(result.diagnostics.is_empty());
    }

    fn hydroxyl_pattern() -> crate::pattern::GroupPattern {
        let mut q = MolGraph::new();
        let c = q.add_atom(AtomQuery::element(Element::C));
        let o = q.add_atom(AtomQuery::element(Element::O));
        let h = q.add_atom(AtomQuery::element(Element::H));
        q.add_bond(c, o, BondQuery::order(BondOrder::Single));
        q.add_bond(o, h, BondQuery::order(BondOrder::Single));
        crate::pattern::GroupPattern::new(PatternId::new("hydroxyl"), q, c)
    }

    fn methanol() -> MolGraph<Atom, Bond> {
        let mut g = MolGraph::new();
        let c = g.add_atom(Atom::new(Element::C));
        let o = g.add_atom(Atom::new(Element::O));
        g.add_bond(c, o, Bond::default());
        let h = g.add_atom(Atom::new(Element::H));
        g.add_bond(o, h, Bond::default());
        for _ in 0..3 {
            let h = g.add_atom(Atom::new(Element::H));
            g.add_bond(c, h, Bond::default());
        }
        g
    }

    /// Swap the hydroxyl for a chloride: CH3OH -> CH3Cl, byproduct water.
    fn chlorination_registry() -> Registry {
        let mut reg = Registry::new();
        reg.add_species(SpeciesId::new("methanol"), methanol()).unwrap();
        reg.add_species(SpeciesId::new("water"), water()).unwrap();
        reg.add_pattern(hydroxyl_pattern()).unwrap();

        let mut product = ProductTemplate::new();
        let c = product.add_atom(ProductAtom::from_role(0, NodeIndex::new(0)));
        let cl = product.add_atom(ProductAtom::fresh(Element::Cl));
        product.add_bond(c, cl, Bond::default());

        reg.add_generic_rule(crate::reaction::GenericRule {
            id: RuleId::new("chlorinate"),
            slots: vec![PatternId::new("hydroxyl")],
            products: vec![product],
            byproducts: vec![(SpeciesId::new("water"), 1.0)],
            rate: RateClass::Moderate,
            multi_fire: false,
            allow_self_overlap: false,
        })
        .unwrap();
        reg
    }

    #[test]
    fn generic_rule_mints_product_species() {
        let reg = chlorination_registry();
        let result = resolve(&reg, &moles(&[("methanol", 2.0)]));

        assert_eq!(result.applied.len(), 1);
        assert_eq!(result.new_species.len(), 1);
        let minted = &result.new_species[0];
        assert_eq!(minted.formula_string(), "CH3Cl");

        // All 2 moles converted in one firing; water byproduct alongside.
        assert_eq!(result.mixture.amount_of(&SpeciesId::new("methanol")), 0.0);
        assert!((result.mixture.amount_of(minted.id()) - 2.0).abs() < 1e-9);
        assert!((result.mixture.amount_of(&SpeciesId::new("water")) - 2.0).abs() < 1e-9);
    }

    #[test]
    fn declared_product_is_reunified_by_structure() {
        let mut reg = chlorination_registry();
        let mut g = MolGraph::new();
        let c = g.add_atom(Atom::new(Element::C));
        let cl = g.add_atom(Atom::new(Element::Cl));
        g.add_bond(c, cl, Bond::default());
        for _ in 0..3 {
            let h = g.add_atom(Atom::new(Element::H));
            g.add_bond(c, h, Bond::default());
        }
        reg.add_species(SpeciesId::new("chloromethane"), g).unwrap();

        let result = resolve(&reg, &moles(&[("methanol", 1.0)]));
        assert!(result.new_species.is_empty());
        assert!(
            (result.mixture.amount_of(&SpeciesId::new("chloromethane")) - 1.0).abs() < 1e-9
        );
    }

    #[test]
    fn single_fire_consumes_whole_quantity_once() {
        // Glycol has two hydroxyls; without multi_fire only the first
        // deterministic binding fires.
        let mut reg = chlorination_registry();
        let mut g = MolGraph::new();
        let c1 = g.add_atom(Atom::new(Element::C));
        let c2 = g.add_atom(Atom::new(Element::C));
        let o1 = g.add_atom(Atom::new(Element::O));
        let o2 = g.add_atom(Atom::new(Element::O));
        g.add_bond(c1, c2, Bond::default());
        g.add_bond(c1, o1, Bond::default());
        g.add_bond(c2, o2, Bond::default());
        for o in [o1, o2] {
            let h = g.add_atom(Atom::new(Element::H));
            g.add_bond(o, h, Bond::default());
        }
        for c in [c1, c2] {
            for _ in 0..2 {
                let h = g.add_atom(Atom::new(Element::H));
                g.add_bond(c, h, Bond::default());
            }
        }
        reg.add_species(SpeciesId::new("glycol"), g).unwrap();

        let result = resolve(&reg, &moles(&[("glycol", 1.0)]));
        let fired: Vec<_> = result
            .applied
            .iter()
            .filter(|a| a.rule.as_str() == "chlorinate")
            .collect();
        assert_eq!(fired.len(), 1);
    }

    #[test]
    fn mixture_accumulates_and_prunes() {
        let mut mixture = Mixture::new();
        mixture.add(SpeciesId::new("a"), 1.0);
        mixture.add(SpeciesId::new("a"), 0.5);
        assert!((mixture.amount_of(&SpeciesId::new("a")) - 1.5).abs() < 1e-12);
        assert!((mixture.total_moles() - 1.5).abs() < 1e-12);

        mixture.remove(&SpeciesId::new("a"), 1.5);
        assert!(!mixture.contains(&SpeciesId::new("a")));
        assert!(mixture.is_empty());
        assert_eq!(mixture.total_moles(), 0.0);

        mixture.add(SpeciesId::new("b"), -3.0);
        assert!(mixture.is_empty());
    }
}
