//! Functional group finder: bounded backtracking subgraph search.
//!
//! For each pattern the most restrictive role is tried first, species
//! atoms are enumerated in canonical (index) order, and each tentative
//! role assignment is checked against the bonds of already-mapped
//! neighbor roles, backtracking on violation. Patterns and species are
//! small (tens of atoms), so the exponential worst case is acceptable.

use petgraph::graph::NodeIndex;

use crate::atom::Atom;
use crate::bond::Bond;
use crate::element::Element;
use crate::graph::MolGraph;
use crate::pattern::{AtomQuery, BondQuery, GroupOccurrence, GroupPattern};
use crate::species::Species;

/// Every occurrence of `pattern` within `species`, ordered by the anchor's
/// species atom index (full mapping as tie-break). Symmetric duplicates
/// are returned as distinct occurrences; deduplication is a caller
/// concern.
pub fn find_pattern(species: &Species, pattern: &GroupPattern) -> Vec<GroupOccurrence> {
    let mut search = PatternSearch::new(species.graph(), pattern.graph());
    let mut occurrences: Vec<GroupOccurrence> = search
        .find_all()
        .into_iter()
        .map(|mapping| GroupOccurrence {
            pattern: pattern.id().clone(),
            mapping,
        })
        .collect();
    let anchor = pattern.anchor();
    occurrences.sort_by(|a, b| {
        a.atom_for(anchor)
            .index()
            .cmp(&b.atom_for(anchor).index())
            .then_with(|| a.mapping.cmp(&b.mapping))
    });
    occurrences
}

/// Occurrences of every pattern in `patterns`, patterns in the given
/// (registration) order. Deterministic and idempotent for an unchanged
/// species.
pub fn find_all<'a>(
    species: &Species,
    patterns: impl IntoIterator<Item = &'a GroupPattern>,
) -> Vec<GroupOccurrence> {
    patterns
        .into_iter()
        .flat_map(|p| find_pattern(species, p))
        .collect()
}

fn atom_matches(target: &Atom, degree: usize, query: &AtomQuery) -> bool {
    if let Some(element) = query.element {
        // R matches any element, mirroring its role as a generic
        // substituent placeholder.
        if element != Element::R && target.element != element {
            return false;
        }
    }
    if let Some(d) = query.degree {
        if degree != d as usize {
            return false;
        }
    }
    true
}

fn bond_matches(target: &Bond, query: &BondQuery) -> bool {
    match query.order {
        Some(order) => target.order == order,
        None => true,
    }
}

struct PatternSearch<'a> {
    target: &'a MolGraph<Atom, Bond>,
    query: &'a MolGraph<AtomQuery, BondQuery>,
    query_order: Vec<NodeIndex>,
    query_map: Vec<Option<NodeIndex>>,
    target_used: Vec<bool>,
}

impl<'a> PatternSearch<'a> {
    fn new(target: &'a MolGraph<Atom, Bond>, query: &'a MolGraph<AtomQuery, BondQuery>) -> Self {
        let mut query_order: Vec<NodeIndex> = query.atoms().collect();
        // Most restrictive role first, then highest degree, then index for
        // a stable order.
        query_order.sort_by(|&a, &b| {
            query
                .atom(b)
                .restrictiveness()
                .cmp(&query.atom(a).restrictiveness())
                .then_with(|| query.degree(b).cmp(&query.degree(a)))
                .then_with(|| a.index().cmp(&b.index()))
        });
        Self {
            target,
            query,
            query_order,
            query_map: vec![None; query.atom_count()],
            target_used: vec![false; target.atom_count()],
        }
    }

    fn find_all(&mut self) -> Vec<Vec<NodeIndex>> {
        let mut results = Vec::new();
        self.recurse(0, &mut results);
        results
    }

    fn recurse(&mut self, depth: usize, results: &mut Vec<Vec<NodeIndex>>) {
        if depth == self.query_order.len() {
            let mapping = self
                .query_map
                .iter()
                .map(|m| m.expect("complete mapping at full depth"))
                .collect();
            results.push(mapping);
            return;
        }

        let query_node = self.query_order[depth];

        for t_idx in 0..self.target_used.len() {
            if self.target_used[t_idx] {
                continue;
            }

            let target_node = NodeIndex::new(t_idx);

            if !self.is_feasible(query_node, target_node) {
                continue;
            }

            self.query_map[query_node.index()] = Some(target_node);
            self.target_used[t_idx] = true;

            self.recurse(depth + 1, results);

            self.query_map[query_node.index()] = None;
            self.target_used[t_idx] = false;
        }
    }

    fn is_feasible(&self, query_node: NodeIndex, target_node: NodeIndex) -> bool {
        let degree = self.target.degree(target_node);
        if !atom_matches(self.target.atom(target_node), degree, self.query.atom(query_node)) {
            return false;
        }
        // A role can never demand more neighbors than the atom has.
        if self.query.degree(query_node) > degree {
            return false;
        }

        for q_neighbor in self.query.neighbors(query_node) {
            if let Some(t_mapped) = self.query_map[q_neighbor.index()] {
                let q_bond = self
                    .query
                    .bond_between(query_node, q_neighbor)
                    .expect("bond must exist between neighbors");
                match self.target.bond_between(target_node, t_mapped) {
                    Some(t_bond) => {
                        if !bond_matches(self.target.bond(t_bond), self.query.bond(q_bond)) {
                            return false;
                        }
                    }
                    None => return false,
                }
            }
        }

        true
    }
}
