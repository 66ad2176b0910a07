use std::collections::{HashMap, HashSet, VecDeque};

use petgraph::graph::NodeIndex;

use crate::atom::Atom;
use crate::bond::Bond;
use crate::graph::MolGraph;
use crate::pattern::GroupPattern;

use super::error::ReactionError;
use super::{GenericBinding, GenericRule, ProductTemplate};

/// Build the product graphs for one firing of a generic rule.
///
/// `patterns` holds the resolved pattern of each reactant slot, in slot
/// order; `binding` assigns one occurrence per slot. Construction is a
/// graph rewrite: role-bearing template atoms pull the matched reactant
/// atom, template bonds are installed, substituents the pattern did not
/// cover are carried over from each reactant, and reactant-internal bonds
/// between two mapped atoms that appear in neither the pattern nor the
/// product template are preserved.
///
/// The returned graphs are unvalidated fragments; callers construct
/// [`Species`](crate::Species) from them and treat a validation failure as
/// a refusal to fire.
pub fn build_products(
    rule: &GenericRule,
    patterns: &[&GroupPattern],
    binding: &GenericBinding,
) -> Result<Vec<MolGraph<Atom, Bond>>, ReactionError> {
    check_roles(rule, patterns)?;

    let matched_atoms: Vec<HashSet<NodeIndex>> = binding
        .iter()
        .map(|b| b.occurrence.mapping.iter().copied().collect())
        .collect();

    let species_to_role: Vec<HashMap<NodeIndex, NodeIndex>> = binding
        .iter()
        .map(|b| {
            b.occurrence
                .mapping
                .iter()
                .enumerate()
                .map(|(role, &atom)| (atom, NodeIndex::new(role)))
                .collect()
        })
        .collect();

    let pattern_bonds: Vec<HashSet<(usize, usize)>> = patterns
        .iter()
        .map(|p| {
            p.graph()
                .bonds()
                .filter_map(|e| p.graph().bond_endpoints(e))
                .map(|(a, b)| ordered(a.index(), b.index()))
                .collect()
        })
        .collect();

    let product_role_pairs = collect_product_role_pairs(&rule.products);

    rule.products
        .iter()
        .enumerate()
        .map(|(template_idx, template)| {
            build_single_product(
                template_idx,
                template,
                binding,
                &matched_atoms,
                &species_to_role,
                &pattern_bonds,
                &product_role_pairs,
            )
        })
        .collect()
}

fn check_roles(rule: &GenericRule, patterns: &[&GroupPattern]) -> Result<(), ReactionError> {
    for template in &rule.products {
        for idx in template.atoms() {
            if let Some(role_ref) = template.atom(idx).role {
                let valid = role_ref.slot < patterns.len()
                    && role_ref.role.index() < patterns[role_ref.slot].role_count();
                if !valid {
                    return Err(ReactionError::UnknownRole {
                        slot: role_ref.slot,
                        role: role_ref.role.index(),
                    });
                }
            }
        }
    }
    Ok(())
}

fn ordered(a: usize, b: usize) -> (usize, usize) {
    (a.min(b), a.max(b))
}

type RoleKey = (usize, usize);

fn role_pair(a: RoleKey, b: RoleKey) -> (RoleKey, RoleKey) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

/// Bonds between two role-bearing atoms anywhere in the product templates.
fn collect_product_role_pairs(templates: &[ProductTemplate]) -> HashSet<(RoleKey, RoleKey)> {
    let mut pairs = HashSet::new();
    for template in templates {
        for edge in template.bonds() {
            if let Some((a, b)) = template.bond_endpoints(edge) {
                if let (Some(ra), Some(rb)) = (template.atom(a).role, template.atom(b).role) {
                    pairs.insert(role_pair(
                        (ra.slot, ra.role.index()),
                        (rb.slot, rb.role.index()),
                    ));
                }
            }
        }
    }
    pairs
}

fn build_single_product(
    template_idx: usize,
    template: &ProductTemplate,
    binding: &GenericBinding,
    matched_atoms: &[HashSet<NodeIndex>],
    species_to_role: &[HashMap<NodeIndex, NodeIndex>],
    pattern_bonds: &[HashSet<(usize, usize)>],
    product_role_pairs: &HashSet<(RoleKey, RoleKey)>,
) -> Result<MolGraph<Atom, Bond>, ReactionError> {
    let mut product: MolGraph<Atom, Bond> = MolGraph::new();

    let mut template_to_product: HashMap<NodeIndex, NodeIndex> = HashMap::new();
    let mut role_to_product: HashMap<RoleKey, NodeIndex> = HashMap::new();
    let mut carried: HashMap<(usize, NodeIndex), NodeIndex> = HashMap::new();

    for (tmpl_pos, t_idx) in template.atoms().enumerate() {
        let p_atom = template.atom(t_idx);
        let atom = match (p_atom.role, p_atom.element) {
            (Some(role_ref), element) => {
                let slot = &binding[role_ref.slot];
                let species_atom = slot.occurrence.atom_for(role_ref.role);
                let inherited = *slot.species.graph().atom(species_atom);
                match element {
                    Some(e) => Atom::new(e),
                    None => inherited,
                }
            }
            (None, Some(e)) => Atom::new(e),
            (None, None) => {
                return Err(ReactionError::MissingProductElement {
                    template: template_idx,
                    atom: tmpl_pos,
                })
            }
        };
        let new_idx = product.add_atom(atom);
        template_to_product.insert(t_idx, new_idx);
        if let Some(role_ref) = p_atom.role {
            role_to_product.insert((role_ref.slot, role_ref.role.index()), new_idx);
        }
    }

    for edge in template.bonds() {
        if let Some((a, b)) = template.bond_endpoints(edge) {
            product.add_bond(
                template_to_product[&a],
                template_to_product[&b],
                *template.bond(edge),
            );
        }
    }

    for t_idx in template.atoms() {
        let role_ref = match template.atom(t_idx).role {
            Some(r) => r,
            None => continue,
        };
        let slot_idx = role_ref.slot;
        let slot = &binding[slot_idx];
        let species_graph = slot.species.graph();
        let species_atom = slot.occurrence.atom_for(role_ref.role);
        let product_node = template_to_product[&t_idx];
        let matched = &matched_atoms[slot_idx];

        for neighbor in species_graph.neighbors(species_atom) {
            if matched.contains(&neighbor) {
                if let Some(&n_role) = species_to_role[slot_idx].get(&neighbor) {
                    let in_pattern = pattern_bonds[slot_idx]
                        .contains(&ordered(role_ref.role.index(), n_role.index()));
                    let key = role_pair(
                        (slot_idx, role_ref.role.index()),
                        (slot_idx, n_role.index()),
                    );
                    let in_product = product_role_pairs.contains(&key);

                    // Pattern bond absent from the product template: the
                    // rule broke it.
                    if in_pattern && !in_product {
                        continue;
                    }
                    if !in_pattern && !in_product {
                        if let Some(&neighbor_product) =
                            role_to_product.get(&(slot_idx, n_role.index()))
                        {
                            if product.bond_between(product_node, neighbor_product).is_none() {
                                if let Some(edge) =
                                    species_graph.bond_between(species_atom, neighbor)
                                {
                                    product.add_bond(
                                        product_node,
                                        neighbor_product,
                                        *species_graph.bond(edge),
                                    );
                                }
                            }
                        }
                    }
                }
                continue;
            }

            carry_substituents(
                &mut product,
                species_graph,
                matched,
                species_atom,
                neighbor,
                product_node,
                &mut carried,
                slot_idx,
            );
        }
    }

    Ok(product)
}

/// Clone the substituent subtree hanging off `start_neighbor` into the
/// product, breadth-first, stopping at pattern-matched atoms.
#[allow(clippy::too_many_arguments)]
fn carry_substituents(
    product: &mut MolGraph<Atom, Bond>,
    species_graph: &MolGraph<Atom, Bond>,
    matched: &HashSet<NodeIndex>,
    anchor: NodeIndex,
    start_neighbor: NodeIndex,
    product_anchor: NodeIndex,
    carried: &mut HashMap<(usize, NodeIndex), NodeIndex>,
    slot_idx: usize,
) {
    let key = (slot_idx, start_neighbor);
    if let Some(&existing) = carried.get(&key) {
        if product.bond_between(product_anchor, existing).is_none() {
            if let Some(edge) = species_graph.bond_between(anchor, start_neighbor) {
                product.add_bond(product_anchor, existing, *species_graph.bond(edge));
            }
        }
        return;
    }

    let new_node = product.add_atom(*species_graph.atom(start_neighbor));
    carried.insert(key, new_node);
    if let Some(edge) = species_graph.bond_between(anchor, start_neighbor) {
        product.add_bond(product_anchor, new_node, *species_graph.bond(edge));
    }

    let mut queue = VecDeque::new();
    queue.push_back((start_neighbor, new_node));

    while let Some((r_node, p_node)) = queue.pop_front() {
        for nb in species_graph.neighbors(r_node) {
            if matched.contains(&nb) {
                continue;
            }
            let nb_key = (slot_idx, nb);
            if let Some(&existing) = carried.get(&nb_key) {
                if product.bond_between(p_node, existing).is_none() {
                    if let Some(edge) = species_graph.bond_between(r_node, nb) {
                        product.add_bond(p_node, existing, *species_graph.bond(edge));
                    }
                }
                continue;
            }

            let nb_product = product.add_atom(*species_graph.atom(nb));
            carried.insert(nb_key, nb_product);
            if let Some(edge) = species_graph.bond_between(r_node, nb) {
                product.add_bond(p_node, nb_product, *species_graph.bond(edge));
            }
            queue.push_back((nb, nb_product));
        }
    }
}
