//! End-to-end: a JSON rule set loaded into a registry and resolved.

use std::sync::Arc;

use retort::{resolve, Declarations, Mixture, Registry, Species, SpeciesId};

fn registry() -> Registry {
    let decls: Declarations = serde_json::from_str(
        r#"{
            "topologies": [
                {"shape": "ring", "name": "aromatic6", "length": 6, "order": "aromatic"}
            ],
            "species": [
                {"id": "hydrogen", "atoms": ["H", "H"],
                 "bonds": [{"a": 0, "b": 1}]},
                {"id": "oxygen", "atoms": ["O", "O"],
                 "bonds": [{"a": 0, "b": 1, "order": "double"}]},
                {"id": "water", "atoms": ["O", "H", "H"],
                 "bonds": [{"a": 0, "b": 1}, {"a": 0, "b": 2}]},
                {"id": "platinum", "atoms": ["Pt"]},
                {"id": "methanol",
                 "atoms": ["C", "O", "H", "H", "H", "H"],
                 "bonds": [{"a": 0, "b": 1}, {"a": 1, "b": 2},
                           {"a": 0, "b": 3}, {"a": 0, "b": 4}, {"a": 0, "b": 5}]},
                {"id": "glycol",
                 "atoms": ["C", "C", "O", "O", "H", "H", "H", "H", "H", "H"],
                 "bonds": [{"a": 0, "b": 1}, {"a": 0, "b": 2}, {"a": 1, "b": 3},
                           {"a": 2, "b": 4}, {"a": 3, "b": 5},
                           {"a": 0, "b": 6}, {"a": 0, "b": 7},
                           {"a": 1, "b": 8}, {"a": 1, "b": 9}]},
                {"id": "benzene",
                 "topology": {"name": "aromatic6", "bind": ["C","C","C","C","C","C"]},
                 "atoms": ["H", "H", "H", "H", "H", "H"],
                 "bonds": [{"a": 0, "b": 6}, {"a": 1, "b": 7}, {"a": 2, "b": 8},
                           {"a": 3, "b": 9}, {"a": 4, "b": 10}, {"a": 5, "b": 11}]}
            ],
            "patterns": [
                {"id": "hydroxyl",
                 "roles": [{"element": "C"}, {"element": "O"}, {"element": "H"}],
                 "bonds": [{"a": 0, "b": 1, "order": "single"},
                           {"a": 1, "b": 2, "order": "single"}],
                 "anchor": 0}
            ],
            "rules": [
                {"kind": "explicit", "id": "combustion", "rate": "fast",
                 "reactants": [{"species": "hydrogen", "coeff": 2},
                               {"species": "oxygen", "coeff": 1}],
                 "products": [{"species": "water", "coeff": 2}],
                 "catalysts": ["platinum"]},
                {"kind": "generic", "id": "chlorinate",
                 "slots": ["hydroxyl"],
                 "products": [{
                    "atoms": [{"role": [0, 0]}, {"element": "Cl"}],
                    "bonds": [{"a": 0, "b": 1}]
                 }],
                 "byproducts": [{"species": "water"}]}
            ]
        }"#,
    )
    .unwrap();
    decls.build().unwrap()
}

fn moles(pairs: &[(&str, f64)]) -> Mixture {
    pairs
        .iter()
        .map(|&(id, n)| (SpeciesId::new(id), n))
        .collect()
}

fn total_mass(registry: &Registry, mixture: &Mixture, minted: &[Arc<Species>]) -> f64 {
    mixture.total_mass(registry.species().iter().chain(minted))
}

#[test]
fn inert_mixture_is_unchanged() {
    let registry = registry();
    // No catalyst: combustion cannot fire; nothing has a hydroxyl.
    let initial = moles(&[("hydrogen", 2.0), ("oxygen", 1.0), ("benzene", 1.0)]);
    let result = resolve(&registry, &initial);
    assert!(result.applied.is_empty());
    assert_eq!(result.mixture, initial);
}

#[test]
fn catalyzed_combustion() {
    let registry = registry();
    let initial = moles(&[("hydrogen", 2.0), ("oxygen", 2.0), ("platinum", 0.1)]);
    let result = resolve(&registry, &initial);

    assert_eq!(result.applied.len(), 1);
    // Hydrogen limits at extent 1.
    assert!(!result.mixture.contains(&SpeciesId::new("hydrogen")));
    assert!((result.mixture.amount_of(&SpeciesId::new("oxygen")) - 1.0).abs() < 1e-9);
    assert!((result.mixture.amount_of(&SpeciesId::new("water")) - 2.0).abs() < 1e-9);
    assert!((result.mixture.amount_of(&SpeciesId::new("platinum")) - 0.1).abs() < 1e-9);
}

#[test]
fn mass_is_conserved_by_balanced_rules() {
    let registry = registry();
    let initial = moles(&[("hydrogen", 3.0), ("oxygen", 1.0), ("platinum", 0.1)]);
    let before = total_mass(&registry, &initial, &[]);
    let result = resolve(&registry, &initial);
    assert!(!result.applied.is_empty());
    let after = total_mass(&registry, &result.mixture, &result.new_species);
    assert!((before - after).abs() < 1e-6, "mass drifted: {before} -> {after}");
}

#[test]
fn generic_product_is_minted_with_stable_formula() {
    let registry = registry();
    let result = resolve(&registry, &moles(&[("methanol", 1.0)]));
    assert_eq!(result.new_species.len(), 1);
    assert_eq!(result.new_species[0].formula_string(), "CH3Cl");
    assert!((result.mixture.amount_of(&SpeciesId::new("water")) - 1.0).abs() < 1e-9);
}

#[test]
fn single_fire_on_multi_occurrence_species() {
    let registry = registry();
    // Glycol carries two hydroxyls; the rule is not multi-fire, so exactly
    // one firing happens.
    let result = resolve(&registry, &moles(&[("glycol", 1.0)]));
    let fired = result
        .applied
        .iter()
        .filter(|a| a.rule.as_str() == "chlorinate")
        .count();
    assert_eq!(fired, 1);
}

#[test]
fn resolution_is_reproducible() {
    let registry = registry();
    let initial = moles(&[
        ("hydrogen", 2.0),
        ("oxygen", 1.0),
        ("platinum", 0.1),
        ("methanol", 1.0),
        ("glycol", 1.0),
    ]);
    let a = resolve(&registry, &initial);
    let b = resolve(&registry, &initial);
    assert_eq!(a.mixture, b.mixture);
    assert_eq!(a.applied, b.applied);
    let ids_a: Vec<_> = a.new_species.iter().map(|s| s.id().clone()).collect();
    let ids_b: Vec<_> = b.new_species.iter().map(|s| s.id().clone()).collect();
    assert_eq!(ids_a, ids_b);
}
