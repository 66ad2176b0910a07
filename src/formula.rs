//! Empirical formula and molar mass, computed over a concrete molecular
//! graph.
//!
//! Formula ordering is the fixed element precedence (`R`, then `C`, then
//! `H`, then the remaining table order) — a display and grouping contract
//! that must be stable across runs, not the Hill convention.

use std::collections::BTreeMap;
use std::fmt::Write;

use crate::atom::Atom;
use crate::bond::Bond;
use crate::element::Element;
use crate::graph::MolGraph;

/// Count atoms per element, ordered by the fixed element precedence.
pub fn empirical_formula(graph: &MolGraph<Atom, Bond>) -> Vec<(Element, u32)> {
    // Element's Ord is its declaration order, which is the precedence order.
    let mut counts: BTreeMap<Element, u32> = BTreeMap::new();
    for idx in graph.atoms() {
        *counts.entry(graph.atom(idx).element).or_default() += 1;
    }
    counts.into_iter().collect()
}

/// Render a formula as `C2H6O`-style text.
pub fn format_formula(formula: &[(Element, u32)]) -> String {
    let mut out = String::new();
    for &(element, count) in formula {
        out.push_str(element.symbol());
        if count > 1 {
            write!(out, "{count}").unwrap();
        }
    }
    out
}

/// Sum of atomic masses, exactly as declared.
pub fn molar_mass(graph: &MolGraph<Atom, Bond>) -> f64 {
    graph
        .atoms()
        .fold(0.0, |acc, idx| acc + graph.atom(idx).element.mass())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bond::BondOrder;

    fn methane() -> MolGraph<Atom, Bond> {
        let mut g = MolGraph::new();
        let c = g.add_atom(Atom::new(Element::C));
        for _ in 0..4 {
            let h = g.add_atom(Atom::new(Element::H));
            g.add_bond(c, h, Bond::new(BondOrder::Single));
        }
        g
    }

    #[test]
    fn methane_formula() {
        let f = empirical_formula(&methane());
        assert_eq!(f, vec![(Element::C, 1), (Element::H, 4)]);
        assert_eq!(format_formula(&f), "CH4");
    }

    #[test]
    fn methane_mass() {
        let m = molar_mass(&methane());
        assert!((m - 16.05).abs() < 1e-9);
    }

    #[test]
    fn formula_is_deterministic() {
        let g = methane();
        assert_eq!(empirical_formula(&g), empirical_formula(&g));
    }

    #[test]
    fn precedence_beats_insertion_order() {
        // Declare hydrogen first; carbon must still lead the formula.
        let mut g = MolGraph::new();
        let h = g.add_atom(Atom::new(Element::H));
        let c = g.add_atom(Atom::new(Element::C));
        g.add_bond(c, h, Bond::default());
        for _ in 0..3 {
            let hx = g.add_atom(Atom::new(Element::H));
            g.add_bond(c, hx, Bond::default());
        }
        let f = empirical_formula(&g);
        assert_eq!(f[0].0, Element::C);
        assert_eq!(f[1].0, Element::H);
    }

    #[test]
    fn water_formula_not_hill() {
        let mut g = MolGraph::new();
        let o = g.add_atom(Atom::new(Element::O));
        for _ in 0..2 {
            let h = g.add_atom(Atom::new(Element::H));
            g.add_bond(o, h, Bond::default());
        }
        // Precedence puts H before O (H is third in the table, O later).
        assert_eq!(format_formula(&empirical_formula(&g)), "H2O");
    }

    #[test]
    fn placeholder_leads() {
        let mut g = MolGraph::new();
        let c = g.add_atom(Atom::new(Element::C));
        let r = g.add_atom(Atom::new(Element::R));
        g.add_bond(c, r, Bond::default());
        for _ in 0..3 {
            let h = g.add_atom(Atom::new(Element::H));
            g.add_bond(c, h, Bond::default());
        }
        assert_eq!(format_formula(&empirical_formula(&g)), "RCH3");
    }

    #[test]
    fn empty_graph() {
        let g = MolGraph::new();
        assert!(empirical_formula(&g).is_empty());
        assert_eq!(molar_mass(&g), 0.0);
    }
}
