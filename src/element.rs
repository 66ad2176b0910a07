/// Tolerance for comparing valencies. Fractional valencies (delocalized
/// bonding contributes 1.5 per bond) make exact equality useless.
pub const VALENCY_EPSILON: f64 = 1e-6;

/// Preferred spatial arrangement of an atom's bonds, used by presentation
/// layers. Selected from the bond count, with per-element overrides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Geometry {
    Linear,
    Bent,
    TrigonalPlanar,
    TrigonalPyramidal,
    Tetrahedral,
    Octahedral,
}

/// The fixed table of chemical elements known to the engine.
///
/// Variants are declared in empirical-formula precedence order: the generic
/// substituent placeholder `R` first, then carbon, then hydrogen, then the
/// remaining elements in a fixed order. [`Species::formula`](crate::Species::formula)
/// relies on this declaration order, so it must not be rearranged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Element {
    /// Generic substituent placeholder used by group patterns.
    R,
    C,
    H,
    S,
    N,
    O,
    B,
    F,
    Na,
    Cl,
    K,
    Ca,
    Cr,
    Fe,
    Ni,
    Cu,
    Zn,
    Zr,
    I,
    Pt,
    Au,
    Hg,
    Pb,
    Ar,
}

use Element::*;

/// All elements, in formula precedence order.
pub const ALL_ELEMENTS: [Element; 24] = [
    R, C, H, S, N, O, B, F, Na, Cl, K, Ca, Cr, Fe, Ni, Cu, Zn, Zr, I, Pt, Au, Hg, Pb, Ar,
];

impl Element {
    pub fn from_symbol(symbol: &str) -> Option<Element> {
        ALL_ELEMENTS.iter().copied().find(|e| e.symbol() == symbol)
    }

    pub fn symbol(self) -> &'static str {
        match self {
            R => "R",
            C => "C",
            H => "H",
            S => "S",
            N => "N",
            O => "O",
            B => "B",
            F => "F",
            Na => "Na",
            Cl => "Cl",
            K => "K",
            Ca => "Ca",
            Cr => "Cr",
            Fe => "Fe",
            Ni => "Ni",
            Cu => "Cu",
            Zn => "Zn",
            Zr => "Zr",
            I => "I",
            Pt => "Pt",
            Au => "Au",
            Hg => "Hg",
            Pb => "Pb",
            Ar => "Ar",
        }
    }

    /// Relative atomic mass. The placeholder `R` is given a negligible
    /// nonzero mass so formulae containing it still sum sensibly.
    pub fn mass(self) -> f64 {
        match self {
            R => 0.0001,
            C => 12.01,
            H => 1.01,
            S => 32.07,
            N => 14.01,
            O => 16.00,
            B => 10.81,
            F => 19.00,
            Na => 23.00,
            Cl => 35.45,
            K => 39.10,
            Ca => 40.08,
            Cr => 52.00,
            Fe => 55.85,
            Ni => 58.69,
            Cu => 63.55,
            Zn => 65.38,
            Zr => 91.22,
            I => 126.90,
            Pt => 195.08,
            Au => 196.97,
            Hg => 200.59,
            Pb => 207.20,
            Ar => 39.95,
        }
    }

    pub fn electronegativity(self) -> f64 {
        match self {
            R => 2.5,
            C => 2.5,
            H => 2.1,
            S => 2.5,
            N => 3.0,
            O => 3.5,
            B => 2.04,
            F => 4.0,
            Na => 0.9,
            Cl => 3.0,
            K => 0.8,
            Ca => 1.0,
            Cr => 1.66,
            Fe => 1.8,
            Ni => 1.8,
            Cu => 1.9,
            Zn => 1.6,
            Zr => 1.4,
            I => 2.7,
            Pt => 2.2,
            Au => 2.4,
            Hg => 1.9,
            Pb => 1.8,
            Ar => 0.0,
        }
    }

    /// Permitted valencies, in declared order. Never empty. Oxygen's 1.5
    /// covers delocalized bonding (two aromatic bonds).
    pub fn valencies(self) -> &'static [f64] {
        match self {
            R => &[1.0, 2.0, 3.0],
            C => &[4.0],
            H => &[1.0],
            S => &[2.0, 0.0, 4.0, 6.0],
            N => &[3.0, 4.0],
            O => &[0.0, 1.5, 2.0],
            B => &[3.0],
            F => &[1.0],
            Na => &[1.0],
            Cl => &[1.0],
            K => &[1.0],
            Ca => &[2.0],
            Cr => &[2.0, 3.0, 6.0],
            Fe => &[0.0, 2.0, 3.0],
            Ni => &[1.0],
            Cu => &[1.0, 2.0],
            Zn => &[1.0],
            Zr => &[1.0],
            I => &[1.0],
            Pt => &[1.0],
            Au => &[0.0, 4.0],
            Hg => &[2.0],
            Pb => &[2.0, 4.0],
            Ar => &[0.0],
        }
    }

    /// Whether `valency` is within [`VALENCY_EPSILON`] of a permitted valency.
    pub fn is_valid_valency(self, valency: f64) -> bool {
        self.valencies()
            .iter()
            .any(|&v| (v - valency).abs() < VALENCY_EPSILON)
    }

    /// The first declared valency that is at least `valency`, or `0.0` if
    /// no permitted valency is that large.
    pub fn next_valency_at_least(self, valency: f64) -> f64 {
        self.valencies()
            .iter()
            .copied()
            .find(|&v| v >= valency)
            .unwrap_or(0.0)
    }

    pub fn max_valency(self) -> f64 {
        self.valencies().iter().copied().fold(0.0, f64::max)
    }

    /// Preferred geometry for an atom of this element with `bond_count`
    /// bonded neighbors. Per-element overrides win; otherwise a fixed
    /// default table applies, intentionally coarse above 4 bonds.
    pub fn geometry(self, bond_count: usize) -> Geometry {
        if let Some(g) = self.geometry_override(bond_count) {
            return g;
        }
        match bond_count {
            0..=2 => Geometry::Linear,
            3 => Geometry::TrigonalPlanar,
            4 => Geometry::Tetrahedral,
            _ => Geometry::Octahedral,
        }
    }

    fn geometry_override(self, bond_count: usize) -> Option<Geometry> {
        match (self, bond_count) {
            (N, 3) => Some(Geometry::TrigonalPyramidal),
            (O, 2) => Some(Geometry::Bent),
            _ => None,
        }
    }
}

impl std::fmt::Display for Element {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.symbol())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbol_round_trip() {
        for e in ALL_ELEMENTS {
            assert_eq!(Element::from_symbol(e.symbol()), Some(e));
        }
    }

    #[test]
    fn unknown_symbol() {
        assert_eq!(Element::from_symbol("Xx"), None);
        assert_eq!(Element::from_symbol(""), None);
        assert_eq!(Element::from_symbol("c"), None);
    }

    #[test]
    fn valency_sets_never_empty() {
        for e in ALL_ELEMENTS {
            assert!(!e.valencies().is_empty(), "{e} has no valencies");
        }
    }

    #[test]
    fn carbon_valency() {
        assert!(Element::C.is_valid_valency(4.0));
        assert!(!Element::C.is_valid_valency(3.0));
        assert!(!Element::C.is_valid_valency(5.0));
    }

    #[test]
    fn fractional_valency_within_tolerance() {
        assert!(Element::O.is_valid_valency(1.5));
        assert!(Element::O.is_valid_valency(1.5 + 1e-7));
        assert!(Element::O.is_valid_valency(1.5 - 1e-7));
        assert!(!Element::O.is_valid_valency(1.5 + 1e-5));
    }

    #[test]
    fn next_valency_at_least_picks_first_declared() {
        // Sulfur declares 2, 0, 4, 6: the first >= 3 is 4.
        assert_eq!(Element::S.next_valency_at_least(3.0), 4.0);
        assert_eq!(Element::S.next_valency_at_least(1.0), 2.0);
        assert_eq!(Element::S.next_valency_at_least(7.0), 0.0);
    }

    #[test]
    fn next_valency_exact_match() {
        assert_eq!(Element::C.next_valency_at_least(4.0), 4.0);
        assert_eq!(Element::H.next_valency_at_least(2.0), 0.0);
    }

    #[test]
    fn max_valency() {
        assert_eq!(Element::S.max_valency(), 6.0);
        assert_eq!(Element::C.max_valency(), 4.0);
        assert_eq!(Element::Ar.max_valency(), 0.0);
    }

    #[test]
    fn default_geometry_table() {
        assert_eq!(Element::C.geometry(0), Geometry::Linear);
        assert_eq!(Element::C.geometry(2), Geometry::Linear);
        assert_eq!(Element::C.geometry(3), Geometry::TrigonalPlanar);
        assert_eq!(Element::C.geometry(4), Geometry::Tetrahedral);
        assert_eq!(Element::S.geometry(6), Geometry::Octahedral);
        assert_eq!(Element::S.geometry(5), Geometry::Octahedral);
    }

    #[test]
    fn geometry_overrides() {
        assert_eq!(Element::N.geometry(3), Geometry::TrigonalPyramidal);
        assert_eq!(Element::N.geometry(4), Geometry::Tetrahedral);
        assert_eq!(Element::O.geometry(2), Geometry::Bent);
        assert_eq!(Element::O.geometry(1), Geometry::Linear);
    }

    #[test]
    fn precedence_order_starts_r_c_h() {
        assert_eq!(&ALL_ELEMENTS[..3], &[Element::R, Element::C, Element::H]);
        assert!(Element::R < Element::C);
        assert!(Element::C < Element::H);
    }
}
