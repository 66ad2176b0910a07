/// Bond order between two atoms.
///
/// `Aromatic` is a delocalized bond contributing 1.5 to each atom's
/// realized valency, matching the fractional valencies some elements
/// declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BondOrder {
    #[default]
    Single,
    Double,
    Triple,
    Aromatic,
}

impl BondOrder {
    /// Numeric contribution of this bond to each endpoint's valency.
    pub fn order(self) -> f64 {
        match self {
            BondOrder::Single => 1.0,
            BondOrder::Double => 2.0,
            BondOrder::Triple => 3.0,
            BondOrder::Aromatic => 1.5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Bond {
    pub order: BondOrder,
}

impl Default for Bond {
    fn default() -> Self {
        Self {
            order: BondOrder::Single,
        }
    }
}

impl Bond {
    pub fn new(order: BondOrder) -> Self {
        Self { order }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_orders() {
        assert_eq!(BondOrder::Single.order(), 1.0);
        assert_eq!(BondOrder::Double.order(), 2.0);
        assert_eq!(BondOrder::Triple.order(), 3.0);
        assert_eq!(BondOrder::Aromatic.order(), 1.5);
    }

    #[test]
    fn default_is_single() {
        assert_eq!(Bond::default().order, BondOrder::Single);
    }
}
