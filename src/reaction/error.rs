use std::fmt;

use crate::species::StructureError;

/// Error raised while enumerating bindings for or firing a reaction rule.
///
/// During resolution these are recovered per rule (the rule is skipped for
/// the pass and reported as a diagnostic); they never abort a pass.
#[derive(Debug, Clone, PartialEq)]
pub enum ReactionError {
    /// Product construction yielded a structurally invalid species.
    InvalidProduct(StructureError),
    /// A product template atom carries neither a role nor an element.
    MissingProductElement { template: usize, atom: usize },
    /// A product template role points outside the rule's reactant slots or
    /// the slot pattern's roles.
    UnknownRole { slot: usize, role: usize },
    /// Binding enumeration exceeded the combination limit.
    TooManyCombinations,
}

impl fmt::Display for ReactionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidProduct(e) => write!(f, "product construction failed: {e}"),
            Self::MissingProductElement { template, atom } => write!(
                f,
                "product template {template}, atom {atom}: no role and no element"
            ),
            Self::UnknownRole { slot, role } => {
                write!(f, "role reference (slot {slot}, role {role}) does not exist")
            }
            Self::TooManyCombinations => write!(f, "binding combination count exceeds limit"),
        }
    }
}

impl std::error::Error for ReactionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::InvalidProduct(e) => Some(e),
            _ => None,
        }
    }
}

impl From<StructureError> for ReactionError {
    fn from(e: StructureError) -> Self {
        Self::InvalidProduct(e)
    }
}
